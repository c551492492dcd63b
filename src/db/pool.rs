use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;

/// Pool sizing shared by every store. Mutations are single guarded UPDATEs,
/// so connections turn over quickly; the acquire timeout bounds how long a
/// burst of concurrent claims can queue for a connection.
fn pool_options() -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(25)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(5))
        .idle_timeout(Duration::from_secs(600))
}

pub async fn create_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    pool_options().connect(database_url).await
}
