use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{models::ShiftSummary, AppError, AppResult};

/// The exchange's window onto the rota. Reads tell us who currently holds a
/// shift; `reassign` is the one mutation the exchange may request, and only
/// after the corresponding approval is already durably committed.
#[async_trait]
pub trait ShiftReference: Send + Sync {
    async fn get_shift(&self, shift_id: Uuid) -> AppResult<Option<ShiftSummary>>;

    /// Move the shift to a new assignee. Guarded by the expected current
    /// assignee: if the rota changed underneath us the move fails instead of
    /// clobbering someone else's assignment.
    async fn reassign(&self, shift_id: Uuid, from_user_id: i32, to_user_id: i32)
        -> AppResult<()>;
}

/// Default implementation reading the portal's `shifts` table in the same
/// database.
///
/// Expected schema:
/// ```sql
/// CREATE TABLE shifts (
///     id UUID PRIMARY KEY,
///     store_id INTEGER NOT NULL,
///     assignee_id INTEGER,
///     starts_at TIMESTAMPTZ NOT NULL,
///     ends_at TIMESTAMPTZ NOT NULL
/// );
/// ```
#[derive(Clone)]
pub struct PgShiftReference {
    pool: PgPool,
}

impl PgShiftReference {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ShiftReference for PgShiftReference {
    async fn get_shift(&self, shift_id: Uuid) -> AppResult<Option<ShiftSummary>> {
        let shift = sqlx::query_as::<_, ShiftSummary>(
            r#"
            SELECT id AS shift_id, assignee_id, starts_at, ends_at, store_id
            FROM shifts
            WHERE id = $1
            "#,
        )
        .bind(shift_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, shift_id = %shift_id, "Failed to read shift");
            e
        })?;

        Ok(shift)
    }

    async fn reassign(
        &self,
        shift_id: Uuid,
        from_user_id: i32,
        to_user_id: i32,
    ) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE shifts
            SET assignee_id = $3
            WHERE id = $1 AND assignee_id = $2
            "#,
        )
        .bind(shift_id)
        .bind(from_user_id)
        .bind(to_user_id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, shift_id = %shift_id, "Failed to reassign shift");
            e
        })?;

        if result.rows_affected() == 0 {
            return Err(AppError::ReassignmentFailed(format!(
                "shift {} is no longer assigned to user {}",
                shift_id, from_user_id
            )));
        }

        tracing::info!(
            shift_id = %shift_id,
            from_user_id,
            to_user_id,
            "Shift reassigned"
        );
        Ok(())
    }
}
