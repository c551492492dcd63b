use std::env;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database_url: String,
    pub listen_addr: String,
    pub cors_origin: String,
    pub sweep_interval_secs: u64,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, String> {
        let database_url = env::var("DATABASE_URL")
            .map_err(|_| "DATABASE_URL must be set".to_string())?;

        let listen_addr = env::var("LISTEN_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:8080".to_string());

        let cors_origin = env::var("CORS_ORIGIN")
            .unwrap_or_else(|_| "http://localhost:3000".to_string());

        let sweep_interval_secs = match env::var("SWEEP_INTERVAL_SECS") {
            Ok(raw) => parse_interval(&raw)?,
            Err(_) => 60,
        };

        Ok(Self {
            database_url,
            listen_addr,
            cors_origin,
            sweep_interval_secs,
        })
    }
}

fn parse_interval(raw: &str) -> Result<u64, String> {
    let secs: u64 = raw
        .parse()
        .map_err(|_| format!("SWEEP_INTERVAL_SECS must be a number, got {:?}", raw))?;

    if secs == 0 {
        return Err("SWEEP_INTERVAL_SECS must be at least 1".to_string());
    }

    Ok(secs)
}
