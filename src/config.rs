use std::env;
use std::time::Duration;

use crate::routes::HEALTH_PATH;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub environment: String,
    pub database_url: String,
    pub database_max_connections: u32,
    pub database_acquire_timeout_secs: u64,
    pub statistics_path: String,
    pub request_timeout_secs: u64,
    pub otel_service_name: String,
    pub otel_exporter_endpoint: String,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let statistics_path =
            env::var("STATISTICS_PATH").unwrap_or_else(|_| "/statistics".to_string());
        if let Err(msg) = validate_statistics_path(&statistics_path) {
            panic!("{msg}");
        }

        Self {
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .expect("PORT must be a number"),
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            database_max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .expect("DATABASE_MAX_CONNECTIONS must be a number"),
            database_acquire_timeout_secs: env::var("DATABASE_ACQUIRE_TIMEOUT_SECS")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .expect("DATABASE_ACQUIRE_TIMEOUT_SECS must be a number"),
            statistics_path,
            request_timeout_secs: env::var("REQUEST_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .expect("REQUEST_TIMEOUT_SECS must be a number"),
            otel_service_name: env::var("OTEL_SERVICE_NAME")
                .unwrap_or_else(|_| "dspace-repository-statistics".to_string()),
            otel_exporter_endpoint: env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
                .unwrap_or_else(|_| "http://localhost:4317".to_string()),
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.database_acquire_timeout_secs)
    }
}

/// The report route must be absolute and must not shadow the health check.
pub fn validate_statistics_path(path: &str) -> Result<(), String> {
    if !path.starts_with('/') {
        return Err(format!("STATISTICS_PATH must start with '/', got {path:?}"));
    }
    if path == HEALTH_PATH {
        return Err(format!(
            "STATISTICS_PATH must not be {HEALTH_PATH}, which serves the health check"
        ));
    }

    Ok(())
}
