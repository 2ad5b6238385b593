use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: &'static str,
    pub service: &'static str,
}

impl HealthResponse {
    pub fn new(database_healthy: bool) -> Self {
        Self {
            status: if database_healthy { "ok" } else { "error" },
            database: if database_healthy { "healthy" } else { "unhealthy" },
            service: env!("CARGO_PKG_NAME"),
        }
    }
}
