use sqlx::{PgPool, postgres::PgPoolOptions};

use crate::config::Config;

/// Connects to the DSpace database. The schema belongs to DSpace, so no
/// migrations are run here.
pub async fn create_pool(config: &Config) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .min_connections(1)
        .acquire_timeout(config.acquire_timeout())
        .connect(&config.database_url)
        .await?;

    tracing::info!(
        max_connections = config.database_max_connections,
        "Database connection pool created"
    );

    Ok(pool)
}
