use sqlx::MySqlPool;
use sqlx::mysql::MySqlPoolOptions;
use tracing::info;

use crate::store::{MySqlRepository, StoreError};

/// Connects and brings the schema up to date.
pub async fn init_db(database_url: &str) -> Result<MySqlRepository, StoreError> {
    let pool: MySqlPool = MySqlPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;

    let repo = MySqlRepository::new(pool);
    repo.migrate().await?;
    info!("Database migrations applied");

    Ok(repo)
}
