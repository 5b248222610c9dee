use sqlx::{migrate::Migrator, postgres::PgPoolOptions, PgPool};
use tracing::info;

use crate::error::StoreError;

pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

pub async fn establish_connection(
    database_url: &str,
    max_connections: u32,
) -> Result<PgPool, StoreError> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;
    info!("Connected to database (max {} connections)", max_connections);
    Ok(pool)
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), StoreError> {
    MIGRATOR.run(pool).await?;
    info!("Database migrations applied");
    Ok(())
}
