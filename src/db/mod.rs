pub mod attendee;
pub mod event;

use crate::{config::Settings, PGPool};
use log::info;
use sqlx::postgres::PgPoolOptions;

pub async fn init_db_pool(settings: &Settings) -> Result<PGPool, sqlx::Error> {
    let pool: PGPool = PgPoolOptions::new()
        .max_connections(settings.db_max_connections)
        .connect(&settings.database_url)
        .await?;
    info!("connected to postgresql (max {} connections)", settings.db_max_connections);
    Ok(pool)
}

pub async fn run_migrations(pool: &PGPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    info!("database migrations applied");
    Ok(())
}

pub async fn ping(pool: &PGPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}
