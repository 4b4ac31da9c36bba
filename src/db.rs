use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Pool, Postgres};
use tracing::info;

use crate::utils::AppError;

/// Shared handle to the Postgres pool. Services clone this; repository
/// functions receive connections checked out from it.
#[derive(Clone)]
pub struct Database {
    pool: Pool<Postgres>,
}

impl Database {
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, AppError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        info!("Successfully connected to database");
        Ok(Self { pool })
    }

    /// Apply everything under `migrations/`.
    pub async fn migrate(&self) -> Result<(), AppError> {
        sqlx::migrate!()
            .run(&self.pool)
            .await
            .map_err(|e| AppError::Database(sqlx::Error::Migrate(Box::new(e))))?;

        info!("Migrations run successfully");
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}
