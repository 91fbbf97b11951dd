use anyhow::{Context, Result};
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::sync::Arc;
use std::time::Duration;

pub use sqlx;
pub mod models;
pub mod repositories;

#[derive(Clone)]
pub struct Database {
    pub pool: PgPool,
}

impl Database {
    pub async fn connect(database_url: &str) -> Result<Arc<Self>> {
        let pool = PgPoolOptions::new()
            .max_connections(20)
            .min_connections(2)
            .acquire_timeout(Duration::from_secs(3))
            .idle_timeout(Duration::from_secs(60 * 5))
            .test_before_acquire(true)
            .connect(database_url)
            .await
            .context("failed to connect to the database")?;

        Ok(Arc::new(Self { pool }))
    }

    /// Runs pending migrations. Safe to run on startup: Postgres
    /// advisory locks serialize concurrent migration runs.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("migrations")
            .run(&self.pool)
            .await
            .context("failed to run database migrations")?;
        Ok(())
    }

    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .context("database health check failed")?;
        Ok(())
    }
}
