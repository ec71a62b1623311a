//! Database migration runner.

use sea_orm_migration::MigratorTrait;
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::migration::Migrator;

use super::DbPool;

/// Run all pending migrations.
pub async fn run_migrations(pool: &DbPool) -> AppResult<()> {
    let pending = Migrator::get_pending_migrations(pool.connection())
        .await
        .map_err(|e| AppError::Persistence(format!("Failed to read migration status: {}", e)))?;

    if pending.is_empty() {
        info!("No pending migrations");
        return Ok(());
    }

    info!("{} migration(s) pending", pending.len());
    Migrator::up(pool.connection(), None)
        .await
        .map_err(|e| AppError::Persistence(format!("Migration failed: {}", e)))?;
    info!("Migrations applied successfully");

    Ok(())
}
