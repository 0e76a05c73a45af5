pub mod api;
pub mod catalog;
pub mod config;
pub mod extract;
pub mod ledger;
pub mod models;
pub mod orders;
pub mod schema;
pub mod uploads;
pub mod views;
pub mod workflow;

use diesel::{Connection, PgConnection};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use tracing::info;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Brings the schema up to date over a blocking connection.
pub fn run_migrations(database_url: &str) -> anyhow::Result<()> {
    info!("Running database migrations...");
    let mut conn = PgConnection::establish(database_url)?;
    conn.run_pending_migrations(MIGRATIONS)
        .map_err(|e| anyhow::anyhow!("Migration error: {}", e))?;
    info!("Migrations completed successfully");
    Ok(())
}
