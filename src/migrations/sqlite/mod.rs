//! Tools to apply database migrations for SQLite.

use diesel::sqlite::SqliteConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};

use crate::modules::error::InternalError;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("./src/migrations/sqlite/migrations");

/// Run all pending database migrations.
///
/// # Arguments
///
/// * `conn` - Connection to SQLite database
///
pub fn run_migrations(conn: &mut SqliteConnection) -> Result<(), InternalError> {
    let applied = conn
        .run_pending_migrations(MIGRATIONS)
        .map_err(InternalError::from_source)?;

    log::debug!(
        "Successfully applied {} SQLite migration(s)",
        applied.len()
    );

    Ok(())
}

/// Get whether there are any pending migrations
///
/// # Arguments
///
/// * `conn` - Connection to SQLite database
///
pub fn any_pending_migrations(conn: &mut SqliteConnection) -> Result<bool, InternalError> {
    conn.has_pending_migration(MIGRATIONS)
        .map_err(InternalError::from_source)
}
