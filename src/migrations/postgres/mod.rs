//! Tools to apply database migrations for Postgres.

use diesel::pg::PgConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};

use crate::modules::error::InternalError;

pub const MIGRATIONS: EmbeddedMigrations =
    embed_migrations!("./src/migrations/postgres/migrations");

/// Run all pending database migrations.
///
/// # Arguments
///
/// * `conn` - Connection to PostgreSQL database
///
pub fn run_migrations(conn: &mut PgConnection) -> Result<(), InternalError> {
    conn.run_pending_migrations(MIGRATIONS)
        .map_err(InternalError::from_source)?;

    log::debug!("Successfully applied PostgreSQL migrations");

    Ok(())
}

/// Get whether there are any pending migrations
///
/// # Arguments
///
/// * `conn` - Connection to PostgreSQL database
///
pub fn any_pending_migrations(conn: &mut PgConnection) -> Result<bool, InternalError> {
    conn.has_pending_migration(MIGRATIONS)
        .map_err(InternalError::from_source)
}
