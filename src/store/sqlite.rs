//! Implementation of a `StoreFactory` for SQLite
use anyhow::Error;
use std::sync::Arc;

use diesel::{
    connection::SimpleConnection,
    r2d2::{ConnectionManager, CustomizeConnection, Pool},
    sqlite::SqliteConnection,
};
use parking_lot::RwLock;

use crate::migrations::{any_pending_sqlite_migrations, run_sqlite_migrations};
use crate::modules::profile::{DieselProfileStore, ProfileStore};

use super::{PoolSettings, StoreFactory};

pub const MEMORY: &str = ":memory:";

/// Create a SQLite connection pool with the default [`PoolSettings`].
///
/// # Arguments
///
/// * conn_str - a filename or ":memory:"
pub fn create_sqlite_connection_pool(
    conn_str: &str,
) -> Result<Pool<ConnectionManager<SqliteConnection>>, Error> {
    create_sqlite_connection_pool_with_settings(conn_str, PoolSettings::default())
}

/// Create a SQLite connection pool.
///
/// # Arguments
///
/// * conn_str - a filename or ":memory:"
/// * settings - pool size and checkout timeout; the size is ignored for ":memory:"
///
/// # Errors
///
/// An error is returned if
/// * The file does not exist
/// * The pool cannot be created
/// * The database requires any pending migrations
pub fn create_sqlite_connection_pool_with_settings(
    conn_str: &str,
    settings: PoolSettings,
) -> Result<Pool<ConnectionManager<SqliteConnection>>, Error> {
    if (conn_str != MEMORY) && !std::path::Path::new(&conn_str).exists() {
        return Err(anyhow!(format!(
            "Database file '{}' does not exist",
            conn_str
        )));
    }
    let connection_manager = ConnectionManager::<SqliteConnection>::new(conn_str);
    let mut pool_builder = Pool::builder()
        .connection_timeout(settings.connection_timeout)
        .connection_customizer(Box::new(ConnectionCustomizer::default()))
        .error_handler(Box::new(HandlePoolError));
    // A new database is created for each connection to the in-memory SQLite
    // implementation; to ensure that the resulting stores will operate on the same
    // database, only one connection is allowed.
    if conn_str == MEMORY {
        pool_builder = pool_builder.max_size(1);
    } else {
        pool_builder = pool_builder.max_size(settings.max_size);
    }
    let pool = pool_builder
        .build(connection_manager)
        .map_err(|err| anyhow!(format!("Failed to build connection pool: {}", err)))?;
    let mut conn = pool.get().map_err(|err| anyhow!(err))?;

    if conn_str == MEMORY {
        run_sqlite_migrations(&mut conn)?;
    } else if any_pending_sqlite_migrations(&mut conn)? {
        return Err(anyhow!(String::from(
            "This version of profile-store requires migrations that are not yet applied \
            to the database. Run `profile-store migrate` to apply migrations \
            before starting",
        )));
    }

    Ok(pool)
}

pub fn create_sqlite_connection_pool_with_write_exclusivity(
    conn_str: &str,
    settings: PoolSettings,
) -> Result<Arc<RwLock<Pool<ConnectionManager<SqliteConnection>>>>, Error> {
    Ok(Arc::new(RwLock::new(
        create_sqlite_connection_pool_with_settings(conn_str, settings)?,
    )))
}

/// A `StoreFactory` backed by a SQLite database.
pub struct SqliteStoreFactory {
    pool: Arc<RwLock<Pool<ConnectionManager<SqliteConnection>>>>,
}

impl SqliteStoreFactory {
    /// Create a new `SqliteStoreFactory`.
    pub fn new(pool: Pool<ConnectionManager<SqliteConnection>>) -> Self {
        Self {
            pool: Arc::new(RwLock::new(pool)),
        }
    }

    /// Create a new `SqliteStoreFactory` with shared write-exclusivity.
    pub fn new_with_write_exclusivity(
        pool: Arc<RwLock<Pool<ConnectionManager<SqliteConnection>>>>,
    ) -> Self {
        Self { pool }
    }
}

impl StoreFactory for SqliteStoreFactory {
    fn get_profile_store(&self) -> Box<dyn ProfileStore> {
        Box::new(DieselProfileStore::new_with_write_exclusivity(
            self.pool.clone(),
        ))
    }
}

#[derive(Default, Debug)]
/// Foreign keys must be enabled on a per connection basis. This customizer will be added to the
/// SQLite pool builder and then ran against every connection returned from the pool.
pub struct ConnectionCustomizer;

impl CustomizeConnection<SqliteConnection, diesel::r2d2::Error> for ConnectionCustomizer {
    fn on_acquire(&self, conn: &mut SqliteConnection) -> Result<(), diesel::r2d2::Error> {
        conn.batch_execute(
            r#"
            PRAGMA busy_timeout = 2000;
            PRAGMA foreign_keys = ON;
            "#,
        )
        .map_err(diesel::r2d2::Error::QueryError)
    }
}

#[derive(Debug)]
struct HandlePoolError;

impl diesel::r2d2::HandleError<diesel::r2d2::Error> for HandlePoolError {
    fn handle_error(&self, error: diesel::r2d2::Error) {
        // Ignore the logging of "database is locked" error when submitting the pragma to the new
        // connection. The connection will be retried by the connection manager.
        if &error.to_string() != "database is locked" {
            log::error!("{}", error);
        }
    }
}

#[cfg(test)]
mod tests {
    use diesel::Connection;
    use uuid::Uuid;

    use super::*;
    use crate::modules::context::RequestContext;
    use crate::modules::profile::ProfileBuilder;

    #[test]
    fn missing_file_is_rejected() {
        let dir = tempfile::tempdir().expect("Unable to create temp dir");
        let path = dir.path().join("absent.db");

        let err = create_sqlite_connection_pool(&path.to_string_lossy())
            .expect_err("Pool was created for a missing file");
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn unmigrated_file_is_rejected() {
        let dir = tempfile::tempdir().expect("Unable to create temp dir");
        let path = dir.path().join("profiles.db");
        std::fs::File::create(&path).expect("Unable to create database file");

        let err = create_sqlite_connection_pool(&path.to_string_lossy())
            .expect_err("Pool was created with pending migrations");
        assert!(err.to_string().contains("profile-store migrate"));
    }

    #[test]
    fn migrated_file_backs_a_shared_store() {
        let dir = tempfile::tempdir().expect("Unable to create temp dir");
        let path = dir.path().join("profiles.db");
        let conn_str = path.to_string_lossy().to_string();
        {
            let mut conn =
                SqliteConnection::establish(&conn_str).expect("Unable to create database file");
            run_sqlite_migrations(&mut conn).expect("Unable to run migrations");
        }

        let pool = create_sqlite_connection_pool_with_write_exclusivity(
            &conn_str,
            PoolSettings {
                max_size: 2,
                ..PoolSettings::default()
            },
        )
        .expect("Unable to create pool");
        let factory = SqliteStoreFactory::new_with_write_exclusivity(pool);
        let ctx = RequestContext::background();

        let profile = ProfileBuilder::new()
            .with_id(Uuid::new_v4())
            .with_login("alice".to_string())
            .with_password("ph1".to_string())
            .build()
            .expect("Unable to build profile");
        factory
            .get_profile_store()
            .create_profile(&ctx, profile.clone())
            .expect("Unable to create profile");

        assert_eq!(
            factory
                .get_profile_store()
                .get_profile_by_id(&ctx, profile.id())
                .expect("Unable to fetch profile"),
            profile
        );
    }
}
