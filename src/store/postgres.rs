//! Implementation of a `StoreFactory` for PostgreSQL
use anyhow::Error;
use diesel::{
    pg::PgConnection,
    r2d2::{ConnectionManager, Pool},
};

use crate::migrations::any_pending_postgres_migrations;
use crate::modules::profile::{DieselProfileStore, ProfileStore};

use super::{PoolSettings, StoreFactory};

/// Create a PostgreSQL connection pool.
///
/// # Errors
///
/// An error is returned if the pool cannot be created or the database requires any pending
/// migrations.
pub fn create_postgres_connection_pool(
    url: &str,
    settings: PoolSettings,
) -> Result<Pool<ConnectionManager<PgConnection>>, Error> {
    let connection_manager = ConnectionManager::<PgConnection>::new(url);
    let pool = Pool::builder()
        .max_size(settings.max_size)
        .connection_timeout(settings.connection_timeout)
        .build(connection_manager)
        .map_err(|err| anyhow!(format!("Failed to build connection pool: {}", err)))?;

    let mut conn = pool.get().map_err(|err| anyhow!(err))?;
    if any_pending_postgres_migrations(&mut conn)? {
        return Err(anyhow!(String::from(
            "This version of profile-store requires migrations that are not yet applied \
            to the database. Run `profile-store migrate` to apply migrations \
            before starting",
        )));
    }

    Ok(pool)
}

/// A `StoreFactory` backed by a PostgreSQL database.
pub struct PgStoreFactory {
    pool: Pool<ConnectionManager<PgConnection>>,
}

impl PgStoreFactory {
    /// Create a new `PgStoreFactory`.
    pub fn new(pool: Pool<ConnectionManager<PgConnection>>) -> Self {
        Self { pool }
    }
}

impl StoreFactory for PgStoreFactory {
    fn get_profile_store(&self) -> Box<dyn ProfileStore> {
        Box::new(DieselProfileStore::new(self.pool.clone()))
    }
}
