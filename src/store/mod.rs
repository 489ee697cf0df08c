//! Store factories and connection pool construction for the supported database backends.

pub(crate) mod pool;
#[cfg(feature = "postgres")]
pub mod postgres;
#[cfg(feature = "sqlite")]
pub mod sqlite;

use std::time::Duration;

use crate::modules::profile::ProfileStore;

/// An abstract factory for creating stores backed by the same storage
pub trait StoreFactory {
    /// Get a new `ProfileStore`
    fn get_profile_store(&self) -> Box<dyn ProfileStore>;
}

/// Sizing and checkout limits applied when building a connection pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolSettings {
    pub max_size: u32,
    pub connection_timeout: Duration,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_size: 10,
            connection_timeout: Duration::from_secs(30),
        }
    }
}
