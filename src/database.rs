//! Connection URI parsing and construction of pools and store factories.

use std::fmt::Display;
use std::str::FromStr;
#[cfg(feature = "sqlite")]
use std::sync::Arc;

use anyhow::Error;
use diesel::r2d2::{ConnectionManager, Pool};
#[cfg(feature = "sqlite")]
use parking_lot::RwLock;

#[cfg(feature = "postgres")]
use crate::store::postgres;
#[cfg(feature = "sqlite")]
use crate::store::sqlite;
use crate::store::{PoolSettings, StoreFactory};

pub enum ConnectionPool {
    #[cfg(feature = "postgres")]
    Postgres {
        pool: Pool<ConnectionManager<diesel::pg::PgConnection>>,
    },
    #[cfg(feature = "sqlite")]
    Sqlite {
        pool: Arc<RwLock<Pool<ConnectionManager<diesel::SqliteConnection>>>>,
    },
    // This variant is only enabled to such that the compiler does not complain.  It is never
    // constructed.
    #[cfg(not(any(feature = "postgres", feature = "sqlite")))]
    #[allow(dead_code)]
    Unsupported,
}

/// The possible connection types and identifiers for a `StoreFactory`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionUri {
    Memory,
    #[cfg(feature = "postgres")]
    Postgres(String),
    #[cfg(feature = "sqlite")]
    Sqlite(String),
}

impl Display for ConnectionUri {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let string = match self {
            ConnectionUri::Memory => "memory",
            #[cfg(feature = "sqlite")]
            ConnectionUri::Sqlite(sqlite) => sqlite,
            // The URL may carry a password.
            #[cfg(feature = "postgres")]
            ConnectionUri::Postgres(_) => "postgres://<redacted>",
        };
        write!(f, "{}", string)
    }
}

impl FromStr for ConnectionUri {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "memory" => Ok(ConnectionUri::Memory),
            #[cfg(feature = "postgres")]
            _ if s.starts_with("postgres://") || s.starts_with("postgresql://") => {
                Ok(ConnectionUri::Postgres(s.into()))
            }
            #[cfg(feature = "sqlite")]
            _ => Ok(ConnectionUri::Sqlite(s.into())),
            #[cfg(not(feature = "sqlite"))]
            _ => Err(anyhow!("No compatible connection type: {}", s)),
        }
    }
}

pub fn create_connection_pool(
    connection_uri: &ConnectionUri,
    settings: PoolSettings,
) -> Result<ConnectionPool, Error> {
    log::info!("create_connection_pool: {}", connection_uri);
    match connection_uri {
        #[cfg(feature = "postgres")]
        ConnectionUri::Postgres(url) => {
            let pool = postgres::create_postgres_connection_pool(url, settings)?;
            Ok(ConnectionPool::Postgres { pool })
        }
        #[cfg(feature = "sqlite")]
        ConnectionUri::Sqlite(conn_str) => {
            let pool =
                sqlite::create_sqlite_connection_pool_with_write_exclusivity(conn_str, settings)?;
            Ok(ConnectionPool::Sqlite { pool })
        }
        #[cfg(feature = "sqlite")]
        ConnectionUri::Memory => {
            let pool =
                sqlite::create_sqlite_connection_pool_with_write_exclusivity(sqlite::MEMORY, settings)?;
            Ok(ConnectionPool::Sqlite { pool })
        }
        #[cfg(not(feature = "sqlite"))]
        ConnectionUri::Memory => Err(anyhow!("Unsupported connection pool type: memory")),
    }
}

/// Creates a `StoreFactory` backed by the given connection
///
/// # Arguments
///
/// * `connection_pool` - The pool that will be shared by all stores created by the resulting
///   factory
pub fn create_store_factory(
    connection_pool: &ConnectionPool,
) -> Result<Box<dyn StoreFactory>, Error> {
    match connection_pool {
        #[cfg(feature = "postgres")]
        ConnectionPool::Postgres { pool } => {
            Ok(Box::new(postgres::PgStoreFactory::new(pool.clone())))
        }
        #[cfg(feature = "sqlite")]
        ConnectionPool::Sqlite { pool } => Ok(Box::new(
            sqlite::SqliteStoreFactory::new_with_write_exclusivity(pool.clone()),
        )),
        #[cfg(not(any(feature = "postgres", feature = "sqlite")))]
        ConnectionPool::Unsupported => Err(anyhow!(
            "Connection pools are unavailable in this configuration"
        )),
    }
}
