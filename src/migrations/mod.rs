//! Embedded schema migrations and the functions that apply them.
//!
//! ```ignore
//! use diesel::{sqlite::SqliteConnection, Connection};
//! use profile_store::migrations::run_sqlite_migrations;
//!
//! let mut conn = SqliteConnection::establish("profiles.db").unwrap();
//!
//! run_sqlite_migrations(&mut conn).unwrap();
//! ```

#[cfg(feature = "postgres")]
mod postgres;
#[cfg(feature = "sqlite")]
mod sqlite;

#[cfg(feature = "postgres")]
pub use self::postgres::any_pending_migrations as any_pending_postgres_migrations;
#[cfg(feature = "postgres")]
pub use self::postgres::run_migrations as run_postgres_migrations;
#[cfg(feature = "sqlite")]
pub use self::sqlite::any_pending_migrations as any_pending_sqlite_migrations;
#[cfg(feature = "sqlite")]
pub use self::sqlite::run_migrations as run_sqlite_migrations;
