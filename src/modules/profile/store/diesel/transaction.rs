//! Transaction-per-call discipline shared by every diesel profile operation.
//!
//! A transaction is begun at a fixed isolation level, exactly one statement runs inside it, and
//! the transaction is committed or rolled back before the call returns. The transaction is owned
//! by a guard whose `Drop` rolls back if neither happened, so a panic inside the statement still
//! leaves the pooled connection outside of any transaction.

use std::time::Duration;

use ::diesel::connection::{AnsiTransactionManager, TransactionManager};
use ::diesel::{Connection, QueryResult};

use crate::modules::context::RequestContext;
use crate::modules::error::InternalError;
use crate::modules::profile::store::observer::TransactionObserver;
use crate::modules::profile::store::ProfileStoreError;

/// Isolation level a store transaction is begun with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IsolationLevel {
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

/// A diesel connection that can begin a transaction at an explicit isolation level.
pub trait TransactionalConnection:
    Connection<TransactionManager = AnsiTransactionManager> + 'static
{
    /// SQL that opens a transaction at the given isolation level.
    fn begin_sql(isolation: IsolationLevel) -> &'static str;

    /// Bounds the run time of statements in the current transaction.
    fn limit_statement_time(&mut self, _remaining: Duration) -> QueryResult<()> {
        Ok(())
    }
}

#[cfg(feature = "sqlite")]
impl TransactionalConnection for ::diesel::sqlite::SqliteConnection {
    // SQLite transactions are always serializable.
    fn begin_sql(_isolation: IsolationLevel) -> &'static str {
        "BEGIN"
    }
}

#[cfg(feature = "postgres")]
impl TransactionalConnection for ::diesel::pg::PgConnection {
    fn begin_sql(isolation: IsolationLevel) -> &'static str {
        match isolation {
            IsolationLevel::ReadCommitted => "BEGIN TRANSACTION ISOLATION LEVEL READ COMMITTED",
            IsolationLevel::RepeatableRead => "BEGIN TRANSACTION ISOLATION LEVEL REPEATABLE READ",
            IsolationLevel::Serializable => "BEGIN TRANSACTION ISOLATION LEVEL SERIALIZABLE",
        }
    }

    fn limit_statement_time(&mut self, remaining: Duration) -> QueryResult<()> {
        use ::diesel::connection::SimpleConnection;

        // SET LOCAL does not accept bind parameters; the value is a formatted integer.
        let millis = remaining.as_millis().max(1);
        self.batch_execute(&format!("SET LOCAL statement_timeout = {}", millis))
    }
}

struct TransactionGuard<'a, C: TransactionalConnection> {
    conn: &'a mut C,
    operation: &'a str,
    observer: &'a dyn TransactionObserver,
    open: bool,
}

impl<'a, C: TransactionalConnection> TransactionGuard<'a, C> {
    fn begin(
        conn: &'a mut C,
        isolation: IsolationLevel,
        operation: &'a str,
        observer: &'a dyn TransactionObserver,
    ) -> Result<Self, ProfileStoreError> {
        AnsiTransactionManager::begin_transaction_sql(&mut *conn, C::begin_sql(isolation))
            .map_err(|err| {
                ProfileStoreError::Connection(InternalError::from_source_with_prefix(
                    Box::new(err),
                    format!("{}: begin transaction", operation),
                ))
            })?;

        Ok(Self {
            conn,
            operation,
            observer,
            open: true,
        })
    }

    fn connection(&mut self) -> &mut C {
        &mut *self.conn
    }

    fn commit(mut self) {
        self.open = false;
        match <AnsiTransactionManager as TransactionManager<C>>::commit_transaction(&mut *self.conn)
        {
            Ok(()) => log::debug!("{}: committed", self.operation),
            Err(err) => self.observer.commit_failed(self.operation, &err),
        }
    }

    fn rollback(mut self) {
        self.rollback_if_open();
    }

    fn rollback_if_open(&mut self) {
        if !self.open {
            return;
        }
        self.open = false;
        match <AnsiTransactionManager as TransactionManager<C>>::rollback_transaction(
            &mut *self.conn,
        ) {
            Ok(()) => log::debug!("{}: rolled back", self.operation),
            Err(err) => self.observer.rollback_failed(self.operation, &err),
        }
    }
}

impl<'a, C: TransactionalConnection> Drop for TransactionGuard<'a, C> {
    fn drop(&mut self) {
        self.rollback_if_open();
    }
}

/// Runs `statement` inside a transaction begun at `isolation`.
///
/// * A statement error rolls back and is returned unchanged, unless the context was cancelled or
///   expired by then, in which case the error is reported as `ProfileStoreError::Cancelled`.
/// * A context cancelled or expired by the time the statement returns rolls back and returns
///   `ProfileStoreError::Cancelled`.
/// * A commit failure after a successful statement is reported to `observer` only; the
///   statement's result is still returned.
pub fn run_in_transaction<C, T, F>(
    conn: &mut C,
    ctx: &RequestContext,
    isolation: IsolationLevel,
    operation: &str,
    observer: &dyn TransactionObserver,
    statement: F,
) -> Result<T, ProfileStoreError>
where
    C: TransactionalConnection,
    F: FnOnce(&mut C) -> Result<T, ProfileStoreError>,
{
    ctx.check()?;

    let mut tx = TransactionGuard::begin(conn, isolation, operation, observer)?;

    if let Some(remaining) = ctx.remaining() {
        if let Err(err) = tx.connection().limit_statement_time(remaining) {
            tx.rollback();
            return Err(ProfileStoreError::Connection(
                InternalError::from_source_with_prefix(
                    Box::new(err),
                    format!("{}: set statement timeout", operation),
                ),
            ));
        }
    }

    match statement(tx.connection()) {
        Ok(value) => {
            if let Err(err) = ctx.check() {
                log::debug!("{}: {} before commit", operation, err);
                tx.rollback();
                return Err(err.into());
            }
            tx.commit();
            Ok(value)
        }
        Err(err) => {
            tx.rollback();
            // A statement cut short by the deadline (e.g. PostgreSQL's statement_timeout) fails
            // with a database error; the caller should see the deadline instead.
            if let Err(ctx_err) = ctx.check() {
                log::debug!("{}: {} ({})", operation, ctx_err, err);
                return Err(ctx_err.into());
            }
            Err(err)
        }
    }
}
