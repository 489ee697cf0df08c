//! Connection pool wrapper used by the diesel-backed stores.
//!
//! A pool may be shared as-is, or wrapped in a [`RwLock`] to enforce write exclusivity: writers
//! take the write lock, readers share the read lock. SQLite needs the latter, since it permits a
//! single writer per database file.
//!
//! Waiting for the lock is bounded by the caller's [`RequestContext`] just like checkout is.

use std::sync::Arc;
use std::time::Duration;

use diesel::r2d2::{ConnectionManager, Pool, PooledConnection, R2D2Connection};
use parking_lot::RwLock;

use crate::modules::context::RequestContext;
use crate::modules::error::InternalError;
use crate::modules::profile::ProfileStoreError;

/// Longest single wait on the pool lock before the context is checked again.
const LOCK_POLL: Duration = Duration::from_millis(10);

pub(crate) enum ConnectionPool<C: R2D2Connection + 'static> {
    Normal(Pool<ConnectionManager<C>>),
    WriteExclusive(Arc<RwLock<Pool<ConnectionManager<C>>>>),
}

impl<C: R2D2Connection + 'static> Clone for ConnectionPool<C> {
    fn clone(&self) -> Self {
        match self {
            Self::Normal(pool) => Self::Normal(pool.clone()),
            Self::WriteExclusive(pool) => Self::WriteExclusive(Arc::clone(pool)),
        }
    }
}

impl<C: R2D2Connection + 'static> From<Pool<ConnectionManager<C>>> for ConnectionPool<C> {
    fn from(pool: Pool<ConnectionManager<C>>) -> Self {
        Self::Normal(pool)
    }
}

impl<C: R2D2Connection + 'static> From<Arc<RwLock<Pool<ConnectionManager<C>>>>> for ConnectionPool<C> {
    fn from(pool: Arc<RwLock<Pool<ConnectionManager<C>>>>) -> Self {
        Self::WriteExclusive(pool)
    }
}

impl<C: R2D2Connection + 'static> ConnectionPool<C> {
    /// Runs `f` with a pooled connection, holding the write lock if the pool is write-exclusive.
    pub fn execute_write<F, T>(&self, ctx: &RequestContext, f: F) -> Result<T, ProfileStoreError>
    where
        F: FnOnce(&mut C) -> Result<T, ProfileStoreError>,
    {
        match self {
            Self::Normal(pool) => f(&mut *checkout(pool, ctx)?),
            Self::WriteExclusive(locked) => {
                let pool = acquire(ctx, |wait| locked.try_write_for(wait))?;
                f(&mut *checkout(&pool, ctx)?)
            }
        }
    }

    /// Runs `f` with a pooled connection, sharing the read lock if the pool is write-exclusive.
    pub fn execute_read<F, T>(&self, ctx: &RequestContext, f: F) -> Result<T, ProfileStoreError>
    where
        F: FnOnce(&mut C) -> Result<T, ProfileStoreError>,
    {
        match self {
            Self::Normal(pool) => f(&mut *checkout(pool, ctx)?),
            Self::WriteExclusive(locked) => {
                let pool = acquire(ctx, |wait| locked.try_read_for(wait))?;
                f(&mut *checkout(&pool, ctx)?)
            }
        }
    }
}

/// Waits for a lock guard in short slices so that cancellation is noticed while blocked, and
/// the wait never outlives the context's deadline.
fn acquire<G>(
    ctx: &RequestContext,
    mut try_for: impl FnMut(Duration) -> Option<G>,
) -> Result<G, ProfileStoreError> {
    loop {
        ctx.check()?;
        let wait = ctx
            .remaining()
            .map_or(LOCK_POLL, |remaining| remaining.min(LOCK_POLL));
        if let Some(guard) = try_for(wait) {
            return Ok(guard);
        }
    }
}

/// Takes a connection from the pool, waiting no longer than the context allows.
fn checkout<C: R2D2Connection + 'static>(
    pool: &Pool<ConnectionManager<C>>,
    ctx: &RequestContext,
) -> Result<PooledConnection<ConnectionManager<C>>, ProfileStoreError> {
    ctx.check()?;

    let timeout = match ctx.remaining() {
        Some(remaining) => remaining.min(pool.connection_timeout()),
        None => pool.connection_timeout(),
    };

    pool.get_timeout(timeout.max(Duration::from_millis(1)))
        .map_err(|err| {
            // A checkout that ran out the context's clock is a deadline, not a broken pool.
            if let Err(ctx_err) = ctx.check() {
                return ProfileStoreError::Cancelled(ctx_err);
            }
            ProfileStoreError::Connection(InternalError::from_source_with_prefix(
                Box::new(err),
                "unable to acquire pooled connection".to_string(),
            ))
        })
}

#[cfg(all(test, feature = "sqlite"))]
mod tests {
    use std::panic::{catch_unwind, AssertUnwindSafe};
    use std::thread;
    use std::time::Instant;

    use diesel::SqliteConnection;

    use super::*;
    use crate::modules::context::ContextError;
    use crate::store::sqlite::{create_sqlite_connection_pool_with_write_exclusivity, MEMORY};
    use crate::store::PoolSettings;

    fn locked_pool() -> Arc<RwLock<Pool<ConnectionManager<SqliteConnection>>>> {
        create_sqlite_connection_pool_with_write_exclusivity(MEMORY, PoolSettings::default())
            .expect("Unable to create pool")
    }

    #[test]
    fn lock_wait_ends_at_the_deadline() {
        let locked = locked_pool();
        let pool = ConnectionPool::from(Arc::clone(&locked));
        let _writer = locked.write();

        let started = Instant::now();
        let err = pool
            .execute_read(&RequestContext::with_timeout(Duration::from_millis(50)), |_| {
                Ok(())
            })
            .expect_err("Read ran while the write lock was held");

        assert!(matches!(
            err,
            ProfileStoreError::Cancelled(ContextError::DeadlineExceeded)
        ));
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn lock_wait_ends_on_cancel() {
        let locked = locked_pool();
        let pool = ConnectionPool::from(Arc::clone(&locked));
        let _reader = locked.read();

        let ctx = RequestContext::background();
        let handle = ctx.cancel_handle();
        let canceller = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            handle.cancel();
        });

        let err = pool
            .execute_write(&ctx, |_| Ok(()))
            .expect_err("Write ran while a read lock was held");
        canceller.join().expect("Canceller thread panicked");

        assert!(matches!(
            err,
            ProfileStoreError::Cancelled(ContextError::Cancelled)
        ));
    }

    #[test]
    fn panic_while_holding_lock_leaves_pool_usable() {
        let pool = ConnectionPool::from(locked_pool());
        let ctx = RequestContext::background();

        let result = catch_unwind(AssertUnwindSafe(|| {
            pool.execute_write(&ctx, |_| -> Result<(), ProfileStoreError> {
                panic!("statement blew up")
            })
        }));
        assert!(result.is_err());

        assert_eq!(pool.execute_write(&ctx, |_| Ok(7)).unwrap(), 7);
        assert_eq!(pool.execute_read(&ctx, |_| Ok(8)).unwrap(), 8);
    }
}
