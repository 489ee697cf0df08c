//! Reporting hooks for transaction outcomes that are not returned to the caller.

use std::error::Error;

/// Receives transaction anomalies that the store reports but does not return.
///
/// A failed rollback still returns the statement error that caused it, and a failed commit after
/// a successful statement still returns success. Both are handed to the observer instead.
pub trait TransactionObserver: Send + Sync {
    /// Rolling back after a failed statement, a cancellation or a panic did not succeed.
    fn rollback_failed(&self, operation: &str, err: &(dyn Error + 'static));

    /// The statement succeeded but the commit did not.
    fn commit_failed(&self, operation: &str, err: &(dyn Error + 'static));
}

/// Forwards transaction anomalies to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl TransactionObserver for LogObserver {
    fn rollback_failed(&self, operation: &str, err: &(dyn Error + 'static)) {
        log::error!("{}: rollback failed: {}", operation, err);
    }

    fn commit_failed(&self, operation: &str, err: &(dyn Error + 'static)) {
        log::warn!(
            "{}: commit failed after the statement succeeded: {}",
            operation,
            err
        );
    }
}
