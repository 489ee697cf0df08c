//! Provides [`ProfileStore`](crate::modules::profile::ProfileStore) operations
//! implemented for a diesel backend
//!
//! Each operation issues exactly one parameterized statement against the connection it is given;
//! transaction handling lives in [`transaction`](super::transaction).

pub(super) mod authenticate_by_login;
pub(super) mod create_profile;
pub(super) mod delete_profile;
pub(super) mod get_profile;
pub(super) mod save_refresh_token;
pub(super) mod update_profile;

use crate::modules::profile::store::ProfileStoreError;

pub(super) struct ProfileStoreOperations<'a, C> {
    conn: &'a mut C,
}

impl<'a, C> ProfileStoreOperations<'a, C>
where
    C: diesel::Connection,
{
    pub fn new(conn: &'a mut C) -> Self {
        ProfileStoreOperations { conn }
    }
}

/// A write that touched no rows addressed a profile that does not exist.
fn require_rows_affected(
    rows_affected: usize,
    operation: &str,
    id: &uuid::Uuid,
) -> Result<(), ProfileStoreError> {
    if rows_affected == 0 {
        return Err(ProfileStoreError::NotFound(format!(
            "{}: profile {} does not exist",
            operation, id
        )));
    }
    Ok(())
}
