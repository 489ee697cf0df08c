use super::{require_rows_affected, ProfileStoreOperations};

use diesel::{dsl::delete, prelude::*};
use uuid::Uuid;

use crate::modules::profile::store::ProfileStoreError;
use crate::schema::profiles;

const STATEMENT: &str = "delete_profile_by_id: DELETE FROM profiles WHERE id";

pub trait ProfileStoreDeleteProfile {
    fn delete_profile_by_id(&mut self, id: &Uuid) -> Result<(), ProfileStoreError>;
}

#[cfg(feature = "sqlite")]
impl<'a> ProfileStoreDeleteProfile
    for ProfileStoreOperations<'a, diesel::sqlite::SqliteConnection>
{
    fn delete_profile_by_id(&mut self, id: &Uuid) -> Result<(), ProfileStoreError> {
        let rows_affected = delete(profiles::table.filter(profiles::id.eq(id.to_string())))
            .execute(self.conn)
            .map_err(|err| ProfileStoreError::from_query_error(STATEMENT, err))?;
        require_rows_affected(rows_affected, "delete_profile_by_id", id)
    }
}

#[cfg(feature = "postgres")]
impl<'a> ProfileStoreDeleteProfile for ProfileStoreOperations<'a, diesel::pg::PgConnection> {
    fn delete_profile_by_id(&mut self, id: &Uuid) -> Result<(), ProfileStoreError> {
        let rows_affected = delete(profiles::table.filter(profiles::id.eq(id.to_string())))
            .execute(self.conn)
            .map_err(|err| ProfileStoreError::from_query_error(STATEMENT, err))?;
        require_rows_affected(rows_affected, "delete_profile_by_id", id)
    }
}
