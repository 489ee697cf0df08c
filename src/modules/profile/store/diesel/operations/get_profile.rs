use super::ProfileStoreOperations;

use diesel::{prelude::*, OptionalExtension};
use uuid::Uuid;

use crate::modules::profile::store::{diesel::models::ProfileModel, Profile, ProfileStoreError};
use crate::schema::profiles;

const STATEMENT: &str = "get_profile_by_id: SELECT profiles WHERE id";

pub trait ProfileStoreGetProfile {
    fn get_profile_by_id(&mut self, id: &Uuid) -> Result<Profile, ProfileStoreError>;
}

fn found_or_not(model: Option<ProfileModel>, id: &Uuid) -> Result<Profile, ProfileStoreError> {
    model
        .ok_or_else(|| {
            ProfileStoreError::NotFound(format!(
                "get_profile_by_id: profile {} does not exist",
                id
            ))
        })
        .and_then(Profile::try_from)
}

#[cfg(feature = "sqlite")]
impl<'a> ProfileStoreGetProfile for ProfileStoreOperations<'a, diesel::sqlite::SqliteConnection> {
    fn get_profile_by_id(&mut self, id: &Uuid) -> Result<Profile, ProfileStoreError> {
        let model = profiles::table
            .filter(profiles::id.eq(id.to_string()))
            .first::<ProfileModel>(self.conn)
            .optional()
            .map_err(|err| ProfileStoreError::from_query_error(STATEMENT, err))?;
        found_or_not(model, id)
    }
}

#[cfg(feature = "postgres")]
impl<'a> ProfileStoreGetProfile for ProfileStoreOperations<'a, diesel::pg::PgConnection> {
    fn get_profile_by_id(&mut self, id: &Uuid) -> Result<Profile, ProfileStoreError> {
        let model = profiles::table
            .filter(profiles::id.eq(id.to_string()))
            .first::<ProfileModel>(self.conn)
            .optional()
            .map_err(|err| ProfileStoreError::from_query_error(STATEMENT, err))?;
        found_or_not(model, id)
    }
}
