use super::ProfileStoreOperations;

use diesel::{dsl::insert_into, ExpressionMethods, RunQueryDsl};

use crate::modules::profile::store::{diesel::models::ProfileModel, Profile, ProfileStoreError};
use crate::schema::profiles;

const STATEMENT: &str = "create_profile: INSERT INTO profiles";

pub trait ProfileStoreCreateProfile {
    fn create_profile(&mut self, profile: Profile) -> Result<(), ProfileStoreError>;
}

// A colliding id or login surfaces as a unique violation from the insert itself; there is no
// separate existence check and no upsert.

#[cfg(feature = "sqlite")]
impl<'a> ProfileStoreCreateProfile
    for ProfileStoreOperations<'a, diesel::sqlite::SqliteConnection>
{
    fn create_profile(&mut self, profile: Profile) -> Result<(), ProfileStoreError> {
        let model = ProfileModel::from(profile);
        insert_into(profiles::table)
            .values((
                profiles::id.eq(&model.id),
                profiles::login.eq(&model.login),
                profiles::password.eq(&model.password),
                profiles::refresh_token.eq(&model.refresh_token),
                profiles::username.eq(&model.username),
            ))
            .execute(self.conn)
            .map(|_| ())
            .map_err(|err| ProfileStoreError::from_query_error(STATEMENT, err))
    }
}

#[cfg(feature = "postgres")]
impl<'a> ProfileStoreCreateProfile for ProfileStoreOperations<'a, diesel::pg::PgConnection> {
    fn create_profile(&mut self, profile: Profile) -> Result<(), ProfileStoreError> {
        let model = ProfileModel::from(profile);
        insert_into(profiles::table)
            .values((
                profiles::id.eq(&model.id),
                profiles::login.eq(&model.login),
                profiles::password.eq(&model.password),
                profiles::refresh_token.eq(&model.refresh_token),
                profiles::username.eq(&model.username),
            ))
            .execute(self.conn)
            .map(|_| ())
            .map_err(|err| ProfileStoreError::from_query_error(STATEMENT, err))
    }
}
