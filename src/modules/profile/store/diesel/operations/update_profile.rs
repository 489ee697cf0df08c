use super::{require_rows_affected, ProfileStoreOperations};

use diesel::{dsl::update, prelude::*};

use crate::modules::profile::store::{Profile, ProfileStoreError};
use crate::schema::profiles;

const STATEMENT: &str = "update_profile: UPDATE profiles SET login, password, refresh_token, username WHERE id";

pub trait ProfileStoreUpdateProfile {
    fn update_profile(&mut self, profile: Profile) -> Result<(), ProfileStoreError>;
}

#[cfg(feature = "sqlite")]
impl<'a> ProfileStoreUpdateProfile
    for ProfileStoreOperations<'a, diesel::sqlite::SqliteConnection>
{
    fn update_profile(&mut self, profile: Profile) -> Result<(), ProfileStoreError> {
        let rows_affected = update(profiles::table.filter(profiles::id.eq(profile.id.to_string())))
            .set((
                profiles::login.eq(&profile.login),
                profiles::password.eq(&profile.password),
                profiles::refresh_token.eq(&profile.refresh_token),
                profiles::username.eq(&profile.username),
            ))
            .execute(self.conn)
            .map_err(|err| ProfileStoreError::from_query_error(STATEMENT, err))?;
        require_rows_affected(rows_affected, "update_profile", &profile.id)
    }
}

#[cfg(feature = "postgres")]
impl<'a> ProfileStoreUpdateProfile for ProfileStoreOperations<'a, diesel::pg::PgConnection> {
    fn update_profile(&mut self, profile: Profile) -> Result<(), ProfileStoreError> {
        let rows_affected = update(profiles::table.filter(profiles::id.eq(profile.id.to_string())))
            .set((
                profiles::login.eq(&profile.login),
                profiles::password.eq(&profile.password),
                profiles::refresh_token.eq(&profile.refresh_token),
                profiles::username.eq(&profile.username),
            ))
            .execute(self.conn)
            .map_err(|err| ProfileStoreError::from_query_error(STATEMENT, err))?;
        require_rows_affected(rows_affected, "update_profile", &profile.id)
    }
}
