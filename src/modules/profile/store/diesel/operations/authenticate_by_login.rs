use super::ProfileStoreOperations;

use diesel::{ExpressionMethods, OptionalExtension, QueryDsl, RunQueryDsl};
use uuid::Uuid;

use crate::modules::profile::store::{diesel::models::parse_stored_id, ProfileStoreError};
use crate::schema::profiles;

const STATEMENT: &str = "authenticate_by_login: SELECT id, password FROM profiles WHERE login";

pub trait ProfileStoreAuthenticateByLogin {
    fn authenticate_by_login(&mut self, login: &str) -> Result<(Uuid, String), ProfileStoreError>;
}

fn found_or_not(
    row: Option<(String, String)>,
    login: &str,
) -> Result<(Uuid, String), ProfileStoreError> {
    let (id, password) = row.ok_or_else(|| {
        ProfileStoreError::NotFound(format!(
            "authenticate_by_login: no profile with login {:?}",
            login
        ))
    })?;
    Ok((parse_stored_id(&id)?, password))
}

#[cfg(feature = "sqlite")]
impl<'a> ProfileStoreAuthenticateByLogin
    for ProfileStoreOperations<'a, diesel::sqlite::SqliteConnection>
{
    fn authenticate_by_login(&mut self, login: &str) -> Result<(Uuid, String), ProfileStoreError> {
        let row = profiles::table
            .filter(profiles::login.eq(login))
            .select((profiles::id, profiles::password))
            .first::<(String, String)>(self.conn)
            .optional()
            .map_err(|err| ProfileStoreError::from_query_error(STATEMENT, err))?;
        found_or_not(row, login)
    }
}

#[cfg(feature = "postgres")]
impl<'a> ProfileStoreAuthenticateByLogin for ProfileStoreOperations<'a, diesel::pg::PgConnection> {
    fn authenticate_by_login(&mut self, login: &str) -> Result<(Uuid, String), ProfileStoreError> {
        let row = profiles::table
            .filter(profiles::login.eq(login))
            .select((profiles::id, profiles::password))
            .first::<(String, String)>(self.conn)
            .optional()
            .map_err(|err| ProfileStoreError::from_query_error(STATEMENT, err))?;
        found_or_not(row, login)
    }
}
