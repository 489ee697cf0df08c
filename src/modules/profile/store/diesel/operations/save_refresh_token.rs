use super::{require_rows_affected, ProfileStoreOperations};

use diesel::{dsl::update, prelude::*};

use crate::modules::profile::store::{ProfileStoreError, UpdateTokens};
use crate::schema::profiles;

const STATEMENT: &str = "save_refresh_token: UPDATE profiles SET refresh_token WHERE id";

pub trait ProfileStoreSaveRefreshToken {
    fn save_refresh_token(&mut self, tokens: UpdateTokens) -> Result<(), ProfileStoreError>;
}

#[cfg(feature = "sqlite")]
impl<'a> ProfileStoreSaveRefreshToken
    for ProfileStoreOperations<'a, diesel::sqlite::SqliteConnection>
{
    fn save_refresh_token(&mut self, tokens: UpdateTokens) -> Result<(), ProfileStoreError> {
        let rows_affected = update(profiles::table.filter(profiles::id.eq(tokens.id.to_string())))
            .set(profiles::refresh_token.eq(&tokens.refresh_token))
            .execute(self.conn)
            .map_err(|err| ProfileStoreError::from_query_error(STATEMENT, err))?;
        require_rows_affected(rows_affected, "save_refresh_token", &tokens.id)
    }
}

#[cfg(feature = "postgres")]
impl<'a> ProfileStoreSaveRefreshToken for ProfileStoreOperations<'a, diesel::pg::PgConnection> {
    fn save_refresh_token(&mut self, tokens: UpdateTokens) -> Result<(), ProfileStoreError> {
        let rows_affected = update(profiles::table.filter(profiles::id.eq(tokens.id.to_string())))
            .set(profiles::refresh_token.eq(&tokens.refresh_token))
            .execute(self.conn)
            .map_err(|err| ProfileStoreError::from_query_error(STATEMENT, err))?;
        require_rows_affected(rows_affected, "save_refresh_token", &tokens.id)
    }
}
