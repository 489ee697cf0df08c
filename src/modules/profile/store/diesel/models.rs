use std::str::FromStr;

use ::diesel::prelude::*;
use uuid::Uuid;

use crate::modules::error::InternalError;
use crate::modules::profile::store::{Profile, ProfileStoreError};

/// Row of the `profiles` table, field order matching the table definition.
#[derive(Queryable, PartialEq, Eq, Debug)]
pub struct ProfileModel {
    pub id: String,
    pub login: String,
    pub password: String,
    pub refresh_token: String,
    pub username: Option<String>,
}

impl From<Profile> for ProfileModel {
    fn from(profile: Profile) -> Self {
        ProfileModel {
            id: profile.id.to_string(),
            login: profile.login,
            password: profile.password,
            refresh_token: profile.refresh_token,
            username: profile.username,
        }
    }
}

impl TryFrom<ProfileModel> for Profile {
    type Error = ProfileStoreError;

    fn try_from(model: ProfileModel) -> Result<Self, Self::Error> {
        Ok(Profile {
            id: parse_stored_id(&model.id)?,
            login: model.login,
            password: model.password,
            refresh_token: model.refresh_token,
            username: model.username,
        })
    }
}

/// Ids are stored as text; anything that does not parse back is corrupt data.
pub(super) fn parse_stored_id(id: &str) -> Result<Uuid, ProfileStoreError> {
    Uuid::from_str(id).map_err(|err| {
        ProfileStoreError::Internal(InternalError::from_source_with_prefix(
            Box::new(err),
            format!("invalid persisted profile id {:?}", id),
        ))
    })
}
