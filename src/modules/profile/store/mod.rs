//! Defines a basic representation of an account profile and the store that persists it.

pub mod diesel;
pub mod error;
pub mod memory;
pub mod observer;

use uuid::Uuid;

use crate::modules::context::RequestContext;
use crate::modules::error::InvalidStateError;

pub use error::ProfileStoreError;

/// Identity record of an account.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Profile {
    pub id: Uuid,
    pub login: String,
    pub password: String,
    pub refresh_token: String,
    pub username: Option<String>,
}

impl Profile {
    /// Returns the immutable id of the profile
    pub fn id(&self) -> &Uuid {
        &self.id
    }

    /// Returns the unique login of the profile
    pub fn login(&self) -> &str {
        &self.login
    }

    /// Returns the stored password hash
    pub fn password(&self) -> &str {
        &self.password
    }

    /// Returns the current refresh token, empty until a session has been established
    pub fn refresh_token(&self) -> &str {
        &self.refresh_token
    }

    /// Returns the display name, if one was set
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }
}

/// Builder for profiles.
///
/// id, login and password are required
#[derive(Default)]
pub struct ProfileBuilder {
    id: Option<Uuid>,
    login: Option<String>,
    password: Option<String>,
    refresh_token: Option<String>,
    username: Option<String>,
}

impl ProfileBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the id for the profile
    ///
    /// This is a required field for the final Profile struct
    ///
    /// # Arguments
    ///
    /// * `id` - the identifier generated by the caller for the new account
    pub fn with_id(mut self, id: Uuid) -> ProfileBuilder {
        self.id = Some(id);
        self
    }

    /// Sets the login for the profile
    ///
    /// This is a required field for the final Profile struct
    pub fn with_login(mut self, login: String) -> ProfileBuilder {
        self.login = Some(login);
        self
    }

    /// Sets the password for the profile
    ///
    /// This is a required field for the final Profile struct. The value is expected to already
    /// be hashed; the store never interprets it.
    pub fn with_password(mut self, password: String) -> ProfileBuilder {
        self.password = Some(password);
        self
    }

    /// Sets the refresh token for the profile. Defaults to an empty token.
    pub fn with_refresh_token(mut self, refresh_token: String) -> ProfileBuilder {
        self.refresh_token = Some(refresh_token);
        self
    }

    /// Sets the display name for the profile
    pub fn with_username(mut self, username: String) -> ProfileBuilder {
        self.username = Some(username);
        self
    }

    /// Builds the profile
    ///
    /// # Errors
    ///
    /// Returns an `InvalidStateError` if `id`, `login` or `password` are missing
    pub fn build(self) -> Result<Profile, InvalidStateError> {
        Ok(Profile {
            id: self.id.ok_or_else(|| {
                InvalidStateError::missing_field("Profile", "id")
            })?,
            login: self.login.ok_or_else(|| {
                InvalidStateError::missing_field("Profile", "login")
            })?,
            password: self.password.ok_or_else(|| {
                InvalidStateError::missing_field("Profile", "password")
            })?,
            refresh_token: self.refresh_token.unwrap_or_default(),
            username: self.username,
        })
    }
}

/// Projection used to rotate the refresh token of a single profile.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UpdateTokens {
    pub id: Uuid,
    pub refresh_token: String,
}

/// Credential pair supplied by a caller at login. Never persisted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Auth {
    pub login: String,
    pub password: String,
}

/// Defines methods for CRUD operations on profiles without defining a storage strategy.
///
/// Every operation runs as its own unit of work: it either takes full effect or none, and
/// aborts if `ctx` is cancelled or its deadline passes before the work is committed.
pub trait ProfileStore: Sync + Send {
    /// Looks up the id and stored password hash for a login.
    ///
    /// The password is returned for the caller to compare; the store never compares secrets.
    ///
    /// # Errors
    ///
    /// Returns `ProfileStoreError::NotFound` if no profile has the given login.
    fn authenticate_by_login(
        &self,
        ctx: &RequestContext,
        login: &str,
    ) -> Result<(Uuid, String), ProfileStoreError>;

    /// Fetches a full profile by id.
    ///
    /// # Errors
    ///
    /// Returns `ProfileStoreError::NotFound` if the id does not exist.
    fn get_profile_by_id(&self, ctx: &RequestContext, id: &Uuid)
        -> Result<Profile, ProfileStoreError>;

    /// Adds a profile to the underlying storage
    ///
    /// # Errors
    ///
    /// Returns `ProfileStoreError::ConstraintViolation` if the id or login is already taken.
    fn create_profile(&self, ctx: &RequestContext, profile: Profile)
        -> Result<(), ProfileStoreError>;

    /// Replaces login, password, refresh token and username of an existing profile.
    ///
    /// # Errors
    ///
    /// Returns `ProfileStoreError::NotFound` if no row was affected.
    fn update_profile(&self, ctx: &RequestContext, profile: Profile)
        -> Result<(), ProfileStoreError>;

    /// Replaces only the refresh token of an existing profile.
    ///
    /// # Errors
    ///
    /// Returns `ProfileStoreError::NotFound` if no row was affected.
    fn save_refresh_token(
        &self,
        ctx: &RequestContext,
        tokens: UpdateTokens,
    ) -> Result<(), ProfileStoreError>;

    /// Removes a profile from the underlying storage
    ///
    /// # Errors
    ///
    /// Returns `ProfileStoreError::NotFound` if no row was affected.
    fn delete_profile_by_id(&self, ctx: &RequestContext, id: &Uuid)
        -> Result<(), ProfileStoreError>;

    /// Clone into a boxed, dynamically dispatched store
    fn clone_box(&self) -> Box<dyn ProfileStore>;
}

impl Clone for Box<dyn ProfileStore> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

impl<PS> ProfileStore for Box<PS>
where
    PS: ProfileStore + ?Sized,
{
    fn authenticate_by_login(
        &self,
        ctx: &RequestContext,
        login: &str,
    ) -> Result<(Uuid, String), ProfileStoreError> {
        (**self).authenticate_by_login(ctx, login)
    }

    fn get_profile_by_id(
        &self,
        ctx: &RequestContext,
        id: &Uuid,
    ) -> Result<Profile, ProfileStoreError> {
        (**self).get_profile_by_id(ctx, id)
    }

    fn create_profile(
        &self,
        ctx: &RequestContext,
        profile: Profile,
    ) -> Result<(), ProfileStoreError> {
        (**self).create_profile(ctx, profile)
    }

    fn update_profile(
        &self,
        ctx: &RequestContext,
        profile: Profile,
    ) -> Result<(), ProfileStoreError> {
        (**self).update_profile(ctx, profile)
    }

    fn save_refresh_token(
        &self,
        ctx: &RequestContext,
        tokens: UpdateTokens,
    ) -> Result<(), ProfileStoreError> {
        (**self).save_refresh_token(ctx, tokens)
    }

    fn delete_profile_by_id(
        &self,
        ctx: &RequestContext,
        id: &Uuid,
    ) -> Result<(), ProfileStoreError> {
        (**self).delete_profile_by_id(ctx, id)
    }

    fn clone_box(&self) -> Box<dyn ProfileStore> {
        (**self).clone_box()
    }
}
