use std::error::Error;
use std::fmt;
use std::sync::Arc;

use uuid::Uuid;

use crate::modules::context::{ContextError, RequestContext};
use crate::modules::error::{InternalError, InvalidStateError};

use super::store::{Auth, Profile, ProfileBuilder, ProfileStore, ProfileStoreError, UpdateTokens};

/// Compares a password supplied at login with the hash held by the store.
pub trait PasswordVerifier: Send + Sync {
    fn verify(&self, supplied: &str, stored: &str) -> bool;
}

impl<F> PasswordVerifier for F
where
    F: Fn(&str, &str) -> bool + Send + Sync,
{
    fn verify(&self, supplied: &str, stored: &str) -> bool {
        self(supplied, stored)
    }
}

/// Status codes reported to callers of the profile service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    NotFound,
    AlreadyExists,
    Unauthenticated,
    Cancelled,
    DeadlineExceeded,
    Internal,
}

#[derive(Debug)]
pub enum ProfileServiceError {
    Store(ProfileStoreError),
    /// Unknown login or password mismatch; the two are deliberately indistinguishable.
    InvalidCredentials,
    InvalidState(InvalidStateError),
    Internal(InternalError),
}

impl ProfileServiceError {
    pub fn status(&self) -> StatusKind {
        match self {
            ProfileServiceError::Store(ProfileStoreError::NotFound(_)) => StatusKind::NotFound,
            ProfileServiceError::Store(err) if err.is_conflict() => StatusKind::AlreadyExists,
            ProfileServiceError::Store(ProfileStoreError::Cancelled(ContextError::Cancelled)) => {
                StatusKind::Cancelled
            }
            ProfileServiceError::Store(ProfileStoreError::Cancelled(
                ContextError::DeadlineExceeded,
            )) => StatusKind::DeadlineExceeded,
            ProfileServiceError::InvalidCredentials => StatusKind::Unauthenticated,
            _ => StatusKind::Internal,
        }
    }
}

impl Error for ProfileServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ProfileServiceError::Store(err) => Some(err),
            ProfileServiceError::InvalidCredentials => None,
            ProfileServiceError::InvalidState(err) => Some(err),
            ProfileServiceError::Internal(err) => Some(err),
        }
    }
}

impl fmt::Display for ProfileServiceError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ProfileServiceError::Store(err) => write!(f, "{}", err),
            ProfileServiceError::InvalidCredentials => f.write_str("invalid login or password"),
            ProfileServiceError::InvalidState(err) => write!(f, "{}", err),
            ProfileServiceError::Internal(err) => write!(f, "{}", err),
        }
    }
}

impl From<ProfileStoreError> for ProfileServiceError {
    fn from(err: ProfileStoreError) -> Self {
        ProfileServiceError::Store(err)
    }
}

impl From<InvalidStateError> for ProfileServiceError {
    fn from(err: InvalidStateError) -> Self {
        ProfileServiceError::InvalidState(err)
    }
}

#[async_trait]
pub trait ProfileService: Send + Sync {
    /// Returns the id of the profile whose stored password matches `auth`.
    async fn login(&self, ctx: &RequestContext, auth: Auth) -> Result<Uuid, ProfileServiceError>;

    /// Creates a profile under a freshly generated id and returns that id.
    async fn sign_up(
        &self,
        ctx: &RequestContext,
        auth: Auth,
        username: Option<String>,
    ) -> Result<Uuid, ProfileServiceError>;

    async fn get_profile_by_id(
        &self,
        ctx: &RequestContext,
        id: Uuid,
    ) -> Result<Profile, ProfileServiceError>;

    async fn update_profile(
        &self,
        ctx: &RequestContext,
        profile: Profile,
    ) -> Result<(), ProfileServiceError>;

    async fn save_refresh_token(
        &self,
        ctx: &RequestContext,
        tokens: UpdateTokens,
    ) -> Result<(), ProfileServiceError>;

    async fn delete_profile_by_id(
        &self,
        ctx: &RequestContext,
        id: Uuid,
    ) -> Result<(), ProfileServiceError>;
}

#[derive(Clone)]
pub struct ProfileManager {
    store: Box<dyn ProfileStore>,
    verifier: Arc<dyn PasswordVerifier>,
}

impl ProfileManager {
    pub fn new(store: Box<dyn ProfileStore>, verifier: Arc<dyn PasswordVerifier>) -> Self {
        Self { store, verifier }
    }

    /// Runs a blocking store call on tokio's blocking pool.
    async fn query<T, F>(&self, ctx: &RequestContext, f: F) -> Result<T, ProfileServiceError>
    where
        T: Send + 'static,
        F: FnOnce(&dyn ProfileStore, &RequestContext) -> Result<T, ProfileStoreError>
            + Send
            + 'static,
    {
        let store = self.store.clone();
        let ctx = ctx.clone();

        tokio::task::spawn_blocking(move || f(&*store, &ctx))
            .await
            .map_err(|err| {
                ProfileServiceError::Internal(InternalError::from_source_with_prefix(
                    Box::new(err),
                    "profile store task failed".to_string(),
                ))
            })?
            .map_err(ProfileServiceError::from)
    }
}

#[async_trait]
impl ProfileService for ProfileManager {
    async fn login(&self, ctx: &RequestContext, auth: Auth) -> Result<Uuid, ProfileServiceError> {
        let Auth { login, password } = auth;

        let (id, stored) = match self
            .query(ctx, move |store, ctx| store.authenticate_by_login(ctx, &login))
            .await
        {
            Ok(found) => found,
            Err(ProfileServiceError::Store(ProfileStoreError::NotFound(msg))) => {
                log::debug!("login rejected: {}", msg);
                return Err(ProfileServiceError::InvalidCredentials);
            }
            Err(err) => return Err(err),
        };

        if !self.verifier.verify(&password, &stored) {
            log::debug!("login rejected: password mismatch for profile {}", id);
            return Err(ProfileServiceError::InvalidCredentials);
        }

        Ok(id)
    }

    async fn sign_up(
        &self,
        ctx: &RequestContext,
        auth: Auth,
        username: Option<String>,
    ) -> Result<Uuid, ProfileServiceError> {
        let id = Uuid::new_v4();
        let mut builder = ProfileBuilder::new()
            .with_id(id)
            .with_login(auth.login)
            .with_password(auth.password);
        if let Some(username) = username {
            builder = builder.with_username(username);
        }
        let profile = builder.build()?;

        self.query(ctx, move |store, ctx| store.create_profile(ctx, profile))
            .await?;
        log::info!("Created profile {}", id);

        Ok(id)
    }

    async fn get_profile_by_id(
        &self,
        ctx: &RequestContext,
        id: Uuid,
    ) -> Result<Profile, ProfileServiceError> {
        self.query(ctx, move |store, ctx| store.get_profile_by_id(ctx, &id))
            .await
    }

    async fn update_profile(
        &self,
        ctx: &RequestContext,
        profile: Profile,
    ) -> Result<(), ProfileServiceError> {
        self.query(ctx, move |store, ctx| store.update_profile(ctx, profile))
            .await
    }

    async fn save_refresh_token(
        &self,
        ctx: &RequestContext,
        tokens: UpdateTokens,
    ) -> Result<(), ProfileServiceError> {
        self.query(ctx, move |store, ctx| store.save_refresh_token(ctx, tokens))
            .await
    }

    async fn delete_profile_by_id(
        &self,
        ctx: &RequestContext,
        id: Uuid,
    ) -> Result<(), ProfileServiceError> {
        self.query(ctx, move |store, ctx| store.delete_profile_by_id(ctx, &id))
            .await?;
        log::info!("Deleted profile {}", id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::profile::store::memory::MemoryProfileStore;

    fn manager() -> ProfileManager {
        let verifier = |supplied: &str, stored: &str| format!("hash:{}", supplied) == stored;
        ProfileManager::new(Box::new(MemoryProfileStore::new()), Arc::new(verifier))
    }

    fn auth(login: &str, password: &str) -> Auth {
        Auth {
            login: login.to_string(),
            password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn sign_up_then_login() {
        let mgr = manager();
        let ctx = RequestContext::background();

        let id = mgr
            .sign_up(&ctx, auth("alice", "hash:secret"), Some("Alice".to_string()))
            .await
            .expect("Unable to sign up");

        let profile = mgr.get_profile_by_id(&ctx, id).await.unwrap();
        assert_eq!(profile.login(), "alice");
        assert_eq!(profile.refresh_token(), "");
        assert_eq!(profile.username(), Some("Alice"));

        assert_eq!(mgr.login(&ctx, auth("alice", "secret")).await.unwrap(), id);
    }

    #[tokio::test]
    async fn bad_credentials_are_unauthenticated() {
        let mgr = manager();
        let ctx = RequestContext::background();
        mgr.sign_up(&ctx, auth("bob", "hash:pw"), None).await.unwrap();

        let wrong_password = mgr.login(&ctx, auth("bob", "nope")).await.unwrap_err();
        assert_eq!(wrong_password.status(), StatusKind::Unauthenticated);

        let unknown_login = mgr.login(&ctx, auth("carol", "pw")).await.unwrap_err();
        assert_eq!(unknown_login.status(), StatusKind::Unauthenticated);
    }

    #[tokio::test]
    async fn store_errors_map_to_statuses() {
        let mgr = manager();
        let ctx = RequestContext::background();
        mgr.sign_up(&ctx, auth("dave", "hash:pw"), None).await.unwrap();

        let duplicate = mgr
            .sign_up(&ctx, auth("dave", "hash:other"), None)
            .await
            .unwrap_err();
        assert_eq!(duplicate.status(), StatusKind::AlreadyExists);

        let missing = mgr
            .delete_profile_by_id(&ctx, Uuid::new_v4())
            .await
            .unwrap_err();
        assert_eq!(missing.status(), StatusKind::NotFound);

        let cancelled_ctx = RequestContext::background();
        cancelled_ctx.cancel_handle().cancel();
        let cancelled = mgr
            .get_profile_by_id(&cancelled_ctx, Uuid::new_v4())
            .await
            .unwrap_err();
        assert_eq!(cancelled.status(), StatusKind::Cancelled);
    }

    #[tokio::test]
    async fn refresh_token_rotation_is_visible() {
        let mgr = manager();
        let ctx = RequestContext::background();
        let id = mgr.sign_up(&ctx, auth("erin", "hash:pw"), None).await.unwrap();

        mgr.save_refresh_token(
            &ctx,
            UpdateTokens {
                id,
                refresh_token: "tok-123".to_string(),
            },
        )
        .await
        .unwrap();

        let profile = mgr.get_profile_by_id(&ctx, id).await.unwrap();
        assert_eq!(profile.refresh_token(), "tok-123");
        assert_eq!(profile.password(), "hash:pw");
    }
}
