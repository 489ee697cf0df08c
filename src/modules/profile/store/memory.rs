//! A memory-backed implementation of the [ProfileStore]

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use uuid::Uuid;

use crate::modules::context::RequestContext;
use crate::modules::error::{ConstraintViolationError, ConstraintViolationType, InternalError};

use super::error::ProfileStoreError;
use super::{Profile, ProfileStore, UpdateTokens};

#[derive(Default, Clone)]
pub struct MemoryProfileStore {
    inner: Arc<Mutex<HashMap<Uuid, Profile>>>,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(
        &self,
        ctx: &RequestContext,
    ) -> Result<MutexGuard<'_, HashMap<Uuid, Profile>>, ProfileStoreError> {
        ctx.check()?;
        self.inner.lock().map_err(|_| {
            ProfileStoreError::Internal(InternalError::with_message(
                "Cannot access profile store: mutex lock poisoned".to_string(),
            ))
        })
    }
}

fn duplicate_login(operation: &str) -> ProfileStoreError {
    ProfileStoreError::ConstraintViolation(
        ConstraintViolationError::with_violation_type(ConstraintViolationType::Unique)
            .with_context(operation.to_string()),
    )
}

fn profile_not_found(operation: &str, id: &Uuid) -> ProfileStoreError {
    ProfileStoreError::NotFound(format!("{}: profile {} does not exist", operation, id))
}

impl ProfileStore for MemoryProfileStore {
    fn authenticate_by_login(
        &self,
        ctx: &RequestContext,
        login: &str,
    ) -> Result<(Uuid, String), ProfileStoreError> {
        let inner = self.lock(ctx)?;

        inner
            .values()
            .find(|profile| profile.login == login)
            .map(|profile| (profile.id, profile.password.clone()))
            .ok_or_else(|| {
                ProfileStoreError::NotFound(format!(
                    "authenticate_by_login: no profile with login {:?}",
                    login
                ))
            })
    }

    fn get_profile_by_id(
        &self,
        ctx: &RequestContext,
        id: &Uuid,
    ) -> Result<Profile, ProfileStoreError> {
        let inner = self.lock(ctx)?;

        inner
            .get(id)
            .cloned()
            .ok_or_else(|| profile_not_found("get_profile_by_id", id))
    }

    fn create_profile(
        &self,
        ctx: &RequestContext,
        profile: Profile,
    ) -> Result<(), ProfileStoreError> {
        let mut inner = self.lock(ctx)?;

        if inner.contains_key(&profile.id)
            || inner.values().any(|existing| existing.login == profile.login)
        {
            return Err(duplicate_login("create_profile"));
        }
        inner.insert(profile.id, profile);

        Ok(())
    }

    fn update_profile(
        &self,
        ctx: &RequestContext,
        profile: Profile,
    ) -> Result<(), ProfileStoreError> {
        let mut inner = self.lock(ctx)?;

        if !inner.contains_key(&profile.id) {
            return Err(profile_not_found("update_profile", &profile.id));
        }
        if inner
            .values()
            .any(|existing| existing.id != profile.id && existing.login == profile.login)
        {
            return Err(duplicate_login("update_profile"));
        }
        inner.insert(profile.id, profile);

        Ok(())
    }

    fn save_refresh_token(
        &self,
        ctx: &RequestContext,
        tokens: UpdateTokens,
    ) -> Result<(), ProfileStoreError> {
        let mut inner = self.lock(ctx)?;

        match inner.get_mut(&tokens.id) {
            Some(profile) => {
                profile.refresh_token = tokens.refresh_token;
                Ok(())
            }
            None => Err(profile_not_found("save_refresh_token", &tokens.id)),
        }
    }

    fn delete_profile_by_id(
        &self,
        ctx: &RequestContext,
        id: &Uuid,
    ) -> Result<(), ProfileStoreError> {
        let mut inner = self.lock(ctx)?;

        if inner.remove(id).is_some() {
            Ok(())
        } else {
            Err(profile_not_found("delete_profile_by_id", id))
        }
    }

    fn clone_box(&self) -> Box<dyn ProfileStore> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::context::ContextError;
    use crate::modules::profile::store::ProfileBuilder;

    fn profile(login: &str) -> Profile {
        ProfileBuilder::new()
            .with_id(Uuid::new_v4())
            .with_login(login.to_string())
            .with_password("ph1".to_string())
            .build()
            .expect("Unable to build profile")
    }

    #[test]
    fn duplicate_login_is_rejected_and_original_kept() {
        let store = MemoryProfileStore::new();
        let ctx = RequestContext::background();
        let original = profile("alice");
        store
            .create_profile(&ctx, original.clone())
            .expect("Unable to create profile");

        let err = store
            .create_profile(&ctx, profile("alice"))
            .expect_err("Duplicate login was accepted");
        assert!(err.is_conflict());
        assert_eq!(
            store.get_profile_by_id(&ctx, &original.id).unwrap(),
            original
        );
    }

    #[test]
    fn update_to_taken_login_is_rejected() {
        let store = MemoryProfileStore::new();
        let ctx = RequestContext::background();
        store.create_profile(&ctx, profile("alice")).unwrap();
        let mut bob = profile("bob");
        store.create_profile(&ctx, bob.clone()).unwrap();

        bob.login = "alice".to_string();
        assert!(store.update_profile(&ctx, bob).unwrap_err().is_conflict());
    }

    #[test]
    fn writes_to_missing_ids_are_not_found() {
        let store = MemoryProfileStore::new();
        let ctx = RequestContext::background();
        let missing = profile("ghost");

        assert!(store
            .update_profile(&ctx, missing.clone())
            .unwrap_err()
            .is_not_found());
        assert!(store
            .save_refresh_token(
                &ctx,
                UpdateTokens {
                    id: missing.id,
                    refresh_token: "tok".to_string(),
                },
            )
            .unwrap_err()
            .is_not_found());
        assert!(store
            .delete_profile_by_id(&ctx, &missing.id)
            .unwrap_err()
            .is_not_found());
        assert!(store
            .authenticate_by_login(&ctx, "ghost")
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn cancelled_context_is_refused() {
        let store = MemoryProfileStore::new();
        let ctx = RequestContext::background();
        ctx.cancel_handle().cancel();

        match store.create_profile(&ctx, profile("alice")) {
            Err(ProfileStoreError::Cancelled(ContextError::Cancelled)) => (),
            other => panic!("Expected cancellation, got {:?}", other),
        }
        assert!(store
            .authenticate_by_login(&RequestContext::background(), "alice")
            .unwrap_err()
            .is_not_found());
    }
}
