//! Database-backed implementation of the [ProfileStore], powered by [diesel].
//!
//! Every call checks a connection out of the pool, begins a repeatable-read transaction, runs one
//! statement and commits or rolls back before the connection is returned.

pub mod models;
mod operations;
pub mod transaction;

use std::sync::Arc;

use ::diesel::r2d2::{ConnectionManager, Pool, R2D2Connection};
use parking_lot::RwLock;
use uuid::Uuid;

use crate::modules::context::RequestContext;
use crate::store::pool::ConnectionPool;

use super::observer::{LogObserver, TransactionObserver};
use super::{Profile, ProfileStore, ProfileStoreError, UpdateTokens};

use operations::{
    authenticate_by_login::ProfileStoreAuthenticateByLogin,
    create_profile::ProfileStoreCreateProfile, delete_profile::ProfileStoreDeleteProfile,
    get_profile::ProfileStoreGetProfile, save_refresh_token::ProfileStoreSaveRefreshToken,
    update_profile::ProfileStoreUpdateProfile, ProfileStoreOperations,
};
use transaction::{run_in_transaction, IsolationLevel, TransactionalConnection};

const ISOLATION: IsolationLevel = IsolationLevel::RepeatableRead;

#[derive(Clone, Copy)]
enum Access {
    Read,
    Write,
}

/// Manages creating, updating, and fetching profiles from the database
pub struct DieselProfileStore<C: R2D2Connection + 'static> {
    connection_pool: ConnectionPool<C>,
    observer: Arc<dyn TransactionObserver>,
}

impl<C: R2D2Connection + 'static> DieselProfileStore<C> {
    /// Creates a new DieselProfileStore
    ///
    /// # Arguments
    ///
    ///  * `connection_pool`: connection pool to the database
    pub fn new(connection_pool: Pool<ConnectionManager<C>>) -> Self {
        DieselProfileStore {
            connection_pool: connection_pool.into(),
            observer: Arc::new(LogObserver),
        }
    }

    /// Create a new `DieselProfileStore` with write exclusivity enabled.
    ///
    /// Write exclusivity is enforced by providing a connection pool that is wrapped in a
    /// [`RwLock`]. This ensures that there may be only one writer, but many readers.
    ///
    /// # Arguments
    ///
    ///  * `connection_pool`: read-write lock-guarded connection pool for the database
    pub fn new_with_write_exclusivity(
        connection_pool: Arc<RwLock<Pool<ConnectionManager<C>>>>,
    ) -> Self {
        Self {
            connection_pool: connection_pool.into(),
            observer: Arc::new(LogObserver),
        }
    }

    /// Replaces the default [`LogObserver`] that receives rollback and commit failures.
    pub fn with_observer(mut self, observer: Arc<dyn TransactionObserver>) -> Self {
        self.observer = observer;
        self
    }
}

impl<C> DieselProfileStore<C>
where
    C: R2D2Connection + TransactionalConnection,
{
    fn transact<T, F>(
        &self,
        ctx: &RequestContext,
        access: Access,
        operation: &str,
        statement: F,
    ) -> Result<T, ProfileStoreError>
    where
        F: FnOnce(&mut ProfileStoreOperations<'_, C>) -> Result<T, ProfileStoreError>,
    {
        let observer = &*self.observer;
        let run = |conn: &mut C| {
            run_in_transaction(conn, ctx, ISOLATION, operation, observer, |conn| {
                statement(&mut ProfileStoreOperations::new(conn))
            })
        };

        match access {
            Access::Read => self.connection_pool.execute_read(ctx, run),
            Access::Write => self.connection_pool.execute_write(ctx, run),
        }
    }

    fn boxed_clone(&self) -> Box<DieselProfileStore<C>> {
        Box::new(Self {
            connection_pool: self.connection_pool.clone(),
            observer: Arc::clone(&self.observer),
        })
    }
}

#[cfg(feature = "postgres")]
impl ProfileStore for DieselProfileStore<::diesel::pg::PgConnection> {
    fn authenticate_by_login(
        &self,
        ctx: &RequestContext,
        login: &str,
    ) -> Result<(Uuid, String), ProfileStoreError> {
        self.transact(ctx, Access::Read, "authenticate_by_login", |ops| {
            ops.authenticate_by_login(login)
        })
    }

    fn get_profile_by_id(
        &self,
        ctx: &RequestContext,
        id: &Uuid,
    ) -> Result<Profile, ProfileStoreError> {
        self.transact(ctx, Access::Read, "get_profile_by_id", |ops| {
            ops.get_profile_by_id(id)
        })
    }

    fn create_profile(
        &self,
        ctx: &RequestContext,
        profile: Profile,
    ) -> Result<(), ProfileStoreError> {
        self.transact(ctx, Access::Write, "create_profile", |ops| {
            ops.create_profile(profile)
        })
    }

    fn update_profile(
        &self,
        ctx: &RequestContext,
        profile: Profile,
    ) -> Result<(), ProfileStoreError> {
        self.transact(ctx, Access::Write, "update_profile", |ops| {
            ops.update_profile(profile)
        })
    }

    fn save_refresh_token(
        &self,
        ctx: &RequestContext,
        tokens: UpdateTokens,
    ) -> Result<(), ProfileStoreError> {
        self.transact(ctx, Access::Write, "save_refresh_token", |ops| {
            ops.save_refresh_token(tokens)
        })
    }

    fn delete_profile_by_id(
        &self,
        ctx: &RequestContext,
        id: &Uuid,
    ) -> Result<(), ProfileStoreError> {
        self.transact(ctx, Access::Write, "delete_profile_by_id", |ops| {
            ops.delete_profile_by_id(id)
        })
    }

    fn clone_box(&self) -> Box<dyn ProfileStore> {
        self.boxed_clone()
    }
}

#[cfg(feature = "sqlite")]
impl ProfileStore for DieselProfileStore<::diesel::sqlite::SqliteConnection> {
    fn authenticate_by_login(
        &self,
        ctx: &RequestContext,
        login: &str,
    ) -> Result<(Uuid, String), ProfileStoreError> {
        self.transact(ctx, Access::Read, "authenticate_by_login", |ops| {
            ops.authenticate_by_login(login)
        })
    }

    fn get_profile_by_id(
        &self,
        ctx: &RequestContext,
        id: &Uuid,
    ) -> Result<Profile, ProfileStoreError> {
        self.transact(ctx, Access::Read, "get_profile_by_id", |ops| {
            ops.get_profile_by_id(id)
        })
    }

    fn create_profile(
        &self,
        ctx: &RequestContext,
        profile: Profile,
    ) -> Result<(), ProfileStoreError> {
        self.transact(ctx, Access::Write, "create_profile", |ops| {
            ops.create_profile(profile)
        })
    }

    fn update_profile(
        &self,
        ctx: &RequestContext,
        profile: Profile,
    ) -> Result<(), ProfileStoreError> {
        self.transact(ctx, Access::Write, "update_profile", |ops| {
            ops.update_profile(profile)
        })
    }

    fn save_refresh_token(
        &self,
        ctx: &RequestContext,
        tokens: UpdateTokens,
    ) -> Result<(), ProfileStoreError> {
        self.transact(ctx, Access::Write, "save_refresh_token", |ops| {
            ops.save_refresh_token(tokens)
        })
    }

    fn delete_profile_by_id(
        &self,
        ctx: &RequestContext,
        id: &Uuid,
    ) -> Result<(), ProfileStoreError> {
        self.transact(ctx, Access::Write, "delete_profile_by_id", |ops| {
            ops.delete_profile_by_id(id)
        })
    }

    fn clone_box(&self) -> Box<dyn ProfileStore> {
        self.boxed_clone()
    }
}

#[cfg(all(test, feature = "sqlite"))]
mod tests {
    use ::diesel::sqlite::SqliteConnection;

    use super::*;
    use crate::modules::profile::store::ProfileBuilder;
    use crate::store::sqlite::create_sqlite_connection_pool;

    fn store() -> DieselProfileStore<SqliteConnection> {
        let pool =
            create_sqlite_connection_pool(":memory:").expect("Unable to create sqlite pool");
        DieselProfileStore::new(pool)
    }

    fn profile(login: &str) -> Profile {
        ProfileBuilder::new()
            .with_id(Uuid::new_v4())
            .with_login(login.to_string())
            .with_password(format!("{}-hash", login))
            .with_username(format!("{} display", login))
            .build()
            .expect("Unable to build profile")
    }

    #[test]
    fn store_transactions_are_repeatable_read() {
        assert_eq!(ISOLATION, IsolationLevel::RepeatableRead);
        assert_eq!(SqliteConnection::begin_sql(ISOLATION), "BEGIN");
    }

    #[test]
    fn profile_lifecycle() {
        let store = store();
        let ctx = RequestContext::background();
        let id = Uuid::new_v4();
        let alice = ProfileBuilder::new()
            .with_id(id)
            .with_login("alice".to_string())
            .with_password("ph1".to_string())
            .with_refresh_token("".to_string())
            .build()
            .expect("Unable to build profile");

        store
            .create_profile(&ctx, alice.clone())
            .expect("Unable to create profile");
        assert_eq!(store.get_profile_by_id(&ctx, &id).unwrap(), alice);

        store
            .save_refresh_token(
                &ctx,
                UpdateTokens {
                    id,
                    refresh_token: "tok-123".to_string(),
                },
            )
            .expect("Unable to save refresh token");
        let rotated = store.get_profile_by_id(&ctx, &id).unwrap();
        assert_eq!(rotated.refresh_token(), "tok-123");
        assert_eq!(
            Profile {
                refresh_token: String::new(),
                ..rotated
            },
            alice
        );

        store
            .delete_profile_by_id(&ctx, &id)
            .expect("Unable to delete profile");
        assert!(store
            .get_profile_by_id(&ctx, &id)
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn authenticate_returns_stored_credentials() {
        let store = store();
        let ctx = RequestContext::background();
        let bob = profile("bob");
        store.create_profile(&ctx, bob.clone()).unwrap();

        assert_eq!(
            store.authenticate_by_login(&ctx, "bob").unwrap(),
            (bob.id, "bob-hash".to_string())
        );
        assert!(store
            .authenticate_by_login(&ctx, "carol")
            .unwrap_err()
            .is_not_found());
        assert!(store
            .authenticate_by_login(&ctx, "")
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn missing_ids_are_not_found() {
        let store = store();
        let ctx = RequestContext::background();
        let ghost = profile("ghost");

        assert!(store
            .get_profile_by_id(&ctx, &ghost.id)
            .unwrap_err()
            .is_not_found());
        assert!(store
            .update_profile(&ctx, ghost.clone())
            .unwrap_err()
            .is_not_found());
        assert!(store
            .save_refresh_token(
                &ctx,
                UpdateTokens {
                    id: ghost.id,
                    refresh_token: "tok".to_string(),
                },
            )
            .unwrap_err()
            .is_not_found());
        assert!(store
            .delete_profile_by_id(&ctx, &ghost.id)
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn duplicate_login_or_id_conflicts() {
        let store = store();
        let ctx = RequestContext::background();
        let original = profile("dave");
        store.create_profile(&ctx, original.clone()).unwrap();

        let same_login = profile("dave");
        assert!(store
            .create_profile(&ctx, same_login)
            .unwrap_err()
            .is_conflict());

        let same_id = Profile {
            login: "someone-else".to_string(),
            ..original.clone()
        };
        assert!(store.create_profile(&ctx, same_id).unwrap_err().is_conflict());

        assert_eq!(store.get_profile_by_id(&ctx, &original.id).unwrap(), original);
    }

    #[test]
    fn update_replaces_all_mutable_fields() {
        let store = store();
        let ctx = RequestContext::background();
        let erin = profile("erin");
        store.create_profile(&ctx, erin.clone()).unwrap();

        let replaced = Profile {
            login: "erin2".to_string(),
            password: "new-hash".to_string(),
            refresh_token: "tok-9".to_string(),
            username: None,
            ..erin.clone()
        };
        store.update_profile(&ctx, replaced.clone()).unwrap();

        assert_eq!(store.get_profile_by_id(&ctx, &erin.id).unwrap(), replaced);
        assert!(store
            .authenticate_by_login(&ctx, "erin")
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn update_to_taken_login_conflicts() {
        let store = store();
        let ctx = RequestContext::background();
        store.create_profile(&ctx, profile("frank")).unwrap();
        let grace = profile("grace");
        store.create_profile(&ctx, grace.clone()).unwrap();

        let err = store
            .update_profile(
                &ctx,
                Profile {
                    login: "frank".to_string(),
                    ..grace.clone()
                },
            )
            .unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(store.get_profile_by_id(&ctx, &grace.id).unwrap(), grace);
    }

    #[test]
    fn cancelled_context_is_refused_before_checkout() {
        let store = store();
        let ctx = RequestContext::background();
        ctx.cancel_handle().cancel();
        let heidi = profile("heidi");

        assert!(matches!(
            store.create_profile(&ctx, heidi.clone()),
            Err(ProfileStoreError::Cancelled(_))
        ));
        assert!(store
            .get_profile_by_id(&RequestContext::background(), &heidi.id)
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn boxed_clone_shares_the_pool() {
        let store = store();
        let ctx = RequestContext::background();
        let boxed: Box<dyn ProfileStore> = store.clone_box();
        let ivan = profile("ivan");

        boxed.create_profile(&ctx, ivan.clone()).unwrap();
        assert_eq!(store.get_profile_by_id(&ctx, &ivan.id).unwrap(), ivan);
    }
}
