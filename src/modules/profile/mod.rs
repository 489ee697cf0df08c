//! Account profiles: the transactional store and the service layered over it.

mod profile_mgr;
pub mod store;

pub use profile_mgr::{
    PasswordVerifier, ProfileManager, ProfileService, ProfileServiceError, StatusKind,
};
pub use store::diesel::DieselProfileStore;
pub use store::memory::MemoryProfileStore;
pub use store::observer::{LogObserver, TransactionObserver};
pub use store::{Auth, Profile, ProfileBuilder, ProfileStore, ProfileStoreError, UpdateTokens};
