//! Project persistence.
//!
//! - [`LocalStore`]: synchronous key-value tier, written on every change.
//! - [`RemoteStore`]: async document tier, written after a debounce window
//!   when a user is signed in.
//! - [`PersistenceCoordinator`]: drives both tiers and resolves the project
//!   to open at startup.

pub mod auth;
pub mod coordinator;
pub mod debounce;
pub mod loader;
pub mod local;
pub mod memory;
pub mod remote;

pub use auth::{AuthProvider, SessionAuth};
pub use coordinator::{PersistenceCoordinator, PersistenceMode, PersistenceStatus, SaveStatus};
pub use debounce::Debouncer;
pub use loader::{LoadOutcome, LoadSource};
pub use local::{FileStore, LocalStore};
pub use memory::{MemoryRemoteStore, MemoryStore, MergeRecord};
pub use remote::{RemoteDocument, RemoteStore, OWNER_FIELD, UPDATED_FIELD};
