//! Clipdeck - timeline editor state engine
//!
//! Holds the in-memory state of a multimedia timeline project and keeps it
//! saved.
//!
//! # Architecture
//!
//! - [`timeline`]: clips, tracks, effects, markers and script items
//! - [`state`]: the [`Project`] aggregate, workflow progress, patches and
//!   history
//! - [`store`]: [`ProjectStore`], the single entry point for edits, with
//!   subscriptions and session state
//! - [`persistence`]: local snapshot on every change, debounced remote merge
//!   writes, and startup resolution

pub mod cli;
pub mod config;
pub mod error;
pub mod ids;
pub mod persistence;
pub mod state;
pub mod store;
pub mod timeline;

pub use config::EditorConfig;
pub use error::{ClipdeckError, Result};
pub use persistence::{PersistenceCoordinator, PersistenceStatus};
pub use state::Project;
pub use store::{Action, ProjectStore};
