//! State Management Module
//!
//! The project aggregate, its field-level patches, the undo history, the
//! workflow tracker and snapshot migration.

pub mod history;
pub mod migration;
pub mod patch;
pub mod project;
pub mod workflow;

pub use history::{HistoryEntry, HistoryManager};
pub use migration::{load_snapshot, migrate_snapshot, CURRENT_SCHEMA_VERSION};
pub use patch::{FieldValue, ProjectField, ProjectPatch};
pub use project::{Project, DEFAULT_PROJECT_NAME};
pub use workflow::{
    GeneratedSegment, SegmentStatus, StagePayload, TranscriptSegment, WorkflowData,
    WorkflowTracker,
};
