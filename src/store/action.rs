//! Serializable editor actions.
//!
//! Every store operation has an action, so edits can be replayed from a file
//! or sent across a process boundary and applied with
//! [`ProjectStore::dispatch`](crate::store::ProjectStore::dispatch).

use serde::{Deserialize, Serialize};

use crate::state::{Project, StagePayload};
use crate::store::errors::NewEditorError;
use crate::store::view::ViewMode;
use crate::timeline::{
    ClipKind, ClipPatch, EffectPatch, MarkerPatch, NewAudioTrack, NewEffect, NewMarker,
    NewPrompt, NewTextElement, NewTrack, NewTranscription, NewVideoClip, PromptPatch, TrackPatch,
    TranscriptionPatch,
};

/// Top-level action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Action {
    Project(ProjectAction),
    Clip(ClipAction),
    Track(TrackAction),
    Effect(EffectAction),
    Marker(MarkerAction),
    Script(ScriptAction),
    Workflow(WorkflowAction),
    Session(SessionAction),
    Undo,
    Redo,
}

impl Action {
    /// Whether the action can change the project (as opposed to session state).
    pub fn is_project_edit(&self) -> bool {
        !matches!(self, Action::Session(_))
    }
}

/// Whole-project operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProjectAction {
    SetName(String),
    SetDuration(f64),
    /// Replace the project, clearing history.
    Import(Box<Project>),
    /// Start a new empty project under a fresh id.
    Reset,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ClipAction {
    AddAudioTrack(NewAudioTrack),
    AddVideoClip(NewVideoClip),
    AddTextElement(NewTextElement),
    /// Update a clip of any kind.
    Update { id: String, patch: ClipPatch },
    /// Update a clip only if it has the given kind.
    UpdateOfKind {
        kind: ClipKind,
        id: String,
        patch: ClipPatch,
    },
    Remove { id: String },
    RemoveOfKind { kind: ClipKind, id: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TrackAction {
    Add(NewTrack),
    Update { id: String, patch: TrackPatch },
    Remove { id: String },
    Reorder { from: usize, to: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EffectAction {
    Add(NewEffect),
    Update { id: String, patch: EffectPatch },
    Remove { id: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MarkerAction {
    Add(NewMarker),
    Update { id: String, patch: MarkerPatch },
    Remove { id: String },
    /// Swap in a new beat grid as one undoable edit; sections are kept.
    ReplaceBeats(Vec<NewMarker>),
    /// Swap in a new song structure as one undoable edit; beats are kept.
    ReplaceSections(Vec<NewMarker>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ScriptAction {
    AddPrompt(NewPrompt),
    UpdatePrompt { id: String, patch: PromptPatch },
    RemovePrompt { id: String },
    AddTranscription(NewTranscription),
    UpdateTranscription { id: String, patch: TranscriptionPatch },
    RemoveTranscription { id: String },
}

/// Pipeline progress. Step indices are not range-checked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WorkflowAction {
    SetCurrentStep(u32),
    MarkCompleted(u32),
    MarkIncomplete(u32),
    UpdateData { step: u32, payload: StagePayload },
}

/// Transient editor state. These never touch the project or its history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionAction {
    Select { id: String, additive: bool },
    Deselect { id: String },
    ClearSelection,
    Play,
    Pause,
    TogglePlayback,
    /// Move the playhead to an absolute time.
    Seek(f64),
    /// Advance the playhead by elapsed wall time, scaled by speed.
    Advance(f64),
    SetPlaybackSpeed(f64),
    SetViewMode(ViewMode),
    ZoomIn,
    ZoomOut,
    SetZoom(f64),
    /// Append to the error log; the store stamps the time.
    PushError(NewEditorError),
    ClearErrors,
}
