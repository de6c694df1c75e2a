//! Project Store
//!
//! Aggregate root owning the [`Project`], its undo history and the transient
//! session state (selection, playback clock, view). All edits go through
//! this type and run synchronously on the caller's thread.
//! Session state also carries the editor's error log.
//!
//! Every edit works on a copy of the project: the closure mutates the copy,
//! the copy is diffed against the current project, and only a non-empty
//! diff is committed, recorded in history and announced to subscribers.
//! A failed validation therefore leaves the project untouched.

pub mod action;
pub mod errors;
pub mod playback;
pub mod selection;
pub mod view;

use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::config::HistoryConfig;
use crate::error::{ClipdeckError, Result};
use crate::ids::IdGenerator;
use crate::state::{HistoryManager, Project, ProjectPatch, StagePayload};
use crate::timeline::{
    track, Clip, ClipKind, ClipPatch, Effect, EffectPatch, Marker, MarkerKind, MarkerPatch,
    NewAudioTrack, NewEffect, NewMarker, NewPrompt, NewTextElement, NewTrack, NewTranscription,
    NewVideoClip, PromptPatch, TrackPatch, TranscriptionPatch,
};

pub use action::{
    Action, ClipAction, EffectAction, MarkerAction, ProjectAction, ScriptAction, SessionAction,
    TrackAction, WorkflowAction,
};
pub use errors::{EditorError, ErrorLog, NewEditorError};
pub use playback::Playback;
pub use selection::Selection;
pub use view::{View, ViewMode};

/// Transient editor state. Never persisted, never part of history.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub selection: Selection,
    pub playback: Playback,
    pub view: View,
    pub errors: ErrorLog,
}

/// Everything a view needs to render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorState {
    pub project: Project,
    pub session: SessionState,
}

/// Handle returned by [`ProjectStore::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

/// What a notification is about.
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    /// An edit was committed.
    Edit { description: String },
    Undo { description: String },
    Redo { description: String },
    /// The project was replaced wholesale (import or reset).
    Replaced,
    /// Only session state changed.
    Session,
}

impl Change {
    /// Whether the project itself changed.
    pub fn touches_project(&self) -> bool {
        !matches!(self, Change::Session)
    }
}

/// Notification passed to subscribers.
#[derive(Debug)]
pub struct StoreEvent<'a> {
    pub change: &'a Change,
    pub state: &'a EditorState,
}

impl StoreEvent<'_> {
    pub fn project(&self) -> &Project {
        &self.state.project
    }
}

/// Subscriber callback. Runs synchronously inside the edit that fired it.
pub type Listener = Box<dyn FnMut(&StoreEvent<'_>)>;

/// Aggregate root of the editor.
pub struct ProjectStore {
    state: EditorState,
    history: HistoryManager,
    ids: IdGenerator,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_subscription: u64,
}

impl Default for ProjectStore {
    fn default() -> Self {
        Self::new(&HistoryConfig::default())
    }
}

impl std::fmt::Debug for ProjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProjectStore")
            .field("project", &self.state.project.id)
            .field("history", &self.history.position())
            .field("history_limit", &self.history.max_entries())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl ProjectStore {
    /// Create a store holding a fresh, empty project.
    pub fn new(config: &HistoryConfig) -> Self {
        let mut ids = IdGenerator::new();
        let project = Project::new(ids.next("project"), Utc::now());
        Self::assemble(project, ids, config)
    }

    /// Create a store around an existing project (e.g. one restored at
    /// startup). History starts empty, rooted at that project.
    pub fn from_project(project: Project, config: &HistoryConfig) -> Result<Self> {
        project.validate()?;
        let mut ids = IdGenerator::new();
        reserve_ids(&mut ids, &project);
        Ok(Self::assemble(project, ids, config))
    }

    fn assemble(project: Project, ids: IdGenerator, config: &HistoryConfig) -> Self {
        let history = HistoryManager::new(&project, config.max_entries);
        Self {
            state: EditorState {
                project,
                session: SessionState::default(),
            },
            history,
            ids,
            listeners: Vec::new(),
            next_subscription: 0,
        }
    }

    /// Project plus session state, as handed to subscribers.
    pub fn state(&self) -> &EditorState {
        &self.state
    }

    pub fn project(&self) -> &Project {
        &self.state.project
    }

    pub fn session(&self) -> &SessionState {
        &self.state.session
    }

    /// Undo history of the current project.
    pub fn history(&self) -> &HistoryManager {
        &self.history
    }

    // ------------------------------------------------------------------
    // Subscriptions
    // ------------------------------------------------------------------

    /// Register a listener called after every committed change.
    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&StoreEvent<'_>) + 'static,
    {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Returns false if the subscription was already gone.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let len = self.listeners.len();
        self.listeners.retain(|(existing, _)| *existing != id);
        self.listeners.len() != len
    }

    fn notify(&mut self, change: Change) {
        let event = StoreEvent {
            change: &change,
            state: &self.state,
        };
        for (_, listener) in self.listeners.iter_mut() {
            listener(&event);
        }
    }

    // ------------------------------------------------------------------
    // Commit machinery
    // ------------------------------------------------------------------

    fn edit<T, F>(&mut self, description: &str, f: F) -> Result<T>
    where
        F: FnOnce(&mut Project, &mut IdGenerator, DateTime<Utc>) -> Result<T>,
    {
        let mut draft = self.state.project.clone();
        let output = f(&mut draft, &mut self.ids, Utc::now())?;
        self.commit(draft, description);
        Ok(output)
    }

    fn edit_with<T, F>(&mut self, description: &str, f: F) -> T
    where
        F: FnOnce(&mut Project) -> T,
    {
        let mut draft = self.state.project.clone();
        let output = f(&mut draft);
        self.commit(draft, description);
        output
    }

    fn commit(&mut self, mut draft: Project, description: &str) -> bool {
        let patch = ProjectPatch::diff(&self.state.project, &draft);
        if patch.is_empty() {
            return false;
        }
        draft.last_modified = Utc::now();
        self.state.project = draft;
        self.history.record(patch, description);
        self.sync_session();
        debug!("Committed '{}'", description);
        self.notify(Change::Edit {
            description: description.to_string(),
        });
        true
    }

    /// Keep session state consistent with the project after it changed.
    fn sync_session(&mut self) {
        let end = self.state.project.timeline_end();
        let session = &mut self.state.session;
        session.selection.prune(&self.state.project);
        session.playback.clamp_to(end);
    }

    fn session_changed(&mut self, changed: bool) -> bool {
        if changed {
            self.notify(Change::Session);
        }
        changed
    }

    // ------------------------------------------------------------------
    // Project
    // ------------------------------------------------------------------

    /// Rename the project. Returns false if the name is unchanged.
    pub fn set_name(&mut self, name: impl Into<String>) -> bool {
        let name = name.into();
        self.edit_with("Rename project", |project| {
            let changed = project.name != name;
            project.name = name;
            changed
        })
    }

    /// Set the nominal duration. Must be finite and ≥ 0.
    pub fn set_duration(&mut self, duration: f64) -> Result<bool> {
        if !duration.is_finite() || duration < 0.0 {
            return Err(ClipdeckError::InvalidDuration { duration });
        }
        Ok(self.edit_with("Set duration", |project| {
            let changed = project.duration != duration;
            project.duration = duration;
            changed
        }))
    }

    /// Replace the project wholesale. Bypasses history; the log is rebased on
    /// the imported project.
    pub fn import_project(&mut self, project: Project) -> Result<()> {
        if project.id.trim().is_empty() {
            return Err(ClipdeckError::InvalidParameter {
                name: "id",
                reason: "imported project has no id".to_string(),
            });
        }
        project.validate()?;
        reserve_ids(&mut self.ids, &project);
        info!("Importing project {} ({})", project.id, project.name);

        self.history.reset(&project);
        self.state.project = project;
        self.sync_session();
        self.notify(Change::Replaced);
        Ok(())
    }

    /// A copy of the current project.
    pub fn export_project(&self) -> Project {
        self.state.project.clone()
    }

    /// Start over with an empty project under a new id. History and session
    /// state are cleared.
    pub fn reset_project(&mut self) {
        let project = Project::new(self.ids.next("project"), Utc::now());
        info!("Resetting to new project {}", project.id);
        self.history.reset(&project);
        self.state.project = project;
        self.state.session = SessionState::default();
        self.notify(Change::Replaced);
    }

    // ------------------------------------------------------------------
    // History
    // ------------------------------------------------------------------

    /// Revert the latest applied edit. Returns false at the start of history.
    /// Selection entries whose entity disappeared are dropped and the
    /// playhead is clamped to the new timeline end.
    pub fn undo(&mut self) -> bool {
        let Some(description) = self.history.undo(&mut self.state.project) else {
            return false;
        };
        self.state.project.last_modified = Utc::now();
        self.sync_session();
        self.notify(Change::Undo { description });
        true
    }

    /// Re-apply the most recently undone edit.
    pub fn redo(&mut self) -> bool {
        let Some(description) = self.history.redo(&mut self.state.project) else {
            return false;
        };
        self.state.project.last_modified = Utc::now();
        self.sync_session();
        self.notify(Change::Redo { description });
        true
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    // ------------------------------------------------------------------
    // Clips
    // ------------------------------------------------------------------

    /// Add an audio track and register its media as an asset. Returns the
    /// new clip id.
    pub fn add_audio_track(&mut self, spec: NewAudioTrack) -> Result<String> {
        self.edit("Add audio track", |project, ids, now| {
            let clip = spec.into_clip(ids.next(ClipKind::Audio.id_prefix()), now)?;
            insert_clip(project, ids, now, clip)
        })
    }

    /// Add a video clip. `start_time < end_time` is required.
    pub fn add_video_clip(&mut self, spec: NewVideoClip) -> Result<String> {
        self.edit("Add video clip", |project, ids, now| {
            let clip = spec.into_clip(ids.next(ClipKind::Video.id_prefix()), now)?;
            insert_clip(project, ids, now, clip)
        })
    }

    pub fn add_text_element(&mut self, spec: NewTextElement) -> Result<String> {
        self.edit("Add text element", |project, ids, now| {
            let clip = spec.into_clip(ids.next(ClipKind::Text.id_prefix()), now)?;
            insert_clip(project, ids, now, clip)
        })
    }

    /// Merge `patch` into the clip with `id`. Returns false for an unknown id.
    pub fn update_clip(&mut self, id: &str, patch: &ClipPatch) -> Result<bool> {
        self.update_clip_matching(id, None, patch)
    }

    /// Like [`update_clip`](Self::update_clip), but a clip of another kind
    /// counts as unknown.
    pub fn update_clip_of_kind(
        &mut self,
        kind: ClipKind,
        id: &str,
        patch: &ClipPatch,
    ) -> Result<bool> {
        self.update_clip_matching(id, Some(kind), patch)
    }

    pub fn update_audio_track(&mut self, id: &str, patch: &ClipPatch) -> Result<bool> {
        self.update_clip_of_kind(ClipKind::Audio, id, patch)
    }

    pub fn update_video_clip(&mut self, id: &str, patch: &ClipPatch) -> Result<bool> {
        self.update_clip_of_kind(ClipKind::Video, id, patch)
    }

    pub fn update_text_element(&mut self, id: &str, patch: &ClipPatch) -> Result<bool> {
        self.update_clip_of_kind(ClipKind::Text, id, patch)
    }

    fn update_clip_matching(
        &mut self,
        id: &str,
        kind: Option<ClipKind>,
        patch: &ClipPatch,
    ) -> Result<bool> {
        let Some(current) = self.state.project.clips.get(id) else {
            return Ok(false);
        };
        if kind.is_some_and(|kind| current.kind() != kind) {
            return Ok(false);
        }
        let description = format!("Update {}", current.kind());

        self.edit(&description, |project, ids, now| {
            let Some(mut clip) = project.clips.get(id).cloned() else {
                return Ok(false);
            };
            patch.apply(&mut clip)?;
            clip.validate()?;
            project.check_track(clip.track_id.as_deref())?;
            if let Some((kind, url)) = clip.media_source() {
                let url = url.to_string();
                project.ensure_asset(kind, &url, ids, now);
            }
            Ok(project.clips.replace(clip))
        })
    }

    /// Remove a clip (and effects attached to it). Unknown ids are ignored.
    pub fn remove_clip(&mut self, id: &str) -> bool {
        self.edit_with("Remove clip", |project| project.remove_clip(id))
    }

    /// Remove a clip only if it has the given kind.
    pub fn remove_clip_of_kind(&mut self, kind: ClipKind, id: &str) -> bool {
        match self.state.project.clips.get(id) {
            Some(clip) if clip.kind() == kind => self.remove_clip(id),
            _ => false,
        }
    }

    /// Remove an audio track. Ids of other clip kinds are ignored.
    pub fn remove_audio_track(&mut self, id: &str) -> bool {
        self.remove_clip_of_kind(ClipKind::Audio, id)
    }

    pub fn remove_video_clip(&mut self, id: &str) -> bool {
        self.remove_clip_of_kind(ClipKind::Video, id)
    }

    pub fn remove_text_element(&mut self, id: &str) -> bool {
        self.remove_clip_of_kind(ClipKind::Text, id)
    }

    /// Clips overlapping `[start, end]`, in insertion order. An open-ended
    /// audio track counts as the instant at its start.
    pub fn clips_in_range(&self, start: f64, end: f64) -> Result<Vec<&Clip>> {
        self.state.project.clips_in_range(start, end)
    }

    /// Clips placed on `track_id`.
    pub fn clips_in_track(&self, track_id: &str) -> Vec<&Clip> {
        self.state.project.clips.in_track(track_id)
    }

    pub fn effects_in_range(&self, start: f64, end: f64) -> Result<Vec<&Effect>> {
        self.state.project.effects_in_range(start, end)
    }

    /// Beat markers at, and section markers overlapping, `[start, end]`.
    pub fn markers_in_range(&self, start: f64, end: f64) -> Result<Vec<&Marker>> {
        self.state.project.markers_in_range(start, end)
    }

    /// Nominal duration or the latest clip/effect end, whichever is later.
    pub fn timeline_end(&self) -> f64 {
        self.state.project.timeline_end()
    }

    // ------------------------------------------------------------------
    // Tracks
    // ------------------------------------------------------------------

    /// Append a track at the bottom of the track list.
    pub fn add_track(&mut self, spec: NewTrack) -> Result<String> {
        self.edit("Add track", |project, ids, _| {
            let track = spec.into_track(ids.next("track"), project.tracks.len())?;
            let id = track.id.clone();
            project.tracks.push(track);
            Ok(id)
        })
    }

    pub fn update_track(&mut self, id: &str, patch: &TrackPatch) -> Result<bool> {
        self.edit("Update track", |project, _, _| {
            let Some(track) = project.tracks.iter_mut().find(|track| track.id == id) else {
                return Ok(false);
            };
            patch.apply(track)?;
            Ok(true)
        })
    }

    /// Remove a track together with its clips and the effects targeting it.
    pub fn remove_track(&mut self, id: &str) -> bool {
        self.edit_with("Remove track", |project| project.remove_track(id))
    }

    /// Move the track at index `from` to index `to`. Both must be in bounds.
    pub fn reorder_tracks(&mut self, from: usize, to: usize) -> Result<bool> {
        self.edit("Reorder tracks", |project, _, _| {
            track::reorder(&mut project.tracks, from, to)?;
            Ok(from != to)
        })
    }

    // ------------------------------------------------------------------
    // Effects
    // ------------------------------------------------------------------

    /// Add an effect. A clip or track target must exist.
    pub fn add_effect(&mut self, spec: NewEffect) -> Result<String> {
        self.edit("Add effect", |project, ids, _| {
            let effect = spec.into_effect(ids.next("effect"))?;
            project.check_target(&effect.target)?;
            let id = effect.id.clone();
            project.effects.push(effect);
            Ok(id)
        })
    }

    /// Patch an effect. The patch may not change the effect kind, and a new
    /// target must exist.
    pub fn update_effect(&mut self, id: &str, patch: &EffectPatch) -> Result<bool> {
        self.edit("Update effect", |project, _, _| {
            let Some(index) = project.effects.iter().position(|effect| effect.id == id) else {
                return Ok(false);
            };
            let mut effect = project.effects[index].clone();
            patch.apply(&mut effect)?;
            effect.validate()?;
            project.check_target(&effect.target)?;
            project.effects[index] = effect;
            Ok(true)
        })
    }

    pub fn remove_effect(&mut self, id: &str) -> bool {
        self.edit_with("Remove effect", |project| {
            let len = project.effects.len();
            project.effects.retain(|effect| effect.id != id);
            project.effects.len() != len
        })
    }

    // ------------------------------------------------------------------
    // Markers
    // ------------------------------------------------------------------

    pub fn add_marker(&mut self, spec: NewMarker) -> Result<String> {
        self.edit("Add marker", |project, ids, _| {
            let prefix = spec.id_prefix();
            let marker = spec.into_marker(ids.next(prefix))?;
            let id = marker.id.clone();
            project.markers.push(marker);
            Ok(id)
        })
    }

    /// Patch a marker. A beat stays a beat and a section stays a section.
    pub fn update_marker(&mut self, id: &str, patch: &MarkerPatch) -> Result<bool> {
        self.edit("Update marker", |project, _, _| {
            let Some(index) = project.markers.iter().position(|marker| marker.id == id) else {
                return Ok(false);
            };
            let mut marker = project.markers[index].clone();
            patch.apply(&mut marker)?;
            marker.validate()?;
            project.markers[index] = marker;
            Ok(true)
        })
    }

    pub fn remove_marker(&mut self, id: &str) -> bool {
        self.edit_with("Remove marker", |project| {
            let len = project.markers.len();
            project.markers.retain(|marker| marker.id != id);
            project.markers.len() != len
        })
    }

    /// Replace every beat marker (e.g. after re-running beat detection).
    /// Section markers are kept. Returns the new beat ids.
    pub fn replace_beats(&mut self, beats: Vec<NewMarker>) -> Result<Vec<String>> {
        self.edit("Replace beats", |project, ids, _| {
            let mut markers: Vec<_> = project
                .markers
                .iter()
                .filter(|marker| !marker.is_beat())
                .cloned()
                .collect();
            let mut created = Vec::with_capacity(beats.len());
            for beat in beats {
                if !matches!(beat.kind, MarkerKind::Beat { .. }) {
                    return Err(ClipdeckError::InvalidParameter {
                        name: "beats",
                        reason: "only beat markers can replace beats".to_string(),
                    });
                }
                let marker = beat.into_marker(ids.next("beat"))?;
                created.push(marker.id.clone());
                markers.push(marker);
            }
            project.markers = markers;
            Ok(created)
        })
    }

    /// Replace every section marker, keeping beats. Returns the new ids.
    pub fn replace_sections(&mut self, sections: Vec<NewMarker>) -> Result<Vec<String>> {
        self.edit("Replace sections", |project, ids, _| {
            let mut markers: Vec<_> = project
                .markers
                .iter()
                .filter(|marker| marker.is_beat())
                .cloned()
                .collect();
            let mut created = Vec::with_capacity(sections.len());
            for section in sections {
                if !matches!(section.kind, MarkerKind::Section { .. }) {
                    return Err(ClipdeckError::InvalidParameter {
                        name: "sections",
                        reason: "only section markers can replace sections".to_string(),
                    });
                }
                let marker = section.into_marker(ids.next("section"))?;
                created.push(marker.id.clone());
                markers.push(marker);
            }
            project.markers = markers;
            Ok(created)
        })
    }

    // ------------------------------------------------------------------
    // Prompts and transcriptions
    // ------------------------------------------------------------------

    pub fn add_prompt(&mut self, spec: NewPrompt) -> Result<String> {
        self.edit("Add prompt", |project, ids, _| {
            let prompt = spec.into_prompt(ids.next("prompt"))?;
            let id = prompt.id.clone();
            project.prompts.push(prompt);
            Ok(id)
        })
    }

    /// Patch a prompt, e.g. to attach the generated image url.
    pub fn update_prompt(&mut self, id: &str, patch: &PromptPatch) -> Result<bool> {
        self.edit("Update prompt", |project, _, _| {
            let Some(index) = project.prompts.iter().position(|prompt| prompt.id == id) else {
                return Ok(false);
            };
            let mut prompt = project.prompts[index].clone();
            patch.apply(&mut prompt);
            prompt.validate()?;
            project.prompts[index] = prompt;
            Ok(true)
        })
    }

    pub fn remove_prompt(&mut self, id: &str) -> bool {
        self.edit_with("Remove prompt", |project| {
            let len = project.prompts.len();
            project.prompts.retain(|prompt| prompt.id != id);
            project.prompts.len() != len
        })
    }

    pub fn add_transcription(&mut self, spec: NewTranscription) -> Result<String> {
        self.edit("Add transcription", |project, ids, _| {
            let line = spec.into_transcription(ids.next("transcription"))?;
            let id = line.id.clone();
            project.transcriptions.push(line);
            Ok(id)
        })
    }

    pub fn update_transcription(&mut self, id: &str, patch: &TranscriptionPatch) -> Result<bool> {
        self.edit("Update transcription", |project, _, _| {
            let Some(index) = project.transcriptions.iter().position(|line| line.id == id) else {
                return Ok(false);
            };
            let mut line = project.transcriptions[index].clone();
            patch.apply(&mut line);
            line.validate()?;
            project.transcriptions[index] = line;
            Ok(true)
        })
    }

    pub fn remove_transcription(&mut self, id: &str) -> bool {
        self.edit_with("Remove transcription", |project| {
            let len = project.transcriptions.len();
            project.transcriptions.retain(|line| line.id != id);
            project.transcriptions.len() != len
        })
    }

    // ------------------------------------------------------------------
    // Workflow
    // ------------------------------------------------------------------

    /// Move the workflow cursor. Steps are not required to be completed in
    /// order.
    pub fn set_current_step(&mut self, step: u32) -> bool {
        self.edit_with("Set current step", |project| {
            let changed = project.workflow.current_step != step;
            project.workflow.set_current_step(step);
            changed
        })
    }

    pub fn mark_step_completed(&mut self, step: u32) -> bool {
        self.edit_with("Complete step", |project| {
            project.workflow.mark_completed(step)
        })
    }

    pub fn mark_step_incomplete(&mut self, step: u32) -> bool {
        self.edit_with("Reopen step", |project| {
            project.workflow.mark_incomplete(step)
        })
    }

    pub fn is_step_completed(&self, step: u32) -> bool {
        self.state.project.workflow.is_completed(step)
    }

    /// Completed steps in ascending order.
    pub fn completed_steps(&self) -> Vec<u32> {
        self.state.project.workflow.completed()
    }

    /// Store the output of a pipeline stage under its step index.
    pub fn update_workflow_data(&mut self, step: u32, payload: StagePayload) -> Result<bool> {
        payload.validate()?;
        Ok(self.edit_with("Update workflow data", |project| {
            let changed = project.workflow_data.get(&step) != Some(&payload);
            project.workflow_data.insert(step, payload);
            changed
        }))
    }

    // ------------------------------------------------------------------
    // Session
    // ------------------------------------------------------------------

    /// Select an entity. Ids not present in the project are ignored.
    pub fn select(&mut self, id: &str, additive: bool) -> bool {
        if !self.state.project.contains_entity(id) {
            return false;
        }
        let changed = self.state.session.selection.select(id, additive);
        self.session_changed(changed)
    }

    pub fn deselect(&mut self, id: &str) -> bool {
        let changed = self.state.session.selection.deselect(id);
        self.session_changed(changed)
    }

    pub fn clear_selection(&mut self) -> bool {
        let changed = self.state.session.selection.clear();
        self.session_changed(changed)
    }

    /// Start playback. At the end of the timeline the playhead rewinds to 0.
    pub fn play(&mut self) -> bool {
        let end = self.timeline_end();
        let changed = self.state.session.playback.play(end);
        self.session_changed(changed)
    }

    pub fn pause(&mut self) -> bool {
        let changed = self.state.session.playback.pause();
        self.session_changed(changed)
    }

    pub fn toggle_playback(&mut self) -> bool {
        let end = self.timeline_end();
        let changed = self.state.session.playback.toggle(end);
        self.session_changed(changed)
    }

    /// Move the playhead, clamped to `[0, timeline_end]`.
    pub fn seek(&mut self, time: f64) -> bool {
        let end = self.timeline_end();
        let changed = self.state.session.playback.seek(time, end);
        self.session_changed(changed)
    }

    /// Advance the playback clock by `delta` seconds of wall time.
    pub fn advance(&mut self, delta: f64) -> bool {
        let end = self.timeline_end();
        let changed = self.state.session.playback.advance(delta, end);
        self.session_changed(changed)
    }

    /// Playback rate multiplier; must be finite and positive.
    pub fn set_playback_speed(&mut self, speed: f64) -> Result<bool> {
        let changed = self.state.session.playback.set_speed(speed)?;
        Ok(self.session_changed(changed))
    }

    pub fn set_view_mode(&mut self, mode: ViewMode) -> bool {
        let changed = self.state.session.view.set_mode(mode);
        self.session_changed(changed)
    }

    pub fn zoom_in(&mut self) -> bool {
        let changed = self.state.session.view.zoom_in();
        self.session_changed(changed)
    }

    pub fn zoom_out(&mut self) -> bool {
        let changed = self.state.session.view.zoom_out();
        self.session_changed(changed)
    }

    /// Set the zoom factor, clamped to the supported range.
    pub fn set_zoom(&mut self, zoom: f64) -> Result<bool> {
        let changed = self.state.session.view.set_zoom(zoom)?;
        Ok(self.session_changed(changed))
    }

    /// Append to the error log. Always notifies.
    pub fn push_error(&mut self, error: impl Into<NewEditorError>) {
        let error = error.into();
        debug!("Logged editor error {}: {}", error.code, error.message);
        self.state.session.errors.push(error, Utc::now());
        self.notify(Change::Session);
    }

    /// Empty the error log. Returns false if it was already empty.
    pub fn clear_errors(&mut self) -> bool {
        let changed = self.state.session.errors.clear();
        self.session_changed(changed)
    }

    /// Logged errors, oldest first.
    pub fn errors(&self) -> &[EditorError] {
        self.state.session.errors.entries()
    }

    // ------------------------------------------------------------------
    // Dispatch
    // ------------------------------------------------------------------

    /// Apply an action. Returns the id of the entity an `add` action created.
    pub fn dispatch(&mut self, action: Action) -> Result<Option<String>> {
        let created = match action {
            Action::Project(action) => {
                match action {
                    ProjectAction::SetName(name) => {
                        self.set_name(name);
                    }
                    ProjectAction::SetDuration(duration) => {
                        self.set_duration(duration)?;
                    }
                    ProjectAction::Import(project) => self.import_project(*project)?,
                    ProjectAction::Reset => self.reset_project(),
                }
                None
            }
            Action::Clip(action) => match action {
                ClipAction::AddAudioTrack(spec) => Some(self.add_audio_track(spec)?),
                ClipAction::AddVideoClip(spec) => Some(self.add_video_clip(spec)?),
                ClipAction::AddTextElement(spec) => Some(self.add_text_element(spec)?),
                ClipAction::Update { id, patch } => {
                    self.update_clip(&id, &patch)?;
                    None
                }
                ClipAction::UpdateOfKind { kind, id, patch } => {
                    self.update_clip_of_kind(kind, &id, &patch)?;
                    None
                }
                ClipAction::Remove { id } => {
                    self.remove_clip(&id);
                    None
                }
                ClipAction::RemoveOfKind { kind, id } => {
                    self.remove_clip_of_kind(kind, &id);
                    None
                }
            },
            Action::Track(action) => match action {
                TrackAction::Add(spec) => Some(self.add_track(spec)?),
                TrackAction::Update { id, patch } => {
                    self.update_track(&id, &patch)?;
                    None
                }
                TrackAction::Remove { id } => {
                    self.remove_track(&id);
                    None
                }
                TrackAction::Reorder { from, to } => {
                    self.reorder_tracks(from, to)?;
                    None
                }
            },
            Action::Effect(action) => match action {
                EffectAction::Add(spec) => Some(self.add_effect(spec)?),
                EffectAction::Update { id, patch } => {
                    self.update_effect(&id, &patch)?;
                    None
                }
                EffectAction::Remove { id } => {
                    self.remove_effect(&id);
                    None
                }
            },
            Action::Marker(action) => match action {
                MarkerAction::Add(spec) => Some(self.add_marker(spec)?),
                MarkerAction::Update { id, patch } => {
                    self.update_marker(&id, &patch)?;
                    None
                }
                MarkerAction::Remove { id } => {
                    self.remove_marker(&id);
                    None
                }
                MarkerAction::ReplaceBeats(beats) => {
                    self.replace_beats(beats)?;
                    None
                }
                MarkerAction::ReplaceSections(sections) => {
                    self.replace_sections(sections)?;
                    None
                }
            },
            Action::Script(action) => match action {
                ScriptAction::AddPrompt(spec) => Some(self.add_prompt(spec)?),
                ScriptAction::UpdatePrompt { id, patch } => {
                    self.update_prompt(&id, &patch)?;
                    None
                }
                ScriptAction::RemovePrompt { id } => {
                    self.remove_prompt(&id);
                    None
                }
                ScriptAction::AddTranscription(spec) => Some(self.add_transcription(spec)?),
                ScriptAction::UpdateTranscription { id, patch } => {
                    self.update_transcription(&id, &patch)?;
                    None
                }
                ScriptAction::RemoveTranscription { id } => {
                    self.remove_transcription(&id);
                    None
                }
            },
            Action::Workflow(action) => {
                match action {
                    WorkflowAction::SetCurrentStep(step) => {
                        self.set_current_step(step);
                    }
                    WorkflowAction::MarkCompleted(step) => {
                        self.mark_step_completed(step);
                    }
                    WorkflowAction::MarkIncomplete(step) => {
                        self.mark_step_incomplete(step);
                    }
                    WorkflowAction::UpdateData { step, payload } => {
                        self.update_workflow_data(step, payload)?;
                    }
                }
                None
            }
            Action::Session(action) => {
                match action {
                    SessionAction::Select { id, additive } => {
                        self.select(&id, additive);
                    }
                    SessionAction::Deselect { id } => {
                        self.deselect(&id);
                    }
                    SessionAction::ClearSelection => {
                        self.clear_selection();
                    }
                    SessionAction::Play => {
                        self.play();
                    }
                    SessionAction::Pause => {
                        self.pause();
                    }
                    SessionAction::TogglePlayback => {
                        self.toggle_playback();
                    }
                    SessionAction::Seek(time) => {
                        self.seek(time);
                    }
                    SessionAction::Advance(delta) => {
                        self.advance(delta);
                    }
                    SessionAction::SetPlaybackSpeed(speed) => {
                        self.set_playback_speed(speed)?;
                    }
                    SessionAction::SetViewMode(mode) => {
                        self.set_view_mode(mode);
                    }
                    SessionAction::ZoomIn => {
                        self.zoom_in();
                    }
                    SessionAction::ZoomOut => {
                        self.zoom_out();
                    }
                    SessionAction::SetZoom(zoom) => {
                        self.set_zoom(zoom)?;
                    }
                    SessionAction::PushError(error) => {
                        self.push_error(error);
                    }
                    SessionAction::ClearErrors => {
                        self.clear_errors();
                    }
                }
                None
            }
            Action::Undo => {
                self.undo();
                None
            }
            Action::Redo => {
                self.redo();
                None
            }
        };
        Ok(created)
    }
}

fn reserve_ids(ids: &mut IdGenerator, project: &Project) {
    let mut taken: Vec<String> = project.entity_ids().into_iter().map(String::from).collect();
    taken.push(project.id.clone());
    ids.reserve(taken);
}

fn insert_clip(
    project: &mut Project,
    ids: &mut IdGenerator,
    now: DateTime<Utc>,
    clip: Clip,
) -> Result<String> {
    project.check_track(clip.track_id.as_deref())?;
    if let Some((kind, url)) = clip.media_source() {
        let url = url.to_string();
        project.ensure_asset(kind, &url, ids, now);
    }
    let id = clip.id.clone();
    project.clips.insert(clip);
    Ok(id)
}
