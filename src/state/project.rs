//! Project aggregate.
//!
//! The serialized shape (camelCase JSON) is what both persistence tiers
//! store and what `export`/`import` exchange.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ClipdeckError, Result};
use crate::ids::IdGenerator;
use crate::state::migration::CURRENT_SCHEMA_VERSION;
use crate::state::workflow::{WorkflowData, WorkflowTracker};
use crate::timeline::{
    asset, validate_range, Asset, AssetKind, Clip, ClipStore, Effect, EffectTarget, Marker,
    Prompt, Track, Transcription,
};

/// Name given to freshly created projects.
pub const DEFAULT_PROJECT_NAME: &str = "Untitled Project";

/// Main project state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    /// Immutable after creation.
    pub id: String,

    pub name: String,

    /// Nominal length in seconds. Clips may extend past it.
    #[serde(default)]
    pub duration: f64,

    #[serde(default)]
    pub tracks: Vec<Track>,

    /// Audio tracks, video clips and text elements.
    #[serde(default)]
    pub clips: ClipStore,

    #[serde(default)]
    pub effects: Vec<Effect>,

    #[serde(default)]
    pub markers: Vec<Marker>,

    #[serde(default)]
    pub assets: Vec<Asset>,

    #[serde(default)]
    pub prompts: Vec<Prompt>,

    #[serde(default)]
    pub transcriptions: Vec<Transcription>,

    #[serde(flatten)]
    pub workflow: WorkflowTracker,

    #[serde(default)]
    pub workflow_data: WorkflowData,

    #[serde(default = "default_schema_version")]
    pub schema_version: String,

    pub created_at: DateTime<Utc>,

    pub last_modified: DateTime<Utc>,
}

fn default_schema_version() -> String {
    CURRENT_SCHEMA_VERSION.to_string()
}

impl Project {
    /// Create an empty project.
    pub fn new(id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            name: DEFAULT_PROJECT_NAME.to_string(),
            duration: 0.0,
            tracks: Vec::new(),
            clips: ClipStore::new(),
            effects: Vec::new(),
            markers: Vec::new(),
            assets: Vec::new(),
            prompts: Vec::new(),
            transcriptions: Vec::new(),
            workflow: WorkflowTracker::new(),
            workflow_data: WorkflowData::new(),
            schema_version: default_schema_version(),
            created_at: now,
            last_modified: now,
        }
    }

    /// Check every entity, id uniqueness and references between entities.
    /// Used when a project comes from outside the store.
    pub fn validate(&self) -> Result<()> {
        if !self.duration.is_finite() || self.duration < 0.0 {
            return Err(ClipdeckError::InvalidDuration {
                duration: self.duration,
            });
        }
        self.check_unique_ids()?;
        for clip in self.clips.iter() {
            clip.validate()?;
            self.check_track(clip.track_id.as_deref())?;
        }
        for effect in &self.effects {
            effect.validate()?;
            self.check_target(&effect.target)?;
        }
        for marker in &self.markers {
            marker.validate()?;
        }
        for prompt in &self.prompts {
            prompt.validate()?;
        }
        for line in &self.transcriptions {
            line.validate()?;
        }
        for payload in self.workflow_data.values() {
            payload.validate()?;
        }
        Ok(())
    }

    /// End of the timeline: the nominal duration or the latest clip/effect
    /// end, whichever is later.
    pub fn timeline_end(&self) -> f64 {
        self.effects
            .iter()
            .map(Effect::end_time)
            .fold(self.duration.max(self.clips.latest_end()), f64::max)
    }

    /// Clips intersecting the closed interval `[start, end]`.
    pub fn clips_in_range(&self, start: f64, end: f64) -> Result<Vec<&Clip>> {
        check_query(start, end)?;
        Ok(self.clips.in_range(start, end))
    }

    pub fn effects_in_range(&self, start: f64, end: f64) -> Result<Vec<&Effect>> {
        check_query(start, end)?;
        Ok(self
            .effects
            .iter()
            .filter(|effect| effect.overlaps(start, end))
            .collect())
    }

    pub fn markers_in_range(&self, start: f64, end: f64) -> Result<Vec<&Marker>> {
        check_query(start, end)?;
        Ok(self
            .markers
            .iter()
            .filter(|marker| marker.overlaps(start, end))
            .collect())
    }

    pub fn track(&self, id: &str) -> Option<&Track> {
        self.tracks.iter().find(|track| track.id == id)
    }

    /// Fails unless `track_id` is absent or names an existing track.
    pub fn check_track(&self, track_id: Option<&str>) -> Result<()> {
        match track_id {
            Some(id) if self.track(id).is_none() => Err(ClipdeckError::InvalidParameter {
                name: "trackId",
                reason: format!("no track '{}'", id),
            }),
            _ => Ok(()),
        }
    }

    /// Fails unless the clip or track an effect targets exists.
    pub fn check_target(&self, target: &EffectTarget) -> Result<()> {
        let missing = match target {
            EffectTarget::Clip(id) => {
                (!self.clips.contains(id)).then(|| format!("no clip '{}'", id))
            }
            EffectTarget::Track(id) => self.track(id).is_none().then(|| format!("no track '{}'", id)),
            EffectTarget::Project => None,
        };
        match missing {
            Some(reason) => Err(ClipdeckError::InvalidParameter {
                name: "target",
                reason,
            }),
            None => Ok(()),
        }
    }

    /// Entity ids must be unique across every collection.
    fn check_unique_ids(&self) -> Result<()> {
        let mut seen = HashSet::new();
        let all = self
            .clips
            .ids()
            .chain(self.tracks.iter().map(|t| t.id.as_str()))
            .chain(self.effects.iter().map(|e| e.id.as_str()))
            .chain(self.markers.iter().map(|m| m.id.as_str()))
            .chain(self.assets.iter().map(|a| a.id.as_str()))
            .chain(self.prompts.iter().map(|p| p.id.as_str()))
            .chain(self.transcriptions.iter().map(|t| t.id.as_str()));
        for id in all {
            if !seen.insert(id) {
                return Err(ClipdeckError::InvalidParameter {
                    name: "id",
                    reason: format!("duplicate id '{}'", id),
                });
            }
        }
        Ok(())
    }

    /// Remove a clip and the effects attached to it.
    pub fn remove_clip(&mut self, id: &str) -> bool {
        if self.clips.remove(id).is_none() {
            return false;
        }
        self.effects.retain(|effect| !effect.targets(id));
        true
    }

    /// Remove a track together with its clips and the effects targeting
    /// the track or those clips. Remaining positions are renumbered.
    pub fn remove_track(&mut self, id: &str) -> bool {
        let Some(index) = self.tracks.iter().position(|track| track.id == id) else {
            return false;
        };
        self.tracks.remove(index);
        crate::timeline::track::renumber(&mut self.tracks);

        let orphaned: Vec<String> = self
            .clips
            .in_track(id)
            .into_iter()
            .map(|clip| clip.id.clone())
            .collect();
        self.clips
            .retain(|clip| clip.track_id.as_deref() != Some(id));
        self.effects.retain(|effect| {
            !effect.targets(id) && !orphaned.iter().any(|clip_id| effect.targets(clip_id))
        });
        true
    }

    /// Register `(kind, url)` as an asset unless it is already known.
    /// Returns true when a new asset was created.
    pub fn ensure_asset(
        &mut self,
        kind: AssetKind,
        url: &str,
        ids: &mut IdGenerator,
        now: DateTime<Utc>,
    ) -> bool {
        if asset::find(&self.assets, kind, url).is_some() {
            return false;
        }
        self.assets.push(Asset {
            id: ids.next(kind.id_prefix()),
            kind,
            url: url.to_string(),
            created_at: now,
        });
        true
    }

    /// Every entity id in the project.
    pub fn entity_ids(&self) -> HashSet<&str> {
        let mut ids: HashSet<&str> = self.clips.ids().collect();
        ids.extend(self.tracks.iter().map(|t| t.id.as_str()));
        ids.extend(self.effects.iter().map(|e| e.id.as_str()));
        ids.extend(self.markers.iter().map(|m| m.id.as_str()));
        ids.extend(self.assets.iter().map(|a| a.id.as_str()));
        ids.extend(self.prompts.iter().map(|p| p.id.as_str()));
        ids.extend(self.transcriptions.iter().map(|t| t.id.as_str()));
        ids
    }

    pub fn contains_entity(&self, id: &str) -> bool {
        self.entity_ids().contains(id)
    }
}

fn check_query(start: f64, end: f64) -> Result<()> {
    validate_range(start, None)?;
    if !end.is_finite() || end < start {
        return Err(ClipdeckError::InvalidTimeRange {
            start,
            end: Some(end),
            reason: "query end must not precede its start",
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeline::{
        EffectParams, EffectTarget, NewEffect, NewTrack, NewVideoClip, TrackKind,
    };

    fn project_with_lane() -> Project {
        let now = Utc::now();
        let mut project = Project::new("project-1", now);
        for (i, name) in ["Main", "B-roll"].iter().enumerate() {
            project.tracks.push(
                NewTrack {
                    name: name.to_string(),
                    kind: TrackKind::Video,
                    color: None,
                }
                .into_track(format!("track-{}", i), i)
                .unwrap(),
            );
        }
        let clip = NewVideoClip {
            url: "a.mp4".to_string(),
            track_id: Some("track-0".to_string()),
            start_time: 0.0,
            end_time: 4.0,
            ..Default::default()
        }
        .into_clip("video-1".to_string(), now)
        .unwrap();
        project.clips.insert(clip);
        project.effects.push(
            NewEffect {
                target: EffectTarget::Clip("video-1".to_string()),
                start_time: 0.0,
                duration: 6.0,
                params: EffectParams::Blur { radius: 2.0 },
            }
            .into_effect("fx-1".to_string())
            .unwrap(),
        );
        project
    }

    #[test]
    fn test_new_project_defaults() {
        let project = Project::new("p", Utc::now());
        assert_eq!(project.name, DEFAULT_PROJECT_NAME);
        assert_eq!(project.schema_version, CURRENT_SCHEMA_VERSION);
        assert_eq!(project.timeline_end(), 0.0);
        assert!(project.validate().is_ok());
    }

    #[test]
    fn test_timeline_end_includes_effects() {
        let project = project_with_lane();
        assert_eq!(project.timeline_end(), 6.0);
    }

    #[test]
    fn test_remove_track_cascades() {
        let mut project = project_with_lane();
        assert!(project.remove_track("track-0"));
        assert!(project.clips.is_empty());
        assert!(project.effects.is_empty());
        assert_eq!(project.tracks.len(), 1);
        assert_eq!(project.tracks[0].position, 0);
        assert!(!project.remove_track("track-0"));
    }

    #[test]
    fn test_ensure_asset_dedupes() {
        let mut project = Project::new("p", Utc::now());
        let mut ids = IdGenerator::new();
        assert!(project.ensure_asset(AssetKind::Audio, "song.mp3", &mut ids, Utc::now()));
        assert!(!project.ensure_asset(AssetKind::Audio, "song.mp3", &mut ids, Utc::now()));
        assert!(project.ensure_asset(AssetKind::Video, "song.mp3", &mut ids, Utc::now()));
        assert_eq!(project.assets.len(), 2);
    }

    #[test]
    fn test_range_query_rejects_inverted_window() {
        let project = project_with_lane();
        assert!(project.clips_in_range(5.0, 1.0).is_err());
        assert_eq!(project.clips_in_range(4.0, 4.0).unwrap().len(), 1);
    }

    #[test]
    fn test_validate_rejects_duplicate_ids() {
        let mut project = project_with_lane();
        let copy = project.clips.get("video-1").unwrap().clone();
        project.clips.insert(copy);
        let err = project.validate().unwrap_err();
        assert_eq!(err.error_code(), "INVALID_PARAMETER");
        assert!(err.to_string().contains("duplicate id 'video-1'"));
    }

    #[test]
    fn test_validate_rejects_ids_shared_across_collections() {
        let mut project = project_with_lane();
        project.tracks[1].id = "fx-1".to_string();
        assert!(project.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_dangling_references() {
        let mut project = project_with_lane();
        project.tracks.remove(0);
        crate::timeline::track::renumber(&mut project.tracks);
        let err = project.validate().unwrap_err();
        assert!(err.to_string().contains("no track 'track-0'"));

        let mut project = project_with_lane();
        project.effects[0].target = EffectTarget::Clip("gone".to_string());
        let err = project.validate().unwrap_err();
        assert!(err.to_string().contains("no clip 'gone'"));

        assert!(project_with_lane().validate().is_ok());
    }

    #[test]
    fn test_markers_in_range() {
        let mut project = Project::new("p", Utc::now());
        project.markers.push(
            crate::timeline::NewMarker::beat(2.0, 0.5, crate::timeline::BeatAccent::Upbeat)
                .into_marker("beat-1".to_string())
                .unwrap(),
        );
        assert_eq!(project.markers_in_range(1.0, 3.0).unwrap().len(), 1);
        assert!(project.markers_in_range(2.5, 9.0).unwrap().is_empty());
    }

    #[test]
    fn test_serialized_keys() {
        let mut project = Project::new("p", Utc::now());
        project.workflow.mark_completed(3);
        let value = serde_json::to_value(&project).unwrap();
        assert!(value.get("currentStep").is_some());
        assert_eq!(value["completedSteps"], serde_json::json!([3]));
        assert!(value.get("lastModified").is_some());

        let back: Project = serde_json::from_value(value).unwrap();
        assert_eq!(back, project);
    }
}
