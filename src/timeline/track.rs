//! Timeline lanes.
//!
//! Tracks are kept in display order; each track's `position` mirrors its
//! index and is rewritten after every insert, removal and reorder.

use serde::{Deserialize, Serialize};

use crate::error::{ClipdeckError, Result};

/// What a lane is meant to hold. Informational: clips of any kind may be
/// placed on any track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TrackKind {
    Video,
    Audio,
    Text,
    Overlay,
}

impl TrackKind {
    fn default_color(self) -> &'static str {
        match self {
            TrackKind::Video => "#3B82F6",
            TrackKind::Audio => "#10B981",
            TrackKind::Text => "#F59E0B",
            TrackKind::Overlay => "#8B5CF6",
        }
    }
}

/// A lane clips can be placed on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub id: String,
    pub name: String,
    pub kind: TrackKind,
    /// Index among the project's tracks, dense from 0.
    pub position: usize,
    pub visible: bool,
    pub locked: bool,
    pub muted: bool,
    pub color: String,
}

/// Track to add. Without a color the kind's default is used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTrack {
    pub name: String,
    pub kind: TrackKind,
    #[serde(default)]
    pub color: Option<String>,
}

impl NewTrack {
    /// Build a visible, unlocked, unmuted track at `position`.
    pub fn into_track(self, id: String, position: usize) -> Result<Track> {
        if self.name.trim().is_empty() {
            return Err(ClipdeckError::InvalidParameter {
                name: "name",
                reason: "track name must not be empty".to_string(),
            });
        }
        Ok(Track {
            id,
            name: self.name,
            kind: self.kind,
            position,
            visible: true,
            locked: false,
            muted: false,
            color: self
                .color
                .unwrap_or_else(|| self.kind.default_color().to_string()),
        })
    }
}

/// Partial update of a track. Position changes go through [`reorder`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TrackPatch {
    pub name: Option<String>,
    pub visible: Option<bool>,
    pub locked: Option<bool>,
    pub muted: Option<bool>,
    pub color: Option<String>,
}

impl TrackPatch {
    pub fn apply(&self, track: &mut Track) -> Result<()> {
        if let Some(name) = &self.name {
            if name.trim().is_empty() {
                return Err(ClipdeckError::InvalidParameter {
                    name: "name",
                    reason: "track name must not be empty".to_string(),
                });
            }
            track.name = name.clone();
        }
        if let Some(visible) = self.visible {
            track.visible = visible;
        }
        if let Some(locked) = self.locked {
            track.locked = locked;
        }
        if let Some(muted) = self.muted {
            track.muted = muted;
        }
        if let Some(color) = &self.color {
            track.color = color.clone();
        }
        Ok(())
    }
}

/// Rewrite positions so they match vector order.
pub fn renumber(tracks: &mut [Track]) {
    for (index, track) in tracks.iter_mut().enumerate() {
        track.position = index;
    }
}

/// Move the track at `from` to `to`, shifting the others.
pub fn reorder(tracks: &mut Vec<Track>, from: usize, to: usize) -> Result<()> {
    let len = tracks.len();
    if from >= len {
        return Err(ClipdeckError::TrackIndexOutOfBounds { index: from, len });
    }
    if to >= len {
        return Err(ClipdeckError::TrackIndexOutOfBounds { index: to, len });
    }
    let track = tracks.remove(from);
    tracks.insert(to, track);
    renumber(tracks);
    Ok(())
}
