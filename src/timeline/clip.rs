//! Clips: audio tracks, video clips and text elements.
//!
//! All clip kinds live in a single [`ClipStore`]; the per-kind lists are
//! views computed on read, so there is nothing to keep in sync.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::asset::AssetKind;
use super::{check_positive, check_unit, intersects, validate_range};
use crate::error::{ClipdeckError, Result};

/// Discriminant of [`ClipContent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ClipKind {
    Audio,
    Video,
    Text,
}

impl ClipKind {
    /// Prefix used for generated ids.
    pub fn id_prefix(self) -> &'static str {
        match self {
            ClipKind::Audio => "audio",
            ClipKind::Video => "video",
            ClipKind::Text => "text",
        }
    }
}

impl fmt::Display for ClipKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClipKind::Audio => write!(f, "audio track"),
            ClipKind::Video => write!(f, "video clip"),
            ClipKind::Text => write!(f, "text element"),
        }
    }
}

/// Mixer settings of an audio track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AudioSettings {
    /// Linear gain, 0..=1.
    pub volume: f64,
    pub muted: bool,
    pub looped: bool,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            volume: 1.0,
            muted: false,
            looped: false,
        }
    }
}

/// An audio source placed on the timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioTrack {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub settings: AudioSettings,
}

/// Spatial placement of a video clip on the canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Placement {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub opacity: f64,
    pub z_index: i32,
}

impl Default for Placement {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: 1920.0,
            height: 1080.0,
            opacity: 1.0,
            z_index: 0,
        }
    }
}

impl Placement {
    fn validate(&self) -> Result<()> {
        check_positive("width", self.width)?;
        check_positive("height", self.height)?;
        check_unit("opacity", self.opacity, 0.0, 1.0)?;
        if !self.x.is_finite() || !self.y.is_finite() {
            return Err(ClipdeckError::InvalidParameter {
                name: "position",
                reason: "x and y must be finite".to_string(),
            });
        }
        Ok(())
    }
}

/// A video source placed on the timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoClip {
    pub url: String,
    pub placement: Placement,
}

/// Font settings of a text element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TextStyle {
    pub font: String,
    pub size: f64,
    /// Hex color, e.g. `#FFFFFF`.
    pub color: String,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font: "Inter".to_string(),
            size: 48.0,
            color: "#FFFFFF".to_string(),
        }
    }
}

/// A text overlay (title, lyric line, caption).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextElement {
    pub text: String,
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub style: TextStyle,
}

/// Kind-specific payload of a clip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ClipContent {
    Audio(AudioTrack),
    Video(VideoClip),
    Text(TextElement),
}

impl ClipContent {
    pub fn kind(&self) -> ClipKind {
        match self {
            ClipContent::Audio(_) => ClipKind::Audio,
            ClipContent::Video(_) => ClipKind::Video,
            ClipContent::Text(_) => ClipKind::Text,
        }
    }
}

/// A placed element on the timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Clip {
    pub id: String,

    /// Lane the clip sits on, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub track_id: Option<String>,

    /// Position on the timeline in seconds.
    pub start_time: f64,

    /// End on the timeline in seconds. Audio may leave it open.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<f64>,

    pub content: ClipContent,

    pub created_at: DateTime<Utc>,
}

impl Clip {
    pub fn kind(&self) -> ClipKind {
        self.content.kind()
    }

    /// End of the clip, or its start when open-ended.
    pub fn end(&self) -> f64 {
        self.end_time.unwrap_or(self.start_time)
    }

    pub fn duration(&self) -> Option<f64> {
        self.end_time.map(|end| end - self.start_time)
    }

    /// Whether the clip's closed interval touches `[start, end]`.
    pub fn overlaps(&self, start: f64, end: f64) -> bool {
        intersects(self.start_time, self.end(), start, end)
    }

    pub fn as_audio(&self) -> Option<&AudioTrack> {
        match &self.content {
            ClipContent::Audio(audio) => Some(audio),
            _ => None,
        }
    }

    pub fn as_video(&self) -> Option<&VideoClip> {
        match &self.content {
            ClipContent::Video(video) => Some(video),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&TextElement> {
        match &self.content {
            ClipContent::Text(text) => Some(text),
            _ => None,
        }
    }

    /// The media source this clip references, if it is a media clip.
    pub fn media_source(&self) -> Option<(AssetKind, &str)> {
        match &self.content {
            ClipContent::Audio(audio) => Some((AssetKind::Audio, audio.url.as_str())),
            ClipContent::Video(video) => Some((AssetKind::Video, video.url.as_str())),
            ClipContent::Text(_) => None,
        }
    }

    /// Check the clip's invariants.
    pub fn validate(&self) -> Result<()> {
        validate_range(self.start_time, self.end_time)?;

        match &self.content {
            ClipContent::Audio(audio) => {
                require_url(&audio.url)?;
                check_unit("volume", audio.settings.volume, 0.0, 1.0)?;
            }
            ClipContent::Video(video) => {
                self.require_end()?;
                require_url(&video.url)?;
                video.placement.validate()?;
            }
            ClipContent::Text(text) => {
                self.require_end()?;
                if text.text.trim().is_empty() {
                    return Err(ClipdeckError::InvalidParameter {
                        name: "text",
                        reason: "text must not be empty".to_string(),
                    });
                }
                check_positive("size", text.style.size)?;
            }
        }
        Ok(())
    }

    fn require_end(&self) -> Result<()> {
        if self.end_time.is_none() {
            return Err(ClipdeckError::InvalidTimeRange {
                start: self.start_time,
                end: None,
                reason: "an end time is required",
            });
        }
        Ok(())
    }
}

fn require_url(url: &str) -> Result<()> {
    if url.trim().is_empty() {
        return Err(ClipdeckError::InvalidParameter {
            name: "url",
            reason: "media url must not be empty".to_string(),
        });
    }
    Ok(())
}

/// Input for creating an audio track.
/// Input for creating an audio track. Leaving `end_time` unset makes the
/// track open-ended.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NewAudioTrack {
    pub url: String,
    pub name: Option<String>,
    pub track_id: Option<String>,
    pub start_time: f64,
    pub end_time: Option<f64>,
    pub settings: AudioSettings,
}

impl NewAudioTrack {
    /// Build and validate the clip under `id`, stamped `now`.
    pub fn into_clip(self, id: String, now: DateTime<Utc>) -> Result<Clip> {
        let clip = Clip {
            id,
            track_id: self.track_id,
            start_time: self.start_time,
            end_time: self.end_time,
            content: ClipContent::Audio(AudioTrack {
                url: self.url,
                name: self.name,
                settings: self.settings,
            }),
            created_at: now,
        };
        clip.validate()?;
        Ok(clip)
    }
}

/// Input for creating a video clip.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NewVideoClip {
    pub url: String,
    pub track_id: Option<String>,
    pub start_time: f64,
    pub end_time: f64,
    pub placement: Placement,
}

impl NewVideoClip {
    pub fn into_clip(self, id: String, now: DateTime<Utc>) -> Result<Clip> {
        let clip = Clip {
            id,
            track_id: self.track_id,
            start_time: self.start_time,
            end_time: Some(self.end_time),
            content: ClipContent::Video(VideoClip {
                url: self.url,
                placement: self.placement,
            }),
            created_at: now,
        };
        clip.validate()?;
        Ok(clip)
    }
}

/// Input for creating a text element.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NewTextElement {
    pub text: String,
    pub track_id: Option<String>,
    pub start_time: f64,
    pub end_time: f64,
    pub x: f64,
    pub y: f64,
    pub style: TextStyle,
}

impl NewTextElement {
    pub fn into_clip(self, id: String, now: DateTime<Utc>) -> Result<Clip> {
        let clip = Clip {
            id,
            track_id: self.track_id,
            start_time: self.start_time,
            end_time: Some(self.end_time),
            content: ClipContent::Text(TextElement {
                text: self.text,
                x: self.x,
                y: self.y,
                style: self.style,
            }),
            created_at: now,
        };
        clip.validate()?;
        Ok(clip)
    }
}

/// Partial update of a clip. Fields that don't exist on the clip's kind are
/// rejected rather than ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClipPatch {
    pub track_id: Option<String>,
    pub start_time: Option<f64>,
    pub end_time: Option<f64>,
    /// Audio and video.
    pub url: Option<String>,
    /// Audio only.
    pub name: Option<String>,
    /// Audio only.
    pub settings: Option<AudioSettings>,
    /// Video only.
    pub placement: Option<Placement>,
    /// Text only.
    pub text: Option<String>,
    /// Text only.
    pub x: Option<f64>,
    /// Text only.
    pub y: Option<f64>,
    /// Text only.
    pub style: Option<TextStyle>,
}

impl ClipPatch {
    /// Merge the patch into `clip`. The result is not validated here.
    pub fn apply(&self, clip: &mut Clip) -> Result<()> {
        let id = clip.id.clone();
        let kind = clip.kind();
        let reject = |field: &'static str| ClipdeckError::PatchNotApplicable {
            id: id.clone(),
            kind: match kind {
                ClipKind::Audio => "audio track",
                ClipKind::Video => "video clip",
                ClipKind::Text => "text element",
            },
            field,
        };

        if let Some(track_id) = &self.track_id {
            clip.track_id = Some(track_id.clone());
        }
        if let Some(start) = self.start_time {
            clip.start_time = start;
        }
        if let Some(end) = self.end_time {
            clip.end_time = Some(end);
        }

        match &mut clip.content {
            ClipContent::Audio(audio) => {
                if self.placement.is_some() {
                    return Err(reject("placement"));
                }
                self.reject_text_fields(&reject)?;
                if let Some(url) = &self.url {
                    audio.url = url.clone();
                }
                if let Some(name) = &self.name {
                    audio.name = Some(name.clone());
                }
                if let Some(settings) = &self.settings {
                    audio.settings = settings.clone();
                }
            }
            ClipContent::Video(video) => {
                if self.name.is_some() {
                    return Err(reject("name"));
                }
                if self.settings.is_some() {
                    return Err(reject("settings"));
                }
                self.reject_text_fields(&reject)?;
                if let Some(url) = &self.url {
                    video.url = url.clone();
                }
                if let Some(placement) = &self.placement {
                    video.placement = placement.clone();
                }
            }
            ClipContent::Text(text) => {
                if self.url.is_some() {
                    return Err(reject("url"));
                }
                if self.name.is_some() {
                    return Err(reject("name"));
                }
                if self.settings.is_some() {
                    return Err(reject("settings"));
                }
                if self.placement.is_some() {
                    return Err(reject("placement"));
                }
                if let Some(value) = &self.text {
                    text.text = value.clone();
                }
                if let Some(x) = self.x {
                    text.x = x;
                }
                if let Some(y) = self.y {
                    text.y = y;
                }
                if let Some(style) = &self.style {
                    text.style = style.clone();
                }
            }
        }
        Ok(())
    }

    fn reject_text_fields<F>(&self, reject: &F) -> Result<()>
    where
        F: Fn(&'static str) -> ClipdeckError,
    {
        if self.text.is_some() {
            return Err(reject("text"));
        }
        if self.x.is_some() || self.y.is_some() {
            return Err(reject("x/y"));
        }
        if self.style.is_some() {
            return Err(reject("style"));
        }
        Ok(())
    }
}

/// Id-indexed store of every clip, kept in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClipStore {
    clips: Vec<Clip>,
}

impl ClipStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.clips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Clip> {
        self.clips.iter()
    }

    pub fn get(&self, id: &str) -> Option<&Clip> {
        self.clips.iter().find(|clip| clip.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Append a clip.
    pub fn insert(&mut self, clip: Clip) {
        self.clips.push(clip);
    }

    /// Replace the clip with the same id, keeping its position.
    /// Returns false when no such clip exists.
    pub fn replace(&mut self, clip: Clip) -> bool {
        match self.clips.iter_mut().find(|existing| existing.id == clip.id) {
            Some(slot) => {
                *slot = clip;
                true
            }
            None => false,
        }
    }

    /// Remove and return the clip with `id`, keeping the order of the rest.
    pub fn remove(&mut self, id: &str) -> Option<Clip> {
        let index = self.clips.iter().position(|clip| clip.id == id)?;
        Some(self.clips.remove(index))
    }

    pub fn retain<F>(&mut self, keep: F)
    where
        F: FnMut(&Clip) -> bool,
    {
        self.clips.retain(keep);
    }

    pub fn of_kind(&self, kind: ClipKind) -> impl Iterator<Item = &Clip> {
        self.clips.iter().filter(move |clip| clip.kind() == kind)
    }

    pub fn audio_tracks(&self) -> impl Iterator<Item = &Clip> {
        self.of_kind(ClipKind::Audio)
    }

    pub fn video_clips(&self) -> impl Iterator<Item = &Clip> {
        self.of_kind(ClipKind::Video)
    }

    pub fn text_elements(&self) -> impl Iterator<Item = &Clip> {
        self.of_kind(ClipKind::Text)
    }

    /// Clips whose `[start, end]` interval intersects `[start, end]`.
    pub fn in_range(&self, start: f64, end: f64) -> Vec<&Clip> {
        self.clips
            .iter()
            .filter(|clip| clip.overlaps(start, end))
            .collect()
    }

    pub fn in_track(&self, track_id: &str) -> Vec<&Clip> {
        self.clips
            .iter()
            .filter(|clip| clip.track_id.as_deref() == Some(track_id))
            .collect()
    }

    /// Clips sorted by start time; ties keep insertion order.
    pub fn render_order(&self) -> Vec<&Clip> {
        let mut ordered: Vec<&Clip> = self.clips.iter().collect();
        ordered.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));
        ordered
    }

    /// Latest end among all clips (0 when empty).
    pub fn latest_end(&self) -> f64 {
        self.clips.iter().map(Clip::end).fold(0.0, f64::max)
    }

    /// Ids of every clip, in insertion order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.clips.iter().map(|clip| clip.id.as_str())
    }
}
