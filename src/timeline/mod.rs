//! Timeline Model
//!
//! Typed entities placed on the project timeline (clips, tracks, effects,
//! markers, assets, prompts and transcriptions) together with their
//! validation rules and range queries.
//!
//! Every entity comes in three shapes:
//! - `New*`: what a caller supplies to create it (no id)
//! - the entity itself, with a generated id
//! - `*Patch`: a partial update where `Some` fields overwrite

pub mod asset;
pub mod clip;
pub mod effect;
pub mod marker;
pub mod script;
pub mod track;

pub use asset::{Asset, AssetKind};
pub use clip::{
    AudioSettings, AudioTrack, Clip, ClipContent, ClipKind, ClipPatch, ClipStore, NewAudioTrack,
    NewTextElement, NewVideoClip, Placement, TextElement, TextStyle, VideoClip,
};
pub use effect::{
    CameraPattern, Effect, EffectKind, EffectParams, EffectPatch, EffectTarget, NewEffect,
    TransitionStyle,
};
pub use marker::{BeatAccent, Marker, MarkerKind, MarkerPatch, NewMarker, SectionType};
pub use script::{
    NewPrompt, NewTranscription, Prompt, PromptPatch, ShotType, Transcription, TranscriptionKind,
    TranscriptionPatch,
};
pub use track::{NewTrack, Track, TrackKind, TrackPatch};

use crate::error::{ClipdeckError, Result};

/// Validate a start time and optional end time.
///
/// Start must be finite and non-negative; a present end must be finite and
/// strictly after the start. Nothing is clamped.
pub fn validate_range(start: f64, end: Option<f64>) -> Result<()> {
    let invalid = |reason| ClipdeckError::InvalidTimeRange { start, end, reason };

    if !start.is_finite() {
        return Err(invalid("start time must be finite"));
    }
    if start < 0.0 {
        return Err(invalid("start time must not be negative"));
    }
    if let Some(end) = end {
        if !end.is_finite() {
            return Err(invalid("end time must be finite"));
        }
        if end <= start {
            return Err(invalid("end time must be after start time"));
        }
    }
    Ok(())
}

/// Validate a start time and a length (zero allowed). The end,
/// `start + duration`, must also be finite.
pub fn validate_span(start: f64, duration: f64) -> Result<()> {
    validate_range(start, None)?;
    if !duration.is_finite() || duration < 0.0 {
        return Err(ClipdeckError::InvalidDuration { duration });
    }
    let end = start + duration;
    if !end.is_finite() {
        return Err(ClipdeckError::InvalidTimeRange {
            start,
            end: Some(end),
            reason: "end time must be finite",
        });
    }
    Ok(())
}

/// Closed-interval intersection test.
pub fn intersects(a_start: f64, a_end: f64, b_start: f64, b_end: f64) -> bool {
    a_start <= b_end && a_end >= b_start
}

/// Validate that `value` lies in `[min, max]`.
pub(crate) fn check_unit(name: &'static str, value: f64, min: f64, max: f64) -> Result<()> {
    if !value.is_finite() || value < min || value > max {
        return Err(ClipdeckError::InvalidParameter {
            name,
            reason: format!("{} is outside [{}, {}]", value, min, max),
        });
    }
    Ok(())
}

/// Validate that `value` is finite and strictly positive.
pub(crate) fn check_positive(name: &'static str, value: f64) -> Result<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(ClipdeckError::InvalidParameter {
            name,
            reason: format!("{} must be greater than zero", value),
        });
    }
    Ok(())
}
