//! Shot prompts and transcriptions (dialogue and lyric lines).
//!
//! Prompts drive image generation for the storyboard; transcriptions are
//! timed text lines shown against the timeline. Neither produces clips by
//! itself.

use serde::{Deserialize, Serialize};

use super::{intersects, validate_range};
use crate::error::{ClipdeckError, Result};

/// Framing requested for a generated shot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ShotType {
    CloseUp,
    Medium,
    Wide,
    Transition,
    #[default]
    Normal,
}

/// An image-generation prompt for one shot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prompt {
    pub id: String,
    pub text: String,
    pub shot_type: ShotType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<f64>,
    /// Set once an image has been generated for the prompt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl Prompt {
    /// Text must be non-blank; a start time, when set, must be a valid
    /// timeline position.
    pub fn validate(&self) -> Result<()> {
        require_text(&self.text)?;
        if let Some(start) = self.start_time {
            validate_range(start, None)?;
        }
        Ok(())
    }
}

/// Prompt to add. New prompts never carry an image.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NewPrompt {
    pub text: String,
    pub shot_type: ShotType,
    pub start_time: Option<f64>,
}

impl NewPrompt {
    pub fn into_prompt(self, id: String) -> Result<Prompt> {
        let prompt = Prompt {
            id,
            text: self.text,
            shot_type: self.shot_type,
            start_time: self.start_time,
            image_url: None,
        };
        prompt.validate()?;
        Ok(prompt)
    }
}

/// Partial update of a prompt. Absent fields are left alone; optional
/// fields cannot be cleared through a patch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PromptPatch {
    pub text: Option<String>,
    pub shot_type: Option<ShotType>,
    pub start_time: Option<f64>,
    pub image_url: Option<String>,
}

impl PromptPatch {
    pub fn apply(&self, prompt: &mut Prompt) {
        if let Some(text) = &self.text {
            prompt.text = text.clone();
        }
        if let Some(shot_type) = self.shot_type {
            prompt.shot_type = shot_type;
        }
        if let Some(start) = self.start_time {
            prompt.start_time = Some(start);
        }
        if let Some(url) = &self.image_url {
            prompt.image_url = Some(url.clone());
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TranscriptionKind {
    #[default]
    Dialogue,
    Lyrics,
}

/// A timed line of dialogue or lyrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transcription {
    pub id: String,
    pub text: String,
    pub kind: TranscriptionKind,
    pub start_time: f64,
    pub end_time: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speaker: Option<String>,
}

impl Transcription {
    pub fn validate(&self) -> Result<()> {
        require_text(&self.text)?;
        validate_range(self.start_time, Some(self.end_time))
    }

    /// Closed-interval overlap with `[start, end]`.
    pub fn overlaps(&self, start: f64, end: f64) -> bool {
        intersects(self.start_time, self.end_time, start, end)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NewTranscription {
    pub text: String,
    pub kind: TranscriptionKind,
    pub start_time: f64,
    pub end_time: f64,
    pub speaker: Option<String>,
}

impl NewTranscription {
    pub fn into_transcription(self, id: String) -> Result<Transcription> {
        let line = Transcription {
            id,
            text: self.text,
            kind: self.kind,
            start_time: self.start_time,
            end_time: self.end_time,
            speaker: self.speaker,
        };
        line.validate()?;
        Ok(line)
    }
}

/// Partial update of a transcription. The store re-validates the result,
/// so a patch may move both bounds at once.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TranscriptionPatch {
    pub text: Option<String>,
    pub kind: Option<TranscriptionKind>,
    pub start_time: Option<f64>,
    pub end_time: Option<f64>,
    pub speaker: Option<String>,
}

impl TranscriptionPatch {
    pub fn apply(&self, line: &mut Transcription) {
        if let Some(text) = &self.text {
            line.text = text.clone();
        }
        if let Some(kind) = self.kind {
            line.kind = kind;
        }
        if let Some(start) = self.start_time {
            line.start_time = start;
        }
        if let Some(end) = self.end_time {
            line.end_time = end;
        }
        if let Some(speaker) = &self.speaker {
            line.speaker = Some(speaker.clone());
        }
    }
}

fn require_text(text: &str) -> Result<()> {
    if text.trim().is_empty() {
        return Err(ClipdeckError::InvalidParameter {
            name: "text",
            reason: "text must not be empty".to_string(),
        });
    }
    Ok(())
}
