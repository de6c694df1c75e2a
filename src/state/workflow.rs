//! Workflow Tracker
//!
//! Progress through the linear project-creation pipeline (upload audio,
//! transcribe, write the script, pick a style, generate, assemble the
//! timeline). Steps are plain indices; nothing here enforces an order.

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::{ClipdeckError, Result};
use crate::timeline::validate_range;

/// Current step plus the set of completed steps.
///
/// `completed_steps` serializes as an ascending, duplicate-free sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WorkflowTracker {
    pub current_step: u32,
    pub completed_steps: BTreeSet<u32>,
}

impl WorkflowTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move to `step`. No bounds are checked.
    pub fn set_current_step(&mut self, step: u32) {
        self.current_step = step;
    }

    /// Returns false if the step was already completed.
    pub fn mark_completed(&mut self, step: u32) -> bool {
        self.completed_steps.insert(step)
    }

    /// Returns false if the step was not completed.
    pub fn mark_incomplete(&mut self, step: u32) -> bool {
        self.completed_steps.remove(&step)
    }

    pub fn is_completed(&self, step: u32) -> bool {
        self.completed_steps.contains(&step)
    }

    /// Completed steps in ascending order.
    pub fn completed(&self) -> Vec<u32> {
        self.completed_steps.iter().copied().collect()
    }
}

/// A timed span of the transcribed soundtrack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptSegment {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SegmentStatus {
    #[default]
    Pending,
    Generating,
    Completed,
    Failed,
}

/// One video segment requested from the generator. `video_url` is set once
/// generation completes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedSegment {
    pub id: String,
    pub start_time: f64,
    pub duration: f64,
    pub prompt: String,
    #[serde(default)]
    pub status: SegmentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
}

/// Output of one pipeline stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "camelCase")]
pub enum StagePayload {
    #[serde(rename_all = "camelCase")]
    Audio {
        file_url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        duration: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        bpm: Option<f64>,
    },
    #[serde(rename_all = "camelCase")]
    Transcription {
        text: String,
        #[serde(default)]
        segments: Vec<TranscriptSegment>,
    },
    #[serde(rename_all = "camelCase")]
    Script {
        concept: String,
        #[serde(default)]
        scenes: Vec<String>,
    },
    #[serde(rename_all = "camelCase")]
    Style {
        style: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        mood: Option<String>,
        #[serde(default)]
        color_palette: Vec<String>,
    },
    #[serde(rename_all = "camelCase")]
    Generation { segments: Vec<GeneratedSegment> },
    #[serde(rename_all = "camelCase")]
    Timeline {
        /// 0..=100
        render_progress: u8,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        final_video_url: Option<String>,
    },
}

impl StagePayload {
    /// Check times, ranges and progress inside the payload.
    pub fn validate(&self) -> Result<()> {
        match self {
            StagePayload::Audio { duration, bpm, .. } => {
                if let Some(duration) = duration {
                    if !duration.is_finite() || *duration < 0.0 {
                        return Err(ClipdeckError::InvalidDuration {
                            duration: *duration,
                        });
                    }
                }
                if let Some(bpm) = bpm {
                    crate::timeline::check_positive("bpm", *bpm)?;
                }
                Ok(())
            }
            StagePayload::Transcription { segments, .. } => segments
                .iter()
                .try_for_each(|segment| validate_range(segment.start, Some(segment.end))),
            StagePayload::Generation { segments } => {
                segments.iter().try_for_each(|segment| {
                    crate::timeline::validate_span(segment.start_time, segment.duration)
                })
            }
            StagePayload::Timeline {
                render_progress, ..
            } => {
                if *render_progress > 100 {
                    return Err(ClipdeckError::InvalidParameter {
                        name: "renderProgress",
                        reason: format!("{} is above 100", render_progress),
                    });
                }
                Ok(())
            }
            StagePayload::Script { .. } | StagePayload::Style { .. } => Ok(()),
        }
    }
}

/// Stage payloads keyed by step index.
pub type WorkflowData = BTreeMap<u32, StagePayload>;
