//! Beat and section markers.
//!
//! Beats are instants detected in the soundtrack, sections are labelled
//! spans of the song (intro, verse, chorus). Both live in one collection
//! on the project and share the id namespace of every other entity.

use serde::{Deserialize, Serialize};

use super::{check_unit, intersects, validate_range};
use crate::error::{ClipdeckError, Result};

/// Metric position of a beat within its bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BeatAccent {
    Downbeat,
    Upbeat,
}

/// Song structure label of a section marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SectionType {
    Intro,
    Verse,
    Chorus,
    Bridge,
    Outro,
    Breakdown,
    Custom,
}

/// Marker payload, tagged `"type": "beat" | "section"` on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum MarkerKind {
    #[serde(rename_all = "camelCase")]
    Beat {
        time: f64,
        /// 0..=1
        strength: f64,
        accent: BeatAccent,
    },
    #[serde(rename_all = "camelCase")]
    Section {
        start_time: f64,
        end_time: f64,
        section: SectionType,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        color: Option<String>,
    },
}

/// A beat or section placed on the timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Marker {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub kind: MarkerKind,
}

impl Marker {
    pub fn is_beat(&self) -> bool {
        matches!(self.kind, MarkerKind::Beat { .. })
    }

    /// Beat time, or section start.
    pub fn start(&self) -> f64 {
        match &self.kind {
            MarkerKind::Beat { time, .. } => *time,
            MarkerKind::Section { start_time, .. } => *start_time,
        }
    }

    /// Beat time, or section end.
    pub fn end(&self) -> f64 {
        match &self.kind {
            MarkerKind::Beat { time, .. } => *time,
            MarkerKind::Section { end_time, .. } => *end_time,
        }
    }

    /// Whether the marker touches `[start, end]`. A beat on either bound counts.
    pub fn overlaps(&self, start: f64, end: f64) -> bool {
        intersects(self.start(), self.end(), start, end)
    }

    /// Beats need a non-negative time and a strength in `0..=1`; sections
    /// need `start < end`.
    pub fn validate(&self) -> Result<()> {
        match &self.kind {
            MarkerKind::Beat { time, strength, .. } => {
                validate_range(*time, None)?;
                check_unit("strength", *strength, 0.0, 1.0)
            }
            MarkerKind::Section {
                start_time,
                end_time,
                ..
            } => validate_range(*start_time, Some(*end_time)),
        }
    }
}

/// Marker to add; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMarker {
    #[serde(default)]
    pub label: Option<String>,
    pub kind: MarkerKind,
}

impl NewMarker {
    pub fn beat(time: f64, strength: f64, accent: BeatAccent) -> Self {
        Self {
            label: None,
            kind: MarkerKind::Beat {
                time,
                strength,
                accent,
            },
        }
    }

    pub fn section(start_time: f64, end_time: f64, section: SectionType) -> Self {
        Self {
            label: None,
            kind: MarkerKind::Section {
                start_time,
                end_time,
                section,
                color: None,
            },
        }
    }

    pub fn id_prefix(&self) -> &'static str {
        match self.kind {
            MarkerKind::Beat { .. } => "beat",
            MarkerKind::Section { .. } => "section",
        }
    }

    /// Build the marker under `id`, validating it.
    pub fn into_marker(self, id: String) -> Result<Marker> {
        let marker = Marker {
            id,
            label: self.label,
            kind: self.kind,
        };
        marker.validate()?;
        Ok(marker)
    }
}

/// Partial update of a marker. `kind` must keep the beat/section variant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MarkerPatch {
    pub label: Option<String>,
    pub kind: Option<MarkerKind>,
}

impl MarkerPatch {
    /// Apply the patch in place. Fails without touching `marker` if `kind`
    /// switches between beat and section.
    pub fn apply(&self, marker: &mut Marker) -> Result<()> {
        if let Some(kind) = &self.kind {
            if std::mem::discriminant(kind) != std::mem::discriminant(&marker.kind) {
                return Err(ClipdeckError::PatchNotApplicable {
                    id: marker.id.clone(),
                    kind: if marker.is_beat() { "beat" } else { "section" },
                    field: "kind",
                });
            }
            marker.kind = kind.clone();
        }
        if let Some(label) = &self.label {
            marker.label = Some(label.clone());
        }
        Ok(())
    }
}
