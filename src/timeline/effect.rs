//! Visual effects applied over a time span.
//!
//! Each effect kind carries its own parameter set; there is no open-ended
//! parameter map.

use serde::{Deserialize, Serialize};

use super::{check_positive, check_unit, intersects, validate_span};
use crate::error::{ClipdeckError, Result};

/// What an effect is attached to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "scope", content = "id", rename_all = "camelCase")]
pub enum EffectTarget {
    Clip(String),
    Track(String),
    Project,
}

/// How a transition effect blends into the next shot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransitionStyle {
    Cut,
    Crossfade,
    Fade,
    Wipe,
    Slide,
    Zoom,
    Dissolve,
}

/// Simulated camera motion over the effect span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CameraPattern {
    Static,
    PanLeft,
    PanRight,
    TiltUp,
    TiltDown,
    ZoomIn,
    ZoomOut,
    Dolly,
    Track,
}

/// Discriminant of [`EffectParams`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EffectKind {
    Filter,
    Blur,
    Crop,
    Transition,
    Overlay,
    CameraMovement,
}

/// Per-kind effect parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EffectParams {
    #[serde(rename_all = "camelCase")]
    Filter {
        preset: String,
        /// 0..=100
        intensity: f64,
    },
    #[serde(rename_all = "camelCase")]
    Blur { radius: f64 },
    #[serde(rename_all = "camelCase")]
    Crop {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    },
    #[serde(rename_all = "camelCase")]
    Transition { style: TransitionStyle },
    #[serde(rename_all = "camelCase")]
    Overlay {
        url: String,
        /// 0..=1
        opacity: f64,
    },
    #[serde(rename_all = "camelCase")]
    CameraMovement {
        pattern: CameraPattern,
        /// Multiplier on the default movement speed.
        speed: f64,
    },
}

impl EffectParams {
    pub fn kind(&self) -> EffectKind {
        match self {
            EffectParams::Filter { .. } => EffectKind::Filter,
            EffectParams::Blur { .. } => EffectKind::Blur,
            EffectParams::Crop { .. } => EffectKind::Crop,
            EffectParams::Transition { .. } => EffectKind::Transition,
            EffectParams::Overlay { .. } => EffectKind::Overlay,
            EffectParams::CameraMovement { .. } => EffectKind::CameraMovement,
        }
    }

    /// Check the numeric bounds of the parameter set.
    pub fn validate(&self) -> Result<()> {
        match self {
            EffectParams::Filter { preset, intensity } => {
                if preset.trim().is_empty() {
                    return Err(ClipdeckError::InvalidParameter {
                        name: "preset",
                        reason: "filter preset must not be empty".to_string(),
                    });
                }
                check_unit("intensity", *intensity, 0.0, 100.0)
            }
            EffectParams::Blur { radius } => check_unit("radius", *radius, 0.0, f64::MAX),
            EffectParams::Crop {
                x,
                y,
                width,
                height,
            } => {
                check_unit("x", *x, 0.0, f64::MAX)?;
                check_unit("y", *y, 0.0, f64::MAX)?;
                check_positive("width", *width)?;
                check_positive("height", *height)
            }
            EffectParams::Transition { .. } => Ok(()),
            EffectParams::Overlay { url, opacity } => {
                if url.trim().is_empty() {
                    return Err(ClipdeckError::InvalidParameter {
                        name: "url",
                        reason: "overlay url must not be empty".to_string(),
                    });
                }
                check_unit("opacity", *opacity, 0.0, 1.0)
            }
            EffectParams::CameraMovement { speed, .. } => check_positive("speed", *speed),
        }
    }
}

/// An effect active over `[start_time, start_time + duration]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Effect {
    pub id: String,
    pub target: EffectTarget,
    pub start_time: f64,
    pub duration: f64,
    pub params: EffectParams,
}

impl Effect {
    pub fn kind(&self) -> EffectKind {
        self.params.kind()
    }

    /// `start_time + duration`; finite for any validated effect.
    pub fn end_time(&self) -> f64 {
        self.start_time + self.duration
    }

    pub fn overlaps(&self, start: f64, end: f64) -> bool {
        intersects(self.start_time, self.end_time(), start, end)
    }

    /// Span and parameters only; whether the target exists is checked by
    /// the project.
    pub fn validate(&self) -> Result<()> {
        validate_span(self.start_time, self.duration)?;
        self.params.validate()
    }

    /// Whether the effect hangs off the clip or track with this id.
    pub fn targets(&self, id: &str) -> bool {
        match &self.target {
            EffectTarget::Clip(target) | EffectTarget::Track(target) => target == id,
            EffectTarget::Project => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEffect {
    pub target: EffectTarget,
    pub start_time: f64,
    pub duration: f64,
    pub params: EffectParams,
}

impl NewEffect {
    pub fn into_effect(self, id: String) -> Result<Effect> {
        let effect = Effect {
            id,
            target: self.target,
            start_time: self.start_time,
            duration: self.duration,
            params: self.params,
        };
        effect.validate()?;
        Ok(effect)
    }
}

/// Partial update of an effect. `params` must keep the effect's kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EffectPatch {
    pub target: Option<EffectTarget>,
    pub start_time: Option<f64>,
    pub duration: Option<f64>,
    pub params: Option<EffectParams>,
}

impl EffectPatch {
    /// Apply in place. The caller re-validates the result.
    pub fn apply(&self, effect: &mut Effect) -> Result<()> {
        if let Some(params) = &self.params {
            if params.kind() != effect.kind() {
                return Err(ClipdeckError::PatchNotApplicable {
                    id: effect.id.clone(),
                    kind: "effect",
                    field: "params",
                });
            }
            effect.params = params.clone();
        }
        if let Some(target) = &self.target {
            effect.target = target.clone();
        }
        if let Some(start) = self.start_time {
            effect.start_time = start;
        }
        if let Some(duration) = self.duration {
            effect.duration = duration;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use test_case::test_case;

    fn blur(radius: f64) -> NewEffect {
        NewEffect {
            target: EffectTarget::Project,
            start_time: 1.0,
            duration: 2.5,
            params: EffectParams::Blur { radius },
        }
    }

    #[test]
    fn test_effect_end_time() {
        let effect = blur(4.0).into_effect("fx".to_string()).unwrap();
        assert_relative_eq!(effect.end_time(), 3.5);
        assert!(effect.overlaps(3.5, 10.0));
        assert!(!effect.overlaps(3.6, 10.0));
    }

    #[test_case(EffectParams::Filter { preset: "noir".into(), intensity: 101.0 } ; "filter intensity")]
    #[test_case(EffectParams::Blur { radius: -1.0 } ; "negative blur")]
    #[test_case(EffectParams::Crop { x: 0.0, y: 0.0, width: 0.0, height: 10.0 } ; "zero crop")]
    #[test_case(EffectParams::Overlay { url: "o.png".into(), opacity: 2.0 } ; "overlay opacity")]
    #[test_case(EffectParams::CameraMovement { pattern: CameraPattern::Dolly, speed: 0.0 } ; "still camera")]
    fn test_invalid_params(params: EffectParams) {
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_negative_duration_rejected() {
        let mut spec = blur(1.0);
        spec.duration = -1.0;
        let err = spec.into_effect("fx".to_string()).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_DURATION");
    }

    #[test]
    fn test_overflowing_end_rejected() {
        let mut spec = blur(1.0);
        spec.start_time = f64::MAX;
        spec.duration = f64::MAX;
        let err = spec.into_effect("fx".to_string()).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_TIME_RANGE");

        let mut effect = blur(1.0).into_effect("fx".to_string()).unwrap();
        EffectPatch {
            start_time: Some(f64::MAX),
            duration: Some(f64::MAX / 2.0 + f64::MAX / 4.0),
            ..Default::default()
        }
        .apply(&mut effect)
        .unwrap();
        assert!(effect.validate().is_err());
    }

    #[test]
    fn test_patch_cannot_change_kind() {
        let mut effect = blur(1.0).into_effect("fx".to_string()).unwrap();
        let patch = EffectPatch {
            params: Some(EffectParams::Transition {
                style: TransitionStyle::Fade,
            }),
            ..Default::default()
        };
        assert!(patch.apply(&mut effect).is_err());
        assert_eq!(effect.kind(), EffectKind::Blur);
    }

    #[test]
    fn test_serde_shape() {
        let effect = NewEffect {
            target: EffectTarget::Clip("clip-1".to_string()),
            start_time: 0.0,
            duration: 1.0,
            params: EffectParams::CameraMovement {
                pattern: CameraPattern::PanLeft,
                speed: 1.0,
            },
        }
        .into_effect("fx".to_string())
        .unwrap();

        let value = serde_json::to_value(&effect).unwrap();
        assert_eq!(value["target"]["scope"], "clip");
        assert_eq!(value["target"]["id"], "clip-1");
        assert_eq!(value["params"]["type"], "cameraMovement");
        assert_eq!(value["params"]["pattern"], "pan-left");
    }
}
