//! Active view and zoom.

use serde::{Deserialize, Serialize};

use crate::error::{ClipdeckError, Result};

/// Factor applied by one zoom in or zoom out.
pub const ZOOM_STEP: f64 = 1.2;
pub const MIN_ZOOM: f64 = 0.1;
pub const MAX_ZOOM: f64 = 10.0;

/// Which editor panel has focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ViewMode {
    #[default]
    Timeline,
    Storyboard,
    Preview,
}

/// Active view plus the timeline zoom factor, always within
/// `[MIN_ZOOM, MAX_ZOOM]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct View {
    pub mode: ViewMode,
    pub zoom: f64,
}

impl Default for View {
    fn default() -> Self {
        Self {
            mode: ViewMode::Timeline,
            zoom: 1.0,
        }
    }
}

impl View {
    pub fn set_mode(&mut self, mode: ViewMode) -> bool {
        let changed = self.mode != mode;
        self.mode = mode;
        changed
    }

    /// Multiply the zoom by [`ZOOM_STEP`]. False once clamped at the maximum.
    pub fn zoom_in(&mut self) -> bool {
        self.apply_zoom(self.zoom * ZOOM_STEP)
    }

    pub fn zoom_out(&mut self) -> bool {
        self.apply_zoom(self.zoom / ZOOM_STEP)
    }

    /// Set the zoom directly. Out-of-range values are clamped; zero, negative
    /// and non-finite values are rejected.
    pub fn set_zoom(&mut self, zoom: f64) -> Result<bool> {
        if !zoom.is_finite() || zoom <= 0.0 {
            return Err(ClipdeckError::InvalidParameter {
                name: "zoom",
                reason: format!("{} must be greater than zero", zoom),
            });
        }
        Ok(self.apply_zoom(zoom))
    }

    fn apply_zoom(&mut self, zoom: f64) -> bool {
        let zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        let changed = self.zoom != zoom;
        self.zoom = zoom;
        changed
    }
}
