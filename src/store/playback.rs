//! Playback clock: play/pause, seeking and speed.
//!
//! The clock does not run itself; the host calls [`Playback::advance`] with
//! the elapsed wall time.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::timeline::check_positive;

/// Playhead state. `current_time` stays within `[0, timeline end]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Playback {
    /// Playhead position in seconds.
    pub current_time: f64,
    pub is_playing: bool,
    /// Speed multiplier: 1.0 = normal.
    pub speed: f64,
}

impl Default for Playback {
    fn default() -> Self {
        Self {
            current_time: 0.0,
            is_playing: false,
            speed: 1.0,
        }
    }
}

impl Playback {
    /// Start playback. At the end of the timeline the playhead rewinds first.
    pub fn play(&mut self, end: f64) -> bool {
        if self.is_playing {
            return false;
        }
        if end > 0.0 && self.current_time >= end {
            self.current_time = 0.0;
        }
        self.is_playing = true;
        debug!("Playback started at {:.3}s (speed {})", self.current_time, self.speed);
        true
    }

    pub fn pause(&mut self) -> bool {
        if !self.is_playing {
            return false;
        }
        self.is_playing = false;
        debug!("Playback paused at {:.3}s", self.current_time);
        true
    }

    pub fn toggle(&mut self, end: f64) -> bool {
        if self.is_playing {
            self.pause()
        } else {
            self.play(end)
        }
    }

    /// Move the playhead, clamped to `[0, end]`.
    pub fn seek(&mut self, time: f64, end: f64) -> bool {
        let target = if time.is_nan() { 0.0 } else { time.clamp(0.0, end.max(0.0)) };
        if target == self.current_time {
            return false;
        }
        self.current_time = target;
        true
    }

    /// Advance a playing clock by `delta * speed` seconds. Playback stops at
    /// `end`. Returns true if the playhead moved or playback stopped.
    pub fn advance(&mut self, delta: f64, end: f64) -> bool {
        if !self.is_playing || !delta.is_finite() || delta <= 0.0 {
            return false;
        }
        let end = end.max(0.0);
        let next = self.current_time + delta * self.speed;
        if next >= end {
            self.current_time = end;
            self.is_playing = false;
            debug!("Playback reached end at {:.3}s", end);
        } else {
            self.current_time = next;
        }
        true
    }

    /// Rejects zero, negative and non-finite speeds.
    pub fn set_speed(&mut self, speed: f64) -> Result<bool> {
        check_positive("speed", speed)?;
        let changed = self.speed != speed;
        self.speed = speed;
        Ok(changed)
    }

    /// Pull the playhead back inside a timeline that shrank.
    pub fn clamp_to(&mut self, end: f64) -> bool {
        if self.current_time > end.max(0.0) {
            self.current_time = end.max(0.0);
            return true;
        }
        false
    }
}
