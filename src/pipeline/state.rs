use glam::DMat4;

use crate::foundation::core::{Rank, Rgba, ViewportTile};
use crate::foundation::math::orbit_modelview;
use crate::render::hook::RenderParams;

/// Orbit rotation of the demo scene, in degrees.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Animation {
    /// Rotation about the X axis.
    pub rotate_x: f64,
    /// Rotation about the Y axis.
    pub rotate_y: f64,
}

impl Animation {
    /// Degrees per second about X.
    pub const RATE_X: f64 = 10.0;
    /// Degrees per second about Y.
    pub const RATE_Y: f64 = -15.0;

    /// Integrate one frame. Every rank applies the same `dt`, so the state stays identical.
    pub fn advance(&mut self, dt: f64) {
        self.rotate_x += Self::RATE_X * dt;
        self.rotate_y += Self::RATE_Y * dt;
    }

    /// Camera-space transform for the current pose.
    pub fn modelview(&self) -> DMat4 {
        orbit_modelview(self.rotate_x, self.rotate_y)
    }
}

impl Default for Animation {
    fn default() -> Self {
        Self {
            rotate_x: 30.0,
            rotate_y: -45.0,
        }
    }
}

/// Per-rank record for one frame, rebuilt every frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameState {
    /// 0-based frame counter.
    pub frame: u64,
    /// Synchronized time, bit-identical on every rank.
    pub current_time: f64,
    /// Seconds since the previous frame.
    pub delta_time: f64,
    /// Modelview for this frame's animation pose.
    pub modelview: DMat4,
    /// This rank's projection (full frustum or tile slice).
    pub projection: DMat4,
    /// Clear color.
    pub background: Rgba,
}

impl FrameState {
    /// Hook parameters for `rank` drawing `viewport`.
    pub fn render_params(&self, rank: Rank, viewport: ViewportTile) -> RenderParams {
        RenderParams {
            rank,
            frame: self.frame,
            projection: self.projection,
            modelview: self.modelview,
            background: self.background,
            viewport,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/state.rs"]
mod tests;
