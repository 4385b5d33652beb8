use crate::foundation::error::{CompositeError, CompositeResult};

/// Identity of a process within the cooperating group.
///
/// Rank 0 is the coordinator: it owns the final composite and is the only rank that presents.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct Rank(pub usize);

impl Rank {
    /// The designated coordinator/display rank.
    pub const COORDINATOR: Rank = Rank(0);

    /// Return `true` for the coordinator rank.
    pub fn is_coordinator(self) -> bool {
        self == Self::COORDINATOR
    }
}

impl std::fmt::Display for Rank {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "rank{}", self.0)
    }
}

/// Rectangle of output pixels, origin at the top-left of the global image.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ViewportTile {
    /// Left edge in pixels.
    pub x: u32,
    /// Top edge in pixels.
    pub y: u32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl ViewportTile {
    /// Full-frame tile of the given size.
    pub fn full(width: u32, height: u32) -> Self {
        Self {
            x: 0,
            y: 0,
            width,
            height,
        }
    }

    /// Number of pixels covered by the tile.
    pub fn pixel_count(self) -> usize {
        (self.width as usize).saturating_mul(self.height as usize)
    }

    /// Return `true` when the tile covers no pixels.
    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Straight-alpha RGBA color with `f32` channels in `[0, 1]`.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Rgba {
    /// Red.
    pub r: f32,
    /// Green.
    pub g: f32,
    /// Blue.
    pub b: f32,
    /// Alpha.
    pub a: f32,
}

impl Rgba {
    /// Create a color from channel values.
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Light gray used as the demo clear color.
    pub const fn light_gray() -> Self {
        Self::new(0.9, 0.9, 0.9, 1.0)
    }

    /// Reject non-finite or out-of-range channels.
    pub fn validate(self) -> CompositeResult<()> {
        for c in [self.r, self.g, self.b, self.a] {
            if !c.is_finite() || !(0.0..=1.0).contains(&c) {
                return Err(CompositeError::validation(format!(
                    "color channel {c} must be finite and within [0, 1]"
                )));
            }
        }
        Ok(())
    }

    /// Quantize to RGBA8 with round-to-nearest.
    pub fn to_rgba8(self) -> [u8; 4] {
        fn q(c: f32) -> u8 {
            (c.clamp(0.0, 1.0) * 255.0).round() as u8
        }
        [q(self.r), q(self.g), q(self.b), q(self.a)]
    }
}

impl Default for Rgba {
    fn default() -> Self {
        Self::light_gray()
    }
}

/// Row order of a pixel buffer as produced by a render hook.
///
/// Everything downstream of readback is [`RowOrder::TopDown`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowOrder {
    /// Row 0 is the top of the image.
    #[default]
    TopDown,
    /// Row 0 is the bottom of the image (GL framebuffer readback).
    BottomUp,
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
