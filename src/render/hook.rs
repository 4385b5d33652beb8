use glam::DMat4;

use crate::foundation::core::{Rank, Rgba, RowOrder, ViewportTile};
use crate::foundation::error::CompositeResult;
use crate::foundation::math::to_f32_cols;
use crate::render::buffer::ImageBuffer;

/// Everything a render hook gets for one frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderParams {
    /// Rank the hook is drawing for.
    pub rank: Rank,
    /// 0-based frame counter, identical on every rank.
    pub frame: u64,
    /// Projection transform (finite).
    pub projection: DMat4,
    /// Modelview transform (finite).
    pub modelview: DMat4,
    /// Clear color for the target.
    pub background: Rgba,
    /// Global pixels covered by the target.
    pub viewport: ViewportTile,
}

impl RenderParams {
    /// Projection as column-major `f32`.
    pub fn projection_f32(&self) -> [f32; 16] {
        to_f32_cols(&self.projection)
    }

    /// Modelview as column-major `f32`.
    pub fn modelview_f32(&self) -> [f32; 16] {
        to_f32_cols(&self.modelview)
    }
}

/// A rank's local drawing capability.
///
/// The pipeline calls [`RenderHook::render`] exactly once per frame with a target sized to
/// `params.viewport`. The hook must clear the target to `params.background`, draw with a depth
/// test (depth in `[0, 1]`, `0` nearest), and leave color and depth readable when it returns.
pub trait RenderHook {
    /// Draw this rank's contribution into `target`.
    fn render(&mut self, params: &RenderParams, target: &mut ImageBuffer) -> CompositeResult<()>;

    /// Row order of what [`RenderHook::render`] leaves in `target`.
    fn row_order(&self) -> RowOrder {
        RowOrder::TopDown
    }
}

impl<F> RenderHook for F
where
    F: FnMut(&RenderParams, &mut ImageBuffer) -> CompositeResult<()>,
{
    fn render(&mut self, params: &RenderParams, target: &mut ImageBuffer) -> CompositeResult<()> {
        self(params, target)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/hook.rs"]
mod tests;
