use rayon::prelude::*;

use crate::foundation::error::{CompositeError, CompositeResult};
use crate::render::buffer::ImageBuffer;

/// Below this many pixels the merge stays on the calling thread.
pub(crate) const PARALLEL_MIN_PIXELS: usize = 64 * 1024;

/// Counters for one or more depth merges.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MergeStats {
    /// Pixels compared.
    pub compared: u64,
    /// Pixels taken from the incoming image.
    pub replaced: u64,
}

impl std::ops::AddAssign for MergeStats {
    fn add_assign(&mut self, rhs: Self) {
        self.compared += rhs.compared;
        self.replaced += rhs.replaced;
    }
}

#[inline]
fn merge_pixel(dst_color: &mut [u8], dst_depth: &mut f32, src_color: &[u8], src_depth: f32) -> u64 {
    // Strictly nearer only: on a tie the accumulator, which always holds lower ranks, keeps the
    // pixel. NaN never compares less, so it can never win.
    if src_depth < *dst_depth {
        dst_color.copy_from_slice(src_color);
        *dst_depth = src_depth;
        1
    } else {
        0
    }
}

/// Fold `incoming` into `acc` by per-pixel depth test.
///
/// `acc` must only contain contributions from ranks lower than every rank in `incoming`;
/// under that ordering the result is the per-pixel argmin over depth with ties going to the
/// lowest rank, regardless of how the contributions were grouped.
pub fn depth_merge_in_place(
    acc: &mut ImageBuffer,
    incoming: &ImageBuffer,
) -> CompositeResult<MergeStats> {
    if !acc.same_shape(incoming) {
        return Err(CompositeError::validation(format!(
            "cannot merge {}x{} image into {}x{} composite",
            incoming.width, incoming.height, acc.width, acc.height
        )));
    }
    acc.validate()?;
    incoming.validate()?;

    let n = acc.pixel_count();
    let replaced = if n >= PARALLEL_MIN_PIXELS {
        acc.color
            .par_chunks_exact_mut(4)
            .zip(acc.depth.par_iter_mut())
            .zip(
                incoming
                    .color
                    .par_chunks_exact(4)
                    .zip(incoming.depth.par_iter()),
            )
            .map(|((dc, dd), (sc, &sd))| merge_pixel(dc, dd, sc, sd))
            .sum()
    } else {
        acc.color
            .chunks_exact_mut(4)
            .zip(acc.depth.iter_mut())
            .zip(incoming.color.chunks_exact(4).zip(incoming.depth.iter()))
            .map(|((dc, dd), (sc, &sd))| merge_pixel(dc, dd, sc, sd))
            .sum()
    };

    Ok(MergeStats {
        compared: n as u64,
        replaced,
    })
}

#[cfg(test)]
#[path = "../../tests/unit/composite/merge.rs"]
mod tests;
