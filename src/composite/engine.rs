use crate::comm::Collective;
use crate::composite::merge::{MergeStats, depth_merge_in_place};
use crate::foundation::core::{Rank, Rgba, RowOrder};
use crate::foundation::error::{CompositeError, CompositeResult};
use crate::foundation::math::ensure_finite;
use crate::render::buffer::{CompositeImage, ImageBuffer};
use crate::render::hook::{RenderHook, RenderParams};
use crate::topology::{ProcessTopology, TopologyMode};

/// How local contributions are combined into the composite.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeStrategy {
    /// The coordinator folds every rank's image in rank order. `size - 1` transfers into one
    /// rank; the simplest choice for a single output tile.
    #[default]
    Sequential,
    /// Pairwise binary-tree reduction over `ceil(log2(size))` rounds, spreading the per-pixel
    /// comparisons across ranks.
    Tree,
}

/// Running totals for one rank's engine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EngineStats {
    /// Frames composited.
    pub frames: u64,
    /// Images received from other ranks.
    pub images_received: u64,
    /// Depth merge counters, for merges performed on this rank.
    pub merge: MergeStats,
    /// Pixels whose local depth was non-finite and got reset.
    pub depth_sanitized: u64,
    /// Transfer buffers allocated for sending; stays at one after the first frame.
    pub transfer_allocations: u64,
}

/// Per-rank sort-last compositor.
///
/// Each frame runs four phases in order: prepare the composite, draw locally, read back and
/// normalize, then merge collectively. Buffers are allocated once and reused.
#[derive(Debug)]
pub struct CompositingEngine {
    topology: ProcessTopology,
    strategy: MergeStrategy,
    debug_overlay: bool,
    local: ImageBuffer,
    composite: Option<ImageBuffer>,
    // Comes back from the receiving rank after every send.
    transfer: Option<ImageBuffer>,
    stats: EngineStats,
}

impl CompositingEngine {
    /// Engine for the rank described by `topology`.
    pub fn new(topology: ProcessTopology, strategy: MergeStrategy, background: Rgba) -> Self {
        let tile = topology.local_tile();
        let local = ImageBuffer::new(tile.width, tile.height, background);

        let needs_composite = topology.rank().is_coordinator()
            || (topology.mode() == TopologyMode::Composited && strategy == MergeStrategy::Tree);
        let composite = needs_composite.then(|| {
            let (w, h) = topology.global_extent();
            ImageBuffer::new(w, h, background)
        });

        Self {
            topology,
            strategy,
            debug_overlay: false,
            local,
            composite,
            transfer: None,
            stats: EngineStats::default(),
        }
    }

    /// Stamp a rank-colored marker into a corner of every local contribution.
    pub fn with_debug_overlay(mut self, enabled: bool) -> Self {
        self.debug_overlay = enabled;
        self
    }

    /// This rank's placement.
    pub fn topology(&self) -> &ProcessTopology {
        &self.topology
    }

    /// Merge strategy in use.
    pub fn strategy(&self) -> MergeStrategy {
        self.strategy
    }

    /// Counters accumulated so far.
    pub fn stats(&self) -> EngineStats {
        self.stats
    }

    /// The most recent local contribution, after readback.
    pub fn local(&self) -> &ImageBuffer {
        &self.local
    }

    /// Run one frame through all four phases.
    ///
    /// Returns the composite on the coordinator and `None` elsewhere. The borrow ends before
    /// the next frame's prepare phase can run.
    #[tracing::instrument(skip_all, fields(rank = comm.rank().0, frame = params.frame))]
    pub fn composite_frame(
        &mut self,
        comm: &dyn Collective,
        hook: &mut dyn RenderHook,
        params: &RenderParams,
    ) -> CompositeResult<Option<&CompositeImage>> {
        if comm.rank() != self.topology.rank() || comm.size() != self.topology.size() {
            return Err(CompositeError::validation(format!(
                "engine was built for {} of {} but runs as {} of {}",
                self.topology.rank(),
                self.topology.size(),
                comm.rank(),
                comm.size()
            )));
        }
        ensure_finite("projection", &params.projection)?;
        ensure_finite("modelview", &params.modelview)?;
        if params.viewport != self.topology.local_tile() {
            return Err(CompositeError::validation(
                "render viewport does not match this rank's tile",
            ));
        }

        self.prepare(params.background);
        self.local_draw(hook, params)?;
        self.readback(hook.row_order(), params.background)?;
        match (self.topology.mode(), self.strategy) {
            (TopologyMode::Tiled, _) => self.gather_tiles(comm)?,
            (TopologyMode::Composited, MergeStrategy::Sequential) => self.merge_sequential(comm)?,
            (TopologyMode::Composited, MergeStrategy::Tree) => self.merge_tree(comm)?,
        }
        self.stats.frames += 1;

        Ok(if comm.is_coordinator() {
            self.composite.as_ref()
        } else {
            None
        })
    }

    fn prepare(&mut self, background: Rgba) {
        if let Some(c) = self.composite.as_mut() {
            c.clear(background);
        }
    }

    fn local_draw(&mut self, hook: &mut dyn RenderHook, params: &RenderParams) -> CompositeResult<()> {
        // Pixels the hook leaves alone must still be valid background/far data.
        self.local.clear(params.background);
        hook.render(params, &mut self.local)?;

        let tile = self.topology.local_tile();
        if self.local.width != tile.width || self.local.height != tile.height {
            return Err(CompositeError::render(format!(
                "hook resized its target to {}x{}",
                self.local.width, self.local.height
            )));
        }
        self.local.validate()
    }

    fn readback(&mut self, order: RowOrder, background: Rgba) -> CompositeResult<()> {
        self.local.normalize_row_order(order);
        let reset = self.local.sanitize(background);
        if reset > 0 {
            tracing::warn!(pixels = reset, "non-finite depth reset to far");
            self.stats.depth_sanitized += reset as u64;
        }
        if self.debug_overlay {
            stamp_rank_marker(&mut self.local, self.topology.rank());
        }
        Ok(())
    }

    fn receive_same_shape(
        &mut self,
        comm: &dyn Collective,
        from: Rank,
        width: u32,
        height: u32,
    ) -> CompositeResult<ImageBuffer> {
        let img = comm.recv_image(from)?;
        self.stats.images_received += 1;
        if img.width != width || img.height != height {
            return Err(CompositeError::collective(format!(
                "{from} sent a {}x{} image, expected {width}x{height}",
                img.width, img.height
            )));
        }
        Ok(img)
    }

    fn merge_sequential(&mut self, comm: &dyn Collective) -> CompositeResult<()> {
        let root = Rank::COORDINATOR;
        if comm.rank() != root {
            return lend_copy(comm, &mut self.transfer, &mut self.stats, root, &self.local);
        }

        let (w, h) = (self.local.width, self.local.height);
        let mut total = depth_merge_in_place(composite_slot(&mut self.composite)?, &self.local)?;
        for r in (1..comm.size()).map(Rank) {
            let incoming = self.receive_same_shape(comm, r, w, h)?;
            total += depth_merge_in_place(composite_slot(&mut self.composite)?, &incoming)?;
            comm.send_image(r, incoming)?;
        }
        self.stats.merge += total;
        tracing::debug!(replaced = total.replaced, "sequential merge done");
        Ok(())
    }

    fn merge_tree(&mut self, comm: &dyn Collective) -> CompositeResult<()> {
        let me = comm.rank().0;
        let size = comm.size();
        let (w, h) = (self.local.width, self.local.height);

        let mut total = depth_merge_in_place(composite_slot(&mut self.composite)?, &self.local)?;
        let mut stride = 1usize;
        while stride < size {
            if me % (2 * stride) == stride {
                // Everything below `me` in this subtree is already folded in; hand it to the
                // partner on the left, which holds the lower ranks.
                let partial = composite_slot(&mut self.composite)?;
                lend_copy(comm, &mut self.transfer, &mut self.stats, Rank(me - stride), partial)?;
                break;
            }
            let peer = me + stride;
            if peer < size {
                let incoming = self.receive_same_shape(comm, Rank(peer), w, h)?;
                total += depth_merge_in_place(composite_slot(&mut self.composite)?, &incoming)?;
                comm.send_image(Rank(peer), incoming)?;
            }
            stride *= 2;
        }
        self.stats.merge += total;
        tracing::debug!(replaced = total.replaced, "tree merge done");
        Ok(())
    }

    fn gather_tiles(&mut self, comm: &dyn Collective) -> CompositeResult<()> {
        let root = Rank::COORDINATOR;
        if comm.rank() != root {
            return lend_copy(comm, &mut self.transfer, &mut self.stats, root, &self.local);
        }

        composite_slot(&mut self.composite)?.blit(self.topology.local_tile(), &self.local)?;
        for r in (1..comm.size()).map(Rank) {
            let tile = self.topology.tile_of(r);
            let incoming = self.receive_same_shape(comm, r, tile.width, tile.height)?;
            composite_slot(&mut self.composite)?.blit(tile, &incoming)?;
            comm.send_image(r, incoming)?;
        }
        Ok(())
    }
}

/// Copy `src` into the reusable transfer buffer, lend it to `to`, and keep it once it comes back.
fn lend_copy(
    comm: &dyn Collective,
    transfer: &mut Option<ImageBuffer>,
    stats: &mut EngineStats,
    to: Rank,
    src: &ImageBuffer,
) -> CompositeResult<()> {
    let out = match transfer.take() {
        Some(mut buf) if buf.same_shape(src) => {
            buf.copy_from(src)?;
            buf
        }
        _ => {
            stats.transfer_allocations += 1;
            src.clone()
        }
    };
    *transfer = Some(comm.lend_image(to, out)?);
    Ok(())
}

fn composite_slot(slot: &mut Option<ImageBuffer>) -> CompositeResult<&mut ImageBuffer> {
    slot.as_mut()
        .ok_or_else(|| CompositeError::collective("this rank holds no composite buffer"))
}

const MARKER_COLORS: [[u8; 4]; 4] = [
    [255, 0, 0, 255],
    [0, 255, 0, 255],
    [0, 0, 255, 255],
    [255, 255, 0, 255],
];

/// Nearest-depth square in the corner picked by `rank % 4`
/// (top-left, top-right, bottom-left, bottom-right).
fn stamp_rank_marker(img: &mut ImageBuffer, rank: Rank) {
    let side = (img.width.min(img.height) / 16).max(1);
    let corner = rank.0 % 4;
    let x0 = if corner % 2 == 0 { 0 } else { img.width - side };
    let y0 = if corner < 2 { 0 } else { img.height - side };
    let color = MARKER_COLORS[corner];
    for y in y0..y0 + side {
        for x in x0..x0 + side {
            img.set_pixel(x, y, color, 0.0);
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/composite/engine.rs"]
mod tests;
