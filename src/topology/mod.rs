//! Rank placement: which pixels a rank renders and through which frustum.

pub(crate) mod grid;

use glam::DMat4;

use crate::foundation::core::{Rank, ViewportTile};
use crate::foundation::error::{CompositeError, CompositeResult};
use crate::foundation::math::{FOV_Y_DEG, Z_FAR, Z_NEAR, frustum, near_plane_half_extents};

pub use grid::{TileGrid, closest_factors};

/// How the global viewport is shared between ranks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TopologyMode {
    /// Every rank renders the full frame; results are depth-merged.
    #[default]
    Composited,
    /// Every rank owns a distinct grid cell with its own frustum slice; results are gathered.
    Tiled,
}

/// Placement of one rank within the group.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProcessTopology {
    rank: Rank,
    size: usize,
    mode: TopologyMode,
    grid: TileGrid,
    tile_w: u32,
    tile_h: u32,
}

impl ProcessTopology {
    /// Place `rank` in a group of `size` ranks sharing a `width x height` output.
    pub fn new(
        rank: Rank,
        size: usize,
        mode: TopologyMode,
        width: u32,
        height: u32,
    ) -> CompositeResult<Self> {
        if rank.0 >= size {
            return Err(CompositeError::validation(format!(
                "{rank} is outside a group of {size}"
            )));
        }
        if width == 0 || height == 0 {
            return Err(CompositeError::validation(
                "output width and height must be positive",
            ));
        }

        let grid = match mode {
            TopologyMode::Composited => TileGrid { rows: 1, cols: 1 },
            TopologyMode::Tiled => TileGrid::for_count(size)?,
        };
        let tile_w = width / grid.cols as u32;
        let tile_h = height / grid.rows as u32;
        if tile_w == 0 || tile_h == 0 {
            return Err(CompositeError::validation(format!(
                "{width}x{height} output is too small for a {}x{} tile grid",
                grid.cols, grid.rows
            )));
        }

        Ok(Self {
            rank,
            size,
            mode,
            grid,
            tile_w,
            tile_h,
        })
    }

    /// This process's rank.
    pub fn rank(&self) -> Rank {
        self.rank
    }

    /// Number of ranks in the group.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Viewport sharing mode.
    pub fn mode(&self) -> TopologyMode {
        self.mode
    }

    /// Size of the assembled output image.
    ///
    /// In tiled mode this can be smaller than the requested size when it does not divide evenly.
    pub fn global_extent(&self) -> (u32, u32) {
        (
            self.tile_w * self.grid.cols as u32,
            self.tile_h * self.grid.rows as u32,
        )
    }

    /// Tile rendered by `rank`, in global pixel coordinates.
    pub fn tile_of(&self, rank: Rank) -> ViewportTile {
        match self.mode {
            TopologyMode::Composited => ViewportTile::full(self.tile_w, self.tile_h),
            TopologyMode::Tiled => {
                let (col, row) = self.grid.cell_of(rank.0);
                ViewportTile {
                    x: col as u32 * self.tile_w,
                    y: row as u32 * self.tile_h,
                    width: self.tile_w,
                    height: self.tile_h,
                }
            }
        }
    }

    /// Tile rendered by this rank.
    pub fn local_tile(&self) -> ViewportTile {
        self.tile_of(self.rank)
    }

    /// Projection for this rank: the full frustum, or this rank's slice of it.
    pub fn projection(&self) -> DMat4 {
        let (gw, gh) = self.global_extent();
        let aspect = f64::from(gw) / f64::from(gh);
        let (fw, fh) = near_plane_half_extents(FOV_Y_DEG, aspect, Z_NEAR);

        let cols = self.grid.cols as f64;
        let rows = self.grid.rows as f64;
        let (col, row) = match self.mode {
            TopologyMode::Composited => (0.0, 0.0),
            TopologyMode::Tiled => {
                let (c, r) = self.grid.cell_of(self.rank.0);
                (c as f64, r as f64)
            }
        };

        let h1 = col / cols;
        let h2 = (col + 1.0) / cols;
        // Grid rows count from the top, frustum space counts from the bottom.
        let v1 = (rows - row - 1.0) / rows;
        let v2 = (rows - row) / rows;

        let left = h1 * 2.0 * fw - fw;
        let right = h2 * 2.0 * fw - fw;
        let bottom = v1 * 2.0 * fh - fh;
        let top = v2 * 2.0 * fh - fh;
        frustum(left, right, bottom, top, Z_NEAR, Z_FAR)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/topology/mod.rs"]
mod tests;
