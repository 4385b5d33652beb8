//! Sort-last parallel compositing.
//!
//! A group of ranks each render a color+depth image of their share of a scene; the images are
//! merged per pixel (nearest depth wins, ties go to the lowest rank) into one frame that the
//! coordinator (rank 0) presents. All ranks advance in lockstep.
//!
//! # Per-frame flow
//!
//! 1. **Clock**: the coordinator's time is broadcast so every rank animates from the same value
//!    ([`FrameClock`]).
//! 2. **Draw**: each rank's injected [`RenderHook`] fills its local [`ImageBuffer`].
//! 3. **Composite**: [`CompositingEngine`] normalizes the local buffer and merges it across ranks,
//!    sequentially into rank 0 or by binary-tree reduction ([`MergeStrategy`]). In tiled mode the
//!    tiles are gathered instead.
//! 4. **Present**: [`DisplaySync`] uploads on the coordinator, barriers every rank, then swaps.
//! 5. **Shutdown vote**: each rank's local stop decision is OR-reduced before the next frame.
//!
//! Ranks talk only through the [`Collective`] trait. [`ThreadGroup`] is an in-process
//! implementation with one thread per rank. Like an MPI group it has no timeouts: a rank that
//! skips a collective leaves the others blocked.
#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod comm;
pub mod composite;
mod config;
mod foundation;
pub mod pipeline;
pub mod render;
pub mod sync;
pub mod topology;

pub use comm::{Collective, Message, PANIC_EXIT_CODE, ThreadComm, ThreadGroup};
pub use composite::{CompositingEngine, EngineStats, MergeStats, MergeStrategy, depth_merge_in_place};
pub use config::PipelineConfig;
pub use foundation::core::{Rank, Rgba, RowOrder, ViewportTile};
pub use foundation::error::{CompositeError, CompositeResult};
pub use foundation::math::{FOV_Y_DEG, Z_FAR, Z_NEAR, orbit_modelview};
pub use pipeline::{Animation, FrameState, FrameStats, RankContext, RunReport};
pub use render::{
    CompositeImage, CubeLayout, CubeScene, FAR_DEPTH, ImageBuffer, RenderHook, RenderParams,
};
pub use sync::{
    DisplaySync, FrameClock, MemoryPresenter, MonotonicTime, NullPresenter, PngSequencePresenter,
    Presenter, SteppedTime, TimeSource,
};
pub use topology::{ProcessTopology, TileGrid, TopologyMode, closest_factors};
