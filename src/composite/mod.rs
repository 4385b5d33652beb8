//! Sort-last compositing: per-pixel depth merge of every rank's contribution.

pub(crate) mod engine;
pub(crate) mod merge;

pub use engine::{CompositingEngine, EngineStats, MergeStrategy};
pub use merge::{MergeStats, depth_merge_in_place};
