use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::composite::MergeStrategy;
use crate::foundation::core::Rgba;
use crate::foundation::error::{CompositeError, CompositeResult};
use crate::topology::TopologyMode;

/// Run configuration shared by every rank.
///
/// Loaded from JSON (all fields optional) and/or built from CLI flags. Every rank must run with
/// an identical configuration; the frame count in particular feeds the shutdown vote.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    /// Number of ranks in the group.
    pub ranks: usize,
    /// Full-frame compositing or a tiled grid.
    pub mode: TopologyMode,
    /// Merge strategy for composited mode.
    pub strategy: MergeStrategy,
    /// Frames to render before voting to stop; `None` runs until a stop signal.
    pub frames: Option<u64>,
    /// Clear color.
    pub background: Rgba,
    /// Advance the clock by this many seconds per frame instead of reading wall time.
    pub fixed_time_step: Option<f64>,
    /// Directory for PNG output on the coordinator; `None` disables writing.
    pub output: Option<PathBuf>,
    /// Write every n-th frame when `output` is set.
    pub every: u64,
    /// Stamp a rank marker into each contribution.
    pub debug_overlay: bool,
    /// Log the frame time on the coordinator every n frames; `0` disables.
    pub log_every: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            ranks: 4,
            mode: TopologyMode::Composited,
            strategy: MergeStrategy::Sequential,
            frames: Some(120),
            background: Rgba::light_gray(),
            fixed_time_step: None,
            output: None,
            every: 1,
            debug_overlay: false,
            log_every: 60,
        }
    }
}

impl PipelineConfig {
    /// Parse a JSON document; missing fields take their defaults.
    pub fn from_json_str(s: &str) -> CompositeResult<Self> {
        serde_json::from_str(s)
            .map_err(|e| CompositeError::validation(format!("invalid pipeline config: {e}")))
    }

    /// Read and parse a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> CompositeResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read config '{}'", path.display()))?;
        Self::from_json_str(&text)
    }

    /// Check values that would otherwise fail deep inside a collective.
    pub fn validate(&self) -> CompositeResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(CompositeError::validation(
                "width and height must be positive integers",
            ));
        }
        if self.ranks == 0 {
            return Err(CompositeError::validation("ranks must be >= 1"));
        }
        if self.frames == Some(0) {
            return Err(CompositeError::validation("frames must be >= 1 when set"));
        }
        if self.every == 0 {
            return Err(CompositeError::validation("every must be >= 1"));
        }
        if let Some(step) = self.fixed_time_step
            && (!step.is_finite() || step < 0.0)
        {
            return Err(CompositeError::validation(
                "fixed_time_step must be finite and non-negative",
            ));
        }
        self.background.validate()
    }
}

#[cfg(test)]
#[path = "../tests/unit/config.rs"]
mod tests;
