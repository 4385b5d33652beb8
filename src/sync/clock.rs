use std::time::Instant;

use crate::comm::Collective;
use crate::foundation::core::Rank;
use crate::foundation::error::{CompositeError, CompositeResult};

/// Source of wall-clock seconds, only ever read on the coordinator.
pub trait TimeSource: Send {
    /// Current time in seconds. Must not decrease.
    fn now(&mut self) -> f64;
}

/// Seconds elapsed since construction, from [`Instant`].
#[derive(Clone, Copy, Debug)]
pub struct MonotonicTime {
    origin: Instant,
}

impl MonotonicTime {
    /// Start counting from now.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicTime {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for MonotonicTime {
    fn now(&mut self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

/// Deterministic time that advances by a fixed step on every read.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SteppedTime {
    next: f64,
    step: f64,
}

impl SteppedTime {
    /// First read returns `start`, each later read adds `step`.
    pub fn new(start: f64, step: f64) -> CompositeResult<Self> {
        if !start.is_finite() || !step.is_finite() || step < 0.0 {
            return Err(CompositeError::validation(
                "stepped time needs a finite start and a finite, non-negative step",
            ));
        }
        Ok(Self { next: start, step })
    }
}

impl TimeSource for SteppedTime {
    fn now(&mut self) -> f64 {
        let t = self.next;
        self.next += self.step;
        t
    }
}

/// Per-frame synchronized time.
///
/// The coordinator samples its [`TimeSource`] and broadcasts the value, so every rank sees the
/// same bits for the same frame. Each call is a collective: all ranks must call it the same
/// number of times or the group hangs at the next broadcast.
pub struct FrameClock {
    source: Box<dyn TimeSource>,
    last: Option<f64>,
}

impl std::fmt::Debug for FrameClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameClock")
            .field("last", &self.last)
            .finish_non_exhaustive()
    }
}

impl FrameClock {
    /// Clock backed by `source`; non-coordinator ranks never read it.
    pub fn new(source: impl TimeSource + 'static) -> Self {
        Self {
            source: Box::new(source),
            last: None,
        }
    }

    /// Broadcast the coordinator's current time; identical on every rank.
    pub fn sync_time(&mut self, comm: &dyn Collective) -> CompositeResult<f64> {
        let local = if comm.is_coordinator() {
            self.source.now()
        } else {
            f64::NAN
        };
        let now = comm.broadcast_f64(Rank::COORDINATOR, local)?;
        if !now.is_finite() {
            return Err(CompositeError::collective(
                "coordinator broadcast a non-finite frame time",
            ));
        }
        Ok(now)
    }

    /// Elapsed seconds between two synchronized times.
    pub fn delta(prev: f64, now: f64) -> f64 {
        now - prev
    }

    /// Establish the shared time origin so the first frame's delta is measured from it.
    pub fn start(&mut self, comm: &dyn Collective) -> CompositeResult<f64> {
        let t = self.sync_time(comm)?;
        self.last = Some(t);
        Ok(t)
    }

    /// Synchronize this frame's time and return `(now, delta)`.
    ///
    /// Without a prior [`FrameClock::start`] the first delta is zero.
    pub fn tick(&mut self, comm: &dyn Collective) -> CompositeResult<(f64, f64)> {
        let now = self.sync_time(comm)?;
        let dt = Self::delta(self.last.unwrap_or(now), now);
        self.last = Some(now);
        Ok((now, dt))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/sync/clock.rs"]
mod tests;
