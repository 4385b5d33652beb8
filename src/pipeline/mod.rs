//! Per-rank frame loop: clock sync, local transform state, composite, present, shutdown vote.

mod state;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, info};

use crate::comm::Collective;
use crate::composite::{CompositingEngine, EngineStats};
use crate::config::PipelineConfig;
use crate::foundation::core::Rgba;
use crate::foundation::error::{CompositeError, CompositeResult};
use crate::render::hook::RenderHook;
use crate::sync::{DisplaySync, FrameClock, MonotonicTime, Presenter, SteppedTime};
use crate::topology::ProcessTopology;

pub use state::{Animation, FrameState};

/// Totals for one rank's run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Frames rendered and composited.
    pub frames: u64,
    /// Frames swapped by the presenter (coordinator only).
    pub presented: u64,
    /// Engine counters.
    pub engine: EngineStats,
    /// Fingerprint of the last composite (coordinator only).
    pub last_fingerprint: Option<u64>,
}

/// What a finished rank hands back.
#[derive(Debug)]
pub struct RunReport<P> {
    /// Final counters.
    pub stats: FrameStats,
    /// Synchronized time of the last frame.
    pub last_time: f64,
    /// The presenter, returned for inspection.
    pub presenter: P,
}

/// Everything one rank owns for the duration of a run.
///
/// Nothing here is shared with other ranks; all coordination goes through `comm`.
pub struct RankContext<C, H, P> {
    comm: C,
    clock: FrameClock,
    animation: Animation,
    engine: CompositingEngine,
    display: DisplaySync<P>,
    hook: H,
    background: Rgba,
    frame_limit: Option<u64>,
    log_every: u64,
    stop: Option<Arc<AtomicBool>>,
    stats: FrameStats,
    last_time: f64,
}

impl<C, H, P> std::fmt::Debug for RankContext<C, H, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RankContext")
            .field("topology", self.engine.topology())
            .field("animation", &self.animation)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl<C, H, P> RankContext<C, H, P>
where
    C: Collective,
    H: RenderHook,
    P: Presenter,
{
    /// Build the context for `comm`'s rank from a validated config.
    pub fn new(comm: C, config: &PipelineConfig, hook: H, presenter: P) -> CompositeResult<Self> {
        config.validate()?;
        if config.ranks != comm.size() {
            return Err(CompositeError::validation(format!(
                "config expects {} ranks but the group has {}",
                config.ranks,
                comm.size()
            )));
        }
        let topology = ProcessTopology::new(
            comm.rank(),
            comm.size(),
            config.mode,
            config.width,
            config.height,
        )?;
        let clock = match config.fixed_time_step {
            Some(step) => FrameClock::new(SteppedTime::new(0.0, step)?),
            None => FrameClock::new(MonotonicTime::new()),
        };
        let engine = CompositingEngine::new(topology, config.strategy, config.background)
            .with_debug_overlay(config.debug_overlay);

        Ok(Self {
            comm,
            clock,
            animation: Animation::default(),
            engine,
            display: DisplaySync::new(presenter),
            hook,
            background: config.background,
            frame_limit: config.frames,
            log_every: config.log_every,
            stop: None,
            stats: FrameStats::default(),
            last_time: 0.0,
        })
    }

    /// Vote to stop once `flag` is set, in addition to any frame limit.
    pub fn with_stop_signal(mut self, flag: Arc<AtomicBool>) -> Self {
        self.stop = Some(flag);
        self
    }

    /// This rank's collective endpoint.
    pub fn comm(&self) -> &C {
        &self.comm
    }

    /// This rank's placement.
    pub fn topology(&self) -> &ProcessTopology {
        self.engine.topology()
    }

    /// Counters so far.
    pub fn stats(&self) -> FrameStats {
        self.stats
    }

    /// This rank's own stop decision, before the group vote.
    pub fn wants_stop(&self) -> bool {
        let limit_reached = self
            .frame_limit
            .is_some_and(|limit| self.stats.frames >= limit);
        let signalled = self
            .stop
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed));
        limit_reached || signalled
    }

    /// Render, composite and present one frame.
    #[tracing::instrument(skip_all, fields(rank = self.comm.rank().0, frame = self.stats.frames))]
    pub fn step(&mut self) -> CompositeResult<FrameState> {
        let (now, dt) = self.clock.tick(&self.comm)?;
        self.animation.advance(dt);

        let topology = self.engine.topology();
        let state = FrameState {
            frame: self.stats.frames,
            current_time: now,
            delta_time: dt,
            modelview: self.animation.modelview(),
            projection: topology.projection(),
            background: self.background,
        };
        let params = state.render_params(topology.rank(), topology.local_tile());

        let composite = self
            .engine
            .composite_frame(&self.comm, &mut self.hook, &params)?;
        if let Some(image) = composite {
            let fp = image.fingerprint();
            debug!(frame = state.frame, fingerprint = %format!("{fp:016x}"), "composited");
            self.stats.last_fingerprint = Some(fp);
        }
        self.display.end_frame(&self.comm, state.frame, composite)?;

        if self.comm.is_coordinator()
            && self.log_every > 0
            && state.frame > 0
            && state.frame % self.log_every == 0
        {
            info!(
                frame = state.frame,
                frame_ms = dt * 1000.0,
                "frame time"
            );
        }

        self.stats.frames += 1;
        self.stats.presented = self.display.presented();
        self.stats.engine = self.engine.stats();
        self.last_time = now;
        Ok(state)
    }

    /// Seed the clock, then step until the group votes to stop.
    ///
    /// The vote is a logical OR over every rank's [`RankContext::wants_stop`], taken before each
    /// frame, so all ranks leave the loop after the same frame.
    pub fn run(mut self) -> CompositeResult<RunReport<P>> {
        let origin = self.clock.start(&self.comm)?;
        self.last_time = origin;
        info!(rank = %self.comm.rank(), topology = ?self.engine.topology().mode(), "rank started");

        while !self.comm.all_reduce_or(self.wants_stop())? {
            self.step()?;
        }

        info!(rank = %self.comm.rank(), frames = self.stats.frames, "rank finished");
        Ok(RunReport {
            stats: self.stats,
            last_time: self.last_time,
            presenter: self.display.into_presenter(),
        })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/mod.rs"]
mod tests;
