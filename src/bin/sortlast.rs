use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, ValueEnum};
use sortlast::{
    Collective, CompositeImage, CompositeResult, CubeLayout, CubeScene, FrameStats, MergeStrategy,
    NullPresenter, PipelineConfig, PngSequencePresenter, Presenter, RankContext, ThreadComm,
    ThreadGroup, TopologyMode,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "sortlast", version, about = "Sort-last compositing of a spinning cube scene")]
struct Cli {
    /// JSON pipeline config; flags below override its values.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output width in pixels.
    #[arg(long)]
    width: Option<u32>,

    /// Output height in pixels.
    #[arg(long)]
    height: Option<u32>,

    /// Number of ranks (one thread each).
    #[arg(long)]
    ranks: Option<usize>,

    /// Composite full frames or assemble a tiled grid.
    #[arg(long, value_enum)]
    mode: Option<ModeArg>,

    /// How composited ranks merge their images.
    #[arg(long, value_enum)]
    strategy: Option<StrategyArg>,

    /// Frames to render.
    #[arg(long)]
    frames: Option<u64>,

    /// Directory for PNG frames written by rank 0.
    #[arg(long)]
    out: Option<PathBuf>,

    /// Write every n-th frame.
    #[arg(long)]
    every: Option<u64>,

    /// Write frames as PNGs (into `--out`, or `./capture`).
    #[arg(long, default_value_t = false)]
    capture: bool,

    /// Stamp a rank-colored marker into each contribution.
    #[arg(long, default_value_t = false)]
    debug_overlay: bool,

    /// Advance time by this many seconds per frame instead of wall time.
    #[arg(long)]
    fixed_time_step: Option<f64>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ModeArg {
    Composited,
    Tiled,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum StrategyArg {
    Sequential,
    Tree,
}

/// Rank 0 may write PNGs; everyone else presents nothing.
#[derive(Debug)]
enum Output {
    Null(NullPresenter),
    Png(PngSequencePresenter),
}

impl Presenter for Output {
    fn upload(&mut self, frame: u64, image: &CompositeImage) -> CompositeResult<()> {
        match self {
            Self::Null(p) => p.upload(frame, image),
            Self::Png(p) => p.upload(frame, image),
        }
    }

    fn swap(&mut self) -> CompositeResult<()> {
        match self {
            Self::Null(p) => p.swap(),
            Self::Png(p) => p.swap(),
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    config.validate().context("invalid pipeline config")?;

    let stats = ThreadGroup::run(config.ranks, |comm| {
        let handle = comm.clone();
        match run_rank(comm, &config) {
            Ok(stats) => stats,
            Err(err) => {
                tracing::error!(rank = %handle.rank(), error = %err, "rank failed");
                handle.abort(1)
            }
        }
    })
    .context("run rank group")?;

    if let Some(coordinator) = stats.first() {
        tracing::info!(
            frames = coordinator.frames,
            presented = coordinator.presented,
            replaced = coordinator.engine.merge.replaced,
            "done"
        );
    }
    if let Some(dir) = &config.output {
        eprintln!("wrote {}", dir.display());
    }
    Ok(())
}

fn load_config(cli: &Cli) -> anyhow::Result<PipelineConfig> {
    let mut config = match &cli.config {
        Some(path) => PipelineConfig::from_path(path)?,
        None => PipelineConfig::default(),
    };

    if let Some(w) = cli.width {
        config.width = w;
    }
    if let Some(h) = cli.height {
        config.height = h;
    }
    if let Some(r) = cli.ranks {
        config.ranks = r;
    }
    if let Some(m) = cli.mode {
        config.mode = match m {
            ModeArg::Composited => TopologyMode::Composited,
            ModeArg::Tiled => TopologyMode::Tiled,
        };
    }
    if let Some(s) = cli.strategy {
        config.strategy = match s {
            StrategyArg::Sequential => MergeStrategy::Sequential,
            StrategyArg::Tree => MergeStrategy::Tree,
        };
    }
    if let Some(n) = cli.frames {
        config.frames = Some(n);
    }
    if let Some(dir) = &cli.out {
        config.output = Some(dir.clone());
    }
    if cli.capture && config.output.is_none() {
        config.output = Some(PathBuf::from("capture"));
    }
    if let Some(n) = cli.every {
        config.every = n;
    }
    if cli.debug_overlay {
        config.debug_overlay = true;
    }
    if let Some(step) = cli.fixed_time_step {
        config.fixed_time_step = Some(step);
    }
    Ok(config)
}

fn run_rank(comm: ThreadComm, config: &PipelineConfig) -> CompositeResult<FrameStats> {
    let rank = comm.rank();
    let scene = match config.mode {
        TopologyMode::Composited => CubeScene::new(CubeLayout::Ring {
            index: rank.0,
            count: comm.size(),
        }),
        TopologyMode::Tiled => CubeScene::new(CubeLayout::Shared),
    };
    let output = match &config.output {
        Some(dir) if rank.is_coordinator() => {
            Output::Png(PngSequencePresenter::new(dir, config.every)?)
        }
        _ => Output::Null(NullPresenter),
    };

    let report = RankContext::new(comm, config, scene, output)?.run()?;
    Ok(report.stats)
}
