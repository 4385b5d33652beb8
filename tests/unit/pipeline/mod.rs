use super::*;
use crate::comm::ThreadGroup;
use crate::composite::MergeStrategy;
use crate::foundation::core::Rank;
use crate::foundation::error::CompositeError;
use crate::render::buffer::ImageBuffer;
use crate::render::hook::RenderParams;
use crate::render::{CubeLayout, CubeScene};
use crate::sync::MemoryPresenter;
use crate::topology::TopologyMode;

fn small_config(frames: Option<u64>) -> PipelineConfig {
    PipelineConfig {
        width: 24,
        height: 16,
        ranks: 3,
        frames,
        fixed_time_step: Some(0.5),
        log_every: 0,
        ..PipelineConfig::default()
    }
}

#[test]
fn frame_limit_stops_every_rank_together() {
    let config = small_config(Some(4));
    let reports = ThreadGroup::run(3, |comm| {
        let scene = CubeScene::new(CubeLayout::Ring {
            index: comm.rank().0,
            count: 3,
        });
        RankContext::new(comm, &config, scene, MemoryPresenter::default())?.run()
    })
    .unwrap();

    for (rank, report) in reports.into_iter().enumerate() {
        let report = report.unwrap();
        assert_eq!(report.stats.frames, 4);
        assert_eq!(report.last_time, 2.0);
        if rank == 0 {
            assert_eq!(report.stats.presented, 4);
            assert_eq!(report.presenter.history.len(), 4);
            assert_eq!(
                report.stats.last_fingerprint,
                report.presenter.history.last().map(|&(_, fp)| fp)
            );
        } else {
            assert_eq!(report.stats.presented, 0);
            assert!(report.presenter.history.is_empty());
            assert_eq!(report.stats.last_fingerprint, None);
        }
    }
}

#[test]
fn one_rank_stop_signal_ends_the_group() {
    let config = small_config(None);
    let flag = Arc::new(AtomicBool::new(false));
    let reports = ThreadGroup::run(3, |comm| {
        let rank = comm.rank();
        let trigger = Arc::clone(&flag);
        let hook = move |p: &RenderParams, _: &mut ImageBuffer| -> CompositeResult<()> {
            if p.rank == Rank(1) && p.frame == 2 {
                trigger.store(true, Ordering::Relaxed);
            }
            Ok(())
        };
        let ctx = RankContext::new(comm, &config, hook, MemoryPresenter::default())?;
        // Only rank 1 watches the flag; the others learn about it from the vote.
        let ctx = if rank == Rank(1) {
            ctx.with_stop_signal(Arc::clone(&flag))
        } else {
            ctx
        };
        ctx.run()
    })
    .unwrap();

    for report in reports {
        assert_eq!(report.unwrap().stats.frames, 3);
    }
}

#[test]
fn step_builds_identical_state_on_every_rank() {
    let config = PipelineConfig {
        strategy: MergeStrategy::Tree,
        ..small_config(Some(2))
    };
    let states = ThreadGroup::run(3, |comm| {
        let hook = |_: &RenderParams, _: &mut ImageBuffer| -> CompositeResult<()> { Ok(()) };
        let mut ctx = RankContext::new(comm, &config, hook, MemoryPresenter::default())?;
        ctx.clock.start(&ctx.comm)?;
        let a = ctx.step()?;
        let b = ctx.step()?;
        Ok::<_, CompositeError>((a, b))
    })
    .unwrap();

    let first = states[0].as_ref().unwrap();
    assert_eq!(first.0.current_time, 0.5);
    assert_eq!(first.1.delta_time, 0.5);
    assert_eq!(first.1.frame, 1);
    for s in &states {
        assert_eq!(s.as_ref().unwrap(), first);
    }
}

#[test]
fn tiled_mode_presents_full_extent() {
    let config = PipelineConfig {
        mode: TopologyMode::Tiled,
        ranks: 4,
        ..small_config(Some(1))
    };
    let reports = ThreadGroup::run(4, |comm| {
        RankContext::new(
            comm,
            &config,
            CubeScene::new(CubeLayout::Shared),
            MemoryPresenter::default(),
        )?
        .run()
    })
    .unwrap();

    let coordinator = reports.into_iter().next().unwrap().unwrap();
    let last = coordinator.presenter.last.unwrap();
    // 2x2 grid over 24x16.
    assert_eq!((last.width, last.height), (24, 16));
}

#[test]
fn hook_error_surfaces_from_run() {
    let config = PipelineConfig {
        ranks: 1,
        ..small_config(Some(3))
    };
    let results = ThreadGroup::run(1, |comm| {
        let hook = |_: &RenderParams, _: &mut ImageBuffer| -> CompositeResult<()> {
            Err(CompositeError::render("device lost"))
        };
        RankContext::new(comm, &config, hook, MemoryPresenter::default())?
            .run()
            .map(|r| r.stats)
    })
    .unwrap();
    let err = results.into_iter().next().unwrap().unwrap_err();
    assert!(err.to_string().contains("device lost"));
}

#[test]
fn invalid_config_is_rejected_before_any_collective() {
    let config = PipelineConfig {
        width: 0,
        ..small_config(Some(1))
    };
    let mut comms = ThreadGroup::connect(1).unwrap();
    let comm = comms.pop().unwrap();
    let hook = |_: &RenderParams, _: &mut ImageBuffer| -> CompositeResult<()> { Ok(()) };
    assert!(RankContext::new(comm, &config, hook, MemoryPresenter::default()).is_err());
}

#[test]
fn rank_count_must_match_the_group() {
    let config = small_config(Some(1));
    let mut comms = ThreadGroup::connect(2).unwrap();
    let comm = comms.remove(0);
    let hook = |_: &RenderParams, _: &mut ImageBuffer| -> CompositeResult<()> { Ok(()) };
    let err = RankContext::new(comm, &config, hook, MemoryPresenter::default()).unwrap_err();
    assert!(err.to_string().contains("expects 3 ranks but the group has 2"));
}
