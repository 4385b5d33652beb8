use super::*;
use crate::foundation::core::{Rank, Rgba, ViewportTile};
use crate::foundation::math::{frustum, orbit_modelview};

fn params(w: u32, h: u32) -> RenderParams {
    RenderParams {
        rank: Rank(0),
        frame: 0,
        projection: frustum(-0.1, 0.1, -0.1, 0.1, 0.1, 100.0),
        modelview: orbit_modelview(30.0, -45.0),
        background: Rgba::new(0.0, 0.0, 0.0, 1.0),
        viewport: ViewportTile::full(w, h),
    }
}

#[test]
fn shared_cube_covers_the_center_and_not_the_corners() {
    let p = params(32, 32);
    let mut target = ImageBuffer::new(32, 32, Rgba::new(1.0, 1.0, 1.0, 1.0));
    CubeScene::new(CubeLayout::Shared)
        .render(&p, &mut target)
        .unwrap();

    let (center, depth) = target.pixel(16, 16).unwrap();
    assert_ne!(center, [0, 0, 0, 255]);
    assert!(depth > 0.0 && depth < 1.0);
    assert_eq!(target.pixel(0, 0), Some(([0, 0, 0, 255], 1.0)));
}

#[test]
fn ring_slots_are_tinted_differently() {
    let p = params(48, 48);
    let mut a = ImageBuffer::new(48, 48, p.background);
    let mut b = ImageBuffer::new(48, 48, p.background);
    CubeScene::new(CubeLayout::Ring { index: 0, count: 2 })
        .render(&p, &mut a)
        .unwrap();
    CubeScene::new(CubeLayout::Ring { index: 1, count: 2 })
        .render(&p, &mut b)
        .unwrap();
    assert_ne!(a.fingerprint(), b.fingerprint());
    assert!(a.depth.iter().any(|&d| d < 1.0));
    assert!(b.depth.iter().any(|&d| d < 1.0));
}

#[test]
fn mismatched_target_is_a_render_error() {
    let p = params(16, 16);
    let mut target = ImageBuffer::new(8, 8, p.background);
    let err = CubeScene::new(CubeLayout::Shared)
        .render(&p, &mut target)
        .unwrap_err();
    assert!(err.to_string().contains("render error"));
}
