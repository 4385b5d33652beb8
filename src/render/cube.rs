//! Software-rasterized demo scene: flat-colored cubes with a z-buffer.

use glam::{DMat4, DVec3, DVec4};

use crate::foundation::error::{CompositeError, CompositeResult};
use crate::render::buffer::ImageBuffer;
use crate::render::hook::{RenderHook, RenderParams};

const CORNERS: [[f64; 3]; 8] = [
    [-1.0, -1.0, 1.0],
    [1.0, -1.0, 1.0],
    [1.0, 1.0, 1.0],
    [-1.0, 1.0, 1.0],
    [-1.0, -1.0, -1.0],
    [1.0, -1.0, -1.0],
    [1.0, 1.0, -1.0],
    [-1.0, 1.0, -1.0],
];

// Front, back, top, bottom, right, left.
const FACES: [[usize; 4]; 6] = [
    [0, 1, 2, 3],
    [5, 4, 7, 6],
    [3, 2, 6, 7],
    [4, 5, 1, 0],
    [1, 5, 6, 2],
    [4, 0, 3, 7],
];

const FACE_COLORS: [[u8; 3]; 6] = [
    [200, 120, 60],
    [150, 90, 45],
    [230, 170, 100],
    [110, 70, 35],
    [180, 110, 55],
    [130, 80, 40],
];

const RANK_TINTS: [[u8; 3]; 8] = [
    [230, 60, 60],
    [60, 200, 80],
    [70, 110, 230],
    [230, 200, 60],
    [200, 80, 200],
    [60, 200, 200],
    [240, 140, 40],
    [140, 140, 140],
];

/// Where a rank's cube sits in the shared scene.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CubeLayout {
    /// One unit cube at the origin, drawn identically by every rank (tiled mode).
    Shared,
    /// Rank `index` of `count` draws a smaller cube on a ring around the origin, so the ranks'
    /// contributions overlap in depth and must be composited.
    Ring {
        /// This rank's slot.
        index: usize,
        /// Number of slots on the ring.
        count: usize,
    },
}

/// Demo [`RenderHook`] drawing one cube per rank.
#[derive(Clone, Debug)]
pub struct CubeScene {
    layout: CubeLayout,
}

impl CubeScene {
    /// Scene with the given cube placement.
    pub fn new(layout: CubeLayout) -> Self {
        Self { layout }
    }

    fn model(&self) -> DMat4 {
        match self.layout {
            CubeLayout::Shared => DMat4::IDENTITY,
            CubeLayout::Ring { count, .. } if count <= 1 => DMat4::IDENTITY,
            CubeLayout::Ring { index, count } => {
                let theta = std::f64::consts::TAU * index as f64 / count as f64;
                DMat4::from_translation(DVec3::new(theta.cos() * 1.4, 0.0, theta.sin() * 1.4))
                    * DMat4::from_scale(DVec3::splat(0.6))
            }
        }
    }

    fn tint(&self) -> Option<[u8; 3]> {
        match self.layout {
            CubeLayout::Shared => None,
            CubeLayout::Ring { index, .. } => Some(RANK_TINTS[index % RANK_TINTS.len()]),
        }
    }
}

impl RenderHook for CubeScene {
    fn render(&mut self, params: &RenderParams, target: &mut ImageBuffer) -> CompositeResult<()> {
        if target.width != params.viewport.width || target.height != params.viewport.height {
            return Err(CompositeError::render(format!(
                "target is {}x{} but viewport is {}x{}",
                target.width, target.height, params.viewport.width, params.viewport.height
            )));
        }
        target.clear(params.background);

        let mvp = params.projection * params.modelview * self.model();
        let mut screen = [None; 8];
        for (out, c) in screen.iter_mut().zip(CORNERS.iter()) {
            *out = to_window(&mvp, DVec3::from_array(*c), target.width, target.height);
        }

        let tint = self.tint();
        for (face, base) in FACES.iter().zip(FACE_COLORS.iter()) {
            let color = shade(*base, tint);
            let [a, b, c, d] = face.map(|i| screen[i]);
            for tri in [[a, b, c], [a, c, d]] {
                // Triangles crossing the near plane are dropped; the demo camera never gets
                // that close.
                if let [Some(p0), Some(p1), Some(p2)] = tri {
                    fill_triangle(target, [p0, p1, p2], color);
                }
            }
        }
        Ok(())
    }
}

fn shade(base: [u8; 3], tint: Option<[u8; 3]>) -> [u8; 4] {
    match tint {
        None => [base[0], base[1], base[2], 255],
        Some(t) => {
            let mix = |b: u8, t: u8| ((u16::from(b) * 2 + u16::from(t) * 3) / 5) as u8;
            [mix(base[0], t[0]), mix(base[1], t[1]), mix(base[2], t[2]), 255]
        }
    }
}

/// Window-space `(x, y, depth)` with `y` down and depth in `[0, 1]`; `None` behind the eye.
fn to_window(mvp: &DMat4, p: DVec3, width: u32, height: u32) -> Option<DVec3> {
    let clip = *mvp * DVec4::new(p.x, p.y, p.z, 1.0);
    if clip.w <= 1e-9 {
        return None;
    }
    let ndc = clip.truncate() / clip.w;
    Some(DVec3::new(
        (ndc.x * 0.5 + 0.5) * f64::from(width),
        (0.5 - ndc.y * 0.5) * f64::from(height),
        ndc.z * 0.5 + 0.5,
    ))
}

fn edge(a: DVec3, b: DVec3, px: f64, py: f64) -> f64 {
    (b.x - a.x) * (py - a.y) - (b.y - a.y) * (px - a.x)
}

fn fill_triangle(target: &mut ImageBuffer, [v0, v1, v2]: [DVec3; 3], color: [u8; 4]) {
    let area = edge(v0, v1, v2.x, v2.y);
    if area.abs() < 1e-12 {
        return;
    }

    let min_x = v0.x.min(v1.x).min(v2.x).floor().max(0.0) as u32;
    let min_y = v0.y.min(v1.y).min(v2.y).floor().max(0.0) as u32;
    let max_x = v0.x.max(v1.x).max(v2.x).ceil().min(f64::from(target.width)) as u32;
    let max_y = v0.y.max(v1.y).max(v2.y).ceil().min(f64::from(target.height)) as u32;

    for y in min_y..max_y {
        let py = f64::from(y) + 0.5;
        for x in min_x..max_x {
            let px = f64::from(x) + 0.5;
            let w0 = edge(v1, v2, px, py) / area;
            let w1 = edge(v2, v0, px, py) / area;
            let w2 = edge(v0, v1, px, py) / area;
            if w0 < 0.0 || w1 < 0.0 || w2 < 0.0 {
                continue;
            }
            let z = w0 * v0.z + w1 * v1.z + w2 * v2.z;
            if (0.0..=1.0).contains(&z) {
                target.set_pixel_depth_tested(x, y, color, z as f32);
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/cube.rs"]
mod tests;
