use glam::{DMat4, DVec3};

use crate::foundation::error::{CompositeError, CompositeResult};

/// Vertical field of view of the demo camera, in degrees.
pub const FOV_Y_DEG: f64 = 45.0;
/// Near clip plane distance.
pub const Z_NEAR: f64 = 0.1;
/// Far clip plane distance.
pub const Z_FAR: f64 = 100.0;

/// Off-axis perspective projection (OpenGL `glFrustum` convention, clip z in `[-w, w]`).
pub fn frustum(left: f64, right: f64, bottom: f64, top: f64, near: f64, far: f64) -> DMat4 {
    let rl = right - left;
    let tb = top - bottom;
    let fn_ = far - near;
    DMat4::from_cols_array(&[
        2.0 * near / rl,
        0.0,
        0.0,
        0.0,
        //
        0.0,
        2.0 * near / tb,
        0.0,
        0.0,
        //
        (right + left) / rl,
        (top + bottom) / tb,
        -(far + near) / fn_,
        -1.0,
        //
        0.0,
        0.0,
        -2.0 * far * near / fn_,
        0.0,
    ])
}

/// Half extents `(w, h)` of the near plane for a symmetric frustum.
pub fn near_plane_half_extents(fov_y_deg: f64, aspect: f64, near: f64) -> (f64, f64) {
    let h = (fov_y_deg.to_radians() / 2.0).tan() * near;
    (h * aspect, h)
}

/// Demo modelview: push the model back 5 units, then rotate about X, then Y (degrees).
pub fn orbit_modelview(rotate_x_deg: f64, rotate_y_deg: f64) -> DMat4 {
    DMat4::from_translation(DVec3::new(0.0, 0.0, -5.0))
        * DMat4::from_rotation_x(rotate_x_deg.to_radians())
        * DMat4::from_rotation_y(rotate_y_deg.to_radians())
}

/// Reject matrices carrying NaN or infinite entries.
pub fn ensure_finite(name: &str, m: &DMat4) -> CompositeResult<()> {
    if m.is_finite() {
        Ok(())
    } else {
        Err(CompositeError::validation(format!(
            "{name} matrix contains non-finite values"
        )))
    }
}

/// Column-major `f32` copy, for handing matrices across a GPU boundary.
pub fn to_f32_cols(m: &DMat4) -> [f32; 16] {
    m.to_cols_array().map(|v| v as f32)
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/math.rs"]
mod tests;
