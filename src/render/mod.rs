//! Local rendering: the hook boundary, the pixel buffers it fills, and a demo scene.

pub(crate) mod buffer;
pub(crate) mod cube;
pub(crate) mod hook;

pub use buffer::{CompositeImage, FAR_DEPTH, ImageBuffer};
pub use cube::{CubeLayout, CubeScene};
pub use hook::{RenderHook, RenderParams};
