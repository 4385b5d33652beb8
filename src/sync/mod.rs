//! Cross-rank synchronization: the shared frame clock and the presenting barrier.

pub(crate) mod clock;
pub(crate) mod display;

pub use clock::{FrameClock, MonotonicTime, SteppedTime, TimeSource};
pub use display::{DisplaySync, MemoryPresenter, NullPresenter, PngSequencePresenter, Presenter};
