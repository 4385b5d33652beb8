use std::path::PathBuf;

use anyhow::Context as _;

use crate::comm::Collective;
use crate::foundation::error::{CompositeError, CompositeResult};
use crate::render::buffer::{CompositeImage, ImageBuffer};

/// Output surface owned by the coordinator.
///
/// Presentation is split in two so the group barrier can sit between them: the composite is
/// uploaded first, every rank meets at the barrier, then the surface is swapped.
pub trait Presenter {
    /// Stage `image` as the content of frame `frame`.
    fn upload(&mut self, frame: u64, image: &CompositeImage) -> CompositeResult<()>;

    /// Make the staged frame visible.
    fn swap(&mut self) -> CompositeResult<()>;
}

/// Discards every frame. Used on non-coordinator ranks.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullPresenter;

impl Presenter for NullPresenter {
    fn upload(&mut self, _frame: u64, _image: &CompositeImage) -> CompositeResult<()> {
        Ok(())
    }

    fn swap(&mut self) -> CompositeResult<()> {
        Ok(())
    }
}

/// Keeps presented frames in memory.
#[derive(Clone, Debug, Default)]
pub struct MemoryPresenter {
    staged: Option<(u64, ImageBuffer)>,
    /// `(frame, fingerprint)` of every swapped frame, in order.
    pub history: Vec<(u64, u64)>,
    /// Most recently swapped frame.
    pub last: Option<ImageBuffer>,
}

impl Presenter for MemoryPresenter {
    fn upload(&mut self, frame: u64, image: &CompositeImage) -> CompositeResult<()> {
        match &mut self.staged {
            Some((f, staged)) if staged.same_shape(image) => {
                *f = frame;
                staged.color.copy_from_slice(&image.color);
                staged.depth.copy_from_slice(&image.depth);
            }
            _ => self.staged = Some((frame, image.clone())),
        }
        Ok(())
    }

    fn swap(&mut self) -> CompositeResult<()> {
        let (frame, image) = self
            .staged
            .take()
            .ok_or_else(|| CompositeError::validation("swap without a staged frame"))?;
        self.history.push((frame, image.fingerprint()));
        self.last = Some(image);
        Ok(())
    }
}

/// Writes every `every`-th frame as `frame_NNNNN.png` into a directory.
#[derive(Debug)]
pub struct PngSequencePresenter {
    dir: PathBuf,
    every: u64,
    staged: Option<(u64, image::RgbaImage)>,
    written: Vec<PathBuf>,
}

impl PngSequencePresenter {
    /// Create `dir` if needed and write frames whose index is a multiple of `every`.
    pub fn new(dir: impl Into<PathBuf>, every: u64) -> CompositeResult<Self> {
        if every == 0 {
            return Err(CompositeError::validation("png frame interval must be >= 1"));
        }
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("create output dir '{}'", dir.display()))?;
        Ok(Self {
            dir,
            every,
            staged: None,
            written: Vec::new(),
        })
    }

    /// Files written so far, in order.
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }
}

impl Presenter for PngSequencePresenter {
    fn upload(&mut self, frame: u64, image: &CompositeImage) -> CompositeResult<()> {
        self.staged = if frame % self.every == 0 {
            Some((frame, image.to_rgba_image()?))
        } else {
            None
        };
        Ok(())
    }

    fn swap(&mut self) -> CompositeResult<()> {
        let Some((frame, img)) = self.staged.take() else {
            return Ok(());
        };
        let path = self.dir.join(format!("frame_{frame:05}.png"));
        img.save_with_format(&path, image::ImageFormat::Png)
            .with_context(|| format!("write png '{}'", path.display()))?;
        tracing::debug!(path = %path.display(), "wrote frame");
        self.written.push(path);
        Ok(())
    }
}

/// Presents on the coordinator and keeps every rank in frame lockstep.
#[derive(Debug)]
pub struct DisplaySync<P> {
    presenter: P,
    presented: u64,
}

impl<P: Presenter> DisplaySync<P> {
    /// Wrap the output surface. Non-coordinator ranks typically pass [`NullPresenter`].
    pub fn new(presenter: P) -> Self {
        Self {
            presenter,
            presented: 0,
        }
    }

    /// Number of frames the coordinator has swapped.
    pub fn presented(&self) -> u64 {
        self.presented
    }

    /// End the frame: upload on the coordinator, barrier everywhere, then swap.
    ///
    /// Every rank must call this exactly once per frame. The coordinator must pass the
    /// composite; other ranks pass `None`.
    pub fn end_frame(
        &mut self,
        comm: &dyn Collective,
        frame: u64,
        composite: Option<&CompositeImage>,
    ) -> CompositeResult<()> {
        let coordinator = comm.is_coordinator();
        if coordinator {
            let image = composite.ok_or_else(|| {
                CompositeError::collective("coordinator reached display without a composite")
            })?;
            self.presenter.upload(frame, image)?;
        }

        comm.barrier()?;

        if coordinator {
            self.presenter.swap()?;
            self.presented += 1;
        }
        Ok(())
    }

    /// Give back the presenter, e.g. to inspect a [`MemoryPresenter`] after a run.
    pub fn into_presenter(self) -> P {
        self.presenter
    }
}

#[cfg(test)]
#[path = "../../tests/unit/sync/display.rs"]
mod tests;
