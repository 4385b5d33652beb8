use crate::foundation::core::{Rgba, RowOrder, ViewportTile};
use crate::foundation::error::{CompositeError, CompositeResult};

/// Depth value of an untouched pixel.
pub const FAR_DEPTH: f32 = 1.0;

/// Color plus depth for one viewport, top-down row-major.
///
/// Used both for a rank's local contribution and for the (partial) composite. `color` holds
/// straight-alpha RGBA8, four bytes per pixel; `depth` holds one value per pixel in `[0, 1]`
/// with `0` nearest.
#[derive(Clone, Debug, PartialEq)]
pub struct ImageBuffer {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// RGBA8 bytes, tightly packed.
    pub color: Vec<u8>,
    /// Per-pixel depth.
    pub depth: Vec<f32>,
}

/// The merged frame. Same layout as a local contribution.
pub type CompositeImage = ImageBuffer;

impl ImageBuffer {
    /// Allocate a buffer cleared to `background` at far depth.
    pub fn new(width: u32, height: u32, background: Rgba) -> Self {
        let px = (width as usize) * (height as usize);
        let bg = background.to_rgba8();
        Self {
            width,
            height,
            color: bg.repeat(px),
            depth: vec![FAR_DEPTH; px],
        }
    }

    /// Number of pixels.
    pub fn pixel_count(&self) -> usize {
        self.depth.len()
    }

    /// Reset every pixel to `background` at far depth without reallocating.
    pub fn clear(&mut self, background: Rgba) {
        let bg = background.to_rgba8();
        for px in self.color.chunks_exact_mut(4) {
            px.copy_from_slice(&bg);
        }
        self.depth.fill(FAR_DEPTH);
    }

    /// Check that the arrays match the declared dimensions.
    pub fn validate(&self) -> CompositeResult<()> {
        let px = (self.width as usize) * (self.height as usize);
        if self.depth.len() != px || self.color.len() != px * 4 {
            return Err(CompositeError::validation(format!(
                "{}x{} image has {} color bytes and {} depth values",
                self.width,
                self.height,
                self.color.len(),
                self.depth.len()
            )));
        }
        Ok(())
    }

    /// Return `true` when `other` has the same dimensions.
    pub fn same_shape(&self, other: &ImageBuffer) -> bool {
        self.width == other.width && self.height == other.height
    }

    /// Overwrite both planes with `src`'s, reusing this buffer's allocation.
    pub fn copy_from(&mut self, src: &ImageBuffer) -> CompositeResult<()> {
        if !self.same_shape(src)
            || self.color.len() != src.color.len()
            || self.depth.len() != src.depth.len()
        {
            return Err(CompositeError::validation(format!(
                "cannot copy a {}x{} image into a {}x{} buffer",
                src.width, src.height, self.width, self.height
            )));
        }
        self.color.copy_from_slice(&src.color);
        self.depth.copy_from_slice(&src.depth);
        Ok(())
    }

    fn index(&self, x: u32, y: u32) -> Option<usize> {
        (x < self.width && y < self.height).then(|| (y as usize) * (self.width as usize) + x as usize)
    }

    /// Color and depth at `(x, y)`, `y` counted from the top.
    pub fn pixel(&self, x: u32, y: u32) -> Option<([u8; 4], f32)> {
        let i = self.index(x, y)?;
        let c = &self.color[i * 4..i * 4 + 4];
        Some(([c[0], c[1], c[2], c[3]], self.depth[i]))
    }

    /// Overwrite `(x, y)`; out-of-bounds writes are ignored.
    pub fn set_pixel(&mut self, x: u32, y: u32, color: [u8; 4], depth: f32) {
        if let Some(i) = self.index(x, y) {
            self.color[i * 4..i * 4 + 4].copy_from_slice(&color);
            self.depth[i] = depth;
        }
    }

    /// Write `(x, y)` only if `depth` is strictly nearer than what is stored.
    pub fn set_pixel_depth_tested(&mut self, x: u32, y: u32, color: [u8; 4], depth: f32) {
        if let Some(i) = self.index(x, y)
            && depth < self.depth[i]
        {
            self.color[i * 4..i * 4 + 4].copy_from_slice(&color);
            self.depth[i] = depth;
        }
    }

    /// Reverse row order in place.
    pub fn flip_rows(&mut self) {
        let w = self.width as usize;
        let h = self.height as usize;
        for top in 0..h / 2 {
            let bottom = h - 1 - top;
            let (upper, lower) = self.depth.split_at_mut(bottom * w);
            upper[top * w..top * w + w].swap_with_slice(&mut lower[..w]);
            let (upper, lower) = self.color.split_at_mut(bottom * w * 4);
            upper[top * w * 4..(top + 1) * w * 4].swap_with_slice(&mut lower[..w * 4]);
        }
    }

    /// Convert rows produced in `order` to the pipeline's top-down convention.
    pub fn normalize_row_order(&mut self, order: RowOrder) {
        if order == RowOrder::BottomUp {
            self.flip_rows();
        }
    }

    /// Replace corrupt depth so it cannot leak into a composite.
    ///
    /// Non-finite depth becomes far depth with the background color; finite depth is clamped to
    /// `[0, 1]`. Returns the number of non-finite pixels that were reset.
    pub fn sanitize(&mut self, background: Rgba) -> usize {
        let bg = background.to_rgba8();
        let mut reset = 0usize;
        for (d, c) in self.depth.iter_mut().zip(self.color.chunks_exact_mut(4)) {
            if !d.is_finite() {
                *d = FAR_DEPTH;
                c.copy_from_slice(&bg);
                reset += 1;
            } else {
                *d = d.clamp(0.0, FAR_DEPTH);
            }
        }
        reset
    }

    /// Copy `src` into this image with its top-left corner at `(tile.x, tile.y)`.
    pub fn blit(&mut self, tile: ViewportTile, src: &ImageBuffer) -> CompositeResult<()> {
        if src.width != tile.width || src.height != tile.height {
            return Err(CompositeError::validation(format!(
                "{}x{} image does not fit a {}x{} tile",
                src.width, src.height, tile.width, tile.height
            )));
        }
        if tile.x + tile.width > self.width || tile.y + tile.height > self.height {
            return Err(CompositeError::validation(format!(
                "tile at ({}, {}) size {}x{} exceeds {}x{} image",
                tile.x, tile.y, tile.width, tile.height, self.width, self.height
            )));
        }

        let dst_w = self.width as usize;
        let src_w = src.width as usize;
        for row in 0..src.height as usize {
            let dst_start = (tile.y as usize + row) * dst_w + tile.x as usize;
            let src_start = row * src_w;
            self.depth[dst_start..dst_start + src_w]
                .copy_from_slice(&src.depth[src_start..src_start + src_w]);
            self.color[dst_start * 4..(dst_start + src_w) * 4]
                .copy_from_slice(&src.color[src_start * 4..(src_start + src_w) * 4]);
        }
        Ok(())
    }

    /// Stable 64-bit digest of color and depth.
    pub fn fingerprint(&self) -> u64 {
        let mut h = xxhash_rust::xxh3::Xxh3::new();
        h.update(&self.width.to_le_bytes());
        h.update(&self.height.to_le_bytes());
        h.update(&self.color);
        for d in &self.depth {
            h.update(&d.to_bits().to_le_bytes());
        }
        h.digest()
    }

    /// Copy the color plane into an [`image::RgbaImage`].
    pub fn to_rgba_image(&self) -> CompositeResult<image::RgbaImage> {
        image::RgbaImage::from_raw(self.width, self.height, self.color.clone()).ok_or_else(|| {
            CompositeError::validation("color plane does not match image dimensions")
        })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/buffer.rs"]
mod tests;
