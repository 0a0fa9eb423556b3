//! Framebuffer projection: native RGB565 to RGBA8888.

use emu_core::VideoFrame;

/// Largest projected width.
pub const MAX_WIDTH: u32 = 512;
/// Largest projected height.
pub const MAX_HEIGHT: u32 = 478;
/// Geometry reported before the core has rendered anything.
pub const NOMINAL_WIDTH: u32 = 256;
pub const NOMINAL_HEIGHT: u32 = 224;

const SCRATCH_LEN: usize = (MAX_WIDTH * MAX_HEIGHT * 4) as usize;

/// Expand one RGB565 pixel. Low bits are left zero.
#[must_use]
pub const fn rgb565_to_rgba(pixel: u16) -> [u8; 4] {
    let r = ((pixel >> 11) & 0x1F) as u8;
    let g = ((pixel >> 5) & 0x3F) as u8;
    let b = (pixel & 0x1F) as u8;
    [r << 3, g << 2, b << 3, 0xFF]
}

/// A projected frame: `height` contiguous rows of `width` RGBA pixels.
///
/// Borrows the engine's scratch buffer, so it must be dropped before the
/// engine is driven again.
#[derive(Debug, Clone, Copy)]
pub struct Screen<'a> {
    pub pixels: &'a [u8],
    pub width: u32,
    pub height: u32,
}

impl Screen<'_> {
    /// Bytes per row.
    #[must_use]
    pub const fn stride(&self) -> usize {
        self.width as usize * 4
    }

    /// RGBA bytes of row `y`.
    #[must_use]
    pub fn row(&self, y: u32) -> Option<&[u8]> {
        if y >= self.height {
            return None;
        }
        let start = y as usize * self.stride();
        self.pixels.get(start..start + self.stride())
    }

    /// RGBA of the pixel at (`x`, `y`).
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width {
            return None;
        }
        let row = self.row(y)?;
        let i = x as usize * 4;
        Some([row[i], row[i + 1], row[i + 2], row[i + 3]])
    }
}

/// Owns the RGBA scratch buffer. Sized once for the largest frame and
/// overwritten in place.
pub(crate) struct Projector {
    scratch: Box<[u8]>,
}

impl Projector {
    pub fn new() -> Self {
        Self {
            scratch: vec![0; SCRATCH_LEN].into_boxed_slice(),
        }
    }

    /// Convert `frame` into the scratch buffer. Without a frame the buffer
    /// is returned as it is, at nominal size.
    pub fn project(&mut self, frame: Option<VideoFrame<'_>>) -> Screen<'_> {
        let Some(frame) = frame else {
            return self.view(NOMINAL_WIDTH, NOMINAL_HEIGHT);
        };

        let (width, height) = geometry(Some(&frame));
        let (w, h) = (width as usize, height as usize);
        let stride = frame.stride();

        for (y, out) in self.scratch.chunks_exact_mut(w * 4).take(h).enumerate() {
            let start = y * stride;
            let Some(src) = frame.pixels.get(start..start + w) else {
                break;
            };
            for (dst, &pixel) in out.chunks_exact_mut(4).zip(src) {
                dst.copy_from_slice(&rgb565_to_rgba(pixel));
            }
        }

        self.view(width, height)
    }

    fn view(&self, width: u32, height: u32) -> Screen<'_> {
        let len = width as usize * height as usize * 4;
        Screen {
            pixels: &self.scratch[..len],
            width,
            height,
        }
    }
}

/// Projected size of `frame`: the core's last rendered size, nominal where
/// it reports zero, clamped to the scratch buffer.
pub(crate) fn geometry(frame: Option<&VideoFrame<'_>>) -> (u32, u32) {
    frame.map_or((NOMINAL_WIDTH, NOMINAL_HEIGHT), |f| {
        (
            nonzero_or(f.width, NOMINAL_WIDTH).min(MAX_WIDTH),
            nonzero_or(f.height, NOMINAL_HEIGHT).min(MAX_HEIGHT),
        )
    })
}

const fn nonzero_or(value: u32, fallback: u32) -> u32 {
    if value == 0 { fallback } else { value }
}
