//! Native framebuffer view.

/// Borrowed view of a core's native RGB565 framebuffer.
///
/// `width` and `height` are the geometry of the last rendered frame and may
/// change from one frame to the next (hi-res, interlace). Both are zero
/// before the first frame is rendered. Rows are `pitch` bytes apart, which
/// may be more than `width * 2`.
#[derive(Debug, Clone, Copy)]
pub struct VideoFrame<'a> {
    pub pixels: &'a [u16],
    pub width: u32,
    pub height: u32,
    /// Row pitch in bytes.
    pub pitch: usize,
}

impl VideoFrame<'_> {
    /// Row pitch in pixels.
    #[must_use]
    pub const fn stride(&self) -> usize {
        self.pitch / 2
    }
}

/// Pack 8-bit channels into RGB565 (truncating).
#[must_use]
pub const fn rgb565(r: u8, g: u8, b: u8) -> u16 {
    ((r as u16 >> 3) << 11) | ((g as u16 >> 2) << 5) | (b as u16 >> 3)
}
