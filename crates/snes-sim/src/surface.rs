//! Native RGB565 framebuffer and frame composition.

use emu_core::{VideoFrame, rgb565};

use crate::VideoMode;
use crate::program::{PLAYER_SIZE, read_u16, wram};

/// Widest rendered frame.
pub const MAX_WIDTH: usize = 512;
/// Tallest rendered frame (interlaced with overscan).
pub const MAX_HEIGHT: usize = 478;
/// Row pitch in bytes. Fixed at the widest mode, so standard-width frames
/// carry padding at the end of every row.
pub const PITCH: usize = MAX_WIDTH * 2;

/// Height of the band at the top of the frame that shows the churn window.
const NOISE_ROWS: usize = 4;

const PLAYER_COLOUR: u16 = rgb565(0xFF, 0xFF, 0xFF);

pub(crate) struct Surface {
    pixels: Vec<u16>,
    width: u32,
    height: u32,
}

impl Surface {
    pub fn new() -> Self {
        Self {
            pixels: vec![0; MAX_WIDTH * MAX_HEIGHT],
            width: 0,
            height: 0,
        }
    }

    pub fn frame(&self) -> VideoFrame<'_> {
        VideoFrame {
            pixels: &self.pixels,
            width: self.width,
            height: self.height,
            pitch: PITCH,
        }
    }

    /// Compose a frame from program state: a vertical red / horizontal
    /// green gradient tinted blue per cartridge, the churn window as a noise
    /// band along the top, and the player square.
    pub fn compose(&mut self, mode: VideoMode, ram: &[u8], tint: u16) {
        let (width, height) = mode.geometry();
        let (w, h) = (width as usize, height as usize);
        // Pixels per program-space unit.
        let sx = w / 256;
        let sy = h / 224;

        let px = usize::from(read_u16(ram, wram::PLAYER_X)) * sx;
        let py = usize::from(read_u16(ram, wram::PLAYER_Y)) * sy;
        let size = usize::from(PLAYER_SIZE);
        let player_cols = px..px + size * sx;
        let player_rows = py..py + size * sy;

        let noise = &ram[wram::CHURN..wram::CHURN + wram::CHURN_LEN];

        for (row, line) in self.pixels.chunks_exact_mut(MAX_WIDTH).take(h).enumerate() {
            let red = (row * 31 / h) as u16;
            for (col, pixel) in line[..w].iter_mut().enumerate() {
                *pixel = if player_rows.contains(&row) && player_cols.contains(&col) {
                    PLAYER_COLOUR
                } else if row < NOISE_ROWS * sy {
                    let i = (col * 2) % noise.len();
                    u16::from_le_bytes([noise[i], noise[i + 1]])
                } else {
                    let green = (col * 63 / w) as u16;
                    (red << 11) | (green << 5) | tint
                };
            }
        }

        self.width = width;
        self.height = height;
    }
}
