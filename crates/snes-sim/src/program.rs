//! The fixed program the reference core runs, and its work RAM layout.
//!
//! All program variables live in work RAM and are re-read every frame, so
//! writes through the adapter's memory view take effect on the next frame.

use emu_core::{Ticks, joypad};

use crate::VideoMode;

/// Work RAM addresses.
pub mod wram {
    /// In-game frame counter (u8, wraps).
    pub const FRAME: usize = 0x0013;
    /// Joypad bits seen by the last frame (u16 LE).
    pub const BUTTONS: usize = 0x0015;
    /// Player X in 256-wide screen space (u16 LE).
    pub const PLAYER_X: usize = 0x0094;
    /// Player Y in 224-high screen space (u16 LE).
    pub const PLAYER_Y: usize = 0x0096;
    /// Generator state (u32 LE).
    pub const RNG: usize = 0x0100;
    /// Coin counter (u8, wraps). Incremented on each A press.
    pub const COINS: usize = 0x0DBF;
    /// Current video mode bits.
    pub const VIDEO_MODE: usize = 0x0F00;
    /// Start of the window the generator writes into.
    pub const CHURN: usize = 0x2000;
    /// Length of the churn window.
    pub const CHURN_LEN: usize = 0x1000;
}

/// Player sprite size in pixels.
pub const PLAYER_SIZE: u16 = 8;
const PLAYER_MAX_X: u16 = 256 - PLAYER_SIZE;
const PLAYER_MAX_Y: u16 = 224 - PLAYER_SIZE;
const PLAYER_START_X: u16 = 124;
const PLAYER_START_Y: u16 = 104;

/// CPU-side state that does not live in work RAM.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Registers {
    pub master_clock: Ticks,
    pub rng: u32,
    pub prev_buttons: u32,
    /// Position in the frame-skip cycle; 0 means the next frame is due.
    pub skip_phase: u32,
    pub frames: u32,
    /// Fractional audio samples carried into the next frame, in
    /// sample-microseconds.
    pub sample_remainder: u32,
}

impl Registers {
    pub const LEN: usize = 28;

    pub fn to_bytes(self) -> [u8; Self::LEN] {
        let mut out = [0u8; Self::LEN];
        out[0..8].copy_from_slice(&self.master_clock.to_le_bytes());
        out[8..12].copy_from_slice(&self.rng.to_le_bytes());
        out[12..16].copy_from_slice(&self.prev_buttons.to_le_bytes());
        out[16..20].copy_from_slice(&self.skip_phase.to_le_bytes());
        out[20..24].copy_from_slice(&self.frames.to_le_bytes());
        out[24..28].copy_from_slice(&self.sample_remainder.to_le_bytes());
        out
    }

    pub fn from_bytes(bytes: &[u8; Self::LEN]) -> Self {
        let u32_at = |i: usize| u32::from_le_bytes([bytes[i], bytes[i + 1], bytes[i + 2], bytes[i + 3]]);
        let mut clock = [0u8; 8];
        clock.copy_from_slice(&bytes[0..8]);
        Self {
            master_clock: Ticks::from_le_bytes(clock),
            rng: u32_at(8),
            prev_buttons: u32_at(12),
            skip_phase: u32_at(16),
            frames: u32_at(20),
            sample_remainder: u32_at(24),
        }
    }
}

/// Program entry: initialise variables. Used at power-on and reset. Work
/// RAM outside the program variables is left as it is, and the master
/// clock keeps running.
pub(crate) fn boot(ram: &mut [u8], regs: &mut Registers, seed: u32, mode: VideoMode) {
    regs.rng = seed;
    regs.prev_buttons = 0;
    regs.skip_phase = 0;
    regs.frames = 0;

    ram[wram::FRAME] = 0;
    write_u16(ram, wram::BUTTONS, 0);
    write_u16(ram, wram::PLAYER_X, PLAYER_START_X);
    write_u16(ram, wram::PLAYER_Y, PLAYER_START_Y);
    write_u32(ram, wram::RNG, seed);
    ram[wram::COINS] = 0;
    ram[wram::VIDEO_MODE] = mode.bits();
}

/// Run the program for one frame with the given joypad bits.
pub(crate) fn run(ram: &mut [u8], regs: &mut Registers, buttons: u32) {
    let pressed = buttons & !regs.prev_buttons;
    let held = |mask: u32| buttons & mask != 0;

    // B runs.
    let speed = if held(joypad::B) { 2 } else { 1 };

    let mut x = read_u16(ram, wram::PLAYER_X).min(PLAYER_MAX_X);
    let mut y = read_u16(ram, wram::PLAYER_Y).min(PLAYER_MAX_Y);
    if held(joypad::RIGHT) {
        x = (x + speed).min(PLAYER_MAX_X);
    }
    if held(joypad::LEFT) {
        x = x.saturating_sub(speed);
    }
    if held(joypad::DOWN) {
        y = (y + speed).min(PLAYER_MAX_Y);
    }
    if held(joypad::UP) {
        y = y.saturating_sub(speed);
    }
    write_u16(ram, wram::PLAYER_X, x);
    write_u16(ram, wram::PLAYER_Y, y);

    if pressed & joypad::A != 0 {
        ram[wram::COINS] = ram[wram::COINS].wrapping_add(1);
    }
    if pressed & joypad::SELECT != 0 {
        ram[wram::VIDEO_MODE] = VideoMode::from_bits(ram[wram::VIDEO_MODE]).next().bits();
    }

    regs.rng = xorshift32(regs.rng);
    let offset = wram::CHURN + (regs.frames as usize % (wram::CHURN_LEN / 4)) * 4;
    write_u32(ram, offset, regs.rng);
    write_u32(ram, wram::RNG, regs.rng);

    regs.frames = regs.frames.wrapping_add(1);
    ram[wram::FRAME] = regs.frames as u8;
    write_u16(ram, wram::BUTTONS, buttons as u16);
    regs.prev_buttons = buttons;
}

fn xorshift32(mut state: u32) -> u32 {
    state ^= state << 13;
    state ^= state >> 17;
    state ^= state << 5;
    state
}

pub(crate) fn read_u16(ram: &[u8], addr: usize) -> u16 {
    u16::from_le_bytes([ram[addr], ram[addr + 1]])
}

fn write_u16(ram: &mut [u8], addr: usize, value: u16) {
    ram[addr..addr + 2].copy_from_slice(&value.to_le_bytes());
}

fn write_u32(ram: &mut [u8], addr: usize, value: u32) {
    ram[addr..addr + 4].copy_from_slice(&value.to_le_bytes());
}
