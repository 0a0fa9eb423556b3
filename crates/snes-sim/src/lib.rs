//! Deterministic reference core.
//!
//! Implements [`emu_core::Core`] with the same shape as a real SNES core:
//! 128 KiB of work RAM, a staged bring-up, an RGB565 framebuffer whose
//! geometry changes with the video mode, frame-skip render policy, battery
//! RAM and a versioned freeze format. The "program" it runs is fixed: a
//! player square moved by the d-pad, a coin counter on A, a video-mode
//! switch on Select, and a random number generator seeded from the
//! cartridge digest that churns a window of work RAM every frame.
//!
//! It exists so the adapter can be driven and tested end to end without a
//! commercial cartridge.

mod audio;
mod cartridge;
mod freeze;
pub mod program;
mod sim;
mod surface;

pub use cartridge::{Cartridge, Region, RomBuilder, VideoMode};
pub use sim::SimCore;
pub use surface::{MAX_HEIGHT, MAX_WIDTH, PITCH};

/// Work RAM size in bytes.
pub const WRAM_SIZE: usize = 0x2_0000;
