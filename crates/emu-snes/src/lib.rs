//! Headless SNES emulation-control adapter.
//!
//! [`Engine`] drives a wrapped [`emu_core::Core`] frame by frame. It owns
//! the core's lifecycle (staged bring-up with reverse unwind), steps it
//! with or without rendering, projects its RGB565 framebuffer to RGBA,
//! lends out its work RAM, and snapshots its state. [`Driver`] runs it
//! from a queue of held inputs with interval callbacks and optional pacing.
//!
//! With the `native` feature (on by default) it also provides PNG
//! capture, a JSON config file, and a JSON-RPC control server.

#[cfg(feature = "native")]
pub mod capture;
#[cfg(feature = "native")]
pub mod config;
pub mod driver;
mod engine;
pub mod env;
pub mod input;
mod lifecycle;
#[cfg(feature = "native")]
pub mod mcp;
pub mod state;
mod video;

pub use driver::{CallbackId, Driver};
pub use engine::{BATTERY_SUFFIX, Engine, MEMORY_SIZE};
pub use input::{ActionQueue, ButtonMask, SnesButton, encode};
pub use lifecycle::LoadError;
pub use state::Rewind;
pub use video::{MAX_HEIGHT, MAX_WIDTH, NOMINAL_HEIGHT, NOMINAL_WIDTH, Screen, rgb565_to_rgba};
