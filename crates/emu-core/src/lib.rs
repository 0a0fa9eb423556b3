//! Core traits and types for headless emulation control.
//!
//! The wrapped emulator is an opaque, stateful engine. Everything an adapter
//! may ask of it goes through the [`Core`] trait: staged bring-up and
//! teardown, frame advance, reset, freeze/unfreeze, and raw views of its
//! working RAM and native framebuffer.

mod clock;
mod emulator;
pub mod joypad;
mod observable;
mod settings;
mod ticks;
mod video;

pub use clock::MasterClock;
pub use emulator::{Core, Device, Port, RenderMode, Subsystem, UnfreezeStatus};
pub use observable::{Observable, Value, parse_address};
pub use settings::Settings;
pub use ticks::Ticks;
pub use video::{VideoFrame, rgb565};
