//! The wrapped emulator core.

use std::fmt;
use std::path::Path;

use crate::{Settings, VideoFrame};

/// A subsystem stage of the core's bring-up chain.
///
/// Stages are initialized in [`Subsystem::BRING_UP`] order and torn down in
/// the reverse order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Subsystem {
    /// Working RAM and memory map tables.
    Memory,
    /// APU and the sample clock the frame timing is derived from.
    AudioTiming,
    /// Sound buffers. Needed for timing even when audio is never played.
    SoundBuffer,
    /// Graphics buffers and the native framebuffer.
    Graphics,
    /// The cartridge image.
    Cartridge,
}

impl Subsystem {
    /// Initialization order.
    pub const BRING_UP: [Self; 5] = [
        Self::Memory,
        Self::AudioTiming,
        Self::SoundBuffer,
        Self::Graphics,
        Self::Cartridge,
    ];

    /// Short lowercase name, used in logs and error messages.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::AudioTiming => "audio timing",
            Self::SoundBuffer => "sound buffer",
            Self::Graphics => "graphics",
            Self::Cartridge => "cartridge",
        }
    }
}

impl fmt::Display for Subsystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Controller port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Port {
    One,
    Two,
}

impl Port {
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::One => 0,
            Self::Two => 1,
        }
    }
}

/// Device plugged into a controller port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Device {
    #[default]
    None,
    /// Standard joypad.
    Joypad,
}

/// Per-frame render decision passed into [`Core::run_frame`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderMode {
    /// Render according to the core's own policy (frame skip etc.).
    #[default]
    Policy,
    /// Skip frame composition entirely. Policy state still advances as if
    /// the frame had been offered to it.
    Suppress,
}

/// Outcome of [`Core::unfreeze`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnfreezeStatus {
    Success,
    /// Not a freeze blob for this core.
    WrongFormat,
    /// A freeze blob from an incompatible core version.
    WrongVersion,
    /// Blob header is valid but its contents do not match the loaded
    /// cartridge configuration.
    Inconsistent,
}

/// An emulator core driven frame by frame.
///
/// The core owns all emulated state. Adapters call it from a single thread,
/// one call at a time. Methods other than the bring-up calls may assume the
/// full chain in [`Subsystem::BRING_UP`] has succeeded; a core must not
/// panic if called early, but its results are then unspecified.
pub trait Core {
    /// Whether the core keeps process-wide global state.
    ///
    /// At most one initialized session of such a core may exist per
    /// process.
    const PROCESS_GLOBAL: bool = false;

    /// Apply the settings record. Called once per bring-up, before any
    /// subsystem is initialized.
    fn apply_settings(&mut self, settings: &Settings);

    /// Initialize one subsystem. `Subsystem::Cartridge` is never passed
    /// here; see [`Core::load_cartridge`].
    fn init(&mut self, stage: Subsystem) -> bool;

    /// Load the cartridge image at `path`.
    fn load_cartridge(&mut self, path: &Path) -> bool;

    /// Release one subsystem. Only called for stages whose initialization
    /// succeeded, in reverse bring-up order.
    fn deinit(&mut self, stage: Subsystem);

    /// Bind a device to a controller port.
    fn set_controller(&mut self, port: Port, device: Device);

    /// Load battery-backed cartridge RAM from `path`.
    fn load_battery(&mut self, path: &Path) -> bool;

    /// Latch the joypad bitmask for `port`. Held until changed.
    fn set_joypad(&mut self, port: Port, buttons: u32);

    /// Run one complete frame.
    fn run_frame(&mut self, render: RenderMode);

    /// Soft reset (the console's reset button).
    fn reset(&mut self);

    /// Size in bytes of a freeze blob for the current configuration.
    fn freeze_size(&self) -> usize;

    /// Serialize the full state into `buffer`, which is exactly
    /// [`Core::freeze_size`] bytes long.
    fn freeze(&self, buffer: &mut [u8]) -> bool;

    /// Restore state from a freeze blob. On anything but
    /// [`UnfreezeStatus::Success`] the current state is left untouched.
    fn unfreeze(&mut self, data: &[u8]) -> UnfreezeStatus;

    /// Working RAM.
    fn ram(&self) -> Option<&[u8]>;

    /// Working RAM, writable. Writes change live emulator state.
    fn ram_mut(&mut self) -> Option<&mut [u8]>;

    /// The native framebuffer and the geometry of the last rendered frame.
    fn video(&self) -> Option<VideoFrame<'_>>;
}
