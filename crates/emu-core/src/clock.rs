//! Master clock configuration.

use crate::Ticks;

/// Master clock configuration for a system.
///
/// The master crystal drives all timing. A frame's cycle budget is derived
/// from the crystal and the frame time held in the settings record, so a
/// core with a zeroed record runs zero-length frames.
#[derive(Debug, Clone, Copy)]
pub struct MasterClock {
    /// Crystal frequency in Hz (e.g., `21_477_272` for NTSC).
    pub frequency_hz: u64,
}

impl MasterClock {
    /// NTSC master crystal.
    pub const NTSC: Self = Self::new(21_477_272);

    /// PAL master crystal.
    pub const PAL: Self = Self::new(21_281_370);

    #[must_use]
    pub const fn new(frequency_hz: u64) -> Self {
        Self { frequency_hz }
    }

    /// Ticks elapsed in `frame_time_us` microseconds (integer division).
    #[must_use]
    pub const fn ticks_per_frame(&self, frame_time_us: u32) -> Ticks {
        Ticks::new(self.frequency_hz * frame_time_us as u64 / 1_000_000)
    }
}
