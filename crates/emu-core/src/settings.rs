//! The core's flat settings record.

/// Flat configuration applied to the core before the cartridge is loaded.
///
/// `Settings::default()` is the all-zero record. Build from it and assign
/// every field the core reads; the core never sees a field the adapter did
/// not put there on purpose.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    // Peripheral masters. All off for headless use.
    pub mouse_master: bool,
    pub super_scope_master: bool,
    pub justifier_master: bool,
    pub multi_player5_master: bool,

    /// Frame time in microseconds.
    pub frame_time_pal: u32,
    pub frame_time_ntsc: u32,

    // Sound. Required even without audio output: frame timing is derived
    // from sound-buffer accounting.
    pub sixteen_bit_sound: bool,
    pub stereo: bool,
    pub sound_playback_rate: u32,
    pub sound_input_rate: u32,

    // Rendering.
    pub transparency: bool,
    pub auto_display_messages: bool,
    pub initial_info_string_timeout: u32,
    pub hdma_timing_hack: u32,
    pub block_invalid_vram_access: bool,
    pub stop_emulation: bool,
    /// Frames skipped between rendered frames (0 renders every frame).
    pub skip_frames: u32,
    pub turbo_skip_frames: u32,
    pub max_sprite_tiles_per_line: u32,

    // Memory access timing in master cycles.
    pub one_clock_cycle: u32,
    pub one_slow_clock_cycle: u32,
    pub two_clock_cycles: u32,
}

impl Settings {
    /// The record used for headless operation.
    #[must_use]
    pub fn headless() -> Self {
        Self {
            mouse_master: false,
            super_scope_master: false,
            justifier_master: false,
            multi_player5_master: false,
            frame_time_pal: 20_000,
            frame_time_ntsc: 16_667,
            sixteen_bit_sound: true,
            stereo: true,
            sound_playback_rate: 32_000,
            sound_input_rate: 32_000,
            transparency: true,
            auto_display_messages: false,
            initial_info_string_timeout: 0,
            hdma_timing_hack: 100,
            block_invalid_vram_access: true,
            stop_emulation: false,
            skip_frames: 0,
            turbo_skip_frames: 15,
            // Sprites drop out on busy lines below this.
            max_sprite_tiles_per_line: 34,
            one_clock_cycle: 6,
            one_slow_clock_cycle: 8,
            two_clock_cycles: 12,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_zeroed() {
        let s = Settings::default();
        assert_eq!(s.sound_playback_rate, 0);
        assert_eq!(s.frame_time_ntsc, 0);
        assert!(!s.transparency);
    }

    #[test]
    fn headless_disables_peripherals() {
        let s = Settings::headless();
        assert!(!s.mouse_master);
        assert!(!s.super_scope_master);
        assert!(!s.justifier_master);
        assert!(!s.multi_player5_master);
        assert_eq!(s.max_sprite_tiles_per_line, 34);
        assert_eq!(s.sound_playback_rate, 32_000);
    }
}
