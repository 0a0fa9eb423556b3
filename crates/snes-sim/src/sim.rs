use std::path::Path;

use emu_core::{
    Core, Device, MasterClock, Port, RenderMode, Settings, Subsystem, Ticks, UnfreezeStatus,
    VideoFrame,
};

use crate::audio::{AudioClock, SoundBuffer};
use crate::cartridge::{Cartridge, Region};
use crate::program::{self, Registers, wram};
use crate::surface::Surface;
use crate::{VideoMode, WRAM_SIZE, freeze};

/// The reference core.
///
/// Each subsystem is `None` until its bring-up stage succeeds and again
/// after teardown, so calls made outside a full bring-up do nothing.
pub struct SimCore {
    settings: Settings,
    wram: Option<Box<[u8]>>,
    audio: Option<AudioClock>,
    sound: Option<SoundBuffer>,
    surface: Option<Surface>,
    cart: Option<Cartridge>,
    ports: [Device; 2],
    joypads: [u32; 2],
    regs: Registers,
    /// Master cycles per frame.
    budget: Ticks,
    rendered: u64,
}

impl SimCore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            settings: Settings::default(),
            wram: None,
            audio: None,
            sound: None,
            surface: None,
            cart: None,
            ports: [Device::None; 2],
            joypads: [0; 2],
            regs: Registers::default(),
            budget: Ticks::ZERO,
            rendered: 0,
        }
    }

    /// The loaded cartridge.
    #[must_use]
    pub fn cartridge(&self) -> Option<&Cartridge> {
        self.cart.as_ref()
    }

    /// Device bound to `port`.
    #[must_use]
    pub fn controller(&self, port: Port) -> Device {
        self.ports[port.index()]
    }

    /// The settings record last applied.
    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Frames composed into the framebuffer since power-on.
    #[must_use]
    pub fn rendered_frames(&self) -> u64 {
        self.rendered
    }

    /// Master cycles elapsed since power-on.
    #[must_use]
    pub fn master_clock(&self) -> Ticks {
        self.regs.master_clock
    }

    /// Re-time the audio clock and frame budget for `region`. The timing
    /// stage starts out NTSC; a PAL cartridge switches it at load.
    fn set_timing(&mut self, region: Region) -> bool {
        let (clock, frame_time) = match region {
            Region::Ntsc => (MasterClock::NTSC, self.settings.frame_time_ntsc),
            Region::Pal => (MasterClock::PAL, self.settings.frame_time_pal),
        };
        let Some(audio) = AudioClock::new(self.settings.sound_playback_rate, frame_time) else {
            return false;
        };
        self.audio = Some(audio);
        self.budget = clock.ticks_per_frame(frame_time);
        true
    }

    /// Whether every subsystem stage is up.
    fn ready(&self) -> bool {
        self.wram.is_some()
            && self.audio.is_some()
            && self.sound.is_some()
            && self.surface.is_some()
            && self.cart.is_some()
    }

    fn port_buttons(&self, port: Port) -> u32 {
        match self.ports[port.index()] {
            Device::Joypad => self.joypads[port.index()],
            Device::None => 0,
        }
    }
}

impl Default for SimCore {
    fn default() -> Self {
        Self::new()
    }
}

impl Core for SimCore {
    fn apply_settings(&mut self, settings: &Settings) {
        self.settings = settings.clone();
    }

    fn init(&mut self, stage: Subsystem) -> bool {
        match stage {
            Subsystem::Memory => {
                self.wram = Some(vec![0; WRAM_SIZE].into_boxed_slice());
                true
            }
            Subsystem::AudioTiming => {
                let frame_time = self.settings.frame_time_ntsc;
                self.audio = AudioClock::new(self.settings.sound_playback_rate, frame_time);
                self.budget = MasterClock::NTSC.ticks_per_frame(frame_time);
                self.audio.is_some()
            }
            Subsystem::SoundBuffer => {
                self.sound = SoundBuffer::new(self.settings.sound_input_rate, self.settings.stereo);
                self.sound.is_some()
            }
            Subsystem::Graphics => {
                self.surface = Some(Surface::new());
                true
            }
            Subsystem::Cartridge => false,
        }
    }

    fn load_cartridge(&mut self, path: &Path) -> bool {
        if self.wram.is_none() || self.audio.is_none() {
            return false;
        }
        let Ok(cart) = Cartridge::load(path) else {
            return false;
        };
        if !self.set_timing(cart.region()) {
            return false;
        }
        let Some(ram) = self.wram.as_deref_mut() else {
            return false;
        };

        self.regs = Registers::default();
        program::boot(ram, &mut self.regs, cart.seed(), cart.video_mode());
        self.cart = Some(cart);
        true
    }

    fn deinit(&mut self, stage: Subsystem) {
        match stage {
            Subsystem::Memory => self.wram = None,
            Subsystem::AudioTiming => {
                self.audio = None;
                self.budget = Ticks::ZERO;
            }
            Subsystem::SoundBuffer => self.sound = None,
            Subsystem::Graphics => self.surface = None,
            Subsystem::Cartridge => {
                self.cart = None;
                self.ports = [Device::None; 2];
                self.joypads = [0; 2];
                self.regs = Registers::default();
                self.rendered = 0;
            }
        }
    }

    fn set_controller(&mut self, port: Port, device: Device) {
        self.ports[port.index()] = device;
    }

    fn load_battery(&mut self, path: &Path) -> bool {
        let Some(cart) = self.cart.as_mut() else {
            return false;
        };
        let sram = cart.sram_mut();
        if sram.is_empty() {
            return false;
        }
        let Ok(data) = std::fs::read(path) else {
            return false;
        };

        let n = data.len().min(sram.len());
        sram[..n].copy_from_slice(&data[..n]);
        sram[n..].fill(0);
        true
    }

    fn set_joypad(&mut self, port: Port, buttons: u32) {
        self.joypads[port.index()] = buttons;
    }

    fn run_frame(&mut self, render: RenderMode) {
        if !self.ready() {
            return;
        }
        let buttons = self.port_buttons(Port::One);
        let (Some(ram), Some(audio), Some(sound), Some(surface), Some(cart)) = (
            self.wram.as_deref_mut(),
            self.audio,
            self.sound.as_mut(),
            self.surface.as_mut(),
            self.cart.as_ref(),
        ) else {
            return;
        };

        program::run(ram, &mut self.regs, buttons);
        self.regs.master_clock += self.budget;
        sound.push_silence(audio.samples_this_frame(&mut self.regs.sample_remainder));

        // Frame-skip policy: the phase advances on every frame, rendered or not.
        let due = self.regs.skip_phase == 0;
        self.regs.skip_phase = if due {
            self.settings.skip_frames
        } else {
            self.regs.skip_phase - 1
        };

        if due && render == RenderMode::Policy {
            let mode = VideoMode::from_bits(ram[wram::VIDEO_MODE]);
            surface.compose(mode, ram, cart.tint());
            self.rendered += 1;
        }
    }

    fn reset(&mut self) {
        if let (Some(ram), Some(cart)) = (self.wram.as_deref_mut(), self.cart.as_ref()) {
            program::boot(ram, &mut self.regs, cart.seed(), cart.video_mode());
        }
    }

    fn freeze_size(&self) -> usize {
        self.cart
            .as_ref()
            .map_or(0, |cart| freeze::size(cart.sram().len()))
    }

    fn freeze(&self, buffer: &mut [u8]) -> bool {
        match (self.wram.as_deref(), self.cart.as_ref()) {
            (Some(ram), Some(cart)) => freeze::write(buffer, self.regs, ram, cart.sram()),
            _ => false,
        }
    }

    fn unfreeze(&mut self, data: &[u8]) -> UnfreezeStatus {
        let (Some(ram), Some(cart)) = (self.wram.as_deref_mut(), self.cart.as_mut()) else {
            return UnfreezeStatus::Inconsistent;
        };
        let thawed = match freeze::read(data, cart.sram().len()) {
            Ok(thawed) => thawed,
            Err(status) => return status,
        };

        ram.copy_from_slice(thawed.wram);
        cart.sram_mut().copy_from_slice(thawed.sram);
        self.regs = thawed.regs;
        UnfreezeStatus::Success
    }

    fn ram(&self) -> Option<&[u8]> {
        self.wram.as_deref()
    }

    fn ram_mut(&mut self) -> Option<&mut [u8]> {
        self.wram.as_deref_mut()
    }

    fn video(&self) -> Option<VideoFrame<'_>> {
        self.surface.as_ref().map(Surface::frame)
    }
}
