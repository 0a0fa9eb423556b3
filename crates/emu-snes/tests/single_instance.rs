//! One live session per process for cores that keep global state.
//!
//! Kept in its own test binary: the lease is process-wide, so these checks
//! must not race other engine tests.

use std::path::Path;

use emu_core::{Core, Device, Port, RenderMode, Settings, Subsystem, UnfreezeStatus, VideoFrame};
use emu_snes::{Engine, LoadError};
use snes_sim::{RomBuilder, SimCore};

/// The reference core, declared process-global.
#[derive(Default)]
struct GlobalCore(SimCore);

impl Core for GlobalCore {
    const PROCESS_GLOBAL: bool = true;

    fn apply_settings(&mut self, settings: &Settings) {
        self.0.apply_settings(settings);
    }
    fn init(&mut self, stage: Subsystem) -> bool {
        self.0.init(stage)
    }
    fn load_cartridge(&mut self, path: &Path) -> bool {
        self.0.load_cartridge(path)
    }
    fn deinit(&mut self, stage: Subsystem) {
        self.0.deinit(stage);
    }
    fn set_controller(&mut self, port: Port, device: Device) {
        self.0.set_controller(port, device);
    }
    fn load_battery(&mut self, path: &Path) -> bool {
        self.0.load_battery(path)
    }
    fn set_joypad(&mut self, port: Port, buttons: u32) {
        self.0.set_joypad(port, buttons);
    }
    fn run_frame(&mut self, render: RenderMode) {
        self.0.run_frame(render);
    }
    fn reset(&mut self) {
        self.0.reset();
    }
    fn freeze_size(&self) -> usize {
        self.0.freeze_size()
    }
    fn freeze(&self, buffer: &mut [u8]) -> bool {
        self.0.freeze(buffer)
    }
    fn unfreeze(&mut self, data: &[u8]) -> UnfreezeStatus {
        self.0.unfreeze(data)
    }
    fn ram(&self) -> Option<&[u8]> {
        self.0.ram()
    }
    fn ram_mut(&mut self) -> Option<&mut [u8]> {
        self.0.ram_mut()
    }
    fn video(&self) -> Option<VideoFrame<'_>> {
        self.0.video()
    }
}

#[test]
fn second_session_waits_for_the_first() {
    let rom = std::env::temp_dir().join(format!("emu-snes-{}-global.sfc", std::process::id()));
    std::fs::write(&rom, RomBuilder::new().build()).expect("write test ROM");

    let mut first = Engine::new(GlobalCore::default());
    assert!(first.load(&rom));

    let mut second = Engine::new(GlobalCore::default());
    assert_eq!(second.try_load(&rom), Err(LoadError::CoreBusy));
    assert!(!second.is_initialized());

    // Unloading hands the lease back.
    assert!(first.unload());
    assert!(second.load(&rom));

    // So does dropping a loaded engine.
    drop(second);
    let mut third = Engine::new(GlobalCore::default());
    assert!(third.load(&rom));
    drop(third);

    // A bring-up that fails part way releases it too.
    let mut broken = Engine::with_settings(GlobalCore::default(), Settings::default());
    assert_eq!(
        broken.try_load(&rom),
        Err(LoadError::Stage(Subsystem::AudioTiming))
    );
    let mut fourth = Engine::new(GlobalCore::default());
    assert!(fourth.load(&rom));
    assert!(!broken.load(&rom));
}
