//! The adapter: one core, one session, one frame counter.

use std::path::Path;

use emu_core::{Core, Observable, Port, RenderMode, Settings, Value, parse_address};
use tracing::{info, warn};

use crate::input::{ActionQueue, ButtonMask, encode};
use crate::lifecycle::{self, LoadError, Session};
use crate::state::{self, Rewind};
use crate::video::{self, Projector, Screen};

/// Size of the work RAM exposed by [`Engine::memory`].
pub const MEMORY_SIZE: usize = 0x2_0000;

/// Default battery save suffix, appended to the ROM path.
pub const BATTERY_SUFFIX: &str = ".srm";

/// Headless driver for a wrapped core.
///
/// Every call that touches the core is a no-op or returns a sentinel until
/// a ROM has been loaded.
pub struct Engine<C: Core> {
    core: C,
    settings: Settings,
    battery_suffix: String,
    session: Option<Session>,
    frame_count: u64,
    done: bool,
    projector: Projector,
}

impl<C: Core> Engine<C> {
    /// An engine that applies [`Settings::headless`] on load.
    #[must_use]
    pub fn new(core: C) -> Self {
        Self::with_settings(core, Settings::headless())
    }

    #[must_use]
    pub fn with_settings(core: C, settings: Settings) -> Self {
        Self {
            core,
            settings,
            battery_suffix: BATTERY_SUFFIX.to_string(),
            session: None,
            frame_count: 0,
            done: false,
            projector: Projector::new(),
        }
    }

    /// Suffix appended to the ROM path to find its battery save.
    #[must_use]
    pub fn battery_suffix(mut self, suffix: &str) -> Self {
        self.battery_suffix = suffix.to_string();
        self
    }

    // === Lifecycle ===

    /// Bring up the core and load the ROM at `path`.
    ///
    /// Returns `false` if any stage fails (the engine is left unloaded and
    /// may be retried) or if a ROM is already loaded.
    pub fn load(&mut self, path: impl AsRef<Path>) -> bool {
        match self.try_load(path) {
            Ok(()) => true,
            Err(e) => {
                warn!("load failed: {e}");
                false
            }
        }
    }

    /// [`Engine::load`], reporting why it failed.
    pub fn try_load(&mut self, path: impl AsRef<Path>) -> Result<(), LoadError> {
        let path = path.as_ref();
        if self.session.is_some() {
            return Err(LoadError::AlreadyLoaded);
        }

        let session = lifecycle::bring_up(&mut self.core, &self.settings, path, &self.battery_suffix)?;
        info!(rom = %path.display(), "ROM loaded");
        self.session = Some(session);
        self.frame_count = 0;
        self.done = false;
        Ok(())
    }

    /// Tear the core down. Returns `false` if nothing was loaded.
    pub fn unload(&mut self) -> bool {
        let Some(session) = self.session.take() else {
            return false;
        };
        info!(rom = %session.rom.display(), "ROM unloaded");
        lifecycle::end(&mut self.core, session);
        true
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.session.is_some()
    }

    /// The loaded ROM's path.
    #[must_use]
    pub fn rom_path(&self) -> Option<&Path> {
        self.session.as_ref().map(|s| s.rom.as_path())
    }

    /// Where the battery save was looked for.
    #[must_use]
    pub fn battery_path(&self) -> Option<&Path> {
        self.session.as_ref().map(|s| s.battery.as_path())
    }

    // === Frame driver ===

    /// Run one frame with `buttons` held on port 1, rendering by the core's
    /// own policy.
    pub fn step(&mut self, buttons: ButtonMask) {
        if self.session.is_none() {
            return;
        }
        self.core.set_joypad(Port::One, buttons.bits());
        self.core.run_frame(RenderMode::Policy);
        self.frame_count += 1;
    }

    /// Run `count` frames with `buttons` held. With `render` false no frame
    /// is composed, but the core's frame-skip policy still advances.
    pub fn advance(&mut self, count: u32, render: bool, buttons: ButtonMask) {
        if self.session.is_none() {
            return;
        }
        let mode = if render {
            RenderMode::Policy
        } else {
            RenderMode::Suppress
        };
        self.core.set_joypad(Port::One, buttons.bits());
        for _ in 0..count {
            self.core.run_frame(mode);
        }
        self.frame_count += u64::from(count);
    }

    /// [`Engine::step`] with named inputs (see [`encode`]).
    pub fn step_named<I, K, V>(&mut self, inputs: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: std::borrow::Borrow<bool>,
    {
        self.step(encode(inputs));
    }

    /// [`Engine::advance`] with named inputs.
    pub fn advance_named<I, K, V>(&mut self, count: u32, render: bool, inputs: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: std::borrow::Borrow<bool>,
    {
        self.advance(count, render, encode(inputs));
    }

    /// Drain `queue` one frame at a time. Returns the frames run.
    pub fn run_actions(&mut self, queue: &mut ActionQueue, render: bool) -> u64 {
        if self.session.is_none() {
            return 0;
        }
        let mut frames = 0;
        while let Some(buttons) = queue.next_frame() {
            self.advance(1, render, buttons);
            frames += 1;
        }
        frames
    }

    /// Soft reset. The frame counter keeps counting.
    pub fn reset(&mut self) {
        if self.session.is_some() {
            self.core.reset();
        }
    }

    /// Frames run since the ROM was loaded.
    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Rewind the counter alongside a restored snapshot.
    pub(crate) fn set_frame_count(&mut self, frames: u64) {
        self.frame_count = frames;
    }

    #[must_use]
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Mark the episode finished (or not). Cleared on load.
    pub fn set_done(&mut self, done: bool) {
        self.done = done;
    }

    // === Views ===

    /// Project the current frame to RGBA.
    pub fn screen(&mut self) -> Screen<'_> {
        let frame = if self.session.is_some() {
            self.core.video()
        } else {
            None
        };
        self.projector.project(frame)
    }

    /// Size [`Engine::screen`] would report, without projecting.
    #[must_use]
    pub fn screen_size(&self) -> (u32, u32) {
        if self.session.is_some() {
            video::geometry(self.core.video().as_ref())
        } else {
            (video::NOMINAL_WIDTH, video::NOMINAL_HEIGHT)
        }
    }

    /// Work RAM, [`MEMORY_SIZE`] bytes.
    #[must_use]
    pub fn memory(&self) -> Option<&[u8]> {
        self.session.as_ref()?;
        self.core.ram()?.get(..MEMORY_SIZE)
    }

    /// Work RAM, writable. Writes take effect on the next frame.
    pub fn memory_mut(&mut self) -> Option<&mut [u8]> {
        self.session.as_ref()?;
        self.core.ram_mut()?.get_mut(..MEMORY_SIZE)
    }

    /// The projected screen and work RAM together.
    pub fn observe(&mut self) -> Option<(Screen<'_>, &[u8])> {
        self.session.as_ref()?;
        let ram = self.core.ram()?.get(..MEMORY_SIZE)?;
        let screen = self.projector.project(self.core.video());
        Some((screen, ram))
    }

    #[must_use]
    pub fn memory_size(&self) -> usize {
        MEMORY_SIZE
    }

    // === State ===

    /// Snapshot the full core state. Empty if nothing is loaded or the core
    /// cannot freeze.
    #[must_use]
    pub fn save_state(&self) -> Vec<u8> {
        if self.session.is_none() {
            return Vec::new();
        }
        state::freeze(&self.core)
    }

    /// Restore a snapshot. The frame counter is not part of the snapshot
    /// and is left alone.
    pub fn load_state(&mut self, data: &[u8]) -> bool {
        if self.session.is_none() || data.is_empty() {
            return false;
        }
        state::thaw(&mut self.core, data)
    }

    /// Restore the newest snapshot in `ring`.
    pub fn rewind(&mut self, ring: &mut Rewind) -> bool {
        ring.pop().is_some_and(|blob| self.load_state(&blob))
    }

    /// The wrapped core.
    #[must_use]
    pub fn core(&self) -> &C {
        &self.core
    }
}

impl<C: Core> Drop for Engine<C> {
    fn drop(&mut self) {
        self.unload();
    }
}

impl<C: Core> Observable for Engine<C> {
    fn query(&self, path: &str) -> Option<Value> {
        if let Some(rest) = path.strip_prefix("memory.") {
            let addr = parse_address(rest)?;
            self.memory()?.get(addr).copied().map(Value::U8)
        } else {
            match path {
                "frame_count" => Some(self.frame_count.into()),
                "done" => Some(self.done.into()),
                "initialized" => Some(self.is_initialized().into()),
                "screen.width" => Some(self.screen_size().0.into()),
                "screen.height" => Some(self.screen_size().1.into()),
                "state.size" => {
                    let size = if self.is_initialized() {
                        self.core.freeze_size()
                    } else {
                        0
                    };
                    Some((size as u64).into())
                }
                "rom" => self
                    .rom_path()
                    .map(|p| Value::String(p.display().to_string())),
                _ => None,
            }
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &[
            "frame_count",
            "done",
            "initialized",
            "screen.width",
            "screen.height",
            "state.size",
            "rom",
            "memory.<address>",
        ]
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use emu_core::{Device, Subsystem, UnfreezeStatus, VideoFrame};

    use super::*;

    /// A core whose RAM view runs past the SNES work RAM.
    struct OversizedCore {
        ram: Vec<u8>,
    }

    impl Core for OversizedCore {
        fn apply_settings(&mut self, _: &Settings) {}
        fn init(&mut self, _: Subsystem) -> bool {
            true
        }
        fn load_cartridge(&mut self, _: &Path) -> bool {
            true
        }
        fn deinit(&mut self, _: Subsystem) {}
        fn set_controller(&mut self, _: Port, _: Device) {}
        fn load_battery(&mut self, _: &Path) -> bool {
            false
        }
        fn set_joypad(&mut self, _: Port, _: u32) {}
        fn run_frame(&mut self, _: RenderMode) {}
        fn reset(&mut self) {}
        fn freeze_size(&self) -> usize {
            0
        }
        fn freeze(&self, _: &mut [u8]) -> bool {
            false
        }
        fn unfreeze(&mut self, _: &[u8]) -> UnfreezeStatus {
            UnfreezeStatus::WrongFormat
        }
        fn ram(&self) -> Option<&[u8]> {
            Some(&self.ram)
        }
        fn ram_mut(&mut self) -> Option<&mut [u8]> {
            Some(&mut self.ram)
        }
        fn video(&self) -> Option<VideoFrame<'_>> {
            None
        }
    }

    fn oversized() -> Engine<OversizedCore> {
        let mut engine = Engine::new(OversizedCore {
            ram: vec![0; MEMORY_SIZE + 64],
        });
        assert!(engine.load("oversized.sfc"));
        engine
    }

    #[test]
    fn memory_view_matches_reported_size() {
        let mut engine = oversized();
        assert_eq!(engine.memory().map(<[u8]>::len), Some(engine.memory_size()));
        assert_eq!(engine.memory_mut().map(|ram| ram.len()), Some(MEMORY_SIZE));
        let (screen, ram) = engine.observe().expect("loaded");
        assert_eq!(ram.len(), MEMORY_SIZE);
        assert_eq!((screen.width, screen.height), (256, 224));
    }

    #[test]
    fn short_ram_is_not_exposed() {
        let mut engine = Engine::new(OversizedCore { ram: vec![0; 16] });
        assert!(engine.load("short.sfc"));
        assert!(engine.memory().is_none());
        assert!(engine.observe().is_none());
    }

    #[test]
    fn empty_snapshot_from_core_is_empty_blob() {
        let engine = oversized();
        assert!(engine.save_state().is_empty());
    }
}
