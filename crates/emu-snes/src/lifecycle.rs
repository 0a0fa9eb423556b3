//! Staged bring-up and teardown of the wrapped core.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use emu_core::{Core, Device, Port, Settings, Subsystem};
use thiserror::Error;
use tracing::debug;

/// Why a load was refused.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LoadError {
    /// A session is already running on this engine. Unload first.
    #[error("a ROM is already loaded")]
    AlreadyLoaded,
    /// Another engine holds the process-wide core.
    #[error("the core is already in use by another session")]
    CoreBusy,
    /// A bring-up stage failed. Every earlier stage has been torn down.
    #[error("{0} initialization failed")]
    Stage(Subsystem),
    #[error("invalid ROM path {0:?}")]
    InvalidPath(PathBuf),
}

/// Held by the one live session of a process-global core.
static CORE_LEASE: AtomicBool = AtomicBool::new(false);

#[derive(Debug)]
struct Lease;

impl Lease {
    fn acquire() -> Option<Self> {
        CORE_LEASE
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
            .then_some(Self)
    }
}

impl Drop for Lease {
    fn drop(&mut self) {
        CORE_LEASE.store(false, Ordering::Release);
        debug!("core lease released");
    }
}

/// A fully brought-up core. Exists only between a successful
/// [`bring_up`] and the matching [`tear_down`].
#[derive(Debug)]
pub(crate) struct Session {
    pub rom: PathBuf,
    pub battery: PathBuf,
    _lease: Option<Lease>,
}

/// `<rom><suffix>`, appended to the full file name (`game.sfc.srm`).
pub(crate) fn battery_path(rom: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(rom.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

/// Run the bring-up chain. On failure every completed stage is released in
/// reverse order and the core is back in its pre-load state.
pub(crate) fn bring_up<C: Core>(
    core: &mut C,
    settings: &Settings,
    rom: &Path,
    battery_suffix: &str,
) -> Result<Session, LoadError> {
    if rom.as_os_str().is_empty() || rom.is_dir() {
        return Err(LoadError::InvalidPath(rom.to_path_buf()));
    }

    let lease = if C::PROCESS_GLOBAL {
        let lease = Lease::acquire().ok_or(LoadError::CoreBusy)?;
        debug!("core lease acquired");
        Some(lease)
    } else {
        None
    };

    core.apply_settings(settings);

    // Everything before the cartridge goes through `Core::init`.
    let subsystems = &Subsystem::BRING_UP[..Subsystem::BRING_UP.len() - 1];
    for (done, &stage) in subsystems.iter().enumerate() {
        if !core.init(stage) {
            tear_down(core, &subsystems[..done]);
            return Err(LoadError::Stage(stage));
        }
    }

    if !core.load_cartridge(rom) {
        tear_down(core, subsystems);
        return Err(LoadError::Stage(Subsystem::Cartridge));
    }

    core.set_controller(Port::One, Device::Joypad);
    core.set_controller(Port::Two, Device::None);

    let battery = battery_path(rom, battery_suffix);
    if core.load_battery(&battery) {
        debug!(path = %battery.display(), "battery save loaded");
    } else {
        debug!(path = %battery.display(), "no battery save");
    }

    Ok(Session {
        rom: rom.to_path_buf(),
        battery,
        _lease: lease,
    })
}

/// Release `stages` in reverse order.
pub(crate) fn tear_down<C: Core>(core: &mut C, stages: &[Subsystem]) {
    for &stage in stages.iter().rev() {
        core.deinit(stage);
    }
}

/// Release a full session. The lease, if any, goes with it.
pub(crate) fn end<C: Core>(core: &mut C, session: Session) {
    tear_down(core, &Subsystem::BRING_UP);
    drop(session);
}

#[cfg(test)]
mod tests {
    use emu_core::{RenderMode, UnfreezeStatus, VideoFrame};

    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        Settings,
        Init(Subsystem),
        Cartridge,
        Deinit(Subsystem),
        Controller(Port, Device),
        Battery(PathBuf),
    }

    /// Records every call and fails at a chosen stage.
    #[derive(Default)]
    struct RecordingCore {
        calls: Vec<Call>,
        fail_at: Option<Subsystem>,
    }

    impl RecordingCore {
        fn failing_at(stage: Subsystem) -> Self {
            Self {
                fail_at: Some(stage),
                ..Self::default()
            }
        }
    }

    impl Core for RecordingCore {
        fn apply_settings(&mut self, _: &Settings) {
            self.calls.push(Call::Settings);
        }
        fn init(&mut self, stage: Subsystem) -> bool {
            self.calls.push(Call::Init(stage));
            self.fail_at != Some(stage)
        }
        fn load_cartridge(&mut self, _: &Path) -> bool {
            self.calls.push(Call::Cartridge);
            self.fail_at != Some(Subsystem::Cartridge)
        }
        fn deinit(&mut self, stage: Subsystem) {
            self.calls.push(Call::Deinit(stage));
        }
        fn set_controller(&mut self, port: Port, device: Device) {
            self.calls.push(Call::Controller(port, device));
        }
        fn load_battery(&mut self, path: &Path) -> bool {
            self.calls.push(Call::Battery(path.to_path_buf()));
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
            None
        }
        fn ram_mut(&mut self) -> Option<&mut [u8]> {
            None
        }
        fn video(&self) -> Option<VideoFrame<'_>> {
            None
        }
    }

    fn rom() -> PathBuf {
        PathBuf::from("game.sfc")
    }

    #[test]
    fn full_chain_order() {
        let mut core = RecordingCore::default();
        let session = bring_up(&mut core, &Settings::headless(), &rom(), ".srm").expect("loads");
        assert_eq!(
            core.calls,
            vec![
                Call::Settings,
                Call::Init(Subsystem::Memory),
                Call::Init(Subsystem::AudioTiming),
                Call::Init(Subsystem::SoundBuffer),
                Call::Init(Subsystem::Graphics),
                Call::Cartridge,
                Call::Controller(Port::One, Device::Joypad),
                Call::Controller(Port::Two, Device::None),
                Call::Battery(PathBuf::from("game.sfc.srm")),
            ]
        );

        core.calls.clear();
        end(&mut core, session);
        assert_eq!(
            core.calls,
            vec![
                Call::Deinit(Subsystem::Cartridge),
                Call::Deinit(Subsystem::Graphics),
                Call::Deinit(Subsystem::SoundBuffer),
                Call::Deinit(Subsystem::AudioTiming),
                Call::Deinit(Subsystem::Memory),
            ]
        );
    }

    #[test]
    fn graphics_failure_unwinds_in_reverse() {
        let mut core = RecordingCore::failing_at(Subsystem::Graphics);
        let err = bring_up(&mut core, &Settings::headless(), &rom(), ".srm").expect_err("fails");
        assert_eq!(err, LoadError::Stage(Subsystem::Graphics));
        assert_eq!(
            core.calls[5..],
            [
                Call::Deinit(Subsystem::SoundBuffer),
                Call::Deinit(Subsystem::AudioTiming),
                Call::Deinit(Subsystem::Memory),
            ]
        );
    }

    #[test]
    fn memory_failure_releases_nothing() {
        let mut core = RecordingCore::failing_at(Subsystem::Memory);
        let err = bring_up(&mut core, &Settings::headless(), &rom(), ".srm").expect_err("fails");
        assert_eq!(err, LoadError::Stage(Subsystem::Memory));
        assert_eq!(core.calls, vec![Call::Settings, Call::Init(Subsystem::Memory)]);
    }

    #[test]
    fn cartridge_failure_unwinds_all_subsystems() {
        let mut core = RecordingCore::failing_at(Subsystem::Cartridge);
        let err = bring_up(&mut core, &Settings::headless(), &rom(), ".srm").expect_err("fails");
        assert_eq!(err, LoadError::Stage(Subsystem::Cartridge));
        assert_eq!(core.calls.last(), Some(&Call::Deinit(Subsystem::Memory)));
        assert!(!core.calls.iter().any(|c| matches!(c, Call::Controller(..))));
    }

    #[test]
    fn empty_path_is_refused_before_the_core() {
        let mut core = RecordingCore::default();
        let err = bring_up(&mut core, &Settings::headless(), Path::new(""), ".srm")
            .expect_err("fails");
        assert!(matches!(err, LoadError::InvalidPath(_)));
        assert!(core.calls.is_empty());
    }

    #[test]
    fn battery_suffix_appends() {
        assert_eq!(
            battery_path(Path::new("/roms/smw.sfc"), ".srm"),
            PathBuf::from("/roms/smw.sfc.srm")
        );
    }
}
