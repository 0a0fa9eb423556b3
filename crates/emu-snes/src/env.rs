//! Episode wrapper for agent training loops.
//!
//! An [`Env`] owns an engine and a ROM path. `reset` starts an episode at
//! a fixed point past the title screens; `step` holds an action for
//! `frame_skip` frames and reports a reward read from work RAM.

use std::path::{Path, PathBuf};

use emu_core::Core;
use thiserror::Error;
use tracing::{debug, warn};

use crate::input::ButtonMask;
use crate::lifecycle::LoadError;
use crate::video::Screen;
use crate::Engine;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvConfig {
    /// Frames per step, all with the same buttons held.
    pub frame_skip: u32,
    /// Work RAM byte whose change is the step reward.
    pub reward_address: Option<usize>,
    /// Steps before an episode is truncated.
    pub max_episode_steps: u64,
    /// Frames with Start held on the first reset.
    pub intro_start_frames: u32,
    /// Idle frames after the Start presses.
    pub intro_idle_frames: u32,
    /// Compose frames while stepping. Observations are stale when off.
    pub render: bool,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            frame_skip: 4,
            reward_address: None,
            max_episode_steps: 10_000,
            intro_start_frames: 300,
            intro_idle_frames: 60,
            render: true,
        }
    }
}

/// Outcome of one [`Env::step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    /// Signed change of the reward byte since the previous step.
    pub reward: i32,
    /// The engine was marked done.
    pub terminated: bool,
    /// The step limit was reached.
    pub truncated: bool,
    pub frame: u64,
    pub step: u64,
}

#[derive(Debug, Error)]
pub enum EnvError {
    #[error("environment not reset")]
    NotReset,
    #[error(transparent)]
    Load(#[from] LoadError),
}

pub struct Env<C: Core> {
    engine: Engine<C>,
    rom: PathBuf,
    config: EnvConfig,
    /// State just after the intro, and the frame count it was taken at.
    /// Restored by every later reset.
    start: Option<(Vec<u8>, u64)>,
    steps: u64,
    baseline: u8,
    running: bool,
}

impl<C: Core> Env<C> {
    #[must_use]
    pub fn new(engine: Engine<C>, rom: impl Into<PathBuf>, config: EnvConfig) -> Self {
        Self {
            engine,
            rom: rom.into(),
            config,
            start: None,
            steps: 0,
            baseline: 0,
            running: false,
        }
    }

    /// Start a new episode.
    ///
    /// The first reset loads the ROM and plays through the intro, then
    /// snapshots. Later resets restore that snapshot. If the core cannot
    /// snapshot, every reset reloads and replays the intro.
    pub fn reset(&mut self) -> Result<Screen<'_>, EnvError> {
        let restored = match &self.start {
            Some((blob, frame)) if self.engine.load_state(blob) => {
                self.engine.set_frame_count(*frame);
                true
            }
            _ => false,
        };

        if !restored {
            if self.start.is_some() {
                warn!("start snapshot rejected, reloading");
            }
            self.engine.unload();
            self.engine.try_load(&self.rom)?;
            self.play_intro();
            let blob = self.engine.save_state();
            let frame = self.engine.frame_count();
            self.start = (!blob.is_empty()).then_some((blob, frame));
            debug!(
                frames = self.engine.frame_count(),
                snapshot = self.start.is_some(),
                "intro skipped"
            );
        }

        self.engine.set_done(false);
        self.steps = 0;
        self.baseline = self.reward_byte();
        self.running = true;
        Ok(self.engine.screen())
    }

    fn play_intro(&mut self) {
        let render = self.config.render;
        self.engine
            .advance(self.config.intro_start_frames, render, ButtonMask::START);
        self.engine
            .advance(self.config.intro_idle_frames, render, ButtonMask::empty());
    }

    /// Hold `buttons` for `frame_skip` frames.
    pub fn step(&mut self, buttons: ButtonMask) -> Result<Transition, EnvError> {
        if !self.running || !self.engine.is_initialized() {
            return Err(EnvError::NotReset);
        }

        self.engine
            .advance(self.config.frame_skip, self.config.render, buttons);
        self.steps += 1;

        let reward = match self.config.reward_address {
            Some(_) => {
                let current = self.reward_byte();
                let delta = i32::from(current) - i32::from(self.baseline);
                self.baseline = current;
                delta
            }
            None => 0,
        };

        Ok(Transition {
            reward,
            terminated: self.engine.is_done(),
            truncated: self.steps >= self.config.max_episode_steps,
            frame: self.engine.frame_count(),
            step: self.steps,
        })
    }

    /// [`Env::step`] with the 12-boolean action form.
    pub fn step_pressed(&mut self, pressed: &[bool; 12]) -> Result<Transition, EnvError> {
        self.step(ButtonMask::from_pressed(pressed))
    }

    /// The current frame.
    pub fn observation(&mut self) -> Screen<'_> {
        self.engine.screen()
    }

    fn reward_byte(&self) -> u8 {
        self.config
            .reward_address
            .and_then(|addr| self.engine.memory()?.get(addr).copied())
            .unwrap_or(0)
    }

    #[must_use]
    pub fn config(&self) -> &EnvConfig {
        &self.config
    }

    #[must_use]
    pub fn rom(&self) -> &Path {
        &self.rom
    }

    #[must_use]
    pub fn engine(&self) -> &Engine<C> {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut Engine<C> {
        &mut self.engine
    }

    /// End the episode and release the core.
    pub fn close(&mut self) {
        self.running = false;
        self.start = None;
        self.engine.unload();
    }
}
