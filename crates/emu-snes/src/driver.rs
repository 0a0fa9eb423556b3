//! Paced frame loop with an action queue and interval callbacks.
//!
//! The caller owns the loop: [`Driver::run_frames`] and
//! [`Driver::run_queued`] return after the requested frames, so there is no
//! background thread to start or stop.

use std::thread;
use std::time::{Duration, Instant};

use emu_core::Core;

use crate::input::{ActionQueue, ButtonMask, encode};
use crate::video::Screen;
use crate::Engine;

/// Frame rate at speed 1.0.
pub const BASE_FPS: f64 = 60.0;

/// Handle for removing a callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallbackId(u64);

type FrameFn<'a> = Box<dyn FnMut(Screen<'_>, &[u8]) + 'a>;

struct Hook<'a> {
    id: CallbackId,
    interval: u32,
    counter: u32,
    callback: FrameFn<'a>,
}

/// Drives an engine one frame at a time from a queue of held inputs.
///
/// Frames run under the core's own render policy, like [`Engine::step`].
/// Once the queue is empty the driver keeps running with nothing pressed.
pub struct Driver<'a> {
    queue: ActionQueue,
    hooks: Vec<Hook<'a>>,
    next_id: u64,
    frame_time: Option<Duration>,
    speed: f64,
    frames: u64,
}

impl<'a> Driver<'a> {
    /// An uncapped driver with an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self {
            queue: ActionQueue::new(),
            hooks: Vec::new(),
            next_id: 0,
            frame_time: None,
            speed: 0.0,
            frames: 0,
        }
    }

    /// A driver paced at `speed` times real time.
    #[must_use]
    pub fn with_speed(speed: f64) -> Self {
        let mut driver = Self::new();
        driver.set_speed(speed);
        driver
    }

    /// Speed multiplier: 1.0 is 60 frames per second, 2.0 is 120. Zero,
    /// negative or non-finite values run uncapped.
    pub fn set_speed(&mut self, speed: f64) {
        if speed.is_finite() && speed > 0.0 {
            self.speed = speed;
            self.frame_time = Some(Duration::from_secs_f64(1.0 / (BASE_FPS * speed)));
        } else {
            self.speed = 0.0;
            self.frame_time = None;
        }
    }

    /// Current speed multiplier; 0.0 when uncapped.
    #[must_use]
    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// Target frames per second; `None` when uncapped.
    #[must_use]
    pub fn target_fps(&self) -> Option<f64> {
        self.frame_time.map(|_| BASE_FPS * self.speed)
    }

    // === Actions ===

    /// Hold `buttons` for `frames` frames after everything already queued.
    pub fn queue_action(&mut self, buttons: ButtonMask, frames: u32) {
        self.queue.push(buttons, frames);
    }

    /// [`Driver::queue_action`] with named inputs.
    pub fn queue_named<I, K, V>(&mut self, inputs: I, frames: u32)
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: std::borrow::Borrow<bool>,
    {
        self.queue.push(encode(inputs), frames);
    }

    /// Drop every queued action, including the one in progress.
    pub fn clear_actions(&mut self) {
        self.queue.clear();
    }

    #[must_use]
    pub fn queue(&self) -> &ActionQueue {
        &self.queue
    }

    // === Callbacks ===

    /// Call `callback` with the screen and work RAM every `interval` frames
    /// (an interval of 0 counts as 1). The first call comes after
    /// `interval` frames.
    pub fn add_frame_callback<F>(&mut self, interval: u32, callback: F) -> CallbackId
    where
        F: FnMut(Screen<'_>, &[u8]) + 'a,
    {
        let id = CallbackId(self.next_id);
        self.next_id += 1;
        self.hooks.push(Hook {
            id,
            interval: interval.max(1),
            counter: 0,
            callback: Box::new(callback),
        });
        id
    }

    /// Returns `false` if `id` was not registered.
    pub fn remove_frame_callback(&mut self, id: CallbackId) -> bool {
        let before = self.hooks.len();
        self.hooks.retain(|hook| hook.id != id);
        self.hooks.len() != before
    }

    #[must_use]
    pub fn callback_count(&self) -> usize {
        self.hooks.len()
    }

    /// Frames run by this driver.
    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.frames
    }

    // === Running ===

    /// Run `count` frames, taking input from the queue. Returns the frames
    /// run: 0 if nothing is loaded.
    pub fn run_frames<C: Core>(&mut self, engine: &mut Engine<C>, count: u64) -> u64 {
        let mut run = 0;
        while run < count && self.frame(engine) {
            run += 1;
        }
        run
    }

    /// Run until the queue is drained. Returns the frames run.
    pub fn run_queued<C: Core>(&mut self, engine: &mut Engine<C>) -> u64 {
        let mut run = 0;
        while !self.queue.is_empty() && self.frame(engine) {
            run += 1;
        }
        run
    }

    fn frame<C: Core>(&mut self, engine: &mut Engine<C>) -> bool {
        if !engine.is_initialized() {
            return false;
        }
        let started = Instant::now();

        let buttons = self.queue.next_frame().unwrap_or_default();
        engine.step(buttons);
        self.frames += 1;
        self.fire(engine);

        if let Some(frame_time) = self.frame_time
            && let Some(rest) = frame_time.checked_sub(started.elapsed())
        {
            thread::sleep(rest);
        }
        true
    }

    fn fire<C: Core>(&mut self, engine: &mut Engine<C>) {
        for hook in &mut self.hooks {
            hook.counter += 1;
            if hook.counter < hook.interval {
                continue;
            }
            hook.counter = 0;
            if let Some((screen, ram)) = engine.observe() {
                (hook.callback)(screen, ram);
            }
        }
    }
}

impl Default for Driver<'_> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn speed_sets_target() {
        let mut driver = Driver::with_speed(2.0);
        assert_eq!(driver.target_fps(), Some(120.0));
        driver.set_speed(0.0);
        assert_eq!(driver.target_fps(), None);
        driver.set_speed(f64::NAN);
        assert!(driver.target_fps().is_none());
        driver.set_speed(-1.0);
        assert_eq!(driver.target_fps(), None);
    }

    #[test]
    fn callbacks_get_distinct_ids() {
        let mut driver = Driver::new();
        let a = driver.add_frame_callback(1, |_, _| {});
        let b = driver.add_frame_callback(0, |_, _| {});
        assert_ne!(a, b);
        assert_eq!(driver.callback_count(), 2);
        assert!(driver.remove_frame_callback(a));
        assert!(!driver.remove_frame_callback(a));
        assert_eq!(driver.callback_count(), 1);
    }
}
