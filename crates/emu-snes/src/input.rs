//! Input handling for the SNES joypad.
//!
//! Two layers:
//! 1. `SnesButton` / `ButtonMask`: logical button names mapped to the
//!    core's joypad bits.
//! 2. `ActionQueue`: held button masks for scripted sequences.

use std::borrow::Borrow;
use std::collections::VecDeque;

use bitflags::bitflags;
use emu_core::joypad;

bitflags! {
    /// Buttons held on port 1, in the core's joypad bit layout.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ButtonMask: u32 {
        const R = joypad::R;
        const L = joypad::L;
        const X = joypad::X;
        const A = joypad::A;
        const RIGHT = joypad::RIGHT;
        const LEFT = joypad::LEFT;
        const DOWN = joypad::DOWN;
        const UP = joypad::UP;
        const START = joypad::START;
        const SELECT = joypad::SELECT;
        const Y = joypad::Y;
        const B = joypad::B;
    }
}

/// Logical button on the SNES joypad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SnesButton {
    A,
    B,
    X,
    Y,
    L,
    R,
    Up,
    Down,
    Left,
    Right,
    Start,
    Select,
}

impl SnesButton {
    /// Canonical order, used by the list form of an action.
    pub const ALL: [Self; 12] = [
        Self::A,
        Self::B,
        Self::X,
        Self::Y,
        Self::L,
        Self::R,
        Self::Up,
        Self::Down,
        Self::Left,
        Self::Right,
        Self::Start,
        Self::Select,
    ];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
            Self::X => "X",
            Self::Y => "Y",
            Self::L => "L",
            Self::R => "R",
            Self::Up => "Up",
            Self::Down => "Down",
            Self::Left => "Left",
            Self::Right => "Right",
            Self::Start => "Start",
            Self::Select => "Select",
        }
    }

    /// Exact-case lookup (`"Start"`, not `"start"`).
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|b| b.name() == name)
    }

    /// Case-insensitive lookup.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|b| b.name().eq_ignore_ascii_case(name))
    }

    #[must_use]
    pub const fn mask(self) -> ButtonMask {
        match self {
            Self::A => ButtonMask::A,
            Self::B => ButtonMask::B,
            Self::X => ButtonMask::X,
            Self::Y => ButtonMask::Y,
            Self::L => ButtonMask::L,
            Self::R => ButtonMask::R,
            Self::Up => ButtonMask::UP,
            Self::Down => ButtonMask::DOWN,
            Self::Left => ButtonMask::LEFT,
            Self::Right => ButtonMask::RIGHT,
            Self::Start => ButtonMask::START,
            Self::Select => ButtonMask::SELECT,
        }
    }
}

impl From<SnesButton> for ButtonMask {
    fn from(button: SnesButton) -> Self {
        button.mask()
    }
}

impl ButtonMask {
    /// Mask from 12 booleans in [`SnesButton::ALL`] order.
    pub fn from_pressed(pressed: &[bool; 12]) -> Self {
        SnesButton::ALL
            .iter()
            .zip(pressed)
            .filter(|&(_, &down)| down)
            .fold(Self::empty(), |mask, (button, _)| mask | button.mask())
    }
}

/// Encode named inputs into a mask.
///
/// Names are matched exactly. Unknown names are ignored, absent buttons are
/// released, and the result does not depend on entry order.
pub fn encode<I, K, V>(inputs: I) -> ButtonMask
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: Borrow<bool>,
{
    inputs
        .into_iter()
        .filter(|(_, pressed)| *pressed.borrow())
        .filter_map(|(name, _)| SnesButton::from_name(name.as_ref()))
        .fold(ButtonMask::empty(), |mask, button| mask | button.mask())
}

/// A mask held for a number of frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Action {
    pub buttons: ButtonMask,
    pub frames: u32,
}

/// FIFO of held masks for scripted sequences.
///
/// Drained one frame at a time by
/// [`Engine::run_actions`](crate::Engine::run_actions) or a
/// [`Driver`](crate::Driver).
#[derive(Debug, Default)]
pub struct ActionQueue {
    actions: VecDeque<Action>,
}

impl ActionQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold `buttons` for `frames` frames after everything already queued.
    /// Zero-frame holds are dropped.
    pub fn push(&mut self, buttons: ButtonMask, frames: u32) {
        if frames > 0 {
            self.actions.push_back(Action { buttons, frames });
        }
    }

    /// Release all buttons for `frames` frames.
    pub fn wait(&mut self, frames: u32) {
        self.push(ButtonMask::empty(), frames);
    }

    /// Mask for the next frame, consuming one frame of the front hold.
    pub fn next_frame(&mut self) -> Option<ButtonMask> {
        let front = self.actions.front_mut()?;
        let buttons = front.buttons;
        front.frames -= 1;
        if front.frames == 0 {
            self.actions.pop_front();
        }
        Some(buttons)
    }

    /// Frames left across all holds.
    #[must_use]
    pub fn remaining_frames(&self) -> u64 {
        self.actions.iter().map(|a| u64::from(a.frames)).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn clear(&mut self) {
        self.actions.clear();
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn start_bit() {
        assert_eq!(encode([("Start", true)]).bits(), 1 << 12);
    }

    #[test]
    fn order_does_not_matter() {
        let a = encode([("A", true), ("Right", true)]);
        let b = encode([("Right", true), ("A", true)]);
        assert_eq!(a, b);
        assert_eq!(a, ButtonMask::A | ButtonMask::RIGHT);
    }

    #[test]
    fn unknown_and_released_are_ignored() {
        assert!(encode([("Turbo", true)]).is_empty());
        assert!(encode([("B", false)]).is_empty());
        assert!(encode([("start", true)]).is_empty());
        assert!(encode(Vec::<(&str, bool)>::new()).is_empty());
    }

    #[test]
    fn encodes_map_by_reference() {
        let mut map = HashMap::new();
        map.insert("Y".to_string(), true);
        map.insert("L".to_string(), false);
        assert_eq!(encode(&map), ButtonMask::Y);
    }

    #[test]
    fn bits_match_joypad_layout() {
        assert_eq!(ButtonMask::R.bits(), 1 << 4);
        assert_eq!(ButtonMask::A.bits(), 1 << 7);
        assert_eq!(ButtonMask::B.bits(), 1 << 15);
        assert_eq!(ButtonMask::all().bits(), 0xFFF0);
    }

    #[test]
    fn list_form_uses_canonical_order() {
        let mut pressed = [false; 12];
        pressed[0] = true; // A
        pressed[9] = true; // Right
        assert_eq!(
            ButtonMask::from_pressed(&pressed),
            ButtonMask::A | ButtonMask::RIGHT
        );
    }

    #[test]
    fn names() {
        assert_eq!(SnesButton::from_name("Select"), Some(SnesButton::Select));
        assert_eq!(SnesButton::from_name("select"), None);
        assert_eq!(SnesButton::parse("select"), Some(SnesButton::Select));
        assert_eq!(SnesButton::parse("UP"), Some(SnesButton::Up));
        assert_eq!(SnesButton::parse("turbo"), None);
    }

    #[test]
    fn queue_holds_then_advances() {
        let mut queue = ActionQueue::new();
        queue.push(ButtonMask::A, 2);
        queue.push(ButtonMask::B, 0);
        queue.wait(1);
        assert_eq!(queue.remaining_frames(), 3);

        assert_eq!(queue.next_frame(), Some(ButtonMask::A));
        assert_eq!(queue.next_frame(), Some(ButtonMask::A));
        assert_eq!(queue.next_frame(), Some(ButtonMask::empty()));
        assert_eq!(queue.next_frame(), None);
        assert!(queue.is_empty());
    }
}
