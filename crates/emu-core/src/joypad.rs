//! Joypad bitmask layout expected by [`Core::set_joypad`](crate::Core::set_joypad).
//!
//! Bit positions follow the controller's serial shift order, B first from
//! bit 15 down to R at bit 4. Bits 0-3 are the ID bits and always read as
//! zero on a standard joypad.

pub const R: u32 = 1 << 4;
pub const L: u32 = 1 << 5;
pub const X: u32 = 1 << 6;
pub const A: u32 = 1 << 7;
pub const RIGHT: u32 = 1 << 8;
pub const LEFT: u32 = 1 << 9;
pub const DOWN: u32 = 1 << 10;
pub const UP: u32 = 1 << 11;
pub const START: u32 = 1 << 12;
pub const SELECT: u32 = 1 << 13;
pub const Y: u32 = 1 << 14;
pub const B: u32 = 1 << 15;
