//! Freeze blob layout.
//!
//! ```text
//! "SIMF"  version:u16  registers:[u8; 28]
//! wram_len:u32  wram:[u8; wram_len]
//! sram_len:u32  sram:[u8; sram_len]
//! ```
//!
//! All integers little-endian.

use emu_core::UnfreezeStatus;

use crate::WRAM_SIZE;
use crate::program::Registers;

const MAGIC: &[u8; 4] = b"SIMF";
const VERSION: u16 = 1;
const HEADER_LEN: usize = MAGIC.len() + 2;

/// Blob size for a cartridge with `sram_len` bytes of battery RAM.
pub(crate) const fn size(sram_len: usize) -> usize {
    HEADER_LEN + Registers::LEN + 4 + WRAM_SIZE + 4 + sram_len
}

/// Write a blob into `out`, which must be exactly [`size`] bytes.
pub(crate) fn write(out: &mut [u8], regs: Registers, wram: &[u8], sram: &[u8]) -> bool {
    if out.len() != size(sram.len()) || wram.len() != WRAM_SIZE {
        return false;
    }

    let mut w = Writer { out, pos: 0 };
    w.put(MAGIC);
    w.put(&VERSION.to_le_bytes());
    w.put(&regs.to_bytes());
    w.put(&(wram.len() as u32).to_le_bytes());
    w.put(wram);
    w.put(&(sram.len() as u32).to_le_bytes());
    w.put(sram);
    true
}

/// A validated blob, borrowing from the input.
pub(crate) struct Thawed<'a> {
    pub regs: Registers,
    pub wram: &'a [u8],
    pub sram: &'a [u8],
}

/// Validate and split a blob against the loaded cartridge's battery RAM
/// size.
pub(crate) fn read(data: &[u8], sram_len: usize) -> Result<Thawed<'_>, UnfreezeStatus> {
    if data.len() < HEADER_LEN || &data[..MAGIC.len()] != MAGIC {
        return Err(UnfreezeStatus::WrongFormat);
    }
    let version = u16::from_le_bytes([data[4], data[5]]);
    if version != VERSION {
        return Err(UnfreezeStatus::WrongVersion);
    }

    let mut r = Reader {
        data,
        pos: HEADER_LEN,
    };
    let regs_bytes = r.take(Registers::LEN).ok_or(UnfreezeStatus::WrongFormat)?;
    let mut regs = [0u8; Registers::LEN];
    regs.copy_from_slice(regs_bytes);

    let wram_len = r.take_len().ok_or(UnfreezeStatus::WrongFormat)?;
    if wram_len != WRAM_SIZE {
        return Err(UnfreezeStatus::Inconsistent);
    }
    let wram = r.take(wram_len).ok_or(UnfreezeStatus::WrongFormat)?;

    let blob_sram_len = r.take_len().ok_or(UnfreezeStatus::WrongFormat)?;
    if blob_sram_len != sram_len {
        return Err(UnfreezeStatus::Inconsistent);
    }
    let sram = r.take(blob_sram_len).ok_or(UnfreezeStatus::WrongFormat)?;

    if r.pos != data.len() {
        return Err(UnfreezeStatus::WrongFormat);
    }

    Ok(Thawed {
        regs: Registers::from_bytes(&regs),
        wram,
        sram,
    })
}

struct Writer<'a> {
    out: &'a mut [u8],
    pos: usize,
}

impl Writer<'_> {
    fn put(&mut self, bytes: &[u8]) {
        self.out[self.pos..self.pos + bytes.len()].copy_from_slice(bytes);
        self.pos += bytes.len();
    }
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Option<&'a [u8]> {
        let end = self.pos.checked_add(n)?;
        let slice = self.data.get(self.pos..end)?;
        self.pos = end;
        Some(slice)
    }

    fn take_len(&mut self) -> Option<usize> {
        let b = self.take(4)?;
        Some(u32::from_le_bytes([b[0], b[1], b[2], b[3]]) as usize)
    }
}
