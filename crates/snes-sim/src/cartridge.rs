//! Cartridge image.
//!
//! Only three header bytes are interpreted, all at their LoROM header
//! offsets:
//! - `$7FD5` bits 0-1: power-on video mode
//! - `$7FD8`: battery RAM size, `1 KiB << n` (0 = none)
//! - `$7FD9`: destination code; `$02`-`$0C` are PAL territories

use std::fmt::Write as _;
use std::path::Path;

use sha1::{Digest, Sha1};

/// Smallest accepted image (one LoROM bank pair).
pub const MIN_ROM_SIZE: usize = 0x8000;

const HEADER_MAP_MODE: usize = 0x7FD5;
const HEADER_SRAM_SIZE: usize = 0x7FD8;
const HEADER_COUNTRY: usize = 0x7FD9;

/// Largest battery RAM size code (128 KiB).
const MAX_SRAM_SHIFT: u8 = 7;

/// Output geometry selected by the running program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VideoMode {
    /// 256×224.
    #[default]
    Standard,
    /// 512×224, double-width.
    HiRes,
    /// 512×448, interlaced.
    Interlace,
    /// 512×478, interlaced with overscan.
    InterlaceOverscan,
}

impl VideoMode {
    #[must_use]
    pub const fn from_bits(bits: u8) -> Self {
        match bits & 0x03 {
            0 => Self::Standard,
            1 => Self::HiRes,
            2 => Self::Interlace,
            _ => Self::InterlaceOverscan,
        }
    }

    #[must_use]
    pub const fn bits(self) -> u8 {
        match self {
            Self::Standard => 0,
            Self::HiRes => 1,
            Self::Interlace => 2,
            Self::InterlaceOverscan => 3,
        }
    }

    /// The mode Select switches to.
    #[must_use]
    pub const fn next(self) -> Self {
        Self::from_bits(self.bits() + 1)
    }

    /// Rendered (width, height) in pixels.
    #[must_use]
    pub const fn geometry(self) -> (u32, u32) {
        match self {
            Self::Standard => (256, 224),
            Self::HiRes => (512, 224),
            Self::Interlace => (512, 448),
            Self::InterlaceOverscan => (512, 478),
        }
    }
}

/// Television standard the cartridge was released for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Region {
    #[default]
    Ntsc,
    Pal,
}

impl Region {
    /// Region for a header destination code.
    #[must_use]
    pub const fn from_country(code: u8) -> Self {
        match code {
            0x02..=0x0C => Self::Pal,
            _ => Self::Ntsc,
        }
    }

    /// A destination code that maps back to this region.
    #[must_use]
    pub const fn country(self) -> u8 {
        match self {
            Self::Ntsc => 0x01,
            Self::Pal => 0x02,
        }
    }
}

/// A loaded cartridge: image, digest and battery RAM.
pub struct Cartridge {
    rom: Vec<u8>,
    digest: [u8; 20],
    sram: Vec<u8>,
}

impl Cartridge {
    /// Parse an in-memory image.
    ///
    /// # Errors
    ///
    /// Returns an error if the image is smaller than [`MIN_ROM_SIZE`].
    pub fn from_bytes(rom: Vec<u8>) -> Result<Self, String> {
        if rom.len() < MIN_ROM_SIZE {
            return Err(format!(
                "image is {} bytes, need at least {MIN_ROM_SIZE}",
                rom.len()
            ));
        }

        let mut digest = [0u8; 20];
        digest.copy_from_slice(&Sha1::digest(&rom));
        let shift = rom[HEADER_SRAM_SIZE].min(MAX_SRAM_SHIFT);
        let sram_size = if shift == 0 { 0 } else { 0x400 << shift };

        Ok(Self {
            rom,
            digest,
            sram: vec![0; sram_size],
        })
    }

    /// Read and parse an image file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a valid image.
    pub fn load(path: &Path) -> Result<Self, String> {
        let rom = std::fs::read(path).map_err(|e| format!("{}: {e}", path.display()))?;
        Self::from_bytes(rom)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rom.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rom.is_empty()
    }

    /// Power-on video mode from the header.
    #[must_use]
    pub fn video_mode(&self) -> VideoMode {
        VideoMode::from_bits(self.rom[HEADER_MAP_MODE])
    }

    #[must_use]
    pub fn region(&self) -> Region {
        Region::from_country(self.rom[HEADER_COUNTRY])
    }

    /// SHA-1 of the image as lowercase hex.
    #[must_use]
    pub fn sha1_hex(&self) -> String {
        self.digest.iter().fold(String::with_capacity(40), |mut s, b| {
            let _ = write!(s, "{b:02x}");
            s
        })
    }

    /// Generator seed derived from the digest. Never zero.
    #[must_use]
    pub fn seed(&self) -> u32 {
        let d = self.digest;
        u32::from_le_bytes([d[0], d[1], d[2], d[3]]).max(1)
    }

    /// Background tint (5-bit blue channel) derived from the digest.
    #[must_use]
    pub fn tint(&self) -> u16 {
        u16::from(self.digest[4] & 0x1F)
    }

    #[must_use]
    pub fn sram(&self) -> &[u8] {
        &self.sram
    }

    pub fn sram_mut(&mut self) -> &mut [u8] {
        &mut self.sram
    }
}

/// Builds cartridge images for tests and demos.
#[derive(Debug, Clone)]
pub struct RomBuilder {
    size: usize,
    video_mode: VideoMode,
    sram_shift: u8,
    region: Region,
    fill: u8,
}

impl RomBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            size: MIN_ROM_SIZE,
            video_mode: VideoMode::Standard,
            sram_shift: 0,
            region: Region::Ntsc,
            fill: 0,
        }
    }

    /// Image size in bytes. Clamped to [`MIN_ROM_SIZE`].
    #[must_use]
    pub fn size(mut self, size: usize) -> Self {
        self.size = size.max(MIN_ROM_SIZE);
        self
    }

    #[must_use]
    pub fn video_mode(mut self, mode: VideoMode) -> Self {
        self.video_mode = mode;
        self
    }

    /// Battery RAM size code: `1 KiB << shift`, 0 for none.
    #[must_use]
    pub fn sram_shift(mut self, shift: u8) -> Self {
        self.sram_shift = shift;
        self
    }

    #[must_use]
    pub fn region(mut self, region: Region) -> Self {
        self.region = region;
        self
    }

    /// Filler byte for everything outside the header. Different fills give
    /// different digests, hence different seeds.
    #[must_use]
    pub fn fill(mut self, fill: u8) -> Self {
        self.fill = fill;
        self
    }

    #[must_use]
    pub fn build(&self) -> Vec<u8> {
        let mut rom = vec![self.fill; self.size];
        rom[HEADER_MAP_MODE] = self.video_mode.bits();
        rom[HEADER_SRAM_SIZE] = self.sram_shift;
        rom[HEADER_COUNTRY] = self.region.country();
        rom
    }
}

impl Default for RomBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_short_image() {
        assert!(Cartridge::from_bytes(vec![0; MIN_ROM_SIZE - 1]).is_err());
        assert!(Cartridge::from_bytes(Vec::new()).is_err());
    }

    #[test]
    fn header_fields() {
        let rom = RomBuilder::new()
            .video_mode(VideoMode::HiRes)
            .sram_shift(3)
            .build();
        let cart = Cartridge::from_bytes(rom).expect("valid image");
        assert_eq!(cart.video_mode(), VideoMode::HiRes);
        assert_eq!(cart.sram().len(), 8 * 1024);
    }

    #[test]
    fn sram_size_is_capped() {
        let rom = RomBuilder::new().sram_shift(0xFF).build();
        let cart = Cartridge::from_bytes(rom).expect("valid image");
        assert_eq!(cart.sram().len(), 128 * 1024);
    }

    #[test]
    fn fill_changes_seed() {
        let a = Cartridge::from_bytes(RomBuilder::new().fill(1).build()).expect("valid");
        let b = Cartridge::from_bytes(RomBuilder::new().fill(2).build()).expect("valid");
        assert_ne!(a.seed(), b.seed());
        assert_eq!(a.sha1_hex().len(), 40);
    }

    #[test]
    fn destination_code_picks_region() {
        assert_eq!(Region::from_country(0x00), Region::Ntsc);
        assert_eq!(Region::from_country(0x01), Region::Ntsc);
        assert_eq!(Region::from_country(0x02), Region::Pal);
        assert_eq!(Region::from_country(0x0C), Region::Pal);
        assert_eq!(Region::from_country(0x0D), Region::Ntsc);

        let pal = Cartridge::from_bytes(RomBuilder::new().region(Region::Pal).build()).expect("valid");
        assert_eq!(pal.region(), Region::Pal);
        let ntsc = Cartridge::from_bytes(RomBuilder::new().fill(0x05).build()).expect("valid");
        assert_eq!(ntsc.region(), Region::Ntsc);
    }

    #[test]
    fn mode_cycle_wraps() {
        assert_eq!(VideoMode::InterlaceOverscan.next(), VideoMode::Standard);
        assert_eq!(VideoMode::Standard.next(), VideoMode::HiRes);
    }
}
