//! Headless capture: PNG screenshots.

use std::error::Error;
use std::fs;
use std::io::Write;
use std::path::Path;

use emu_core::Core;

use crate::input::ButtonMask;
use crate::video::Screen;
use crate::Engine;

/// Encode a projected screen as an RGBA PNG.
///
/// # Errors
///
/// Returns an error if the encoder fails.
pub fn encode_png(screen: &Screen<'_>) -> Result<Vec<u8>, Box<dyn Error>> {
    let mut buf = Vec::new();
    write_png(&mut buf, screen)?;
    Ok(buf)
}

fn write_png<W: Write>(out: W, screen: &Screen<'_>) -> Result<(), Box<dyn Error>> {
    let mut encoder = png::Encoder::new(out, screen.width, screen.height);
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);
    let mut writer = encoder.write_header()?;
    writer.write_image_data(screen.pixels)?;
    Ok(())
}

/// Save the current screen as a PNG file.
///
/// # Errors
///
/// Returns an error if the file cannot be created or written.
pub fn save_screenshot<C: Core>(engine: &mut Engine<C>, path: &Path) -> Result<(), Box<dyn Error>> {
    let file = fs::File::create(path)?;
    let w = std::io::BufWriter::new(file);
    write_png(w, &engine.screen())
}

/// Record video: run `num_frames` frames, dumping each as a PNG.
///
/// # Errors
///
/// Returns an error if frames cannot be saved.
pub fn record<C: Core>(
    engine: &mut Engine<C>,
    dir: &Path,
    num_frames: u32,
) -> Result<(), Box<dyn Error>> {
    let frames_dir = dir.join("frames");
    fs::create_dir_all(&frames_dir)?;

    for i in 1..=num_frames {
        engine.step(ButtonMask::empty());
        let filename = frames_dir.join(format!("{i:06}.png"));
        save_screenshot(engine, &filename)?;
    }

    eprintln!("Recorded {num_frames} frames to {}", frames_dir.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_png_signature() {
        let pixels = vec![0x80; 4 * 4 * 4];
        let screen = Screen {
            pixels: &pixels,
            width: 4,
            height: 4,
        };
        let png = encode_png(&screen).expect("encodes");
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
    }
}
