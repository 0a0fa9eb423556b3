//! Headless SNES runner.
//!
//! Runs the reference core for a number of frames and captures the result,
//! or serves the JSON-RPC control protocol over stdio.

use std::path::PathBuf;
use std::process;

use emu_snes::config::HeadlessConfig;
use emu_snes::mcp::McpServer;
use emu_snes::{ButtonMask, Engine, capture, state};
use snes_sim::SimCore;
use tracing_subscriber::EnvFilter;

// ---------------------------------------------------------------------------
// CLI argument parsing
// ---------------------------------------------------------------------------

struct CliArgs {
    rom_path: Option<PathBuf>,
    frames: Option<u32>,
    warp: bool,
    screenshot_path: Option<PathBuf>,
    record_dir: Option<PathBuf>,
    save_state_path: Option<PathBuf>,
    load_state_path: Option<PathBuf>,
    config_path: Option<PathBuf>,
    mcp: bool,
    script_path: Option<PathBuf>,
}

fn print_usage() {
    eprintln!("Usage: emu-snes [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --rom <file>          SNES ROM image");
    eprintln!("  --frames <n>          Number of frames to run [default: 200]");
    eprintln!("  --warp                Run frames with rendering suppressed");
    eprintln!("  --screenshot <file>   Save a PNG screenshot after running");
    eprintln!("  --record <dir>        Record frames to directory");
    eprintln!("  --save-state <file>   Save state after running");
    eprintln!("  --load-state <file>   Load state before running");
    eprintln!("  --config <file>       JSON settings overrides");
    eprintln!("  --mcp                 Run as JSON-RPC server over stdio");
    eprintln!("  --script <file>       Run a JSON-RPC script and exit");
}

fn parse_args() -> CliArgs {
    let args: Vec<String> = std::env::args().collect();
    let mut cli = CliArgs {
        rom_path: None,
        frames: None,
        warp: false,
        screenshot_path: None,
        record_dir: None,
        save_state_path: None,
        load_state_path: None,
        config_path: None,
        mcp: false,
        script_path: None,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--rom" => {
                i += 1;
                cli.rom_path = args.get(i).map(PathBuf::from);
            }
            "--frames" => {
                i += 1;
                cli.frames = args.get(i).and_then(|s| s.parse().ok());
                if cli.frames.is_none() {
                    eprintln!("--frames needs a non-negative number");
                    process::exit(1);
                }
            }
            "--warp" => {
                cli.warp = true;
            }
            "--screenshot" => {
                i += 1;
                cli.screenshot_path = args.get(i).map(PathBuf::from);
            }
            "--record" => {
                i += 1;
                cli.record_dir = args.get(i).map(PathBuf::from);
            }
            "--save-state" => {
                i += 1;
                cli.save_state_path = args.get(i).map(PathBuf::from);
            }
            "--load-state" => {
                i += 1;
                cli.load_state_path = args.get(i).map(PathBuf::from);
            }
            "--config" => {
                i += 1;
                cli.config_path = args.get(i).map(PathBuf::from);
            }
            "--mcp" => {
                cli.mcp = true;
            }
            "--script" => {
                i += 1;
                cli.script_path = args.get(i).map(PathBuf::from);
            }
            "--help" | "-h" => {
                print_usage();
                process::exit(0);
            }
            other => {
                eprintln!("Unknown argument: {other}");
                process::exit(1);
            }
        }
        i += 1;
    }

    cli
}

// ---------------------------------------------------------------------------
// Headless run
// ---------------------------------------------------------------------------

/// Load, run and capture. Errors are returned rather than exiting here so
/// the caller can drop the engine, and tear the core down, first.
fn run_headless(
    cli: &CliArgs,
    config: &HeadlessConfig,
    engine: &mut Engine<SimCore>,
) -> Result<(), String> {
    let rom_path = cli
        .rom_path
        .as_ref()
        .ok_or("No ROM file specified. Use --rom <file>")?;

    engine
        .try_load(rom_path)
        .map_err(|e| format!("Failed to load ROM {}: {e}", rom_path.display()))?;
    eprintln!("Loaded ROM: {}", rom_path.display());

    if let Some(ref path) = cli.load_state_path {
        state::load_state_file(engine, path).map_err(|e| format!("Load state error: {e}"))?;
        eprintln!("State loaded from {}", path.display());
    }

    let frames = cli.frames.unwrap_or(config.frames);

    if let Some(ref dir) = cli.record_dir {
        capture::record(engine, dir, frames).map_err(|e| format!("Record error: {e}"))?;
    } else {
        let render = !(cli.warp || config.warp);
        engine.advance(frames, render, ButtonMask::empty());
        eprintln!("Ran {frames} frames (frame count {})", engine.frame_count());
    }

    if let Some(ref path) = cli.screenshot_path {
        capture::save_screenshot(engine, path).map_err(|e| format!("Screenshot error: {e}"))?;
        eprintln!("Screenshot saved to {}", path.display());
    }

    if let Some(ref path) = cli.save_state_path {
        let size =
            state::save_state_file(engine, path).map_err(|e| format!("Save state error: {e}"))?;
        eprintln!("State saved to {} ({size} bytes)", path.display());
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() {
    // Logs go to stderr; stdout carries the JSON-RPC stream.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = parse_args();

    let config = match cli.config_path {
        Some(ref path) => match HeadlessConfig::load(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("{e}");
                process::exit(1);
            }
        },
        None => HeadlessConfig::default(),
    };

    let mut engine = Engine::with_settings(SimCore::new(), config.settings())
        .battery_suffix(&config.battery_suffix);

    if cli.mcp || cli.script_path.is_some() {
        let mut server = McpServer::new(engine);
        if let Some(ref path) = cli.rom_path {
            server.set_rom_path(path.clone());
        }
        let result = match cli.script_path {
            Some(ref script) => server.run_script(script),
            None => {
                server.run();
                Ok(())
            }
        };
        drop(server);
        if let Err(e) = result {
            eprintln!("Script error: {e}");
            process::exit(1);
        }
        return;
    }

    let result = run_headless(&cli, &config, &mut engine);
    // Exiting skips destructors; tear the core down first.
    drop(engine);
    if let Err(e) = result {
        eprintln!("{e}");
        process::exit(1);
    }
}
