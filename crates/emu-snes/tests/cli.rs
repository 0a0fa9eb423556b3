//! The headless binary end to end.

#![cfg(feature = "native")]

use std::path::PathBuf;
use std::process::{Command, Output};

use snes_sim::RomBuilder;

fn write_rom(name: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("emu-snes-cli-{}-{name}.sfc", std::process::id()));
    std::fs::write(&path, RomBuilder::new().build()).expect("write test ROM");
    path
}

fn run(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_emu-snes"))
        .args(args)
        .env("RUST_LOG", "info")
        .env("NO_COLOR", "1")
        .output()
        .expect("binary runs")
}

#[test]
fn runs_frames_and_saves_state() {
    let rom = write_rom("ok");
    let state = std::env::temp_dir().join(format!("emu-snes-cli-{}-ok.state", std::process::id()));
    let out = run(&[
        "--rom",
        rom.to_str().expect("utf-8 path"),
        "--frames",
        "10",
        "--save-state",
        state.to_str().expect("utf-8 path"),
    ]);
    assert!(out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("frame count 10"), "{stderr}");
    assert!(std::fs::metadata(&state).expect("state written").len() > 0);
}

#[test]
fn failure_after_load_still_tears_down() {
    let rom = write_rom("teardown");
    let out = run(&[
        "--rom",
        rom.to_str().expect("utf-8 path"),
        "--frames",
        "1",
        "--screenshot",
        "/nonexistent-emu-snes-dir/shot.png",
    ]);
    assert_eq!(out.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("Screenshot error"), "{stderr}");
    assert!(stderr.contains("ROM unloaded"), "{stderr}");
}

#[test]
fn missing_rom_is_an_error() {
    let out = run(&["--frames", "1"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("No ROM file specified"));
}
