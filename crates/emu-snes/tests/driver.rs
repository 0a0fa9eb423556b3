//! Queue-fed frame loop with callbacks and pacing.

use std::cell::Cell;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use emu_snes::{ButtonMask, Driver, Engine};
use snes_sim::program::wram;
use snes_sim::{RomBuilder, SimCore};

fn write_rom(name: &str) -> PathBuf {
    let path =
        std::env::temp_dir().join(format!("emu-snes-driver-{}-{name}.sfc", std::process::id()));
    std::fs::write(&path, RomBuilder::new().build()).expect("write test ROM");
    path
}

fn loaded(name: &str) -> Engine<SimCore> {
    let mut engine = Engine::new(SimCore::new());
    assert!(engine.load(write_rom(name)));
    engine
}

fn player_x(engine: &Engine<SimCore>) -> u16 {
    let ram = engine.memory().expect("loaded");
    u16::from_le_bytes([ram[wram::PLAYER_X], ram[wram::PLAYER_X + 1]])
}

#[test]
fn callback_fires_every_interval() {
    let mut engine = loaded("interval");
    let mut seen = Vec::new();
    {
        let mut driver = Driver::new();
        driver.add_frame_callback(10, |screen, ram| {
            seen.push((ram[wram::FRAME], screen.width, ram.len()));
        });
        assert_eq!(driver.run_frames(&mut engine, 35), 35);
        assert_eq!(driver.frame_count(), 35);
    }
    assert_eq!(engine.frame_count(), 35);
    assert_eq!(
        seen,
        vec![(10, 256, 131_072), (20, 256, 131_072), (30, 256, 131_072)]
    );
}

#[test]
fn callbacks_keep_separate_counters() {
    let mut engine = loaded("counters");
    let every = Cell::new(0);
    let third = Cell::new(0);
    let mut driver = Driver::new();
    driver.add_frame_callback(1, |_, _| every.set(every.get() + 1));
    let id = driver.add_frame_callback(3, |_, _| third.set(third.get() + 1));

    driver.run_frames(&mut engine, 7);
    assert_eq!((every.get(), third.get()), (7, 2));

    assert!(driver.remove_frame_callback(id));
    driver.run_frames(&mut engine, 6);
    assert_eq!((every.get(), third.get()), (13, 2));
    assert_eq!(driver.frame_count(), 13);
}

#[test]
fn queued_actions_then_idle() {
    let mut engine = loaded("queue");
    let x0 = player_x(&engine);
    let mut driver = Driver::new();
    driver.queue_action(ButtonMask::RIGHT, 5);
    driver.queue_named([("Right", true), ("B", true)], 2);

    assert_eq!(driver.run_queued(&mut engine), 7);
    assert_eq!(player_x(&engine), x0 + 9);
    assert!(driver.queue().is_empty());

    // An empty queue means nothing pressed.
    driver.run_frames(&mut engine, 3);
    assert_eq!(player_x(&engine), x0 + 9);
    assert_eq!(engine.frame_count(), 10);
}

#[test]
fn cleared_actions_are_not_run() {
    let mut engine = loaded("clear");
    let x0 = player_x(&engine);
    let mut driver = Driver::new();
    driver.queue_action(ButtonMask::RIGHT, 10);
    driver.run_frames(&mut engine, 2);
    driver.clear_actions();
    assert_eq!(driver.run_queued(&mut engine), 0);
    driver.run_frames(&mut engine, 2);
    assert_eq!(player_x(&engine), x0 + 2);
}

#[test]
fn speed_paces_frames() {
    let mut engine = loaded("pace");
    // 600 frames per second: at least 1.6 ms a frame.
    let mut driver = Driver::with_speed(10.0);
    let started = Instant::now();
    driver.run_frames(&mut engine, 6);
    assert!(started.elapsed() >= Duration::from_millis(9));
}

#[test]
fn nothing_runs_without_a_rom() {
    let mut engine = Engine::new(SimCore::new());
    let calls = Cell::new(0);
    let mut driver = Driver::new();
    driver.add_frame_callback(1, |_, _| calls.set(calls.get() + 1));
    driver.queue_action(ButtonMask::A, 3);
    assert_eq!(driver.run_frames(&mut engine, 5), 0);
    assert_eq!(driver.run_queued(&mut engine), 0);
    assert_eq!(calls.get(), 0);
    assert_eq!(driver.frame_count(), 0);
}
