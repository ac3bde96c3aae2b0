//! Orrery
//!
//! Loads a scene description, drives the engine with a synthetic application
//! clock and logs where the Moon is relative to the Earth as simulation time
//! speeds up, pauses and jumps.
//!
//! Usage:
//!
//! ```text
//! RUST_LOG=info cargo run -p orrery -- [scene-dir] [scene-file] [settings.json]
//! ```
//!
//! Defaults to `demo_apps/orrery/scenes` and `solar.json`.

use anyhow::Context;
use astrolabe::{Engine, EngineSettings, JsonFileLoader, ManualClock, RenderBin};

const FRAME_TIME: f64 = 1.0 / 60.0;
const FRAMES: u32 = 240;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = std::env::args().skip(1);
    let scene_dir = args.next().unwrap_or_else(|| "demo_apps/orrery/scenes".to_string());
    let scene_file = args.next().unwrap_or_else(|| "solar.json".to_string());
    let settings = match args.next() {
        Some(path) => EngineSettings::load_from_file(&path)
            .with_context(|| format!("reading settings from {path}"))?,
        None => EngineSettings::default(),
    };

    let clock = ManualClock::new(0.0);
    let mut engine = Engine::new(
        &settings,
        Box::new(JsonFileLoader::new(&scene_dir)),
        Box::new(clock.clone()),
    );
    engine.scene.schedule_load(scene_file.as_str());

    engine
        .time
        .add_time_jump_callback(|time| log::info!("Jumped to simulation time {time:.1}"));

    let mut now = 0.0;
    for frame in 0..FRAMES {
        now += FRAME_TIME;
        clock.set(now);

        match frame {
            30 => engine.time.set_rate(86_400.0, Some(1.0))?,
            120 => engine.time.set_pause(true, Some(0.5))?,
            180 => engine.time.schedule_time_jump(0.0, now + FRAME_TIME)?,
            200 => engine.time.set_pause(false, None)?,
            _ => {}
        }

        engine
            .tick(now, FRAME_TIME)
            .with_context(|| format!("frame {frame} failed"))?;

        if frame % 30 == 0 {
            let moon = engine.scene.relative_transform("Moon", "Earth")?;
            let drawn = engine.render_bins(0, RenderBin::OPAQUE).len();
            log::info!(
                "frame {frame:3}: t = {:12.1} s, rate = {:8.1}, moon at {:.3e} m, drawn = {drawn}",
                engine.time.time(),
                engine.time.effective_rate(),
                moon.translation.length(),
            );
        }
    }

    let bytes = engine.sync_frame().encode();
    log::info!("Sync payload for followers: {} bytes", bytes.len());

    Ok(())
}
