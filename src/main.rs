use motion_tone::config::InstrumentConfig;
use motion_tone::console_display;
use motion_tone::coordinator::Coordinator;
use motion_tone::data_logger;
use motion_tone::devices::{CountingDelay, Delay, MotionSensor, ThreadDelay, ToneOutput};
use motion_tone::engine::MotionMusicEngine;
use motion_tone::session_reader::{ReplayMotion, SessionReader};
use motion_tone::simulator::{LogTone, SimulatedLeds, SimulatedMotion};
use motion_tone::types::*;
#[cfg(feature = "audio")]
use motion_tone::audio_tone::AudioTone;
#[cfg(feature = "hardware")]
use motion_tone::serial_sensor::SerialMotionSensor;

use clap::Parser;
use crossbeam_channel::bounded;
use log::{error, info, warn};
use std::path::PathBuf;
use std::process;
use std::thread;
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Parser)]
#[command(name = "motion-tone")]
#[command(about = "Motion-played instrument: tilt and twist to play melody and bass")]
struct Cli {
    /// Read the sensor from a serial bridge instead of the simulator
    #[arg(long)]
    serial: bool,

    /// Serial port of the sensor bridge (e.g., /dev/ttyUSB0)
    #[arg(long, default_value = "/dev/ttyUSB0")]
    port: String,

    /// Replay the motion recorded in a ticks.jsonl session
    #[arg(long)]
    replay: Option<PathBuf>,

    /// Simulator gesture script: "basic" or "wander"
    #[arg(long, default_value = "basic")]
    demo: String,

    /// Simulate a board with no sensor attached (exercises the halt path)
    #[arg(long)]
    sim_absent: bool,

    /// Random seed for note generation (default: from the clock)
    #[arg(long)]
    seed: Option<u64>,

    /// Melody only, no bass voice
    #[arg(long)]
    solo: bool,

    /// Drive the LED strips
    #[arg(long)]
    leds: bool,

    /// Play through the default audio output instead of logging tones
    #[arg(long)]
    audio: bool,

    /// Stop after this many ticks (failed sensor reads count as ticks)
    #[arg(long)]
    ticks: Option<u64>,

    /// Skip the note-length holds (play as fast as possible)
    #[arg(long)]
    dry_run: bool,

    /// Instrument config JSON (sensor ranges, pins, strips, duration tables)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Sensor init attempts before halting (overrides config)
    #[arg(long)]
    retries: Option<u32>,

    /// Enable console display (terminal TUI)
    #[arg(long)]
    console: bool,

    /// Redraw the console every N ticks
    #[arg(long, default_value_t = 1)]
    display_every: u64,

    /// Enable session logging
    #[arg(long)]
    log_data: bool,

    /// Output directory for logged sessions
    #[arg(long, default_value = "./sessions")]
    output_dir: PathBuf,
}

fn main() {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info"),
    )
    .format_timestamp_millis()
    .init();

    let cli = Cli::parse();
    let mut config = InstrumentConfig::load_or_default(cli.config.as_deref());
    if let Some(n) = cli.retries {
        config.retry.max_attempts = n;
    }
    let clock = SessionClock::new();

    let mode = if cli.solo { VoiceMode::Solo } else { VoiceMode::Duet };
    let table = match mode {
        VoiceMode::Duet => config.duration_table(),
        VoiceMode::Solo => config.solo_duration_table(),
    };
    let table = match table {
        Ok(t) => t,
        Err(e) => {
            error!("Bad duration table: {}", e);
            process::exit(2);
        }
    };
    let seed = cli.seed.unwrap_or_else(|| {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or_default()
    });
    let engine = MotionMusicEngine::new(mode, table, seed);

    info!("═══════════════════════════════════════════════");
    info!("  MOTION TONE v{}", env!("CARGO_PKG_VERSION"));
    info!("  Voices: {:?}   Seed: {}", mode, seed);
    info!(
        "  Input: {}",
        match (&cli.replay, cli.serial) {
            (Some(p), _) => format!("REPLAY {:?}", p),
            (None, true) => format!("SERIAL {}", cli.port),
            (None, false) => format!("SIMULATOR ({})", cli.demo),
        }
    );
    info!("  Tone pins: {:?}", config.tone_pins);
    if cli.leds { info!("  LEDs: {:?}", config.strip_lengths()); }
    if cli.console { info!("  UI: Console TUI"); }
    info!("═══════════════════════════════════════════════");

    // Channels: coordinator → consumers
    let mut frame_txs: Vec<crossbeam_channel::Sender<TickFrame>> = Vec::new();
    let mut handles = Vec::new();

    // ─── Console display ────────────────────────────────────────────
    if cli.console {
        let (tx, rx) = bounded::<TickFrame>(256);
        frame_txs.push(tx);
        let every = cli.display_every;
        handles.push(thread::Builder::new().name("display".into()).spawn(move || {
            console_display::ConsoleDisplay::new(rx, every).run();
        }).unwrap());
    }

    // ─── Data logger ────────────────────────────────────────────────
    if cli.log_data {
        let (tx, rx) = bounded::<TickFrame>(4096);
        match data_logger::DataLogger::new(rx, &cli.output_dir, config.clone(), mode) {
            Ok(logger) => {
                frame_txs.push(tx);
                handles.push(thread::Builder::new().name("logger".into()).spawn(move || {
                    if let Err(e) = logger.run() {
                        error!("Data logger stopped: {}", e);
                    }
                }).unwrap());
            }
            Err(e) => error!("Session logging disabled: {}", e),
        }
    }

    // ─── Devices ────────────────────────────────────────────────────
    let sensor = build_sensor(&cli, &clock, seed);
    let tone = build_tone(&cli);
    let delay: Box<dyn Delay> = if cli.dry_run {
        Box::new(CountingDelay::default())
    } else {
        Box::new(ThreadDelay)
    };

    let mut coord = Coordinator::new(sensor, tone, delay, engine)
        .with_sensor_config(config.sensor)
        .with_retry(config.retry)
        .with_frame_sinks(frame_txs);
    if cli.leds {
        coord = coord.with_leds(Box::new(SimulatedLeds::new(&config.strip_lengths())));
    }

    // ─── Bring-up: no tick loop without a confirmed sensor ──────────
    if let Err(e) = coord.bring_up() {
        error!("Halting: {}", e);
        process::exit(1);
    }

    // ─── Tick loop on the main thread ───────────────────────────────
    match coord.run(cli.ticks) {
        Ok(n) => info!("Played {} ticks", n),
        Err(e) => error!("Tick loop stopped: {}", e),
    }

    // Closing the senders lets the consumers finish.
    drop(coord);
    for h in handles {
        let _ = h.join();
    }
}

fn build_sensor(cli: &Cli, clock: &SessionClock, seed: u64) -> Box<dyn MotionSensor> {
    if let Some(path) = &cli.replay {
        match SessionReader::open_path(path) {
            Ok(reader) => return Box::new(ReplayMotion::new(reader)),
            Err(e) => warn!("Cannot replay {:?}: {}; using simulator", path, e),
        }
    } else if cli.serial {
        #[cfg(feature = "hardware")]
        {
            return Box::new(SerialMotionSensor::new(cli.port.clone(), clock.clone()));
        }
        #[cfg(not(feature = "hardware"))]
        error!("Serial input requires the 'hardware' feature. Falling back to simulator.");
    }

    let sim = SimulatedMotion::new(clock.clone(), seed, &cli.demo);
    if cli.sim_absent {
        Box::new(sim.absent())
    } else {
        Box::new(sim)
    }
}

fn build_tone(cli: &Cli) -> Box<dyn ToneOutput> {
    if cli.audio {
        #[cfg(feature = "audio")]
        match AudioTone::start() {
            Ok(tone) => return Box::new(tone),
            Err(e) => error!("Audio output unavailable: {}", e),
        }
        #[cfg(not(feature = "audio"))]
        error!("Audio output requires the 'audio' feature. Logging tones instead.");
    }
    Box::new(LogTone::default())
}
