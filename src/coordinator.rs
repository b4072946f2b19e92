use crate::config::{RetryPolicy, SensorConfig};
use crate::devices::{Delay, LedOutput, MotionSensor, SensorError, ToneOutput};
use crate::diagnostics::format_motion_line;
use crate::engine::{MotionMusicEngine, TickNotes};
use crate::playback::PlaybackDriver;
use crate::types::*;
use crate::visualizer;
use crossbeam_channel::{Sender, TrySendError};
use log::{debug, error, info, trace, warn};

/// Pause after a failed read before polling again.
const READ_RETRY_MS: u32 = 10;
/// Consecutive failed reads before the loop gives up on the sensor.
pub const MAX_READ_FAILURES: u32 = 50;

/// The tick loop: read the sensor, generate both voices, sound them for the
/// melody's duration, silence them, repeat.
///
/// Everything runs on the calling thread. The engine's note state is only
/// touched here, once per tick, melody first. Finished ticks are fanned out
/// to any number of consumers (console display, data logger) over bounded
/// channels; a full or closed consumer never stalls playback.
pub struct Coordinator {
    sensor: Box<dyn MotionSensor>,
    tone: Box<dyn ToneOutput>,
    leds: Option<Box<dyn LedOutput>>,
    delay: Box<dyn Delay>,
    engine: MotionMusicEngine,
    playback: PlaybackDriver,
    frame_txs: Vec<Sender<TickFrame>>,
    sensor_config: SensorConfig,
    retry: RetryPolicy,
    ready: bool,
}

impl Coordinator {
    pub fn new(
        sensor: Box<dyn MotionSensor>,
        tone: Box<dyn ToneOutput>,
        delay: Box<dyn Delay>,
        engine: MotionMusicEngine,
    ) -> Self {
        let playback = PlaybackDriver::new(engine.scale().clone());
        Self {
            sensor,
            tone,
            leds: None,
            delay,
            engine,
            playback,
            frame_txs: Vec::new(),
            sensor_config: SensorConfig::default(),
            retry: RetryPolicy::default(),
            ready: false,
        }
    }

    pub fn with_leds(mut self, leds: Box<dyn LedOutput>) -> Self {
        self.leds = Some(leds);
        self
    }

    pub fn with_frame_sinks(mut self, txs: Vec<Sender<TickFrame>>) -> Self {
        self.frame_txs = txs;
        self
    }

    pub fn with_sensor_config(mut self, config: SensorConfig) -> Self {
        self.sensor_config = config;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Initialise the sensor, backing off between attempts. The tick loop
    /// refuses to start until this has succeeded.
    pub fn bring_up(&mut self) -> Result<(), SensorError> {
        let attempts = self.retry.max_attempts.max(1);
        let mut backoff = self.retry.initial_delay_ms;

        let mut attempt = 1;
        loop {
            match self.sensor.init(&self.sensor_config) {
                Ok(()) => {
                    info!("Motion sensor ready ({:?})", self.sensor_config);
                    self.ready = true;
                    return Ok(());
                }
                Err(e) if attempt >= attempts => {
                    error!("Sensor init failed after {} attempt(s): {}", attempts, e);
                    return Err(e);
                }
                Err(e) => {
                    warn!("Sensor init attempt {}/{} failed: {}", attempt, attempts, e);
                    self.delay.hold_ms(backoff.min(u32::MAX as u64) as u32);
                    backoff = backoff.saturating_mul(2);
                    attempt += 1;
                }
            }
        }
    }

    /// Run the tick loop. `max_ticks = None` runs until the sensor stream
    /// ends. Returns the number of completed ticks.
    ///
    /// `max_ticks` bounds read attempts, so failed reads count against it.
    /// After `MAX_READ_FAILURES` failed reads in a row the last error is
    /// returned.
    pub fn run(&mut self, max_ticks: Option<u64>) -> Result<u64, SensorError> {
        if !self.ready {
            self.bring_up()?;
        }
        info!("Coordinator running ({:?})", self.engine.mode());

        let mut tick: u64 = 0;
        let mut attempts: u64 = 0;
        let mut failures: u32 = 0;
        let mut outcome = Ok(());
        while max_ticks.map_or(true, |max| attempts < max) {
            attempts += 1;
            let sample = match self.sensor.read_motion() {
                Ok(s) => {
                    failures = 0;
                    s
                }
                Err(SensorError::Disconnected) => {
                    info!("Sensor stream ended");
                    break;
                }
                Err(e) => {
                    failures += 1;
                    if failures >= MAX_READ_FAILURES {
                        error!("Giving up after {} failed reads: {}", failures, e);
                        outcome = Err(e);
                        break;
                    }
                    warn!("Sensor read failed, skipping tick: {}", e);
                    self.delay.hold_ms(READ_RETRY_MS);
                    continue;
                }
            };

            let frame = self.tick(tick, sample);
            for tx in &self.frame_txs {
                match tx.try_send(frame.clone()) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) => {
                        warn!("Frame sink full, dropped tick {}", tick);
                    }
                    Err(TrySendError::Disconnected(_)) => {
                        trace!("Frame sink closed, tick {} not delivered", tick);
                    }
                }
            }

            tick += 1;
            if tick % 100 == 0 {
                debug!("Coordinator: {} ticks played", tick);
            }
        }

        if let Some(leds) = self.leds.as_deref_mut() {
            visualizer::clear(leds);
        }
        info!("Coordinator shutting down after {} ticks", tick);
        outcome.map(|()| tick)
    }

    /// One full tick for an already-read sample.
    fn tick(&mut self, tick: u64, sample: MotionSample) -> TickFrame {
        let features = MotionFeatures::from_sample(&sample);
        debug!("{}", format_motion_line(&sample));

        let notes = self.engine.step(features);
        let sounding = self.playback.start(&notes, self.tone.as_mut());
        debug!(
            "melody {}{} {}ms",
            DEGREE_NAMES[notes.melody.pitch_class.min(SILENCE) as usize],
            notes.melody.octave,
            notes.melody.duration_ms
        );

        let hold_ms = PlaybackDriver::hold_ms(&notes);
        self.hold(&notes, hold_ms);
        self.playback.stop(&notes, self.tone.as_mut());

        let frame = TickFrame {
            tick,
            sample,
            features,
            melody: notes.melody,
            bass: notes.bass,
            melody_hz: sounding.melody_hz,
            bass_hz: sounding.bass_hz,
            hold_ms,
            clamped: sounding.clamped,
        };
        trace!("{}", frame);
        frame
    }

    /// Block for the note length, animating the strips if there are any.
    fn hold(&mut self, notes: &TickNotes, hold_ms: u32) {
        match self.leds.as_deref_mut() {
            None => self.delay.hold_ms(hold_ms),
            Some(leds) => {
                let frames = visualizer::frame_schedule(hold_ms);
                if frames.is_empty() {
                    visualizer::render(notes, 0, 1, leds);
                }
                for (step, &ms) in frames.iter().enumerate() {
                    visualizer::render(notes, step, frames.len(), leds);
                    self.delay.hold_ms(ms);
                }
            }
        }
    }

    pub fn engine(&self) -> &MotionMusicEngine {
        &self.engine
    }
}
