//! Peripheral seams: the sensor, the tone pins, the LED strips and the clock
//! the tick loop sleeps on. Real hardware, the simulator and test doubles all
//! plug in here.

use crate::config::SensorConfig;
use crate::types::MotionSample;
use std::io;
use std::thread;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SensorError {
    #[error("motion sensor not detected: {0}")]
    NotDetected(String),
    #[error("sensor I/O: {0}")]
    Io(#[from] io::Error),
    #[error("malformed sensor line: {0}")]
    Malformed(String),
    #[error("sensor stream ended")]
    Disconnected,
}

/// Accelerometer/gyroscope source, polled once per tick.
pub trait MotionSensor {
    /// Probe and configure the device. Must succeed before the first read.
    fn init(&mut self, config: &SensorConfig) -> Result<(), SensorError>;

    /// Blocking read of one sample.
    fn read_motion(&mut self) -> Result<MotionSample, SensorError>;
}

/// Fixed-frequency tone channels.
pub trait ToneOutput {
    /// Start a tone. `hz == 0` means silence and must not fail.
    fn play_tone(&mut self, channel: usize, hz: u32);

    fn stop_tone(&mut self, channel: usize);
}

/// 8-bit RGB.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const OFF: Rgb = Rgb(0, 0, 0);
}

/// Independently addressed LED strips with a flush per strip.
pub trait LedOutput {
    fn strip_count(&self) -> usize;

    fn strip_len(&self, strip: usize) -> usize;

    fn set_pixel(&mut self, strip: usize, index: usize, color: Rgb);

    fn show(&mut self, strip: usize);

    fn fill(&mut self, strip: usize, color: Rgb) {
        for i in 0..self.strip_len(strip) {
            self.set_pixel(strip, i, color);
        }
    }
}

/// Blocking hold used for note length.
pub trait Delay {
    fn hold_ms(&mut self, ms: u32);
}

/// Sleeps the calling thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadDelay;

impl Delay for ThreadDelay {
    fn hold_ms(&mut self, ms: u32) {
        thread::sleep(Duration::from_millis(ms as u64));
    }
}

/// Returns immediately, keeping a tally. For dry runs and tests.
#[derive(Debug, Clone, Default)]
pub struct CountingDelay {
    pub total_ms: u64,
    pub holds: Vec<u32>,
}

impl Delay for CountingDelay {
    fn hold_ms(&mut self, ms: u32) {
        self.total_ms += ms as u64;
        self.holds.push(ms);
    }
}
