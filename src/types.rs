use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;

// ─── Sensor data from the IMU ───────────────────────────────────────────────

/// A three-axis reading.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Magnitude in the X/Y plane. Z is ignored.
    pub fn planar_magnitude(&self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }
}

/// One poll of the accelerometer/gyroscope.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MotionSample {
    /// Microseconds since session start
    pub timestamp_us: u64,
    /// Acceleration in m/s²
    pub accel: Vec3,
    /// Angular velocity in rad/s
    pub gyro: Vec3,
    /// Die temperature in °C
    pub temperature_c: f32,
}

impl MotionSample {
    pub fn at_rest(timestamp_us: u64) -> Self {
        Self {
            timestamp_us,
            accel: Vec3::new(0.0, 0.0, 9.81),
            gyro: Vec3::default(),
            temperature_c: 25.0,
        }
    }
}

impl fmt::Display for MotionSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "t={:>10}µs  A[{:.2} {:.2} {:.2}]  G[{:.2} {:.2} {:.2}]  T={:.1}",
            self.timestamp_us,
            self.accel.x, self.accel.y, self.accel.z,
            self.gyro.x, self.gyro.y, self.gyro.z,
            self.temperature_c,
        )
    }
}

/// The two scalars the note generators consume.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MotionFeatures {
    /// Horizontal acceleration magnitude
    pub total_acc: f32,
    /// Horizontal angular-velocity magnitude
    pub total_spin: f32,
}

impl MotionFeatures {
    pub const fn new(total_acc: f32, total_spin: f32) -> Self {
        Self { total_acc, total_spin }
    }
}

// ─── Musical state ──────────────────────────────────────────────────────────

/// Scale degree reserved for silence.
pub const SILENCE: u8 = 7;
/// Highest playable scale degree.
pub const MAX_DEGREE: u8 = 6;
/// Highest octave row in the scale table.
pub const MAX_OCTAVE: u8 = 5;
/// Number of octave rows in the scale table.
pub const OCTAVES: usize = 6;
/// Seven degrees plus silence.
pub const DEGREES: usize = 8;

/// One voice's current note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    /// 0–6 scale degree, 7 = silence
    pub pitch_class: u8,
    /// 0–5 octave row
    pub octave: u8,
    pub duration_ms: u32,
}

impl Note {
    pub const fn new(pitch_class: u8, octave: u8, duration_ms: u32) -> Self {
        Self { pitch_class, octave, duration_ms }
    }

    pub fn is_silent(&self) -> bool {
        self.pitch_class >= SILENCE
    }
}

/// A musical line with its own note state and tone channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Voice {
    Melody,
    Bass,
}

impl Voice {
    /// Tone output channel carrying this voice.
    pub fn channel(self) -> usize {
        match self {
            Voice::Melody => 0,
            Voice::Bass => 1,
        }
    }
}

impl fmt::Display for Voice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Voice::Melody => write!(f, "melody"),
            Voice::Bass => write!(f, "bass"),
        }
    }
}

/// Whether the bass line is generated alongside the melody.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum VoiceMode {
    /// Melody only; the bass channel stays silent.
    Solo,
    /// Melody plus a harmonically coupled bass.
    #[default]
    Duet,
}

// ─── Unified tick frame ─────────────────────────────────────────────────────

/// Complete record of one tick.
/// Produced by the coordinator, consumed by the console display and logger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickFrame {
    pub tick: u64,
    pub sample: MotionSample,
    pub features: MotionFeatures,
    pub melody: Note,
    /// None in solo mode
    pub bass: Option<Note>,
    pub melody_hz: u32,
    pub bass_hz: Option<u32>,
    /// How long the tones were held; governed by the melody duration.
    pub hold_ms: u32,
    /// True if any table lookup had to clamp an out-of-range index.
    pub clamped: bool,
}

impl fmt::Display for TickFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bass = match self.bass {
            Some(n) => format!("{}/{} {}ms", n.octave, n.pitch_class, n.duration_ms),
            None => "---".to_string(),
        };
        write!(
            f,
            "#{:<6} acc={:.2} spin={:.2}  mel={}/{} {:>4}Hz {}ms  bass={}",
            self.tick,
            self.features.total_acc,
            self.features.total_spin,
            self.melody.octave,
            self.melody.pitch_class,
            self.melody_hz,
            self.melody.duration_ms,
            bass,
        )
    }
}

// ─── Session clock ──────────────────────────────────────────────────────────

/// Monotonic clock for the playing session.
#[derive(Clone)]
pub struct SessionClock {
    start: Instant,
}

impl SessionClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn now_us(&self) -> u64 {
        self.start.elapsed().as_micros() as u64
    }
}

impl Default for SessionClock {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Constants ──────────────────────────────────────────────────────────────

/// Degree names of the Bb major scale, silence last.
pub const DEGREE_NAMES: [&str; DEGREES] = ["Bb", "C", "D", "Eb", "F", "G", "A", "--"];
