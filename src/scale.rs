use crate::config::ConfigError;
use crate::types::*;
use log::warn;
use rand::Rng;
use std::ops::Range;

// ─── Scale table ────────────────────────────────────────────────────────────

/// Frequency grid indexed by (octave, degree). Degree 7 is silence (0 Hz).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScaleTable {
    rows: [[u32; DEGREES]; OCTAVES],
}

/// Result of a scale lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lookup {
    pub hz: u32,
    /// The requested index was out of range and had to be pulled in.
    pub clamped: bool,
}

impl ScaleTable {
    /// Bb major over six octaves, degree order Bb C D Eb F G A.
    /// Values are the integer tone-pin pitch constants.
    pub fn b_flat_major() -> Self {
        Self {
            rows: [
                [58, 33, 37, 39, 44, 49, 55, 0],
                [117, 65, 73, 78, 87, 98, 110, 0],
                [233, 131, 147, 156, 175, 196, 220, 0],
                [466, 262, 294, 311, 349, 392, 440, 0],
                [932, 523, 587, 622, 698, 784, 880, 0],
                [1865, 1047, 1175, 1245, 1397, 1568, 1760, 0],
            ],
        }
    }

    /// Look up a frequency. Indices outside the table are clamped and logged,
    /// never used raw.
    pub fn frequency(&self, octave: u8, pitch_class: u8) -> Lookup {
        let o = octave.min(MAX_OCTAVE);
        let p = pitch_class.min(SILENCE);
        let clamped = o != octave || p != pitch_class;
        if clamped {
            warn!(
                "Scale lookup out of range: octave {} degree {} → clamped to {}/{}",
                octave, pitch_class, o, p
            );
        }
        Lookup {
            hz: self.rows[o as usize][p as usize],
            clamped,
        }
    }

    pub fn note_frequency(&self, note: &Note) -> Lookup {
        self.frequency(note.octave, note.pitch_class)
    }
}

impl Default for ScaleTable {
    fn default() -> Self {
        Self::b_flat_major()
    }
}

// ─── Harmonic table ─────────────────────────────────────────────────────────

/// For each melody degree, the three bass degrees allowed against it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarmonicTable {
    rows: [[u8; 3]; DEGREES],
}

impl HarmonicTable {
    /// Diatonic third/fifth/seventh above each degree; silence maps to silence.
    pub fn standard() -> Self {
        Self {
            rows: [
                [2, 4, 6],
                [3, 5, 0],
                [4, 6, 1],
                [5, 0, 2],
                [6, 1, 3],
                [0, 2, 4],
                [1, 3, 5],
                [SILENCE, SILENCE, SILENCE],
            ],
        }
    }

    /// Candidates for a melody degree. Out-of-range degrees are treated as silence.
    pub fn choices(&self, melody_degree: u8) -> &[u8; 3] {
        if melody_degree > SILENCE {
            warn!("Harmonic lookup for degree {} clamped to silence", melody_degree);
        }
        &self.rows[melody_degree.min(SILENCE) as usize]
    }
}

impl Default for HarmonicTable {
    fn default() -> Self {
        Self::standard()
    }
}

// ─── Duration table ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurationBucket {
    Short,
    Medium,
    Long,
}

impl DurationBucket {
    fn name(self) -> &'static str {
        match self {
            DurationBucket::Short => "short",
            DurationBucket::Medium => "medium",
            DurationBucket::Long => "long",
        }
    }
}

/// Ordered candidate durations, split into three buckets by position:
/// short = first half, medium = up to 90 %, long = the slot(s) from 90 %
/// to 95 %. Everything past the long bucket is never drawn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DurationTable {
    values: Vec<u32>,
    short_end: usize,
    medium_end: usize,
    long_end: usize,
}

impl DurationTable {
    pub fn new(values: Vec<u32>) -> Result<Self, ConfigError> {
        let len = values.len();
        let short_end = len / 2;
        let medium_end = len * 9 / 10;
        let long_end = (len * 19 / 20).max(medium_end + 1);

        let empty = if short_end == 0 {
            Some(DurationBucket::Short)
        } else if medium_end <= short_end {
            Some(DurationBucket::Medium)
        } else if long_end > len {
            Some(DurationBucket::Long)
        } else {
            None
        };
        if let Some(bucket) = empty {
            return Err(ConfigError::EmptyBucket {
                len,
                bucket: bucket.name(),
            });
        }

        Ok(Self {
            values,
            short_end,
            medium_end,
            long_end,
        })
    }

    /// The 20-entry table used with two voices.
    pub fn standard() -> Self {
        Self {
            values: vec![
                125, 125, 125, 125, 125, 125, 125, 125, 250, 250, 250, 250, 500, 500, 500, 500,
                1000, 1000, 1000, 1500,
            ],
            short_end: 10,
            medium_end: 18,
            long_end: 19,
        }
    }

    /// The 10-entry table used by the single-voice instrument.
    pub fn compact() -> Self {
        Self {
            values: vec![125, 125, 125, 125, 125, 250, 250, 500, 500, 1000],
            short_end: 5,
            medium_end: 9,
            long_end: 10,
        }
    }

    pub fn values(&self) -> &[u32] {
        &self.values
    }

    /// Index range a bucket draws from.
    pub fn bucket(&self, bucket: DurationBucket) -> Range<usize> {
        match bucket {
            DurationBucket::Short => 0..self.short_end,
            DurationBucket::Medium => self.short_end..self.medium_end,
            DurationBucket::Long => self.medium_end..self.long_end,
        }
    }

    /// Values a bucket can produce.
    pub fn bucket_values(&self, bucket: DurationBucket) -> &[u32] {
        &self.values[self.bucket(bucket)]
    }

    /// Uniform draw from one bucket. Consumes one random number.
    pub fn draw<R: Rng + ?Sized>(&self, bucket: DurationBucket, rng: &mut R) -> u32 {
        self.values[rng.gen_range(self.bucket(bucket))]
    }
}

impl Default for DurationTable {
    fn default() -> Self {
        Self::standard()
    }
}
