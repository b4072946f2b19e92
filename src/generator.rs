//! Gesture → note rules for both voices.
//!
//! All randomness comes in through the `rng` argument so a seeded generator
//! reproduces a performance exactly.

use crate::scale::{DurationBucket, DurationTable, HarmonicTable};
use crate::types::*;
use rand::Rng;

/// Below this on either axis the instrument is treated as resting.
pub const STILL_THRESHOLD: f32 = 0.5;
/// Upper edge of the slow-gesture band that earns long notes.
pub const SLOW_ACC: f32 = 0.75;
/// Octave direction pivot (and top of the medium-duration band).
pub const PIVOT: f32 = 3.0;
/// Spin above this raises the melody degree.
pub const SPIN_RISE: f32 = 4.0;
/// Largest single-tick degree jump.
pub const MAX_DEGREE_STEP: i32 = 5;

/// Which duration bucket an acceleration magnitude falls into.
/// Both very still and very energetic motion give short notes.
pub fn duration_bucket(total_acc: f32) -> DurationBucket {
    if total_acc > STILL_THRESHOLD && total_acc < SLOW_ACC {
        DurationBucket::Long
    } else if total_acc > SLOW_ACC && total_acc < PIVOT {
        DurationBucket::Medium
    } else {
        DurationBucket::Short
    }
}

pub fn select_duration<R: Rng + ?Sized>(total_acc: f32, table: &DurationTable, rng: &mut R) -> u32 {
    table.draw(duration_bucket(total_acc), rng)
}

/// Next melody note from the previous one.
pub fn next_melody<R: Rng + ?Sized>(
    prev: Note,
    features: MotionFeatures,
    durations: &DurationTable,
    rng: &mut R,
) -> Note {
    let MotionFeatures { total_acc, total_spin } = features;

    let mut octave = prev.octave as i32;
    if total_acc < PIVOT {
        octave -= 1;
    } else {
        octave += 1;
    }
    if octave < 0 {
        octave = MAX_OCTAVE as i32;
    }
    // Overflow re-enters mid-range rather than at the bottom.
    if octave > MAX_OCTAVE as i32 {
        octave = 2;
    }

    // Spin in [PIVOT, SPIN_RISE] holds the degree.
    let mut pitch = prev.pitch_class as i32;
    if total_spin < PIVOT {
        pitch -= rng.gen_range(0..=MAX_DEGREE_STEP);
    } else if total_spin > SPIN_RISE {
        pitch += rng.gen_range(0..=MAX_DEGREE_STEP);
    }

    if pitch < 0 {
        pitch = pitch.abs();
    }
    // Repeated subtraction, not modulo: it folds toward the upper-middle degrees.
    while pitch > MAX_DEGREE as i32 {
        pitch -= 3;
    }

    if total_acc < STILL_THRESHOLD || total_spin < STILL_THRESHOLD {
        pitch = SILENCE as i32;
    }

    Note {
        pitch_class: pitch as u8,
        octave: octave as u8,
        duration_ms: select_duration(total_acc, durations, rng),
    }
}

/// Next bass note. Must run after the melody for the same tick: the degree is
/// drawn fresh from the harmonics of `melody_degree`, never from `prev`.
pub fn next_bass<R: Rng + ?Sized>(
    prev: Note,
    melody_degree: u8,
    features: MotionFeatures,
    harmonics: &HarmonicTable,
    durations: &DurationTable,
    rng: &mut R,
) -> Note {
    let mut octave = prev.octave as i32;
    if features.total_spin < PIVOT {
        octave -= 1;
    } else {
        octave += 1;
    }
    if octave < 0 {
        octave = 2;
    }
    if octave > MAX_OCTAVE as i32 {
        octave = 0;
    }

    let choices = harmonics.choices(melody_degree);
    let pitch_class = choices[rng.gen_range(0..choices.len())];

    Note {
        pitch_class,
        octave: octave as u8,
        duration_ms: select_duration(features.total_acc, durations, rng),
    }
}
