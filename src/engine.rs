use crate::generator::{next_bass, next_melody};
use crate::scale::{DurationTable, HarmonicTable, ScaleTable};
use crate::types::*;
use log::trace;
use rand::SeedableRng;
use rand_pcg::Pcg32;

/// Notes produced by one engine step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickNotes {
    pub melody: Note,
    /// None in solo mode
    pub bass: Option<Note>,
}

/// Owns both voices' note state and the random source.
///
/// Each voice has exactly one writer (its generator, called from `step`) and
/// the melody is always updated before the bass reads it. Nothing outside
/// the engine can mutate either note.
pub struct MotionMusicEngine {
    mode: VoiceMode,
    melody: Note,
    bass: Note,
    scale: ScaleTable,
    harmonics: HarmonicTable,
    durations: DurationTable,
    rng: Pcg32,
}

impl MotionMusicEngine {
    /// Start-up melody sits mid-range; bass starts at the bottom.
    pub const MELODY_START: Note = Note::new(0, 3, 0);
    pub const BASS_START: Note = Note::new(0, 0, 0);

    pub fn new(mode: VoiceMode, durations: DurationTable, seed: u64) -> Self {
        Self {
            mode,
            melody: Self::MELODY_START,
            bass: Self::BASS_START,
            scale: ScaleTable::b_flat_major(),
            harmonics: HarmonicTable::standard(),
            durations,
            rng: Pcg32::seed_from_u64(seed),
        }
    }

    /// Two voices with the standard duration table.
    pub fn duet(seed: u64) -> Self {
        Self::new(VoiceMode::Duet, DurationTable::standard(), seed)
    }

    /// Melody only with the compact duration table.
    pub fn solo(seed: u64) -> Self {
        Self::new(VoiceMode::Solo, DurationTable::compact(), seed)
    }

    /// Advance both voices by one tick.
    pub fn step(&mut self, features: MotionFeatures) -> TickNotes {
        self.melody = next_melody(self.melody, features, &self.durations, &mut self.rng);

        let bass = match self.mode {
            VoiceMode::Duet => {
                self.bass = next_bass(
                    self.bass,
                    self.melody.pitch_class,
                    features,
                    &self.harmonics,
                    &self.durations,
                    &mut self.rng,
                );
                Some(self.bass)
            }
            VoiceMode::Solo => None,
        };

        trace!("step {:?} → melody {:?} bass {:?}", features, self.melody, bass);
        TickNotes {
            melody: self.melody,
            bass,
        }
    }

    pub fn mode(&self) -> VoiceMode {
        self.mode
    }

    pub fn melody(&self) -> Note {
        self.melody
    }

    /// Last generated bass note (start-up value in solo mode).
    pub fn bass(&self) -> Note {
        self.bass
    }

    pub fn scale(&self) -> &ScaleTable {
        &self.scale
    }

    pub fn harmonics(&self) -> &HarmonicTable {
        &self.harmonics
    }

    pub fn durations(&self) -> &DurationTable {
        &self.durations
    }
}
