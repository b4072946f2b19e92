use crate::devices::ToneOutput;
use crate::engine::TickNotes;
use crate::scale::ScaleTable;
use crate::types::*;
use log::trace;

/// What was sent to the tone pins for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sounding {
    pub melody_hz: u32,
    pub bass_hz: Option<u32>,
    /// A note index was out of range and had to be clamped before lookup.
    pub clamped: bool,
}

/// Turns notes into tone commands.
pub struct PlaybackDriver {
    scale: ScaleTable,
}

impl PlaybackDriver {
    pub fn new(scale: ScaleTable) -> Self {
        Self { scale }
    }

    /// Start every voice present in `notes`. Silence is sent as 0 Hz.
    pub fn start(&self, notes: &TickNotes, tone: &mut dyn ToneOutput) -> Sounding {
        let melody = self.scale.note_frequency(&notes.melody);
        tone.play_tone(Voice::Melody.channel(), melody.hz);
        trace!("tone ch{} ← {} Hz", Voice::Melody.channel(), melody.hz);

        let mut clamped = melody.clamped;
        let bass_hz = notes.bass.map(|bass| {
            let lookup = self.scale.note_frequency(&bass);
            tone.play_tone(Voice::Bass.channel(), lookup.hz);
            trace!("tone ch{} ← {} Hz", Voice::Bass.channel(), lookup.hz);
            clamped |= lookup.clamped;
            lookup.hz
        });

        Sounding {
            melody_hz: melody.hz,
            bass_hz,
            clamped,
        }
    }

    /// Silence the channels `start` used.
    pub fn stop(&self, notes: &TickNotes, tone: &mut dyn ToneOutput) {
        tone.stop_tone(Voice::Melody.channel());
        if notes.bass.is_some() {
            tone.stop_tone(Voice::Bass.channel());
        }
    }

    /// The melody gates how long both voices sound; the bass duration is
    /// reported but does not shorten or extend the hold.
    pub fn hold_ms(notes: &TickNotes) -> u32 {
        notes.melody.duration_ms
    }
}

impl Default for PlaybackDriver {
    fn default() -> Self {
        Self::new(ScaleTable::b_flat_major())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Calls(Vec<(&'static str, usize, u32)>);

    impl ToneOutput for Calls {
        fn play_tone(&mut self, channel: usize, hz: u32) {
            self.0.push(("play", channel, hz));
        }
        fn stop_tone(&mut self, channel: usize) {
            self.0.push(("stop", channel, 0));
        }
    }

    #[test]
    fn test_duet_plays_both_channels() {
        let driver = PlaybackDriver::default();
        let notes = TickNotes {
            melody: Note::new(6, 3, 250),
            bass: Some(Note::new(1, 1, 500)),
        };
        let mut calls = Calls::default();
        let s = driver.start(&notes, &mut calls);
        assert_eq!(s, Sounding { melody_hz: 440, bass_hz: Some(65), clamped: false });
        driver.stop(&notes, &mut calls);
        assert_eq!(
            calls.0,
            vec![("play", 0, 440), ("play", 1, 65), ("stop", 0, 0), ("stop", 1, 0)]
        );
        assert_eq!(PlaybackDriver::hold_ms(&notes), 250);
    }

    #[test]
    fn test_silence_sent_as_zero() {
        let driver = PlaybackDriver::default();
        let notes = TickNotes {
            melody: Note::new(SILENCE, 2, 125),
            bass: Some(Note::new(SILENCE, 4, 125)),
        };
        let mut calls = Calls::default();
        let s = driver.start(&notes, &mut calls);
        assert_eq!(s.melody_hz, 0);
        assert_eq!(s.bass_hz, Some(0));
    }

    #[test]
    fn test_solo_leaves_bass_channel_alone() {
        let driver = PlaybackDriver::default();
        let notes = TickNotes {
            melody: Note::new(0, 4, 125),
            bass: None,
        };
        let mut calls = Calls::default();
        driver.start(&notes, &mut calls);
        driver.stop(&notes, &mut calls);
        assert!(calls.0.iter().all(|&(_, ch, _)| ch == 0));
    }

    #[test]
    fn test_bad_note_clamped_not_panicking() {
        let driver = PlaybackDriver::default();
        let notes = TickNotes {
            melody: Note::new(9, 8, 125),
            bass: None,
        };
        let mut calls = Calls::default();
        let s = driver.start(&notes, &mut calls);
        assert!(s.clamped);
        assert_eq!(s.melody_hz, 0);
    }
}
