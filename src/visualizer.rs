//! LED strip presentation of the two voices.
//!
//! Purely cosmetic: reads the notes, never feeds anything back. Bass lights
//! strips 0 and 1 with a solid colour that swells in brightness over the
//! note; melody runs a colour-wheel rainbow along strips 2 and 3.

use crate::devices::{LedOutput, Rgb};
use crate::engine::TickNotes;
use crate::types::*;

pub const BASS_STRIPS: [usize; 2] = [0, 1];
pub const MELODY_STRIPS: [usize; 2] = [2, 3];

/// Notes longer than this animate slowly.
pub const LONG_NOTE_MS: u32 = 600;
const SLOW_FRAME_MS: u32 = 100;
const FAST_FRAME_MS: u32 = 10;

/// Split a hold into frame lengths. The lengths always sum to `hold_ms`.
pub fn frame_schedule(hold_ms: u32) -> Vec<u32> {
    let frame = if hold_ms > LONG_NOTE_MS { SLOW_FRAME_MS } else { FAST_FRAME_MS };
    let mut frames = vec![frame; (hold_ms / frame) as usize];
    let rest = hold_ms % frame;
    if rest > 0 {
        frames.push(rest);
    }
    frames
}

/// Bass colour at a given brightness.
/// Low octaves are blue, the middle octave green (gold when short), upper
/// octaves magenta/amber; lower degrees take the darker shade.
pub fn bass_color(note: &Note, level: u8) -> Rgb {
    if note.is_silent() {
        return Rgb::OFF;
    }
    let low = note.pitch_class <= 3;
    match note.octave {
        0 | 1 if low => Rgb(0, 0, level),
        0 | 1 => Rgb(0, level, level),
        2 if low && note.duration_ms > LONG_NOTE_MS => Rgb(0, level, 0),
        2 if low => Rgb(173, level, 47),
        2 => Rgb(0, level, level / 2),
        _ if low => Rgb(level, 0, level),
        _ => Rgb(level, level / 2, 0),
    }
}

/// Classic 0–255 colour wheel: red → green → blue → red.
pub fn wheel(pos: u8) -> Rgb {
    let pos = 255 - pos;
    match pos {
        0..=84 => Rgb(255 - pos * 3, 0, pos * 3),
        85..=169 => {
            let p = pos - 85;
            Rgb(0, p * 3, 255 - p * 3)
        }
        _ => {
            let p = pos - 170;
            Rgb(p * 3, 255 - p * 3, 0)
        }
    }
}

fn scale(c: Rgb, level: u8) -> Rgb {
    let s = |v: u8| ((v as u16 * level as u16) / 255) as u8;
    Rgb(s(c.0), s(c.1), s(c.2))
}

/// Draw frame `step` of `steps` for the current notes and flush every strip.
pub fn render(notes: &TickNotes, step: usize, steps: usize, leds: &mut dyn LedOutput) {
    let steps = steps.max(1);
    let count = leds.strip_count();

    // Bass: brightness ramps up across the hold.
    let level = (((step + 1) * 255) / steps).min(255) as u8;
    let bass_rgb = match notes.bass {
        Some(ref bass) => bass_color(bass, level),
        None => Rgb::OFF,
    };
    for &strip in BASS_STRIPS.iter().filter(|&&s| s < count) {
        leds.fill(strip, bass_rgb);
        leds.show(strip);
    }

    // Melody: rainbow, reversed for low degrees, brighter in higher octaves.
    let melody = notes.melody;
    let speed: usize = if melody.duration_ms > LONG_NOTE_MS { 2 } else { 16 };
    let offset = step * speed;
    let brightness = 64 + melody.octave.min(MAX_OCTAVE) * 38;
    for &strip in MELODY_STRIPS.iter().filter(|&&s| s < count) {
        let len = leds.strip_len(strip);
        for i in 0..len {
            let color = if melody.is_silent() {
                Rgb::OFF
            } else {
                let idx = if melody.pitch_class <= 3 { len - 1 - i } else { i };
                let pos = ((idx * 256 / len.max(1)) + offset) & 255;
                scale(wheel(pos as u8), brightness)
            };
            leds.set_pixel(strip, i, color);
        }
        leds.show(strip);
    }
}

/// Switch every strip off.
pub fn clear(leds: &mut dyn LedOutput) {
    for strip in 0..leds.strip_count() {
        leds.fill(strip, Rgb::OFF);
        leds.show(strip);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Strips {
        px: Vec<Vec<Rgb>>,
        shows: usize,
    }

    impl Strips {
        fn new(lens: &[usize]) -> Self {
            Self {
                px: lens.iter().map(|&n| vec![Rgb(9, 9, 9); n]).collect(),
                shows: 0,
            }
        }
    }

    impl LedOutput for Strips {
        fn strip_count(&self) -> usize {
            self.px.len()
        }
        fn strip_len(&self, strip: usize) -> usize {
            self.px[strip].len()
        }
        fn set_pixel(&mut self, strip: usize, index: usize, color: Rgb) {
            self.px[strip][index] = color;
        }
        fn show(&mut self, _strip: usize) {
            self.shows += 1;
        }
    }

    #[test]
    fn test_schedule_sums_to_hold() {
        for hold in [0, 7, 125, 250, 600, 601, 1000, 1500] {
            let frames = frame_schedule(hold);
            assert_eq!(frames.iter().sum::<u32>(), hold, "hold {hold}");
        }
        assert_eq!(frame_schedule(1000).len(), 10);
        assert_eq!(frame_schedule(125).len(), 13);
    }

    #[test]
    fn test_bass_palette() {
        assert_eq!(bass_color(&Note::new(2, 0, 125), 200), Rgb(0, 0, 200));
        assert_eq!(bass_color(&Note::new(5, 1, 125), 200), Rgb(0, 200, 200));
        assert_eq!(bass_color(&Note::new(1, 2, 1000), 80), Rgb(0, 80, 0));
        assert_eq!(bass_color(&Note::new(1, 2, 250), 80), Rgb(173, 80, 47));
        assert_eq!(bass_color(&Note::new(SILENCE, 2, 250), 80), Rgb::OFF);
    }

    #[test]
    fn test_wheel_primaries() {
        assert_eq!(wheel(0), Rgb(255, 0, 0));
        assert_eq!(wheel(85), Rgb(0, 255, 0));
        assert_eq!(wheel(170), Rgb(0, 0, 255));
    }

    #[test]
    fn test_silence_darkens_all_strips() {
        let mut leds = Strips::new(&[19, 19, 22, 22]);
        let notes = TickNotes {
            melody: Note::new(SILENCE, 3, 125),
            bass: Some(Note::new(SILENCE, 1, 125)),
        };
        render(&notes, 0, 4, &mut leds);
        assert!(leds.px.iter().flatten().all(|&c| c == Rgb::OFF));
        assert_eq!(leds.shows, 4);
    }

    #[test]
    fn test_missing_strips_skipped() {
        let mut leds = Strips::new(&[5]);
        let notes = TickNotes {
            melody: Note::new(4, 3, 125),
            bass: Some(Note::new(0, 0, 125)),
        };
        render(&notes, 3, 4, &mut leds);
        assert_eq!(leds.px[0], vec![Rgb(0, 0, 255); 5]);
    }

    #[test]
    fn test_low_melody_reverses_rainbow() {
        let mut up = Strips::new(&[0, 0, 8, 8]);
        let mut down = Strips::new(&[0, 0, 8, 8]);
        let high = TickNotes { melody: Note::new(5, 5, 125), bass: None };
        let low = TickNotes { melody: Note::new(1, 5, 125), bass: None };
        render(&high, 0, 1, &mut up);
        render(&low, 0, 1, &mut down);
        let mut reversed = down.px[2].clone();
        reversed.reverse();
        assert_eq!(up.px[2], reversed);
    }
}
