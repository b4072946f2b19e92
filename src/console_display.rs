use crate::types::*;
use crossbeam_channel::Receiver;
use std::io::{self, Write};

/// Renders a live ASCII dashboard of the instrument state.
pub struct ConsoleDisplay {
    rx: Receiver<TickFrame>,
    /// Redraw on every Nth tick
    every: u64,
}

impl ConsoleDisplay {
    pub fn new(rx: Receiver<TickFrame>, every: u64) -> Self {
        Self { rx, every: every.max(1) }
    }

    pub fn run(&self) {
        let mut stdout = io::stdout();

        for frame in self.rx.iter() {
            if frame.tick % self.every != 0 {
                continue;
            }
            // Clear screen and move cursor home
            print!("\x1b[2J\x1b[H");
            for line in render(&frame) {
                println!("{}", line);
            }
            let _ = stdout.flush();
        }
    }
}

/// Dashboard lines for one frame.
pub fn render(frame: &TickFrame) -> Vec<String> {
    let mut out = Vec::new();
    let secs = frame.sample.timestamp_us as f64 / 1_000_000.0;

    out.push("╔══════════════════════════════════════════════════════════╗".into());
    out.push("║  MOTION TONE — Live Monitor                              ║".into());
    out.push("╠══════════════════════════════════════════════════════════╣".into());
    out.push(format!("║  Tick {:<8} Time: {:>8.2}s                           ║", frame.tick, secs));
    out.push(format!("║{:58}║", ""));
    out.push(format!(
        "║  Tilt: {} {:>5.2} m/s²        ║",
        make_bar(frame.features.total_acc / 6.0, 30),
        frame.features.total_acc
    ));
    out.push(format!(
        "║  Spin: {} {:>5.2} rad/s       ║",
        make_bar(frame.features.total_spin / 8.0, 30),
        frame.features.total_spin
    ));
    out.push(format!("║  Temp: {:>5.1} °C{:42}║", frame.sample.temperature_c, ""));
    out.push(format!("║{:58}║", ""));
    out.push(voice_line("Melody", &frame.melody, frame.melody_hz));
    match (frame.bass, frame.bass_hz) {
        (Some(bass), Some(hz)) => out.push(voice_line("Bass", &bass, hz)),
        _ => out.push(format!("║    {:>6}: (solo){:42}║", "Bass", "")),
    }
    out.push(format!("║  Hold: {:>5} ms{}{:36}║", frame.hold_ms, if frame.clamped { " !clamp" } else { "       " }, ""));
    out.push("╚══════════════════════════════════════════════════════════╝".into());
    out
}

fn voice_line(name: &str, note: &Note, hz: u32) -> String {
    format!(
        "║    {:>6}: {:>4}  {:>5} Hz  {:>5} ms  {}{:13}║",
        name,
        note_name(note),
        hz,
        note.duration_ms,
        make_bar(note.octave as f32 / MAX_OCTAVE as f32, 10),
        ""
    )
}

/// "Eb4"-style name; octave rows start at 1. Silence is "---".
pub fn note_name(note: &Note) -> String {
    if note.is_silent() {
        return "---".to_string();
    }
    format!("{}{}", DEGREE_NAMES[note.pitch_class as usize], note.octave + 1)
}

fn make_bar(val: f32, width: usize) -> String {
    let filled = ((val.clamp(0.0, 1.0)) * width as f32).round() as usize;
    let empty = width.saturating_sub(filled);
    format!("[{}{}]", "█".repeat(filled), "░".repeat(empty))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(bass: Option<Note>) -> TickFrame {
        TickFrame {
            tick: 12,
            sample: MotionSample::at_rest(1_500_000),
            features: MotionFeatures::new(1.5, 4.5),
            melody: Note::new(3, 3, 250),
            bass,
            melody_hz: 311,
            bass_hz: bass.map(|_| 78),
            hold_ms: 250,
            clamped: false,
        }
    }

    #[test]
    fn test_note_names() {
        assert_eq!(note_name(&Note::new(0, 3, 0)), "Bb4");
        assert_eq!(note_name(&Note::new(6, 0, 0)), "A1");
        assert_eq!(note_name(&Note::new(SILENCE, 0, 0)), "---");
    }

    #[test]
    fn test_render_duet() {
        let lines = render(&frame(Some(Note::new(3, 1, 500))));
        let text = lines.join("\n");
        assert!(text.contains("Eb4"));
        assert!(text.contains("Eb2"));
        assert!(text.contains("311 Hz"));
    }

    #[test]
    fn test_render_solo() {
        let text = render(&frame(None)).join("\n");
        assert!(text.contains("(solo)"));
    }

    #[test]
    fn test_bar_saturates() {
        assert_eq!(make_bar(2.0, 4), "[████]");
        assert_eq!(make_bar(-1.0, 4), "[░░░░]");
    }
}
