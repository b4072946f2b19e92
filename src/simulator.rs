use crate::config::SensorConfig;
use crate::devices::{LedOutput, MotionSensor, Rgb, SensorError, ToneOutput};
use crate::types::*;
use log::{debug, info, trace, warn};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use std::f32::consts::TAU;

const GRAVITY: f32 = 9.81;
/// Per-axis noise added to every reading.
const JITTER: f32 = 0.04;

/// A scripted hand movement, measured in ticks (one tick = one note).
#[derive(Debug, Clone, PartialEq)]
pub enum Gesture {
    /// Instrument resting flat.
    Still { ticks: u32 },
    /// Held at a tilt: steady planar acceleration, little rotation.
    Tilt { acc: f32, ticks: u32 },
    /// Twisting in place.
    Spin { spin: f32, ticks: u32 },
    /// Both at once.
    Shake { acc: f32, spin: f32, ticks: u32 },
    /// Acceleration eases from one level to another under constant spin.
    Sway { from: f32, to: f32, spin: f32, ticks: u32 },
}

impl Gesture {
    fn ticks(&self) -> u32 {
        match *self {
            Gesture::Still { ticks }
            | Gesture::Tilt { ticks, .. }
            | Gesture::Spin { ticks, .. }
            | Gesture::Shake { ticks, .. }
            | Gesture::Sway { ticks, .. } => ticks,
        }
    }

    /// Target (acc, spin) magnitudes at step `i` of this gesture.
    fn target(&self, i: u32) -> (f32, f32) {
        match *self {
            Gesture::Still { .. } => (0.0, 0.0),
            Gesture::Tilt { acc, .. } => (acc, 0.2),
            Gesture::Spin { spin, .. } => (0.2, spin),
            Gesture::Shake { acc, spin, .. } => (acc, spin),
            Gesture::Sway { from, to, spin, ticks } => {
                let t = i as f32 / ticks.max(1) as f32;
                (lerp(from, to, smoothstep(t)), spin)
            }
        }
    }
}

/// Generates plausible IMU readings from a gesture script, so the whole
/// instrument can be exercised without hardware.
pub struct SimulatedMotion {
    clock: SessionClock,
    rng: Pcg32,
    script: Vec<Gesture>,
    cursor: usize,
    step: u32,
    repeat: bool,
    present: bool,
    /// Direction of the planar vectors; drifts slowly so X and Y both move.
    heading: f32,
}

impl SimulatedMotion {
    pub fn new(clock: SessionClock, seed: u64, demo: &str) -> Self {
        let mut rng = Pcg32::seed_from_u64(seed);
        let script = match demo {
            "basic" => demo_sequence(),
            "wander" => wander_sequence(&mut rng, 48),
            other => {
                warn!("Unknown demo {:?}, using \"basic\"", other);
                demo_sequence()
            }
        };
        Self::from_script(clock, rng, script)
    }

    pub fn from_script(clock: SessionClock, rng: Pcg32, script: Vec<Gesture>) -> Self {
        Self {
            clock,
            rng,
            script,
            cursor: 0,
            step: 0,
            repeat: true,
            present: true,
            heading: 0.0,
        }
    }

    /// Play the script once, then report the stream as ended.
    pub fn once(mut self) -> Self {
        self.repeat = false;
        self
    }

    /// Behave like a board with no sensor on the bus.
    pub fn absent(mut self) -> Self {
        self.present = false;
        self
    }

    /// Total ticks in one pass of the script.
    pub fn script_ticks(&self) -> u64 {
        self.script.iter().map(|g| g.ticks() as u64).sum()
    }

    /// Advance to the next (acc, spin) target, or None at the end of a
    /// non-repeating script.
    fn next_target(&mut self) -> Option<(f32, f32)> {
        loop {
            let gesture = self.script.get(self.cursor)?;
            if self.step < gesture.ticks() {
                let target = gesture.target(self.step);
                self.step += 1;
                return Some(target);
            }
            self.cursor += 1;
            self.step = 0;
            if self.cursor < self.script.len() {
                trace!("gesture → {:?}", self.script[self.cursor]);
            } else if self.repeat && self.script_ticks() > 0 {
                debug!("Gesture script looping");
                self.cursor = 0;
            } else {
                return None;
            }
        }
    }

    fn planar(&mut self, magnitude: f32) -> (f32, f32) {
        let m = magnitude.max(0.0);
        (
            m * self.heading.cos() + self.rng.gen_range(-JITTER..=JITTER),
            m * self.heading.sin() + self.rng.gen_range(-JITTER..=JITTER),
        )
    }
}

impl MotionSensor for SimulatedMotion {
    fn init(&mut self, config: &SensorConfig) -> Result<(), SensorError> {
        if !self.present {
            return Err(SensorError::NotDetected("simulated bus is empty".into()));
        }
        info!(
            "Simulated MPU-6050 configured: {:?} / {:?} / {:?}",
            config.accel_range, config.gyro_range, config.filter_bandwidth
        );
        Ok(())
    }

    fn read_motion(&mut self) -> Result<MotionSample, SensorError> {
        if !self.present {
            return Err(SensorError::NotDetected("simulated bus is empty".into()));
        }
        let (acc, spin) = self.next_target().ok_or(SensorError::Disconnected)?;
        self.heading = (self.heading + self.rng.gen_range(0.0..0.4)) % TAU;

        let (ax, ay) = self.planar(acc);
        let (gx, gy) = self.planar(spin);
        let az = GRAVITY + self.rng.gen_range(-JITTER..=JITTER);
        let gz = self.rng.gen_range(-JITTER..=JITTER);

        Ok(MotionSample {
            timestamp_us: self.clock.now_us(),
            accel: Vec3::new(ax, ay, az),
            gyro: Vec3::new(gx, gy, gz),
            temperature_c: 24.0 + self.rng.gen_range(-0.2..=0.2),
        })
    }
}

// ─── Demo scripts ───────────────────────────────────────────────────────────

/// A short piece touching every regime: rest, slow sway (long notes),
/// steady tilt (medium notes, falling octaves), spinning climbs and a shake.
fn demo_sequence() -> Vec<Gesture> {
    vec![
        Gesture::Still { ticks: 4 },
        Gesture::Sway { from: 0.55, to: 0.7, spin: 3.5, ticks: 4 },
        Gesture::Tilt { acc: 1.5, ticks: 6 },
        Gesture::Shake { acc: 1.2, spin: 5.5, ticks: 8 },
        Gesture::Spin { spin: 2.0, ticks: 4 },
        Gesture::Shake { acc: 4.5, spin: 6.0, ticks: 12 },
        Gesture::Sway { from: 4.0, to: 0.8, spin: 3.5, ticks: 8 },
        Gesture::Shake { acc: 2.0, spin: 1.0, ticks: 8 },
        Gesture::Still { ticks: 4 },
    ]
}

/// Algorithmic wandering: random gestures with random lengths.
fn wander_sequence(rng: &mut Pcg32, len: usize) -> Vec<Gesture> {
    (0..len)
        .map(|_| {
            let ticks = rng.gen_range(2..=10);
            match rng.gen_range(0..5) {
                0 => Gesture::Still { ticks },
                1 => Gesture::Tilt { acc: rng.gen_range(0.5..4.0), ticks },
                2 => Gesture::Spin { spin: rng.gen_range(0.5..7.0), ticks },
                3 => Gesture::Shake {
                    acc: rng.gen_range(0.5..6.0),
                    spin: rng.gen_range(0.5..7.0),
                    ticks,
                },
                _ => Gesture::Sway {
                    from: rng.gen_range(0.5..5.0),
                    to: rng.gen_range(0.5..5.0),
                    spin: rng.gen_range(0.5..7.0),
                    ticks,
                },
            }
        })
        .collect()
}

// ─── Output stand-ins ───────────────────────────────────────────────────────

/// Tone device that logs instead of sounding.
#[derive(Debug, Default)]
pub struct LogTone {
    current: [u32; 2],
}

impl LogTone {
    pub fn current(&self) -> [u32; 2] {
        self.current
    }
}

impl ToneOutput for LogTone {
    fn play_tone(&mut self, channel: usize, hz: u32) {
        if let Some(slot) = self.current.get_mut(channel) {
            *slot = hz;
        }
        debug!("♪ ch{} {} Hz", channel, hz);
    }

    fn stop_tone(&mut self, channel: usize) {
        if let Some(slot) = self.current.get_mut(channel) {
            *slot = 0;
        }
    }
}

/// In-memory LED strips.
#[derive(Debug)]
pub struct SimulatedLeds {
    strips: Vec<Vec<Rgb>>,
}

impl SimulatedLeds {
    pub fn new(lengths: &[usize]) -> Self {
        Self {
            strips: lengths.iter().map(|&n| vec![Rgb::OFF; n]).collect(),
        }
    }

    pub fn pixels(&self, strip: usize) -> &[Rgb] {
        &self.strips[strip]
    }
}

impl LedOutput for SimulatedLeds {
    fn strip_count(&self) -> usize {
        self.strips.len()
    }

    fn strip_len(&self, strip: usize) -> usize {
        self.strips.get(strip).map_or(0, Vec::len)
    }

    fn set_pixel(&mut self, strip: usize, index: usize, color: Rgb) {
        if let Some(px) = self.strips.get_mut(strip).and_then(|s| s.get_mut(index)) {
            *px = color;
        }
    }

    fn show(&mut self, strip: usize) {
        if let Some(first) = self.strips.get(strip).and_then(|s| s.first()) {
            trace!("strip {} show, px0={:?}", strip, first);
        }
    }
}

// ─── Math helpers ───────────────────────────────────────────────────────────

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Smooth interpolation (ease in/out)
fn smoothstep(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sim(script: Vec<Gesture>) -> SimulatedMotion {
        SimulatedMotion::from_script(SessionClock::new(), Pcg32::seed_from_u64(1), script)
    }

    #[test]
    fn test_once_ends_after_script() {
        let mut s = sim(vec![Gesture::Still { ticks: 2 }, Gesture::Tilt { acc: 1.0, ticks: 3 }]).once();
        for _ in 0..5 {
            s.read_motion().unwrap();
        }
        assert!(matches!(s.read_motion(), Err(SensorError::Disconnected)));
    }

    #[test]
    fn test_repeating_script_loops() {
        let mut s = sim(vec![Gesture::Still { ticks: 1 }]);
        for _ in 0..10 {
            s.read_motion().unwrap();
        }
    }

    #[test]
    fn test_magnitudes_track_gesture() {
        let mut s = sim(vec![Gesture::Shake { acc: 4.0, spin: 5.0, ticks: 20 }]).once();
        for _ in 0..20 {
            let f = MotionFeatures::from_sample(&s.read_motion().unwrap());
            assert!((f.total_acc - 4.0).abs() < 0.1, "acc {}", f.total_acc);
            assert!((f.total_spin - 5.0).abs() < 0.1, "spin {}", f.total_spin);
        }
    }

    #[test]
    fn test_still_reads_below_silence_threshold() {
        let mut s = sim(vec![Gesture::Still { ticks: 20 }]).once();
        for _ in 0..20 {
            let f = MotionFeatures::from_sample(&s.read_motion().unwrap());
            assert!(f.total_acc < 0.5 && f.total_spin < 0.5);
        }
    }

    #[test]
    fn test_absent_fails_init() {
        let mut s = sim(demo_sequence()).absent();
        assert!(matches!(
            s.init(&SensorConfig::default()),
            Err(SensorError::NotDetected(_))
        ));
    }

    #[test]
    fn test_demos_are_nonempty() {
        let basic = SimulatedMotion::new(SessionClock::new(), 0, "basic");
        assert_eq!(basic.script_ticks(), 58);
        let wander = SimulatedMotion::new(SessionClock::new(), 0, "wander");
        assert!(wander.script_ticks() >= 96);
    }

    #[test]
    fn test_simulated_leds_ignore_out_of_range() {
        let mut leds = SimulatedLeds::new(&[3, 2]);
        leds.fill(0, Rgb(1, 2, 3));
        leds.set_pixel(1, 5, Rgb(9, 9, 9));
        leds.set_pixel(4, 0, Rgb(9, 9, 9));
        assert_eq!(leds.pixels(0), &[Rgb(1, 2, 3); 3]);
        assert_eq!(leds.pixels(1), &[Rgb::OFF; 2]);
        assert_eq!(leds.strip_len(4), 0);
    }

    #[test]
    fn test_log_tone_tracks_channels() {
        let mut t = LogTone::default();
        t.play_tone(0, 440);
        t.play_tone(1, 0);
        t.play_tone(7, 100);
        assert_eq!(t.current(), [440, 0]);
        t.stop_tone(0);
        assert_eq!(t.current(), [0, 0]);
    }
}
