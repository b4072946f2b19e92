use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, Stream, StreamConfig};
use log::{error, info, trace};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use crate::devices::ToneOutput;

/// Per-voice square-wave amplitude. Two voices together stay under 0.5.
const VOICE_AMP: f32 = 0.2;
const CHANNELS: usize = 2;

/// Buzzer-style square-wave tones on the default audio output.
///
/// Holds the cpal `Stream` alive. Drop this to stop output.
/// The callback reads each channel's frequency from an atomic; 0 = silent.
pub struct AudioTone {
    freqs: Arc<[AtomicU32; CHANNELS]>,
    _stream: Stream,
}

impl AudioTone {
    /// Open the default output device and start the (silent) stream.
    pub fn start() -> Result<Self, String> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| "No default audio output device found".to_string())?;

        info!(
            "Audio output: {}",
            device.name().unwrap_or_else(|_| "unknown".into())
        );

        let supported = device
            .default_output_config()
            .map_err(|e| format!("No supported output config: {e}"))?;
        let format = supported.sample_format();
        let config: StreamConfig = supported.into();
        let sample_rate = config.sample_rate.0 as f32;
        let channels = config.channels as usize;

        info!("Tone config: {}Hz  {} ch  {:?}", sample_rate, channels, format);

        let freqs: Arc<[AtomicU32; CHANNELS]> = Arc::new([AtomicU32::new(0), AtomicU32::new(0)]);
        let err_fn = |e: cpal::StreamError| error!("Audio stream error: {e}");

        let stream = match format {
            SampleFormat::F32 => {
                let mut osc = SquarePair::new(freqs.clone(), sample_rate);
                device
                    .build_output_stream(
                        &config,
                        move |data: &mut [f32], _| {
                            for frame in data.chunks_mut(channels) {
                                let v = osc.next_sample();
                                frame.iter_mut().for_each(|s| *s = v);
                            }
                        },
                        err_fn,
                        None,
                    )
                    .map_err(|e| e.to_string())?
            }
            SampleFormat::I16 => {
                let mut osc = SquarePair::new(freqs.clone(), sample_rate);
                device
                    .build_output_stream(
                        &config,
                        move |data: &mut [i16], _| {
                            for frame in data.chunks_mut(channels) {
                                let v = (osc.next_sample() * i16::MAX as f32) as i16;
                                frame.iter_mut().for_each(|s| *s = v);
                            }
                        },
                        err_fn,
                        None,
                    )
                    .map_err(|e| e.to_string())?
            }
            fmt => {
                return Err(format!(
                    "Unsupported sample format {fmt:?}. Use an F32 or I16 device."
                ))
            }
        };

        stream.play().map_err(|e| e.to_string())?;
        Ok(Self {
            freqs,
            _stream: stream,
        })
    }
}

impl ToneOutput for AudioTone {
    fn play_tone(&mut self, channel: usize, hz: u32) {
        if let Some(f) = self.freqs.get(channel) {
            f.store(hz, Ordering::Relaxed);
            trace!("audio ch{} ← {} Hz", channel, hz);
        }
    }

    fn stop_tone(&mut self, channel: usize) {
        self.play_tone(channel, 0);
    }
}

/// Two phase-continuous square oscillators mixed to mono.
struct SquarePair {
    freqs: Arc<[AtomicU32; CHANNELS]>,
    phase: [f32; CHANNELS],
    sample_rate: f32,
}

impl SquarePair {
    fn new(freqs: Arc<[AtomicU32; CHANNELS]>, sample_rate: f32) -> Self {
        Self {
            freqs,
            phase: [0.0; CHANNELS],
            sample_rate,
        }
    }

    fn next_sample(&mut self) -> f32 {
        let mut out = 0.0;
        for (i, phase) in self.phase.iter_mut().enumerate() {
            let hz = self.freqs[i].load(Ordering::Relaxed);
            if hz == 0 {
                *phase = 0.0;
                continue;
            }
            out += if *phase < 0.5 { VOICE_AMP } else { -VOICE_AMP };
            *phase = (*phase + hz as f32 / self.sample_rate).fract();
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_square_pair_silent_at_zero() {
        let freqs = Arc::new([AtomicU32::new(0), AtomicU32::new(0)]);
        let mut osc = SquarePair::new(freqs, 48000.0);
        assert!((0..480).all(|_| osc.next_sample() == 0.0));
    }

    #[test]
    fn test_square_pair_period() {
        // Power-of-two rate keeps the phase steps exact.
        let freqs = Arc::new([AtomicU32::new(1), AtomicU32::new(0)]);
        let mut osc = SquarePair::new(freqs, 64.0);
        let samples: Vec<f32> = (0..64).map(|_| osc.next_sample()).collect();
        let highs = samples.iter().filter(|&&s| s > 0.0).count();
        assert_eq!(highs, 32, "half of one period is high");
    }
}
