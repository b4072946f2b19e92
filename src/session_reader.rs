//! JSONL session reader: parses recorded sessions back into TickFrames,
//! and replays their motion through the instrument.
//!
//! Works with any `BufRead`: files, in-memory buffers, stdin.

use crate::config::SensorConfig;
use crate::data_logger::SESSION_FORMAT;
use crate::devices::{MotionSensor, SensorError};
use crate::types::{MotionSample, TickFrame, VoiceMode};
use log::info;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Parsed JSONL header (first line of a session file).
#[derive(Debug)]
pub struct SessionHeader {
    pub format: String,
    pub version: String,
    pub mode: Option<VoiceMode>,
}

/// Line-by-line JSONL session reader.
pub struct SessionReader<R: BufRead> {
    reader: R,
    pub header: SessionHeader,
    line_buf: String,
}

impl SessionReader<BufReader<File>> {
    pub fn open_path(path: &Path) -> Result<Self, String> {
        let file = File::open(path).map_err(|e| format!("open {:?}: {}", path, e))?;
        Self::open(BufReader::new(file))
    }
}

impl<R: BufRead> SessionReader<R> {
    /// Read and validate the header line. Returns an error if the header
    /// is missing, unparseable, or lacks a `"format": "motion-tone"` field.
    pub fn open(mut reader: R) -> Result<Self, String> {
        let mut first_line = String::new();
        reader
            .read_line(&mut first_line)
            .map_err(|e| format!("read header: {}", e))?;

        let first_line = first_line.trim();
        if first_line.is_empty() {
            return Err("empty file".into());
        }

        let raw: serde_json::Value =
            serde_json::from_str(first_line).map_err(|e| format!("parse header: {}", e))?;

        let format = raw["format"]
            .as_str()
            .ok_or("missing \"format\" field")?
            .to_string();
        if format != SESSION_FORMAT {
            return Err(format!("unknown format: {}", format));
        }

        let version = raw["version"].as_str().unwrap_or("").to_string();
        let mode = serde_json::from_value(raw["mode"].clone()).ok();

        Ok(Self {
            reader,
            header: SessionHeader {
                format,
                version,
                mode,
            },
            line_buf: String::new(),
        })
    }

    /// Read the next frame. Returns `None` at EOF, `Err` for unparseable lines.
    pub fn next_frame(&mut self) -> Option<Result<TickFrame, String>> {
        loop {
            self.line_buf.clear();
            match self.reader.read_line(&mut self.line_buf) {
                Ok(0) => return None,
                Ok(_) => {
                    let trimmed = self.line_buf.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    return Some(
                        serde_json::from_str::<TickFrame>(trimmed)
                            .map_err(|e| format!("parse frame: {}", e)),
                    );
                }
                Err(e) => return Some(Err(format!("read line: {}", e))),
            }
        }
    }

    /// Read all remaining frames, skipping malformed lines.
    pub fn read_all(mut self) -> Vec<TickFrame> {
        let mut frames = Vec::new();
        while let Some(result) = self.next_frame() {
            if let Ok(frame) = result {
                frames.push(frame);
            }
        }
        frames
    }
}

/// Feeds the motion recorded in a session back in as live sensor input.
/// The engine re-generates notes from it; recorded notes are ignored.
pub struct ReplayMotion<R: BufRead> {
    reader: SessionReader<R>,
}

impl<R: BufRead> ReplayMotion<R> {
    pub fn new(reader: SessionReader<R>) -> Self {
        Self { reader }
    }
}

impl<R: BufRead> MotionSensor for ReplayMotion<R> {
    fn init(&mut self, _config: &SensorConfig) -> Result<(), SensorError> {
        info!(
            "Replaying {} session (v{})",
            self.reader.header.format, self.reader.header.version
        );
        Ok(())
    }

    fn read_motion(&mut self) -> Result<MotionSample, SensorError> {
        match self.reader.next_frame() {
            Some(Ok(frame)) => Ok(frame.sample),
            Some(Err(e)) => Err(SensorError::Malformed(e)),
            None => Err(SensorError::Disconnected),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::*;
    use std::io::Cursor;

    fn minimal_header() -> String {
        r#"{"format":"motion-tone","version":"0.1.0","mode":"Solo"}"#.to_string()
    }

    fn minimal_frame(ts: u64) -> String {
        let sample = MotionSample::at_rest(ts);
        serde_json::to_string(&TickFrame {
            tick: ts / 1000,
            sample,
            features: MotionFeatures::from_sample(&sample),
            melody: Note::new(SILENCE, 2, 125),
            bass: None,
            melody_hz: 0,
            bass_hz: None,
            hold_ms: 125,
            clamped: false,
        })
        .unwrap()
    }

    #[test]
    fn test_open_valid_header() {
        let data = minimal_header() + "\n";
        let reader = SessionReader::open(Cursor::new(data)).unwrap();
        assert_eq!(reader.header.format, "motion-tone");
        assert_eq!(reader.header.version, "0.1.0");
        assert_eq!(reader.header.mode, Some(VoiceMode::Solo));
    }

    #[test]
    fn test_open_missing_format() {
        let data = r#"{"version":"0.1.0"}"#.to_string() + "\n";
        let err = SessionReader::open(Cursor::new(data)).err().unwrap();
        assert!(err.contains("format"), "got: {}", err);
    }

    #[test]
    fn test_open_wrong_format() {
        let data = r#"{"format":"something-else"}"#.to_string() + "\n";
        let err = SessionReader::open(Cursor::new(data)).err().unwrap();
        assert!(err.contains("unknown format"), "got: {}", err);
    }

    #[test]
    fn test_open_empty_file() {
        assert!(SessionReader::open(Cursor::new("")).is_err());
    }

    #[test]
    fn test_read_all_skips_malformed_and_blank() {
        let mut data = minimal_header() + "\n";
        data += &minimal_frame(1000);
        data += "\n\nthis is not json\n";
        data += &minimal_frame(3000);
        data += "\n";

        let frames = SessionReader::open(Cursor::new(data)).unwrap().read_all();
        assert_eq!(frames.len(), 2, "should skip garbled line");
        assert_eq!(frames[0].sample.timestamp_us, 1000);
        assert_eq!(frames[1].sample.timestamp_us, 3000);
    }

    #[test]
    fn test_replay_yields_samples_then_ends() {
        let mut data = minimal_header() + "\n";
        data += &minimal_frame(1000);
        data += "\ngarbage\n";

        let mut replay = ReplayMotion::new(SessionReader::open(Cursor::new(data)).unwrap());
        replay.init(&SensorConfig::default()).unwrap();
        assert_eq!(replay.read_motion().unwrap().timestamp_us, 1000);
        assert!(matches!(replay.read_motion(), Err(SensorError::Malformed(_))));
        assert!(matches!(replay.read_motion(), Err(SensorError::Disconnected)));
    }
}
