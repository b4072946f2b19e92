use crate::config::SensorConfig;
use crate::devices::{MotionSensor, SensorError};
use crate::diagnostics::parse_motion_line;
use crate::types::*;
use log::{debug, info, warn};
use serialport::SerialPort;
use std::io::{self, BufRead, BufReader};
use std::time::{Duration, Instant};

const BANNER_FOUND: &str = "MPU6050 Found";
const BANNER_MISSING: &str = "Failed to find MPU6050";
/// How long `init` waits for the banner or a first data line.
const DETECT_TIMEOUT: Duration = Duration::from_secs(3);

/// MPU-6050 behind a microcontroller that streams the diagnostic line
/// (`AccX:..,AccY:..,..,Temp:..`) over USB serial.
///
/// The bridge firmware fixes the sensor's ranges and filter itself; the
/// host-side `SensorConfig` is only logged for the record.
pub struct SerialMotionSensor {
    port_name: String,
    baud_rate: u32,
    clock: SessionClock,
    reader: Option<BufReader<Box<dyn SerialPort>>>,
    line: String,
}

impl SerialMotionSensor {
    pub fn new(port_name: String, clock: SessionClock) -> Self {
        Self {
            port_name,
            baud_rate: 115200,
            clock,
            reader: None,
            line: String::new(),
        }
    }

    /// Next complete line from the port. `Ok(None)` on a read timeout; a
    /// partial line is kept for the next call.
    fn next_line(&mut self) -> Result<Option<String>, SensorError> {
        let reader = self.reader.as_mut().ok_or(SensorError::Disconnected)?;
        match reader.read_line(&mut self.line) {
            Ok(0) => Err(SensorError::Disconnected),
            Ok(_) if !self.line.ends_with('\n') => Ok(None),
            Ok(_) => {
                let line = self.line.trim().to_string();
                self.line.clear();
                Ok(Some(line))
            }
            Err(ref e) if e.kind() == io::ErrorKind::TimedOut => Ok(None),
            Err(e) => Err(SensorError::Io(e)),
        }
    }
}

impl MotionSensor for SerialMotionSensor {
    fn init(&mut self, config: &SensorConfig) -> Result<(), SensorError> {
        info!("Opening serial port: {} @ {}", self.port_name, self.baud_rate);
        let port = serialport::new(&self.port_name, self.baud_rate)
            .timeout(Duration::from_millis(100))
            .open()
            .map_err(|e| SensorError::NotDetected(format!("{}: {}", self.port_name, e)))?;
        self.reader = Some(BufReader::new(port));
        self.line.clear();

        let deadline = Instant::now() + DETECT_TIMEOUT;
        while Instant::now() < deadline {
            let Some(line) = self.next_line()? else {
                continue;
            };
            if line.contains(BANNER_MISSING) {
                return Err(SensorError::NotDetected(line));
            }
            if line.contains(BANNER_FOUND) || parse_motion_line(&line, 0).is_ok() {
                info!(
                    "MPU-6050 streaming on {} (firmware-fixed ranges; requested {:?})",
                    self.port_name, config
                );
                return Ok(());
            }
            debug!("serial: {}", line);
        }

        self.reader = None;
        Err(SensorError::NotDetected(format!(
            "no sensor data on {} within {:?}",
            self.port_name, DETECT_TIMEOUT
        )))
    }

    fn read_motion(&mut self) -> Result<MotionSample, SensorError> {
        loop {
            let Some(line) = self.next_line()? else {
                continue;
            };
            match parse_motion_line(&line, self.clock.now_us()) {
                Ok(sample) => return Ok(sample),
                Err(e) if line.contains(':') && line.contains(',') => {
                    warn!("Dropping serial line: {}", e);
                }
                Err(_) => debug!("serial: {}", line),
            }
        }
    }
}
