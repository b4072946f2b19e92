//! Serial diagnostic line for motion samples.
//!
//! The firmware prints one line per tick in serial-plotter form:
//!
//! `AccX:0.12,AccY:-0.40,AccZ:9.79,RotX:1.20,RotY:-0.35,RotZ:0.00,Temp:24.31`
//!
//! Acceleration is m/s², rotation is °/s (the sample itself carries rad/s),
//! temperature is °C. The same line is logged on the host at `debug` and is
//! what the serial bridge parses back into samples.

use crate::devices::SensorError;
use crate::types::{MotionSample, Vec3};
use std::f32::consts::PI;

const KEYS: [&str; 7] = ["AccX", "AccY", "AccZ", "RotX", "RotY", "RotZ", "Temp"];

pub fn format_motion_line(sample: &MotionSample) -> String {
    let deg = 180.0 / PI;
    format!(
        "AccX:{:.2},AccY:{:.2},AccZ:{:.2},RotX:{:.2},RotY:{:.2},RotZ:{:.2},Temp:{:.2}",
        sample.accel.x,
        sample.accel.y,
        sample.accel.z,
        sample.gyro.x * deg,
        sample.gyro.y * deg,
        sample.gyro.z * deg,
        sample.temperature_c,
    )
}

/// Parse a diagnostic line. Fields may come in any order; all seven are required.
pub fn parse_motion_line(line: &str, timestamp_us: u64) -> Result<MotionSample, SensorError> {
    let mut values: [Option<f32>; 7] = [None; 7];

    for field in line.trim().split(',') {
        let (key, raw) = field
            .split_once(':')
            .ok_or_else(|| SensorError::Malformed(format!("no ':' in {:?}", field)))?;
        let slot = KEYS
            .iter()
            .position(|k| *k == key.trim())
            .ok_or_else(|| SensorError::Malformed(format!("unknown key {:?}", key)))?;
        let v: f32 = raw
            .trim()
            .parse()
            .map_err(|e| SensorError::Malformed(format!("{}: {}", key, e)))?;
        values[slot] = Some(v);
    }

    let mut out = [0.0f32; 7];
    for (i, v) in values.iter().enumerate() {
        out[i] = v.ok_or_else(|| SensorError::Malformed(format!("missing {}", KEYS[i])))?;
    }

    let rad = PI / 180.0;
    Ok(MotionSample {
        timestamp_us,
        accel: Vec3::new(out[0], out[1], out[2]),
        gyro: Vec3::new(out[3] * rad, out[4] * rad, out[5] * rad),
        temperature_c: out[6],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_in_degrees() {
        let s = MotionSample {
            timestamp_us: 0,
            accel: Vec3::new(0.5, -1.25, 9.81),
            gyro: Vec3::new(PI, 0.0, -PI / 2.0),
            temperature_c: 24.5,
        };
        assert_eq!(
            format_motion_line(&s),
            "AccX:0.50,AccY:-1.25,AccZ:9.81,RotX:180.00,RotY:0.00,RotZ:-90.00,Temp:24.50"
        );
    }

    #[test]
    fn test_parse_firmware_line() {
        let s = parse_motion_line(
            "AccX:0.12,AccY:-0.40,AccZ:9.79,RotX:57.30,RotY:-0.35,RotZ:0.00,Temp:24.31\r\n",
            77,
        )
        .unwrap();
        assert_eq!(s.timestamp_us, 77);
        assert!((s.accel.y + 0.40).abs() < 1e-6);
        assert!((s.gyro.x - 1.0).abs() < 1e-3, "57.3 °/s ≈ 1 rad/s, got {}", s.gyro.x);
        assert!((s.temperature_c - 24.31).abs() < 1e-4);
    }

    #[test]
    fn test_parse_rejects_banner() {
        assert!(matches!(
            parse_motion_line("MPU6050 Found!", 0),
            Err(SensorError::Malformed(_))
        ));
    }

    #[test]
    fn test_parse_rejects_missing_field() {
        let err = parse_motion_line("AccX:1,AccY:2,AccZ:3,RotX:4,RotY:5,RotZ:6", 0).unwrap_err();
        assert!(err.to_string().contains("Temp"), "{err}");
    }

    #[test]
    fn test_parse_rejects_garbage_number() {
        assert!(parse_motion_line("AccX:abc,AccY:2,AccZ:3,RotX:4,RotY:5,RotZ:6,Temp:7", 0).is_err());
    }
}
