use crate::types::*;

impl MotionFeatures {
    /// Reduce one IMU sample to the two gesture scalars.
    ///
    /// Both magnitudes are planar: the instrument reads tilt and twist in the
    /// X/Y plane, so gravity on Z never contributes.
    pub fn from_sample(sample: &MotionSample) -> Self {
        Self {
            total_acc: sample.accel.planar_magnitude(),
            total_spin: sample.gyro.planar_magnitude(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(accel: Vec3, gyro: Vec3) -> MotionSample {
        MotionSample {
            timestamp_us: 0,
            accel,
            gyro,
            temperature_c: 21.0,
        }
    }

    #[test]
    fn test_resting_flat_is_zero() {
        let f = MotionFeatures::from_sample(&MotionSample::at_rest(0));
        assert_eq!(f, MotionFeatures::new(0.0, 0.0));
    }

    #[test]
    fn test_pythagorean() {
        let f = MotionFeatures::from_sample(&sample(
            Vec3::new(-3.0, 4.0, 9.81),
            Vec3::new(0.6, -0.8, 5.0),
        ));
        assert!((f.total_acc - 5.0).abs() < 1e-6);
        assert!((f.total_spin - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_z_only_motion_is_invisible() {
        let f = MotionFeatures::from_sample(&sample(
            Vec3::new(0.0, 0.0, -30.0),
            Vec3::new(0.0, 0.0, 12.0),
        ));
        assert_eq!(f.total_acc, 0.0);
        assert_eq!(f.total_spin, 0.0);
    }
}
