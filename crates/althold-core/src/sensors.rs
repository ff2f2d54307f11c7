//! Narrow interfaces to the collaborators the estimator reads from.
//!
//! Driver maths (pressure to altitude, echo time to distance, sample
//! accumulation) lives behind these traits. A missing sensor is expressed as
//! `None` in [`Sensors`] rather than a compile-time switch.

/// Barometric altimeter.
pub trait Barometer {
    fn is_calibration_complete(&self) -> bool;

    /// Advances ground-level calibration by one step. Called once per
    /// estimator tick until [`Barometer::is_calibration_complete`] is true.
    fn perform_calibration_cycle(&mut self);

    /// Altitude above the calibration reference, in cm. Only meaningful once
    /// calibration is complete.
    fn altitude_cm(&mut self) -> i32;
}

/// Short-range downward rangefinder (sonar, lidar, ToF).
pub trait Ranger {
    /// Tilt-corrected altitude in cm, negative when there is no valid echo.
    fn altitude_cm(&mut self, cos_tilt: f32) -> i32;

    /// Altitude below which the ranger is fully trusted.
    fn cf_alt_cm(&self) -> i32;

    /// Maximum usable altitude for the current tilt.
    fn max_alt_with_tilt_cm(&self) -> i32;
}

/// Vertical acceleration integrated by the attitude estimator since the last reset.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AccelWindow {
    /// Sum of earth-frame vertical acceleration samples, gravity removed, raw LSB.
    pub sum_z: f32,
    /// Number of samples in `sum_z`.
    pub count: u32,
    /// Duration covered by the window, µs.
    pub time_sum_us: u32,
}

impl AccelWindow {
    /// Mean acceleration over the window in raw LSB, zero for an empty window.
    pub fn mean_z(&self) -> f32 {
        if self.count > 0 {
            self.sum_z / self.count as f32
        } else {
            0.0
        }
    }
}

/// Accumulator owned by the attitude estimator.
pub trait AccelAccumulator {
    /// Current window, `None` when the vehicle has no accelerometer.
    fn window(&self) -> Option<AccelWindow>;

    /// Marks the window consumed so a new one starts.
    fn reset(&mut self);
}

/// Attitude snapshot from the orientation estimator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Attitude {
    /// Roll, decidegrees.
    pub roll: i16,
    /// Pitch, decidegrees.
    pub pitch: i16,
    /// Cosine of the angle between body Z and earth Z.
    pub cos_tilt: f32,
}

impl Attitude {
    pub const LEVEL: Attitude = Attitude {
        roll: 0,
        pitch: 0,
        cos_tilt: 1.0,
    };
}

impl Default for Attitude {
    fn default() -> Self {
        Self::LEVEL
    }
}

/// Sensor collaborators available for one estimator call.
pub struct Sensors<'a> {
    pub baro: Option<&'a mut dyn Barometer>,
    pub ranger: Option<&'a mut dyn Ranger>,
    pub accel: Option<&'a mut dyn AccelAccumulator>,
    pub attitude: Attitude,
}

impl<'a> Sensors<'a> {
    /// No sensors, level attitude.
    pub fn none() -> Self {
        Self {
            baro: None,
            ranger: None,
            accel: None,
            attitude: Attitude::LEVEL,
        }
    }
}
