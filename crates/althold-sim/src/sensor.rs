use crate::error::SimError;
use crate::sim::GRAVITY;
use althold_core::{AccelAccumulator, AccelWindow, Barometer, Ranger};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

#[derive(Debug, Clone, PartialEq)]
pub struct SensorConfig {
    pub noise_scale: f64,
    pub baro_noise_std: f64,   // cm
    pub ranger_noise_std: f64, // cm
    pub accel_noise_std: f64,  // m/s^2

    pub baro_calibration_cycles: u32,
    pub ranger_max_range_cm: i32,
    pub ranger_max_tilt_deg: f64,

    // Fitted sensors
    pub has_baro: bool,
    pub has_ranger: bool,
    pub has_accel: bool,

    pub seed: u64,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            noise_scale: 1.0,
            baro_noise_std: 15.0,
            ranger_noise_std: 1.0,
            accel_noise_std: 0.05,
            baro_calibration_cycles: 20,
            ranger_max_range_cm: 400,
            ranger_max_tilt_deg: 22.5,
            has_baro: true,
            has_ranger: false,
            has_accel: true,
            seed: 42,
        }
    }
}

fn noise(sensor: &'static str, std: f64, scale: f64) -> Result<Normal<f64>, SimError> {
    Normal::new(0.0, std * scale).map_err(|source| SimError::Noise { sensor, source })
}

// ---------------------------------------------------------------------------
// Barometer
// ---------------------------------------------------------------------------

/// Pressure altimeter zeroed at the launch point.
pub struct SimBarometer {
    rng: StdRng,
    noise: Normal<f64>,
    calibration_cycles_left: u32,
    true_alt_cm: f64,
}

impl SimBarometer {
    pub fn new(cfg: &SensorConfig) -> Result<Self, SimError> {
        Ok(Self {
            rng: StdRng::seed_from_u64(cfg.seed),
            noise: noise("barometer", cfg.baro_noise_std, cfg.noise_scale)?,
            calibration_cycles_left: cfg.baro_calibration_cycles,
            true_alt_cm: 0.0,
        })
    }

    pub fn set_truth(&mut self, altitude_m: f64) {
        self.true_alt_cm = altitude_m * 100.0;
    }
}

impl Barometer for SimBarometer {
    fn is_calibration_complete(&self) -> bool {
        self.calibration_cycles_left == 0
    }

    fn perform_calibration_cycle(&mut self) {
        self.calibration_cycles_left = self.calibration_cycles_left.saturating_sub(1);
    }

    fn altitude_cm(&mut self) -> i32 {
        (self.true_alt_cm + self.noise.sample(&mut self.rng)).round() as i32
    }
}

// ---------------------------------------------------------------------------
// Ranger
// ---------------------------------------------------------------------------

/// Downward sonar. Reports -1 past its range or when tilted beyond its cone.
pub struct SimRanger {
    rng: StdRng,
    noise: Normal<f64>,
    max_range_cm: i32,
    max_tilt_cos: f64,
    true_alt_cm: f64,
}

impl SimRanger {
    pub const OUT_OF_RANGE: i32 = -1;

    pub fn new(cfg: &SensorConfig) -> Result<Self, SimError> {
        Ok(Self {
            rng: StdRng::seed_from_u64(cfg.seed.wrapping_add(1)),
            noise: noise("ranger", cfg.ranger_noise_std, cfg.noise_scale)?,
            max_range_cm: cfg.ranger_max_range_cm,
            max_tilt_cos: cfg.ranger_max_tilt_deg.to_radians().cos(),
            true_alt_cm: 0.0,
        })
    }

    pub fn set_truth(&mut self, altitude_m: f64) {
        self.true_alt_cm = altitude_m * 100.0;
    }
}

impl Ranger for SimRanger {
    fn altitude_cm(&mut self, cos_tilt: f32) -> i32 {
        let cos_tilt = cos_tilt as f64;
        if cos_tilt <= self.max_tilt_cos {
            return Self::OUT_OF_RANGE;
        }
        // Slant distance along the body axis
        let distance = self.true_alt_cm / cos_tilt + self.noise.sample(&mut self.rng);
        if distance < 0.0 || distance > self.max_range_cm as f64 {
            return Self::OUT_OF_RANGE;
        }
        (distance * cos_tilt) as i32
    }

    fn cf_alt_cm(&self) -> i32 {
        self.max_alt_with_tilt_cm() / 2
    }

    fn max_alt_with_tilt_cm(&self) -> i32 {
        (self.max_range_cm as f64 * self.max_tilt_cos) as i32
    }
}

// ---------------------------------------------------------------------------
// IMU
// ---------------------------------------------------------------------------

/// Earth-frame vertical acceleration accumulator, raw LSB at `acc_1g` per g.
pub struct SimImu {
    rng: StdRng,
    noise: Normal<f64>,
    acc_1g: f64,
    window: AccelWindow,
}

impl SimImu {
    pub fn new(cfg: &SensorConfig, acc_1g: u16) -> Result<Self, SimError> {
        Ok(Self {
            rng: StdRng::seed_from_u64(cfg.seed.wrapping_add(2)),
            noise: noise("accelerometer", cfg.accel_noise_std, cfg.noise_scale)?,
            acc_1g: acc_1g as f64,
            window: AccelWindow::default(),
        })
    }

    /// Adds one sample of kinematic vertical acceleration (m/s², up) covering `dt_us`.
    pub fn push_sample(&mut self, accel_mps2: f64, dt_us: u32) {
        let measured = accel_mps2 + self.noise.sample(&mut self.rng);
        self.window.sum_z += (measured / GRAVITY * self.acc_1g) as f32;
        self.window.count += 1;
        self.window.time_sum_us = self.window.time_sum_us.wrapping_add(dt_us);
    }
}

impl AccelAccumulator for SimImu {
    fn window(&self) -> Option<AccelWindow> {
        Some(self.window)
    }

    fn reset(&mut self) {
        self.window = AccelWindow::default();
    }
}
