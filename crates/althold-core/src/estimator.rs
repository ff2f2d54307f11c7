use crate::config::AltHoldConfig;
use crate::math::{apply_deadband, constrain_sym, round_i32, trunc_i32};
use crate::sensors::Sensors;
use crate::taps::DebugTaps;

// ---------------------------------------------------------------------------
// CONFIGURATION
// ---------------------------------------------------------------------------

/// 40 Hz estimator rate (20 Hz LPF on acc).
pub const UPDATE_PERIOD_US: u32 = 25_000;

const BARO_VEL_LIMIT: i32 = 1500; // cm/s
const BARO_VEL_DEADBAND: i32 = 10;
const VARIO_DEADBAND: i32 = 5;

// ---------------------------------------------------------------------------
// STATUS
// ---------------------------------------------------------------------------

/// Vertical-speed inputs handed to the controller after an accepted tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VerticalSample {
    /// Fused vertical speed before the vario deadband, cm/s.
    pub velocity: i32,
    /// Mean vertical acceleration of this window, raw LSB.
    pub acc_z: f32,
    /// Mean vertical acceleration of the previous window, raw LSB.
    pub acc_z_prev: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EstimateStatus {
    Updated(VerticalSample),
    /// Called again before the update period elapsed. Nothing changed.
    RateLimited,
    /// Barometer still calibrating. Filter memory was zeroed.
    BaroCalibrating,
}

// ---------------------------------------------------------------------------
// ESTIMATOR
// ---------------------------------------------------------------------------

/// Baro/ranger/accelerometer altitude and vario estimator.
#[derive(Debug, Clone, Default)]
pub struct AltitudeEstimator {
    // Filter memory
    vel: f32,     // cm/s
    acc_alt: f32, // cm
    last_baro_alt: i32,
    previous_time_us: u32,
    acc_z_prev: f32,
    baro_ready: bool,

    // Outputs
    altitude: i32, // cm
    vario: i32,    // cm/s
    taps: DebugTaps,
}

impl AltitudeEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fused altitude, cm.
    pub fn altitude_cm(&self) -> i32 {
        self.altitude
    }

    /// Fused vertical speed, cm/s.
    pub fn vario_cm_s(&self) -> i32 {
        self.vario
    }

    pub fn debug_taps(&self) -> DebugTaps {
        self.taps
    }

    /// Runs one estimator step if at least [`UPDATE_PERIOD_US`] passed since
    /// the last accepted one. `now_us` may wrap.
    pub fn update(
        &mut self,
        now_us: u32,
        sensors: &mut Sensors<'_>,
        config: &AltHoldConfig,
    ) -> EstimateStatus {
        let dt_us = now_us.wrapping_sub(self.previous_time_us);
        if dt_us < UPDATE_PERIOD_US {
            return EstimateStatus::RateLimited;
        }
        self.previous_time_us = now_us;

        let mut baro_alt = 0;
        if let Some(baro) = sensors.baro.as_deref_mut() {
            if !baro.is_calibration_complete() {
                baro.perform_calibration_cycle();
                self.vel = 0.0;
                self.acc_alt = 0.0;
                // Warm-up samples are not worth integrating
                if let Some(accel) = sensors.accel.as_deref_mut() {
                    accel.reset();
                }
                return EstimateStatus::BaroCalibrating;
            }
            if !self.baro_ready {
                tracing::debug!("barometer calibration complete");
                self.baro_ready = true;
            }
            baro_alt = baro.altitude_cm();
            self.altitude = baro_alt;
        }

        let mut acc_z = 0.0;
        let window = sensors.accel.as_deref().and_then(|accel| accel.window());
        if let Some(window) = window {
            let dt = window.time_sum_us as f32 * 1e-6;
            acc_z = window.mean_z();

            // Integrator - velocity increment, cm/s
            let vel_acc = acc_z * config.acc_vel_scale() * window.time_sum_us as f32;

            // Integrator - altitude, cm (x = v*t + a/2 * t^2)
            self.acc_alt += (vel_acc * 0.5) * dt + self.vel * dt;
            let cf = config.baro.cf_alt;
            self.acc_alt = self.acc_alt * cf + baro_alt as f32 * (1.0 - cf);
            self.vel += vel_acc;
            self.altitude = trunc_i32(self.acc_alt);
        }

        // Ranger wins inside its trusted band
        if let Some(ranger) = sensors.ranger.as_deref_mut() {
            let range = ranger.altitude_cm(sensors.attitude.cos_tilt);
            let blended = blend_ranger(
                range,
                baro_alt,
                ranger.cf_alt_cm(),
                ranger.max_alt_with_tilt_cm(),
            );
            if let Some(alt) = blended {
                self.altitude = alt;
            }
        }

        self.taps = DebugTaps {
            acc_z: acc_z as i16,
            vel: self.vel as i16,
            height: self.acc_alt as i16,
        };

        if let Some(accel) = sensors.accel.as_deref_mut() {
            accel.reset();
        }

        let mut baro_vel = 0;
        if sensors.baro.is_some() {
            let delta = baro_alt.saturating_sub(self.last_baro_alt);
            baro_vel = trunc_i32(delta as f32 * 1_000_000.0 / dt_us as f32);
            self.last_baro_alt = baro_alt;

            baro_vel = constrain_sym(baro_vel, BARO_VEL_LIMIT);
            baro_vel = apply_deadband(baro_vel, BARO_VEL_DEADBAND);
        }

        // Baro velocity corrects integrated-accel drift without adding phase lag
        let cf = config.baro.cf_vel;
        self.vel = self.vel * cf + baro_vel as f32 * (1.0 - cf);
        let velocity = round_i32(self.vel);
        self.vario = apply_deadband(velocity, VARIO_DEADBAND);

        let sample = VerticalSample {
            velocity,
            acc_z,
            acc_z_prev: self.acc_z_prev,
        };
        self.acc_z_prev = acc_z;

        EstimateStatus::Updated(sample)
    }
}

/// Linear ranger/baro blend. Returns `None` when `range` is outside
/// `[cf_alt, max_alt]` or not a valid echo. Pure ranger at `cf_alt`, pure baro
/// at `max_alt`.
pub fn blend_ranger(range: i32, baro_alt: i32, cf_alt: i32, max_alt: i32) -> Option<i32> {
    if range <= 0 || range < cf_alt || range > max_alt {
        return None;
    }
    if max_alt == cf_alt {
        return Some(range);
    }
    let transition = (max_alt - range) as f32 / (max_alt - cf_alt) as f32;
    Some(trunc_i32(
        range as f32 * transition + baro_alt as f32 * (1.0 - transition),
    ))
}
