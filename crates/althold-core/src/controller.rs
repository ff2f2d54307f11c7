//! Cascaded altitude controller: altitude P feeding a vertical-velocity PID.
//!
//! All arithmetic is integer fixed point. Gains are the 8-bit values from
//! [`PidGains`]; each term has its own scale divisor and clamp, and the
//! correction is bounded by the sum of the clamps.

use crate::config::PidGains;
use crate::estimator::VerticalSample;
use crate::math::{apply_deadband, constrain_sym, trunc_i32};
use crate::sensors::Attitude;

/// Beyond this roll or pitch (decidegrees) thrust no longer points down.
pub const THRUST_TILT_LIMIT: i16 = 800;

const ALT_ERROR_LIMIT: i32 = 500; // cm
const ALT_ERROR_DEADBAND: i32 = 10;
const ALT_P_SCALE: i32 = 128;
const VEL_TARGET_LIMIT: i32 = 300; // cm/s

const VEL_P_SCALE: i32 = 32;
const VEL_P_LIMIT: i32 = 300;

const VEL_I_SCALE: i32 = 8192;
/// Integrator bound, ±200 after scaling.
pub const VEL_I_LIMIT: i32 = VEL_I_SCALE * 200;

const VEL_D_SCALE: f32 = 512.0;
const VEL_D_LIMIT: i32 = 150;

/// Controller memory. Re-baselined on every hold activation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControlState {
    /// Altitude setpoint, cm.
    pub alt_hold: i32,
    /// Target velocity while velocity-tracking, cm/s.
    pub set_velocity: i32,
    /// Outer loop bypassed, `set_velocity` drives the inner loop.
    pub velocity_control: bool,
    /// Velocity integrator, bounded by [`VEL_I_LIMIT`].
    pub error_velocity_i: i32,
    /// Correction produced by the last controller run.
    pub throttle_adjustment: i32,
}

impl ControlState {
    /// Clears integrator and output and holds at `altitude`.
    pub fn rebaseline(&mut self, altitude: i32) {
        self.alt_hold = altitude;
        self.error_velocity_i = 0;
        self.throttle_adjustment = 0;
    }
}

pub fn is_thrust_facing_downwards(attitude: &Attitude) -> bool {
    attitude.roll.unsigned_abs() < THRUST_TILT_LIMIT as u16
        && attitude.pitch.unsigned_abs() < THRUST_TILT_LIMIT as u16
}

#[derive(Debug, Clone, Default)]
pub struct CascadeController {
    pub state: ControlState,
}

impl CascadeController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Computes the correction and stores it as the last output.
    pub fn update(
        &mut self,
        gains: &PidGains,
        attitude: &Attitude,
        altitude: i32,
        sample: &VerticalSample,
    ) -> i32 {
        let result = self.calculate_adjustment(gains, attitude, altitude, sample);
        self.state.throttle_adjustment = result;
        result
    }

    /// Target velocity the outer loop asks for at `altitude`.
    pub fn target_velocity(&self, gains: &PidGains, altitude: i32) -> i32 {
        if self.state.velocity_control {
            return self.state.set_velocity;
        }
        let error = constrain_sym(self.state.alt_hold.saturating_sub(altitude), ALT_ERROR_LIMIT);
        // Remove small P contribution to reduce noise near zero position
        let error = apply_deadband(error, ALT_ERROR_DEADBAND);
        constrain_sym(gains.alt.p as i32 * error / ALT_P_SCALE, VEL_TARGET_LIMIT)
    }

    fn calculate_adjustment(
        &mut self,
        gains: &PidGains,
        attitude: &Attitude,
        altitude: i32,
        sample: &VerticalSample,
    ) -> i32 {
        if !is_thrust_facing_downwards(attitude) {
            return 0;
        }

        let set_vel = self.target_velocity(gains, altitude);

        // P
        let error = set_vel.saturating_sub(sample.velocity);
        let mut result = constrain_sym(
            (gains.vel.p as i32).saturating_mul(error) / VEL_P_SCALE,
            VEL_P_LIMIT,
        );

        // I
        let i_step = (gains.vel.i as i32).saturating_mul(error);
        self.state.error_velocity_i =
            constrain_sym(self.state.error_velocity_i.saturating_add(i_step), VEL_I_LIMIT);
        result += self.state.error_velocity_i / VEL_I_SCALE;

        // D
        let d_raw = gains.vel.d as f32 * (sample.acc_z + sample.acc_z_prev) / VEL_D_SCALE;
        result -= constrain_sym(trunc_i32(d_raw), VEL_D_LIMIT);

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Gain;

    fn sample(velocity: i32) -> VerticalSample {
        VerticalSample {
            velocity,
            acc_z: 0.0,
            acc_z_prev: 0.0,
        }
    }

    fn gains(alt_p: u8, vel: Gain) -> PidGains {
        PidGains {
            alt: Gain::new(alt_p, 0, 0),
            vel,
        }
    }

    #[test]
    fn test_outer_loop_saturates_at_error_limit() {
        let g = gains(200, Gain::new(10, 0, 0));
        let mut ctrl = CascadeController::new();
        ctrl.state.alt_hold = 0;

        let at_limit = ctrl.target_velocity(&g, -500);
        for altitude in [-501, -800, -100_000] {
            assert_eq!(ctrl.target_velocity(&g, altitude), at_limit);
        }
        let at_neg_limit = ctrl.target_velocity(&g, 500);
        for altitude in [501, 1200, i32::MAX] {
            assert_eq!(ctrl.target_velocity(&g, altitude), at_neg_limit);
        }
        // 200 * 490 / 128 = 765 -> 300
        assert_eq!(at_limit, 300);
        assert_eq!(at_neg_limit, -300);
    }

    #[test]
    fn test_outer_loop_deadband() {
        let g = gains(50, Gain::new(10, 0, 0));
        let mut ctrl = CascadeController::new();
        ctrl.state.alt_hold = 1000;
        assert_eq!(ctrl.target_velocity(&g, 995), 0);
        assert_eq!(ctrl.target_velocity(&g, 1009), 0);
        // (30 - 10) * 50 / 128 = 7
        assert_eq!(ctrl.target_velocity(&g, 970), 7);
    }

    #[test]
    fn test_hand_computed_clamp_chain() {
        // Baro 100, setpoint 150, velocity P = 10, no I/D, vario 0
        let g = gains(50, Gain::new(10, 0, 0));
        let mut ctrl = CascadeController::new();
        ctrl.state.alt_hold = 150;

        // error 50 -> deadband 40 -> 50 * 40 / 128 = 15 cm/s
        assert_eq!(ctrl.target_velocity(&g, 100), 15);
        // P = 10 * 15 / 32 = 4
        let out = ctrl.update(&g, &Attitude::LEVEL, 100, &sample(0));
        assert_eq!(out, 4);
        assert_eq!(ctrl.state.throttle_adjustment, 4);
        assert_eq!(ctrl.state.error_velocity_i, 0);
    }

    #[test]
    fn test_full_pid_terms() {
        let g = gains(50, Gain::new(55, 55, 75));
        let mut ctrl = CascadeController::new();
        ctrl.state.alt_hold = 150;
        let s = VerticalSample {
            velocity: -5,
            acc_z: 100.0,
            acc_z_prev: 60.0,
        };
        // target 15, error 20
        // P = 55 * 20 / 32 = 34
        // I = 55 * 20 = 1100 -> 1100 / 8192 = 0
        // D = 75 * 160 / 512 = 23.4 -> 23
        let out = ctrl.update(&g, &Attitude::LEVEL, 100, &s);
        assert_eq!(out, 34 + 0 - 23);
        assert_eq!(ctrl.state.error_velocity_i, 1100);
    }

    #[test]
    fn test_integrator_is_bounded() {
        let g = gains(0, Gain::new(0, 255, 0));
        let mut ctrl = CascadeController::new();
        ctrl.state.velocity_control = true;
        ctrl.state.set_velocity = 300;

        let mut out = 0;
        for _ in 0..100_000 {
            out = ctrl.update(&g, &Attitude::LEVEL, 0, &sample(-300));
            assert!(ctrl.state.error_velocity_i.abs() <= VEL_I_LIMIT);
        }
        assert_eq!(ctrl.state.error_velocity_i, VEL_I_LIMIT);
        assert_eq!(out, 200);

        ctrl.state.set_velocity = -300;
        for _ in 0..100_000 {
            ctrl.update(&g, &Attitude::LEVEL, 0, &sample(300));
        }
        assert_eq!(ctrl.state.error_velocity_i, -VEL_I_LIMIT);
    }

    #[test]
    fn test_output_bounded_by_term_clamps() {
        let g = gains(255, Gain::new(255, 255, 255));
        let mut ctrl = CascadeController::new();
        ctrl.state.alt_hold = 10_000;
        let s = VerticalSample {
            velocity: -10_000,
            acc_z: -50_000.0,
            acc_z_prev: -50_000.0,
        };
        let mut out = 0;
        for _ in 0..10_000 {
            out = ctrl.update(&g, &Attitude::LEVEL, 0, &s);
        }
        assert_eq!(out, 300 + 200 + 150);
    }

    #[test]
    fn test_thrust_gate() {
        let g = gains(50, Gain::new(55, 55, 75));
        let mut ctrl = CascadeController::new();
        ctrl.state.alt_hold = 500;
        ctrl.update(&g, &Attitude::LEVEL, 0, &sample(0));
        let integ = ctrl.state.error_velocity_i;
        assert_ne!(integ, 0);

        for (roll, pitch) in [(800, 0), (0, -800), (-1800, 0), (0, 900), (799, 800)] {
            let attitude = Attitude {
                roll,
                pitch,
                cos_tilt: 0.1,
            };
            assert!(!is_thrust_facing_downwards(&attitude));
            assert_eq!(ctrl.update(&g, &attitude, 0, &sample(0)), 0);
            assert_eq!(ctrl.state.error_velocity_i, integ);
            assert_eq!(ctrl.state.throttle_adjustment, 0);
        }

        let attitude = Attitude {
            roll: 799,
            pitch: -799,
            cos_tilt: 0.7,
        };
        assert!(is_thrust_facing_downwards(&attitude));
        assert_ne!(ctrl.update(&g, &attitude, 0, &sample(0)), 0);
    }

    #[test]
    fn test_velocity_tracking_bypasses_outer_loop() {
        let g = gains(50, Gain::new(32, 0, 0));
        let mut ctrl = CascadeController::new();
        ctrl.state.alt_hold = 10_000;
        ctrl.state.velocity_control = true;
        ctrl.state.set_velocity = -64;
        assert_eq!(ctrl.target_velocity(&g, 0), -64);
        // P = 32 * -64 / 32
        assert_eq!(ctrl.update(&g, &Attitude::LEVEL, 0, &sample(0)), -64);
    }
}
