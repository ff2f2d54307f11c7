//! Maps the controller correction onto the throttle (multirotor) or pitch
//! (fixed-wing) command.

use crate::config::{AltHoldConfig, Airframe, PwmRange};
use crate::controller::ControlState;

/// Raw receiver channels, PWM µs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RcData {
    pub throttle: i16,
    pub pitch: i16,
}

/// Commands handed to the mixer. Pre-filled by the RC stage, adjusted here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RcCommand {
    pub throttle: i16,
    pub pitch: i16,
}

fn clamp_pwm(value: i32, range: &PwmRange) -> i16 {
    value.clamp(range.min as i32, range.max as i32) as i16
}

fn saturate_i16(value: i32) -> i16 {
    value.clamp(i16::MIN as i32, i16::MAX as i32) as i16
}

/// Stick baseline and pilot-override latch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutputAdapter {
    /// Throttle stick position captured when hold engaged.
    initial_throttle_hold: i16,
    /// Pilot moved the stick out of the deadband since the last re-baseline.
    alt_hold_changed: bool,
}

impl OutputAdapter {
    pub fn rebaseline(&mut self, throttle: i16) {
        self.initial_throttle_hold = throttle;
    }

    pub fn initial_throttle_hold(&self) -> i16 {
        self.initial_throttle_hold
    }

    pub fn is_stick_override(&self) -> bool {
        self.alt_hold_changed
    }

    pub fn apply(
        &mut self,
        config: &AltHoldConfig,
        control: &mut ControlState,
        altitude: i32,
        rc_data: &RcData,
        rc_command: &mut RcCommand,
    ) {
        match config.airframe {
            Airframe::Multirotor => {
                self.apply_multirotor(config, control, altitude, rc_data, rc_command)
            }
            Airframe::FixedWing => apply_fixed_wing(config, control, rc_command),
        }
    }

    fn apply_multirotor(
        &mut self,
        config: &AltHoldConfig,
        control: &mut ControlState,
        altitude: i32,
        rc_data: &RcData,
        rc_command: &mut RcCommand,
    ) {
        let base = self.initial_throttle_hold as i32;
        let deviation = rc_data.throttle as i32 - base;
        let deadband = config.rc.alt_hold_deadband as i32;
        let outside = deviation.abs() > deadband;

        if config.rc.alt_hold_fast_change {
            // Rapid alt changes: the stick drives throttle directly
            if outside {
                control.error_velocity_i = 0;
                self.set_changed(true);
                let step = if deviation > 0 { -deadband } else { deadband };
                rc_command.throttle = saturate_i16(rc_command.throttle as i32 + step);
                return;
            }
            if self.alt_hold_changed {
                control.alt_hold = altitude;
                self.set_changed(false);
            }
        } else {
            // Slow alt changes: the stick commands a climb rate, +100 µs ~ +50 cm/s
            if outside {
                control.set_velocity = deviation / 2;
                control.velocity_control = true;
                self.set_changed(true);
            } else if self.alt_hold_changed {
                control.alt_hold = altitude;
                control.velocity_control = false;
                self.set_changed(false);
            }
        }

        rc_command.throttle = clamp_pwm(base + control.throttle_adjustment, &config.pwm_range);
    }

    fn set_changed(&mut self, changed: bool) {
        if self.alt_hold_changed != changed {
            tracing::debug!(changed, "altitude hold stick override");
        }
        self.alt_hold_changed = changed;
    }
}

/// Adds the correction to pitch. Untested on real airframes: there is no
/// stick re-baselining like the multirotor path has.
pub fn apply_fixed_wing(config: &AltHoldConfig, control: &ControlState, rc_command: &mut RcCommand) {
    let direction = if config.airplane.fixedwing_althold_reversed {
        -1
    } else {
        1
    };
    rc_command.pitch =
        saturate_i16(rc_command.pitch as i32 + control.throttle_adjustment * direction);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RcControlsConfig;

    fn config(fast_change: bool, deadband: u8) -> AltHoldConfig {
        AltHoldConfig {
            rc: RcControlsConfig {
                alt_hold_deadband: deadband,
                alt_hold_fast_change: fast_change,
            },
            ..Default::default()
        }
    }

    fn rc(throttle: i16) -> (RcData, RcCommand) {
        (
            RcData { throttle, pitch: 1500 },
            RcCommand { throttle, pitch: 0 },
        )
    }

    #[test]
    fn test_fast_change_stick_override() {
        let cfg = config(true, 10);
        let mut adapter = OutputAdapter::default();
        adapter.rebaseline(1500);
        let mut control = ControlState {
            alt_hold: 300,
            error_velocity_i: 12_345,
            throttle_adjustment: 25,
            ..Default::default()
        };

        let (data, mut cmd) = rc(1520);
        adapter.apply(&cfg, &mut control, 420, &data, &mut cmd);
        assert_eq!(cmd.throttle, 1510);
        assert_eq!(control.error_velocity_i, 0);
        assert!(adapter.is_stick_override());
        assert_eq!(control.alt_hold, 300);

        let (data, mut cmd) = rc(1470);
        adapter.apply(&cfg, &mut control, 420, &data, &mut cmd);
        assert_eq!(cmd.throttle, 1480);

        // Back inside the deadband: hold where we are now
        let (data, mut cmd) = rc(1505);
        adapter.apply(&cfg, &mut control, 420, &data, &mut cmd);
        assert!(!adapter.is_stick_override());
        assert_eq!(control.alt_hold, 420);
        assert_eq!(cmd.throttle, 1525);

        // No re-baseline without a new excursion
        let (data, mut cmd) = rc(1500);
        adapter.apply(&cfg, &mut control, 999, &data, &mut cmd);
        assert_eq!(control.alt_hold, 420);
        assert_eq!(cmd.throttle, 1525);
    }

    #[test]
    fn test_deadband_edge_is_inside() {
        let cfg = config(true, 10);
        let mut adapter = OutputAdapter::default();
        adapter.rebaseline(1500);
        let mut control = ControlState {
            error_velocity_i: 77,
            ..Default::default()
        };
        let (data, mut cmd) = rc(1510);
        adapter.apply(&cfg, &mut control, 0, &data, &mut cmd);
        assert!(!adapter.is_stick_override());
        assert_eq!(control.error_velocity_i, 77);
        assert_eq!(cmd.throttle, 1500);
    }

    #[test]
    fn test_slow_change_velocity_tracking() {
        let cfg = config(false, 40);
        let mut adapter = OutputAdapter::default();
        adapter.rebaseline(1400);
        let mut control = ControlState {
            alt_hold: 1000,
            throttle_adjustment: -30,
            ..Default::default()
        };

        let (data, mut cmd) = rc(1500);
        adapter.apply(&cfg, &mut control, 1100, &data, &mut cmd);
        assert!(control.velocity_control);
        assert_eq!(control.set_velocity, 50);
        assert!(adapter.is_stick_override());
        assert_eq!(cmd.throttle, 1370);

        let (data, mut cmd) = rc(1301);
        adapter.apply(&cfg, &mut control, 1150, &data, &mut cmd);
        assert_eq!(control.set_velocity, -49);

        let (data, mut cmd) = rc(1420);
        adapter.apply(&cfg, &mut control, 1200, &data, &mut cmd);
        assert!(!control.velocity_control);
        assert!(!adapter.is_stick_override());
        assert_eq!(control.alt_hold, 1200);
        assert_eq!(cmd.throttle, 1370);
    }

    #[test]
    fn test_output_clamped_to_pwm_range() {
        let cfg = config(false, 40);
        let mut adapter = OutputAdapter::default();
        adapter.rebaseline(1950);
        let mut control = ControlState {
            throttle_adjustment: 650,
            ..Default::default()
        };
        let (data, mut cmd) = rc(1950);
        adapter.apply(&cfg, &mut control, 0, &data, &mut cmd);
        assert_eq!(cmd.throttle, 2000);

        adapter.rebaseline(1050);
        control.throttle_adjustment = -650;
        let (data, mut cmd) = rc(1050);
        adapter.apply(&cfg, &mut control, 0, &data, &mut cmd);
        assert_eq!(cmd.throttle, 1000);
    }

    #[test]
    fn test_fixed_wing_pitch_polarity() {
        let mut cfg = AltHoldConfig {
            airframe: Airframe::FixedWing,
            ..Default::default()
        };
        let mut adapter = OutputAdapter::default();
        let mut control = ControlState {
            throttle_adjustment: 40,
            ..Default::default()
        };
        let data = RcData {
            throttle: 1700,
            pitch: 1500,
        };

        let mut cmd = RcCommand {
            throttle: 1700,
            pitch: -20,
        };
        adapter.apply(&cfg, &mut control, 0, &data, &mut cmd);
        assert_eq!(cmd.pitch, 20);
        assert_eq!(cmd.throttle, 1700);

        cfg.airplane.fixedwing_althold_reversed = true;
        let mut cmd = RcCommand {
            throttle: 1700,
            pitch: -20,
        };
        adapter.apply(&cfg, &mut control, 0, &data, &mut cmd);
        assert_eq!(cmd.pitch, -60);
    }
}
