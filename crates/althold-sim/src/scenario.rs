use crate::error::SimError;
use crate::sensor::{SensorConfig, SimBarometer, SimImu, SimRanger};
use crate::sim::{core_attitude, tilt_attitude, Vehicle, VehicleParams};
use althold_core::estimator::UPDATE_PERIOD_US;
use althold_core::{
    AccelAccumulator, AltHoldConfig, AltitudeHold, Airframe, Barometer, EstimateStatus,
    HoldSource, ModeSwitches, Ranger, RcCommand, RcData, Sensors, TickInput,
};
use nalgebra::UnitQuaternion;
use serde::Serialize;

/// Centred pitch stick, PWM µs.
pub const STICK_CENTER: i16 = 1500;

// ---------------------------------------------------------------------------
// Pilot script
// ---------------------------------------------------------------------------

/// Stick held away from the hold baseline for `[start_s, end_s)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StickExcursion {
    pub start_s: f64,
    pub end_s: f64,
    pub offset: i16, // µs
}

impl StickExcursion {
    pub fn is_active(&self, t: f64) -> bool {
        t >= self.start_s && t < self.end_s
    }
}

/// Vehicle rolled to `roll_deg` for `[start_s, end_s)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TiltExcursion {
    pub start_s: f64,
    pub end_s: f64,
    pub roll_deg: f64,
}

impl TiltExcursion {
    pub fn is_active(&self, t: f64) -> bool {
        t >= self.start_s && t < self.end_s
    }
}

/// One scripted flight: sit on the ground, climb, engage hold, optionally
/// disturb it with the stick or a hard bank.
#[derive(Debug, Clone)]
pub struct Scenario {
    pub duration_s: f64,
    pub loop_hz: u32,
    pub takeoff_s: f64,
    /// Throttle above hover (multirotor) or pitch offset (fixed-wing) flown
    /// from takeoff until the hold engages.
    pub climb_offset: i16,
    pub hold_at_s: f64,
    pub hold_source: HoldSource,
    /// Stick offset from hover while holding, left for the integrator to trim.
    pub stick_bias: i16,
    /// Time after engagement excluded from the error statistics.
    pub settle_s: f64,
    pub stick_excursion: Option<StickExcursion>,
    pub tilt_excursion: Option<TiltExcursion>,

    pub config: AltHoldConfig,
    pub vehicle: VehicleParams,
    pub sensors: SensorConfig,
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            duration_s: 30.0,
            loop_hz: 1000,
            takeoff_s: 1.0,
            climb_offset: 50,
            hold_at_s: 5.0,
            hold_source: HoldSource::Baro,
            stick_bias: 20,
            settle_s: 10.0,
            stick_excursion: None,
            tilt_excursion: None,
            config: AltHoldConfig::default(),
            vehicle: VehicleParams::default(),
            sensors: SensorConfig::default(),
        }
    }
}

impl Scenario {
    /// Default script flown by a fixed-wing: pitch up after takeoff, hold at 5 s.
    pub fn fixed_wing() -> Self {
        Self {
            climb_offset: 100,
            config: AltHoldConfig {
                airframe: Airframe::FixedWing,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), SimError> {
        self.config.validate()?;
        if !self.duration_s.is_finite() || self.duration_s <= 0.0 {
            return Err(SimError::Scenario(format!(
                "duration must be positive, got {}",
                self.duration_s
            )));
        }
        if self.loop_hz == 0 || self.loop_hz > 1_000_000 {
            return Err(SimError::Scenario(format!(
                "loop rate must be within 1..=1000000 Hz, got {}",
                self.loop_hz
            )));
        }
        let windows = [
            ("stick", self.stick_excursion.map(|e| (e.start_s, e.end_s))),
            ("tilt", self.tilt_excursion.map(|e| (e.start_s, e.end_s))),
        ];
        for (name, window) in windows {
            if let Some((start, end)) = window {
                if !(start < end) {
                    return Err(SimError::Scenario(format!(
                        "{name} excursion window is empty ({start}..{end})"
                    )));
                }
            }
        }
        let fitted = match self.hold_source {
            HoldSource::Baro => self.sensors.has_baro,
            HoldSource::Ranger => self.sensors.has_ranger,
        };
        if !fitted {
            return Err(SimError::Scenario(format!(
                "{} needs its sensor fitted",
                self.hold_source.label()
            )));
        }
        Ok(())
    }

    /// Pilot stick positions at `t`.
    pub fn pilot(&self, t: f64, hover_throttle: i16) -> RcData {
        let excursion = self
            .stick_excursion
            .filter(|e| e.is_active(t))
            .map_or(0, |e| e.offset);
        let offset = if t < self.takeoff_s {
            None
        } else if t < self.hold_at_s {
            Some(self.climb_offset)
        } else {
            Some(self.stick_bias.saturating_add(excursion))
        };

        match self.config.airframe {
            Airframe::Multirotor => RcData {
                throttle: offset.map_or(self.config.pwm_range.min, |o| {
                    hover_throttle.saturating_add(o)
                }),
                pitch: STICK_CENTER,
            },
            Airframe::FixedWing => RcData {
                throttle: STICK_CENTER,
                pitch: STICK_CENTER.saturating_add(offset.unwrap_or(0)),
            },
        }
    }

    pub fn switches(&self, t: f64) -> ModeSwitches {
        let on = t >= self.hold_at_s;
        ModeSwitches {
            baro: on && self.hold_source == HoldSource::Baro,
            ranger: on && self.hold_source == HoldSource::Ranger,
        }
    }

    pub fn attitude_at(&self, t: f64) -> UnitQuaternion<f64> {
        match self.tilt_excursion {
            Some(tilt) if tilt.is_active(t) => tilt_attitude(tilt.roll_deg, 0.0),
            _ => UnitQuaternion::identity(),
        }
    }

    /// Pilot is deliberately disturbing the hold.
    pub fn is_excursion(&self, t: f64) -> bool {
        self.stick_excursion.is_some_and(|e| e.is_active(t))
            || self.tilt_excursion.is_some_and(|e| e.is_active(t))
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "duration_s": self.duration_s,
            "loop_hz": self.loop_hz,
            "takeoff_s": self.takeoff_s,
            "climb_offset": self.climb_offset,
            "hold_at_s": self.hold_at_s,
            "hold_source": self.hold_source.label(),
            "stick_bias": self.stick_bias,
            "settle_s": self.settle_s,
            "stick_excursion": self.stick_excursion.map(|e| serde_json::json!({
                "start_s": e.start_s,
                "end_s": e.end_s,
                "offset": e.offset,
            })),
            "tilt_excursion": self.tilt_excursion.map(|e| serde_json::json!({
                "start_s": e.start_s,
                "end_s": e.end_s,
                "roll_deg": e.roll_deg,
            })),
            "config": self.config,
            "noise_scale": self.sensors.noise_scale,
            "seed": self.sensors.seed,
        })
    }
}

// ---------------------------------------------------------------------------
// Result
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HoldStats {
    pub samples: usize,
    pub max_abs_error_cm: f64,
    pub rms_error_cm: f64,
}

/// Traces recorded at every accepted estimator tick.
#[derive(Debug, Clone, Default, Serialize)]
pub struct HoldResult {
    pub time: Vec<f64>,
    pub true_alt_cm: Vec<f64>,
    pub true_vel_cm_s: Vec<f64>,
    pub est_alt_cm: Vec<i32>,
    pub est_vario_cm_s: Vec<i32>,
    pub setpoint_cm: Vec<i32>,
    pub throttle: Vec<i16>,
    pub pitch: Vec<i16>,
    pub correction: Vec<i32>,
    pub integrator: Vec<i32>,
    pub baro_hold: Vec<bool>,
    pub ranger_hold: Vec<bool>,
    pub stick_override: Vec<bool>,
    pub excursion: Vec<bool>,

    pub engaged_at_s: Option<f64>,
    pub stats: Option<HoldStats>,
}

impl HoldResult {
    fn with_capacity(n: usize) -> Self {
        Self {
            time: Vec::with_capacity(n),
            true_alt_cm: Vec::with_capacity(n),
            true_vel_cm_s: Vec::with_capacity(n),
            est_alt_cm: Vec::with_capacity(n),
            est_vario_cm_s: Vec::with_capacity(n),
            setpoint_cm: Vec::with_capacity(n),
            throttle: Vec::with_capacity(n),
            pitch: Vec::with_capacity(n),
            correction: Vec::with_capacity(n),
            integrator: Vec::with_capacity(n),
            baro_hold: Vec::with_capacity(n),
            ranger_hold: Vec::with_capacity(n),
            stick_override: Vec::with_capacity(n),
            excursion: Vec::with_capacity(n),
            engaged_at_s: None,
            stats: None,
        }
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    pub fn is_holding(&self, i: usize) -> bool {
        self.baro_hold[i] || self.ranger_hold[i]
    }

    /// True altitude minus setpoint, cm.
    pub fn hold_error_cm(&self, i: usize) -> f64 {
        self.true_alt_cm[i] - self.setpoint_cm[i] as f64
    }

    /// Error statistics over `[from_s, to_s)`, counting only samples with a
    /// hold engaged and the pilot hands-off.
    pub fn error_stats(&self, from_s: f64, to_s: f64) -> Option<HoldStats> {
        let errors: Vec<f64> = (0..self.len())
            .filter(|&i| self.time[i] >= from_s && self.time[i] < to_s)
            .filter(|&i| self.is_holding(i) && !self.excursion[i] && !self.stick_override[i])
            .map(|i| self.hold_error_cm(i))
            .collect();
        if errors.is_empty() {
            return None;
        }
        let max_abs_error_cm = errors.iter().fold(0.0_f64, |m, e| m.max(e.abs()));
        let rms_error_cm = (errors.iter().map(|e| e * e).sum::<f64>() / errors.len() as f64).sqrt();
        Some(HoldStats {
            samples: errors.len(),
            max_abs_error_cm,
            rms_error_cm,
        })
    }
}

// ---------------------------------------------------------------------------
// Main Loop
// ---------------------------------------------------------------------------

/// Flies `scenario` in closed loop: physics, sensors and the hold controller
/// all step at `loop_hz`, the estimator gates itself to 40 Hz.
pub fn run_scenario(scenario: &Scenario) -> Result<HoldResult, SimError> {
    scenario.validate()?;

    let mut hold = AltitudeHold::new(scenario.config)?;
    let mut vehicle = Vehicle::new(scenario.vehicle.clone(), scenario.config.airframe);
    let mut baro = SimBarometer::new(&scenario.sensors)?;
    let mut ranger = SimRanger::new(&scenario.sensors)?;
    let mut imu = SimImu::new(&scenario.sensors, scenario.config.acc_1g)?;
    let fitted = &scenario.sensors;

    let dt = 1.0 / scenario.loop_hz as f64;
    let dt_us = 1_000_000 / scenario.loop_hz;
    let steps = (scenario.duration_s * scenario.loop_hz as f64).round() as usize;
    let hover = scenario.vehicle.hover_throttle();

    let ticks_per_update = (UPDATE_PERIOD_US / dt_us).max(1) as usize;
    let mut result = HoldResult::with_capacity(steps / ticks_per_update + 1);
    let mut command = RcCommand {
        throttle: scenario.config.pwm_range.min,
        pitch: 0,
    };
    let mut now_us: u32 = 0;
    let mut was_excursion = false;

    tracing::debug!(
        airframe = scenario.config.airframe.label(),
        source = scenario.hold_source.label(),
        steps,
        hover,
        "scenario start"
    );

    for i in 1..=steps {
        let t = i as f64 * dt;

        // -------------------------------------------------------------------
        // PHYSICS (last tick's command)
        // -------------------------------------------------------------------
        let tilt = scenario.attitude_at(t);
        let state = vehicle.step(dt, &command, &tilt);
        baro.set_truth(state.altitude);
        ranger.set_truth(state.altitude);
        imu.push_sample(state.accel, dt_us);
        now_us = now_us.wrapping_add(dt_us);

        let excursion = scenario.is_excursion(t);
        if excursion != was_excursion {
            tracing::trace!(t, excursion, "pilot excursion");
            was_excursion = excursion;
        }

        // -------------------------------------------------------------------
        // FLIGHT CONTROLLER
        // -------------------------------------------------------------------
        let rc_data = scenario.pilot(t, hover);
        let mut rc_command = RcCommand {
            throttle: rc_data.throttle,
            pitch: rc_data.pitch.saturating_sub(STICK_CENTER),
        };
        let input = TickInput {
            now_us,
            switches: scenario.switches(t),
            rc_data,
        };
        let mut sensors = Sensors {
            baro: if fitted.has_baro {
                Some(&mut baro as &mut dyn Barometer)
            } else {
                None
            },
            ranger: if fitted.has_ranger {
                Some(&mut ranger as &mut dyn Ranger)
            } else {
                None
            },
            accel: if fitted.has_accel {
                Some(&mut imu as &mut dyn AccelAccumulator)
            } else {
                None
            },
            attitude: core_attitude(&tilt),
        };
        let status = hold.tick(&input, &mut sensors, &mut rc_command);
        command = rc_command;

        let modes = hold.mode_flags();
        let control = hold.control_state();
        if modes.any_active() && result.engaged_at_s.is_none() {
            tracing::debug!(t, setpoint_cm = control.alt_hold, "hold engaged");
            result.engaged_at_s = Some(t);
        }

        // -------------------------------------------------------------------
        // RECORD
        // -------------------------------------------------------------------
        if matches!(status, EstimateStatus::Updated(_)) {
            result.time.push(t);
            result.true_alt_cm.push(state.altitude * 100.0);
            result.true_vel_cm_s.push(state.velocity * 100.0);
            result.est_alt_cm.push(hold.altitude_cm());
            result.est_vario_cm_s.push(hold.vario_cm_s());
            result.setpoint_cm.push(control.alt_hold);
            result.throttle.push(command.throttle);
            result.pitch.push(command.pitch);
            result.correction.push(control.throttle_adjustment);
            result.integrator.push(control.error_velocity_i);
            result.baro_hold.push(modes.is_active(HoldSource::Baro));
            result.ranger_hold.push(modes.is_active(HoldSource::Ranger));
            result.stick_override.push(hold.is_stick_override());
            result.excursion.push(excursion);
        }
    }

    result.stats = result
        .engaged_at_s
        .and_then(|t0| result.error_stats(t0 + scenario.settle_s, f64::INFINITY));
    if let Some(stats) = result.stats {
        tracing::debug!(
            samples = stats.samples,
            max_abs_error_cm = stats.max_abs_error_cm,
            rms_error_cm = stats.rms_error_cm,
            "hold error"
        );
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pilot_script_multirotor() {
        let s = Scenario {
            stick_excursion: Some(StickExcursion {
                start_s: 10.0,
                end_s: 12.0,
                offset: 100,
            }),
            ..Default::default()
        };
        assert_eq!(s.pilot(0.5, 1500).throttle, 1000);
        assert_eq!(s.pilot(2.0, 1500).throttle, 1550);
        assert_eq!(s.pilot(5.0, 1500).throttle, 1520);
        assert_eq!(s.pilot(11.0, 1500).throttle, 1620);
        assert_eq!(s.pilot(12.0, 1500).throttle, 1520);
        assert_eq!(s.pilot(11.0, 1500).pitch, STICK_CENTER);
        assert!(s.is_excursion(10.0));
        assert!(!s.is_excursion(12.0));
    }

    #[test]
    fn test_pilot_script_fixed_wing() {
        let s = Scenario::fixed_wing();
        assert_eq!(s.pilot(0.5, 1500).pitch, 1500);
        assert_eq!(s.pilot(2.0, 1500).pitch, 1600);
        assert_eq!(s.pilot(6.0, 1500).pitch, 1520);
        assert_eq!(s.pilot(6.0, 1500).throttle, STICK_CENTER);
    }

    #[test]
    fn test_switches_follow_source() {
        let s = Scenario {
            hold_source: HoldSource::Ranger,
            ..Default::default()
        };
        assert_eq!(s.switches(4.9), ModeSwitches::default());
        assert_eq!(
            s.switches(5.0),
            ModeSwitches {
                baro: false,
                ranger: true
            }
        );
    }

    #[test]
    fn test_tilt_window_attitude() {
        let s = Scenario {
            tilt_excursion: Some(TiltExcursion {
                start_s: 1.0,
                end_s: 2.0,
                roll_deg: 85.0,
            }),
            ..Default::default()
        };
        assert_eq!(s.attitude_at(0.5), UnitQuaternion::identity());
        let att = core_attitude(&s.attitude_at(1.5));
        assert_eq!(att.roll, 850);
    }

    #[test]
    fn test_validation() {
        assert!(Scenario::default().validate().is_ok());
        assert!(Scenario::fixed_wing().validate().is_ok());

        let s = Scenario {
            hold_source: HoldSource::Ranger,
            ..Default::default()
        };
        assert!(matches!(s.validate(), Err(SimError::Scenario(_))));

        let s = Scenario {
            tilt_excursion: Some(TiltExcursion {
                start_s: 3.0,
                end_s: 3.0,
                roll_deg: 10.0,
            }),
            ..Default::default()
        };
        assert!(s.validate().is_err());

        let mut s = Scenario::default();
        s.config.acc_1g = 0;
        assert!(matches!(s.validate(), Err(SimError::Config(_))));

        let s = Scenario {
            loop_hz: 0,
            ..Default::default()
        };
        assert!(run_scenario(&s).is_err());
    }

    #[test]
    fn test_records_after_calibration() {
        let s = Scenario {
            duration_s: 3.0,
            hold_at_s: 2.0,
            ..Default::default()
        };
        let r = run_scenario(&s).unwrap();

        // 20 calibration ticks at 40 Hz, then one record per tick
        assert_eq!(r.len(), 100);
        assert!((r.time[0] - 0.525).abs() < 1e-9);
        assert!((r.engaged_at_s.unwrap() - 2.0).abs() < 0.002);

        let first_hold = (0..r.len()).find(|&i| r.is_holding(i)).unwrap();
        assert!(r.time[first_hold] >= 2.0);
        assert!(!r.is_holding(first_hold - 1));
    }

    #[test]
    fn test_error_stats() {
        let r = HoldResult {
            time: vec![0.0, 1.0, 2.0, 3.0],
            true_alt_cm: vec![100.0, 103.0, 96.0, 500.0],
            setpoint_cm: vec![0, 100, 100, 100],
            baro_hold: vec![false, true, true, true],
            ranger_hold: vec![false; 4],
            stick_override: vec![false, false, false, true],
            excursion: vec![false; 4],
            ..Default::default()
        };
        let stats = r.error_stats(0.0, f64::INFINITY).unwrap();
        assert_eq!(stats.samples, 2);
        assert!((stats.max_abs_error_cm - 4.0).abs() < 1e-12);
        assert!((stats.rms_error_cm - 12.5_f64.sqrt()).abs() < 1e-12);
        assert!(r.error_stats(5.0, 6.0).is_none());
    }
}
