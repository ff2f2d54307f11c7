//! Parameter definitions for the hold simulation.

/// Parameter specification with bounds and step size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamSpec {
    /// Human-readable label.
    pub label: &'static str,
    /// Minimum value.
    pub min: f64,
    /// Maximum value.
    pub max: f64,
    /// Step size for sweeps.
    pub step: f64,
}

impl ParamSpec {
    /// Create a new parameter specification.
    pub const fn new(label: &'static str, min: f64, max: f64, step: f64) -> Self {
        Self {
            label,
            min,
            max,
            step,
        }
    }

    /// `true` when `value` is finite and inside `[min, max]`.
    pub fn contains(&self, value: f64) -> bool {
        value.is_finite() && value >= self.min && value <= self.max
    }
}

/// Vehicle physical parameters.
pub mod vehicle {
    use super::ParamSpec;

    pub const MASS: ParamSpec = ParamSpec::new("Mass (kg)", 0.1, 25.0, 0.1);
    pub const MAX_THRUST: ParamSpec = ParamSpec::new("Max Thrust (N)", 1.0, 1000.0, 0.5);
    pub const DRAG_COEFF: ParamSpec = ParamSpec::new("Vertical Drag (N·s/m)", 0.0, 10.0, 0.05);
    pub const AIRSPEED: ParamSpec = ParamSpec::new("Airspeed (m/s)", 5.0, 60.0, 1.0);
    pub const PITCH_PER_UNIT: ParamSpec = ParamSpec::new("Pitch per Unit (°)", 0.001, 0.2, 0.001);
    pub const CLIMB_TAU: ParamSpec = ParamSpec::new("Climb Response (s)", 0.05, 5.0, 0.05);
}

/// Environmental parameters.
pub mod environment {
    use super::ParamSpec;

    pub const GRAVITY: ParamSpec = ParamSpec::new("Gravity (m/s²)", 1.0, 15.0, 0.1);
}

/// Sensor noise parameters.
pub mod sensor_noise {
    use super::ParamSpec;

    pub const NOISE_SCALE: ParamSpec = ParamSpec::new("Noise Scale", 0.0, 10.0, 0.1);
    pub const BARO_CM: ParamSpec = ParamSpec::new("Baro σ (cm)", 0.0, 200.0, 1.0);
    pub const RANGER_CM: ParamSpec = ParamSpec::new("Ranger σ (cm)", 0.0, 50.0, 0.5);
    pub const ACCEL_MPS2: ParamSpec = ParamSpec::new("Accel σ (m/s²)", 0.0, 5.0, 0.01);
}

/// Pilot script parameters.
pub mod scenario {
    use super::ParamSpec;

    pub const DURATION: ParamSpec = ParamSpec::new("Duration (s)", 1.0, 3600.0, 1.0);
    pub const HOLD_AT: ParamSpec = ParamSpec::new("Hold Engage (s)", 0.0, 3600.0, 0.5);
    pub const STICK_OFFSET: ParamSpec = ParamSpec::new("Stick Offset (µs)", -500.0, 500.0, 10.0);
    pub const TILT: ParamSpec = ParamSpec::new("Tilt (°)", -90.0, 90.0, 1.0);
}

/// Controller gains, 8-bit.
pub mod gains {
    use super::ParamSpec;

    pub const ALT_P: ParamSpec = ParamSpec::new("Alt P", 0.0, 255.0, 1.0);
    pub const VEL_P: ParamSpec = ParamSpec::new("Vel P", 0.0, 255.0, 1.0);
    pub const VEL_I: ParamSpec = ParamSpec::new("Vel I", 0.0, 255.0, 1.0);
    pub const VEL_D: ParamSpec = ParamSpec::new("Vel D", 0.0, 255.0, 1.0);
}

/// Evenly spaced gain values for a sweep, clamped to the 8-bit range.
pub fn gain_sweep(first: u8, last: u8, steps: usize) -> Vec<u8> {
    match steps {
        0 => Vec::new(),
        1 => vec![first],
        _ => {
            let span = last as f64 - first as f64;
            (0..steps)
                .map(|i| {
                    let v = first as f64 + span * i as f64 / (steps - 1) as f64;
                    v.round().clamp(0.0, 255.0) as u8
                })
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_param_spec() {
        let spec = ParamSpec::new("Test", 0.0, 100.0, 1.0);
        assert_eq!(spec.label, "Test");
        assert_eq!(spec.min, 0.0);
        assert_eq!(spec.max, 100.0);
        assert_eq!(spec.step, 1.0);
        assert!(spec.contains(100.0));
        assert!(!spec.contains(-0.5));
        assert!(!spec.contains(f64::NAN));
    }

    #[test]
    fn test_gain_sweep() {
        assert_eq!(gain_sweep(20, 120, 5), vec![20, 45, 70, 95, 120]);
        assert_eq!(gain_sweep(80, 40, 3), vec![80, 60, 40]);
        assert_eq!(gain_sweep(7, 200, 1), vec![7]);
        assert!(gain_sweep(0, 10, 0).is_empty());
    }
}
