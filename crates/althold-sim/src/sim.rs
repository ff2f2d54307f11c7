use althold_core::{Airframe, Attitude, RcCommand};
use nalgebra::{UnitQuaternion, Vector3};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------
pub const GRAVITY: f64 = 9.80665;

// ---------------------------------------------------------------------------
// Parameters
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, PartialEq)]
pub struct VehicleParams {
    // Multirotor
    pub mass: f64,       // kg
    pub max_thrust: f64, // N, all motors at full throttle
    pub drag_coeff: f64, // N per m/s of vertical speed
    pub pwm_min: f64,    // µs, motors idle
    pub pwm_max: f64,    // µs, full thrust

    // Fixed-wing
    pub airspeed: f64,       // m/s
    pub pitch_per_unit: f64, // ° of pitch per unit of pitch command
    pub climb_tau: f64,      // s, climb-rate response time constant

    // Environment
    pub gravity: f64, // m/s²
}

impl Default for VehicleParams {
    fn default() -> Self {
        Self {
            mass: 1.0,
            max_thrust: 2.0 * GRAVITY, // 2:1 thrust to weight
            drag_coeff: 0.3,
            pwm_min: 1000.0,
            pwm_max: 2000.0,
            airspeed: 12.0,
            pitch_per_unit: 0.02,
            climb_tau: 0.5,
            gravity: GRAVITY,
        }
    }
}

impl VehicleParams {
    /// Collective thrust for a throttle command, linear between idle and full.
    pub fn thrust(&self, throttle: i16) -> f64 {
        let span = self.pwm_max - self.pwm_min;
        if span <= 0.0 {
            return 0.0;
        }
        ((throttle as f64 - self.pwm_min) / span).clamp(0.0, 1.0) * self.max_thrust
    }

    /// Throttle at which level thrust balances weight.
    pub fn hover_throttle(&self) -> i16 {
        let fraction = if self.max_thrust > 0.0 {
            (self.mass * self.gravity / self.max_thrust).clamp(0.0, 1.0)
        } else {
            1.0
        };
        (self.pwm_min + fraction * (self.pwm_max - self.pwm_min)).round() as i16
    }
}

// ---------------------------------------------------------------------------
// Vertical State
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct VehicleState {
    pub t: f64,
    pub altitude: f64, // m above ground, up
    pub velocity: f64, // m/s, up
    pub accel: f64,    // m/s², kinematic (what a gravity-compensated accelerometer sees)
}

struct Derivative {
    d_alt: f64,
    d_vel: f64,
}

fn calculate_derivative(
    altitude: f64,
    velocity: f64,
    p: &VehicleParams,
    airframe: Airframe,
    command: &RcCommand,
    cos_tilt: f64,
) -> Derivative {
    let mut d_vel = match airframe {
        Airframe::Multirotor => {
            let thrust = p.thrust(command.throttle) * cos_tilt.max(0.0);
            (thrust - p.drag_coeff * velocity) / p.mass - p.gravity
        }
        Airframe::FixedWing => {
            // Climb rate follows the flight-path angle set by pitch
            let pitch = (command.pitch as f64 * p.pitch_per_unit).to_radians();
            let target = p.airspeed * pitch.sin();
            (target - velocity) / p.climb_tau
        }
    };

    // Ground reaction
    if altitude <= 0.0 && velocity <= 0.0 && d_vel < 0.0 {
        d_vel = 0.0;
    }

    Derivative {
        d_alt: velocity,
        d_vel,
    }
}

// ---------------------------------------------------------------------------
// Vehicle
// ---------------------------------------------------------------------------
#[derive(Debug, Clone)]
pub struct Vehicle {
    pub params: VehicleParams,
    airframe: Airframe,
    state: VehicleState,
}

impl Vehicle {
    /// Vehicle at rest on the ground.
    pub fn new(params: VehicleParams, airframe: Airframe) -> Self {
        Self {
            params,
            airframe,
            state: VehicleState::default(),
        }
    }

    pub fn airframe(&self) -> Airframe {
        self.airframe
    }

    pub fn state(&self) -> VehicleState {
        self.state
    }

    /// Advances the vertical dynamics by `dt` seconds with RK4.
    pub fn step(&mut self, dt: f64, command: &RcCommand, tilt: &UnitQuaternion<f64>) -> VehicleState {
        let cos_tilt = cos_tilt(tilt);
        let p = &self.params;
        let s = self.state;
        let deriv = |alt: f64, vel: f64| {
            calculate_derivative(alt, vel, p, self.airframe, command, cos_tilt)
        };

        let k1 = deriv(s.altitude, s.velocity);
        let k2 = deriv(s.altitude + k1.d_alt * dt * 0.5, s.velocity + k1.d_vel * dt * 0.5);
        let k3 = deriv(s.altitude + k2.d_alt * dt * 0.5, s.velocity + k2.d_vel * dt * 0.5);
        let k4 = deriv(s.altitude + k3.d_alt * dt, s.velocity + k3.d_vel * dt);

        let mut altitude =
            s.altitude + (k1.d_alt + k2.d_alt * 2.0 + k3.d_alt * 2.0 + k4.d_alt) * (dt / 6.0);
        let mut velocity =
            s.velocity + (k1.d_vel + k2.d_vel * 2.0 + k3.d_vel * 2.0 + k4.d_vel) * (dt / 6.0);

        // Touchdown
        if altitude < 0.0 {
            altitude = 0.0;
            velocity = velocity.max(0.0);
        }

        let accel = if dt > 0.0 {
            (velocity - s.velocity) / dt
        } else {
            0.0
        };
        self.state = VehicleState {
            t: s.t + dt,
            altitude,
            velocity,
            accel,
        };
        self.state
    }
}

// ---------------------------------------------------------------------------
// Attitude helpers
// ---------------------------------------------------------------------------

/// Attitude from roll and pitch in degrees, yaw zero.
pub fn tilt_attitude(roll_deg: f64, pitch_deg: f64) -> UnitQuaternion<f64> {
    UnitQuaternion::from_euler_angles(roll_deg.to_radians(), pitch_deg.to_radians(), 0.0)
}

/// Cosine of the angle between body Z and earth Z.
pub fn cos_tilt(att: &UnitQuaternion<f64>) -> f64 {
    att.transform_vector(&Vector3::z()).z
}

/// The attitude snapshot the flight controller's orientation estimator would report.
pub fn core_attitude(att: &UnitQuaternion<f64>) -> Attitude {
    let (roll, pitch, _yaw) = att.euler_angles();
    Attitude {
        roll: (roll.to_degrees() * 10.0).round() as i16,
        pitch: (pitch.to_degrees() * 10.0).round() as i16,
        cos_tilt: cos_tilt(att) as f32,
    }
}
