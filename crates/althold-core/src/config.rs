// ---------------------------------------------------------------------------
// Gains
// ---------------------------------------------------------------------------

/// One P/I/D triple in the 8-bit fixed-point convention of the flight controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Gain {
    pub p: u8,
    pub i: u8,
    pub d: u8,
}

impl Gain {
    pub const fn new(p: u8, i: u8, d: u8) -> Self {
        Self { p, i, d }
    }
}

/// Gains for the two altitude-hold axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PidGains {
    /// Altitude (outer) loop. Only `p` is used.
    pub alt: Gain,
    /// Vertical velocity (inner) loop.
    pub vel: Gain,
}

impl Default for PidGains {
    fn default() -> Self {
        Self {
            alt: Gain::new(50, 0, 0),
            vel: Gain::new(55, 55, 75),
        }
    }
}

// ---------------------------------------------------------------------------
// Vehicle / RC configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Airframe {
    #[default]
    Multirotor,
    FixedWing,
}

impl Airframe {
    pub fn label(self) -> &'static str {
        match self {
            Self::Multirotor => "Multirotor",
            Self::FixedWing => "Fixed-wing",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RcControlsConfig {
    /// Throttle deviation from the hold baseline (PWM µs) that counts as pilot input.
    pub alt_hold_deadband: u8,
    /// `true`: stick outside the deadband bypasses the controller.
    /// `false`: stick outside the deadband commands a climb/sink rate.
    pub alt_hold_fast_change: bool,
}

impl Default for RcControlsConfig {
    fn default() -> Self {
        Self {
            alt_hold_deadband: 40,
            alt_hold_fast_change: true,
        }
    }
}

/// Complementary filter coefficients. Weight given to the accelerometer path.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BaroConfig {
    pub cf_alt: f32,
    pub cf_vel: f32,
}

impl Default for BaroConfig {
    fn default() -> Self {
        Self {
            cf_alt: 0.965,
            cf_vel: 0.985,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AirplaneConfig {
    pub fixedwing_althold_reversed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PwmRange {
    pub min: i16,
    pub max: i16,
}

impl Default for PwmRange {
    fn default() -> Self {
        Self {
            min: 1000,
            max: 2000,
        }
    }
}

// ---------------------------------------------------------------------------
// Top-level
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct AltHoldConfig {
    pub gains: PidGains,
    pub rc: RcControlsConfig,
    pub baro: BaroConfig,
    /// Accelerometer LSB per 1 g.
    pub acc_1g: u16,
    pub airframe: Airframe,
    pub airplane: AirplaneConfig,
    pub pwm_range: PwmRange,
}

impl Default for AltHoldConfig {
    fn default() -> Self {
        Self {
            gains: PidGains::default(),
            rc: RcControlsConfig::default(),
            baro: BaroConfig::default(),
            acc_1g: 512,
            airframe: Airframe::Multirotor,
            airplane: AirplaneConfig::default(),
            pwm_range: PwmRange::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("complementary filter coefficient `{name}` must be within [0, 1], got {value}")]
    FilterCoefficient { name: &'static str, value: f32 },
    #[error("accelerometer scale acc_1g must be non-zero")]
    ZeroAccScale,
    #[error("PWM range is empty ({min}..{max})")]
    EmptyPwmRange { min: i16, max: i16 },
}

impl AltHoldConfig {
    /// Checks the values the control loop relies on being sane.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [("cf_alt", self.baro.cf_alt), ("cf_vel", self.baro.cf_vel)] {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::FilterCoefficient { name, value });
            }
        }
        if self.acc_1g == 0 {
            return Err(ConfigError::ZeroAccScale);
        }
        if self.pwm_range.min >= self.pwm_range.max {
            return Err(ConfigError::EmptyPwmRange {
                min: self.pwm_range.min,
                max: self.pwm_range.max,
            });
        }
        Ok(())
    }

    /// cm/s of velocity per (raw accel LSB × µs).
    pub fn acc_vel_scale(&self) -> f32 {
        9.80665 / self.acc_1g as f32 / 10_000.0
    }
}
