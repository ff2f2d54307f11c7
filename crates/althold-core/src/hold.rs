use crate::config::{AltHoldConfig, ConfigError};
use crate::controller::{CascadeController, ControlState};
use crate::estimator::{AltitudeEstimator, EstimateStatus};
use crate::mode::{HoldSource, ModeFlags, ModeTransition};
use crate::output::{OutputAdapter, RcCommand, RcData};
use crate::sensors::Sensors;
use crate::taps::DebugTaps;

/// Hold-mode switch positions decoded from the receiver.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModeSwitches {
    pub baro: bool,
    pub ranger: bool,
}

/// Everything the loop reads from the RC stage for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickInput {
    pub now_us: u32,
    pub switches: ModeSwitches,
    pub rc_data: RcData,
}

/// The altitude-hold subsystem: estimator, controller, mode latches and
/// output adapter sharing one set of state.
#[derive(Debug, Clone)]
pub struct AltitudeHold {
    config: AltHoldConfig,
    estimator: AltitudeEstimator,
    controller: CascadeController,
    modes: ModeFlags,
    output: OutputAdapter,
}

impl AltitudeHold {
    pub fn new(config: AltHoldConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            estimator: AltitudeEstimator::new(),
            controller: CascadeController::new(),
            modes: ModeFlags::default(),
            output: OutputAdapter::default(),
        })
    }

    // =====================================================================
    // TICK
    // =====================================================================

    /// One control-loop pass: mode edges, estimator (rate limited), then the
    /// output adapter while a hold mode is engaged.
    ///
    /// A hold mode can only engage when its altitude source is present.
    pub fn tick(
        &mut self,
        input: &TickInput,
        sensors: &mut Sensors<'_>,
        rc_command: &mut RcCommand,
    ) -> EstimateStatus {
        let baro_switch = input.switches.baro && sensors.baro.is_some();
        let ranger_switch = input.switches.ranger && sensors.ranger.is_some();
        self.update_mode_state(HoldSource::Baro, baro_switch, &input.rc_data);
        self.update_mode_state(HoldSource::Ranger, ranger_switch, &input.rc_data);

        let status = self.update_estimate(input.now_us, sensors);
        self.apply(&input.rc_data, rc_command);
        status
    }

    /// Feeds one switch sample. On a rising edge the setpoint, stick baseline,
    /// integrator and correction are re-baselined together.
    pub fn update_mode_state(
        &mut self,
        source: HoldSource,
        switch_active: bool,
        rc_data: &RcData,
    ) -> ModeTransition {
        let transition = self.modes.update(source, switch_active);
        if transition == ModeTransition::Activated {
            self.controller.state.rebaseline(self.estimator.altitude_cm());
            self.output.rebaseline(rc_data.throttle);
        }
        transition
    }

    /// Runs the estimator and, when it produced a new sample, the controller.
    pub fn update_estimate(&mut self, now_us: u32, sensors: &mut Sensors<'_>) -> EstimateStatus {
        let status = self.estimator.update(now_us, sensors, &self.config);
        if let EstimateStatus::Updated(sample) = status {
            self.controller.update(
                &self.config.gains,
                &sensors.attitude,
                self.estimator.altitude_cm(),
                &sample,
            );
        }
        status
    }

    /// Applies the last correction to `rc_command`. No-op unless a hold mode is engaged.
    pub fn apply(&mut self, rc_data: &RcData, rc_command: &mut RcCommand) {
        if !self.modes.any_active() {
            return;
        }
        self.output.apply(
            &self.config,
            &mut self.controller.state,
            self.estimator.altitude_cm(),
            rc_data,
            rc_command,
        );
    }

    // =====================================================================
    // QUERIES
    // =====================================================================

    pub fn config(&self) -> &AltHoldConfig {
        &self.config
    }

    pub fn altitude_cm(&self) -> i32 {
        self.estimator.altitude_cm()
    }

    pub fn vario_cm_s(&self) -> i32 {
        self.estimator.vario_cm_s()
    }

    pub fn debug_taps(&self) -> DebugTaps {
        self.estimator.debug_taps()
    }

    pub fn control_state(&self) -> ControlState {
        self.controller.state
    }

    pub fn mode_flags(&self) -> ModeFlags {
        self.modes
    }

    pub fn initial_throttle_hold(&self) -> i16 {
        self.output.initial_throttle_hold()
    }

    pub fn is_stick_override(&self) -> bool {
        self.output.is_stick_override()
    }
}
