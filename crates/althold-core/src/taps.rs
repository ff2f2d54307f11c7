use zerocopy::IntoBytes;

/// Diagnostic values from the last estimator tick, for debug telemetry.
///
/// Laid out as three `i16` slots so it can be copied straight into a
/// blackbox debug frame.
#[repr(C)]
#[derive(zerocopy::IntoBytes, zerocopy::Immutable, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DebugTaps {
    pub acc_z: i16,  // Mean vertical accel (raw LSB)
    pub vel: i16,    // Accel-integrated velocity before baro correction (cm/s)
    pub height: i16, // Accel/baro filter altitude (cm)
}

impl DebugTaps {
    pub const SLOTS: usize = 3;

    /// Values in debug-slot order.
    pub fn slots(&self) -> [i16; Self::SLOTS] {
        [self.acc_z, self.vel, self.height]
    }

    /// Raw bytes in native endianness.
    pub fn bytes(&self) -> &[u8] {
        self.as_bytes()
    }
}
