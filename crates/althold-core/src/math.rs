//! Integer helpers shared by the estimator and the controller.

/// Forces values inside `±deadband` to zero and shifts the rest towards zero
/// by `deadband`, so the output stays continuous at the band edge.
#[inline]
pub fn apply_deadband(value: i32, deadband: i32) -> i32 {
    if value.abs() < deadband {
        0
    } else if value > 0 {
        value - deadband
    } else if value < 0 {
        value + deadband
    } else {
        value
    }
}

/// Symmetric clamp to `±limit`.
#[inline]
pub fn constrain_sym(value: i32, limit: i32) -> i32 {
    value.clamp(-limit, limit)
}

/// Float to integer conversion that truncates toward zero and saturates,
/// matching the fixed-point behaviour the gains were tuned against.
#[inline]
pub fn trunc_i32(value: f32) -> i32 {
    // `as` saturates on overflow and maps NaN to 0
    value as i32
}

/// Round to nearest with ties to even, the default FPU rounding mode.
/// Written out by hand since float rounding is not available in `core`.
#[inline]
pub fn round_i32(value: f32) -> i32 {
    let whole = trunc_i32(value);
    let frac = value - whole as f32;
    let odd = whole % 2 != 0;
    if frac > 0.5 || (frac == 0.5 && odd) {
        whole.saturating_add(1)
    } else if frac < -0.5 || (frac == -0.5 && odd) {
        whole.saturating_sub(1)
    } else {
        whole
    }
}
