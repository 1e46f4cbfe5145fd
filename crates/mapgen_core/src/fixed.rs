//! Quantization helpers. Every value crossing into a compact artifact
//! domain goes through these so out-of-range inputs clamp, never wrap.

/// Round then clamp into `u8`.
pub fn clamp_u8(value: f64) -> u8 {
    if value.is_nan() {
        return 0;
    }
    value.round().clamp(f64::from(u8::MIN), f64::from(u8::MAX)) as u8
}

/// Round then clamp into `i8`.
pub fn clamp_i8(value: f64) -> i8 {
    if value.is_nan() {
        return 0;
    }
    value.round().clamp(f64::from(i8::MIN), f64::from(i8::MAX)) as i8
}

/// Round then clamp into `i16`; elevations in meters.
pub fn clamp_i16(value: f64) -> i16 {
    if value.is_nan() {
        return 0;
    }
    value.round().clamp(f64::from(i16::MIN), f64::from(i16::MAX)) as i16
}

/// Clamp into `[0, 1]`, mapping NaN to 0.
pub fn clamp01(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 1.0)
}

/// Normalized position of `value` between `low` and `high`, clamped to `[0, 1]`.
pub fn ramp(value: f64, low: f64, high: f64) -> f64 {
    if high <= low {
        return if value >= high { 1.0 } else { 0.0 };
    }
    clamp01((value - low) / (high - low))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn out_of_range_values_saturate() {
        assert_eq!(clamp_i8(300.0), 127);
        assert_eq!(clamp_i8(-300.0), -128);
        assert_eq!(clamp_u8(-4.0), 0);
        assert_eq!(clamp_u8(999.0), 255);
        assert_eq!(clamp_u8(f64::NAN), 0);
    }

    #[test]
    fn ramp_handles_degenerate_span() {
        assert_eq!(ramp(5.0, 3.0, 3.0), 1.0);
        assert_eq!(ramp(1.0, 3.0, 3.0), 0.0);
        assert!((ramp(2.0, 0.0, 4.0) - 0.5).abs() < 1e-12);
    }

    proptest! {
        #[test]
        fn clamp_i8_never_wraps(value in -1.0e6f64..1.0e6f64) {
            let clamped = i32::from(clamp_i8(value));
            if value >= 127.0 {
                prop_assert_eq!(clamped, 127);
            } else if value <= -128.0 {
                prop_assert_eq!(clamped, -128);
            } else {
                prop_assert!((f64::from(clamped) - value).abs() <= 0.5);
            }
        }

        #[test]
        fn clamp_u8_never_wraps(value in -1.0e6f64..1.0e6f64) {
            let clamped = clamp_u8(value);
            if value >= 255.0 {
                prop_assert_eq!(clamped, 255);
            } else if value <= 0.0 {
                prop_assert_eq!(clamped, 0);
            }
        }

        #[test]
        fn clamp01_never_exits_bounds(value in -10.0f64..10.0f64) {
            let clamped = clamp01(value);
            prop_assert!((0.0..=1.0).contains(&clamped));
        }
    }
}
