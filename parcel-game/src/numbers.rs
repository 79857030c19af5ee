//! Numeric conversion helpers centralizing safe numeric casts.

use num_traits::cast::cast;

/// Round a f64 and clamp it to the i32 range, returning 0 for NaN values.
#[must_use]
pub fn round_f64_to_i32(value: f64) -> i32 {
    if value.is_nan() {
        return 0;
    }
    let min = cast::<i32, f64>(i32::MIN).unwrap_or(f64::MIN);
    let max = cast::<i32, f64>(i32::MAX).unwrap_or(f64::MAX);
    let clamped = value.clamp(min, max).round();
    cast::<f64, i32>(clamped).unwrap_or(0)
}

/// Round a f32 and clamp it to the i32 range, returning 0 for NaN values.
#[must_use]
pub fn round_f32_to_i32(value: f32) -> i32 {
    round_f64_to_i32(f64::from(value))
}

/// Round a f64 and clamp it to the i64 range, returning 0 for non-finite values.
#[must_use]
pub fn round_f64_to_i64(value: f64) -> i64 {
    if !value.is_finite() {
        return 0;
    }
    let min = cast::<i64, f64>(i64::MIN).unwrap_or(f64::MIN);
    let max = cast::<i64, f64>(i64::MAX).unwrap_or(f64::MAX);
    let clamped = value.clamp(min, max).round();
    cast::<f64, i64>(clamped).unwrap_or(0)
}

/// Convert u32 to f32 while allowing precision loss in a single location.
#[must_use]
pub fn u32_to_f32(value: u32) -> f32 {
    cast::<u32, f32>(value).unwrap_or(0.0)
}

/// Convert i32 to f32 while allowing precision loss in a single location.
#[must_use]
pub fn i32_to_f32(value: i32) -> f32 {
    cast::<i32, f32>(value).unwrap_or(0.0)
}

/// Convert i64 to f64 while allowing precision loss in a single location.
#[must_use]
pub fn i64_to_f64(value: i64) -> f64 {
    cast::<i64, f64>(value).unwrap_or(0.0)
}

/// Floor a f64 into the u32 range, returning 0 for NaN and negatives.
#[must_use]
pub fn floor_f64_to_u32(value: f64) -> u32 {
    if value.is_nan() {
        return 0;
    }
    let max = f64::from(u32::MAX);
    cast::<f64, u32>(value.clamp(0.0, max).floor()).unwrap_or(0)
}

/// Narrow a f64 to f32, returning 0 for values f32 cannot hold.
#[must_use]
pub fn f64_to_f32(value: f64) -> f32 {
    cast::<f64, f32>(value)
        .filter(|narrowed: &f32| narrowed.is_finite())
        .unwrap_or(0.0)
}

/// Clamp a signed persisted value into the u32 range.
#[must_use]
pub fn clamp_i64_to_u32(value: i64) -> u32 {
    u32::try_from(value.max(0)).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounding_handles_nan_and_extremes() {
        assert_eq!(round_f64_to_i32(f64::NAN), 0);
        assert_eq!(round_f64_to_i32(f64::INFINITY), i32::MAX);
        assert_eq!(round_f32_to_i32(2.5), 3);
        assert_eq!(round_f32_to_i32(-1.4), -1);
        assert_eq!(round_f64_to_i64(f64::NAN), 0);
        assert_eq!(round_f64_to_i64(41.6), 42);
        assert_eq!(floor_f64_to_u32(7.9), 7);
        assert_eq!(floor_f64_to_u32(-2.0), 0);
        assert_eq!(floor_f64_to_u32(1.0e12), u32::MAX);
        assert_eq!(floor_f64_to_u32(f64::NAN), 0);
        assert!((f64_to_f32(0.25) - 0.25).abs() < f32::EPSILON);
    }

    #[test]
    fn integer_conversions_are_lossless_for_small_values() {
        assert!((u32_to_f32(6) - 6.0).abs() < f32::EPSILON);
        assert!((i32_to_f32(-3) + 3.0).abs() < f32::EPSILON);
        assert!((i64_to_f64(12) - 12.0).abs() < f64::EPSILON);
    }

    #[test]
    fn persisted_values_clamp_into_range() {
        assert_eq!(clamp_i64_to_u32(-5), 0);
        assert_eq!(clamp_i64_to_u32(7), 7);
        assert_eq!(clamp_i64_to_u32(i64::MAX), u32::MAX);
    }
}
