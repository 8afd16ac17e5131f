//! Raw sample → signed unit range.
//!
//! The map is piecewise linear around the calibrated center, so an asymmetric
//! calibration still sends the center to exactly `0.0` and each end to `±1.0`.

use crate::caps::AxisDescriptor;

/// Normalize `raw` using the descriptor's calibrated bounds.
#[inline]
pub fn normalize(raw: i32, axis: &AxisDescriptor) -> f32 {
    normalize_range(
        raw,
        axis.calibrated_min,
        axis.calibrated_center,
        axis.calibrated_max,
    )
}

/// Normalize `raw` against explicit bounds. A zero-width half range yields `0.0`.
pub fn normalize_range(raw: i32, min: i32, center: i32, max: i32) -> f32 {
    let raw = i64::from(raw);
    let center = i64::from(center);
    let span = if raw < center {
        center - i64::from(min)
    } else {
        i64::from(max) - center
    };
    if span <= 0 {
        return 0.0;
    }
    let n = (raw - center) as f64 / span as f64;
    n.clamp(-1.0, 1.0) as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn center_is_exactly_zero() {
        assert_eq!(normalize_range(0, -500, 0, 500), 0.0);
        assert_eq!(normalize_range(700, 0, 700, 1023), 0.0);
    }

    #[test]
    fn asymmetric_halves() {
        // 100 below a center 200 above min; 100 above a center 400 below max.
        assert_eq!(normalize_range(100, 0, 200, 600), -0.5);
        assert_eq!(normalize_range(300, 0, 200, 600), 0.25);
        assert_eq!(normalize_range(0, 0, 200, 600), -1.0);
        assert_eq!(normalize_range(600, 0, 200, 600), 1.0);
    }

    #[test]
    fn degenerate_halves_are_zero() {
        assert_eq!(normalize_range(-10, 0, 0, 100), 0.0);
        assert_eq!(normalize_range(110, 0, 100, 100), 0.0);
        assert_eq!(normalize_range(100, 0, 100, 100), 0.0);
        assert_eq!(normalize_range(5, 5, 5, 5), 0.0);
    }

    #[test]
    fn live_half_still_scales_when_the_other_is_degenerate() {
        assert_eq!(normalize_range(10, 0, 100, 100), -0.9);
        assert_eq!(normalize_range(50, 0, 0, 100), 0.5);
    }

    #[test]
    fn out_of_range_clamps() {
        assert_eq!(normalize_range(900, -500, 0, 500), 1.0);
        assert_eq!(normalize_range(i32::MIN, -500, 0, 500), -1.0);
    }

    #[test]
    fn translation_example() {
        assert_eq!(normalize_range(100, -500, 0, 500), 0.2);
        assert_eq!(normalize_range(-100, -500, 0, 500), -0.2);
    }
}
