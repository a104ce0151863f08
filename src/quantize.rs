//! Bit-depth reduction
//!
//! Both entry points snap a sample onto a signed fixed-point lattice with
//! `2^(bits-1) - 1` steps per polarity, truncating toward zero rather than
//! rounding. The truncation is what gives low bit depths their crunch.
//!
//! [`quantize_clamped`] is specialised on a compile-time bit depth and limits
//! its input to [-1, 1] first. [`quantize`] takes the depth at run time and
//! leaves range control to the caller: an input outside [-1, 1] produces an
//! output outside [-1, 1].

/// Largest lattice index for a depth in `2..=64`.
#[inline]
fn lattice_max(bits: u32) -> f64 {
    ((1u128 << (bits - 1)) - 1) as f64
}

#[inline]
fn truncate_to_lattice(value: f64, bits: u32) -> f64 {
    let max = lattice_max(bits);
    (value * max) as i64 as f64 / max
}

/// Quantize to a run-time bit depth without limiting the input range.
///
/// - `bits == 0` is silence.
/// - `bits == 1` is the sign, with zero counted as positive.
/// - `bits > 64` passes the value through unchanged.
#[inline]
pub fn quantize(value: f64, bits: u32) -> f64 {
    match bits {
        0 => 0.0,
        1 => {
            if value >= 0.0 {
                1.0
            } else {
                -1.0
            }
        }
        b if b > 64 => value,
        b => truncate_to_lattice(value, b),
    }
}

/// Quantize to a compile-time bit depth, limiting the input to [-1, 1].
///
/// The special depths behave as in [`quantize`]; in particular `BITS > 64`
/// returns the input untouched, unclamped.
#[inline]
pub fn quantize_clamped<const BITS: u32>(value: f64) -> f64 {
    if BITS == 0 {
        0.0
    } else if BITS == 1 {
        if value >= 0.0 {
            1.0
        } else {
            -1.0
        }
    } else if BITS > 64 {
        value
    } else if value >= 1.0 {
        1.0
    } else if value <= -1.0 {
        -1.0
    } else {
        truncate_to_lattice(value, BITS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn sweep() -> impl Iterator<Item = f64> {
        (0..=400).map(|i| -1.0 + i as f64 * 0.005)
    }

    #[test]
    fn test_lattice_membership() {
        for bits in 2..=16u32 {
            let max = ((1i64 << (bits - 1)) - 1) as f64;
            for v in sweep() {
                let q = quantize(v, bits);
                let k = q * max;
                assert_abs_diff_eq!(k, k.round(), epsilon = 1e-6);
                assert!(k.round().abs() <= max, "{} bits: {} -> {}", bits, v, q);
            }
            assert_eq!(quantize(0.0, bits), 0.0);
        }
    }

    #[test]
    fn test_zero_bits_is_silence() {
        for v in sweep() {
            assert_eq!(quantize(v, 0), 0.0);
            assert_eq!(quantize_clamped::<0>(v), 0.0);
        }
    }

    #[test]
    fn test_one_bit_is_sign() {
        for v in sweep() {
            let expected = if v >= 0.0 { 1.0 } else { -1.0 };
            assert_eq!(quantize(v, 1), expected);
            assert_eq!(quantize_clamped::<1>(v), expected);
        }
        assert_eq!(quantize(0.0, 1), 1.0);
    }

    #[test]
    fn test_wide_depth_passthrough() {
        assert_eq!(quantize(0.123456789, 65), 0.123456789);
        assert_eq!(quantize(3.5, 200), 3.5);
        assert_eq!(quantize_clamped::<65>(3.5), 3.5);
    }

    #[test]
    fn test_truncates_toward_zero() {
        // 3 bits: max = 3, steps of 1/3
        assert_abs_diff_eq!(quantize(0.6, 3), 1.0 / 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(quantize(-0.6, 3), -1.0 / 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(quantize(0.3, 3), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_eight_bit_resolution() {
        assert_abs_diff_eq!(quantize_clamped::<8>(0.5), 63.0 / 127.0, epsilon = 1e-12);
        assert_eq!(quantize_clamped::<8>(1.0), 1.0);
        assert_eq!(quantize_clamped::<8>(-1.0), -1.0);
    }

    #[test]
    fn test_clamped_limits_out_of_range_input() {
        assert_eq!(quantize_clamped::<8>(2.5), 1.0);
        assert_eq!(quantize_clamped::<8>(-7.0), -1.0);
    }

    #[test]
    fn test_run_time_form_does_not_clamp() {
        // out-of-band input leaves the [-1, 1] lattice
        let q = quantize(2.5, 8);
        assert_abs_diff_eq!(q, 317.0 / 127.0, epsilon = 1e-12);
        assert!(q > 1.0);
    }

    #[test]
    fn test_forms_agree_in_range() {
        for v in sweep() {
            assert_eq!(quantize(v, 8), quantize_clamped::<8>(v));
            assert_eq!(quantize(v, 12), quantize_clamped::<12>(v));
        }
    }

    #[test]
    fn test_sixty_four_bits_is_near_identity() {
        assert_abs_diff_eq!(quantize(0.25, 64), 0.25, epsilon = 1e-12);
        assert_abs_diff_eq!(quantize_clamped::<64>(-0.75), -0.75, epsilon = 1e-12);
    }
}
