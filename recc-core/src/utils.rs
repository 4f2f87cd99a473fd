//! Guarded arithmetic shared by the stock model and the material layer.
//!
//! Ratios in the model (mass shares, yield inverses, survival rescaling) routinely meet
//! denominators that are exactly zero because a region, product or material is not present.
//! These helpers return zero in that case instead of producing `NaN` or `Inf`.

use ndarray::{Array1, ArrayView1};
use num::Float;

/// Divide `numerator` by `denominator`, returning zero when the denominator is exactly zero.
pub fn guarded_divide<F: Float>(numerator: F, denominator: F) -> F {
    if denominator == F::zero() {
        F::zero()
    } else {
        numerator / denominator
    }
}

/// Inverse of `value`, zero when `value` is exactly zero.
pub fn guarded_inverse<F: Float>(value: F) -> F {
    guarded_divide(F::one(), value)
}

/// Shares of each entry in the total of `values`.
///
/// All shares are zero if the total is zero.
pub fn shares(values: ArrayView1<f64>) -> Array1<f64> {
    let total = values.sum();
    values.mapv(|v| guarded_divide(v, total))
}

/// Linear ramp over `n` cohorts rising from zero to `potential` at index `switch_time`.
///
/// Values for indices `0..switch_time` are `c * potential / switch_time`; from `switch_time`
/// onwards the ramp is flat at `potential`.
pub fn linear_ramp(n: usize, switch_time: usize, potential: f64) -> Array1<f64> {
    Array1::from_shape_fn(n, |c| {
        if c < switch_time {
            c as f64 * guarded_divide(potential, switch_time as f64)
        } else {
            potential
        }
    })
}

/// Clamp `value` into `[low, high]`.
pub fn clamp(value: f64, low: f64, high: f64) -> f64 {
    value.max(low).min(high)
}

#[cfg(test)]
mod tests {
    use super::*;
    use is_close::is_close;
    use ndarray::array;

    #[test]
    fn guarded_divide_returns_zero_for_zero_denominator() {
        assert_eq!(guarded_divide(5.0_f64, 0.0), 0.0);
        assert_eq!(guarded_divide(0.0_f64, 0.0), 0.0);
        assert!(is_close!(guarded_divide(5.0_f64, 2.0), 2.5));
    }

    #[test]
    fn guarded_inverse_of_zero_is_zero() {
        assert_eq!(guarded_inverse(0.0_f64), 0.0);
        assert!(is_close!(guarded_inverse(4.0_f64), 0.25));
    }

    #[test]
    fn shares_of_empty_total_are_zero() {
        let s = shares(array![0.0, 0.0, 0.0].view());
        assert!(s.iter().all(|v| *v == 0.0));

        let s = shares(array![1.0, 3.0].view());
        assert!(is_close!(s[0], 0.25));
        assert!(is_close!(s[1], 0.75));
    }

    #[test]
    fn linear_ramp_reaches_potential_at_switch_time() {
        let ramp = linear_ramp(10, 4, 0.2);
        assert_eq!(ramp[0], 0.0);
        assert!(is_close!(ramp[2], 0.1));
        assert!(is_close!(ramp[4], 0.2));
        assert!(is_close!(ramp[9], 0.2));
    }

    #[test]
    fn linear_ramp_with_zero_potential_is_flat() {
        let ramp = linear_ramp(5, 3, 0.0);
        assert!(ramp.iter().all(|v| *v == 0.0));
    }
}
