//! Layering of effective product lifetimes.
//!
//! All functions operate on lifetime tables indexed `[k, q, c]` (local good, sector region,
//! cohort) and scale them in place.

use ndarray::{Array3, ArrayView1, ArrayView2};
use recc_core::time::TimeAxis;
use recc_core::utils::linear_ramp;

/// Shorten or lengthen future vehicle cohorts under car-sharing.
///
/// Cohort `offset + t` is scaled by `1 - share[t]/100 + share[t] * stock_factor[r]/100`.
pub fn apply_car_sharing(
    lifetime: &mut Array3<f64>,
    share: ArrayView1<f64>,
    stock_factor: ArrayView1<f64>,
    time: &TimeAxis,
) {
    let (n_goods, n_regions, _) = lifetime.dim();
    for t in time.model_years() {
        let c = time.cohort_index_for_year(t);
        for r in 0..n_regions {
            let factor = 1.0 - share[t] / 100.0 + share[t] * stock_factor[r] / 100.0;
            for k in 0..n_goods {
                lifetime[[k, r, c]] *= factor;
            }
        }
    }
}

/// Lifetime extension of the cohorts entering from the base year on, following the
/// strategy scale-up: cohort `offset + t` gets `1 + scale_up[t, q] * extension[k, q]`.
pub fn extend_future_cohorts(
    lifetime: &mut Array3<f64>,
    extension: ArrayView2<f64>,
    scale_up: ArrayView2<f64>,
    time: &TimeAxis,
) {
    let (n_goods, n_regions, _) = lifetime.dim();
    for t in time.model_years() {
        let c = time.cohort_index_for_year(t);
        for q in 0..n_regions {
            for k in 0..n_goods {
                lifetime[[k, q, c]] *= 1.0 + scale_up[[t, q]] * extension[[k, q]];
            }
        }
    }
}

/// Lifetime extension of every cohort, ramped linearly from zero at cohort 0 to the full
/// potential at the switch time.
pub fn extend_all_cohorts(lifetime: &mut Array3<f64>, extension: ArrayView2<f64>, time: &TimeAxis) {
    let (n_goods, n_regions, n_cohorts) = lifetime.dim();
    for k in 0..n_goods {
        for q in 0..n_regions {
            let ramp = linear_ramp(n_cohorts, time.switch_time(), extension[[k, q]]);
            for c in 0..n_cohorts {
                lifetime[[k, q, c]] *= 1.0 + ramp[c];
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::{array, Array2};

    fn time() -> TimeAxis {
        // cohorts 2010..=2017, model years 2014..=2017
        TimeAxis::new(2010, 8, 4).unwrap()
    }

    #[test]
    fn car_sharing_only_touches_future_cohorts() {
        let time = time();
        let mut lifetime = Array3::from_elem((1, 1, 8), 10.0);
        apply_car_sharing(
            &mut lifetime,
            array![0.0, 50.0, 50.0, 50.0].view(),
            array![0.5].view(),
            &time,
        );
        assert_eq!(lifetime[[0, 0, 3]], 10.0);
        // base-year cohort has no sharing
        assert_eq!(lifetime[[0, 0, 4]], 10.0);
        // 1 - 0.5 + 0.25
        assert_relative_eq!(lifetime[[0, 0, 5]], 7.5);
        assert_relative_eq!(lifetime[[0, 0, 7]], 7.5);
    }

    #[test]
    fn future_cohort_extension_follows_scale_up() {
        let time = time();
        let mut lifetime = Array3::from_elem((1, 1, 8), 10.0);
        let scale_up = Array2::from_shape_vec((4, 1), vec![0.0, 0.5, 1.0, 1.0]).unwrap();
        extend_future_cohorts(&mut lifetime, array![[0.2]].view(), scale_up.view(), &time);
        assert_eq!(lifetime[[0, 0, 2]], 10.0);
        assert_eq!(lifetime[[0, 0, 4]], 10.0);
        assert_relative_eq!(lifetime[[0, 0, 5]], 11.0);
        assert_relative_eq!(lifetime[[0, 0, 6]], 12.0);
    }

    #[test]
    fn all_cohort_extension_is_ramped_to_switch_time() {
        let time = time();
        let mut lifetime = Array3::from_elem((1, 1, 8), 10.0);
        extend_all_cohorts(&mut lifetime, array![[0.5]].view(), &time);
        assert_eq!(lifetime[[0, 0, 0]], 10.0);
        // switch time is 5
        assert_relative_eq!(lifetime[[0, 0, 1]], 11.0);
        assert_relative_eq!(lifetime[[0, 0, 5]], 15.0);
        assert_relative_eq!(lifetime[[0, 0, 7]], 15.0);
    }
}
