//! Per-capita stock demand of the stock-driven sectors.
//!
//! Vehicle demand is derived from passenger-km; building demand is given per capita and
//! optionally lowered by the more-intense-use ramp. Every scenario is floored at the
//! minimum-demand scenario's per-capita stock.

use ndarray::{Array1, Array2, Array3, ArrayView2, Zip};
use recc_core::utils::{clamp, guarded_divide};
use serde::{Deserialize, Serialize};

/// Service demand and sharing parameters of passenger vehicles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VehicleService {
    /// Passenger-km per capita, `[t, r, S]`
    pub service: Array3<f64>,
    /// Vehicle occupancy, `[r, S]`
    pub occupancy: Array2<f64>,
    /// Occupancy of shared rides, `[r, S]`
    pub ride_sharing_occupancy: Array2<f64>,
    /// Percent, `[t, S]`
    pub car_sharing_share: Array2<f64>,
    /// Percent, `[t, S]`
    pub ride_sharing_share: Array2<f64>,
    /// Stock of shared cars relative to owned cars for the same service, `[r, S]`
    pub car_sharing_stock: Array2<f64>,
    /// Vehicle-km per vehicle and year, `[t, r, S]`
    pub kilometrage: Array3<f64>,
}

impl VehicleService {
    /// Vehicle stock per capita, `[t, r]`.
    ///
    /// Entries whose divisor is zero stay at zero.
    pub fn per_capita_stock(&self, s: usize) -> Array2<f64> {
        let (nt, nr, _) = self.service.dim();
        Array2::from_shape_fn((nt, nr), |(t, r)| {
            let occupancy_divisor = 1.0
                + (self.ride_sharing_occupancy[[r, s]] - 1.0) * self.car_sharing_share[[t, s]]
                    / 100.0;
            let vehicle_km = guarded_divide(
                self.service[[t, r, s]],
                self.occupancy[[r, s]] * occupancy_divisor,
            );
            let stock_divisor = 1.0
                + (guarded_divide(1.0, self.car_sharing_stock[[r, s]]) - 1.0)
                    * self.ride_sharing_share[[t, s]]
                    / 100.0;
            guarded_divide(vehicle_km, self.kilometrage[[t, r, s]] * stock_divisor)
        })
    }
}

/// Multiplier that lowers building stock per capita under more-intense use, `[t]`.
///
/// A cubic spline through `(0, 1)`, `(2, 1)`, `(Nt-5, f)` and `(Nt, f)` with zero curvature
/// at the start and zero slope at the end, clamped into `[f, 1]`, where `f` is the remaining
/// fraction. Horizons too short for the spline fall back to linear interpolation between
/// the same points.
pub fn more_intense_use_ramp(n_years: usize, remaining_fraction: f64) -> Array1<f64> {
    let low = remaining_fraction.min(1.0);
    let ramp = if n_years >= 8 {
        let knots = [0.0, 2.0, (n_years - 5) as f64, n_years as f64];
        let values = [1.0, 1.0, low, low];
        let spline = CubicSpline::natural_clamped(knots, values);
        Array1::from_shape_fn(n_years, |t| spline.value(t as f64))
    } else {
        let end = (n_years.max(1) - 1) as f64;
        Array1::from_shape_fn(n_years, |t| {
            if end == 0.0 {
                1.0
            } else {
                1.0 + (low - 1.0) * t as f64 / end
            }
        })
    };
    ramp.mapv(|v| clamp(v, low, 1.0))
}

/// Cubic spline through four knots, second derivative zero at the first knot and first
/// derivative zero at the last.
struct CubicSpline {
    knots: [f64; 4],
    values: [f64; 4],
    moments: [f64; 4],
}

impl CubicSpline {
    fn natural_clamped(knots: [f64; 4], values: [f64; 4]) -> Self {
        let h = [knots[1] - knots[0], knots[2] - knots[1], knots[3] - knots[2]];
        let slope = |i: usize| (values[i + 1] - values[i]) / h[i];

        // Unknowns M1, M2, M3 with M0 = 0:
        //   2(h0+h1) M1 + h1 M2            = 6 (s1 - s0)
        //   h1 M1 + 2(h1+h2) M2 + h2 M3    = 6 (s2 - s1)
        //   h2 M2 + 2 h2 M3                = -6 s2
        let mut a = [0.0, h[1], h[2]];
        let mut b = [2.0 * (h[0] + h[1]), 2.0 * (h[1] + h[2]), 2.0 * h[2]];
        let c = [h[1], h[2], 0.0];
        let mut d = [
            6.0 * (slope(1) - slope(0)),
            6.0 * (slope(2) - slope(1)),
            -6.0 * slope(2),
        ];
        // Thomas algorithm
        for i in 1..3 {
            let w = a[i] / b[i - 1];
            b[i] -= w * c[i - 1];
            d[i] -= w * d[i - 1];
            a[i] = 0.0;
        }
        let mut m = [0.0; 3];
        m[2] = d[2] / b[2];
        for i in (0..2).rev() {
            m[i] = (d[i] - c[i] * m[i + 1]) / b[i];
        }
        Self {
            knots,
            values,
            moments: [0.0, m[0], m[1], m[2]],
        }
    }

    fn value(&self, x: f64) -> f64 {
        let i = if x < self.knots[1] {
            0
        } else if x < self.knots[2] {
            1
        } else {
            2
        };
        let (x0, x1) = (self.knots[i], self.knots[i + 1]);
        let (y0, y1) = (self.values[i], self.values[i + 1]);
        let (m0, m1) = (self.moments[i], self.moments[i + 1]);
        let h = x1 - x0;
        m0 * (x1 - x).powi(3) / (6.0 * h)
            + m1 * (x - x0).powi(3) / (6.0 * h)
            + (y0 / h - m0 * h / 6.0) * (x1 - x)
            + (y1 / h - m1 * h / 6.0) * (x - x0)
    }
}

/// Raise `per_capita` to at least `floor`, element-wise.
pub fn apply_floor(per_capita: &mut Array2<f64>, floor: ArrayView2<f64>) {
    Zip::from(per_capita)
        .and(floor)
        .for_each(|value, &minimum| *value = value.max(minimum));
}
