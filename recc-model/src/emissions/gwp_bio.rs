use ndarray::{Array1, ArrayView1};
use serde::{Deserialize, Serialize};

/// Largest storage time, in years, covered by the interpolated table.
const MAX_AGE: usize = 100;

/// Global warming potential of biogenic carbon by storage time.
///
/// Built once from the supplied (age, factor) points by linear interpolation onto whole years
/// `0..=100`. Storage times beyond the table are assigned a factor of -1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GwpBioTable {
    factors: Array1<f64>,
}

impl GwpBioTable {
    /// Interpolate `values` given at `ages` onto every whole year of the table.
    ///
    /// Years outside the supplied range take the value of the nearest point.
    pub fn from_points(ages: &[f64], values: ArrayView1<f64>) -> Self {
        let points = ages
            .iter()
            .zip(values.iter())
            .map(|(a, v)| (*a, *v))
            .collect::<Vec<_>>();
        let factors = Array1::from_shape_fn(MAX_AGE + 1, |year| interpolate(&points, year as f64));
        Self { factors }
    }

    /// A table without biogenic-carbon effect.
    pub fn zeros() -> Self {
        Self {
            factors: Array1::zeros(MAX_AGE + 1),
        }
    }

    /// Factor for a product of the given mean lifetime, rounded down to whole years.
    pub fn factor(&self, lifetime: f64) -> f64 {
        if !lifetime.is_finite() || lifetime < 0.0 {
            return self.factors[0];
        }
        let year = lifetime.floor() as usize;
        if year > MAX_AGE {
            -1.0
        } else {
            self.factors[year]
        }
    }

    pub fn is_zero(&self) -> bool {
        self.factors.iter().all(|v| *v == 0.0)
    }
}

fn interpolate(points: &[(f64, f64)], x: f64) -> f64 {
    let (first, last) = match (points.first(), points.last()) {
        (Some(first), Some(last)) => (*first, *last),
        _ => return 0.0,
    };
    if x <= first.0 {
        return first.1;
    }
    if x >= last.0 {
        return last.1;
    }
    points
        .windows(2)
        .find(|w| x >= w[0].0 && x <= w[1].0)
        .map(|w| {
            let (x0, y0) = w[0];
            let (x1, y1) = w[1];
            if x1 == x0 {
                y0
            } else {
                y0 + (y1 - y0) * (x - x0) / (x1 - x0)
            }
        })
        .unwrap_or(last.1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn decadal_points_are_interpolated() {
        let table = GwpBioTable::from_points(&[0.0, 10.0, 100.0], array![0.0, -0.1, -1.0].view());
        assert_relative_eq!(table.factor(0.0), 0.0);
        assert_relative_eq!(table.factor(5.0), -0.05);
        assert_relative_eq!(table.factor(55.0), -0.55);
        assert_relative_eq!(table.factor(100.0), -1.0);
    }

    #[test]
    fn lifetime_is_rounded_down() {
        let table = GwpBioTable::from_points(&[0.0, 10.0], array![0.0, -1.0].view());
        assert_relative_eq!(table.factor(3.9), -0.3);
    }

    #[test]
    fn long_storage_gets_full_credit() {
        let table = GwpBioTable::from_points(&[0.0, 100.0], array![0.0, -0.5].view());
        assert_eq!(table.factor(101.0), -1.0);
        assert_eq!(table.factor(250.0), -1.0);
    }

    #[test]
    fn zero_table() {
        let table = GwpBioTable::zeros();
        assert!(table.is_zero());
        assert_eq!(table.factor(40.0), 0.0);
        assert_eq!(table.factor(150.0), -1.0);
    }
}
