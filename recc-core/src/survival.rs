//! Survival functions of product cohorts.
//!
//! The survival matrix `sf[t, c]` holds the share of cohort `c` still in use in year `t`.
//! Each column is built from a lifetime distribution whose mean is the cohort's lifetime;
//! the distribution family is pluggable through the [`LifetimeDistribution`] trait.
//!
//! # Policy
//!
//! The diagonal `sf[c, c]` is forced to one. Nothing leaves the stock in the year it is
//! installed, because the element composition of that year's cohort is only known once the
//! year's scrap market has been balanced.
//!
//! Cohorts with a non-positive or non-finite lifetime get a degenerate column: the cohort
//! survives its installation year (diagonal) and is fully discarded the year after.

use crate::utils::clamp;
use ndarray::{Array2, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, LogNormal, Normal, Weibull};
use statrs::function::gamma::gamma;
use std::fmt::Debug;
use std::sync::Arc;

/// A lifetime distribution parameterised by the mean lifetime of a cohort.
#[typetag::serde(tag = "type")]
pub trait LifetimeDistribution: Debug + Send + Sync {
    /// Probability that a unit with mean lifetime `mean_lifetime` is still in use at `age`.
    ///
    /// Only called with a positive, finite `mean_lifetime`.
    fn survival(&self, age: f64, mean_lifetime: f64) -> f64;
}

/// Deterministic lifetime: every unit is discarded when its age reaches the mean.
fn step_survival(age: f64, mean_lifetime: f64) -> f64 {
    if age < mean_lifetime {
        1.0
    } else {
        0.0
    }
}

/// Normal distribution with standard deviation proportional to the mean.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalLifetime {
    /// Standard deviation as a share of the mean lifetime
    /// default: 0.3
    pub relative_std: f64,
}

impl Default for NormalLifetime {
    fn default() -> Self {
        Self { relative_std: 0.3 }
    }
}

#[typetag::serde(name = "Normal")]
impl LifetimeDistribution for NormalLifetime {
    fn survival(&self, age: f64, mean_lifetime: f64) -> f64 {
        match Normal::new(mean_lifetime, self.relative_std * mean_lifetime) {
            Ok(dist) => dist.sf(age),
            Err(_) => step_survival(age, mean_lifetime),
        }
    }
}

/// Log-normal distribution matched to the mean and a relative standard deviation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogNormalLifetime {
    pub relative_std: f64,
}

#[typetag::serde(name = "LogNormal")]
impl LifetimeDistribution for LogNormalLifetime {
    fn survival(&self, age: f64, mean_lifetime: f64) -> f64 {
        let sigma_squared = (1.0 + self.relative_std * self.relative_std).ln();
        let location = mean_lifetime.ln() - 0.5 * sigma_squared;
        match LogNormal::new(location, sigma_squared.sqrt()) {
            Ok(dist) if age > 0.0 => dist.sf(age),
            Ok(_) => 1.0,
            Err(_) => step_survival(age, mean_lifetime),
        }
    }
}

/// Weibull distribution with a fixed shape; the scale is chosen to match the mean.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeibullLifetime {
    pub shape: f64,
}

#[typetag::serde(name = "Weibull")]
impl LifetimeDistribution for WeibullLifetime {
    fn survival(&self, age: f64, mean_lifetime: f64) -> f64 {
        let scale = mean_lifetime / gamma(1.0 + 1.0 / self.shape);
        match Weibull::new(self.shape, scale) {
            Ok(dist) if age > 0.0 => dist.sf(age),
            Ok(_) => 1.0,
            Err(_) => step_survival(age, mean_lifetime),
        }
    }
}

/// Deterministic lifetime equal to the mean.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FixedLifetime;

#[typetag::serde(name = "Fixed")]
impl LifetimeDistribution for FixedLifetime {
    fn survival(&self, age: f64, mean_lifetime: f64) -> f64 {
        step_survival(age, mean_lifetime)
    }
}

/// Square survival matrix indexed `[year, cohort]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurvivalMatrix(Array2<f64>);

impl SurvivalMatrix {
    /// Wrap an externally computed matrix.
    ///
    /// Entries above the diagonal (years before the cohort exists) are zeroed, the rest are
    /// clamped into `[0, 1]` and the diagonal is forced to one.
    pub fn from_array(mut values: Array2<f64>) -> Self {
        let n = values.nrows().min(values.ncols());
        for ((t, c), v) in values.indexed_iter_mut() {
            *v = if t < c { 0.0 } else { clamp(*v, 0.0, 1.0) };
        }
        for c in 0..n {
            values[[c, c]] = 1.0;
        }
        Self(values)
    }

    /// Matrix in which every cohort survives for the whole horizon.
    pub fn full_survival(n: usize) -> Self {
        Self(Array2::from_shape_fn((n, n), |(t, c)| if t >= c { 1.0 } else { 0.0 }))
    }

    pub fn len(&self) -> usize {
        self.0.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn value(&self, year: usize, cohort: usize) -> f64 {
        self.0[[year, cohort]]
    }

    pub fn as_array(&self) -> ArrayView2<'_, f64> {
        self.0.view()
    }

    pub fn into_array(self) -> Array2<f64> {
        self.0
    }

    /// True if every column is non-increasing from the diagonal downwards.
    pub fn is_monotone(&self) -> bool {
        let n = self.len();
        (0..n).all(|c| (c + 1..n).all(|t| self.0[[t, c]] <= self.0[[t - 1, c]]))
    }
}

/// Builds survival matrices from per-cohort mean lifetimes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurvivalFunctionBuilder {
    pub distribution: Arc<dyn LifetimeDistribution>,
}

impl Default for SurvivalFunctionBuilder {
    fn default() -> Self {
        Self::normal(0.3)
    }
}

impl SurvivalFunctionBuilder {
    pub fn new(distribution: Arc<dyn LifetimeDistribution>) -> Self {
        Self { distribution }
    }

    pub fn normal(relative_std: f64) -> Self {
        Self::new(Arc::new(NormalLifetime { relative_std }))
    }

    /// Survival matrix for cohorts with the given mean lifetimes, one per cohort.
    ///
    /// The result depends only on the inputs; repeated calls give identical matrices.
    pub fn build(&self, mean_lifetimes: ArrayView1<f64>) -> SurvivalMatrix {
        let n = mean_lifetimes.len();
        let mut sf = Array2::<f64>::zeros((n, n));
        for (c, &mean) in mean_lifetimes.iter().enumerate() {
            if mean.is_finite() && mean > 0.0 {
                for t in c..n {
                    let age = (t - c) as f64;
                    sf[[t, c]] = clamp(self.distribution.survival(age, mean), 0.0, 1.0);
                }
            }
            sf[[c, c]] = 1.0;
        }
        SurvivalMatrix(sf)
    }
}
