//! Calendar of a model run.
//!
//! A run covers `n_cohorts` age-cohorts, the last `n_years` of which are the model years.
//! Model year 0 is the base year whose stock is seeded from historical data; its cohort is
//! the last historic one.
//!
//! ```text
//! cohort index: 0 ................ Nc-Nt | Nc-Nt+1 ............ Nc-1
//!                  historic cohorts       |   future cohorts
//! model year:                         0   |   1 ..................... Nt-1
//! ```

use crate::errors::{RECCError, RECCResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeAxis {
    /// Calendar year of cohort index 0
    pub first_cohort_year: i32,
    /// Number of age-cohorts (historic and future)
    pub n_cohorts: usize,
    /// Number of model years, base year included
    pub n_years: usize,
}

impl TimeAxis {
    pub fn new(first_cohort_year: i32, n_cohorts: usize, n_years: usize) -> RECCResult<Self> {
        if n_years == 0 || n_years > n_cohorts {
            return Err(RECCError::InconsistentSelection(format!(
                "{} model years do not fit into {} cohorts",
                n_years, n_cohorts
            )));
        }
        Ok(Self {
            first_cohort_year,
            n_cohorts,
            n_years,
        })
    }

    /// Index of the first future cohort, `Nc - Nt + 1`.
    pub fn switch_time(&self) -> usize {
        self.n_cohorts - self.n_years + 1
    }

    /// Cohort index of the cohort entering the stock in model year `t`.
    pub fn cohort_index_for_year(&self, t: usize) -> usize {
        t + self.n_cohorts - self.n_years
    }

    /// Model year of cohort `c`, `None` for cohorts before the base year.
    pub fn year_for_cohort_index(&self, c: usize) -> Option<usize> {
        c.checked_sub(self.n_cohorts - self.n_years)
    }

    pub fn is_historic_cohort(&self, c: usize) -> bool {
        c < self.switch_time()
    }

    /// Calendar year of model year `t`.
    pub fn year_label(&self, t: usize) -> i32 {
        self.first_cohort_year + self.cohort_index_for_year(t) as i32
    }

    pub fn base_year(&self) -> i32 {
        self.year_label(0)
    }

    pub fn model_years(&self) -> std::ops::Range<usize> {
        0..self.n_years
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn switch_time_and_cohort_offsets() {
        // 1900..=2060 with model years 2015..=2060
        let time = TimeAxis::new(1900, 161, 46).unwrap();
        assert_eq!(time.switch_time(), 116);
        assert_eq!(time.cohort_index_for_year(0), 115);
        assert_eq!(time.cohort_index_for_year(1), time.switch_time());
        assert_eq!(time.year_label(0), 2015);
        assert_eq!(time.year_label(45), 2060);
        assert!(time.is_historic_cohort(115));
        assert!(!time.is_historic_cohort(116));
    }

    #[test]
    fn year_for_cohort_index_inverts_offset() {
        let time = TimeAxis::new(2000, 10, 4).unwrap();
        assert_eq!(time.year_for_cohort_index(5), None);
        assert_eq!(time.year_for_cohort_index(6), Some(0));
        assert_eq!(time.year_for_cohort_index(9), Some(3));
        for t in time.model_years() {
            assert_eq!(
                time.year_for_cohort_index(time.cohort_index_for_year(t)),
                Some(t)
            );
        }
    }

    #[test]
    fn rejects_more_years_than_cohorts() {
        assert!(TimeAxis::new(2000, 3, 4).is_err());
        assert!(TimeAxis::new(2000, 3, 0).is_err());
    }
}
