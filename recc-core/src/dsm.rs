//! Dynamic stock model.
//!
//! [`CohortStockEngine`] propagates age-cohorts through time using survival matrices from
//! [`crate::survival`]. Three modes are supported:
//!
//! * **stock-driven**: the total stock per model year is given and the inflow required to
//!   reach it is solved for, year by year, then split over product types;
//! * **stock-driven over the full history**: the total stock of a single product is given
//!   for every cohort year and the inflow follows without any correction, so it may be
//!   negative;
//! * **inflow-driven**: the inflow per cohort is given and stock and outflow follow.
//!
//! Results of the first mode are indexed by model year (see [`TimeAxis`]), results of the
//! other two by cohort year over the full cohort range.

use crate::errors::{RECCError, RECCResult};
use crate::survival::SurvivalMatrix;
use crate::time::TimeAxis;
use crate::utils::guarded_divide;
use log::warn;
use ndarray::{s, Array1, Array2, Array3, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

/// Inputs of a stock-driven run for one region and a set of product types.
#[derive(Debug, Clone)]
pub struct StockDrivenInput<'a> {
    pub time: TimeAxis,
    /// Target total stock per model year, `[t]`. Entry 0 is only used for the stock match.
    pub target_stock: ArrayView1<'a, f64>,
    /// Historic stock by cohort and type at the end of the base year, `[c, type]`.
    /// Cohorts from the switch time onwards are ignored.
    pub initial_stock: ArrayView2<'a, f64>,
    /// One survival matrix per type, each `n_cohorts` square.
    pub survival: &'a [SurvivalMatrix],
    /// Share of each type in the inflow per model year, `[t, type]`.
    pub type_split: ArrayView2<'a, f64>,
}

/// Stock, outflow and inflow of several product types, indexed by model year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypedCohortFlows {
    /// `[t, c, type]`
    pub stock: Array3<f64>,
    /// `[t, c, type]`
    pub outflow: Array3<f64>,
    /// `[t, type]`
    pub inflow: Array2<f64>,
    /// Model years in which the required inflow was negative and clipped to zero
    pub negative_inflow_years: Vec<usize>,
    /// Target stock of the base year divided by the supplied historic stock
    pub stock_match: f64,
}

impl TypedCohortFlows {
    pub fn total_stock(&self) -> Array1<f64> {
        self.stock.sum_axis(Axis(2)).sum_axis(Axis(1))
    }

    pub fn total_outflow(&self) -> Array1<f64> {
        self.outflow.sum_axis(Axis(2)).sum_axis(Axis(1))
    }

    pub fn total_inflow(&self) -> Array1<f64> {
        self.inflow.sum_axis(Axis(1))
    }

    pub fn has_negative_inflow(&self) -> bool {
        !self.negative_inflow_years.is_empty()
    }
}

/// Stock, outflow and inflow of a single product, indexed by cohort year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CohortFlows {
    /// `[year, c]`
    pub stock: Array2<f64>,
    /// `[year, c]`
    pub outflow: Array2<f64>,
    /// `[year]`
    pub inflow: Array1<f64>,
}

impl CohortFlows {
    /// Restrict to the model years of `time`.
    ///
    /// Inflow and outflow of the base year are zeroed: the base year stock is taken as given
    /// and flows are only accounted from model year 1 on.
    pub fn model_years(&self, time: &TimeAxis) -> CohortFlows {
        let offset = time.cohort_index_for_year(0);
        let mut flows = CohortFlows {
            stock: self.stock.slice(s![offset.., ..]).to_owned(),
            outflow: self.outflow.slice(s![offset.., ..]).to_owned(),
            inflow: self.inflow.slice(s![offset..]).to_owned(),
        };
        flows.outflow.row_mut(0).fill(0.0);
        flows.inflow[0] = 0.0;
        flows
    }

    /// Years in which the inflow is negative.
    pub fn negative_inflow_years(&self) -> Vec<usize> {
        self.inflow
            .iter()
            .enumerate()
            .filter(|(_, i)| **i < 0.0)
            .map(|(year, _)| year)
            .collect()
    }
}

/// Cohort-based dynamic stock model.
pub struct CohortStockEngine;

impl CohortStockEngine {
    /// Solve for the inflow that meets a target stock trajectory.
    ///
    /// Historic cohorts keep their base-year stock scaled by their survival relative to the
    /// base year. For every future model year the inflow is whatever is needed on top of the
    /// survivors of all earlier cohorts; a negative requirement is clipped to zero, the year is
    /// flagged and the stock is allowed to exceed its target.
    pub fn stock_driven(input: &StockDrivenInput) -> RECCResult<TypedCohortFlows> {
        let time = &input.time;
        let nt = time.n_years;
        let nc = time.n_cohorts;
        let n_types = input.survival.len();
        check_stock_driven_shapes(input)?;

        let offset = time.cohort_index_for_year(0);
        let switch_time = time.switch_time();

        let mut stock = Array3::<f64>::zeros((nt, nc, n_types));
        let mut outflow = Array3::<f64>::zeros((nt, nc, n_types));
        let mut inflow = Array2::<f64>::zeros((nt, n_types));
        let mut negative_inflow_years = Vec::new();

        // Historic cohorts
        for (j, sf) in input.survival.iter().enumerate() {
            for c in 0..switch_time {
                let initial = input.initial_stock[[c, j]];
                stock[[0, c, j]] = initial;
                let base = sf.value(offset, c);
                for t in 1..nt {
                    stock[[t, c, j]] = initial * guarded_divide(sf.value(offset + t, c), base);
                }
            }
        }

        // Future cohorts
        for t in 1..nt {
            let cohort = time.cohort_index_for_year(t);
            let survivors = stock.slice(s![t, ..cohort, ..]).sum();
            let new_cohort_survival = (0..n_types)
                .map(|j| input.type_split[[t, j]] * input.survival[j].value(cohort, cohort))
                .sum::<f64>();
            let mut required = guarded_divide(input.target_stock[t] - survivors, new_cohort_survival);
            if required < 0.0 {
                negative_inflow_years.push(t);
                required = 0.0;
            }
            for (j, sf) in input.survival.iter().enumerate() {
                let typed = required * input.type_split[[t, j]];
                inflow[[t, j]] = typed;
                for n in t..nt {
                    stock[[n, cohort, j]] = typed * sf.value(offset + n, cohort);
                }
            }
        }

        for t in 1..nt {
            let cohort = time.cohort_index_for_year(t);
            for j in 0..n_types {
                for c in 0..cohort {
                    outflow[[t, c, j]] = stock[[t - 1, c, j]] - stock[[t, c, j]];
                }
            }
        }

        if !negative_inflow_years.is_empty() {
            warn!(
                "Negative inflow clipped to zero in {} model year(s), first in {}",
                negative_inflow_years.len(),
                time.year_label(negative_inflow_years[0])
            );
        }

        Ok(TypedCohortFlows {
            stock,
            outflow,
            inflow,
            negative_inflow_years,
            stock_match: guarded_divide(
                input.target_stock[0],
                input.initial_stock.slice(s![..switch_time, ..]).sum(),
            ),
        })
    }

    /// Solve for the inflow of a single product whose stock is given for every cohort year.
    ///
    /// The inflow of each year covers the gap between the target and the survivors of all
    /// earlier cohorts. It is not corrected when negative: the stock then meets its target
    /// exactly and the caller decides how to report the negative years.
    pub fn stock_driven_history(
        target_stock: ArrayView1<f64>,
        survival: &SurvivalMatrix,
    ) -> RECCResult<CohortFlows> {
        let n = target_stock.len();
        if survival.len() != n {
            return Err(RECCError::InconsistentSelection(format!(
                "stock covers {} years but the survival matrix {}",
                n,
                survival.len()
            )));
        }

        let mut stock = Array2::<f64>::zeros((n, n));
        let mut inflow = Array1::<f64>::zeros(n);
        for m in 0..n {
            let survivors = stock.slice(s![m, ..m]).sum();
            inflow[m] = guarded_divide(target_stock[m] - survivors, survival.value(m, m));
            for t in m..n {
                stock[[t, m]] = inflow[m] * survival.value(t, m);
            }
        }

        let mut outflow = Array2::<f64>::zeros((n, n));
        for t in 1..n {
            for c in 0..t {
                outflow[[t, c]] = stock[[t - 1, c]] - stock[[t, c]];
            }
        }
        Ok(CohortFlows {
            stock,
            outflow,
            inflow,
        })
    }

    /// Propagate a given inflow per cohort through the survival matrix.
    pub fn inflow_driven(
        inflow: ArrayView1<f64>,
        survival: &SurvivalMatrix,
    ) -> RECCResult<CohortFlows> {
        let n = inflow.len();
        if survival.len() != n {
            return Err(RECCError::InconsistentSelection(format!(
                "inflow covers {} cohorts but the survival matrix {}",
                n,
                survival.len()
            )));
        }

        let stock = Array2::from_shape_fn((n, n), |(t, c)| {
            if c <= t {
                inflow[c] * survival.value(t, c)
            } else {
                0.0
            }
        });
        let mut outflow = Array2::<f64>::zeros((n, n));
        for t in 1..n {
            for c in 0..t {
                outflow[[t, c]] = stock[[t - 1, c]] - stock[[t, c]];
            }
        }
        Ok(CohortFlows {
            stock,
            outflow,
            inflow: inflow.to_owned(),
        })
    }
}

fn check_stock_driven_shapes(input: &StockDrivenInput) -> RECCResult<()> {
    let time = &input.time;
    let n_types = input.survival.len();
    let mismatch = |what: &str, found: Vec<usize>, expected: Vec<usize>| {
        Err(RECCError::InconsistentSelection(format!(
            "stock-driven {} has shape {:?}, expected {:?}",
            what, found, expected
        )))
    };

    if input.target_stock.len() != time.n_years {
        return mismatch(
            "target stock",
            input.target_stock.shape().to_vec(),
            vec![time.n_years],
        );
    }
    if input.initial_stock.shape() != [time.n_cohorts, n_types] {
        return mismatch(
            "initial stock",
            input.initial_stock.shape().to_vec(),
            vec![time.n_cohorts, n_types],
        );
    }
    if input.type_split.shape() != [time.n_years, n_types] {
        return mismatch(
            "type split",
            input.type_split.shape().to_vec(),
            vec![time.n_years, n_types],
        );
    }
    if let Some(sf) = input.survival.iter().find(|sf| sf.len() != time.n_cohorts) {
        return mismatch(
            "survival matrix",
            vec![sf.len(), sf.len()],
            vec![time.n_cohorts, time.n_cohorts],
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::survival::SurvivalFunctionBuilder;
    use approx::assert_relative_eq;
    use ndarray::{array, Array1};

    fn time() -> TimeAxis {
        TimeAxis::new(2000, 12, 6).unwrap()
    }

    fn survival(time: &TimeAxis, lifetime: f64) -> SurvivalMatrix {
        SurvivalFunctionBuilder::default().build(Array1::from_elem(time.n_cohorts, lifetime).view())
    }

    fn run(target: Array1<f64>, lifetimes: &[f64]) -> TypedCohortFlows {
        let time = time();
        let sfs = lifetimes
            .iter()
            .map(|lt| survival(&time, *lt))
            .collect::<Vec<_>>();
        let n_types = lifetimes.len();
        let mut initial = Array2::<f64>::zeros((time.n_cohorts, n_types));
        for c in 0..time.switch_time() {
            initial[[c, 0]] = 10.0;
        }
        let split = Array2::from_elem((time.n_years, n_types), 1.0 / n_types as f64);
        CohortStockEngine::stock_driven(&StockDrivenInput {
            time,
            target_stock: target.view(),
            initial_stock: initial.view(),
            survival: &sfs,
            type_split: split.view(),
        })
        .unwrap()
    }

    // ===== Stock-Driven Tests =====

    #[test]
    fn meets_target_when_feasible() {
        let target = array![60.0, 75.0, 85.0, 95.0, 105.0, 115.0];
        let flows = run(target.clone(), &[8.0, 15.0]);
        let total = flows.total_stock();
        for t in 1..6 {
            assert_relative_eq!(total[t], target[t], epsilon = 1e-9);
        }
        assert!(!flows.has_negative_inflow());
        assert_relative_eq!(flows.stock_match, 60.0 / 70.0, epsilon = 1e-12);
    }

    #[test]
    fn stock_continuity_holds() {
        let flows = run(array![70.0, 72.0, 75.0, 71.0, 73.0, 90.0], &[6.0]);
        let stock = flows.total_stock();
        let inflow = flows.total_inflow();
        let outflow = flows.total_outflow();
        for t in 1..6 {
            assert_relative_eq!(
                stock[t],
                stock[t - 1] + inflow[t] - outflow[t],
                epsilon = 1e-9
            );
        }
    }

    #[test]
    fn cohorts_are_triangular() {
        let time = time();
        let flows = run(array![70.0, 72.0, 75.0, 78.0, 80.0, 90.0], &[6.0, 9.0]);
        for t in 0..time.n_years {
            for c in time.cohort_index_for_year(t) + 1..time.n_cohorts {
                for j in 0..2 {
                    assert_eq!(flows.stock[[t, c, j]], 0.0);
                    assert_eq!(flows.outflow[[t, c, j]], 0.0);
                }
            }
        }
    }

    #[test]
    fn outflow_never_exceeds_prior_stock() {
        let flows = run(array![70.0, 72.0, 75.0, 78.0, 80.0, 90.0], &[3.0]);
        for t in 1..6 {
            for c in 0..12 {
                let o = flows.outflow[[t, c, 0]];
                assert!(o >= -1e-12);
                assert!(o <= flows.stock[[t - 1, c, 0]] + 1e-12);
            }
        }
    }

    #[test]
    fn negative_inflow_is_clipped_and_flagged() {
        // survivors of 70 units can not shrink to 20 in one year
        let target = array![70.0, 20.0, 20.0, 20.0, 20.0, 200.0];
        let flows = run(target.clone(), &[30.0]);
        assert!(flows.has_negative_inflow());
        assert_eq!(flows.negative_inflow_years[0], 1);
        assert!(flows.inflow.iter().all(|i| *i >= 0.0));
        assert!(flows.total_stock()[1] > target[1]);
        // the final year is feasible again
        assert_relative_eq!(flows.total_stock()[5], 200.0, epsilon = 1e-9);
    }

    #[test]
    fn type_split_divides_inflow() {
        let flows = run(array![70.0, 80.0, 90.0, 100.0, 110.0, 120.0], &[10.0, 10.0]);
        for t in 1..6 {
            assert_relative_eq!(flows.inflow[[t, 0]], flows.inflow[[t, 1]], epsilon = 1e-12);
        }
    }

    #[test]
    fn rejects_mismatched_shapes() {
        let time = time();
        let sfs = vec![survival(&time, 5.0)];
        let initial = Array2::<f64>::zeros((time.n_cohorts, 1));
        let split = Array2::<f64>::ones((time.n_years, 1));
        let short_target = Array1::<f64>::zeros(3);
        let result = CohortStockEngine::stock_driven(&StockDrivenInput {
            time,
            target_stock: short_target.view(),
            initial_stock: initial.view(),
            survival: &sfs,
            type_split: split.view(),
        });
        assert!(result.is_err());
    }

    // ===== Full-History Stock-Driven Tests =====

    #[test]
    fn history_meets_every_target() {
        let target = array![10.0, 12.0, 15.0, 15.0, 18.0, 20.0, 21.0, 25.0];
        let sf = SurvivalFunctionBuilder::default().build(Array1::from_elem(8, 3.0).view());
        let flows = CohortStockEngine::stock_driven_history(target.view(), &sf).unwrap();
        let stock = flows.stock.sum_axis(Axis(1));
        let outflow = flows.outflow.sum_axis(Axis(1));
        assert_relative_eq!(flows.inflow[0], 10.0, epsilon = 1e-12);
        for t in 0..8 {
            assert_relative_eq!(stock[t], target[t], epsilon = 1e-9);
        }
        for t in 1..8 {
            assert_relative_eq!(
                stock[t],
                stock[t - 1] + flows.inflow[t] - outflow[t],
                epsilon = 1e-9
            );
        }
    }

    #[test]
    fn history_keeps_negative_inflow() {
        // nothing is discarded, so a shrinking target needs a negative inflow
        let target = array![10.0, 12.0, 8.0, 9.0];
        let flows =
            CohortStockEngine::stock_driven_history(target.view(), &SurvivalMatrix::full_survival(4))
                .unwrap();
        assert_eq!(flows.inflow.to_vec(), vec![10.0, 2.0, -4.0, 1.0]);
        assert_eq!(flows.negative_inflow_years(), vec![2]);
        assert_relative_eq!(flows.stock.row(2).sum(), 8.0);
    }

    #[test]
    fn history_rejects_short_survival_matrix() {
        let target = Array1::from_elem(5, 1.0);
        let result =
            CohortStockEngine::stock_driven_history(target.view(), &SurvivalMatrix::full_survival(4));
        assert!(result.is_err());
    }

    // ===== Inflow-Driven Tests =====

    #[test]
    fn inflow_driven_mass_balance() {
        let inflow = Array1::from_shape_fn(12, |c| 5.0 + c as f64);
        let sf = SurvivalFunctionBuilder::default().build(Array1::from_elem(12, 4.0).view());
        let flows = CohortStockEngine::inflow_driven(inflow.view(), &sf).unwrap();
        let stock = flows.stock.sum_axis(Axis(1));
        let outflow = flows.outflow.sum_axis(Axis(1));
        assert_relative_eq!(stock[0], inflow[0], epsilon = 1e-12);
        for t in 1..12 {
            assert_relative_eq!(
                stock[t],
                stock[t - 1] + inflow[t] - outflow[t],
                epsilon = 1e-9
            );
        }
    }

    #[test]
    fn inflow_driven_with_full_survival_has_no_outflow() {
        let inflow = Array1::from_elem(5, 2.0);
        let flows =
            CohortStockEngine::inflow_driven(inflow.view(), &SurvivalMatrix::full_survival(5))
                .unwrap();
        assert!(flows.outflow.iter().all(|o| *o == 0.0));
        assert_relative_eq!(flows.stock.row(4).sum(), 10.0);
    }

    #[test]
    fn model_years_zero_base_year_flows() {
        let time = TimeAxis::new(2000, 5, 3).unwrap();
        let inflow = Array1::from_elem(5, 1.0);
        let sf = SurvivalFunctionBuilder::default().build(Array1::from_elem(5, 2.0).view());
        let flows = CohortStockEngine::inflow_driven(inflow.view(), &sf)
            .unwrap()
            .model_years(&time);
        assert_eq!(flows.stock.nrows(), 3);
        assert_eq!(flows.inflow[0], 0.0);
        assert!(flows.outflow.row(0).iter().all(|o| *o == 0.0));
        assert_eq!(flows.inflow[1], 1.0);
    }
}
