//! Property tests for the dynamic stock model.
//!
//! These tests exercise the survival builder and the cohort engine together:
//! - cohorts never exist before they are created
//! - stocks change by exactly inflow minus outflow
//! - survival curves are monotone and start at one

use approx::assert_relative_eq;
use ndarray::{Array1, Array2};
use recc_core::dsm::{CohortStockEngine, StockDrivenInput};
use recc_core::survival::{SurvivalFunctionBuilder, SurvivalMatrix};
use recc_core::time::TimeAxis;

fn time() -> TimeAxis {
    // 1950..=2060 with model years 2015..=2060
    TimeAxis::new(1950, 111, 46).unwrap()
}

fn survival_for(time: &TimeAxis, lifetimes: &[f64]) -> Vec<SurvivalMatrix> {
    let builder = SurvivalFunctionBuilder::default();
    lifetimes
        .iter()
        .map(|lt| builder.build(Array1::from_elem(time.n_cohorts, *lt).view()))
        .collect()
}

mod stock_driven {
    use super::*;

    fn run(target: &Array1<f64>) -> recc_core::dsm::TypedCohortFlows {
        let time = time();
        let survival = survival_for(&time, &[12.0, 20.0]);
        let initial = Array2::from_shape_fn((time.n_cohorts, 2), |(c, j)| {
            if c < time.switch_time() {
                1.0 + 0.01 * c as f64 + j as f64
            } else {
                0.0
            }
        });
        let split = Array2::from_shape_fn((time.n_years, 2), |(t, _)| {
            if t == 0 {
                0.0
            } else {
                0.5
            }
        });
        CohortStockEngine::stock_driven(&StockDrivenInput {
            time,
            target_stock: target.view(),
            initial_stock: initial.view(),
            survival: &survival,
            type_split: split.view(),
        })
        .unwrap()
    }

    /// Total stock follows a growing target exactly.
    #[test]
    fn test_growing_target_is_met() {
        let time = time();
        let target = Array1::from_shape_fn(time.n_years, |t| 300.0 + 4.0 * t as f64);
        let flows = run(&target);
        let stock = flows.total_stock();
        for t in 1..time.n_years {
            assert_relative_eq!(stock[t], target[t], max_relative = 1e-9);
        }
        assert!(!flows.has_negative_inflow());
    }

    /// Stock continuity holds with and without clipped inflow.
    #[test]
    fn test_stock_continuity() {
        let time = time();
        let target = Array1::from_shape_fn(time.n_years, |t| {
            300.0 + 80.0 * ((t as f64) / 6.0).sin()
        });
        let flows = run(&target);
        let stock = flows.total_stock();
        let inflow = flows.total_inflow();
        let outflow = flows.total_outflow();
        for t in 1..time.n_years {
            assert_relative_eq!(
                stock[t],
                stock[t - 1] + inflow[t] - outflow[t],
                max_relative = 1e-6
            );
        }
    }

    /// Collapsing demand triggers the negative inflow correction, never negative flows.
    #[test]
    fn test_collapsing_demand_is_clipped() {
        let time = time();
        let target = Array1::from_shape_fn(time.n_years, |t| if t < 5 { 300.0 } else { 10.0 });
        let flows = run(&target);
        assert!(flows.has_negative_inflow());
        assert!(flows.inflow.iter().all(|i| *i >= 0.0));
        assert!(flows.stock.iter().all(|s| *s >= 0.0));
        assert!(flows.total_stock()[5] > 10.0);
    }

    /// Cohorts created after a year hold neither stock nor outflow in that year.
    #[test]
    fn test_cohort_triangularity() {
        let time = time();
        let target = Array1::from_shape_fn(time.n_years, |t| 300.0 + t as f64);
        let flows = run(&target);
        for t in 0..time.n_years {
            for c in time.cohort_index_for_year(t) + 1..time.n_cohorts {
                assert_eq!(flows.stock[[t, c, 0]], 0.0);
                assert_eq!(flows.stock[[t, c, 1]], 0.0);
                assert_eq!(flows.outflow[[t, c, 0]], 0.0);
            }
        }
    }
}

mod survival {
    use super::*;

    /// Survival curves with cohort-specific lifetimes stay monotone.
    #[test]
    fn test_monotone_with_varying_lifetimes() {
        let time = time();
        let lifetimes = Array1::from_shape_fn(time.n_cohorts, |c| 5.0 + (c % 17) as f64);
        let sf = SurvivalFunctionBuilder::default().build(lifetimes.view());
        assert!(sf.is_monotone());
        for c in 0..time.n_cohorts {
            assert_eq!(sf.value(c, c), 1.0);
        }
    }

    /// Inflow-driven results restricted to model years keep the base-year stock.
    #[test]
    fn test_inflow_driven_model_years() {
        let time = time();
        let inflow = Array1::from_elem(time.n_cohorts, 3.0);
        let sf = SurvivalFunctionBuilder::default()
            .build(Array1::from_elem(time.n_cohorts, 15.0).view());
        let full = CohortStockEngine::inflow_driven(inflow.view(), &sf).unwrap();
        let years = full.model_years(&time);
        let offset = time.cohort_index_for_year(0);
        assert_relative_eq!(
            years.stock.row(0).sum(),
            full.stock.row(offset).sum(),
            epsilon = 1e-12
        );
        assert_eq!(years.inflow.len(), time.n_years);
    }
}
