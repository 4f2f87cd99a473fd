//! Scrap and secondary material market.
//!
//! Manufacturing demand for each material is met from, in order: fabrication scrap diverted
//! from last year's buffer, secondary material remelted this year, the carried-over stockpile,
//! and finally primary production. Every draw takes the same fraction of each element of the
//! source, so the source keeps its composition.

pub mod reuse;

use log::debug;
use ndarray::{s, Array1, Array2, Array4, ArrayView1, ArrayView2, ArrayView3, Axis};
use recc_core::utils::guarded_divide;
use serde::{Deserialize, Serialize};

/// Element-resolved supplies of secondary material available to manufacturing, `[m, e]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupplySources {
    pub diverted: Array2<f64>,
    pub secondary: Array2<f64>,
    pub stockpile: Array2<f64>,
}

impl SupplySources {
    pub fn zeros(n_materials: usize, n_elements: usize) -> Self {
        Self {
            diverted: Array2::zeros((n_materials, n_elements)),
            secondary: Array2::zeros((n_materials, n_elements)),
            stockpile: Array2::zeros((n_materials, n_elements)),
        }
    }
}

/// Result of the priority allocation, element-resolved per material.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    pub drawn_diverted: Array2<f64>,
    pub drawn_secondary: Array2<f64>,
    pub drawn_stockpile: Array2<f64>,
    /// Demand left for primary production, `[m]`
    pub primary: Array1<f64>,
    /// Unused diverted and secondary material leaving the system
    pub exported: Array2<f64>,
    /// Stockpile carried into next year
    pub stockpile: Array2<f64>,
}

impl Allocation {
    /// Secondary material consumed by manufacturing, `[m, e]`.
    pub fn secondary_consumption(&self) -> Array2<f64> {
        &self.drawn_diverted + &self.drawn_secondary + &self.drawn_stockpile
    }
}

/// Inputs of one year of the market.
#[derive(Debug, Clone)]
pub struct MarketInputs<'a> {
    /// Old scrap from waste management, `[w, e]`
    pub old_scrap: ArrayView2<'a, f64>,
    /// Manufacturing input demand, `[m]`
    pub demand: ArrayView1<'a, f64>,
    /// Share of each waste category of the fabrication scrap buffer diverted to each
    /// material, already scaled by the strategy adoption, `[m, w]`
    pub diversion: ArrayView2<'a, f64>,
    /// Remelting yield, `[w, m, e]`
    pub remelting_yield: ArrayView3<'a, f64>,
    /// `[m, e]`
    pub primary_composition: ArrayView2<'a, f64>,
}

/// Flows of one balanced market year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketOutcome {
    /// Fabrication scrap diverted into the secondary market, `[m, e]`
    pub diverted: Array2<f64>,
    /// Scrap sent to remelting, `[w, e]`
    pub scrap_use: Array2<f64>,
    /// Secondary material produced, `[m, e]`
    pub secondary: Array2<f64>,
    /// Primary material consumed by manufacturing, `[m, e]`
    pub primary: Array2<f64>,
    pub allocation: Allocation,
}

impl MarketOutcome {
    /// Element-resolved manufacturing input, `[m, e]`.
    pub fn manufacturing_input(&self) -> Array2<f64> {
        &self.primary + &self.allocation.secondary_consumption()
    }
}

/// Scrap market with the state carried from one year to the next.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapMarketBalancer {
    scrap_export: bool,
    /// Fabrication scrap buffer, `[w, e]`
    fabrication_buffer: Array2<f64>,
    /// Secondary material stockpile, `[m, e]`
    stockpile: Array2<f64>,
}

impl ScrapMarketBalancer {
    pub fn new(n_waste: usize, n_materials: usize, n_elements: usize, scrap_export: bool) -> Self {
        Self {
            scrap_export,
            fabrication_buffer: Array2::zeros((n_waste, n_elements)),
            stockpile: Array2::zeros((n_materials, n_elements)),
        }
    }

    pub fn fabrication_buffer(&self) -> ArrayView2<'_, f64> {
        self.fabrication_buffer.view()
    }

    pub fn stockpile(&self) -> ArrayView2<'_, f64> {
        self.stockpile.view()
    }

    /// Meet `demand[m]` from the sources in priority order.
    ///
    /// Demand left after all secondary sources is assigned to primary production. Unused
    /// diverted and secondary material is exported when `scrap_export` is set and added to
    /// the stockpile otherwise.
    pub fn allocate(
        demand: ArrayView1<f64>,
        sources: &SupplySources,
        scrap_export: bool,
    ) -> Allocation {
        let shape = sources.secondary.raw_dim();
        let mut drawn = [
            Array2::<f64>::zeros(shape.clone()),
            Array2::<f64>::zeros(shape.clone()),
            Array2::<f64>::zeros(shape),
        ];
        let mut primary = Array1::<f64>::zeros(demand.len());
        let supplies = [&sources.diverted, &sources.secondary, &sources.stockpile];

        for (m, &required) in demand.iter().enumerate() {
            let mut remaining = required.max(0.0);
            for (source, taken) in supplies.iter().zip(drawn.iter_mut()) {
                if remaining <= 0.0 {
                    break;
                }
                let available = source[[m, 0]];
                let take = remaining.min(available);
                let fraction = guarded_divide(take, available);
                taken
                    .row_mut(m)
                    .assign(&source.row(m).mapv(|v| v * fraction));
                remaining -= take;
            }
            primary[m] = remaining.max(0.0);
        }

        let [drawn_diverted, drawn_secondary, drawn_stockpile] = drawn;
        let leftover =
            (&sources.diverted - &drawn_diverted) + (&sources.secondary - &drawn_secondary);
        let carried = &sources.stockpile - &drawn_stockpile;
        let (exported, stockpile) = if scrap_export {
            (leftover, carried)
        } else {
            (Array2::zeros(carried.raw_dim()), carried + leftover)
        };

        Allocation {
            drawn_diverted,
            drawn_secondary,
            drawn_stockpile,
            primary,
            exported,
            stockpile,
        }
    }

    /// Run one year of the market and carry the stockpile forward.
    ///
    /// The fabrication buffer is not replaced until [`ScrapMarketBalancer::close_year`] is
    /// called with this year's new scrap.
    pub fn balance_year(&mut self, inputs: MarketInputs) -> MarketOutcome {
        let (n_materials, n_elements) = self.stockpile.dim();
        let n_waste = self.fabrication_buffer.nrows();

        // Diversion shares of a waste category never exceed the whole buffer
        let mut diversion = inputs.diversion.to_owned();
        for w in 0..n_waste {
            let total = diversion.column(w).sum();
            if total > 1.0 {
                diversion.column_mut(w).mapv_inplace(|v| v / total);
            }
        }
        let mut diverted = Array2::<f64>::zeros((n_materials, n_elements));
        let mut diverted_by_waste = Array2::<f64>::zeros((n_waste, n_elements));
        for m in 0..n_materials {
            for w in 0..n_waste {
                let share = diversion[[m, w]];
                if share == 0.0 {
                    continue;
                }
                let portion = self.fabrication_buffer.row(w).mapv(|v| v * share);
                diverted.row_mut(m).scaled_add(1.0, &portion);
                diverted_by_waste.row_mut(w).scaled_add(1.0, &portion);
            }
        }

        let scrap_use = &inputs.old_scrap + &self.fabrication_buffer - &diverted_by_waste;
        let secondary = remelt(scrap_use.view(), inputs.remelting_yield);

        let sources = SupplySources {
            diverted: diverted.clone(),
            secondary: secondary.clone(),
            stockpile: self.stockpile.clone(),
        };
        let allocation = Self::allocate(inputs.demand, &sources, self.scrap_export);

        let mut primary = inputs.primary_composition.to_owned();
        for (mut row, amount) in primary.axis_iter_mut(Axis(0)).zip(allocation.primary.iter()) {
            row.mapv_inplace(|v| v * amount);
        }

        debug!(
            "scrap market: demand {:.4}, secondary {:.4}, primary {:.4}",
            inputs.demand.sum(),
            allocation.secondary_consumption().slice(s![.., 0]).sum(),
            allocation.primary.sum()
        );
        self.stockpile = allocation.stockpile.clone();

        MarketOutcome {
            diverted,
            scrap_use,
            secondary,
            primary,
            allocation,
        }
    }

    /// Replace the fabrication buffer with this year's new scrap, `[w, e]`.
    pub fn close_year(&mut self, new_scrap: ArrayView2<f64>) {
        self.fabrication_buffer.assign(&new_scrap);
    }
}

/// Secondary material produced from scrap, `[m, e]`.
///
/// Real elements are remelted with their own yield; the total is the sum of the real elements.
pub fn remelt(scrap: ArrayView2<f64>, remelting_yield: ArrayView3<f64>) -> Array2<f64> {
    let (n_waste, n_materials, n_elements) = remelting_yield.dim();
    let mut secondary = Array2::<f64>::zeros((n_materials, n_elements));
    for m in 0..n_materials {
        for e in 1..n_elements {
            secondary[[m, e]] = (0..n_waste)
                .map(|w| scrap[[w, e]] * remelting_yield[[w, m, e]])
                .sum();
        }
        secondary[[m, 0]] = secondary.slice(s![m, 1..]).sum();
    }
    secondary
}

/// Fabrication scrap per waste category and element from manufacturing, `[w, e]`.
///
/// `new_scrap` is the material mass lost per waste category, `[m, w]`, and `composition` the
/// element composition of the manufacturing input, `[m, e]`.
pub fn fabrication_scrap(new_scrap: ArrayView2<f64>, composition: ArrayView2<f64>) -> Array2<f64> {
    let (n_materials, n_waste) = new_scrap.dim();
    let n_elements = composition.ncols();
    let mut scrap = Array2::<f64>::zeros((n_waste, n_elements));
    for w in 0..n_waste {
        for m in 0..n_materials {
            let mass = new_scrap[[m, w]];
            if mass != 0.0 {
                scrap.row_mut(w).scaled_add(mass, &composition.row(m));
            }
        }
    }
    scrap
}

/// Old scrap recovered from waste-management input of one sector, `[w, e]`.
///
/// `waste` is the element-resolved input `[q, k, m, e]` and `rate(q, k, m, w)` the recovery
/// rate as a fraction.
pub fn recover_scrap<F>(waste: &Array4<f64>, n_waste: usize, rate: F) -> Array2<f64>
where
    F: Fn(usize, usize, usize, usize) -> f64,
{
    let (n_regions, n_goods, n_materials, n_elements) = waste.dim();
    let mut scrap = Array2::<f64>::zeros((n_waste, n_elements));
    for q in 0..n_regions {
        for k in 0..n_goods {
            for m in 0..n_materials {
                let lane = waste.slice(s![q, k, m, ..]);
                if lane[0] == 0.0 {
                    continue;
                }
                for w in 0..n_waste {
                    let r = rate(q, k, m, w);
                    if r != 0.0 {
                        scrap.row_mut(w).scaled_add(r, &lane);
                    }
                }
            }
        }
    }
    scrap
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::{array, Array3};

    fn single_material(diverted: f64, secondary: f64, stockpile: f64) -> SupplySources {
        // All, Fe, Other
        let split = |mass: f64| array![[mass, 0.6 * mass, 0.4 * mass]];
        SupplySources {
            diverted: split(diverted),
            secondary: split(secondary),
            stockpile: split(stockpile),
        }
    }

    // ===== Allocation Tests =====

    #[test]
    fn shortfall_uses_every_source_then_primary() {
        let sources = single_material(10.0, 20.0, 5.0);
        let allocation = ScrapMarketBalancer::allocate(array![50.0].view(), &sources, false);
        assert_relative_eq!(allocation.drawn_diverted[[0, 0]], 10.0);
        assert_relative_eq!(allocation.drawn_secondary[[0, 0]], 20.0);
        assert_relative_eq!(allocation.drawn_stockpile[[0, 0]], 5.0);
        assert_relative_eq!(allocation.primary[0], 15.0);
        assert_eq!(allocation.stockpile[[0, 0]], 0.0);
        assert_eq!(allocation.exported[[0, 0]], 0.0);
    }

    #[test]
    fn surplus_of_diverted_scrap_is_stockpiled() {
        let sources = single_material(10.0, 20.0, 5.0);
        let allocation = ScrapMarketBalancer::allocate(array![4.0].view(), &sources, false);
        assert_relative_eq!(allocation.drawn_diverted[[0, 0]], 4.0);
        assert_eq!(allocation.drawn_secondary[[0, 0]], 0.0);
        assert_eq!(allocation.drawn_stockpile[[0, 0]], 0.0);
        assert_eq!(allocation.primary[0], 0.0);
        // 6 diverted + 20 secondary + 5 carried
        assert_relative_eq!(allocation.stockpile[[0, 0]], 31.0);
        assert_relative_eq!(allocation.stockpile[[0, 1]], 0.6 * 31.0);
    }

    #[test]
    fn surplus_is_exported_when_switched_on() {
        let sources = single_material(10.0, 20.0, 5.0);
        let allocation = ScrapMarketBalancer::allocate(array![4.0].view(), &sources, true);
        assert_relative_eq!(allocation.exported[[0, 0]], 26.0);
        assert_relative_eq!(allocation.stockpile[[0, 0]], 5.0);
    }

    #[test]
    fn partial_draw_keeps_source_composition() {
        let sources = SupplySources {
            diverted: array![[0.0, 0.0, 0.0]],
            secondary: array![[10.0, 9.0, 1.0]],
            stockpile: array![[0.0, 0.0, 0.0]],
        };
        let allocation = ScrapMarketBalancer::allocate(array![6.0].view(), &sources, false);
        assert_relative_eq!(allocation.drawn_secondary[[0, 1]], 5.4);
        assert_relative_eq!(allocation.drawn_secondary[[0, 2]], 0.6);
        assert!(allocation
            .drawn_secondary
            .iter()
            .zip(sources.secondary.iter())
            .all(|(d, a)| d <= a));
    }

    #[test]
    fn every_unit_of_supply_is_accounted_for() {
        let sources = single_material(3.0, 7.0, 2.0);
        for demand in [0.0, 2.0, 5.0, 11.0, 40.0] {
            let a = ScrapMarketBalancer::allocate(array![demand].view(), &sources, false);
            let supplied = a.secondary_consumption()[[0, 0]] + a.primary[0];
            assert_relative_eq!(supplied, demand, epsilon = 1e-12);
            let kept = a.secondary_consumption()[[0, 0]] + a.stockpile[[0, 0]];
            assert_relative_eq!(kept, 12.0, epsilon = 1e-12);
        }
    }

    // ===== Market Year Tests =====

    #[test]
    fn market_year_diverts_buffer_and_remelts_the_rest() {
        let mut market = ScrapMarketBalancer::new(1, 1, 3, false);
        market.close_year(array![[10.0, 8.0, 2.0]].view());

        let old_scrap = array![[20.0, 16.0, 4.0]];
        let demand = array![12.0];
        let diversion = array![[0.5]];
        let remelting_yield = Array3::from_elem((1, 1, 3), 0.5);
        let primary_composition = array![[1.0, 1.0, 0.0]];
        let outcome = market.balance_year(MarketInputs {
            old_scrap: old_scrap.view(),
            demand: demand.view(),
            diversion: diversion.view(),
            remelting_yield: remelting_yield.view(),
            primary_composition: primary_composition.view(),
        });

        assert_relative_eq!(outcome.diverted[[0, 0]], 5.0);
        assert_relative_eq!(outcome.scrap_use[[0, 0]], 25.0);
        assert_relative_eq!(outcome.secondary[[0, 0]], 12.5);
        // 5 diverted, 7 secondary, nothing primary
        assert_relative_eq!(outcome.allocation.drawn_secondary[[0, 0]], 7.0);
        assert_eq!(outcome.allocation.primary[0], 0.0);
        assert_relative_eq!(market.stockpile()[[0, 0]], 5.5);
        assert_relative_eq!(outcome.manufacturing_input()[[0, 0]], 12.0);
    }

    #[test]
    fn oversubscribed_diversion_is_normalised() {
        let mut market = ScrapMarketBalancer::new(1, 2, 2, true);
        market.close_year(array![[10.0, 10.0]].view());
        let old_scrap = array![[0.0, 0.0]];
        let demand = array![0.0, 0.0];
        let diversion = array![[0.8], [0.8]];
        let remelting_yield = Array3::zeros((1, 2, 2));
        let primary_composition = array![[1.0, 1.0], [1.0, 1.0]];
        let outcome = market.balance_year(MarketInputs {
            old_scrap: old_scrap.view(),
            demand: demand.view(),
            diversion: diversion.view(),
            remelting_yield: remelting_yield.view(),
            primary_composition: primary_composition.view(),
        });
        assert_relative_eq!(outcome.diverted.column(0).sum(), 10.0);
        assert_relative_eq!(outcome.scrap_use[[0, 0]], 0.0);
        assert_relative_eq!(outcome.allocation.exported.column(0).sum(), 10.0);
    }

    #[test]
    fn fabrication_scrap_follows_input_composition() {
        let new_scrap = array![[2.0, 1.0]];
        let composition = array![[1.0, 0.75, 0.25]];
        let scrap = fabrication_scrap(new_scrap.view(), composition.view());
        assert_eq!(scrap, array![[2.0, 1.5, 0.5], [1.0, 0.75, 0.25]]);
    }
}
