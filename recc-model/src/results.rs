//! Result tables of scenario runs.
//!
//! Every scenario pair produces a [`ScenarioResults`]. A [`ResultsCollection`] stacks a named
//! table across all pairs, adding trailing socioeconomic and climate-policy axes.

use crate::cycle::CycleOutcome;
use crate::emissions::EmissionsResults;
use crate::sectors::{NegativeInflowFlag, SectorKind, SectorStocks};
use ndarray::{Array1, Array2, Array3, ArrayD, Axis, IxDyn};
use recc_core::errors::{RECCError, RECCResult};
use recc_core::system::{FlowId, FlowRegistry, MassBalance, StockId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Names of the result tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResultName {
    /// `[t, g]`
    StockByProduct,
    /// `[t, g]`
    InflowByProduct,
    /// `[t, g]`
    OutflowByProduct,
    /// Regional sectors only, `[t, r, g]`
    StockByRegion,
    /// `[t, r, g]`
    StockPerCapita,
    /// `[t, r]`
    Population,
    /// `[t, x, e]`
    Flow(FlowId),
    /// `[t, x, e]`
    Stock(StockId),
    /// Composition of materials in the in-use stock by cohort, `[c, m, e]`
    InUseComposition,
    /// Composition of manufacturing input by cohort, `[c, m, e]`
    ManufacturedComposition,
    /// `[t, EnergyUse, n]`
    Energy,
    /// `[t, r, n]`
    UsePhaseEnergyByRegion,
    /// `[t, EmissionGroup]`
    Emissions,
    /// `[t]`
    EmissionsTotal,
    /// `[t]`
    GhgCosts,
    /// Number of (sector, region) pairs with clipped negative inflow, `[t]`
    NegativeInflowCount,
    /// `[t, m]`
    ReuseDroppedMass,
    /// Sum of absolute process residuals, `[t]`
    MassBalanceDeviation,
    /// Base-year target over historic stock, `[sector, r]`
    StockMatch,
}

impl ResultName {
    /// Every table, flows and stocks included.
    pub fn all() -> Vec<ResultName> {
        let mut names = vec![
            ResultName::StockByProduct,
            ResultName::InflowByProduct,
            ResultName::OutflowByProduct,
            ResultName::StockByRegion,
            ResultName::StockPerCapita,
            ResultName::Population,
        ];
        names.extend(FlowId::ALL.iter().map(|id| ResultName::Flow(*id)));
        names.extend(StockId::ALL.iter().map(|id| ResultName::Stock(*id)));
        names.extend([
            ResultName::InUseComposition,
            ResultName::ManufacturedComposition,
            ResultName::Energy,
            ResultName::UsePhaseEnergyByRegion,
            ResultName::Emissions,
            ResultName::EmissionsTotal,
            ResultName::GhgCosts,
            ResultName::NegativeInflowCount,
            ResultName::ReuseDroppedMass,
            ResultName::MassBalanceDeviation,
            ResultName::StockMatch,
        ]);
        names
    }
}

impl fmt::Display for ResultName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResultName::Flow(id) => write!(f, "{}", id),
            ResultName::Stock(id) => write!(f, "{}", id),
            other => write!(f, "{:?}", other),
        }
    }
}

/// Conditions a run recovered from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnostics {
    pub negative_inflow: Vec<NegativeInflowFlag>,
    /// `[t, m]`
    pub reuse_dropped_mass: Array2<f64>,
    pub mass_balance: MassBalance,
    /// `[sector, r]`; zero for sectors without a historic stock
    pub stock_match: Array2<f64>,
}

impl Diagnostics {
    /// Flagged (sector, region) pairs per model year.
    pub fn negative_inflow_count(&self, n_years: usize) -> Array1<f64> {
        let mut count = Array1::<f64>::zeros(n_years);
        for flag in &self.negative_inflow {
            for &t in &flag.years {
                if t < n_years {
                    count[t] += 1.0;
                }
            }
        }
        count
    }
}

/// Results of one (socioeconomic, climate policy) scenario pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResults {
    pub socioeconomic: usize,
    pub climate_policy: usize,
    pub sectors: Vec<SectorKind>,
    pub stock_by_product: Array2<f64>,
    pub inflow_by_product: Array2<f64>,
    pub outflow_by_product: Array2<f64>,
    pub stock_by_region: Array3<f64>,
    pub population: Array2<f64>,
    pub registry: FlowRegistry,
    pub in_use_composition: Array3<f64>,
    pub manufactured_composition: Array3<f64>,
    pub emissions: EmissionsResults,
    pub diagnostics: Diagnostics,
}

impl ScenarioResults {
    pub fn new(
        socioeconomic: usize,
        climate_policy: usize,
        shape: ResultShape,
        stocks: &SectorStocks,
        population: Array2<f64>,
        cycle: CycleOutcome,
        emissions: EmissionsResults,
    ) -> Self {
        let ResultShape {
            n_years,
            n_regions,
            n_goods,
        } = shape;

        let mut stock_match = Array2::<f64>::zeros((stocks.sectors.len(), n_regions));
        for (i, sector) in stocks.sectors.iter().enumerate() {
            if let Some(ratios) = &sector.stock_match {
                if ratios.len() == n_regions {
                    stock_match.row_mut(i).assign(ratios);
                }
            }
        }

        Self {
            socioeconomic,
            climate_policy,
            sectors: stocks.sectors.iter().map(|s| s.kind).collect(),
            stock_by_product: stocks.stock_by_good(n_years, n_goods),
            inflow_by_product: stocks.inflow_by_good(n_years, n_goods),
            outflow_by_product: stocks.outflow_by_good(n_years, n_goods),
            stock_by_region: stocks.stock_by_region(n_years, n_regions, n_goods),
            population,
            in_use_composition: cycle.compositions.in_use().clone(),
            manufactured_composition: cycle.compositions.manufactured().clone(),
            registry: cycle.registry,
            emissions,
            diagnostics: Diagnostics {
                negative_inflow: stocks.negative_inflow(),
                reuse_dropped_mass: cycle.reuse_dropped,
                mass_balance: cycle.mass_balance,
                stock_match,
            },
        }
    }

    /// Stock per inhabitant of the regional sectors, `[t, r, g]`.
    pub fn stock_per_capita(&self) -> Array3<f64> {
        let mut per_capita = self.stock_by_region.clone();
        for ((t, r, _), value) in per_capita.indexed_iter_mut() {
            *value = recc_core::utils::guarded_divide(*value, self.population[[t, r]]);
        }
        per_capita
    }

    pub fn get(&self, name: ResultName) -> ArrayD<f64> {
        let n_years = self.stock_by_product.nrows();
        match name {
            ResultName::StockByProduct => self.stock_by_product.clone().into_dyn(),
            ResultName::InflowByProduct => self.inflow_by_product.clone().into_dyn(),
            ResultName::OutflowByProduct => self.outflow_by_product.clone().into_dyn(),
            ResultName::StockByRegion => self.stock_by_region.clone().into_dyn(),
            ResultName::StockPerCapita => self.stock_per_capita().into_dyn(),
            ResultName::Population => self.population.clone().into_dyn(),
            ResultName::Flow(id) => self.registry.flow(id).to_owned().into_dyn(),
            ResultName::Stock(id) => self.registry.stock(id).to_owned().into_dyn(),
            ResultName::InUseComposition => self.in_use_composition.clone().into_dyn(),
            ResultName::ManufacturedComposition => {
                self.manufactured_composition.clone().into_dyn()
            }
            ResultName::Energy => self.emissions.energy.clone().into_dyn(),
            ResultName::UsePhaseEnergyByRegion => {
                self.emissions.use_phase_energy_by_region.clone().into_dyn()
            }
            ResultName::Emissions => self.emissions.emissions.clone().into_dyn(),
            ResultName::EmissionsTotal => self.emissions.total.clone().into_dyn(),
            ResultName::GhgCosts => self.emissions.costs.clone().into_dyn(),
            ResultName::NegativeInflowCount => {
                self.diagnostics.negative_inflow_count(n_years).into_dyn()
            }
            ResultName::ReuseDroppedMass => self.diagnostics.reuse_dropped_mass.clone().into_dyn(),
            ResultName::MassBalanceDeviation => self
                .diagnostics
                .mass_balance
                .total_abs_by_year()
                .into_dyn(),
            ResultName::StockMatch => self.diagnostics.stock_match.clone().into_dyn(),
        }
    }
}

/// Lengths of the axes shared by the result tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResultShape {
    pub n_years: usize,
    pub n_regions: usize,
    pub n_goods: usize,
}

/// Results of every scenario pair of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultsCollection {
    n_socioeconomic: usize,
    n_climate_policy: usize,
    results: Vec<ScenarioResults>,
}

impl ResultsCollection {
    pub fn new(n_socioeconomic: usize, n_climate_policy: usize) -> Self {
        Self {
            n_socioeconomic,
            n_climate_policy,
            results: Vec::new(),
        }
    }

    pub fn push(&mut self, results: ScenarioResults) {
        self.results.push(results);
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ScenarioResults> {
        self.results.iter()
    }

    pub fn get(&self, socioeconomic: usize, climate_policy: usize) -> Option<&ScenarioResults> {
        self.results
            .iter()
            .find(|r| r.socioeconomic == socioeconomic && r.climate_policy == climate_policy)
    }

    /// A table of every scenario pair with trailing `[S, R]` axes.
    ///
    /// Fails unless every pair has been run.
    pub fn stacked(&self, name: ResultName) -> RECCResult<ArrayD<f64>> {
        let first = self
            .get(0, 0)
            .ok_or_else(|| RECCError::Error(format!("no results to stack for {}", name)))?
            .get(name);
        let mut shape = first.shape().to_vec();
        shape.push(self.n_socioeconomic);
        shape.push(self.n_climate_policy);
        let mut stacked = ArrayD::<f64>::zeros(IxDyn(&shape));
        let r_axis = Axis(shape.len() - 1);
        let s_axis = Axis(shape.len() - 2);

        for s in 0..self.n_socioeconomic {
            for r in 0..self.n_climate_policy {
                let table = match (s, r) {
                    (0, 0) => first.clone(),
                    _ => self
                        .get(s, r)
                        .ok_or_else(|| {
                            RECCError::InconsistentSelection(format!(
                                "scenario pair ({}, {}) has no results",
                                s, r
                            ))
                        })?
                        .get(name),
                };
                let mut slot = stacked.index_axis_mut(r_axis, r);
                let mut slot = slot.index_axis_mut(s_axis, s);
                if slot.shape() != table.shape() {
                    return Err(RECCError::ShapeMismatch {
                        name: name.to_string(),
                        structure: "stacked".to_string(),
                        expected: slot.shape().to_vec(),
                        found: table.shape().to_vec(),
                    });
                }
                slot.assign(&table);
            }
        }
        Ok(stacked)
    }
}
