//! End-use sectors and the sector stock orchestrator.
//!
//! Each modelled sector owns a disjoint subset of the good classification. Sector tables use a
//! local good axis `k` over those goods; [`ResolvedSector::goods`] maps it back to the global
//! good index. Sector results are therefore disjoint by construction and are merged into
//! global tensors by scattering along the good axis.
//!
//! Regional sectors run the stock-driven model per (region, good). Global non-residential
//! buildings follow a given stock series over the full history, uncorrected. Industry and
//! appliances run the inflow-driven model per (aggregate region, good).

pub mod demand;
pub mod lifetime;

use crate::config::{SectorConfig, StrategySwitches};
use crate::parameters::{ScenarioDriver, ScenarioParameters, ScenarioSector};
use log::{info, warn};
use ndarray::{s, Array1, Array2, Array3, Array4, ArrayView2, Axis};
use recc_core::classification::{Aspect, ClassificationSet};
use recc_core::dsm::{CohortStockEngine, StockDrivenInput};
use recc_core::errors::{RECCError, RECCResult};
use recc_core::survival::{SurvivalFunctionBuilder, SurvivalMatrix};
use recc_core::time::TimeAxis;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// The end-use sectors the model knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SectorKind {
    #[serde(rename = "passvehicles")]
    PassengerVehicles,
    #[serde(rename = "resbuildings")]
    ResidentialBuildings,
    #[serde(rename = "nonresbuildings")]
    NonResidentialBuildings,
    #[serde(rename = "nonresbuildings_g")]
    NonResidentialBuildingsGlobal,
    #[serde(rename = "industry")]
    Industry,
    #[serde(rename = "appliances")]
    Appliances,
}

/// Region axis a sector is resolved on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Scope {
    Regional,
    Aggregate,
}

impl Scope {
    pub fn aspect(&self) -> Aspect {
        match self {
            Scope::Regional => Aspect::Region,
            Scope::Aggregate => Aspect::AggregateRegion,
        }
    }

    /// Replace the sector-region placeholder `q` in an index structure template.
    pub fn structure(&self, template: &str) -> String {
        let letter = self.aspect().index_letter().to_string();
        template.replace('q', &letter)
    }
}

/// What drives the stock model of a sector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverKind {
    /// Per-capita demand with a historic initial stock and a type split
    Demand,
    /// Total stock per good over every cohort year
    StockHistory,
    /// Inflow per cohort
    Inflow,
}

/// How lifetime extension is applied to a sector's cohorts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifetimeExtensionMode {
    /// Cohorts from the base year on, following the strategy scale-up
    FutureCohorts,
    /// Every cohort, ramped linearly up to the switch time
    AllCohorts,
}

impl SectorKind {
    pub const ALL: [SectorKind; 6] = [
        SectorKind::PassengerVehicles,
        SectorKind::ResidentialBuildings,
        SectorKind::NonResidentialBuildings,
        SectorKind::NonResidentialBuildingsGlobal,
        SectorKind::Industry,
        SectorKind::Appliances,
    ];

    /// Key used in parameter names and configuration files.
    pub fn key(&self) -> &'static str {
        match self {
            SectorKind::PassengerVehicles => "passvehicles",
            SectorKind::ResidentialBuildings => "resbuildings",
            SectorKind::NonResidentialBuildings => "nonresbuildings",
            SectorKind::NonResidentialBuildingsGlobal => "nonresbuildings_g",
            SectorKind::Industry => "industry",
            SectorKind::Appliances => "appliances",
        }
    }

    pub fn scope(&self) -> Scope {
        match self {
            SectorKind::PassengerVehicles
            | SectorKind::ResidentialBuildings
            | SectorKind::NonResidentialBuildings => Scope::Regional,
            SectorKind::NonResidentialBuildingsGlobal
            | SectorKind::Industry
            | SectorKind::Appliances => Scope::Aggregate,
        }
    }

    pub fn driver(&self) -> DriverKind {
        match self {
            SectorKind::PassengerVehicles
            | SectorKind::ResidentialBuildings
            | SectorKind::NonResidentialBuildings => DriverKind::Demand,
            SectorKind::NonResidentialBuildingsGlobal => DriverKind::StockHistory,
            SectorKind::Industry | SectorKind::Appliances => DriverKind::Inflow,
        }
    }

    pub fn is_building(&self) -> bool {
        matches!(
            self,
            SectorKind::ResidentialBuildings
                | SectorKind::NonResidentialBuildings
                | SectorKind::NonResidentialBuildingsGlobal
        )
    }

    /// Factor converting product quantity times material intensity into the flow unit.
    pub fn mass_unit_factor(&self) -> f64 {
        match self {
            SectorKind::Appliances => 1e-12,
            _ => 1e-3,
        }
    }

    /// Factor converting manufacturing energy intensity times inflow into the energy unit.
    pub fn manufacturing_energy_factor(&self) -> f64 {
        match self {
            SectorKind::Appliances => 1e-6,
            _ => 1.0,
        }
    }

    pub fn renovation_enabled(&self, switches: &StrategySwitches) -> bool {
        match self {
            SectorKind::ResidentialBuildings => switches.residential_renovation,
            SectorKind::NonResidentialBuildings => switches.nonresidential_renovation,
            _ => false,
        }
    }

    pub fn lifetime_extension_mode(&self) -> LifetimeExtensionMode {
        match self {
            SectorKind::ResidentialBuildings | SectorKind::NonResidentialBuildings => {
                LifetimeExtensionMode::AllCohorts
            }
            _ => LifetimeExtensionMode::FutureCohorts,
        }
    }
}

/// A configured sector with its goods resolved to global good indices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedSector {
    pub kind: SectorKind,
    pub goods: Vec<usize>,
}

/// Resolve the configured sectors against the good classification.
///
/// Fails if a good label is unknown, if a good is claimed by two sectors or if a sector is
/// configured twice. Aggregate sectors need an aggregate region classification, which must
/// hold a single region for the global stock series.
pub fn resolve_sectors(
    configs: &[SectorConfig],
    classifications: &ClassificationSet,
) -> RECCResult<Vec<ResolvedSector>> {
    let mut seen_kinds = BTreeSet::new();
    let mut seen_goods = BTreeSet::new();
    let mut resolved = Vec::with_capacity(configs.len());

    for config in configs {
        if !seen_kinds.insert(config.kind) {
            return Err(RECCError::InconsistentSelection(format!(
                "sector '{}' is configured more than once",
                config.kind.key()
            )));
        }
        if config.goods.is_empty() {
            return Err(RECCError::InconsistentSelection(format!(
                "sector '{}' has no goods",
                config.kind.key()
            )));
        }
        let regions = classifications.get(config.kind.scope().aspect())?;
        if config.kind.driver() == DriverKind::StockHistory && regions.len() != 1 {
            return Err(RECCError::InconsistentSelection(format!(
                "sector '{}' needs exactly one aggregate region, found {}",
                config.kind.key(),
                regions.len()
            )));
        }

        let goods = config
            .goods
            .iter()
            .map(|label| classifications.index_of(Aspect::Good, label))
            .collect::<RECCResult<Vec<_>>>()?;
        for (label, g) in config.goods.iter().zip(&goods) {
            if !seen_goods.insert(*g) {
                return Err(RECCError::InconsistentSelection(format!(
                    "good '{}' is assigned to more than one sector",
                    label
                )));
            }
        }
        resolved.push(ResolvedSector {
            kind: config.kind,
            goods,
        });
    }
    Ok(resolved)
}

/// A stock-driven (sector, region) pair whose required inflow was negative in some years.
///
/// `region` indexes the sector's own region axis. Demand-driven sectors clip the inflow to
/// zero in these years; the global stock series keeps it negative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NegativeInflowFlag {
    pub sector: SectorKind,
    pub region: usize,
    pub years: Vec<usize>,
}

/// Stock, outflow and inflow of one sector, indexed by model year.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectorFlows {
    pub kind: SectorKind,
    pub goods: Vec<usize>,
    /// `[t, c, q, k]`
    pub stock: Array4<f64>,
    /// `[t, c, q, k]`
    pub outflow: Array4<f64>,
    /// `[t, q, k]`
    pub inflow: Array3<f64>,
    /// Target stock per capita of stock-driven sectors, `[t, r]`
    pub per_capita: Option<Array2<f64>>,
    pub negative_inflow: Vec<NegativeInflowFlag>,
    /// Base-year target stock over supplied historic stock per region, stock-driven only
    pub stock_match: Option<Array1<f64>>,
}

impl SectorFlows {
    pub fn total_stock(&self) -> Array3<f64> {
        self.stock.sum_axis(Axis(1))
    }

    pub fn total_outflow(&self) -> Array3<f64> {
        self.outflow.sum_axis(Axis(1))
    }
}

/// Stock results of every sector of one scenario pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectorStocks {
    pub sectors: Vec<SectorFlows>,
}

impl SectorStocks {
    /// Scatter a per-sector `[t, k]` quantity into a global `[t, g]` tensor.
    fn merge_by_good<F>(&self, n_years: usize, n_goods: usize, quantity: F) -> Array2<f64>
    where
        F: Fn(&SectorFlows) -> Array2<f64>,
    {
        let mut merged = Array2::<f64>::zeros((n_years, n_goods));
        for sector in &self.sectors {
            let values = quantity(sector);
            for (k, &g) in sector.goods.iter().enumerate() {
                merged.column_mut(g).assign(&values.column(k));
            }
        }
        merged
    }

    /// Total stock per model year and good, `[t, g]`.
    pub fn stock_by_good(&self, n_years: usize, n_goods: usize) -> Array2<f64> {
        self.merge_by_good(n_years, n_goods, |sector| {
            sector.total_stock().sum_axis(Axis(1))
        })
    }

    pub fn inflow_by_good(&self, n_years: usize, n_goods: usize) -> Array2<f64> {
        self.merge_by_good(n_years, n_goods, |sector| sector.inflow.sum_axis(Axis(1)))
    }

    pub fn outflow_by_good(&self, n_years: usize, n_goods: usize) -> Array2<f64> {
        self.merge_by_good(n_years, n_goods, |sector| {
            sector.total_outflow().sum_axis(Axis(1))
        })
    }

    /// Stock of the regional sectors per model year, region and good, `[t, r, g]`.
    pub fn stock_by_region(&self, n_years: usize, n_regions: usize, n_goods: usize) -> Array3<f64> {
        let mut merged = Array3::<f64>::zeros((n_years, n_regions, n_goods));
        for sector in self
            .sectors
            .iter()
            .filter(|s| s.kind.scope() == Scope::Regional)
        {
            let stock = sector.total_stock();
            for (k, &g) in sector.goods.iter().enumerate() {
                merged
                    .slice_mut(s![.., .., g])
                    .assign(&stock.slice(s![.., .., k]));
            }
        }
        merged
    }

    pub fn negative_inflow(&self) -> Vec<NegativeInflowFlag> {
        self.sectors
            .iter()
            .flat_map(|s| s.negative_inflow.iter().cloned())
            .collect()
    }
}

/// Runs the dynamic stock model for every sector of a scenario pair.
pub struct SectorStockOrchestrator;

impl SectorStockOrchestrator {
    pub fn run(scenario: &ScenarioParameters) -> RECCResult<SectorStocks> {
        let time = *scenario.time();
        let survival = &scenario.prepared.survival;
        let sectors = scenario
            .sectors
            .iter()
            .map(|sector| {
                info!("Running dynamic stock model for {}", sector.kind.key());
                match &sector.driver {
                    ScenarioDriver::Demand {
                        per_capita,
                        population,
                        initial_stock,
                        type_split,
                    } => Self::run_stock_driven(
                        &time,
                        survival,
                        sector,
                        per_capita.view(),
                        population.view(),
                        initial_stock,
                        type_split,
                    ),
                    ScenarioDriver::StockHistory { stock } => {
                        Self::run_stock_history(&time, survival, sector, stock)
                    }
                    ScenarioDriver::Inflow { inflow } => {
                        Self::run_inflow_driven(&time, survival, sector, inflow)
                    }
                }
            })
            .collect::<RECCResult<Vec<_>>>()?;
        Ok(SectorStocks { sectors })
    }

    fn run_stock_driven(
        time: &TimeAxis,
        survival: &SurvivalFunctionBuilder,
        sector: &ScenarioSector,
        per_capita: ArrayView2<f64>,
        population: ArrayView2<f64>,
        initial_stock: &Array3<f64>,
        type_split: &Array3<f64>,
    ) -> RECCResult<SectorFlows> {
        let (nt, nc) = (time.n_years, time.n_cohorts);
        let (n_goods, n_regions, _) = sector.lifetime.dim();

        let mut stock = Array4::<f64>::zeros((nt, nc, n_regions, n_goods));
        let mut outflow = Array4::<f64>::zeros((nt, nc, n_regions, n_goods));
        let mut inflow = Array3::<f64>::zeros((nt, n_regions, n_goods));
        let mut stock_match = Array1::<f64>::zeros(n_regions);
        let mut negative_inflow = Vec::new();

        let target = &per_capita * &population;
        for r in 0..n_regions {
            let survival_matrices = (0..n_goods)
                .map(|k| survival.build(sector.lifetime.slice(s![k, r, ..])))
                .collect::<Vec<SurvivalMatrix>>();
            let split = type_split.index_axis(Axis(1), r);
            let flows = CohortStockEngine::stock_driven(&StockDrivenInput {
                time: *time,
                target_stock: target.column(r),
                initial_stock: initial_stock.index_axis(Axis(2), r),
                survival: &survival_matrices,
                type_split: split.t(),
            })?;

            stock.slice_mut(s![.., .., r, ..]).assign(&flows.stock);
            outflow.slice_mut(s![.., .., r, ..]).assign(&flows.outflow);
            inflow.slice_mut(s![.., r, ..]).assign(&flows.inflow);
            stock_match[r] = flows.stock_match;
            if flows.has_negative_inflow() {
                warn!(
                    "{}: negative inflow in region {} clipped in {} year(s)",
                    sector.kind.key(),
                    r,
                    flows.negative_inflow_years.len()
                );
                negative_inflow.push(NegativeInflowFlag {
                    sector: sector.kind,
                    region: r,
                    years: flows.negative_inflow_years.clone(),
                });
            }
        }

        Ok(SectorFlows {
            kind: sector.kind,
            goods: sector.goods.clone(),
            stock,
            outflow,
            inflow,
            per_capita: Some(per_capita.to_owned()),
            negative_inflow,
            stock_match: Some(stock_match),
        })
    }

    fn run_stock_history(
        time: &TimeAxis,
        survival: &SurvivalFunctionBuilder,
        sector: &ScenarioSector,
        target: &Array2<f64>,
    ) -> RECCResult<SectorFlows> {
        let (nt, nc) = (time.n_years, time.n_cohorts);
        let (n_goods, n_regions, _) = sector.lifetime.dim();
        let offset = time.cohort_index_for_year(0);

        let mut stock = Array4::<f64>::zeros((nt, nc, n_regions, n_goods));
        let mut outflow = Array4::<f64>::zeros((nt, nc, n_regions, n_goods));
        let mut inflow = Array3::<f64>::zeros((nt, n_regions, n_goods));
        let mut negative_inflow = Vec::new();

        for o in 0..n_regions {
            let mut years = BTreeSet::new();
            for k in 0..n_goods {
                let sf = survival.build(sector.lifetime.slice(s![k, o, ..]));
                let history = CohortStockEngine::stock_driven_history(target.row(k), &sf)?;
                years.extend(
                    history
                        .negative_inflow_years()
                        .into_iter()
                        .filter(|c| *c > offset)
                        .map(|c| c - offset),
                );
                let flows = history.model_years(time);
                stock.slice_mut(s![.., .., o, k]).assign(&flows.stock);
                outflow.slice_mut(s![.., .., o, k]).assign(&flows.outflow);
                inflow.slice_mut(s![.., o, k]).assign(&flows.inflow);
            }
            if !years.is_empty() {
                warn!(
                    "{}: negative inflow in aggregate region {} kept in {} year(s)",
                    sector.kind.key(),
                    o,
                    years.len()
                );
                negative_inflow.push(NegativeInflowFlag {
                    sector: sector.kind,
                    region: o,
                    years: years.into_iter().collect(),
                });
            }
        }

        Ok(SectorFlows {
            kind: sector.kind,
            goods: sector.goods.clone(),
            stock,
            outflow,
            inflow,
            per_capita: None,
            negative_inflow,
            stock_match: None,
        })
    }

    fn run_inflow_driven(
        time: &TimeAxis,
        survival: &SurvivalFunctionBuilder,
        sector: &ScenarioSector,
        inflow_by_cohort: &Array3<f64>,
    ) -> RECCResult<SectorFlows> {
        let (nt, nc) = (time.n_years, time.n_cohorts);
        let (n_goods, n_regions, _) = sector.lifetime.dim();

        let mut stock = Array4::<f64>::zeros((nt, nc, n_regions, n_goods));
        let mut outflow = Array4::<f64>::zeros((nt, nc, n_regions, n_goods));
        let mut inflow = Array3::<f64>::zeros((nt, n_regions, n_goods));

        for o in 0..n_regions {
            for k in 0..n_goods {
                let sf = survival.build(sector.lifetime.slice(s![k, o, ..]));
                let flows = CohortStockEngine::inflow_driven(
                    inflow_by_cohort.slice(s![.., o, k]),
                    &sf,
                )?
                .model_years(time);
                stock.slice_mut(s![.., .., o, k]).assign(&flows.stock);
                outflow.slice_mut(s![.., .., o, k]).assign(&flows.outflow);
                inflow.slice_mut(s![.., o, k]).assign(&flows.inflow);
            }
        }

        Ok(SectorFlows {
            kind: sector.kind,
            goods: sector.goods.clone(),
            stock,
            outflow,
            inflow,
            per_capita: None,
            negative_inflow: Vec::new(),
            stock_match: None,
        })
    }
}
