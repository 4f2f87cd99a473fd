//! Run configuration.
//!
//! A [`ModelConfig`] is read from TOML once, before any scenario pair runs. It holds the
//! resource-efficiency strategy switches, the sectors that are modelled and the handful of
//! scalar constants of the material and emissions layers.
//!
//! ```toml
//! minimum_demand_scenario = "LED"
//! scrap_export = true
//!
//! [strategies]
//! lifetime_extension = true
//! reuse = true
//!
//! [survival]
//! type = "Normal"
//! relative_std = 0.3
//!
//! [[sectors]]
//! kind = "passvehicles"
//! goods = ["BEV", "ICEV"]
//! ```

use crate::sectors::SectorKind;
use recc_core::errors::RECCResult;
use recc_core::survival::{LifetimeDistribution, NormalLifetime, SurvivalFunctionBuilder};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// Resource-efficiency strategies that can be switched on for a run.
///
/// Every strategy is off by default, which gives the reference run without additional
/// resource-efficiency measures.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategySwitches {
    /// Extend product lifetimes by the lifetime-extension potential
    pub lifetime_extension: bool,
    /// Reduce the vehicle stock and lengthen vehicle lifetimes through car-sharing
    pub car_sharing: bool,
    /// Raise vehicle occupancy through ride-sharing
    pub ride_sharing: bool,
    /// Lower building stock per capita towards the more-intense-use potential
    pub more_intense_use: bool,
    /// Let light-weighting shares follow their scenario trajectory
    pub material_substitution: bool,
    /// Let down-sizing shares follow their scenario trajectory
    pub using_less_material_by_design: bool,
    /// Reduce fabrication yield losses
    pub fabrication_yield_improvement: bool,
    /// Divert fabrication scrap directly into manufacturing
    pub fabrication_scrap_diversion: bool,
    /// Raise end-of-life recovery rates
    pub eol_recovery_improvement: bool,
    /// Reduce the cement content of future cohorts
    pub material_efficiency: bool,
    /// Re-use components of discarded products
    pub reuse: bool,
    /// Renovate historic residential buildings
    pub residential_renovation: bool,
    /// Renovate historic non-residential buildings
    pub nonresidential_renovation: bool,
}

/// Labels of classification items with a special role in the material and emissions layers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpecialItems {
    /// Material that is split into cement and aggregates
    /// default: "concrete"
    pub concrete: String,
    /// default: "cement"
    pub cement: String,
    /// default: "aggregates"
    pub aggregates: String,
    /// Material whose carbon content earns the biogenic-carbon credit
    /// default: "wood"
    pub wood: String,
    /// Energy carrier floored at the backstop intensity and reported as scope 2
    /// default: "electricity"
    pub electricity: String,
}

impl Default for SpecialItems {
    fn default() -> Self {
        Self {
            concrete: "concrete".to_string(),
            cement: "cement".to_string(),
            aggregates: "aggregates".to_string(),
            wood: "wood".to_string(),
            electricity: "electricity".to_string(),
        }
    }
}

/// A modelled sector and the goods it owns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectorConfig {
    pub kind: SectorKind,
    /// Labels from the good classification; no good may belong to two sectors
    pub goods: Vec<String>,
}

/// Configuration of a model run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub strategies: StrategySwitches,

    /// Keep end-of-life recovery and remelting. Off gives the no-recycling counterfactual.
    /// default: true
    pub include_recycling: bool,

    /// Freeze energy intensities, material intensities and type splits of cohorts from
    /// `efficiency_freeze_year` on.
    /// default: false
    pub no_efficiency_improvements: bool,

    /// default: 2020
    pub efficiency_freeze_year: i32,

    /// Export unused secondary material instead of stockpiling it.
    /// default: false
    pub scrap_export: bool,

    /// Credit exported secondary material with the avoided primary production.
    /// default: false
    pub scrap_export_recycling_credit: bool,

    /// Account for the biogenic carbon stored in wood products.
    /// default: true
    pub gwp_bio: bool,

    /// Socioeconomic scenario whose per-capita stock is the floor for every other scenario.
    /// default: "LED"
    pub minimum_demand_scenario: String,

    pub sectors: Vec<SectorConfig>,

    /// Lifetime distribution of all products.
    /// default: Normal with a relative standard deviation of 0.3
    #[serde(default = "default_survival")]
    pub survival: Arc<dyn LifetimeDistribution>,

    /// Largest tolerated process-balance residual before a warning is logged, in Mt/yr.
    /// default: 1e-3
    pub mass_balance_tolerance: f64,

    /// Share of cement saved in future cohorts at full material-efficiency scale-up.
    /// default: 0.156
    pub cement_reduction_potential: f64,

    /// Cement share of concrete.
    /// default: 0.13
    pub concrete_cement_share: f64,

    /// Carbon content of dry wood.
    /// default: 0.5
    pub wood_carbon_content: f64,

    pub special_items: SpecialItems,
}

fn default_survival() -> Arc<dyn LifetimeDistribution> {
    Arc::new(NormalLifetime::default())
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            strategies: StrategySwitches::default(),
            include_recycling: true,
            no_efficiency_improvements: false,
            efficiency_freeze_year: 2020,
            scrap_export: false,
            scrap_export_recycling_credit: false,
            gwp_bio: true,
            minimum_demand_scenario: "LED".to_string(),
            sectors: Vec::new(),
            survival: default_survival(),
            mass_balance_tolerance: 1e-3,
            cement_reduction_potential: 0.156,
            concrete_cement_share: 0.13,
            wood_carbon_content: 0.5,
            special_items: SpecialItems::default(),
        }
    }
}

impl ModelConfig {
    pub fn from_toml_str(source: &str) -> RECCResult<Self> {
        Ok(toml::from_str(source)?)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> RECCResult<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    pub fn survival_builder(&self) -> SurvivalFunctionBuilder {
        SurvivalFunctionBuilder::new(self.survival.clone())
    }
}
