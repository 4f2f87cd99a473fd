//! Resource-efficiency scenarios on top of `recc-core`.
//!
//! A run takes a [`recc_core::ParameterSet`], the matching classifications and a
//! [`ModelConfig`], and produces result tables for every (socioeconomic, climate policy)
//! scenario pair:
//!
//! 1. [`sectors`]: the dynamic stock model of every end-use sector
//! 2. [`cycle`]: the year-by-year material cycle with re-use, recovery and the scrap market
//! 3. [`emissions`]: energy demand and greenhouse-gas emissions
//!
//! ```no_run
//! use recc_model::{ModelConfig, ScenarioRunner};
//! # fn run(
//! #     parameters: &recc_core::ParameterSet,
//! #     classifications: &recc_core::ClassificationSet,
//! # ) -> recc_core::RECCResult<()> {
//! let config = ModelConfig::from_file("config.toml")?;
//! let runner = ScenarioRunner::new(parameters, classifications, config)?;
//! let results = runner.run_all()?;
//! let emissions = results.stacked(recc_model::ResultName::EmissionsTotal)?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod cycle;
pub mod emissions;
pub mod materials;
pub mod parameters;
pub mod results;
pub mod runner;
pub mod scrap;
pub mod sectors;

pub use config::{ModelConfig, SectorConfig, SpecialItems, StrategySwitches};
pub use cycle::{CycleOutcome, MaterialCycle};
pub use emissions::{EmissionGroup, EmissionsAccountant, EmissionsResults, EnergyUse};
pub use materials::MaterialCompositionResolver;
pub use parameters::{BaseParameters, PreparedParameters, ScenarioParameters};
pub use results::{Diagnostics, ResultName, ResultsCollection, ScenarioResults};
pub use runner::ScenarioRunner;
pub use scrap::{Allocation, ScrapMarketBalancer, SupplySources};
pub use sectors::{SectorKind, SectorStockOrchestrator, SectorStocks};
