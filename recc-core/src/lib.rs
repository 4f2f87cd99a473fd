//! Core data model of the material flow engine.
//!
//! # Module organisation
//!
//! - [`classification`]: classifications and the aspects they index
//! - [`parameter`]: unit-tagged, classification-bound parameter tables
//! - [`time`]: model years, cohorts and the switch time
//! - [`survival`]: lifetime distributions and survival matrices
//! - [`dsm`]: the cohort-based dynamic stock model
//! - [`system`]: processes, the flow/stock registry and mass balances
//! - [`utils`]: guarded arithmetic

pub mod classification;
pub mod dsm;
pub mod errors;
pub mod parameter;
pub mod survival;
pub mod system;
pub mod time;
pub mod utils;

pub use classification::{Aspect, Classification, ClassificationSet, ALL_ELEMENTS};
pub use dsm::{CohortFlows, CohortStockEngine, StockDrivenInput, TypedCohortFlows};
pub use errors::{RECCError, RECCResult};
pub use parameter::{IndexStructure, Parameter, ParameterSet};
pub use survival::{LifetimeDistribution, SurvivalFunctionBuilder, SurvivalMatrix};
pub use system::{FlowId, FlowRegistry, MassBalance, ProcessId, StockId};
pub use time::TimeAxis;
