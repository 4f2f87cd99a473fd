//! Dynamic material flow analysis of resource-efficiency scenarios.
//!
//! This crate bundles [`recc_core`] and [`recc_model`] and, with the `python` feature,
//! builds the `recc._lib` extension module.

pub use recc_core;
pub use recc_model;

#[cfg(feature = "python")]
mod python;
