//! Runs the model for scenario pairs.

use crate::config::ModelConfig;
use crate::cycle::MaterialCycle;
use crate::emissions::EmissionsAccountant;
use crate::parameters::{BaseParameters, PreparedParameters, ScenarioParameters};
use crate::results::{ResultShape, ResultsCollection, ScenarioResults};
use crate::sectors::SectorStockOrchestrator;
use log::info;
use ndarray::{Array2, Axis};
use recc_core::classification::{Aspect, ClassificationSet};
use recc_core::errors::RECCResult;
use recc_core::parameter::ParameterSet;

/// Owns the prepared parameters and runs scenario pairs against them.
///
/// All configuration errors surface in [`ScenarioRunner::new`]. Every pair works on its own
/// registry and scrap market, so pairs never share mutable state.
#[derive(Debug, Clone)]
pub struct ScenarioRunner {
    prepared: PreparedParameters,
}

impl ScenarioRunner {
    pub fn new(
        parameters: &ParameterSet,
        classifications: &ClassificationSet,
        config: ModelConfig,
    ) -> RECCResult<Self> {
        let base = BaseParameters::from_parameter_set(parameters, classifications, &config)?;
        Ok(Self {
            prepared: base.preprocess()?,
        })
    }

    pub fn from_prepared(prepared: PreparedParameters) -> Self {
        Self { prepared }
    }

    pub fn prepared(&self) -> &PreparedParameters {
        &self.prepared
    }

    /// Run one (socioeconomic, climate policy) pair.
    pub fn run_pair(
        &self,
        socioeconomic: usize,
        climate_policy: usize,
    ) -> RECCResult<ScenarioResults> {
        let classifications = &self.prepared.classifications;
        let scenario = ScenarioParameters::for_pair(&self.prepared, socioeconomic, climate_policy)?;
        info!(
            "Running scenario pair ({}, {})",
            label(classifications, Aspect::SocioeconomicScenario, socioeconomic),
            label(classifications, Aspect::ClimatePolicyScenario, climate_policy)
        );
        let stocks = SectorStockOrchestrator::run(&scenario)?;

        let mut cycle = MaterialCycle::new(&scenario, &stocks)?;
        cycle.run()?;
        let outcome = cycle.finish();

        let emissions = EmissionsAccountant::account(&scenario, &stocks, &outcome.registry)?;

        let time = scenario.time();
        let shape = ResultShape {
            n_years: time.n_years,
            n_regions: classifications.len(Aspect::Region),
            n_goods: classifications.len(Aspect::Good),
        };
        let population = self
            .prepared
            .population
            .as_ref()
            .map(|p| p.index_axis(Axis(2), socioeconomic).to_owned())
            .unwrap_or_else(|| Array2::zeros((shape.n_years, shape.n_regions)));

        Ok(ScenarioResults::new(
            socioeconomic,
            climate_policy,
            shape,
            &stocks,
            population,
            outcome,
            emissions,
        ))
    }

    /// Run every scenario pair in turn.
    pub fn run_all(&self) -> RECCResult<ResultsCollection> {
        let n_socioeconomic = self.prepared.n_socioeconomic();
        let n_climate_policy = self.prepared.n_climate_policy();
        let mut collection = ResultsCollection::new(n_socioeconomic, n_climate_policy);
        for s in 0..n_socioeconomic {
            for r in 0..n_climate_policy {
                collection.push(self.run_pair(s, r)?);
            }
        }
        info!("Finished {} scenario pair(s)", collection.len());
        Ok(collection)
    }
}

fn label(classifications: &ClassificationSet, aspect: Aspect, index: usize) -> String {
    classifications
        .get(aspect)
        .ok()
        .and_then(|c| c.items.get(index).cloned())
        .unwrap_or_else(|| index.to_string())
}
