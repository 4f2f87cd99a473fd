//! Small parameter sets for running the whole model.

use ndarray::{ArrayD, Dimension, IxDyn};
use recc_core::classification::{Aspect, Classification, ClassificationSet};
use recc_core::parameter::{IndexStructure, ParameterSet};
use recc_core::time::TimeAxis;

pub struct Fixture {
    pub classifications: ClassificationSet,
    pub parameters: ParameterSet,
}

impl Fixture {
    /// One region, one residential good and a single climate policy scenario.
    pub fn new(
        time: TimeAxis,
        materials: &[&str],
        elements: &[&str],
        waste: &[&str],
        socioeconomic: &[&str],
    ) -> Self {
        let classifications = ClassificationSet::new(time)
            .with(Aspect::Region, Classification::from_labels("Region", &["R1"]))
            .with(Aspect::Good, Classification::from_labels("Good", &["SFH"]))
            .with(
                Aspect::Material,
                Classification::from_labels("Material", materials),
            )
            .with(
                Aspect::Element,
                Classification::from_labels("Element", elements),
            )
            .with(
                Aspect::WasteCategory,
                Classification::from_labels("Waste", waste),
            )
            .with(
                Aspect::EnergyCarrier,
                Classification::from_labels("Carrier", &["electricity"]),
            )
            .with(
                Aspect::SocioeconomicScenario,
                Classification::from_labels("SSP", socioeconomic),
            )
            .with(
                Aspect::ClimatePolicyScenario,
                Classification::from_labels("RCP", &["Base"]),
            );
        Self {
            classifications,
            parameters: ParameterSet::new(),
        }
    }

    /// Replace or add a classification. Call before adding parameters that use it.
    #[allow(dead_code)]
    pub fn with_classification(&mut self, aspect: Aspect, name: &str, labels: &[&str]) {
        self.classifications
            .insert(aspect, Classification::from_labels(name, labels));
    }

    pub fn fill(&mut self, name: &str, structure: &str, value: f64) {
        self.with_fn(name, structure, |_| value);
    }

    /// Add a parameter whose value is a function of its index.
    pub fn with_fn<F>(&mut self, name: &str, structure: &str, f: F)
    where
        F: Fn(&[usize]) -> f64,
    {
        let shape = IndexStructure::parse(structure)
            .unwrap()
            .shape(&self.classifications)
            .unwrap();
        let values = ArrayD::from_shape_fn(IxDyn(&shape), |ix| f(ix.slice()));
        self.parameters
            .add(name, "", structure, values, &self.classifications)
            .unwrap();
    }
}
