//! Classifications: named, ordered item lists that index every tensor axis.
//!
//! Each axis of a parameter or result tensor is bound to one [`Aspect`]. The item list of
//! an aspect is fixed when the run is set up and never changes afterwards.

use crate::errors::{RECCError, RECCResult};
use crate::time::TimeAxis;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Label of the pseudo-element that carries the total mass of a material.
pub const ALL_ELEMENTS: &str = "All";

/// Dimension a tensor axis is indexed by.
///
/// Each aspect has a single-character index letter used in index-structure strings
/// such as `"c,r,g,m"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Aspect {
    Time,
    Cohort,
    Region,
    AggregateRegion,
    Good,
    Material,
    Element,
    WasteCategory,
    EnergyCarrier,
    SocioeconomicScenario,
    ClimatePolicyScenario,
    Age,
}

impl Aspect {
    pub const ALL: [Aspect; 12] = [
        Aspect::Time,
        Aspect::Cohort,
        Aspect::Region,
        Aspect::AggregateRegion,
        Aspect::Good,
        Aspect::Material,
        Aspect::Element,
        Aspect::WasteCategory,
        Aspect::EnergyCarrier,
        Aspect::SocioeconomicScenario,
        Aspect::ClimatePolicyScenario,
        Aspect::Age,
    ];

    pub fn index_letter(&self) -> char {
        match self {
            Aspect::Time => 't',
            Aspect::Cohort => 'c',
            Aspect::Region => 'r',
            Aspect::AggregateRegion => 'o',
            Aspect::Good => 'g',
            Aspect::Material => 'm',
            Aspect::Element => 'e',
            Aspect::WasteCategory => 'w',
            Aspect::EnergyCarrier => 'n',
            Aspect::SocioeconomicScenario => 'S',
            Aspect::ClimatePolicyScenario => 'R',
            Aspect::Age => 'a',
        }
    }

    pub fn from_index_letter(letter: char) -> Option<Aspect> {
        Aspect::ALL
            .iter()
            .copied()
            .find(|a| a.index_letter() == letter)
    }
}

impl fmt::Display for Aspect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// A named ordered list of category labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub name: String,
    pub items: Vec<String>,
}

impl Classification {
    pub fn new<S: Into<String>>(name: S, items: Vec<String>) -> Self {
        Self {
            name: name.into(),
            items,
        }
    }

    pub fn from_labels(name: &str, items: &[&str]) -> Self {
        Self::new(name, items.iter().map(|s| s.to_string()).collect())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn position(&self, item: &str) -> Option<usize> {
        self.items.iter().position(|x| x == item)
    }

    /// Position of `item`, a configuration error if absent.
    pub fn index_of(&self, item: &str) -> RECCResult<usize> {
        self.position(item)
            .ok_or_else(|| RECCError::MissingClassificationItem {
                classification: self.name.clone(),
                item: item.to_string(),
            })
    }
}

/// All classifications of a run, keyed by aspect.
///
/// Time and cohort classifications are derived from the [`TimeAxis`] and always present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationSet {
    time: TimeAxis,
    classifications: BTreeMap<Aspect, Classification>,
}

impl ClassificationSet {
    pub fn new(time: TimeAxis) -> Self {
        let mut classifications = BTreeMap::new();
        let cohorts = (0..time.n_cohorts)
            .map(|c| (time.first_cohort_year + c as i32).to_string())
            .collect::<Vec<_>>();
        let years = cohorts[time.cohort_index_for_year(0)..].to_vec();
        classifications.insert(Aspect::Cohort, Classification::new("Cohort", cohorts));
        classifications.insert(Aspect::Time, Classification::new("Time", years));
        Self {
            time,
            classifications,
        }
    }

    pub fn with(mut self, aspect: Aspect, classification: Classification) -> Self {
        self.insert(aspect, classification);
        self
    }

    pub fn insert(&mut self, aspect: Aspect, classification: Classification) {
        self.classifications.insert(aspect, classification);
    }

    pub fn time(&self) -> &TimeAxis {
        &self.time
    }

    pub fn get(&self, aspect: Aspect) -> RECCResult<&Classification> {
        self.classifications
            .get(&aspect)
            .ok_or_else(|| RECCError::MissingClassification(aspect.to_string()))
    }

    /// Number of items of `aspect`, zero for unregistered aspects.
    pub fn len(&self, aspect: Aspect) -> usize {
        self.classifications
            .get(&aspect)
            .map(|c| c.len())
            .unwrap_or(0)
    }

    pub fn index_of(&self, aspect: Aspect, item: &str) -> RECCResult<usize> {
        self.get(aspect)?.index_of(item)
    }

    /// Index of the remainder element, which closes element mass balances.
    ///
    /// The element classification lists the `All` pseudo-element first and the remainder
    /// element last.
    pub fn remainder_element(&self) -> RECCResult<usize> {
        let elements = self.get(Aspect::Element)?;
        Ok(elements.len() - 1)
    }

    /// Check the classifications required by every run.
    pub fn validate(&self) -> RECCResult<()> {
        for aspect in [
            Aspect::Region,
            Aspect::Good,
            Aspect::Material,
            Aspect::Element,
            Aspect::WasteCategory,
            Aspect::EnergyCarrier,
            Aspect::SocioeconomicScenario,
            Aspect::ClimatePolicyScenario,
        ] {
            let classification = self.get(aspect)?;
            if classification.is_empty() {
                return Err(RECCError::InconsistentSelection(format!(
                    "classification '{}' has no items",
                    classification.name
                )));
            }
        }

        let elements = self.get(Aspect::Element)?;
        if elements.items[0] != ALL_ELEMENTS {
            return Err(RECCError::MissingClassificationItem {
                classification: elements.name.clone(),
                item: ALL_ELEMENTS.to_string(),
            });
        }
        if elements.len() < 2 {
            return Err(RECCError::InconsistentSelection(format!(
                "classification '{}' needs a remainder element after '{}'",
                elements.name, ALL_ELEMENTS
            )));
        }
        Ok(())
    }
}
