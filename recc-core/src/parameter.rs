//! Unit-tagged, classification-bound parameter tables.
//!
//! A [`Parameter`] is an n-dimensional array whose axes are described by an index structure
//! such as `"c,m,g,r"`. Construction checks every axis length against the bound
//! classification, so shape errors surface before a run starts.

use crate::classification::{Aspect, ClassificationSet};
use crate::errors::{RECCError, RECCResult};
use ndarray::{Array, ArrayD, ArrayView, Axis, Dimension, IxDyn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Ordered list of aspects, one per array axis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStructure(pub Vec<Aspect>);

impl IndexStructure {
    /// Parse a comma separated list of index letters, e.g. `"t,r,g"`.
    pub fn parse(structure: &str) -> RECCResult<Self> {
        let aspects = structure
            .split(',')
            .map(|s| s.trim())
            .map(|s| {
                let mut chars = s.chars();
                match (chars.next(), chars.next()) {
                    (Some(letter), None) => Aspect::from_index_letter(letter)
                        .ok_or_else(|| RECCError::InvalidIndexStructure(structure.to_string())),
                    _ => Err(RECCError::InvalidIndexStructure(structure.to_string())),
                }
            })
            .collect::<RECCResult<Vec<_>>>()?;

        let mut seen = aspects.clone();
        seen.sort();
        seen.dedup();
        if seen.len() != aspects.len() {
            return Err(RECCError::InvalidIndexStructure(structure.to_string()));
        }
        Ok(Self(aspects))
    }

    pub fn aspects(&self) -> &[Aspect] {
        &self.0
    }

    pub fn axis_of(&self, aspect: Aspect) -> Option<usize> {
        self.0.iter().position(|a| *a == aspect)
    }

    pub fn shape(&self, classifications: &ClassificationSet) -> RECCResult<Vec<usize>> {
        self.0
            .iter()
            .map(|a| classifications.get(*a).map(|c| c.len()))
            .collect()
    }
}

impl fmt::Display for IndexStructure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letters = self
            .0
            .iter()
            .map(|a| a.index_letter().to_string())
            .collect::<Vec<_>>();
        write!(f, "{}", letters.join(","))
    }
}

/// A named, unit-tagged numeric table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub unit: String,
    pub index_structure: IndexStructure,
    pub values: ArrayD<f64>,
}

impl Parameter {
    pub fn new(
        name: &str,
        unit: &str,
        index_structure: &str,
        values: ArrayD<f64>,
        classifications: &ClassificationSet,
    ) -> RECCResult<Self> {
        let index_structure = IndexStructure::parse(index_structure)?;
        let expected = index_structure.shape(classifications)?;
        if values.shape() != expected.as_slice() {
            return Err(RECCError::ShapeMismatch {
                name: name.to_string(),
                structure: index_structure.to_string(),
                expected,
                found: values.shape().to_vec(),
            });
        }
        Ok(Self {
            name: name.to_string(),
            unit: unit.to_string(),
            index_structure,
            values,
        })
    }

    /// Fixed-dimension view of the values.
    pub fn view<D: Dimension>(&self) -> RECCResult<ArrayView<'_, f64, D>> {
        self.values
            .view()
            .into_dimensionality::<D>()
            .map_err(|_| RECCError::ShapeMismatch {
                name: self.name.clone(),
                structure: self.index_structure.to_string(),
                expected: vec![D::NDIM.unwrap_or(0)],
                found: self.values.shape().to_vec(),
            })
    }

    /// Owned fixed-dimension copy of the values.
    pub fn to_owned_array<D: Dimension>(&self) -> RECCResult<Array<f64, D>> {
        Ok(self.view::<D>()?.to_owned())
    }

    /// Fill `NaN` gaps along the time or cohort axis by linear interpolation.
    ///
    /// Gaps between two defined values are interpolated linearly. Leading and trailing gaps
    /// take the nearest defined value. Series without any defined value are set to zero.
    /// Parameters without a time or cohort axis are left unchanged.
    pub fn interpolate_missing_years(&mut self) {
        let axis = self
            .index_structure
            .axis_of(Aspect::Time)
            .or_else(|| self.index_structure.axis_of(Aspect::Cohort));
        let Some(axis) = axis else {
            return;
        };
        for mut lane in self.values.lanes_mut(Axis(axis)) {
            let defined = lane
                .iter()
                .enumerate()
                .filter(|(_, v)| !v.is_nan())
                .map(|(i, v)| (i, *v))
                .collect::<Vec<_>>();
            if defined.is_empty() {
                lane.fill(0.0);
                continue;
            }
            for i in 0..lane.len() {
                if !lane[i].is_nan() {
                    continue;
                }
                let before = defined.iter().rev().find(|(j, _)| *j < i);
                let after = defined.iter().find(|(j, _)| *j > i);
                lane[i] = match (before, after) {
                    (Some((i0, v0)), Some((i1, v1))) => {
                        v0 + (v1 - v0) * (i - i0) as f64 / (i1 - i0) as f64
                    }
                    (Some((_, v0)), None) => *v0,
                    (None, Some((_, v1))) => *v1,
                    (None, None) => 0.0,
                };
            }
        }
    }
}

/// Named collection of parameters supplied by the caller.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParameterSet {
    parameters: BTreeMap<String, Parameter>,
}

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, parameter: Parameter) {
        self.parameters.insert(parameter.name.clone(), parameter);
    }

    /// Build and insert a parameter in one step.
    pub fn add(
        &mut self,
        name: &str,
        unit: &str,
        index_structure: &str,
        values: ArrayD<f64>,
        classifications: &ClassificationSet,
    ) -> RECCResult<()> {
        self.insert(Parameter::new(
            name,
            unit,
            index_structure,
            values,
            classifications,
        )?);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Parameter> {
        self.parameters.get(name)
    }

    pub fn require(&self, name: &str) -> RECCResult<&Parameter> {
        self.get(name)
            .ok_or_else(|| RECCError::MissingParameter(name.to_string()))
    }

    /// Required parameter, checked against an expected index structure, as an owned array.
    pub fn require_array<D: Dimension>(
        &self,
        name: &str,
        index_structure: &str,
    ) -> RECCResult<Array<f64, D>> {
        let parameter = self.require(name)?;
        let expected = IndexStructure::parse(index_structure)?;
        if parameter.index_structure != expected {
            return Err(RECCError::InvalidIndexStructure(format!(
                "{} is indexed '{}', expected '{}'",
                name, parameter.index_structure, expected
            )));
        }
        parameter.to_owned_array::<D>()
    }

    /// Optional parameter; a zero array of the expected shape when absent.
    pub fn array_or_zeros<D: Dimension>(
        &self,
        name: &str,
        index_structure: &str,
        classifications: &ClassificationSet,
    ) -> RECCResult<Array<f64, D>> {
        self.array_or_fill(name, index_structure, classifications, 0.0)
    }

    /// Optional parameter; an array of the expected shape filled with `value` when absent.
    pub fn array_or_fill<D: Dimension>(
        &self,
        name: &str,
        index_structure: &str,
        classifications: &ClassificationSet,
        value: f64,
    ) -> RECCResult<Array<f64, D>> {
        if self.get(name).is_some() {
            return self.require_array(name, index_structure);
        }
        let shape = IndexStructure::parse(index_structure)?.shape(classifications)?;
        ArrayD::<f64>::from_elem(IxDyn(&shape), value)
            .into_dimensionality::<D>()
            .map_err(|_| RECCError::InvalidIndexStructure(index_structure.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &String> {
        self.parameters.keys()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Parameter> {
        self.parameters.values_mut()
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }
}
