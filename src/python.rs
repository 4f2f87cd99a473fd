use ndarray::ArrayD;
use numpy::{IntoPyArray, PyArray2, PyArrayDyn, PyReadonlyArray1, PyReadonlyArrayDyn};
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use pyo3::types::PyDict;
use recc_core::classification::{Aspect, Classification, ClassificationSet};
use recc_core::errors::RECCError;
use recc_core::parameter::ParameterSet;
use recc_core::survival::SurvivalFunctionBuilder;
use recc_core::time::TimeAxis;
use recc_model::{ModelConfig, ResultName, ScenarioRunner};
use std::collections::HashMap;

fn to_py_err(error: RECCError) -> PyErr {
    PyValueError::new_err(error.to_string())
}

fn required_item<'py>(entry: &Bound<'py, PyDict>, key: &str) -> PyResult<Bound<'py, PyAny>> {
    entry
        .get_item(key)?
        .ok_or_else(|| PyValueError::new_err(format!("parameter entry is missing '{}'", key)))
}

/// Classifications keyed by index letter, e.g. `{"r": ["R1", "R2"], "g": ["SFH"]}`.
fn build_classifications(
    time: (i32, usize, usize),
    classifications: HashMap<String, Vec<String>>,
) -> PyResult<ClassificationSet> {
    let (first_cohort_year, n_cohorts, n_years) = time;
    let time = TimeAxis::new(first_cohort_year, n_cohorts, n_years).map_err(to_py_err)?;
    let mut set = ClassificationSet::new(time);
    for (letter, items) in classifications {
        let aspect = letter
            .chars()
            .next()
            .filter(|_| letter.chars().count() == 1)
            .and_then(Aspect::from_index_letter)
            .ok_or_else(|| PyValueError::new_err(format!("unknown index letter '{}'", letter)))?;
        set.insert(aspect, Classification::new(aspect.to_string(), items));
    }
    Ok(set)
}

/// Parameters as a list of `{"name", "unit", "index_structure", "values"}` dicts.
fn build_parameters(
    entries: Vec<Bound<'_, PyDict>>,
    classifications: &ClassificationSet,
) -> PyResult<ParameterSet> {
    let mut parameters = ParameterSet::new();
    for entry in entries {
        let name: String = required_item(&entry, "name")?.extract()?;
        let unit: String = match entry.get_item("unit")? {
            Some(unit) => unit.extract()?,
            None => String::new(),
        };
        let structure: String = required_item(&entry, "index_structure")?.extract()?;
        let values: PyReadonlyArrayDyn<f64> = required_item(&entry, "values")?.extract()?;
        let values: ArrayD<f64> = values.as_array().to_owned();
        parameters
            .add(&name, &unit, &structure, values, classifications)
            .map_err(to_py_err)?;
    }
    Ok(parameters)
}

/// Run every scenario pair and return the stacked result tables keyed by name.
#[pyfunction]
#[pyo3(signature = (config, time, classifications, parameters))]
fn run_scenarios<'py>(
    py: Python<'py>,
    config: &str,
    time: (i32, usize, usize),
    classifications: HashMap<String, Vec<String>>,
    parameters: Vec<Bound<'py, PyDict>>,
) -> PyResult<Bound<'py, PyDict>> {
    let config = ModelConfig::from_toml_str(config).map_err(to_py_err)?;
    let classifications = build_classifications(time, classifications)?;
    let parameters = build_parameters(parameters, &classifications)?;

    let results = py
        .allow_threads(|| {
            ScenarioRunner::new(&parameters, &classifications, config)?.run_all()
        })
        .map_err(to_py_err)?;

    let tables = PyDict::new_bound(py);
    for name in ResultName::all() {
        let stacked = results.stacked(name).map_err(to_py_err)?;
        let array: Bound<'py, PyArrayDyn<f64>> = stacked.into_pyarray_bound(py);
        tables.set_item(name.to_string(), array)?;
    }
    Ok(tables)
}

/// The default configuration as a dict.
#[pyfunction]
fn default_config(py: Python<'_>) -> PyResult<PyObject> {
    Ok(pythonize::pythonize(py, &ModelConfig::default())?)
}

/// Survival matrix of a normal lifetime distribution, `[year, cohort]`.
#[pyfunction]
#[pyo3(signature = (lifetimes, relative_std=0.3))]
fn survival_matrix<'py>(
    py: Python<'py>,
    lifetimes: PyReadonlyArray1<'py, f64>,
    relative_std: f64,
) -> Bound<'py, PyArray2<f64>> {
    SurvivalFunctionBuilder::normal(relative_std)
        .build(lifetimes.as_array())
        .into_array()
        .into_pyarray_bound(py)
}

#[pymodule]
#[pyo3(name = "_lib")]
fn recc(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add("__version__", env!("CARGO_PKG_VERSION"))?;
    m.add_function(wrap_pyfunction!(run_scenarios, m)?)?;
    m.add_function(wrap_pyfunction!(default_config, m)?)?;
    m.add_function(wrap_pyfunction!(survival_matrix, m)?)?;

    Ok(())
}

