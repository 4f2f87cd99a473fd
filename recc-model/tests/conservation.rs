//! Every process of the material cycle stays balanced with all loops active.
//!
//! Buildings are discarded after exactly two years, so every model year has end-of-life flows
//! that are partly re-used, partly recovered and remelted, while manufacturing produces
//! fabrication scrap that is diverted back in the following year.

mod common;

use common::Fixture;
use recc_core::survival::FixedLifetime;
use recc_core::system::{FlowId, ProcessId, StockId};
use recc_core::time::TimeAxis;
use recc_model::config::{ModelConfig, SectorConfig};
use recc_model::parameters::*;
use recc_model::sectors::SectorKind;
use recc_model::{ScenarioResults, ScenarioRunner};
use std::sync::Arc;

const KIND: SectorKind = SectorKind::ResidentialBuildings;
const TOLERANCE: f64 = 1e-9;

fn fixture() -> Fixture {
    // cohorts 2013..=2016, model years 2014..=2016
    let mut fixture = Fixture::new(
        TimeAxis::new(2013, 4, 3).unwrap(),
        &["steel", "wood"],
        &["All", "Fe", "Other"],
        &["steel scrap", "wood waste"],
        &["LED"],
    );
    fixture.with_fn(COMPOSITION_EXISTING_STOCK, "m,e", |ix| match ix[0] {
        0 => [1.0, 0.95, 0.05][ix[1]],
        _ => [1.0, 0.0, 1.0][ix[1]],
    });
    fixture.with_fn(COMPOSITION_PRIMARY, "m,e", |ix| match ix[0] {
        0 => [1.0, 0.99, 0.01][ix[1]],
        _ => [1.0, 0.0, 1.0][ix[1]],
    });
    fixture.with_fn(MANUFACTURING_YIELD_LOSS, "m,w,g", |ix| match (ix[0], ix[1]) {
        (0, 0) => 0.1,
        (1, 1) => 0.05,
        _ => 0.0,
    });
    fixture.with_fn(REMELTING_YIELD, "w,m,e", |ix| match (ix[0], ix[1], ix[2]) {
        (0, 0, 1) => 0.9,
        (0, 0, 2) => 0.5,
        _ => 0.0,
    });
    fixture.with_fn(EOL_RECOVERY_RATE, "r,g,m,w", |ix| match (ix[2], ix[3]) {
        (0, 0) => 80.0,
        (1, 1) => 50.0,
        _ => 0.0,
    });
    fixture.with_fn(FABRICATION_SCRAP_DIVERSION, "m,w,S", |ix| {
        if ix[0] == 0 && ix[1] == 0 {
            0.5
        } else {
            0.0
        }
    });
    fixture.fill(SCALE_UP, "t,S,R", 1.0);
    fixture.fill(SCALE_UP_REGIONAL, "t,r,S,R", 1.0);
    fixture.fill(POPULATION, "t,r,S", 1.0);

    fixture.fill(&lifetime(KIND), "g,r,c", 2.0);
    fixture.with_fn(&material_content(KIND), "c,r,g,m", |ix| {
        [200.0, 100.0][ix[3]]
    });
    fixture.with_fn(&reuse(KIND), "m,g,r", |ix| [0.2, 0.0][ix[0]]);
    fixture.with_fn(&initial_stock(KIND), "c,g,r", |ix| [40.0, 60.0, 0.0, 0.0][ix[0]]);
    fixture.fill(&type_split(KIND), "g,r,t,S", 1.0);
    fixture.with_fn(&future_stock_per_capita(KIND), "S,t,r", |ix| {
        [100.0, 130.0, 160.0][ix[1]]
    });
    fixture
}

fn config() -> ModelConfig {
    let mut config = ModelConfig {
        sectors: vec![SectorConfig {
            kind: KIND,
            goods: vec!["SFH".to_string()],
        }],
        survival: Arc::new(FixedLifetime),
        ..ModelConfig::default()
    };
    config.strategies.reuse = true;
    config.strategies.fabrication_scrap_diversion = true;
    config
}

fn run(config: ModelConfig) -> ScenarioResults {
    let fixture = fixture();
    ScenarioRunner::new(&fixture.parameters, &fixture.classifications, config)
        .unwrap()
        .run_pair(0, 0)
        .unwrap()
}

fn assert_balanced(results: &ScenarioResults) {
    let balance = &results.diagnostics.mass_balance;
    for process in ProcessId::ALL {
        let residuals = balance.process(process);
        for value in residuals.iter() {
            assert!(
                value.abs() < TOLERANCE,
                "process {} is off by {}",
                process,
                value
            );
        }
    }
    assert!(balance.violations(TOLERANCE).is_empty());
}

#[test]
fn processes_balance_with_reuse_diversion_and_stockpiling() {
    let results = run(config());
    assert_balanced(&results);

    let registry = &results.registry;
    for t in 1..3 {
        assert!(registry.flow_year(FlowId::F_7_8, t)[[0, 0]] > 0.0);
        assert!(registry.flow_year(FlowId::F_8_17, t)[[0, 0]] > 0.0);
        assert!(registry.flow_year(FlowId::F_9_12, t)[[0, 0]] > 0.0);
        assert!(registry.flow_year(FlowId::F_4_5, t)[[0, 0]] > 0.0);
        assert!(registry.stock_year(StockId::S_10, t)[[0, 0]] > 0.0);
    }
    // last year's fabrication scrap is diverted straight back into manufacturing
    assert!(registry.flow_year(FlowId::F_10_12, 2)[[0, 0]] > 0.0);
    // wood is never remelted
    assert_eq!(registry.flow_year(FlowId::F_9_12, 1)[[1, 0]], 0.0);
}

#[test]
fn element_totals_stay_consistent() {
    let results = run(config());
    let registry = &results.registry;
    for id in [FlowId::F_4_5, FlowId::F_5_6, FlowId::F_6_7, FlowId::F_9_12] {
        for t in 1..3 {
            let flow = registry.flow_year(id, t);
            for m in 0..2 {
                let elements = flow[[m, 1]] + flow[[m, 2]];
                assert!(
                    (flow[[m, 0]] - elements).abs() < TOLERANCE,
                    "{} in year {} material {}: total {} but elements sum to {}",
                    id,
                    t,
                    m,
                    flow[[m, 0]],
                    elements
                );
            }
        }
    }
}

#[test]
fn no_recycling_counterfactual_still_balances() {
    let mut config = config();
    config.include_recycling = false;
    let results = run(config);
    assert_balanced(&results);

    let registry = &results.registry;
    for t in 1..3 {
        assert_eq!(registry.flow_year(FlowId::F_9_12, t).sum(), 0.0);
        assert_eq!(registry.flow_year(FlowId::F_9_10, t).sum(), 0.0);
    }
}

#[test]
fn exporting_surplus_keeps_the_stockpile_empty() {
    let mut config = config();
    config.scrap_export = true;
    let results = run(config);
    assert_balanced(&results);

    let registry = &results.registry;
    for t in 0..3 {
        assert_eq!(registry.stock_year(StockId::S_12, t).sum(), 0.0);
    }
}
