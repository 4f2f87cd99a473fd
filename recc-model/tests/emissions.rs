//! Emissions of a small system with buildings and industry, checked by hand.
//!
//! One region holds 100 buildings that grow to 150 in the second year. Each building carries
//! 200 kg of steel and 50 kg of wood. Industry adds 10 machines of 50 kg wood in the second
//! year. Energy comes as electricity and gas.

mod common;

use approx::assert_relative_eq;
use common::Fixture;
use recc_core::classification::Aspect;
use recc_core::survival::FixedLifetime;
use recc_core::system::FlowId;
use recc_core::time::TimeAxis;
use recc_model::config::{ModelConfig, SectorConfig};
use recc_model::emissions::{EmissionGroup, EnergyUse};
use recc_model::parameters::*;
use recc_model::sectors::SectorKind;
use recc_model::{ScenarioResults, ScenarioRunner};
use std::sync::Arc;

const BUILDINGS: SectorKind = SectorKind::ResidentialBuildings;
const INDUSTRY: SectorKind = SectorKind::Industry;

fn fixture(building_lifetime: f64, per_capita: [f64; 2]) -> Fixture {
    let mut fixture = Fixture::new(
        TimeAxis::new(2015, 2, 2).unwrap(),
        &["steel", "wood"],
        &["All", "Fe", "Other"],
        &["steel scrap", "wood waste"],
        &["LED"],
    );
    fixture.with_classification(Aspect::Good, "Good", &["SFH", "machine"]);
    fixture.with_classification(Aspect::AggregateRegion, "World", &["World"]);
    fixture.with_classification(Aspect::EnergyCarrier, "Carrier", &["electricity", "gas"]);
    fixture.with_classification(Aspect::Age, "Age", &["0", "100"]);

    let composition = |ix: &[usize]| match ix[0] {
        0 => [1.0, 0.98, 0.02][ix[1]],
        _ => [1.0, 0.0, 1.0][ix[1]],
    };
    fixture.with_fn(COMPOSITION_EXISTING_STOCK, "m,e", composition);
    fixture.with_fn(COMPOSITION_PRIMARY, "m,e", composition);
    fixture.fill(MANUFACTURING_YIELD_LOSS, "m,w,g", 0.0);
    fixture.with_fn(REMELTING_YIELD, "w,m,e", |ix| match (ix[0], ix[1], ix[2]) {
        (0, 0, 1) => 0.9,
        (0, 0, 2) => 0.5,
        _ => 0.0,
    });
    fixture.fill(POPULATION, "t,r,S", 1.0);
    fixture.with_fn(EOL_RECOVERY_RATE, "r,g,m,w", |ix| {
        if ix[2] == 0 && ix[3] == 0 {
            100.0
        } else {
            0.0
        }
    });
    fixture.fill(EOL_RECOVERY_RATE_AGGREGATE, "o,g,m,w", 0.0);

    // electricity first, then gas
    fixture.with_fn(DIRECT_EMISSIONS, "n", |ix| [0.0, 50.0][ix[0]]);
    fixture.with_fn(SUPPLY_INTENSITY, "n,r,t,S,R", |ix| [100.0, 20.0][ix[0]]);
    fixture.with_fn(SUPPLY_INTENSITY_WORLD, "n,t,S,R", |ix| [100.0, 20.0][ix[0]]);
    fixture.with_fn(PROCESS_ENERGY, "m,n", |ix| match ix[0] {
        0 => [0.002, 0.003][ix[1]],
        _ => 0.0,
    });
    fixture.with_fn(PROCESS_EMISSIONS, "m,t,R", |ix| [2.0, 0.0][ix[0]]);
    fixture.with_fn(GWP_BIO, "a", |ix| [0.0, -0.5][ix[0]]);

    fixture.fill(&lifetime(BUILDINGS), "g,r,c", building_lifetime);
    fixture.with_fn(&material_content(BUILDINGS), "c,r,g,m", |ix| {
        [200.0, 50.0][ix[3]]
    });
    fixture.with_fn(&initial_stock(BUILDINGS), "c,g,r", |ix| {
        if ix[0] == 0 {
            100.0
        } else {
            0.0
        }
    });
    fixture.fill(&type_split(BUILDINGS), "g,r,t,S", 1.0);
    fixture.with_fn(&future_stock_per_capita(BUILDINGS), "S,t,r", move |ix| {
        per_capita[ix[1]]
    });
    fixture.fill(&energy_intensity(BUILDINGS), "c,r,g", 2.0);
    fixture.with_fn(&energy_carrier_split(BUILDINGS), "t,r,g,n", |ix| {
        [0.25, 0.75][ix[3]]
    });

    fixture.fill(&lifetime(INDUSTRY), "g,o,c", 50.0);
    fixture.with_fn(&material_content(INDUSTRY), "c,o,g,m", |ix| [0.0, 50.0][ix[3]]);
    fixture.with_fn(&final_products_inflow(INDUSTRY), "c,o,g,S", |ix| {
        if ix[0] == 1 {
            10.0
        } else {
            0.0
        }
    });
    fixture
}

fn config() -> ModelConfig {
    ModelConfig {
        sectors: vec![
            SectorConfig {
                kind: BUILDINGS,
                goods: vec!["SFH".to_string()],
            },
            SectorConfig {
                kind: INDUSTRY,
                goods: vec!["machine".to_string()],
            },
        ],
        survival: Arc::new(FixedLifetime),
        ..ModelConfig::default()
    }
}

fn run(fixture: Fixture, config: ModelConfig) -> ScenarioResults {
    ScenarioRunner::new(&fixture.parameters, &fixture.classifications, config)
        .unwrap()
        .run_pair(0, 0)
        .unwrap()
}

fn growing_stock() -> ScenarioResults {
    run(fixture(60.0, [100.0, 150.0]), config())
}

// ===== Use Phase =====

#[test]
fn use_phase_splits_direct_and_electricity_emissions() {
    let results = growing_stock();
    let emissions = &results.emissions;

    // 150 buildings * 2 TJ, a quarter electricity
    let use_phase = emissions.energy_use(EnergyUse::UsePhase);
    assert_relative_eq!(use_phase[[1, 0]], 75.0, epsilon = 1e-9);
    assert_relative_eq!(use_phase[[1, 1]], 225.0, epsilon = 1e-9);
    assert_relative_eq!(emissions.use_phase_energy_by_region[[0, 0, 1]], 150.0, epsilon = 1e-9);

    // only gas burns on site
    let direct = emissions.group(EmissionGroup::UsePhaseDirect);
    assert_relative_eq!(direct[0], 7.5, epsilon = 1e-9);
    assert_relative_eq!(direct[1], 11.25, epsilon = 1e-9);
    let electricity = emissions.group(EmissionGroup::UsePhaseElectricity);
    assert_relative_eq!(electricity[0], 5.0, epsilon = 1e-9);
    assert_relative_eq!(electricity[1], 7.5, epsilon = 1e-9);
    let other = emissions.group(EmissionGroup::UsePhaseOther);
    assert_relative_eq!(other[1], 4.5, epsilon = 1e-9);
}

// ===== Primary Production =====

#[test]
fn primary_production_energy_and_process_emissions() {
    let results = growing_stock();
    let emissions = &results.emissions;

    // 50 new buildings need 10 Mt of primary steel
    assert_relative_eq!(
        results.registry.flow_year(FlowId::F_3_4, 1)[[0, 0]],
        10.0,
        epsilon = 1e-9
    );
    let energy = emissions.energy_use(EnergyUse::PrimaryProduction);
    assert_relative_eq!(energy[[1, 0]], 20.0, epsilon = 1e-9);
    assert_relative_eq!(energy[[1, 1]], 30.0, epsilon = 1e-9);

    // 0.001 * (100 * 20 + 70 * 30) from energy plus 2 * 10 of process emissions
    assert_relative_eq!(
        emissions.group(EmissionGroup::PrimaryProduction)[1],
        24.1,
        epsilon = 1e-9
    );
    assert_relative_eq!(emissions.group(EmissionGroup::PrimaryProduction)[0], 0.0);
}

// ===== Recycling Credit =====

/// Every building leaves the stock in the second year and nothing replaces it.
fn exporting(credit: bool) -> ScenarioResults {
    let mut config = config();
    config.scrap_export = true;
    config.scrap_export_recycling_credit = credit;
    run(fixture(1.0, [100.0, 0.0]), config)
}

#[test]
fn recycling_credit_is_off_by_default() {
    let results = exporting(false);
    assert!(results.registry.flow_year(FlowId::F_12_0, 1)[[0, 0]] > 0.0);
    assert!(results
        .emissions
        .group(EmissionGroup::RecyclingCredit)
        .iter()
        .all(|v| *v == 0.0));
}

#[test]
fn recycling_credit_counts_avoided_primary_production() {
    let results = exporting(true);
    let exported = results.registry.flow_year(FlowId::F_12_0, 1);
    assert!(exported[[0, 0]] > 0.0);
    assert_eq!(exported[[1, 0]], 0.0);

    // process emissions plus the supply emissions of 1000 * intensity per Mt
    let avoided_per_mt = 2.0 + 0.001 * (100.0 * 2.0 + 70.0 * 3.0);
    assert_relative_eq!(
        results.emissions.group(EmissionGroup::RecyclingCredit)[1],
        -avoided_per_mt * exported[[0, 0]],
        epsilon = 1e-9
    );
}

// ===== Biogenic Carbon =====

#[test]
fn biogenic_carbon_counts_building_wood_only() {
    let results = growing_stock();

    // buildings and machines both bring in wood
    assert_relative_eq!(
        results.registry.flow_year(FlowId::F_6_7, 1)[[1, 0]],
        3.0,
        epsilon = 1e-9
    );
    // 2.5 Mt of wood in new buildings, stored for 60 years
    let biogenic = results.emissions.group(EmissionGroup::Biogenic);
    assert_relative_eq!(biogenic[0], 0.0);
    assert_relative_eq!(biogenic[1], 3.666 * 0.5 * 2.5 * -0.3, epsilon = 1e-9);
}

#[test]
fn biogenic_factor_is_minus_one_beyond_a_century() {
    let results = run(fixture(120.0, [100.0, 150.0]), config());
    let biogenic = results.emissions.group(EmissionGroup::Biogenic);
    assert_relative_eq!(biogenic[1], -3.666 * 0.5 * 2.5, epsilon = 1e-9);
}

#[test]
fn biogenic_carbon_can_be_switched_off() {
    let mut config = config();
    config.gwp_bio = false;
    let results = run(fixture(60.0, [100.0, 150.0]), config);
    assert_eq!(results.emissions.group(EmissionGroup::Biogenic).sum(), 0.0);
}
