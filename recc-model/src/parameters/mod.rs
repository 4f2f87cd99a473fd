//! Model parameters.
//!
//! Parameters move through three stages, each an explicit value:
//!
//! 1. [`BaseParameters`]: the caller's [`recc_core::ParameterSet`] checked against the
//!    classifications and the configuration, plus the resolved sectors.
//! 2. [`PreparedParameters`]: produced once by [`BaseParameters::preprocess`]. Gaps are
//!    interpolated, archetypes mixed, concrete split, electricity supply floored at the
//!    backstop and the GWP-bio table expanded. Immutable afterwards.
//! 3. [`ScenarioParameters`]: derived for one (socioeconomic, climate policy) pair by pure
//!    functions of the prepared tables.
//!
//! # Parameter tables
//!
//! Index letters: `t` model year, `c` cohort, `r` region, `o` aggregate region, `g` good,
//! `m` material, `e` element, `w` waste category, `n` energy carrier, `S` socioeconomic
//! scenario, `R` climate policy scenario, `a` age. Per-sector tables use `q` for the
//! sector's region axis, `r` for regional sectors and `o` for aggregate ones; `{key}` is
//! the sector key (e.g. `passvehicles`).
//!
//! | Name | Index | Required |
//! |---|---|---|
//! | `2_P_RECC_Population_SSP_32R` | `t,r,S` | regional sectors |
//! | `3_SHA_RECC_REStrategyScaleUp_r` | `t,r,S,R` | no |
//! | `3_SHA_RECC_REStrategyScaleUp` | `t,S,R` | no |
//! | `3_MC_Elements_Materials_ExistingStock` | `m,e` | yes |
//! | `3_MC_Elements_Materials_Primary` | `m,e` | yes |
//! | `4_PY_Manufacturing` | `m,w,g` | yes |
//! | `6_PR_FabricationYieldImprovement` | `m,g,S` | no |
//! | `6_PR_FabricationScrapDiversion` | `m,w,S` | no |
//! | `4_PY_EoL_RecoveryRate` (percent) | `r,g,m,w` | regional sectors |
//! | `4_PY_EoL_RecoveryRate_o` (percent) | `o,g,m,w` | aggregate sectors |
//! | `6_PR_EoL_RR_Improvement` (percent) | `r,g,m,w` | no |
//! | `4_PY_MaterialProductionRemelting` | `w,m,e` | yes |
//! | `4_EI_ManufacturingEnergyIntensity` | `g,n` | no |
//! | `4_EI_ProcessEnergyIntensity` | `m,n` | no |
//! | `4_EI_WasteMgtEnergyIntensity` | `w,n` | no |
//! | `4_EI_RemeltingEnergyIntensity` | `m,n` | no |
//! | `6_PR_DirectEmissions` | `n` | no |
//! | `4_PE_ProcessExtensions` | `m,t,R` | no |
//! | `4_PE_GHGIntensityEnergySupply` | `n,r,t,S,R` | no |
//! | `4_PE_GHGIntensityEnergySupply_World` | `n,t,S,R` | no |
//! | `4_PE_GHGIntensityElectricitySupply_Backstop` | `t` | no |
//! | `6_MIP_GWP_Bio` | `a` | no |
//! | `3_PR_RECC_CO2Price_SSP_32R` | `t,S,R` | no |
//! | `3_LT_RECC_ProductLifetime_{key}` | `g,q,c` | yes |
//! | `6_PR_LifeTimeExtension_{key}` | `g,q,S` | no |
//! | `3_MC_RECC_{key}` | `c,q,g,m` | yes |
//! | `3_MC_RECC_{key}_LightWeighting`, `_DownSizing`, `_LightWeightingDownSizing` | `q,g,m` | no |
//! | `3_SHA_LightWeighting_{key}`, `3_SHA_DownSizing_{key}` | `g,q,t,S` | no |
//! | `6_PR_ReUse_passvehicles` (percent) | `m,g,r,t,S` | no |
//! | `6_PR_ReUse_{key}` | `m,g,q` | no |
//! | `2_S_RECC_FinalProducts_2015_{key}` | `c,g,r` | stock-driven sectors |
//! | `2_S_RECC_FinalProducts_Future_{key}` (per capita) | `S,t,r` | buildings |
//! | `2_S_RECC_FinalProducts_Future_{key}_MIUPotential` (percent) | `S` | no |
//! | `3_SHA_TypeSplit_{key}` | `g,r,t,S` | stock-driven sectors |
//! | `1_F_ServiceFlows_Future_passvehicles` | `t,r,S` | vehicles |
//! | `6_MIP_VehicleOccupancyRate` | `r,S` | vehicles |
//! | `6_MIP_RideSharing_Occupancy` | `r,S` | no |
//! | `6_PR_CarSharingShare`, `6_PR_RideSharingShare` (percent) | `t,S` | no |
//! | `6_MIP_CarSharing_Stock` | `r,S` | no |
//! | `3_IO_Vehicles_UsePhase` (km per vehicle and year) | `t,r,S` | vehicles |
//! | `3_IO_{key}` | `t,r,S` | no, default one |
//! | `3_EI_Products_UsePhase_{key}` | `c,r,g` | no |
//! | `3_EI_Products_UsePhase_{key}_LightWeighting`, ... | `r,g` | no |
//! | `3_SHA_EnergyCarrierSplit_{key}` | `t,r,g,n` | no |
//! | `3_SHA_MaxRenovationPotential_{key}` | `r,c,g` | no |
//! | `3_SHA_EnergySavingsPot_Renovation_{key}` | `r,g` | no |
//! | `2_S_RECC_FinalProducts_{key}` (total stock per cohort year) | `g,c` | global non-residential buildings |
//! | `1_F_RECC_FinalProducts_{key}` | `c,o,g,S` | industry, appliances |

mod base;
mod prepared;
mod scenario;

pub use base::BaseParameters;
pub use prepared::{
    Archetypes, PreparedDemand, PreparedDriver, PreparedParameters, PreparedSector,
    PreparedUsePhase, ReuseRates,
};
pub use scenario::{
    RecoveryRates, Renovation, ScenarioDriver, ScenarioParameters, ScenarioSector, UsePhaseEnergy,
};

use crate::sectors::SectorKind;

pub const POPULATION: &str = "2_P_RECC_Population_SSP_32R";
pub const SCALE_UP_REGIONAL: &str = "3_SHA_RECC_REStrategyScaleUp_r";
pub const SCALE_UP: &str = "3_SHA_RECC_REStrategyScaleUp";
pub const COMPOSITION_EXISTING_STOCK: &str = "3_MC_Elements_Materials_ExistingStock";
pub const COMPOSITION_PRIMARY: &str = "3_MC_Elements_Materials_Primary";
pub const MANUFACTURING_YIELD_LOSS: &str = "4_PY_Manufacturing";
pub const FABRICATION_YIELD_IMPROVEMENT: &str = "6_PR_FabricationYieldImprovement";
pub const FABRICATION_SCRAP_DIVERSION: &str = "6_PR_FabricationScrapDiversion";
pub const EOL_RECOVERY_RATE: &str = "4_PY_EoL_RecoveryRate";
pub const EOL_RECOVERY_RATE_AGGREGATE: &str = "4_PY_EoL_RecoveryRate_o";
pub const EOL_RECOVERY_IMPROVEMENT: &str = "6_PR_EoL_RR_Improvement";
pub const REMELTING_YIELD: &str = "4_PY_MaterialProductionRemelting";
pub const MANUFACTURING_ENERGY: &str = "4_EI_ManufacturingEnergyIntensity";
pub const PROCESS_ENERGY: &str = "4_EI_ProcessEnergyIntensity";
pub const WASTE_MANAGEMENT_ENERGY: &str = "4_EI_WasteMgtEnergyIntensity";
pub const REMELTING_ENERGY: &str = "4_EI_RemeltingEnergyIntensity";
pub const DIRECT_EMISSIONS: &str = "6_PR_DirectEmissions";
pub const PROCESS_EMISSIONS: &str = "4_PE_ProcessExtensions";
pub const SUPPLY_INTENSITY: &str = "4_PE_GHGIntensityEnergySupply";
pub const SUPPLY_INTENSITY_WORLD: &str = "4_PE_GHGIntensityEnergySupply_World";
pub const ELECTRICITY_BACKSTOP: &str = "4_PE_GHGIntensityElectricitySupply_Backstop";
pub const GWP_BIO: &str = "6_MIP_GWP_Bio";
pub const CO2_PRICE: &str = "3_PR_RECC_CO2Price_SSP_32R";

pub const SERVICE_DEMAND: &str = "1_F_ServiceFlows_Future_passvehicles";
pub const VEHICLE_OCCUPANCY: &str = "6_MIP_VehicleOccupancyRate";
pub const RIDE_SHARING_OCCUPANCY: &str = "6_MIP_RideSharing_Occupancy";
pub const CAR_SHARING_SHARE: &str = "6_PR_CarSharingShare";
pub const RIDE_SHARING_SHARE: &str = "6_PR_RideSharingShare";
pub const CAR_SHARING_STOCK: &str = "6_MIP_CarSharing_Stock";
pub const VEHICLE_KILOMETRAGE: &str = "3_IO_Vehicles_UsePhase";

pub fn lifetime(kind: SectorKind) -> String {
    format!("3_LT_RECC_ProductLifetime_{}", kind.key())
}

pub fn lifetime_extension(kind: SectorKind) -> String {
    format!("6_PR_LifeTimeExtension_{}", kind.key())
}

pub fn material_content(kind: SectorKind) -> String {
    format!("3_MC_RECC_{}", kind.key())
}

pub fn light_weighting_share(kind: SectorKind) -> String {
    format!("3_SHA_LightWeighting_{}", kind.key())
}

pub fn down_sizing_share(kind: SectorKind) -> String {
    format!("3_SHA_DownSizing_{}", kind.key())
}

pub fn reuse(kind: SectorKind) -> String {
    format!("6_PR_ReUse_{}", kind.key())
}

pub fn initial_stock(kind: SectorKind) -> String {
    format!("2_S_RECC_FinalProducts_2015_{}", kind.key())
}

pub fn future_stock_per_capita(kind: SectorKind) -> String {
    format!("2_S_RECC_FinalProducts_Future_{}", kind.key())
}

pub fn more_intense_use_potential(kind: SectorKind) -> String {
    format!("2_S_RECC_FinalProducts_Future_{}_MIUPotential", kind.key())
}

pub fn type_split(kind: SectorKind) -> String {
    format!("3_SHA_TypeSplit_{}", kind.key())
}

pub fn energy_intensity(kind: SectorKind) -> String {
    format!("3_EI_Products_UsePhase_{}", kind.key())
}

pub fn operation_intensity(kind: SectorKind) -> String {
    match kind {
        SectorKind::PassengerVehicles => VEHICLE_KILOMETRAGE.to_string(),
        _ => format!("3_IO_{}", kind.key()),
    }
}

pub fn energy_carrier_split(kind: SectorKind) -> String {
    format!("3_SHA_EnergyCarrierSplit_{}", kind.key())
}

pub fn renovation_potential(kind: SectorKind) -> String {
    format!("3_SHA_MaxRenovationPotential_{}", kind.key())
}

pub fn renovation_savings(kind: SectorKind) -> String {
    format!("3_SHA_EnergySavingsPot_Renovation_{}", kind.key())
}

pub fn global_stock(kind: SectorKind) -> String {
    format!("2_S_RECC_FinalProducts_{}", kind.key())
}

pub fn final_products_inflow(kind: SectorKind) -> String {
    format!("1_F_RECC_FinalProducts_{}", kind.key())
}

/// Names of the three archetype tables derived from a base table name.
pub fn archetype_names(base: &str) -> [String; 3] {
    [
        format!("{}_LightWeighting", base),
        format!("{}_DownSizing", base),
        format!("{}_LightWeightingDownSizing", base),
    ]
}
