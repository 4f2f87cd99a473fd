//! Energy demand and greenhouse-gas emissions of a scenario pair.
//!
//! Energy is in TJ/yr and emissions in Mt CO2-eq/yr. Emission factors of energy carriers are
//! given per TJ in kt, hence the factor 0.001 wherever energy is converted to emissions.

mod gwp_bio;

pub use gwp_bio::GwpBioTable;

use crate::parameters::ScenarioParameters;
use crate::sectors::SectorStocks;
use log::info;
use ndarray::{Array1, Array2, Array3, ArrayView2, Axis};
use recc_core::classification::Aspect;
use recc_core::errors::RECCResult;
use recc_core::system::{FlowId, FlowRegistry};
use serde::{Deserialize, Serialize};

/// Carbon dioxide per unit of carbon.
const CO2_PER_CARBON: f64 = 3.666;
/// Energy intensities of material processing are given per kt, flows are in Mt.
const PER_KT: f64 = 1000.0;
/// kt to Mt.
const KT_TO_MT: f64 = 0.001;

/// Processes with an energy demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EnergyUse {
    UsePhase,
    PrimaryProduction,
    Manufacturing,
    WasteManagement,
    Remelting,
}

impl EnergyUse {
    pub const ALL: [EnergyUse; 5] = [
        EnergyUse::UsePhase,
        EnergyUse::PrimaryProduction,
        EnergyUse::Manufacturing,
        EnergyUse::WasteManagement,
        EnergyUse::Remelting,
    ];

    pub fn index(&self) -> usize {
        *self as usize
    }
}

/// Process groups of the emissions breakdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EmissionGroup {
    /// Direct emissions of the use phase
    UsePhaseDirect,
    /// Indirect emissions of electricity used in the use phase
    UsePhaseElectricity,
    /// Indirect emissions of the other energy carriers used in the use phase
    UsePhaseOther,
    /// Direct, indirect and process emissions of primary material production
    PrimaryProduction,
    Manufacturing,
    /// Waste management and remelting
    WasteManagement,
    /// Avoided primary production of exported secondary material
    RecyclingCredit,
    /// Biogenic carbon stored in wood products
    Biogenic,
}

impl EmissionGroup {
    pub const ALL: [EmissionGroup; 8] = [
        EmissionGroup::UsePhaseDirect,
        EmissionGroup::UsePhaseElectricity,
        EmissionGroup::UsePhaseOther,
        EmissionGroup::PrimaryProduction,
        EmissionGroup::Manufacturing,
        EmissionGroup::WasteManagement,
        EmissionGroup::RecyclingCredit,
        EmissionGroup::Biogenic,
    ];

    pub fn index(&self) -> usize {
        *self as usize
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmissionsResults {
    /// `[t, EnergyUse, n]`
    pub energy: Array3<f64>,
    /// Use-phase energy of the regional sectors, `[t, r, n]`
    pub use_phase_energy_by_region: Array3<f64>,
    /// `[t, EmissionGroup]`
    pub emissions: Array2<f64>,
    /// `[t]`
    pub total: Array1<f64>,
    /// `[t]`
    pub costs: Array1<f64>,
}

impl EmissionsResults {
    pub fn group(&self, group: EmissionGroup) -> Array1<f64> {
        self.emissions.column(group.index()).to_owned()
    }

    pub fn energy_use(&self, energy_use: EnergyUse) -> ArrayView2<'_, f64> {
        self.energy.index_axis(Axis(1), energy_use.index())
    }
}

/// Converts the energy demand and the material flows of a scenario pair into emissions.
pub struct EmissionsAccountant;

impl EmissionsAccountant {
    pub fn account(
        scenario: &ScenarioParameters,
        stocks: &SectorStocks,
        registry: &FlowRegistry,
    ) -> RECCResult<EmissionsResults> {
        let prepared = scenario.prepared;
        let time = *scenario.time();
        let nt = time.n_years;
        let nn = prepared.classifications.get(Aspect::EnergyCarrier)?.len();
        let nr = prepared.classifications.len(Aspect::Region);

        let mut energy = Array3::<f64>::zeros((nt, EnergyUse::ALL.len(), nn));
        let mut emissions = Array2::<f64>::zeros((nt, EmissionGroup::ALL.len()));

        // Use phase
        let use_phase = use_phase_energy(scenario, stocks, nt, nr, nn);
        energy
            .index_axis_mut(Axis(1), EnergyUse::UsePhase.index())
            .assign(&use_phase.sum_axis(Axis(1)));
        for t in 0..nt {
            for r in 0..nr {
                for n in 0..nn {
                    let e = use_phase[[t, r, n]];
                    if e == 0.0 {
                        continue;
                    }
                    emissions[[t, EmissionGroup::UsePhaseDirect.index()]] +=
                        KT_TO_MT * prepared.direct_emissions[n] * e;
                    let indirect = KT_TO_MT * scenario.supply_intensity[[n, r, t]] * e;
                    let group = if Some(n) == prepared.electricity {
                        EmissionGroup::UsePhaseElectricity
                    } else {
                        EmissionGroup::UsePhaseOther
                    };
                    emissions[[t, group.index()]] += indirect;
                }
            }
        }

        // Industrial processes draw on the world energy supply
        let f_3_4 = registry.flow(FlowId::F_3_4);
        let f_9_10 = registry.flow(FlowId::F_9_10);
        let f_9_12 = registry.flow(FlowId::F_9_12);
        let f_12_0 = registry.flow(FlowId::F_12_0);
        let nm = f_3_4.len_of(Axis(1));
        let manufacturing = manufacturing_energy(scenario, stocks, nt, nn);

        for t in 0..nt {
            let supply_factor = |n: usize| {
                KT_TO_MT
                    * (prepared.direct_emissions[n] + scenario.supply_intensity_world[[n, t]])
            };
            let mut primary_process = 0.0;
            let mut credit = 0.0;
            for m in 0..nm {
                let produced = f_3_4[[t, m, 0]];
                let exported = f_12_0[[t, m, 0]];
                primary_process += scenario.process_emissions[[m, t]] * produced;
                let mut avoided = scenario.process_emissions[[m, t]];
                for n in 0..nn {
                    let intensity = PER_KT * prepared.process_energy[[m, n]];
                    energy[[t, EnergyUse::PrimaryProduction.index(), n]] += intensity * produced;
                    avoided += supply_factor(n) * intensity;
                }
                credit -= avoided * exported;
            }

            for n in 0..nn {
                energy[[t, EnergyUse::Manufacturing.index(), n]] = manufacturing[[t, n]];
                energy[[t, EnergyUse::WasteManagement.index(), n]] = PER_KT
                    * (0..f_9_10.len_of(Axis(1)))
                        .map(|w| prepared.waste_energy[[w, n]] * f_9_10[[t, w, 0]])
                        .sum::<f64>();
                energy[[t, EnergyUse::Remelting.index(), n]] = PER_KT
                    * (0..nm)
                        .map(|m| prepared.remelting_energy[[m, n]] * f_9_12[[t, m, 0]])
                        .sum::<f64>();
            }

            let from_energy = |energy_use: EnergyUse| {
                (0..nn)
                    .map(|n| supply_factor(n) * energy[[t, energy_use.index(), n]])
                    .sum::<f64>()
            };
            emissions[[t, EmissionGroup::PrimaryProduction.index()]] =
                from_energy(EnergyUse::PrimaryProduction) + primary_process;
            emissions[[t, EmissionGroup::Manufacturing.index()]] =
                from_energy(EnergyUse::Manufacturing);
            emissions[[t, EmissionGroup::WasteManagement.index()]] =
                from_energy(EnergyUse::WasteManagement) + from_energy(EnergyUse::Remelting);
            if prepared.config.scrap_export_recycling_credit {
                emissions[[t, EmissionGroup::RecyclingCredit.index()]] = credit;
            }
        }

        emissions
            .column_mut(EmissionGroup::Biogenic.index())
            .assign(&biogenic_carbon(scenario, stocks, nt));

        let total = emissions.sum_axis(Axis(1));
        let costs = &scenario.co2_price * &total;
        info!(
            "Accounted emissions of scenario pair ({}, {}): {:.3} Mt in the final year",
            scenario.socioeconomic,
            scenario.climate_policy,
            total.iter().last().copied().unwrap_or(0.0)
        );

        Ok(EmissionsResults {
            energy,
            use_phase_energy_by_region: use_phase,
            emissions,
            total,
            costs,
        })
    }
}

/// Use-phase energy by region and carrier, `[t, r, n]`.
fn use_phase_energy(
    scenario: &ScenarioParameters,
    stocks: &SectorStocks,
    nt: usize,
    nr: usize,
    nn: usize,
) -> Array3<f64> {
    let mut energy = Array3::<f64>::zeros((nt, nr, nn));
    for (sector, flows) in scenario.sectors.iter().zip(stocks.sectors.iter()) {
        let use_phase = match &sector.energy {
            Some(use_phase) => use_phase,
            None => continue,
        };
        let (_, nc, nq, nk) = flows.stock.dim();
        for t in 0..nt {
            for q in 0..nq.min(nr) {
                for k in 0..nk {
                    let demand = (0..nc)
                        .map(|c| {
                            flows.stock[[t, c, q, k]]
                                * use_phase.effective_energy_intensity(t, c, q, k)
                        })
                        .sum::<f64>()
                        * use_phase.operation[[t, q]];
                    if demand == 0.0 {
                        continue;
                    }
                    for n in 0..nn {
                        energy[[t, q, n]] += demand * use_phase.carrier_split[[t, q, k, n]];
                    }
                }
            }
        }
    }
    energy
}

/// Manufacturing energy of the products entering use, `[t, n]`.
fn manufacturing_energy(
    scenario: &ScenarioParameters,
    stocks: &SectorStocks,
    nt: usize,
    nn: usize,
) -> Array2<f64> {
    let intensity = &scenario.prepared.manufacturing_energy;
    let mut energy = Array2::<f64>::zeros((nt, nn));
    for flows in &stocks.sectors {
        let factor = flows.kind.manufacturing_energy_factor();
        let inflow = flows.inflow.sum_axis(Axis(1));
        for (k, &g) in flows.goods.iter().enumerate() {
            for t in 0..nt {
                for n in 0..nn {
                    energy[[t, n]] += inflow[[t, k]] * intensity[[g, n]] * factor;
                }
            }
        }
    }
    energy
}

/// Biogenic carbon stored in the wood of new buildings, `[t]`.
///
/// The storage time is the nominal lifetime of the entering cohort, before any extension.
fn biogenic_carbon(scenario: &ScenarioParameters, stocks: &SectorStocks, nt: usize) -> Array1<f64> {
    let prepared = scenario.prepared;
    let mut credit = Array1::<f64>::zeros(nt);
    let wood = match (prepared.config.gwp_bio, prepared.wood) {
        (true, Some(wood)) => wood,
        _ => return credit,
    };
    if prepared.gwp_bio.is_zero() {
        return credit;
    }
    let time = scenario.time();
    let carbon = prepared.config.wood_carbon_content;
    for (sector, flows) in scenario.sectors.iter().zip(stocks.sectors.iter()) {
        if !sector.kind.is_building() {
            continue;
        }
        let unit = sector.kind.mass_unit_factor();
        let (_, nq, nk) = flows.inflow.dim();
        for t in 0..nt {
            let c = time.cohort_index_for_year(t);
            for q in 0..nq {
                for k in 0..nk {
                    let wood_mass =
                        flows.inflow[[t, q, k]] * sector.material_content[[c, q, k, wood]] * unit;
                    if wood_mass == 0.0 {
                        continue;
                    }
                    let factor = prepared
                        .gwp_bio
                        .factor(sector.nominal_lifetime[[k, q, c]]);
                    credit[t] += CO2_PER_CARBON * carbon * wood_mass * factor;
                }
            }
        }
    }
    credit
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_indices_follow_declaration_order() {
        for (i, group) in EmissionGroup::ALL.iter().enumerate() {
            assert_eq!(group.index(), i);
        }
        for (i, energy_use) in EnergyUse::ALL.iter().enumerate() {
            assert_eq!(energy_use.index(), i);
        }
    }

    #[test]
    fn results_expose_groups_and_uses() {
        let mut emissions = Array2::<f64>::zeros((2, EmissionGroup::ALL.len()));
        emissions[[1, EmissionGroup::Biogenic.index()]] = -3.0;
        let mut energy = Array3::<f64>::zeros((2, EnergyUse::ALL.len(), 1));
        energy[[0, EnergyUse::Remelting.index(), 0]] = 7.0;
        let results = EmissionsResults {
            energy,
            use_phase_energy_by_region: Array3::zeros((2, 1, 1)),
            total: emissions.sum_axis(Axis(1)),
            emissions,
            costs: Array1::zeros(2),
        };
        assert_eq!(results.group(EmissionGroup::Biogenic).to_vec(), vec![0.0, -3.0]);
        assert_eq!(results.energy_use(EnergyUse::Remelting)[[0, 0]], 7.0);
        assert_eq!(results.total[1], -3.0);
    }
}
