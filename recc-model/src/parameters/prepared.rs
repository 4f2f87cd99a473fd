use super::*;
use crate::config::ModelConfig;
use crate::emissions::GwpBioTable;
use crate::materials::{mix_archetypes, ConcreteSplit};
use crate::sectors::demand::VehicleService;
use crate::sectors::{DriverKind, Scope};
use log::info;
use ndarray::{s, stack, Array, Array1, Array2, Array3, Array4, Array5, Axis, Dimension, RemoveAxis};
use recc_core::classification::{Aspect, ClassificationSet};
use recc_core::errors::{RECCError, RECCResult};
use recc_core::parameter::ParameterSet;
use recc_core::survival::SurvivalFunctionBuilder;

/// Intensity tables of the design archetypes of a sector, `[q, k, x]`.
///
/// An absent archetype falls back to the plain design of the cohort being mixed.
#[derive(Debug, Clone, Default)]
pub struct Archetypes {
    pub light_weighting: Option<Array3<f64>>,
    pub down_sizing: Option<Array3<f64>>,
    pub light_weighting_down_sizing: Option<Array3<f64>>,
}

impl Archetypes {
    pub fn is_empty(&self) -> bool {
        self.light_weighting.is_none()
            && self.down_sizing.is_none()
            && self.light_weighting_down_sizing.is_none()
    }
}

/// Reuse rates as supplied per sector.
#[derive(Debug, Clone)]
pub enum ReuseRates {
    /// Percent of outflow per year, `[m, k, r, t, S]`
    ByYear(Array5<f64>),
    /// Potential reached at full strategy scale-up, `[m, k, q]`
    Potential(Array3<f64>),
}

/// Demand side of a stock-driven sector.
#[derive(Debug, Clone)]
pub struct PreparedDemand {
    /// `[c, k, r]`
    pub initial_stock: Array3<f64>,
    /// Stock per capita, `[S, t, r]`; `None` for vehicles
    pub per_capita: Option<Array3<f64>>,
    pub vehicle_service: Option<VehicleService>,
    /// `[k, r, t, S]`
    pub type_split: Array4<f64>,
    /// Percent, `[S]`
    pub more_intense_use_potential: Array1<f64>,
}

#[derive(Debug, Clone)]
pub enum PreparedDriver {
    Demand(PreparedDemand),
    /// Total stock per cohort year, `[k, c]`, the same in every scenario
    StockHistory(Array2<f64>),
    /// Inflow per cohort, `[c, o, k, S]`
    Inflow(Array4<f64>),
}

#[derive(Debug, Clone)]
pub struct PreparedUsePhase {
    /// Energy per unit of operation, `[S, c, r, k]`
    pub energy_intensity: Array4<f64>,
    /// Operation per unit of stock and year, `[t, r, S]`
    pub operation: Array3<f64>,
    /// `[t, r, k, n]`
    pub carrier_split: Array4<f64>,
    /// `[r, c, k]`
    pub renovation_coverage: Array3<f64>,
    /// `[r, k]`
    pub renovation_savings: Array2<f64>,
}

#[derive(Debug, Clone)]
pub struct PreparedSector {
    pub kind: SectorKind,
    pub goods: Vec<usize>,
    /// Nominal mean lifetime, `[k, q, c]`
    pub lifetime: Array3<f64>,
    /// `[k, q, S]`
    pub lifetime_extension: Array3<f64>,
    /// Archetype-mixed material intensity, `[S, c, q, k, m]`
    pub material_content: Array5<f64>,
    pub reuse: ReuseRates,
    pub driver: PreparedDriver,
    pub use_phase: Option<PreparedUsePhase>,
}

/// Parameters after the one-off preprocessing. Never mutated afterwards.
#[derive(Debug, Clone)]
pub struct PreparedParameters {
    pub classifications: ClassificationSet,
    pub config: ModelConfig,
    pub survival: SurvivalFunctionBuilder,
    pub sectors: Vec<PreparedSector>,
    /// `[t, r, S]`
    pub population: Option<Array3<f64>>,
    /// `[t, r, S, R]`
    pub scale_up_regional: Array4<f64>,
    /// `[t, S, R]`
    pub scale_up: Array3<f64>,
    /// `[m, e]`
    pub composition_existing: Array2<f64>,
    /// `[m, e]`
    pub composition_primary: Array2<f64>,
    /// `[m, w, g]`
    pub yield_loss: Array3<f64>,
    /// `[m, g, S]`
    pub yield_improvement: Array3<f64>,
    /// `[m, w, S]`
    pub scrap_diversion: Array3<f64>,
    /// Percent, `[r, g, m, w]`
    pub eol_recovery: Array4<f64>,
    /// Percent, `[o, g, m, w]`
    pub eol_recovery_aggregate: Option<Array4<f64>>,
    /// Percent, `[r, g, m, w]`
    pub eol_improvement: Array4<f64>,
    /// `[w, m, e]`
    pub remelting_yield: Array3<f64>,
    /// `[g, n]`
    pub manufacturing_energy: Array2<f64>,
    /// `[m, n]`
    pub process_energy: Array2<f64>,
    /// `[w, n]`
    pub waste_energy: Array2<f64>,
    /// `[m, n]`
    pub remelting_energy: Array2<f64>,
    /// `[n]`
    pub direct_emissions: Array1<f64>,
    /// `[m, t, R]`
    pub process_emissions: Array3<f64>,
    /// `[n, r, t, S, R]`
    pub supply_intensity: Array5<f64>,
    /// `[n, t, S, R]`
    pub supply_intensity_world: Array4<f64>,
    pub gwp_bio: GwpBioTable,
    /// `[t, S, R]`
    pub co2_price: Array3<f64>,
    pub floor_scenario: usize,
    pub electricity: Option<usize>,
    pub cement: Option<usize>,
    pub wood: Option<usize>,
    pub remainder_element: usize,
}

/// Cohort and model-year indices from which intensities and type splits stay frozen.
#[derive(Debug, Clone, Copy)]
struct Freeze {
    cohort: usize,
    year: usize,
}

/// Reads tables from the interpolated parameter set.
struct Reader<'a> {
    parameters: &'a ParameterSet,
    classifications: &'a ClassificationSet,
}

impl<'a> Reader<'a> {
    fn required<D: Dimension>(&self, name: &str, structure: &str) -> RECCResult<Array<f64, D>> {
        self.parameters.require_array(name, structure)
    }

    fn zeros<D: Dimension>(&self, name: &str, structure: &str) -> RECCResult<Array<f64, D>> {
        self.parameters
            .array_or_zeros(name, structure, self.classifications)
    }

    fn fill<D: Dimension>(
        &self,
        name: &str,
        structure: &str,
        value: f64,
    ) -> RECCResult<Array<f64, D>> {
        self.parameters
            .array_or_fill(name, structure, self.classifications, value)
    }

    fn optional<D: Dimension>(
        &self,
        name: &str,
        structure: &str,
    ) -> RECCResult<Option<Array<f64, D>>> {
        match self.parameters.get(name) {
            Some(_) => Ok(Some(self.required(name, structure)?)),
            None => Ok(None),
        }
    }

    /// Required table restricted to a sector's goods along `axis`.
    fn goods<D: RemoveAxis>(
        &self,
        name: &str,
        structure: &str,
        axis: usize,
        goods: &[usize],
    ) -> RECCResult<Array<f64, D>> {
        Ok(self
            .required::<D>(name, structure)?
            .select(Axis(axis), goods))
    }

    fn goods_or_fill<D: RemoveAxis>(
        &self,
        name: &str,
        structure: &str,
        axis: usize,
        goods: &[usize],
        value: f64,
    ) -> RECCResult<Array<f64, D>> {
        Ok(self
            .fill::<D>(name, structure, value)?
            .select(Axis(axis), goods))
    }

    fn optional_goods<D: RemoveAxis>(
        &self,
        name: &str,
        structure: &str,
        axis: usize,
        goods: &[usize],
    ) -> RECCResult<Option<Array<f64, D>>> {
        Ok(self
            .optional::<D>(name, structure)?
            .map(|values| values.select(Axis(axis), goods)))
    }
}

impl PreparedParameters {
    pub(super) fn from_base(base: &BaseParameters) -> RECCResult<Self> {
        let classifications = base.classifications();
        let config = base.config();
        let switches = &config.strategies;
        let time = *classifications.time();

        let mut parameters = base.parameters().clone();
        for parameter in parameters.iter_mut() {
            parameter.interpolate_missing_years();
        }
        let reader = Reader {
            parameters: &parameters,
            classifications,
        };

        let materials = classifications.get(Aspect::Material)?;
        let carriers = classifications.get(Aspect::EnergyCarrier)?;
        let items = &config.special_items;
        let concrete_split = ConcreteSplit::resolve(materials, items, config.concrete_cement_share);
        let freeze = if config.no_efficiency_improvements {
            let cohort = (config.efficiency_freeze_year - time.first_cohort_year)
                .clamp(0, time.n_cohorts as i32 - 1) as usize;
            let year = (config.efficiency_freeze_year - time.base_year())
                .clamp(0, time.n_years as i32 - 1) as usize;
            Some(Freeze { cohort, year })
        } else {
            None
        };

        let sectors = base
            .sectors()
            .iter()
            .map(|sector| {
                prepare_sector(
                    &reader,
                    sector.kind,
                    &sector.goods,
                    config,
                    concrete_split.as_ref(),
                    freeze,
                )
            })
            .collect::<RECCResult<Vec<_>>>()?;

        let any_regional = sectors.iter().any(|s| s.kind.scope() == Scope::Regional);
        let any_aggregate = sectors.iter().any(|s| s.kind.scope() == Scope::Aggregate);

        let mut eol_recovery = reader.zeros::<ndarray::Ix4>(EOL_RECOVERY_RATE, "r,g,m,w")?;
        let mut eol_recovery_aggregate = if any_aggregate {
            Some(reader.required::<ndarray::Ix4>(EOL_RECOVERY_RATE_AGGREGATE, "o,g,m,w")?)
        } else {
            None
        };
        let mut remelting_yield = reader.required(REMELTING_YIELD, "w,m,e")?;
        if !config.include_recycling {
            eol_recovery.fill(0.0);
            if let Some(aggregate) = eol_recovery_aggregate.as_mut() {
                aggregate.fill(0.0);
            }
            remelting_yield.fill(0.0);
        }

        let mut eol_improvement = reader.zeros::<ndarray::Ix4>(EOL_RECOVERY_IMPROVEMENT, "r,g,m,w")?;
        if !switches.eol_recovery_improvement {
            eol_improvement.fill(0.0);
        }
        let mut yield_improvement =
            reader.zeros::<ndarray::Ix3>(FABRICATION_YIELD_IMPROVEMENT, "m,g,S")?;
        if !switches.fabrication_yield_improvement {
            yield_improvement.fill(0.0);
        }
        let mut scrap_diversion =
            reader.zeros::<ndarray::Ix3>(FABRICATION_SCRAP_DIVERSION, "m,w,S")?;
        if !switches.fabrication_scrap_diversion {
            scrap_diversion.fill(0.0);
        }

        let electricity = carriers.position(&items.electricity);
        let mut supply_intensity =
            reader.zeros::<ndarray::Ix5>(SUPPLY_INTENSITY, "n,r,t,S,R")?;
        let mut supply_intensity_world =
            reader.zeros::<ndarray::Ix4>(SUPPLY_INTENSITY_WORLD, "n,t,S,R")?;
        if let (Some(n), Some(backstop)) = (
            electricity,
            reader.optional::<ndarray::Ix1>(ELECTRICITY_BACKSTOP, "t")?,
        ) {
            floor_at_backstop(&mut supply_intensity, &mut supply_intensity_world, n, &backstop);
        }

        let gwp_bio = match reader.optional::<ndarray::Ix1>(GWP_BIO, "a")? {
            Some(values) => {
                let ages = classifications
                    .get(Aspect::Age)?
                    .items
                    .iter()
                    .map(|label| {
                        label.trim().parse::<f64>().map_err(|_| {
                            RECCError::InconsistentSelection(format!(
                                "age label '{}' is not a number",
                                label
                            ))
                        })
                    })
                    .collect::<RECCResult<Vec<_>>>()?;
                GwpBioTable::from_points(&ages, values.view())
            }
            None => GwpBioTable::zeros(),
        };

        let population = if any_regional {
            Some(reader.required(POPULATION, "t,r,S")?)
        } else {
            None
        };

        info!("Preprocessed parameters for {} sector(s)", sectors.len());
        Ok(Self {
            classifications: classifications.clone(),
            config: config.clone(),
            survival: config.survival_builder(),
            sectors,
            population,
            scale_up_regional: reader.zeros(SCALE_UP_REGIONAL, "t,r,S,R")?,
            scale_up: reader.zeros(SCALE_UP, "t,S,R")?,
            composition_existing: reader.required(COMPOSITION_EXISTING_STOCK, "m,e")?,
            composition_primary: reader.required(COMPOSITION_PRIMARY, "m,e")?,
            yield_loss: reader.required(MANUFACTURING_YIELD_LOSS, "m,w,g")?,
            yield_improvement,
            scrap_diversion,
            eol_recovery,
            eol_recovery_aggregate,
            eol_improvement,
            remelting_yield,
            manufacturing_energy: reader.zeros(MANUFACTURING_ENERGY, "g,n")?,
            process_energy: reader.zeros(PROCESS_ENERGY, "m,n")?,
            waste_energy: reader.zeros(WASTE_MANAGEMENT_ENERGY, "w,n")?,
            remelting_energy: reader.zeros(REMELTING_ENERGY, "m,n")?,
            direct_emissions: reader.zeros(DIRECT_EMISSIONS, "n")?,
            process_emissions: reader.zeros(PROCESS_EMISSIONS, "m,t,R")?,
            supply_intensity,
            supply_intensity_world,
            gwp_bio,
            co2_price: reader.zeros(CO2_PRICE, "t,S,R")?,
            floor_scenario: classifications.index_of(
                Aspect::SocioeconomicScenario,
                &config.minimum_demand_scenario,
            )?,
            electricity,
            cement: materials.position(&items.cement),
            wood: materials.position(&items.wood),
            remainder_element: classifications.remainder_element()?,
        })
    }

    pub fn time(&self) -> &recc_core::time::TimeAxis {
        self.classifications.time()
    }

    pub fn n_socioeconomic(&self) -> usize {
        self.classifications.len(Aspect::SocioeconomicScenario)
    }

    pub fn n_climate_policy(&self) -> usize {
        self.classifications.len(Aspect::ClimatePolicyScenario)
    }
}

fn prepare_sector(
    reader: &Reader,
    kind: SectorKind,
    goods: &[usize],
    config: &ModelConfig,
    concrete_split: Option<&ConcreteSplit>,
    freeze: Option<Freeze>,
) -> RECCResult<PreparedSector> {
    let scope = kind.scope();
    let switches = &config.strategies;
    let time = *reader.classifications.time();
    let n_socioeconomic = reader.classifications.len(Aspect::SocioeconomicScenario);

    let lifetime = reader.goods::<ndarray::Ix3>(&lifetime(kind), &scope.structure("g,q,c"), 0, goods)?;
    let mut lifetime_extension = reader.goods_or_fill::<ndarray::Ix3>(
        &lifetime_extension(kind),
        &scope.structure("g,q,S"),
        0,
        goods,
        0.0,
    )?;
    if !switches.lifetime_extension {
        lifetime_extension.fill(0.0);
    }

    // Material content: concrete split, then archetype mixing per socioeconomic scenario
    let mut base_content = reader.goods::<ndarray::Ix4>(
        &material_content(kind),
        &scope.structure("c,q,g,m"),
        2,
        goods,
    )?;
    let [lw, ds, lwds] = read_archetypes::<ndarray::Ix3>(
        reader,
        &material_content(kind),
        &scope.structure("q,g,m"),
        goods,
    )?;
    let mut content_archetypes = Archetypes {
        light_weighting: lw,
        down_sizing: ds,
        light_weighting_down_sizing: lwds,
    };
    if let Some(split) = concrete_split {
        split.apply(&mut base_content);
        for archetype in [
            content_archetypes.light_weighting.as_mut(),
            content_archetypes.down_sizing.as_mut(),
            content_archetypes.light_weighting_down_sizing.as_mut(),
        ]
        .into_iter()
        .flatten()
        {
            split.apply(archetype);
        }
    }

    let mut light_weighting = reader.goods_or_fill::<ndarray::Ix4>(
        &light_weighting_share(kind),
        &scope.structure("g,q,t,S"),
        0,
        goods,
        0.0,
    )?;
    if !switches.material_substitution {
        freeze_first_year(&mut light_weighting);
    }
    let mut down_sizing = reader.goods_or_fill::<ndarray::Ix4>(
        &down_sizing_share(kind),
        &scope.structure("g,q,t,S"),
        0,
        goods,
        0.0,
    )?;
    if !switches.using_less_material_by_design {
        freeze_first_year(&mut down_sizing);
    }

    let mixed = (0..n_socioeconomic)
        .map(|s| {
            mix_archetypes(
                &base_content,
                &content_archetypes,
                light_weighting.index_axis(Axis(3), s),
                down_sizing.index_axis(Axis(3), s),
                &time,
            )
        })
        .collect::<Vec<_>>();
    let mut material_content = stack_scenarios(&mixed)?;
    if let Some(freeze) = freeze {
        freeze_cohorts(&mut material_content, freeze.cohort);
    }

    let reuse = if kind == SectorKind::PassengerVehicles {
        let mut rates = reader.goods_or_fill::<ndarray::Ix5>(
            &reuse(kind),
            "m,g,r,t,S",
            1,
            goods,
            0.0,
        )?;
        if !switches.reuse && time.n_years > 1 {
            let reference = rates.slice(s![.., .., .., 1..2, ..]).to_owned();
            for t in 0..time.n_years {
                rates
                    .slice_mut(s![.., .., .., t..t + 1, ..])
                    .assign(&reference);
            }
        }
        ReuseRates::ByYear(rates)
    } else {
        let mut potential = reader.goods_or_fill::<ndarray::Ix3>(
            &reuse(kind),
            &scope.structure("m,g,q"),
            1,
            goods,
            0.0,
        )?;
        if !switches.reuse {
            potential.fill(0.0);
        }
        ReuseRates::Potential(potential)
    };

    let driver = match kind.driver() {
        DriverKind::Demand => {
            PreparedDriver::Demand(prepare_demand(reader, kind, goods, config, freeze)?)
        }
        DriverKind::StockHistory => {
            PreparedDriver::StockHistory(reader.goods(&global_stock(kind), "g,c", 0, goods)?)
        }
        DriverKind::Inflow => PreparedDriver::Inflow(reader.goods(
            &final_products_inflow(kind),
            "c,o,g,S",
            2,
            goods,
        )?),
    };

    let use_phase = match scope {
        Scope::Regional => prepare_use_phase(
            reader,
            kind,
            goods,
            &light_weighting,
            &down_sizing,
            freeze,
        )?,
        Scope::Aggregate => None,
    };

    Ok(PreparedSector {
        kind,
        goods: goods.to_vec(),
        lifetime,
        lifetime_extension,
        material_content,
        reuse,
        driver,
        use_phase,
    })
}

fn prepare_demand(
    reader: &Reader,
    kind: SectorKind,
    goods: &[usize],
    config: &ModelConfig,
    freeze: Option<Freeze>,
) -> RECCResult<PreparedDemand> {
    let switches = &config.strategies;
    let mut type_split = reader.goods::<ndarray::Ix4>(&type_split(kind), "g,r,t,S", 0, goods)?;
    if let Some(freeze) = freeze {
        let frozen = type_split
            .slice(s![.., .., freeze.year..freeze.year + 1, ..])
            .to_owned();
        let n_years = type_split.len_of(Axis(2));
        for t in freeze.year + 1..n_years {
            type_split.slice_mut(s![.., .., t..t + 1, ..]).assign(&frozen);
        }
    }

    let (per_capita, vehicle_service) = if kind == SectorKind::PassengerVehicles {
        let n_regions = reader.classifications.len(Aspect::Region);
        let n_socioeconomic = reader.classifications.len(Aspect::SocioeconomicScenario);
        let mut car_sharing_share = reader.zeros(CAR_SHARING_SHARE, "t,S")?;
        if !switches.car_sharing {
            car_sharing_share.fill(0.0);
        }
        let mut ride_sharing_share = reader.zeros(RIDE_SHARING_SHARE, "t,S")?;
        if !switches.ride_sharing {
            ride_sharing_share.fill(0.0);
        }
        let service = VehicleService {
            service: reader.required(SERVICE_DEMAND, "t,r,S")?,
            occupancy: reader.required(VEHICLE_OCCUPANCY, "r,S")?,
            ride_sharing_occupancy: reader.fill(RIDE_SHARING_OCCUPANCY, "r,S", 1.0)?,
            car_sharing_share,
            ride_sharing_share,
            car_sharing_stock: reader
                .optional(CAR_SHARING_STOCK, "r,S")?
                .unwrap_or_else(|| Array2::ones((n_regions, n_socioeconomic))),
            kilometrage: reader.required(VEHICLE_KILOMETRAGE, "t,r,S")?,
        };
        (None, Some(service))
    } else {
        (
            Some(reader.required(&future_stock_per_capita(kind), "S,t,r")?),
            None,
        )
    };

    Ok(PreparedDemand {
        initial_stock: reader.goods(&initial_stock(kind), "c,g,r", 1, goods)?,
        per_capita,
        vehicle_service,
        type_split,
        more_intense_use_potential: reader.zeros(&more_intense_use_potential(kind), "S")?,
    })
}

fn prepare_use_phase(
    reader: &Reader,
    kind: SectorKind,
    goods: &[usize],
    light_weighting: &Array4<f64>,
    down_sizing: &Array4<f64>,
    freeze: Option<Freeze>,
) -> RECCResult<Option<PreparedUsePhase>> {
    let time = *reader.classifications.time();
    let name = energy_intensity(kind);
    let base = match reader.optional_goods::<ndarray::Ix3>(&name, "c,r,g", 2, goods)? {
        Some(values) => values.insert_axis(Axis(3)),
        None => return Ok(None),
    };
    let [lw, ds, lwds] = read_archetypes::<ndarray::Ix2>(reader, &name, "r,g", goods)?;
    let archetypes = Archetypes {
        light_weighting: lw.map(|a| a.insert_axis(Axis(2))),
        down_sizing: ds.map(|a| a.insert_axis(Axis(2))),
        light_weighting_down_sizing: lwds.map(|a| a.insert_axis(Axis(2))),
    };

    let mixed = (0..light_weighting.len_of(Axis(3)))
        .map(|s| {
            mix_archetypes(
                &base,
                &archetypes,
                light_weighting.index_axis(Axis(3), s),
                down_sizing.index_axis(Axis(3), s),
                &time,
            )
            .index_axis_move(Axis(3), 0)
        })
        .collect::<Vec<_>>();
    let views = mixed.iter().map(|a| a.view()).collect::<Vec<_>>();
    let mut energy_intensity = stack(Axis(0), &views)
        .map_err(|e| RECCError::Error(format!("stacking {}: {}", name, e)))?;
    if let Some(freeze) = freeze {
        freeze_cohorts(&mut energy_intensity, freeze.cohort);
    }

    Ok(Some(PreparedUsePhase {
        energy_intensity,
        operation: reader.fill(&operation_intensity(kind), "t,r,S", 1.0)?,
        carrier_split: reader.goods_or_fill(&energy_carrier_split(kind), "t,r,g,n", 2, goods, 0.0)?,
        renovation_coverage: reader.goods_or_fill(
            &renovation_potential(kind),
            "r,c,g",
            2,
            goods,
            0.0,
        )?,
        renovation_savings: reader.goods_or_fill(
            &renovation_savings(kind),
            "r,g",
            1,
            goods,
            0.0,
        )?,
    }))
}

/// Read the archetype tables derived from `base`, restricted to the goods on axis 1.
fn read_archetypes<D: RemoveAxis>(
    reader: &Reader,
    base: &str,
    structure: &str,
    goods: &[usize],
) -> RECCResult<[Option<Array<f64, D>>; 3]> {
    let [lw, ds, lwds] = archetype_names(base);
    Ok([
        reader.optional_goods(&lw, structure, 1, goods)?,
        reader.optional_goods(&ds, structure, 1, goods)?,
        reader.optional_goods(&lwds, structure, 1, goods)?,
    ])
}

fn stack_scenarios(mixed: &[Array4<f64>]) -> RECCResult<Array5<f64>> {
    let views = mixed.iter().map(|a| a.view()).collect::<Vec<_>>();
    stack(Axis(0), &views).map_err(|e| RECCError::Error(format!("stacking scenarios: {}", e)))
}

/// Hold every year of a `[k, q, t, S]` share table at its first-year value.
fn freeze_first_year(shares: &mut Array4<f64>) {
    let first = shares.slice(s![.., .., 0..1, ..]).to_owned();
    for t in 1..shares.len_of(Axis(2)) {
        shares.slice_mut(s![.., .., t..t + 1, ..]).assign(&first);
    }
}

/// Copy the intensity of cohort `frozen` onto every later cohort, axis 1 being the cohort.
fn freeze_cohorts<D: RemoveAxis>(values: &mut Array<f64, D>, frozen: usize) {
    let n_cohorts = values.len_of(Axis(1));
    if frozen + 1 >= n_cohorts {
        return;
    }
    let reference = values.index_axis(Axis(1), frozen).to_owned();
    for c in frozen + 1..n_cohorts {
        values.index_axis_mut(Axis(1), c).assign(&reference);
    }
}

/// Raise the electricity intensity of the energy supply to at least the backstop, `[t]`.
fn floor_at_backstop(
    regional: &mut Array5<f64>,
    world: &mut Array4<f64>,
    electricity: usize,
    backstop: &Array1<f64>,
) {
    for ((_, t, _, _), value) in regional
        .index_axis_mut(Axis(0), electricity)
        .indexed_iter_mut()
    {
        *value = value.max(backstop[t]);
    }
    for ((t, _, _), value) in world
        .index_axis_mut(Axis(0), electricity)
        .indexed_iter_mut()
    {
        *value = value.max(backstop[t]);
    }
}
