use super::*;
use crate::sectors::demand::{apply_floor, more_intense_use_ramp};
use crate::sectors::lifetime::{apply_car_sharing, extend_all_cohorts, extend_future_cohorts};
use crate::sectors::{LifetimeExtensionMode, Scope};
use ndarray::{Array1, Array2, Array3, Array4, Axis};
use recc_core::errors::{RECCError, RECCResult};
use recc_core::time::TimeAxis;
use recc_core::utils::guarded_inverse;

/// Stock-flow driver of a sector for one scenario pair.
#[derive(Debug, Clone)]
pub enum ScenarioDriver {
    Demand {
        /// Floored target stock per capita, `[t, r]`
        per_capita: Array2<f64>,
        /// `[t, r]`
        population: Array2<f64>,
        /// `[c, k, r]`
        initial_stock: Array3<f64>,
        /// `[k, r, t]`
        type_split: Array3<f64>,
    },
    StockHistory {
        /// `[k, c]`
        stock: Array2<f64>,
    },
    Inflow {
        /// `[c, o, k]`
        inflow: Array3<f64>,
    },
}

/// End-of-life recovery rates as fractions, improving with the strategy scale-up.
#[derive(Debug, Clone)]
pub struct RecoveryRates {
    /// `[q, k, m, w]`
    pub base: Array4<f64>,
    /// Additional recovery at full scale-up, `[q, k, m, w]`
    pub improvement: Array4<f64>,
    /// `[t, q]`
    pub scale_up: Array2<f64>,
}

impl RecoveryRates {
    pub fn rate(&self, t: usize, q: usize, k: usize, m: usize, w: usize) -> f64 {
        self.base[[q, k, m, w]] + self.scale_up[[t, q]] * self.improvement[[q, k, m, w]]
    }
}

/// Renovation of historic building cohorts.
#[derive(Debug, Clone)]
pub struct Renovation {
    /// Share of each cohort that is renovated at full scale-up, `[r, c, k]`
    pub coverage: Array3<f64>,
    /// Energy saved by renovation, `[r, k]`
    pub savings: Array2<f64>,
    /// `[t, r]`
    pub scale_up: Array2<f64>,
}

/// Use-phase energy parameters of a sector for one scenario pair.
#[derive(Debug, Clone)]
pub struct UsePhaseEnergy {
    /// `[c, r, k]`
    pub intensity: Array3<f64>,
    /// `[t, r]`
    pub operation: Array2<f64>,
    /// `[t, r, k, n]`
    pub carrier_split: Array4<f64>,
    pub renovation: Option<Renovation>,
    pub switch_time: usize,
}

impl UsePhaseEnergy {
    /// Energy intensity of cohort `c` in model year `t`.
    ///
    /// Renovation lowers the intensity of historic cohorts only.
    pub fn effective_energy_intensity(&self, t: usize, c: usize, r: usize, k: usize) -> f64 {
        let intensity = self.intensity[[c, r, k]];
        match &self.renovation {
            Some(renovation) if c < self.switch_time => {
                intensity
                    * (1.0
                        - renovation.scale_up[[t, r]]
                            * renovation.coverage[[r, c, k]]
                            * renovation.savings[[r, k]])
            }
            _ => intensity,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScenarioSector {
    pub kind: SectorKind,
    pub goods: Vec<usize>,
    /// Effective mean lifetime, `[k, q, c]`
    pub lifetime: Array3<f64>,
    /// Lifetime before extension and sharing effects, `[k, q, c]`
    pub nominal_lifetime: Array3<f64>,
    pub driver: ScenarioDriver,
    /// `[c, q, k, m]`
    pub material_content: Array4<f64>,
    /// Fraction of outflow offered for re-use, `[t, m, q, k]`
    pub reuse_rate: Array4<f64>,
    pub recovery: RecoveryRates,
    pub energy: Option<UsePhaseEnergy>,
}

impl ScenarioSector {
    pub fn n_goods(&self) -> usize {
        self.goods.len()
    }

    pub fn n_regions(&self) -> usize {
        self.lifetime.len_of(Axis(1))
    }
}

/// Parameters of one (socioeconomic, climate policy) scenario pair.
///
/// Derived from [`PreparedParameters`] by pure functions; the prepared tables are only read.
#[derive(Debug, Clone)]
pub struct ScenarioParameters<'a> {
    pub prepared: &'a PreparedParameters,
    pub socioeconomic: usize,
    pub climate_policy: usize,
    /// `[t, r]`
    pub scale_up_regional: Array2<f64>,
    /// `[t]`
    pub scale_up: Array1<f64>,
    /// Fabrication yield loss, `[t, m, w, g]`
    pub yield_loss: Array4<f64>,
    /// Inverse of the fabrication yield, `[t, m, g]`
    pub yield_inverse: Array3<f64>,
    /// `[m, w]`
    pub scrap_diversion: Array2<f64>,
    pub sectors: Vec<ScenarioSector>,
    /// `[m, t]`
    pub process_emissions: Array2<f64>,
    /// `[n, r, t]`
    pub supply_intensity: Array3<f64>,
    /// `[n, t]`
    pub supply_intensity_world: Array2<f64>,
    /// `[t]`
    pub co2_price: Array1<f64>,
}

impl<'a> ScenarioParameters<'a> {
    pub fn for_pair(
        prepared: &'a PreparedParameters,
        socioeconomic: usize,
        climate_policy: usize,
    ) -> RECCResult<Self> {
        let (s, r) = (socioeconomic, climate_policy);
        if s >= prepared.n_socioeconomic() || r >= prepared.n_climate_policy() {
            return Err(RECCError::InconsistentSelection(format!(
                "scenario pair ({}, {}) is out of range",
                s, r
            )));
        }
        let time = *prepared.time();

        let scale_up_regional = prepared
            .scale_up_regional
            .index_axis(Axis(3), r)
            .index_axis(Axis(2), s)
            .to_owned();
        let scale_up = prepared
            .scale_up
            .index_axis(Axis(2), r)
            .index_axis(Axis(1), s)
            .to_owned();

        let (yield_loss, yield_inverse) = fabrication_yield(prepared, s, &scale_up);

        let sectors = prepared
            .sectors
            .iter()
            .map(|sector| scenario_sector(prepared, sector, s, &time, &scale_up_regional, &scale_up))
            .collect::<RECCResult<Vec<_>>>()?;

        Ok(Self {
            prepared,
            socioeconomic,
            climate_policy,
            scale_up_regional,
            scale_up,
            yield_loss,
            yield_inverse,
            scrap_diversion: prepared.scrap_diversion.index_axis(Axis(2), s).to_owned(),
            sectors,
            process_emissions: prepared.process_emissions.index_axis(Axis(2), r).to_owned(),
            supply_intensity: prepared
                .supply_intensity
                .index_axis(Axis(4), r)
                .index_axis(Axis(3), s)
                .to_owned(),
            supply_intensity_world: prepared
                .supply_intensity_world
                .index_axis(Axis(3), r)
                .index_axis(Axis(2), s)
                .to_owned(),
            co2_price: prepared
                .co2_price
                .index_axis(Axis(2), r)
                .index_axis(Axis(1), s)
                .to_owned(),
        })
    }

    pub fn time(&self) -> &TimeAxis {
        self.prepared.time()
    }
}

/// Yield losses lowered by the improvement potential, and the inverse yield.
fn fabrication_yield(
    prepared: &PreparedParameters,
    s: usize,
    scale_up: &Array1<f64>,
) -> (Array4<f64>, Array3<f64>) {
    let (nm, nw, ng) = prepared.yield_loss.dim();
    let nt = scale_up.len();
    let mut loss = Array4::<f64>::zeros((nt, nm, nw, ng));
    for ((t, m, w, g), value) in loss.indexed_iter_mut() {
        let base = prepared.yield_loss[[m, w, g]];
        *value = if base > 0.0 {
            (base - prepared.yield_improvement[[m, g, s]] * scale_up[t]).max(0.0)
        } else {
            base
        };
    }
    let inverse = Array3::from_shape_fn((nt, nm, ng), |(t, m, g)| {
        let total = (0..nw).map(|w| loss[[t, m, w, g]]).sum::<f64>();
        guarded_inverse(1.0 - total)
    });
    (loss, inverse)
}

fn scenario_sector(
    prepared: &PreparedParameters,
    sector: &PreparedSector,
    s: usize,
    time: &TimeAxis,
    scale_up_regional: &Array2<f64>,
    scale_up: &Array1<f64>,
) -> RECCResult<ScenarioSector> {
    let config = &prepared.config;
    let (n_goods, n_regions, _) = sector.lifetime.dim();
    let sector_scale_up = match sector.kind.scope() {
        Scope::Regional => scale_up_regional.clone(),
        Scope::Aggregate => Array2::from_shape_fn((time.n_years, n_regions), |(t, _)| scale_up[t]),
    };

    // Lifetimes
    let nominal_lifetime = sector.lifetime.clone();
    let mut lifetime = nominal_lifetime.clone();
    if let PreparedDriver::Demand(PreparedDemand {
        vehicle_service: Some(service),
        ..
    }) = &sector.driver
    {
        if config.strategies.car_sharing {
            apply_car_sharing(
                &mut lifetime,
                service.car_sharing_share.column(s),
                service.car_sharing_stock.column(s),
                time,
            );
        }
    }
    let extension = sector.lifetime_extension.index_axis(Axis(2), s);
    match sector.kind.lifetime_extension_mode() {
        LifetimeExtensionMode::FutureCohorts => {
            extend_future_cohorts(&mut lifetime, extension, sector_scale_up.view(), time)
        }
        LifetimeExtensionMode::AllCohorts => extend_all_cohorts(&mut lifetime, extension, time),
    }

    let driver = match &sector.driver {
        PreparedDriver::Demand(demand) => {
            scenario_demand(prepared, sector.kind, demand, s, time)?
        }
        PreparedDriver::StockHistory(stock) => ScenarioDriver::StockHistory {
            stock: stock.clone(),
        },
        PreparedDriver::Inflow(inflow) => ScenarioDriver::Inflow {
            inflow: inflow.index_axis(Axis(3), s).to_owned(),
        },
    };

    // Cement reduction of future cohorts
    let mut material_content = sector.material_content.index_axis(Axis(0), s).to_owned();
    if let (true, Some(cement)) = (config.strategies.material_efficiency, prepared.cement) {
        for t in time.model_years() {
            let c = time.cohort_index_for_year(t);
            let factor = 1.0 - config.cement_reduction_potential * scale_up[t];
            material_content
                .index_axis_mut(Axis(0), c)
                .index_axis_mut(Axis(2), cement)
                .mapv_inplace(|v| v * factor);
        }
    }

    let n_materials = material_content.len_of(Axis(3));
    let reuse_rate = match &sector.reuse {
        ReuseRates::ByYear(rates) => {
            Array4::from_shape_fn((time.n_years, n_materials, n_regions, n_goods), |(t, m, q, k)| {
                rates[[m, k, q, t, s]] / 100.0
            })
        }
        ReuseRates::Potential(potential) => {
            Array4::from_shape_fn((time.n_years, n_materials, n_regions, n_goods), |(t, m, q, k)| {
                sector_scale_up[[t, q]] * potential[[m, k, q]]
            })
        }
    };

    let recovery = match sector.kind.scope() {
        Scope::Regional => RecoveryRates {
            base: prepared.eol_recovery.select(Axis(1), &sector.goods) / 100.0,
            improvement: prepared.eol_improvement.select(Axis(1), &sector.goods) / 100.0,
            scale_up: sector_scale_up.clone(),
        },
        Scope::Aggregate => {
            let base = prepared
                .eol_recovery_aggregate
                .as_ref()
                .ok_or_else(|| RECCError::MissingParameter(EOL_RECOVERY_RATE_AGGREGATE.to_string()))?
                .select(Axis(1), &sector.goods)
                / 100.0;
            RecoveryRates {
                improvement: Array4::zeros(base.raw_dim()),
                base,
                scale_up: Array2::zeros((time.n_years, n_regions)),
            }
        }
    };

    let energy = sector.use_phase.as_ref().map(|use_phase| UsePhaseEnergy {
        intensity: use_phase.energy_intensity.index_axis(Axis(0), s).to_owned(),
        operation: use_phase.operation.index_axis(Axis(2), s).to_owned(),
        carrier_split: use_phase.carrier_split.clone(),
        renovation: if sector.kind.renovation_enabled(&config.strategies) {
            Some(Renovation {
                coverage: use_phase.renovation_coverage.clone(),
                savings: use_phase.renovation_savings.clone(),
                scale_up: sector_scale_up.clone(),
            })
        } else {
            None
        },
        switch_time: time.switch_time(),
    });

    Ok(ScenarioSector {
        kind: sector.kind,
        goods: sector.goods.clone(),
        lifetime,
        nominal_lifetime,
        driver,
        material_content,
        reuse_rate,
        recovery,
        energy,
    })
}

/// Floored per-capita demand, population and stock-model inputs of a stock-driven sector.
fn scenario_demand(
    prepared: &PreparedParameters,
    kind: SectorKind,
    demand: &PreparedDemand,
    s: usize,
    time: &TimeAxis,
) -> RECCResult<ScenarioDriver> {
    let floor_scenario = prepared.floor_scenario;
    let population = prepared
        .population
        .as_ref()
        .ok_or_else(|| RECCError::MissingParameter(POPULATION.to_string()))?
        .index_axis(Axis(2), s)
        .to_owned();

    let mut per_capita = match (&demand.vehicle_service, &demand.per_capita) {
        (Some(service), _) => {
            let mut per_capita = service.per_capita_stock(s);
            apply_floor(&mut per_capita, service.per_capita_stock(floor_scenario).view());
            per_capita
        }
        (None, Some(table)) => {
            let mut per_capita = table.index_axis(Axis(0), s).to_owned();
            if prepared.config.strategies.more_intense_use && s != floor_scenario {
                let remaining = 1.0 - demand.more_intense_use_potential[s] / 100.0;
                let ramp = more_intense_use_ramp(time.n_years, remaining);
                for (t, mut row) in per_capita.axis_iter_mut(Axis(0)).enumerate() {
                    row.mapv_inplace(|v| v * ramp[t]);
                }
            }
            per_capita
        }
        (None, None) => {
            return Err(RECCError::MissingParameter(future_stock_per_capita(kind)));
        }
    };
    if demand.vehicle_service.is_none() {
        if let Some(table) = &demand.per_capita {
            apply_floor(&mut per_capita, table.index_axis(Axis(0), floor_scenario));
        }
    }
    Ok(ScenarioDriver::Demand {
        per_capita,
        population,
        initial_stock: demand.initial_stock.clone(),
        type_split: demand.type_split.index_axis(Axis(3), s).to_owned(),
    })
}
