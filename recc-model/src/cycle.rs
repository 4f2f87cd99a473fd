//! The year-by-year material cycle of one scenario pair.
//!
//! Each model year after the base year turns the use-phase outflow of every sector into
//! element-resolved end-of-life flows, re-uses what it can, recovers scrap, balances the scrap
//! market against manufacturing demand and finally fixes the composition of the cohort that
//! enters the stock. The composition of year `t` depends on the stockpile and the fabrication
//! scrap buffer of year `t - 1`, so years are solved strictly in order.

use crate::materials::{element_composition, MaterialCompositionResolver};
use crate::parameters::{ScenarioParameters, ScenarioSector};
use crate::scrap::reuse::{material_totals, reuse_sector};
use crate::scrap::{fabrication_scrap, recover_scrap, MarketInputs, ScrapMarketBalancer};
use crate::sectors::SectorStocks;
use log::{debug, info, warn};
use ndarray::{s, Array1, Array2, ArrayView2, Axis};
use recc_core::classification::Aspect;
use recc_core::errors::RECCResult;
use recc_core::system::{FlowId, FlowRegistry, MassBalance, StockId};

/// Everything the material cycle of a scenario pair produced.
#[derive(Debug, Clone)]
pub struct CycleOutcome {
    pub registry: FlowRegistry,
    pub compositions: MaterialCompositionResolver,
    /// Re-used mass without a consumption slot, `[t, m]`
    pub reuse_dropped: Array2<f64>,
    pub mass_balance: MassBalance,
}

/// Solves the material cycle of a scenario pair one model year at a time.
pub struct MaterialCycle<'a> {
    scenario: &'a ScenarioParameters<'a>,
    stocks: &'a SectorStocks,
    registry: FlowRegistry,
    resolver: MaterialCompositionResolver,
    market: ScrapMarketBalancer,
    reuse_dropped: Array2<f64>,
    /// The next model year to solve
    time_index: usize,
    n_materials: usize,
    n_waste: usize,
    n_goods: usize,
    remainder: usize,
}

impl<'a> MaterialCycle<'a> {
    /// Set up the cycle and record the in-use stock of the base year.
    pub fn new(scenario: &'a ScenarioParameters<'a>, stocks: &'a SectorStocks) -> RECCResult<Self> {
        let prepared = scenario.prepared;
        let classifications = &prepared.classifications;
        let time = *scenario.time();
        let n_materials = classifications.get(Aspect::Material)?.len();
        let n_waste = classifications.get(Aspect::WasteCategory)?.len();
        let n_elements = classifications.get(Aspect::Element)?.len();
        let n_goods = classifications.get(Aspect::Good)?.len();

        let mut cycle = Self {
            scenario,
            stocks,
            registry: FlowRegistry::new(classifications)?,
            resolver: MaterialCompositionResolver::new(
                time,
                prepared.composition_existing.view(),
            ),
            market: ScrapMarketBalancer::new(
                n_waste,
                n_materials,
                n_elements,
                prepared.config.scrap_export,
            ),
            reuse_dropped: Array2::zeros((time.n_years, n_materials)),
            time_index: 1,
            n_materials,
            n_waste,
            n_goods,
            remainder: prepared.remainder_element,
        };
        cycle.record_base_year()?;
        Ok(cycle)
    }

    pub fn current_year(&self) -> usize {
        self.time_index
    }

    /// The base year is seeded from historic cohorts and is not balanced.
    fn record_base_year(&mut self) -> RECCResult<()> {
        let time = *self.scenario.time();
        let c = time.cohort_index_for_year(0);
        let mut consumption = Array2::<f64>::zeros(self.resolver.in_use_composition(0).raw_dim());
        let mut outflow = consumption.clone();
        for (sector, flows) in self.scenario.sectors.iter().zip(self.stocks.sectors.iter()) {
            let entering = self.cohort_flows(sector, flows.inflow.index_axis(Axis(0), 0), c);
            consumption += &entering;
            outflow += &material_totals(&self.resolver.element_flows(
                sector,
                flows.outflow.index_axis(Axis(0), 0),
                0..c,
            ));
        }
        self.registry.set_flow(FlowId::F_6_7, 0, consumption.view())?;
        self.registry.set_flow(FlowId::F_7_8, 0, outflow.view())?;
        let stock = self.in_use_stock(0);
        self.registry.set_stock(StockId::S_7, 0, stock.view())?;
        Ok(())
    }

    /// Element-resolved material of the products of a single cohort, `[m, e]`.
    fn cohort_flows(
        &self,
        sector: &ScenarioSector,
        quantities: ArrayView2<f64>,
        c: usize,
    ) -> Array2<f64> {
        let mass = MaterialCompositionResolver::material_mass(sector, quantities, c);
        let by_material = mass.sum_axis(Axis(0)).sum_axis(Axis(0));
        let mut flows = self.resolver.in_use_composition(c).to_owned();
        for (mut row, amount) in flows.axis_iter_mut(Axis(0)).zip(by_material.iter()) {
            row.mapv_inplace(|v| v * amount);
        }
        flows
    }

    /// Element-resolved in-use stock of every sector in year `t`, `[m, e]`.
    fn in_use_stock(&self, t: usize) -> Array2<f64> {
        let c = self.scenario.time().cohort_index_for_year(t);
        let mut stock = Array2::<f64>::zeros(self.resolver.in_use_composition(0).raw_dim());
        for (sector, flows) in self.scenario.sectors.iter().zip(self.stocks.sectors.iter()) {
            stock += &material_totals(&self.resolver.element_flows(
                sector,
                flows.stock.index_axis(Axis(0), t),
                0..c + 1,
            ));
        }
        stock
    }

    /// Solve the current model year and advance to the next.
    pub fn step(&mut self) -> RECCResult<()> {
        let t = self.time_index;
        let scenario = self.scenario;
        let prepared = scenario.prepared;
        let time = *scenario.time();
        let c = time.cohort_index_for_year(t);
        let stocks = self.stocks;
        let (nm, nw, ng) = (self.n_materials, self.n_waste, self.n_goods);
        let ne = self.registry.n_elements();
        let zeros_me = || Array2::<f64>::zeros((nm, ne));

        // End of life and re-use
        let mut f_7_8 = zeros_me();
        let mut f_8_17 = zeros_me();
        let mut f_8_9 = zeros_me();
        let mut f_17_6 = zeros_me();
        let mut f_9_10 = Array2::<f64>::zeros((nw, ne));
        let mut consumption_by_good = Array2::<f64>::zeros((ng, nm));
        let mut reuse_by_good = Array2::<f64>::zeros((ng, nm));
        for (sector, flows) in scenario.sectors.iter().zip(stocks.sectors.iter()) {
            let outflow =
                self.resolver
                    .element_flows(sector, flows.outflow.index_axis(Axis(0), t), 0..c);
            let consumption = MaterialCompositionResolver::material_mass(
                sector,
                flows.inflow.index_axis(Axis(0), t),
                c,
            );
            let reuse = reuse_sector(
                &outflow,
                sector.reuse_rate.index_axis(Axis(0), t),
                &consumption,
            );

            f_7_8 += &material_totals(&outflow);
            f_8_17 += &material_totals(&reuse.reused);
            f_8_9 += &material_totals(&reuse.to_waste);
            f_17_6 += &material_totals(&reuse.to_consumption);
            f_9_10 += &recover_scrap(&reuse.to_waste, nw, |q, k, m, w| {
                sector.recovery.rate(t, q, k, m, w)
            });
            for (k, &g) in sector.goods.iter().enumerate() {
                for m in 0..nm {
                    consumption_by_good[[g, m]] += consumption.slice(s![.., k, m]).sum();
                    reuse_by_good[[g, m]] += reuse.to_consumption.slice(s![.., k, m, 0]).sum();
                }
            }
            let dropped = reuse.dropped.sum();
            if dropped.abs() > prepared.config.mass_balance_tolerance {
                warn!(
                    "{}: {:.4} Mt of re-use potential exceeded consumption in year {}",
                    sector.kind.key(),
                    dropped,
                    time.year_label(t)
                );
            }
            let mut dropped_row = self.reuse_dropped.row_mut(t);
            dropped_row += &reuse.dropped;
        }

        // Manufacturing demand
        let manufactured_by_good = &consumption_by_good - &reuse_by_good;
        let mut demand = Array1::<f64>::zeros(nm);
        let mut new_scrap = Array2::<f64>::zeros((nm, nw));
        for g in 0..ng {
            for m in 0..nm {
                let input = manufactured_by_good[[g, m]] * scenario.yield_inverse[[t, m, g]];
                if input == 0.0 {
                    continue;
                }
                demand[m] += input;
                for w in 0..nw {
                    new_scrap[[m, w]] += input * scenario.yield_loss[[t, m, w, g]];
                }
            }
        }

        // Scrap market
        let diversion = scenario.scrap_diversion.mapv(|v| v * scenario.scale_up[t]);
        let outcome = self.market.balance_year(MarketInputs {
            old_scrap: f_9_10.view(),
            demand: demand.view(),
            diversion: diversion.view(),
            remelting_yield: prepared.remelting_yield.view(),
            primary_composition: prepared.composition_primary.view(),
        });

        // Manufacturing and final consumption
        let input_composition =
            element_composition(outcome.manufacturing_input().view(), self.remainder);
        let manufactured = manufactured_by_good.sum_axis(Axis(0));
        let mut f_5_6 = input_composition.clone();
        for (mut row, amount) in f_5_6.axis_iter_mut(Axis(0)).zip(manufactured.iter()) {
            row.mapv_inplace(|v| v * amount);
        }
        let f_5_10 = fabrication_scrap(new_scrap.view(), input_composition.view());
        self.market.close_year(f_5_10.view());
        let f_6_7 = &f_5_6 + &f_17_6;
        let consumption_composition = element_composition(f_6_7.view(), self.remainder);
        self.resolver
            .record_cohort(c, input_composition.view(), consumption_composition.view());

        // Waste management closes with its losses
        let allocation = &outcome.allocation;
        let f_9_0 = f_8_9.sum_axis(Axis(0)) + outcome.scrap_use.sum_axis(Axis(0))
            - f_9_10.sum_axis(Axis(0))
            - outcome.secondary.sum_axis(Axis(0));
        let f_8_0 = zeros_me();
        let f_4_5 = outcome.primary.clone();

        let registry = &mut self.registry;
        registry.set_flow(FlowId::F_7_8, t, f_7_8.view())?;
        registry.set_flow(FlowId::F_8_0, t, f_8_0.view())?;
        registry.set_flow(FlowId::F_8_17, t, f_8_17.view())?;
        registry.set_flow(FlowId::F_17_6, t, f_17_6.view())?;
        registry.set_flow(FlowId::F_8_9, t, f_8_9.view())?;
        registry.set_flow(FlowId::F_9_10, t, f_9_10.view())?;
        registry.set_flow(FlowId::F_10_9, t, outcome.scrap_use.view())?;
        registry.set_flow(FlowId::F_10_12, t, outcome.diverted.view())?;
        registry.set_flow(FlowId::F_9_12, t, outcome.secondary.view())?;
        registry.set_flow_elements(FlowId::F_9_0, t, f_9_0.view())?;
        registry.set_flow(FlowId::F_12_5, t, allocation.secondary_consumption().view())?;
        registry.set_flow(FlowId::F_12_0, t, allocation.exported.view())?;
        registry.set_flow(FlowId::F_4_5, t, f_4_5.view())?;
        registry.set_flow(FlowId::F_3_4, t, f_4_5.view())?;
        registry.set_flow(FlowId::F_0_3, t, f_4_5.view())?;
        registry.set_flow(FlowId::F_5_6, t, f_5_6.view())?;
        registry.set_flow(FlowId::F_5_10, t, f_5_10.view())?;
        registry.set_flow(FlowId::F_6_7, t, f_6_7.view())?;

        // Stocks and their changes
        let s_7 = self.in_use_stock(t);
        self.set_stock_with_change(StockId::S_7, StockId::dS_7, t, s_7)?;
        self.set_stock_with_change(StockId::S_10, StockId::dS_10, t, f_5_10)?;
        let s_12 = self.market.stockpile().to_owned();
        self.set_stock_with_change(StockId::S_12, StockId::dS_12, t, s_12)?;
        let d_s_0 = &f_9_0 + &allocation.exported.sum_axis(Axis(0)) + &f_8_0.sum_axis(Axis(0))
            - f_4_5.sum_axis(Axis(0));
        self.registry
            .set_stock_elements(StockId::dS_0, t, d_s_0.view())?;

        debug!(
            "{}: manufacturing input {:.4}, primary {:.4}, secondary {:.4}, exported {:.4}",
            time.year_label(t),
            demand.sum(),
            allocation.primary.sum(),
            allocation.secondary_consumption().column(0).sum(),
            allocation.exported.column(0).sum()
        );

        self.time_index += 1;
        Ok(())
    }

    fn set_stock_with_change(
        &mut self,
        level: StockId,
        change: StockId,
        t: usize,
        values: Array2<f64>,
    ) -> RECCResult<()> {
        let delta = &values - &self.registry.stock_year(level, t - 1);
        self.registry.set_stock(level, t, values.view())?;
        self.registry.set_stock(change, t, delta.view())
    }

    /// Solve every remaining model year.
    pub fn run(&mut self) -> RECCResult<()> {
        while !self.finished() {
            self.step()?;
        }
        Ok(())
    }

    pub fn finished(&self) -> bool {
        self.time_index >= self.scenario.time().n_years
    }

    /// Check the process balances and hand over the results.
    pub fn finish(self) -> CycleOutcome {
        let tolerance = self.scenario.prepared.config.mass_balance_tolerance;
        let mass_balance = self.registry.mass_balance();
        let violations = mass_balance.violations(tolerance);
        if !violations.is_empty() {
            let (t, process, residual) = violations[0];
            warn!(
                "{} process balance(s) exceed {} Mt/yr, the first is process {} in year {} with {:.6}",
                violations.len(),
                tolerance,
                process,
                self.scenario.time().year_label(t),
                residual
            );
        }
        info!(
            "Material cycle of scenario pair ({}, {}) finished, largest residual {:.3e}",
            self.scenario.socioeconomic,
            self.scenario.climate_policy,
            mass_balance.max_abs()
        );
        CycleOutcome {
            registry: self.registry,
            compositions: self.resolver,
            reuse_dropped: self.reuse_dropped,
            mass_balance,
        }
    }
}
