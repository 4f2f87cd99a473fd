//! The material system: processes, flows and stocks of one scenario run.
//!
//! Processes are the nodes of a [`petgraph`] graph and flows are its edges, so the balance of
//! a process is the sum over its incoming edges minus the sum over its outgoing edges minus
//! the stock changes resident at it.
//!
//! Flow and stock tensors are stored aggregated as `[t, x, e]`, where `x` is the material or
//! waste category axis of the flow (length one for flows without such an axis) and `e` is the
//! element axis. The cohort, region and product axes of the use phase are aggregated away
//! before a value is recorded.

use crate::classification::{Aspect, ClassificationSet};
use crate::errors::{RECCError, RECCResult};
use ndarray::{s, Array1, Array3, ArrayView1, ArrayView2, ArrayView3, Axis};
use petgraph::graph::NodeIndex;
use petgraph::visit::EdgeRef;
use petgraph::{Direction, Graph};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Processes of the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ProcessId {
    Environment = 0,
    Extraction = 1,
    Beneficiation = 2,
    PrimaryProduction = 3,
    PrimaryMaterialMarket = 4,
    Manufacturing = 5,
    FinalConsumption = 6,
    UsePhase = 7,
    EndOfLife = 8,
    WasteManagement = 9,
    ScrapMarket = 10,
    ScrapProcessing = 11,
    SecondaryMaterialMarket = 12,
    ElectricitySupply = 13,
    FuelSupply = 14,
    HeatSupply = 15,
    Forestry = 16,
    ReUse = 17,
}

impl ProcessId {
    pub const ALL: [ProcessId; 18] = [
        ProcessId::Environment,
        ProcessId::Extraction,
        ProcessId::Beneficiation,
        ProcessId::PrimaryProduction,
        ProcessId::PrimaryMaterialMarket,
        ProcessId::Manufacturing,
        ProcessId::FinalConsumption,
        ProcessId::UsePhase,
        ProcessId::EndOfLife,
        ProcessId::WasteManagement,
        ProcessId::ScrapMarket,
        ProcessId::ScrapProcessing,
        ProcessId::SecondaryMaterialMarket,
        ProcessId::ElectricitySupply,
        ProcessId::FuelSupply,
        ProcessId::HeatSupply,
        ProcessId::Forestry,
        ProcessId::ReUse,
    ];

    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:?})", self.index(), self)
    }
}

/// Endpoints and axes of a flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlowDescriptor {
    pub name: &'static str,
    pub source: ProcessId,
    pub sink: ProcessId,
    /// Material or waste-category axis, `None` for flows resolved by element only
    pub axis: Option<Aspect>,
}

/// The flows of the system, named after their source and sink process.
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FlowId {
    F_0_3,
    F_3_4,
    F_4_5,
    F_5_6,
    F_5_10,
    F_6_7,
    F_7_8,
    F_8_0,
    F_8_9,
    F_8_17,
    F_17_6,
    F_9_10,
    F_9_12,
    F_9_0,
    F_10_9,
    F_10_12,
    F_12_5,
    F_12_0,
}

impl FlowId {
    pub const ALL: [FlowId; 18] = [
        FlowId::F_0_3,
        FlowId::F_3_4,
        FlowId::F_4_5,
        FlowId::F_5_6,
        FlowId::F_5_10,
        FlowId::F_6_7,
        FlowId::F_7_8,
        FlowId::F_8_0,
        FlowId::F_8_9,
        FlowId::F_8_17,
        FlowId::F_17_6,
        FlowId::F_9_10,
        FlowId::F_9_12,
        FlowId::F_9_0,
        FlowId::F_10_9,
        FlowId::F_10_12,
        FlowId::F_12_5,
        FlowId::F_12_0,
    ];

    pub fn descriptor(&self) -> FlowDescriptor {
        use Aspect::{Material, WasteCategory};
        use ProcessId::*;
        let (name, source, sink, axis) = match self {
            FlowId::F_0_3 => ("ore input", Environment, PrimaryProduction, Some(Material)),
            FlowId::F_3_4 => (
                "primary material production",
                PrimaryProduction,
                PrimaryMaterialMarket,
                Some(Material),
            ),
            FlowId::F_4_5 => (
                "primary material consumption",
                PrimaryMaterialMarket,
                Manufacturing,
                Some(Material),
            ),
            FlowId::F_5_6 => (
                "manufacturing output",
                Manufacturing,
                FinalConsumption,
                Some(Material),
            ),
            FlowId::F_5_10 => ("new scrap", Manufacturing, ScrapMarket, Some(WasteCategory)),
            FlowId::F_6_7 => ("final consumption", FinalConsumption, UsePhase, Some(Material)),
            FlowId::F_7_8 => ("end-of-life products", UsePhase, EndOfLife, Some(Material)),
            FlowId::F_8_0 => (
                "obsolete stock formation",
                EndOfLife,
                Environment,
                Some(Material),
            ),
            FlowId::F_8_9 => (
                "waste management input",
                EndOfLife,
                WasteManagement,
                Some(Material),
            ),
            FlowId::F_8_17 => ("product re-use in", EndOfLife, ReUse, Some(Material)),
            FlowId::F_17_6 => ("product re-use out", ReUse, FinalConsumption, Some(Material)),
            FlowId::F_9_10 => ("old scrap", WasteManagement, ScrapMarket, Some(WasteCategory)),
            FlowId::F_9_12 => (
                "secondary material production",
                WasteManagement,
                SecondaryMaterialMarket,
                Some(Material),
            ),
            FlowId::F_9_0 => (
                "waste management and remelting losses",
                WasteManagement,
                Environment,
                None,
            ),
            FlowId::F_10_9 => ("scrap use", ScrapMarket, WasteManagement, Some(WasteCategory)),
            FlowId::F_10_12 => (
                "fabrication scrap diversion",
                ScrapMarket,
                SecondaryMaterialMarket,
                Some(Material),
            ),
            FlowId::F_12_5 => (
                "secondary material consumption",
                SecondaryMaterialMarket,
                Manufacturing,
                Some(Material),
            ),
            FlowId::F_12_0 => (
                "excess secondary material",
                SecondaryMaterialMarket,
                Environment,
                Some(Material),
            ),
        };
        FlowDescriptor {
            name,
            source,
            sink,
            axis,
        }
    }
}

impl fmt::Display for FlowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Whether a stock tensor holds levels or year-on-year changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StockKind {
    Level,
    Change,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockDescriptor {
    pub name: &'static str,
    pub process: ProcessId,
    pub kind: StockKind,
    pub axis: Option<Aspect>,
}

#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum StockId {
    S_7,
    dS_7,
    S_10,
    dS_10,
    S_12,
    dS_12,
    dS_0,
}

impl StockId {
    pub const ALL: [StockId; 7] = [
        StockId::S_7,
        StockId::dS_7,
        StockId::S_10,
        StockId::dS_10,
        StockId::S_12,
        StockId::dS_12,
        StockId::dS_0,
    ];

    pub fn descriptor(&self) -> StockDescriptor {
        use Aspect::{Material, WasteCategory};
        use ProcessId::*;
        use StockKind::*;
        let (name, process, kind, axis) = match self {
            StockId::S_7 => ("in-use stock", UsePhase, Level, Some(Material)),
            StockId::dS_7 => ("in-use stock change", UsePhase, Change, Some(Material)),
            StockId::S_10 => (
                "fabrication scrap buffer",
                ScrapMarket,
                Level,
                Some(WasteCategory),
            ),
            StockId::dS_10 => (
                "fabrication scrap buffer change",
                ScrapMarket,
                Change,
                Some(WasteCategory),
            ),
            StockId::S_12 => (
                "secondary material stockpile",
                SecondaryMaterialMarket,
                Level,
                Some(Material),
            ),
            StockId::dS_12 => (
                "secondary material stockpile change",
                SecondaryMaterialMarket,
                Change,
                Some(Material),
            ),
            StockId::dS_0 => ("system environment stock change", Environment, Change, None),
        };
        StockDescriptor {
            name,
            process,
            kind,
            axis,
        }
    }
}

impl fmt::Display for StockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Balance residuals of every process, `[t, process, e]`.
///
/// Year 0 is seeded from historic data and is not balanced; its residuals are zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MassBalance {
    pub residuals: Array3<f64>,
}

impl MassBalance {
    pub fn process(&self, process: ProcessId) -> ArrayView2<'_, f64> {
        self.residuals.index_axis(Axis(1), process.index())
    }

    /// Sum of absolute residuals of the total mass (element 0) per year.
    pub fn total_abs_by_year(&self) -> Array1<f64> {
        self.residuals
            .slice(s![.., .., 0])
            .map_axis(Axis(1), |lane| lane.iter().map(|v| v.abs()).sum())
    }

    pub fn max_abs(&self) -> f64 {
        self.residuals.iter().fold(0.0, |acc, v| acc.max(v.abs()))
    }

    /// Processes and years whose total-mass residual exceeds `tolerance`.
    pub fn violations(&self, tolerance: f64) -> Vec<(usize, ProcessId, f64)> {
        let mut found = Vec::new();
        for ((t, p), value) in self.residuals.slice(s![.., .., 0]).indexed_iter() {
            if value.abs() > tolerance {
                found.push((t, ProcessId::ALL[p], *value));
            }
        }
        found
    }
}

/// Typed registry of all flows and stocks of one scenario run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowRegistry {
    graph: Graph<ProcessId, FlowId>,
    nodes: Vec<NodeIndex>,
    flows: BTreeMap<FlowId, Array3<f64>>,
    stocks: BTreeMap<StockId, Array3<f64>>,
    n_years: usize,
    n_elements: usize,
}

impl FlowRegistry {
    /// Build the process graph and zero-initialise every flow and stock.
    pub fn new(classifications: &ClassificationSet) -> RECCResult<Self> {
        let n_years = classifications.time().n_years;
        let n_elements = classifications.get(Aspect::Element)?.len();
        let axis_len = |axis: Option<Aspect>| -> RECCResult<usize> {
            match axis {
                Some(aspect) => Ok(classifications.get(aspect)?.len()),
                None => Ok(1),
            }
        };

        let mut graph = Graph::new();
        let nodes = ProcessId::ALL
            .iter()
            .map(|p| graph.add_node(*p))
            .collect::<Vec<_>>();

        let mut flows = BTreeMap::new();
        for id in FlowId::ALL {
            let descriptor = id.descriptor();
            graph.add_edge(
                nodes[descriptor.source.index()],
                nodes[descriptor.sink.index()],
                id,
            );
            flows.insert(
                id,
                Array3::zeros((n_years, axis_len(descriptor.axis)?, n_elements)),
            );
        }

        let mut stocks = BTreeMap::new();
        for id in StockId::ALL {
            stocks.insert(
                id,
                Array3::zeros((n_years, axis_len(id.descriptor().axis)?, n_elements)),
            );
        }

        Ok(Self {
            graph,
            nodes,
            flows,
            stocks,
            n_years,
            n_elements,
        })
    }

    pub fn n_years(&self) -> usize {
        self.n_years
    }

    pub fn n_elements(&self) -> usize {
        self.n_elements
    }

    pub fn flow(&self, id: FlowId) -> ArrayView3<'_, f64> {
        self.flows[&id].view()
    }

    pub fn flow_year(&self, id: FlowId, t: usize) -> ArrayView2<'_, f64> {
        self.flows[&id].index_axis(Axis(0), t)
    }

    /// Record the values of a flow in year `t`, `[x, e]`.
    pub fn set_flow(&mut self, id: FlowId, t: usize, values: ArrayView2<f64>) -> RECCResult<()> {
        let target = self
            .flows
            .get_mut(&id)
            .ok_or_else(|| RECCError::Error(format!("flow {} is not registered", id)))?;
        let mut slot = target.index_axis_mut(Axis(0), t);
        if slot.shape() != values.shape() {
            return Err(RECCError::ShapeMismatch {
                name: id.to_string(),
                structure: "x,e".to_string(),
                expected: slot.shape().to_vec(),
                found: values.shape().to_vec(),
            });
        }
        slot.assign(&values);
        Ok(())
    }

    /// Record a flow without material or waste axis, `[e]`.
    pub fn set_flow_elements(
        &mut self,
        id: FlowId,
        t: usize,
        values: ArrayView1<f64>,
    ) -> RECCResult<()> {
        self.set_flow(id, t, values.insert_axis(Axis(0)))
    }

    pub fn stock(&self, id: StockId) -> ArrayView3<'_, f64> {
        self.stocks[&id].view()
    }

    pub fn stock_year(&self, id: StockId, t: usize) -> ArrayView2<'_, f64> {
        self.stocks[&id].index_axis(Axis(0), t)
    }

    pub fn set_stock(&mut self, id: StockId, t: usize, values: ArrayView2<f64>) -> RECCResult<()> {
        let target = self
            .stocks
            .get_mut(&id)
            .ok_or_else(|| RECCError::Error(format!("stock {} is not registered", id)))?;
        let mut slot = target.index_axis_mut(Axis(0), t);
        if slot.shape() != values.shape() {
            return Err(RECCError::ShapeMismatch {
                name: id.to_string(),
                structure: "x,e".to_string(),
                expected: slot.shape().to_vec(),
                found: values.shape().to_vec(),
            });
        }
        slot.assign(&values);
        Ok(())
    }

    pub fn set_stock_elements(
        &mut self,
        id: StockId,
        t: usize,
        values: ArrayView1<f64>,
    ) -> RECCResult<()> {
        self.set_stock(id, t, values.insert_axis(Axis(0)))
    }

    /// Flows entering (`Incoming`) or leaving (`Outgoing`) a process.
    pub fn flows_at(&self, process: ProcessId, direction: Direction) -> Vec<FlowId> {
        self.graph
            .edges_directed(self.nodes[process.index()], direction)
            .map(|edge| *edge.weight())
            .collect()
    }

    /// Inflows minus outflows minus stock changes of `process` in year `t`, by element.
    pub fn process_balance(&self, process: ProcessId, t: usize) -> Array1<f64> {
        let mut balance = Array1::<f64>::zeros(self.n_elements);
        for id in self.flows_at(process, Direction::Incoming) {
            balance += &self.flow_year(id, t).sum_axis(Axis(0));
        }
        for id in self.flows_at(process, Direction::Outgoing) {
            balance -= &self.flow_year(id, t).sum_axis(Axis(0));
        }
        for id in StockId::ALL {
            let descriptor = id.descriptor();
            if descriptor.process == process && descriptor.kind == StockKind::Change {
                balance -= &self.stock_year(id, t).sum_axis(Axis(0));
            }
        }
        balance
    }

    /// Balance residuals of every process in every model year after the base year.
    pub fn mass_balance(&self) -> MassBalance {
        let mut residuals =
            Array3::<f64>::zeros((self.n_years, ProcessId::ALL.len(), self.n_elements));
        for t in 1..self.n_years {
            for process in ProcessId::ALL {
                residuals
                    .slice_mut(s![t, process.index(), ..])
                    .assign(&self.process_balance(process, t));
            }
        }
        MassBalance { residuals }
    }
}
