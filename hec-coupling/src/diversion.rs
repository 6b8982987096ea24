//! Diversions per node and farm for one date, and node time series of them.

use chrono::NaiveDate;
use hec_core::{FarmId, Node, Result};
use hec_utils::dates::format_series_date;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::BufWriter;
use std::path::Path;

/// Water diverted on one date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiversionTable {
    pub date: NaiveDate,
    /// Node ids in connectivity order
    pub nodes: Vec<Node>,
    /// Farm ids in column order
    pub farm_ids: Vec<FarmId>,
    /// Total diverted at each node
    pub node_totals: Vec<f64>,
    /// Diverted per node (rows) and farm (columns)
    pub node_farm: Array2<f64>,
    /// Diverted per crop, for each attached farm
    pub per_crop: BTreeMap<FarmId, Vec<f64>>,
}

impl DiversionTable {
    /// Total diverted at `node`, or `None` if the node is not in the network.
    pub fn node_total(&self, node: Node) -> Option<f64> {
        self.nodes
            .iter()
            .position(|n| *n == node)
            .map(|row| self.node_totals[row])
    }

    /// Total diverted by `farm_id` over all its crops.
    pub fn farm_total(&self, farm_id: FarmId) -> Option<f64> {
        self.farm_ids
            .iter()
            .position(|f| *f == farm_id)
            .map(|col| self.node_farm.column(col).sum())
    }

    pub fn crop_diversions(&self, farm_id: FarmId) -> Option<&[f64]> {
        self.per_crop.get(&farm_id).map(Vec::as_slice)
    }

    /// Total diverted over the whole network.
    pub fn total(&self) -> f64 {
        self.node_totals.iter().sum()
    }
}

/// One dated value of a node series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatedDiversion {
    /// `YYYY/MM/DD`
    pub date: String,
    pub diversion: f64,
}

/// Diversions of one node over time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSeries {
    pub id: Node,
    pub dates: Vec<DatedDiversion>,
}

/// The `{ "nodes": [...] }` document written for downstream tools.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSeriesDocument {
    pub nodes: Vec<NodeSeries>,
}

/// Node totals of consecutive diversion tables.
#[derive(Debug, Clone, PartialEq)]
pub struct DiversionSeries {
    nodes: Vec<Node>,
    dates: Vec<NaiveDate>,
    // one row of node totals per date
    totals: Vec<Vec<f64>>,
}

impl DiversionSeries {
    pub(crate) fn new(nodes: Vec<Node>) -> Self {
        DiversionSeries {
            nodes,
            dates: Vec::new(),
            totals: Vec::new(),
        }
    }

    /// Tables must come from the allocator that created the series, so their
    /// node order matches.
    pub(crate) fn push(&mut self, table: &DiversionTable) {
        debug_assert_eq!(table.nodes, self.nodes);
        self.dates.push(table.date);
        self.totals.push(table.node_totals.clone());
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Diversions of `node`, one per date.
    pub fn series(&self, node: Node) -> Option<Vec<f64>> {
        let row = self.nodes.iter().position(|n| *n == node)?;
        Some(self.totals.iter().map(|t| t[row]).collect())
    }

    pub fn to_document(&self) -> NodeSeriesDocument {
        let nodes = self
            .nodes
            .iter()
            .enumerate()
            .map(|(row, id)| NodeSeries {
                id: *id,
                dates: self
                    .dates
                    .iter()
                    .zip(&self.totals)
                    .map(|(date, totals)| DatedDiversion {
                        date: format_series_date(date),
                        diversion: totals[row],
                    })
                    .collect(),
            })
            .collect();
        NodeSeriesDocument { nodes }
    }

    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = std::fs::File::create(path.as_ref())?;
        serde_json::to_writer_pretty(BufWriter::new(file), &self.to_document())?;
        log::info!(
            "wrote {} days of diversions for {} nodes to {}",
            self.dates.len(),
            self.nodes.len(),
            path.as_ref().display()
        );
        Ok(())
    }
}
