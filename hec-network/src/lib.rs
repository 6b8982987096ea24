//! River network connectivity derived from reach geometry.
//!
//! Each reach feature carries integer `FROM_NODE` / `TO_NODE` properties.
//! The connectivity matrix is square over the distinct `FROM_NODE` ids, in
//! the order they are first seen, and entry (i, j) is 1 when water flows from
//! node i directly to node j. Reaches draining to node `0` leave the basin
//! and never produce a matrix entry.

use hec_core::feature::{read_features, read_features_str, Feature};
use hec_core::{CouplingError, Node, Result, OUTSIDE_BASIN};
use log::{debug, info, warn};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Property holding the upstream node of a reach.
pub const FROM_NODE_FIELD: &str = "FROM_NODE";

/// Property holding the downstream node of a reach.
pub const TO_NODE_FIELD: &str = "TO_NODE";

/// A directed reach between two nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub from: Node,
    pub to: Node,
}

impl From<(Node, Node)> for Edge {
    fn from((from, to): (Node, Node)) -> Self {
        Edge { from, to }
    }
}

/// Square {0, 1} flow matrix over the network's from-nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectivityMatrix {
    nodes: Vec<Node>,
    index: HashMap<Node, usize>,
    matrix: Array2<u8>,
}

impl ConnectivityMatrix {
    /// Build the matrix from an edge list.
    ///
    /// Edges to the outside-basin sentinel, self loops and edges into a node
    /// that never appears as a from-node are not representable and are
    /// dropped; only the last two are logged.
    pub fn build(edges: &[Edge]) -> Result<Self> {
        if edges.is_empty() {
            return Err(CouplingError::MalformedNetwork(
                "edge list is empty".to_string(),
            ));
        }

        let mut nodes: Vec<Node> = Vec::new();
        let mut index: HashMap<Node, usize> = HashMap::new();
        for edge in edges {
            if edge.from == OUTSIDE_BASIN {
                return Err(CouplingError::MalformedNetwork(format!(
                    "reach {} -> {} starts outside the basin",
                    edge.from, edge.to
                )));
            }
            index.entry(edge.from).or_insert_with(|| {
                nodes.push(edge.from);
                nodes.len() - 1
            });
        }

        let n = nodes.len();
        let mut matrix = Array2::<u8>::zeros((n, n));
        let mut outlets = 0usize;
        for edge in edges {
            if edge.to == OUTSIDE_BASIN {
                outlets += 1;
                continue;
            }
            if edge.to == edge.from {
                warn!("dropping self loop at node {}", edge.from);
                continue;
            }
            match index.get(&edge.to) {
                Some(&j) => matrix[[index[&edge.from], j]] = 1,
                None => warn!(
                    "dropping reach {} -> {}: node {} has no outgoing reach",
                    edge.from, edge.to, edge.to
                ),
            }
        }
        debug!("{} reaches drain out of the basin", outlets);

        Ok(ConnectivityMatrix {
            nodes,
            index,
            matrix,
        })
    }

    /// Node ids in row/column order.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Row/column of a node.
    pub fn index_of(&self, node: Node) -> Option<usize> {
        self.index.get(&node).copied()
    }

    /// True when water flows from `from` directly to `to`.
    pub fn is_connected(&self, from: Node, to: Node) -> bool {
        match (self.index_of(from), self.index_of(to)) {
            (Some(i), Some(j)) => self.matrix[[i, j]] == 1,
            _ => false,
        }
    }

    /// Nodes receiving water directly from `node`.
    pub fn downstream(&self, node: Node) -> Vec<Node> {
        self.index_of(node)
            .map(|i| {
                self.matrix
                    .row(i)
                    .iter()
                    .zip(&self.nodes)
                    .filter(|(v, _)| **v == 1)
                    .map(|(_, n)| *n)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Nodes draining directly into `node`.
    pub fn upstream(&self, node: Node) -> Vec<Node> {
        self.index_of(node)
            .map(|j| {
                self.matrix
                    .column(j)
                    .iter()
                    .zip(&self.nodes)
                    .filter(|(v, _)| **v == 1)
                    .map(|(_, n)| *n)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Number of in-basin reaches leaving `node`.
    pub fn out_degree(&self, node: Node) -> usize {
        self.index_of(node)
            .map(|i| self.matrix.row(i).iter().map(|v| *v as usize).sum())
            .unwrap_or(0)
    }

    pub fn as_array(&self) -> &Array2<u8> {
        &self.matrix
    }
}

/// The parsed stream network: its reaches, their source features and the
/// connectivity matrix built from them.
#[derive(Debug, Clone)]
pub struct NetworkTopology {
    edges: Vec<Edge>,
    features: Vec<Feature>,
    conn: ConnectivityMatrix,
}

impl NetworkTopology {
    /// Build from bare (from, to) pairs. No per-reach attributes are kept.
    pub fn from_edges(edges: &[(Node, Node)]) -> Result<Self> {
        let edges: Vec<Edge> = edges.iter().copied().map(Edge::from).collect();
        let conn = ConnectivityMatrix::build(&edges)?;
        Ok(NetworkTopology {
            edges,
            features: Vec::new(),
            conn,
        })
    }

    /// Build from reach features carrying `FROM_NODE` and `TO_NODE`.
    pub fn from_features(features: Vec<Feature>) -> Result<Self> {
        let edges = features
            .iter()
            .enumerate()
            .map(|(i, f)| {
                match (f.int_property(FROM_NODE_FIELD), f.int_property(TO_NODE_FIELD)) {
                    (Some(from), Some(to)) => Ok(Edge { from, to }),
                    _ => Err(CouplingError::MalformedNetwork(format!(
                        "reach {} lacks an integer {} or {}",
                        i, FROM_NODE_FIELD, TO_NODE_FIELD
                    ))),
                }
            })
            .collect::<Result<Vec<Edge>>>()?;
        let conn = ConnectivityMatrix::build(&edges)?;
        info!(
            "parsed network with {} reaches and {} nodes",
            edges.len(),
            conn.len()
        );
        Ok(NetworkTopology {
            edges,
            features,
            conn,
        })
    }

    pub fn from_geojson_str(geojson: &str) -> Result<Self> {
        Self::from_features(read_features_str(geojson)?)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_features(read_features(path)?)
    }

    pub fn connectivity(&self) -> &ConnectivityMatrix {
        &self.conn
    }

    /// Node ids in connectivity order.
    pub fn nodes(&self) -> &[Node] {
        self.conn.nodes()
    }

    /// Reaches in input order, outlets included.
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Value of property `param` for every reach, in input order.
    ///
    /// Fails with `MissingField` on the first reach lacking it. A network
    /// built from bare edges has no attributes and yields an empty list.
    pub fn get_parameter(&self, param: &str) -> Result<Vec<serde_json::Value>> {
        self.features
            .iter()
            .enumerate()
            .map(|(index, f)| {
                f.property(param)
                    .cloned()
                    .ok_or_else(|| CouplingError::MissingField {
                        field: param.to_string(),
                        index,
                    })
            })
            .collect()
    }
}
