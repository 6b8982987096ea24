use hec_core::farm::WaterUser;
use hec_core::{CouplingError, FarmId, Node, Result};
use log::{info, warn};
use std::collections::{HashMap, HashSet};

/// Which farm diverts from which node.
///
/// Rows follow the connectivity order of the network, columns the order of
/// the farm list. A cell either refers to the farm of its column or is
/// empty; a farm occupies exactly one row, the row of its source node. Farms
/// whose source node is not part of the network occupy no row.
#[derive(Debug)]
pub struct FarmNodeMatrix<'a, F> {
    nodes: Vec<Node>,
    farms: &'a [F],
    farm_row: Vec<Option<usize>>,
}

impl<'a, F: WaterUser> FarmNodeMatrix<'a, F> {
    /// Attach every farm to the row of its source node.
    ///
    /// Fails with `DuplicateFarmId` when two farms share an id and, unless
    /// `allow_shared_nodes`, with `DuplicateFarmNode` when two farms share a
    /// source node.
    pub fn build(nodes: &[Node], farms: &'a [F], allow_shared_nodes: bool) -> Result<Self> {
        let index: HashMap<Node, usize> = nodes.iter().enumerate().map(|(i, n)| (*n, i)).collect();
        let mut seen_ids: HashSet<FarmId> = HashSet::new();
        let mut first_on_node: HashMap<Node, FarmId> = HashMap::new();
        let mut farm_row = Vec::with_capacity(farms.len());

        for farm in farms {
            if !seen_ids.insert(farm.id()) {
                return Err(CouplingError::DuplicateFarmId(farm.id()));
            }
            let row = index.get(&farm.source_id()).copied();
            match row {
                Some(_) => {
                    if let Some(&first) = first_on_node.get(&farm.source_id()) {
                        if !allow_shared_nodes {
                            return Err(CouplingError::DuplicateFarmNode {
                                node: farm.source_id(),
                                first,
                                second: farm.id(),
                            });
                        }
                    } else {
                        first_on_node.insert(farm.source_id(), farm.id());
                    }
                }
                None => warn!(
                    "water user {} diverts from node {} which is not in the network",
                    farm.id(),
                    farm.source_id()
                ),
            }
            farm_row.push(row);
        }

        let matrix = FarmNodeMatrix {
            nodes: nodes.to_vec(),
            farms,
            farm_row,
        };
        info!(
            "attached {} of {} water users to {} nodes",
            matrix.attached().count(),
            farms.len(),
            first_on_node.len()
        );
        Ok(matrix)
    }

    /// Node ids in row order.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// All farms in column order, attached or not.
    pub fn farms(&self) -> &'a [F] {
        self.farms
    }

    pub fn farm_ids(&self) -> Vec<FarmId> {
        self.farms.iter().map(|f| f.id()).collect()
    }

    /// (rows, columns)
    pub fn dim(&self) -> (usize, usize) {
        (self.nodes.len(), self.farms.len())
    }

    /// The farm in cell (row, col), if that farm diverts from that row's node.
    pub fn cell(&self, row: usize, col: usize) -> Option<&'a F> {
        match self.farm_row.get(col) {
            Some(Some(r)) if *r == row => Some(&self.farms[col]),
            _ => None,
        }
    }

    /// Row of the farm in column `col`.
    pub fn row_of(&self, col: usize) -> Option<usize> {
        self.farm_row.get(col).copied().flatten()
    }

    /// Attached farms as (row, col, farm), in column order.
    pub fn attached(&self) -> impl Iterator<Item = (usize, usize, &'a F)> + '_ {
        let farms = self.farms;
        self.farm_row
            .iter()
            .enumerate()
            .filter_map(move |(col, row)| row.map(|r| (r, col, &farms[col])))
    }

    /// Farms diverting from `node`.
    pub fn farms_at(&self, node: Node) -> Vec<&'a F> {
        match self.nodes.iter().position(|n| *n == node) {
            Some(row) => self
                .attached()
                .filter(|(r, _, _)| *r == row)
                .map(|(_, _, f)| f)
                .collect(),
            None => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hec_core::farm::Farm;

    fn farm(id: FarmId, source_id: Node) -> Farm {
        Farm {
            id,
            name: format!("farm {}", id),
            source_id,
            crop_id: vec![],
            irr_eff: vec![],
            irr: vec![],
            crop_start_date: None,
            crop_cover_date: None,
            crop_end_date: None,
            watersim: None,
        }
    }

    #[test]
    fn test_each_farm_in_exactly_one_row() {
        let farms = vec![farm(1, 10), farm(2, 30), farm(3, 10)];
        let matrix = FarmNodeMatrix::build(&[10, 20, 30], &farms, true).unwrap();
        assert_eq!(matrix.dim(), (3, 3));
        for col in 0..3 {
            let rows: Vec<usize> = (0..3).filter(|r| matrix.cell(*r, col).is_some()).collect();
            assert_eq!(rows.len(), 1);
        }
        assert_eq!(matrix.cell(0, 0).map(|f| f.id), Some(1));
        assert_eq!(matrix.cell(2, 1).map(|f| f.id), Some(2));
        assert!(matrix.cell(1, 1).is_none());
        assert_eq!(matrix.farms_at(10).iter().map(|f| f.id).collect::<Vec<_>>(), vec![1, 3]);
        assert!(matrix.farms_at(20).is_empty());
    }

    #[test]
    fn test_farm_off_network_is_unattached() {
        let farms = vec![farm(1, 10), farm(2, 99)];
        let matrix = FarmNodeMatrix::build(&[10, 20], &farms, true).unwrap();
        assert_eq!(matrix.row_of(1), None);
        assert_eq!(matrix.attached().count(), 1);
        assert_eq!(matrix.farm_ids(), vec![1, 2]);
    }

    #[test]
    fn test_shared_node_rejected_when_disabled() {
        let farms = vec![farm(1, 10), farm(2, 10)];
        match FarmNodeMatrix::build(&[10], &farms, false) {
            Err(CouplingError::DuplicateFarmNode { node, first, second }) => {
                assert_eq!((node, first, second), (10, 1, 2));
            }
            other => panic!("expected DuplicateFarmNode, got {:?}", other),
        }
    }

    #[test]
    fn test_duplicate_farm_id_rejected() {
        let farms = vec![farm(1, 10), farm(1, 20)];
        assert!(matches!(
            FarmNodeMatrix::build(&[10, 20], &farms, true),
            Err(CouplingError::DuplicateFarmId(1))
        ));
    }
}
