//! Network inspection.

use anyhow::Context;
use hec_network::{Edge, NetworkTopology};
use log::info;

/// JSON summary of a network: nodes in connectivity order, the in-basin
/// links between them and every reach as read.
pub fn topology_json(topology: &NetworkTopology) -> serde_json::Value {
    let conn = topology.connectivity();
    let links: Vec<Edge> = conn
        .nodes()
        .iter()
        .flat_map(|from| {
            conn.downstream(*from)
                .into_iter()
                .map(move |to| Edge { from: *from, to })
        })
        .collect();
    serde_json::json!({
        "nodes": conn.nodes(),
        "links": links,
        "reaches": topology.edges(),
    })
}

pub fn run_topology(network: &str) -> anyhow::Result<()> {
    let topology = NetworkTopology::from_path(network)
        .with_context(|| format!("Failed to read network {}", network))?;
    info!("{} nodes in {}", topology.nodes().len(), network);
    println!("{}", serde_json::to_string_pretty(&topology_json(&topology))?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topology_json() {
        let topology = NetworkTopology::from_edges(&[(10, 20), (20, 30), (30, 0)]).unwrap();
        let json = topology_json(&topology);
        assert_eq!(json["nodes"], serde_json::json!([10, 20, 30]));
        assert_eq!(json["links"].as_array().unwrap().len(), 2);
        assert_eq!(json["links"][1], serde_json::json!({"from": 20, "to": 30}));
        assert_eq!(json["reaches"][2]["to"], 0);
    }
}
