//! Comma-separated tables under `data/`.

use std::path::Path;

use serde::Serialize;

use crate::error::{PipelineError, Result};
use crate::graph::network::Network;
use crate::metrics::centrality::Centrality;

/// Per-node row of `nodes.csv`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NodeRow {
    pub id: String,
    pub label: String,
    pub kind: String,
    pub uf: String,
    pub value: f64,
    pub degree: usize,
    pub degree_centrality: f64,
    pub betweenness: f64,
    pub community: Option<usize>,
}

/// One row per node, in network order.
pub fn node_rows(net: &Network, centrality: &Centrality) -> Vec<NodeRow> {
    let graph = net.inner_graph();
    graph
        .node_indices()
        .map(|idx| {
            let node = &graph[idx];
            let i = idx.index();
            NodeRow {
                id: node.id.clone(),
                label: node.label.clone(),
                kind: node.kind.as_str().to_string(),
                uf: node.uf.clone().unwrap_or_default(),
                value: node.value,
                degree: graph.edges(idx).count(),
                degree_centrality: centrality.degree.get(i).copied().unwrap_or(0.0),
                betweenness: centrality.betweenness.get(i).copied().unwrap_or(0.0),
                community: node.community,
            }
        })
        .collect()
}

/// Write `rows` with a header row derived from the field names.
pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| PipelineError::io(parent, e))?;
    }
    let mut writer = csv::Writer::from_path(path).map_err(|e| PipelineError::csv(path, e))?;
    for row in rows {
        writer
            .serialize(row)
            .map_err(|e| PipelineError::csv(path, e))?;
    }
    writer.flush().map_err(|e| PipelineError::io(path, e))?;
    log::debug!("wrote {} rows to {}", rows.len(), path.display());
    Ok(())
}
