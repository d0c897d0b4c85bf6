//! Graph-level structure metrics.

use std::collections::{HashSet, VecDeque};

use petgraph::unionfind::UnionFind;
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};

use crate::config::RankedNode;
use crate::graph::network::Network;
use crate::metrics::centrality::sample_sources;

/// `network_metrics.json` document.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NetworkMetrics {
    pub nodes: usize,
    pub edges: usize,
    pub density: f64,
    pub avg_degree: f64,
    pub avg_clustering: f64,
    pub connected_components: usize,
    pub largest_component: usize,
    /// Mean hop count between nodes of the largest component; absent when it
    /// has a single node or the network has no edges.
    pub avg_shortest_path: Option<f64>,
    /// Shortest-path sources used when the network was too large for exact
    /// betweenness and path length; absent when both are exact.
    #[serde(default)]
    pub path_sources: Option<usize>,
    pub total_weight: f64,
    #[serde(default)]
    pub modularity: Option<f64>,
    #[serde(default)]
    pub communities: Option<usize>,
    #[serde(default)]
    pub top_degree: Vec<RankedNode>,
    #[serde(default)]
    pub top_betweenness: Vec<RankedNode>,
}

impl NetworkMetrics {
    pub fn compute(net: &Network) -> Self {
        Self::compute_with(net, 0)
    }

    /// Like [`NetworkMetrics::compute`], but the average path length uses at
    /// most `max_sources` BFS sources (0 means every node).
    pub fn compute_with(net: &Network, max_sources: usize) -> Self {
        let components = connected_components(net);
        let largest = components.first().map(Vec::len).unwrap_or(0);
        let avg_shortest_path = if net.edge_count() > 0 && largest > 1 {
            let component = &components[0];
            let sources: Vec<usize> = sample_sources(component.len(), max_sources)
                .into_iter()
                .map(|i| component[i])
                .collect();
            Some(average_shortest_path_from(net, component, &sources))
        } else {
            None
        };
        let sampled = max_sources > 0 && net.node_count() > max_sources;
        Self {
            nodes: net.node_count(),
            edges: net.edge_count(),
            density: density(net),
            avg_degree: average_degree(net),
            avg_clustering: average_clustering(net),
            connected_components: components.len(),
            largest_component: largest,
            avg_shortest_path,
            path_sources: sampled.then_some(max_sources),
            total_weight: net.total_weight(),
            ..Default::default()
        }
    }
}

/// `2m / (n(n − 1))`, 0 below two nodes.
pub fn density(net: &Network) -> f64 {
    let n = net.node_count();
    if n < 2 {
        return 0.0;
    }
    2.0 * net.edge_count() as f64 / (n * (n - 1)) as f64
}

pub fn average_degree(net: &Network) -> f64 {
    let n = net.node_count();
    if n == 0 {
        return 0.0;
    }
    2.0 * net.edge_count() as f64 / n as f64
}

/// Mean of the unweighted local clustering coefficients; nodes with fewer
/// than two neighbours count as 0.
pub fn average_clustering(net: &Network) -> f64 {
    let n = net.node_count();
    if n == 0 {
        return 0.0;
    }
    let neighbours: Vec<HashSet<usize>> = net
        .adjacency()
        .into_iter()
        .map(|row| row.into_iter().map(|(j, _, _)| j).collect())
        .collect();

    let mut total = 0.0;
    for nbrs in &neighbours {
        let k = nbrs.len();
        if k < 2 {
            continue;
        }
        let mut links = 0usize;
        for &u in nbrs {
            links += neighbours[u].iter().filter(|v| nbrs.contains(v)).count();
        }
        // Each triangle edge seen from both ends
        let triangles = links / 2;
        total += 2.0 * triangles as f64 / (k * (k - 1)) as f64;
    }
    total / n as f64
}

/// Connected components as node positions, largest first (ties by lowest
/// position); members ascending.
pub fn connected_components(net: &Network) -> Vec<Vec<usize>> {
    let graph = net.inner_graph();
    let n = graph.node_count();
    let mut uf = UnionFind::<usize>::new(n);
    for e in graph.edge_references() {
        uf.union(e.source().index(), e.target().index());
    }

    let mut by_root: Vec<Option<usize>> = vec![None; n];
    let mut components: Vec<Vec<usize>> = Vec::new();
    for i in 0..n {
        let root = uf.find(i);
        match by_root[root] {
            Some(c) => components[c].push(i),
            None => {
                by_root[root] = Some(components.len());
                components.push(vec![i]);
            }
        }
    }
    components.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a[0].cmp(&b[0])));
    components
}

/// Mean BFS hop count over ordered pairs of `component`.
pub fn average_shortest_path(net: &Network, component: &[usize]) -> f64 {
    average_shortest_path_from(net, component, component)
}

/// Mean BFS hop count from each of `sources` to the rest of `component`.
pub fn average_shortest_path_from(net: &Network, component: &[usize], sources: &[usize]) -> f64 {
    let s = component.len();
    if s < 2 || sources.is_empty() {
        return 0.0;
    }
    let adj = net.adjacency();
    let mut dist: Vec<Option<usize>> = vec![None; adj.len()];
    let mut queue = VecDeque::new();
    let mut total = 0usize;

    for &src in sources {
        dist.fill(None);
        dist[src] = Some(0);
        queue.push_back(src);
        while let Some(v) = queue.pop_front() {
            let d = dist[v].unwrap_or(0);
            total += d;
            for &(w, _, _) in &adj[v] {
                if dist[w].is_none() {
                    dist[w] = Some(d + 1);
                    queue.push_back(w);
                }
            }
        }
    }
    total as f64 / (sources.len() * (s - 1)) as f64
}
