//! Node centrality: degree and betweenness, plus top-k rankings.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use petgraph::graph::NodeIndex;

use crate::config::RankedNode;
use crate::graph::network::Network;

/// Tolerance when comparing accumulated path lengths.
const PATH_EPS: f64 = 1e-12;

/// Centrality scores indexed by node position.
#[derive(Debug, Clone, Default)]
pub struct Centrality {
    pub degree: Vec<f64>,
    pub betweenness: Vec<f64>,
}

impl Centrality {
    pub fn compute(net: &Network) -> Self {
        Self::compute_with(net, 0)
    }

    /// Like [`Centrality::compute`], but betweenness is estimated from at
    /// most `max_sources` shortest-path sources (0 means every node).
    pub fn compute_with(net: &Network, max_sources: usize) -> Self {
        let sources = sample_sources(net.node_count(), max_sources);
        Self {
            degree: degree_centrality(net),
            betweenness: betweenness_from_sources(net, &sources),
        }
    }

    pub fn top_degree(&self, net: &Network, k: usize) -> Vec<RankedNode> {
        top_k(net, &self.degree, k)
    }

    pub fn top_betweenness(&self, net: &Network, k: usize) -> Vec<RankedNode> {
        top_k(net, &self.betweenness, k)
    }
}

/// `degree / (n − 1)`; every node of a single-node network scores 1.
pub fn degree_centrality(net: &Network) -> Vec<f64> {
    let n = net.node_count();
    if n <= 1 {
        return vec![1.0; n];
    }
    let graph = net.inner_graph();
    let scale = 1.0 / (n - 1) as f64;
    graph
        .node_indices()
        .map(|idx| graph.edges(idx).count() as f64 * scale)
        .collect()
}

#[derive(Debug, Clone, Copy)]
struct Pending {
    dist: f64,
    node: usize,
}

impl PartialEq for Pending {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Pending {}

impl PartialOrd for Pending {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Pending {
    // Reversed so BinaryHeap pops the shortest distance first
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .dist
            .total_cmp(&self.dist)
            .then_with(|| other.node.cmp(&self.node))
    }
}

/// Positions `0..n`, or `limit` of them evenly spaced when `n` exceeds a
/// non-zero `limit`.
pub fn sample_sources(n: usize, limit: usize) -> Vec<usize> {
    if limit == 0 || n <= limit {
        return (0..n).collect();
    }
    (0..limit).map(|i| i * n / limit).collect()
}

/// Brandes betweenness with edge `distance` as path length, normalized by
/// `1 / ((n − 1)(n − 2))`. Networks with two nodes or fewer score 0.
pub fn betweenness_centrality(net: &Network) -> Vec<f64> {
    let all: Vec<usize> = (0..net.node_count()).collect();
    betweenness_from_sources(net, &all)
}

/// Brandes accumulation from `sources` only. With fewer sources than nodes
/// the scores are scaled by `n / sources` and capped at 1.
///
/// Edge distances are positive (see [`Network::insert_edge`]), so a settled
/// node never gains another shortest path.
pub fn betweenness_from_sources(net: &Network, sources: &[usize]) -> Vec<f64> {
    let n = net.node_count();
    let mut cb = vec![0.0; n];
    if n <= 2 || sources.is_empty() {
        return cb;
    }
    let adj = net.adjacency();

    let mut dist = vec![f64::INFINITY; n];
    let mut sigma = vec![0.0f64; n];
    let mut preds: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut delta = vec![0.0f64; n];
    let mut settled = vec![false; n];
    let mut order: Vec<usize> = Vec::with_capacity(n);
    let mut heap = BinaryHeap::new();

    for &s in sources {
        dist.fill(f64::INFINITY);
        sigma.fill(0.0);
        delta.fill(0.0);
        settled.fill(false);
        preds.iter_mut().for_each(Vec::clear);
        order.clear();

        dist[s] = 0.0;
        sigma[s] = 1.0;
        heap.push(Pending { dist: 0.0, node: s });

        while let Some(Pending { dist: d, node: v }) = heap.pop() {
            if settled[v] {
                continue;
            }
            settled[v] = true;
            order.push(v);
            for &(w, _, len) in &adj[v] {
                if settled[w] {
                    continue;
                }
                let alt = d + len;
                if alt < dist[w] - PATH_EPS {
                    dist[w] = alt;
                    sigma[w] = sigma[v];
                    preds[w].clear();
                    preds[w].push(v);
                    heap.push(Pending { dist: alt, node: w });
                } else if (alt - dist[w]).abs() <= PATH_EPS {
                    sigma[w] += sigma[v];
                    preds[w].push(v);
                }
            }
        }

        while let Some(w) = order.pop() {
            for &v in &preds[w] {
                delta[v] += sigma[v] / sigma[w] * (1.0 + delta[w]);
            }
            if w != s {
                cb[w] += delta[w];
            }
        }
    }

    // Each unordered pair was counted from both ends
    let mut scale = 1.0 / ((n - 1) * (n - 2)) as f64;
    let sampled = sources.len() < n;
    if sampled {
        scale *= n as f64 / sources.len() as f64;
    }
    for c in cb.iter_mut() {
        *c *= scale;
        if sampled {
            *c = c.min(1.0);
        }
    }
    cb
}

/// The `k` highest `scores`, ties broken by node id.
pub fn top_k(net: &Network, scores: &[f64], k: usize) -> Vec<RankedNode> {
    let graph = net.inner_graph();
    let mut ranked: Vec<(usize, f64)> = scores.iter().copied().enumerate().collect();
    ranked.sort_by(|a, b| {
        b.1.total_cmp(&a.1)
            .then_with(|| graph[NodeIndex::new(a.0)].id.cmp(&graph[NodeIndex::new(b.0)].id))
    });
    ranked
        .into_iter()
        .take(k)
        .map(|(i, score)| {
            let node = net.node_at(NodeIndex::new(i));
            RankedNode {
                id: node.id.clone(),
                label: node.label.clone(),
                score,
            }
        })
        .collect()
}
