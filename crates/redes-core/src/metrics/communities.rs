//! Community detection via the Louvain algorithm.
//!
//! Pure Rust implementation over the network's weighted adjacency.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::config::Community;
use crate::graph::network::Network;

// ---------------------------------------------------------------------------
// Public entry point
// ---------------------------------------------------------------------------

/// Partition found by [`detect_communities`].
#[derive(Debug, Clone, Serialize)]
pub struct Partition {
    /// Ordered by size, largest first.
    pub communities: Vec<Community>,
    pub modularity: f64,
}

impl Partition {
    pub fn len(&self) -> usize {
        self.communities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.communities.is_empty()
    }

    /// Sizes of the communities, largest first.
    pub fn sizes(&self) -> Vec<usize> {
        self.communities.iter().map(|c| c.members.len()).collect()
    }
}

/// Run Louvain on `net`, store each node's community number on the node and
/// return the numbered communities.
///
/// Community `i` is the i-th largest (ties by smallest member id); isolated
/// nodes end up as singletons. The label of a community is the label of its
/// member with the highest weighted degree.
pub fn detect_communities(net: &mut Network, resolution: f64) -> Partition {
    let adj = AdjList::from_network(net);
    if adj.nodes.is_empty() {
        return Partition {
            communities: Vec::new(),
            modularity: 0.0,
        };
    }

    let mut groups = louvain(&adj, resolution);
    for group in groups.iter_mut() {
        group.sort_by(|a, b| adj.nodes[*a].cmp(&adj.nodes[*b]));
    }
    groups.sort_by(|a, b| {
        b.len()
            .cmp(&a.len())
            .then_with(|| adj.nodes[a[0]].cmp(&adj.nodes[b[0]]))
    });

    let modularity = modularity(&adj, &groups, resolution);

    let mut communities = Vec::with_capacity(groups.len());
    for (i, members) in groups.iter().enumerate() {
        let label = members
            .iter()
            .copied()
            .max_by(|&a, &b| {
                adj.strength(a)
                    .total_cmp(&adj.strength(b))
                    .then_with(|| adj.nodes[b].cmp(&adj.nodes[a]))
            })
            .and_then(|idx| net.node(&adj.nodes[idx]))
            .map(|n| n.label.clone())
            .unwrap_or_default();

        let cohesion = compute_cohesion(members, &adj);
        for &idx in members {
            net.set_community(&adj.nodes[idx], i);
        }
        communities.push(Community {
            id: format!("community_{i}"),
            label,
            members: members.iter().map(|&idx| adj.nodes[idx].clone()).collect(),
            cohesion: (cohesion * 1000.0).round() / 1000.0,
        });
    }

    log::info!(
        "louvain: {} communities, modularity {:.4}",
        communities.len(),
        modularity
    );
    Partition {
        communities,
        modularity,
    }
}

// ---------------------------------------------------------------------------
// Adjacency list for undirected weighted graph
// ---------------------------------------------------------------------------

struct AdjList {
    /// index -> node_id
    nodes: Vec<String>,
    /// adjacency: index -> Vec<(neighbour_index, weight)>
    adj: Vec<Vec<(usize, f64)>>,
}

impl AdjList {
    fn from_network(net: &Network) -> Self {
        let graph = net.inner_graph();
        let nodes = graph.node_weights().map(|n| n.id.clone()).collect();
        let adj = net
            .adjacency()
            .into_iter()
            .map(|row| row.into_iter().map(|(j, w, _)| (j, w)).collect())
            .collect();
        Self { nodes, adj }
    }

    fn strength(&self, i: usize) -> f64 {
        self.adj[i].iter().map(|&(_, w)| w).sum()
    }

    fn total_weight(&self) -> f64 {
        let mut total = 0.0;
        for neighbours in &self.adj {
            for &(_, w) in neighbours {
                total += w;
            }
        }
        total / 2.0 // Each edge counted twice
    }
}

// ---------------------------------------------------------------------------
// Louvain algorithm
// ---------------------------------------------------------------------------

/// Louvain with multi-level aggregation.
///
/// Repeats two phases until no node moves:
///   Phase 1: local node moves to maximise modularity gain
///   Phase 2: contract the graph (merge communities into super-nodes)
///
/// Returns groups of original node indices.
fn louvain(adj: &AdjList, resolution: f64) -> Vec<Vec<usize>> {
    let n = adj.nodes.len();
    if n == 0 {
        return Vec::new();
    }

    let m = adj.total_weight();
    if m == 0.0 {
        return (0..n).map(|i| vec![i]).collect();
    }
    let m2 = m * 2.0;

    // groups[i] = original-graph node indices belonging to current super-node i
    let mut groups: Vec<Vec<usize>> = (0..n).map(|i| vec![i]).collect();

    let mut cur_adj: Vec<Vec<(usize, f64)>> = adj.adj.clone();
    // Twice the internal weight folded into each super-node
    let mut loops: Vec<f64> = vec![0.0; n];
    let mut cur_n = n;

    loop {
        if cur_n < 2 {
            break;
        }

        let degree: Vec<f64> = (0..cur_n)
            .map(|i| cur_adj[i].iter().map(|&(_, w)| w).sum::<f64>() + loops[i])
            .collect();

        // ---- Phase 1: local node moves ----
        let mut community: Vec<usize> = (0..cur_n).collect();
        let mut sigma_tot: Vec<f64> = degree.clone();
        let mut any_moved = false;

        let mut improved = true;
        let mut iters = 0;
        while improved && iters < 100 {
            improved = false;
            iters += 1;

            for i in 0..cur_n {
                let ci = community[i];
                let ki = degree[i];

                let mut comm_weights: HashMap<usize, f64> = HashMap::new();
                for &(j, w) in &cur_adj[i] {
                    if j == i {
                        continue;
                    }
                    *comm_weights.entry(community[j]).or_insert(0.0) += w;
                }

                let ki_in = comm_weights.get(&ci).copied().unwrap_or(0.0);

                // Temporarily remove i from its community
                sigma_tot[ci] -= ki;

                let mut best_comm = ci;
                let mut best_gain = 0.0;
                let loss = ki_in - resolution * sigma_tot[ci] * ki / m2;

                for (&cj, &kj_in) in &comm_weights {
                    let gain = kj_in - resolution * sigma_tot[cj] * ki / m2;
                    let delta = gain - loss;

                    if delta > best_gain || (delta == best_gain && cj < best_comm) {
                        best_gain = delta;
                        best_comm = cj;
                    }
                }

                if best_gain <= 0.0 {
                    best_comm = ci;
                }

                community[i] = best_comm;
                sigma_tot[best_comm] += ki;

                if best_comm != ci {
                    improved = true;
                    any_moved = true;
                }
            }
        }

        if !any_moved {
            break;
        }

        // Compact community labels to 0..new_n
        let mut label_map: HashMap<usize, usize> = HashMap::new();
        let mut next_label = 0usize;
        for &c in &community {
            label_map.entry(c).or_insert_with(|| {
                let l = next_label;
                next_label += 1;
                l
            });
        }
        let mapped: Vec<usize> = community.iter().map(|c| label_map[c]).collect();
        let new_n = next_label;

        if new_n == cur_n {
            break;
        }

        let mut new_groups: Vec<Vec<usize>> = vec![Vec::new(); new_n];
        for (i, &c) in mapped.iter().enumerate() {
            new_groups[c].extend_from_slice(&groups[i]);
        }
        groups = new_groups;

        // ---- Phase 2: contract graph ----
        let mut new_adj: Vec<Vec<(usize, f64)>> = vec![Vec::new(); new_n];
        let mut new_loops: Vec<f64> = vec![0.0; new_n];
        for i in 0..cur_n {
            let ci = mapped[i];
            new_loops[ci] += loops[i];
            for &(j, w) in &cur_adj[i] {
                let cj = mapped[j];
                if ci == cj {
                    new_loops[ci] += w;
                    continue;
                }
                if let Some(entry) = new_adj[ci].iter_mut().find(|(nb, _)| *nb == cj) {
                    entry.1 += w;
                } else {
                    new_adj[ci].push((cj, w));
                }
            }
        }

        cur_adj = new_adj;
        loops = new_loops;
        cur_n = new_n;
    }

    groups
}

/// Newman modularity of `groups` with resolution γ:
/// `Σ_c [ L_c / m − γ (d_c / 2m)² ]`.
fn modularity(adj: &AdjList, groups: &[Vec<usize>], resolution: f64) -> f64 {
    let m = adj.total_weight();
    if m == 0.0 {
        return 0.0;
    }
    let mut community_of = vec![0usize; adj.nodes.len()];
    for (c, group) in groups.iter().enumerate() {
        for &i in group {
            community_of[i] = c;
        }
    }

    let mut internal = vec![0.0; groups.len()];
    let mut degree = vec![0.0; groups.len()];
    for (i, neighbours) in adj.adj.iter().enumerate() {
        let ci = community_of[i];
        for &(j, w) in neighbours {
            degree[ci] += w;
            if community_of[j] == ci {
                internal[ci] += w;
            }
        }
    }

    internal
        .iter()
        .zip(&degree)
        .map(|(&l2, &d)| l2 / 2.0 / m - resolution * (d / (2.0 * m)).powi(2))
        .sum()
}

/// Compute internal edge density (cohesion) for a community.
fn compute_cohesion(members: &[usize], adj: &AdjList) -> f64 {
    let n = members.len();
    if n < 2 {
        return 0.0;
    }

    let member_set: HashSet<usize> = members.iter().copied().collect();
    let mut internal_edges = 0usize;

    for &member in members {
        for &(nbr, _) in &adj.adj[member] {
            if member_set.contains(&nbr) {
                internal_edges += 1;
            }
        }
    }

    // Each edge counted twice in undirected graph
    internal_edges /= 2;
    let max_possible = n * (n - 1) / 2;
    internal_edges as f64 / max_possible as f64
}
