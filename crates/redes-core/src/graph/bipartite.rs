//! Agency ↔ recipient network built from grant records, and its agency projection.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::config::{ConnectionRow, EntityKind, GrantRecord, UfSummary};
use crate::graph::network::{Network, NodeData};
use crate::metrics::stats::RunningStats;

pub const AGENCY_PREFIX: &str = "agency:";
pub const RECIPIENT_PREFIX: &str = "recipient:";

pub fn agency_id(name: &str) -> String {
    format!("{AGENCY_PREFIX}{name}")
}

pub fn recipient_id(name: &str) -> String {
    format!("{RECIPIENT_PREFIX}{name}")
}

/// The `n` agencies with the most rows, most active first; ties by name.
pub fn top_agencies(records: &[GrantRecord], n: usize) -> Vec<String> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for r in records {
        *counts.entry(r.agency.as_str()).or_insert(0) += 1;
    }
    let mut ranked: Vec<(&str, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    ranked
        .into_iter()
        .take(n)
        .map(|(name, _)| name.to_string())
        .collect()
}

/// Build the bipartite network restricted to `agencies`.
///
/// Every selected agency becomes a node even without edges; recipients only
/// appear through an edge. Each kept record adds its value to the
/// agency–recipient edge and to both endpoints' totals.
pub fn build_bipartite(records: &[GrantRecord], agencies: &[String]) -> Network {
    let mut net = Network::new();
    let selected: HashSet<&str> = agencies.iter().map(String::as_str).collect();

    for name in agencies {
        net.ensure_node(NodeData::new(agency_id(name), name.clone(), EntityKind::Agency));
    }

    let mut kept = 0usize;
    for r in records.iter().filter(|r| selected.contains(r.agency.as_str())) {
        if !r.value.is_finite() || r.value < 0.0 {
            continue;
        }
        let a_id = agency_id(&r.agency);
        let r_id = recipient_id(&r.recipient);

        let mut data = NodeData::new(r_id.clone(), r.recipient.clone(), EntityKind::Recipient);
        data.uf = Some(r.uf.clone());
        data.code = r.recipient_code.clone();
        net.ensure_node(data);
        net.accumulate_edge(&a_id, &r_id, r.value);
        kept += 1;

        if let Some(agency) = net.node_mut(&a_id) {
            agency.value += r.value;
            if agency.code.is_none() {
                agency.code = r.agency_code.clone();
            }
        }
        if let Some(recipient) = net.node_mut(&r_id) {
            recipient.value += r.value;
            if recipient.code.is_none() {
                recipient.code = r.recipient_code.clone();
            }
        }
    }

    log::info!(
        "bipartite network: {} agencies, {} recipients, {} edges from {} records",
        net.nodes_of_kind(EntityKind::Agency).len(),
        net.nodes_of_kind(EntityKind::Recipient).len(),
        net.edge_count(),
        kept
    );
    net
}

/// Agency ↔ agency network; edge weight is the number of shared recipients.
pub fn project_agencies(bipartite: &Network) -> Network {
    let mut proj = Network::new();
    for agency in bipartite.nodes_of_kind(EntityKind::Agency) {
        let mut data = agency.clone();
        data.community = None;
        proj.ensure_node(data);
    }

    for recipient in bipartite.nodes_of_kind(EntityKind::Recipient) {
        let mut funders: Vec<String> = bipartite
            .neighbors(&recipient.id)
            .into_iter()
            .filter(|n| n.kind == EntityKind::Agency)
            .map(|n| n.id.clone())
            .collect();
        funders.sort();
        for (i, a) in funders.iter().enumerate() {
            for b in &funders[i + 1..] {
                proj.accumulate_edge(a, b, 1.0);
            }
        }
    }

    log::debug!(
        "agency projection: {} nodes, {} edges",
        proj.node_count(),
        proj.edge_count()
    );
    proj
}

/// One row per agency–recipient edge, largest value first.
pub fn connection_rows(net: &Network) -> Vec<ConnectionRow> {
    let mut rows: Vec<ConnectionRow> = net
        .edges()
        .into_iter()
        .filter_map(|(a, b, e)| {
            let (a, b) = (net.node(a)?, net.node(b)?);
            let (agency, recipient) = if a.kind == EntityKind::Agency {
                (a, b)
            } else {
                (b, a)
            };
            Some(ConnectionRow {
                agency: agency.label.clone(),
                recipient: recipient.label.clone(),
                total_value: e.weight,
                agreements: e.count,
                uf: recipient.uf.clone().unwrap_or_default(),
            })
        })
        .collect();
    rows.sort_by(|x, y| {
        y.total_value
            .total_cmp(&x.total_value)
            .then_with(|| x.agency.cmp(&y.agency))
            .then_with(|| x.recipient.cmp(&y.recipient))
    });
    rows
}

/// Per-UF totals over all cleaned grant rows; `distinct` counts agencies.
pub fn uf_summary(records: &[GrantRecord]) -> Vec<UfSummary> {
    let mut acc: BTreeMap<&str, (RunningStats, HashSet<&str>)> = BTreeMap::new();
    for r in records {
        let (stats, agencies) = acc.entry(r.uf.as_str()).or_default();
        stats.push(r.value);
        agencies.insert(r.agency.as_str());
    }
    acc.into_iter()
        .map(|(uf, (stats, agencies))| UfSummary {
            uf: uf.to_string(),
            total_value: stats.sum(),
            mean_value: stats.mean(),
            std_value: stats.std(),
            records: stats.count(),
            distinct: agencies.len(),
        })
        .collect()
}
