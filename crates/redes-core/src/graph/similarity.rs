//! Municipality similarity network over standardized payment features.

use rayon::prelude::*;

use crate::config::{EntityKind, MunicipalityStats};
use crate::graph::network::{EdgeData, Network, NodeData};

/// Feature names, in vector order.
pub const FEATURES: [&str; 4] = [
    "value_mean",
    "unique_beneficiaries",
    "cpf_ratio",
    "value_per_capita",
];

pub type Features = [f64; 4];

/// Shortest edge length; identical profiles are still one step apart.
pub const MIN_DISTANCE: f64 = 1e-9;

pub fn feature_vector(m: &MunicipalityStats) -> Features {
    [
        m.value_mean,
        m.unique_beneficiaries as f64,
        m.cpf_ratio,
        m.value_per_capita,
    ]
}

/// Z-score each column in place using the population standard deviation.
/// Constant columns become all zeros.
pub fn standardize(rows: &mut [Features]) {
    if rows.is_empty() {
        return;
    }
    let n = rows.len() as f64;
    for col in 0..FEATURES.len() {
        let mean = rows.iter().map(|r| r[col]).sum::<f64>() / n;
        let var = rows.iter().map(|r| (r[col] - mean).powi(2)).sum::<f64>() / n;
        let std = var.sqrt();
        for row in rows.iter_mut() {
            row[col] = if std > 0.0 && std.is_finite() {
                (row[col] - mean) / std
            } else {
                0.0
            };
        }
    }
}

/// Cosine similarity; 0 when either vector has zero norm.
pub fn cosine(a: &Features, b: &Features) -> f64 {
    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let nb = b.iter().map(|x| x * x).sum::<f64>().sqrt();
    if na == 0.0 || nb == 0.0 {
        0.0
    } else {
        (dot / (na * nb)).clamp(-1.0, 1.0)
    }
}

/// Pairs `(i, j, similarity)` with `i < j` and similarity strictly above
/// `threshold`, ordered by `i` then `j`.
pub fn similar_pairs(rows: &[Features], threshold: f64) -> Vec<(usize, usize, f64)> {
    let n = rows.len();
    (0..n)
        .into_par_iter()
        .map(|i| {
            ((i + 1)..n)
                .filter_map(|j| {
                    let sim = cosine(&rows[i], &rows[j]);
                    (sim > threshold).then_some((i, j, sim))
                })
                .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>()
        .into_iter()
        .flatten()
        .collect()
}

/// Every municipality is a node; similar pairs are joined with
/// `weight = similarity` and `distance = 1 − similarity`, floored at
/// [`MIN_DISTANCE`].
pub fn build_similarity(stats: &[MunicipalityStats], threshold: f64) -> Network {
    let mut net = Network::new();
    for m in stats {
        let mut data = NodeData::new(m.code.clone(), m.name.clone(), EntityKind::Municipality);
        data.uf = Some(m.uf.clone());
        data.code = Some(m.code.clone());
        data.value = m.value_total;
        data.beneficiaries = m.unique_beneficiaries;
        data.mean_value = m.value_mean;
        net.ensure_node(data);
    }

    let mut rows: Vec<Features> = stats.iter().map(feature_vector).collect();
    standardize(&mut rows);

    let pairs = similar_pairs(&rows, threshold);
    for (i, j, sim) in pairs {
        net.insert_edge(
            &stats[i].code,
            &stats[j].code,
            EdgeData::new(sim, (1.0 - sim).max(MIN_DISTANCE)),
        );
    }

    log::info!(
        "similarity network: {} municipalities, {} edges above {threshold}",
        net.node_count(),
        net.edge_count()
    );
    net
}
