//! Municipality similarity network tests.

mod common;

use common::*;
use redes_core::config::EntityKind;
use redes_core::graph::similarity::{
    build_similarity, cosine, feature_vector, standardize, MIN_DISTANCE,
};

#[test]
fn every_municipality_becomes_a_node() {
    let (summary, _) = fixture_payments();
    let net = build_similarity(&summary.municipalities, 0.85);
    assert_eq!(net.node_count(), 5);
    assert_eq!(net.nodes_of_kind(EntityKind::Municipality).len(), 5);

    let salvador = net.node("3849").unwrap();
    assert_eq!(salvador.label, "SALVADOR");
    assert_eq!(salvador.uf.as_deref(), Some("BA"));
    assert_eq!(salvador.beneficiaries, 3);
    assert!(approx_eq(salvador.value, 2450.0));
}

#[test]
fn edges_strictly_exceed_threshold() {
    let (summary, _) = fixture_payments();
    for threshold in [0.0, 0.3, 0.85] {
        let net = build_similarity(&summary.municipalities, threshold);
        for (a, b, e) in net.edges() {
            assert!(e.weight > threshold, "{a}-{b} weight {} <= {threshold}", e.weight);
            assert!(e.weight <= 1.0);
            assert!(approx_eq(e.distance, (1.0 - e.weight).max(MIN_DISTANCE)));
            assert!(e.distance > 0.0);
        }
    }
}

#[test]
fn raising_threshold_never_adds_edges() {
    let (summary, _) = fixture_payments();
    let counts: Vec<usize> = [0.0, 0.25, 0.5, 0.75, 0.95]
        .iter()
        .map(|&t| build_similarity(&summary.municipalities, t).edge_count())
        .collect();
    assert!(counts.windows(2).all(|w| w[0] >= w[1]), "{counts:?}");
}

#[test]
fn threshold_one_yields_no_edges() {
    let (summary, _) = fixture_payments();
    let net = build_similarity(&summary.municipalities, 1.0);
    assert_eq!(net.edge_count(), 0);
    assert_eq!(net.node_count(), 5);
}

#[test]
fn edge_weights_match_standardized_cosine() {
    let (summary, _) = fixture_payments();
    let mut rows: Vec<_> = summary.municipalities.iter().map(feature_vector).collect();
    standardize(&mut rows);

    let net = build_similarity(&summary.municipalities, 0.0);
    for (i, a) in summary.municipalities.iter().enumerate() {
        for (j, b) in summary.municipalities.iter().enumerate().skip(i + 1) {
            let sim = cosine(&rows[i], &rows[j]);
            match net.edge(&a.code, &b.code) {
                Some(e) => assert!(approx_eq(e.weight, sim)),
                None => assert!(sim <= 0.0, "{} - {} missing with sim {sim}", a.code, b.code),
            }
        }
    }
}

#[test]
fn standardized_columns_have_zero_mean() {
    let (summary, _) = fixture_payments();
    let mut rows: Vec<_> = summary.municipalities.iter().map(feature_vector).collect();
    standardize(&mut rows);
    for col in 0..4 {
        let mean: f64 = rows.iter().map(|r| r[col]).sum::<f64>() / rows.len() as f64;
        assert!(mean.abs() < 1e-9, "column {col} mean {mean}");
    }
}
