//! Bipartite grants network and agency projection tests.

mod common;

use common::*;
use pretty_assertions::assert_eq;
use redes_core::config::EntityKind;
use redes_core::graph::bipartite::{
    agency_id, build_bipartite, connection_rows, project_agencies, recipient_id, top_agencies,
    uf_summary,
};

const SAUDE: &str = "MINISTERIO DA SAUDE";
const EDUCACAO: &str = "MINISTERIO DA EDUCACAO";
const CIDADES: &str = "MINISTERIO DAS CIDADES";

#[test]
fn top_agencies_ranked_by_agreement_count() {
    let (records, _) = fixture_grants();
    // SAUDE has 4 rows; EDUCACAO and CIDADES 2 each, ordered by name
    assert_eq!(top_agencies(&records, 50), vec![SAUDE, EDUCACAO, CIDADES]);
    assert_eq!(top_agencies(&records, 1), vec![SAUDE]);
}

#[test]
fn bipartite_fixture_shape() {
    let (records, _) = fixture_grants();
    let agencies = top_agencies(&records, 50);
    let net = build_bipartite(&records, &agencies);

    assert_eq!(net.nodes_of_kind(EntityKind::Agency).len(), 3);
    assert_eq!(net.nodes_of_kind(EntityKind::Recipient).len(), 4);
    assert_eq!(net.node_count(), 7);
    assert_eq!(net.edge_count(), 7);
}

#[test]
fn repeated_pairs_accumulate_value_and_count() {
    let (records, _) = fixture_grants();
    let net = build_bipartite(&records, &top_agencies(&records, 50));
    let edge = net
        .edge(&agency_id(SAUDE), &recipient_id("PREFEITURA DE ITABUNA"))
        .unwrap();
    assert!(approx_eq(edge.weight, 150.0));
    assert_eq!(edge.count, 2);
}

#[test]
fn value_is_conserved_across_edges_and_nodes() {
    let (records, _) = fixture_grants();
    let net = build_bipartite(&records, &top_agencies(&records, 50));
    let input_total: f64 = records.iter().map(|r| r.value).sum();

    assert!(approx_eq(net.total_weight(), input_total));
    assert!(approx_eq(input_total, 4560.5));
    let agency_total: f64 = net
        .nodes_of_kind(EntityKind::Agency)
        .iter()
        .map(|n| n.value)
        .sum();
    let recipient_total: f64 = net
        .nodes_of_kind(EntityKind::Recipient)
        .iter()
        .map(|n| n.value)
        .sum();
    assert!(approx_eq(agency_total, input_total));
    assert!(approx_eq(recipient_total, input_total));
    assert_eq!(net.total_count(), records.len());
}

#[test]
fn unselected_agencies_are_left_out() {
    let (records, _) = fixture_grants();
    let net = build_bipartite(&records, &top_agencies(&records, 1));
    assert_eq!(net.nodes_of_kind(EntityKind::Agency).len(), 1);
    // SAUDE funds ITABUNA, ILHEUS and RECIFE
    assert_eq!(net.nodes_of_kind(EntityKind::Recipient).len(), 3);
    assert!(!net.has_node(&recipient_id("PREFEITURA DE SALVADOR")));
    assert!(approx_eq(net.total_weight(), 1160.0));
}

#[test]
fn edges_only_join_agencies_to_recipients() {
    let (records, _) = fixture_grants();
    let net = build_bipartite(&records, &top_agencies(&records, 50));
    for (a, b, _) in net.edges() {
        let ka = net.node(a).unwrap().kind;
        let kb = net.node(b).unwrap().kind;
        assert_ne!(ka, kb, "edge {a} - {b} joins two nodes of the same kind");
    }
}

#[test]
fn projection_links_agencies_sharing_recipients() {
    let (records, _) = fixture_grants();
    let net = build_bipartite(&records, &top_agencies(&records, 50));
    let proj = project_agencies(&net);

    assert_eq!(proj.node_count(), 3);
    assert_eq!(proj.edge_count(), 3);
    // ITABUNA links SAUDE-EDUCACAO, SALVADOR links EDUCACAO-CIDADES,
    // RECIFE links SAUDE-CIDADES
    for (a, b) in [(SAUDE, EDUCACAO), (EDUCACAO, CIDADES), (SAUDE, CIDADES)] {
        let edge = proj.edge(&agency_id(a), &agency_id(b)).unwrap();
        assert_eq!(edge.weight, 1.0);
    }
}

#[test]
fn connection_rows_sorted_by_value() {
    let (records, _) = fixture_grants();
    let net = build_bipartite(&records, &top_agencies(&records, 50));
    let rows = connection_rows(&net);

    assert_eq!(rows.len(), 7);
    assert_eq!(rows[0].agency, EDUCACAO);
    assert_eq!(rows[0].recipient, "PREFEITURA DE SALVADOR");
    assert!(approx_eq(rows[0].total_value, 2500.5));
    assert!(rows
        .windows(2)
        .all(|w| w[0].total_value >= w[1].total_value));
    let last = rows.last().unwrap();
    assert_eq!(last.recipient, "PREFEITURA DE RECIFE");
    assert_eq!(last.uf, "PE");
}

#[test]
fn uf_summary_counts_distinct_agencies() {
    let (records, _) = fixture_grants();
    let ufs = uf_summary(&records);
    let view: Vec<(&str, usize, usize)> = ufs
        .iter()
        .map(|u| (u.uf.as_str(), u.records, u.distinct))
        .collect();
    assert_eq!(view, vec![("BA", 6, 3), ("PE", 2, 2)]);
    let pe = &ufs[1];
    assert!(approx_eq(pe.total_value, 410.0));
}
