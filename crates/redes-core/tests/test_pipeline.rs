//! Pipeline orchestration and E2E integration tests.

mod common;

use std::cell::RefCell;
use std::rc::Rc;

use common::*;
use pretty_assertions::assert_eq;
use redes_core::config::{AnalysisResult, PipelineKind};
use redes_core::error::PipelineError;
use redes_core::export::raster::PNG_SIGNATURE;
use redes_core::pipeline::{run_benefits_pipeline, run_grants_pipeline, ProgressCallback};

const GRANTS_OUTPUTS: &[&str] = &[
    "data/agency_metrics.csv",
    "data/network_edges.csv",
    "data/uf_summary.csv",
    "data/nodes.csv",
    "networks/grants_network.gexf",
    "networks/agency_projection.graphml",
    "reports/descriptive_stats.json",
    "reports/network_metrics.json",
    "reports/report.txt",
    "figures/top_agencies.svg",
    "figures/top_agencies.png",
    "figures/uf_distribution.svg",
    "figures/uf_distribution.png",
    "figures/collaboration_network.svg",
    "figures/collaboration_network.png",
    "figures/value_distribution.svg",
    "figures/value_distribution.png",
    "figures/degree_distribution.svg",
    "figures/degree_distribution.png",
    "analysis.json",
];

const BENEFITS_OUTPUTS: &[&str] = &[
    "data/municipality_stats.csv",
    "data/uf_summary.csv",
    "data/nodes.csv",
    "networks/municipality_network.graphml",
    "reports/descriptive_stats.json",
    "reports/network_metrics.json",
    "reports/report.txt",
    "figures/value_distribution.svg",
    "figures/value_distribution.png",
    "figures/uf_values.svg",
    "figures/uf_values.png",
    "figures/uf_beneficiaries.svg",
    "figures/uf_beneficiaries.png",
    "figures/top_municipalities.svg",
    "figures/top_municipalities.png",
    "figures/municipality_network.svg",
    "figures/municipality_network.png",
    "analysis.json",
];

// ===========================================================================
// Grants
// ===========================================================================

#[test]
fn grants_pipeline_writes_every_output() {
    let dir = tempfile::tempdir().unwrap();
    let config = fixture_config("grants.csv", dir.path());
    let result = run_grants_pipeline(&config, None).unwrap();

    assert_eq!(result.pipeline, PipelineKind::Grants);
    for rel in GRANTS_OUTPUTS {
        assert!(dir.path().join(rel).is_file(), "missing output {rel}");
        assert!(result.outputs.iter().any(|o| o == rel), "{rel} not listed");
    }
    assert_eq!(result.outputs.len(), GRANTS_OUTPUTS.len());
}

#[test]
fn grants_pipeline_stats() {
    let dir = tempfile::tempdir().unwrap();
    let config = fixture_config("grants.csv", dir.path());
    let result = run_grants_pipeline(&config, None).unwrap();

    assert_eq!(result.stats["rows_read"], serde_json::json!(12));
    assert_eq!(result.stats["rows_kept"], serde_json::json!(8));
    assert_eq!(result.stats["rows_skipped"], serde_json::json!(4));
    assert_eq!(result.stats["agencies"], serde_json::json!(3));
    assert_eq!(result.stats["recipients"], serde_json::json!(4));
    assert_eq!(result.stats["edges"], serde_json::json!(7));
    assert_eq!(result.stats["communities"], serde_json::json!(1));
    assert!(approx_eq(result.stats["total_value"].as_f64().unwrap(), 4560.5));

    assert_eq!(result.top_degree[0].label, "MINISTERIO DA SAUDE");
    assert_eq!(result.communities.len(), 1);
    assert_eq!(result.communities[0].size, 3);
}

#[test]
fn grants_analysis_json_matches_result() {
    let dir = tempfile::tempdir().unwrap();
    let config = fixture_config("grants.csv", dir.path());
    let result = run_grants_pipeline(&config, None).unwrap();

    let text = std::fs::read_to_string(dir.path().join("analysis.json")).unwrap();
    let parsed: AnalysisResult = serde_json::from_str(&text).unwrap();
    assert_eq!(parsed.pipeline, result.pipeline);
    for key in ["rows_read", "rows_kept", "agencies", "recipients", "edges"] {
        assert_eq!(parsed.stats[key], result.stats[key], "stat {key}");
    }
    let ids = |r: &AnalysisResult| -> Vec<String> {
        r.top_degree.iter().map(|n| n.id.clone()).collect()
    };
    assert_eq!(ids(&parsed), ids(&result));
    assert_eq!(parsed.outputs, result.outputs);
    for key in [
        "input_path",
        "analysed_at",
        "redes_version",
        "analysis_duration_ms",
        "phase_timings",
    ] {
        assert!(parsed.metadata.contains_key(key), "missing metadata {key}");
    }
}

#[test]
fn grants_agency_table_sorted_by_value() {
    let dir = tempfile::tempdir().unwrap();
    let config = fixture_config("grants.csv", dir.path());
    run_grants_pipeline(&config, None).unwrap();

    let text = std::fs::read_to_string(dir.path().join("data/agency_metrics.csv")).unwrap();
    let agencies: Vec<&str> = text
        .lines()
        .skip(1)
        .map(|l| l.split(',').next().unwrap())
        .collect();
    // EDUCACAO 2700.5, SAUDE 1160, CIDADES 700
    assert_eq!(
        agencies,
        vec![
            "MINISTERIO DA EDUCACAO",
            "MINISTERIO DA SAUDE",
            "MINISTERIO DAS CIDADES"
        ]
    );
}

#[test]
fn grants_report_mentions_top_agency() {
    let dir = tempfile::tempdir().unwrap();
    let config = fixture_config("grants.csv", dir.path());
    run_grants_pipeline(&config, None).unwrap();
    let report = std::fs::read_to_string(dir.path().join("reports/report.txt")).unwrap();
    assert!(report.contains("MINISTERIO DA EDUCACAO"));
    assert!(report.contains("R$ 2.700,50"));
}

#[test]
fn charts_are_written_as_png() {
    let dir = tempfile::tempdir().unwrap();
    let config = fixture_config("grants.csv", dir.path());
    let result = run_grants_pipeline(&config, None).unwrap();

    let pngs: Vec<&String> = result
        .outputs
        .iter()
        .filter(|o| o.ends_with(".png"))
        .collect();
    assert_eq!(pngs.len(), 5);
    for rel in pngs {
        assert!(rel.starts_with("figures/"));
        let bytes = std::fs::read(dir.path().join(rel)).unwrap();
        assert!(bytes.starts_with(&PNG_SIGNATURE), "{rel} is not a PNG");
    }
}

#[test]
fn large_networks_sample_path_sources() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = fixture_config("grants.csv", dir.path());
    config.path_sources = 3;
    let result = run_grants_pipeline(&config, None).unwrap();

    let text = std::fs::read_to_string(dir.path().join("reports/network_metrics.json")).unwrap();
    let metrics: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(metrics["path_sources"], serde_json::json!(3));
    assert_eq!(metrics["nodes"], serde_json::json!(7));
    // degree centrality is never sampled
    assert_eq!(result.top_degree[0].label, "MINISTERIO DA SAUDE");

    let report = std::fs::read_to_string(dir.path().join("reports/report.txt")).unwrap();
    assert!(report.contains("estimated from 3 sources"));
}

#[test]
fn small_networks_keep_exact_paths() {
    let dir = tempfile::tempdir().unwrap();
    let config = fixture_config("payments.csv", dir.path());
    run_benefits_pipeline(&config, None).unwrap();
    let text = std::fs::read_to_string(dir.path().join("reports/network_metrics.json")).unwrap();
    let metrics: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(metrics["path_sources"], serde_json::Value::Null);
}

#[test]
fn top_agencies_limits_network() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = fixture_config("grants.csv", dir.path());
    config.top_agencies = 1;
    let result = run_grants_pipeline(&config, None).unwrap();
    assert_eq!(result.stats["agencies"], serde_json::json!(1));
    assert_eq!(result.stats["recipients"], serde_json::json!(3));
    assert_eq!(result.stats["projection_edges"], serde_json::json!(0));
}

// ===========================================================================
// Benefits
// ===========================================================================

#[test]
fn benefits_pipeline_writes_every_output() {
    let dir = tempfile::tempdir().unwrap();
    let config = fixture_config("payments.csv", dir.path());
    let result = run_benefits_pipeline(&config, None).unwrap();

    assert_eq!(result.pipeline, PipelineKind::Benefits);
    for rel in BENEFITS_OUTPUTS {
        assert!(dir.path().join(rel).is_file(), "missing output {rel}");
    }
    assert_eq!(result.outputs.len(), BENEFITS_OUTPUTS.len());
}

#[test]
fn benefits_pipeline_stats() {
    let dir = tempfile::tempdir().unwrap();
    let config = fixture_config("payments.csv", dir.path());
    let result = run_benefits_pipeline(&config, None).unwrap();

    assert_eq!(result.stats["rows_read"], serde_json::json!(17));
    assert_eq!(result.stats["rows_kept"], serde_json::json!(12));
    assert_eq!(result.stats["municipalities"], serde_json::json!(5));
    assert_eq!(result.stats["unique_beneficiaries"], serde_json::json!(12));
    assert!(approx_eq(result.stats["total_value"].as_f64().unwrap(), 8350.0));
    assert_eq!(
        result.metadata.get("competence"),
        Some(&serde_json::json!("202302"))
    );
    let members: usize = result.communities.iter().map(|c| c.size).sum();
    assert_eq!(members, 5);
}

#[test]
fn municipality_table_is_ordered_by_code() {
    let dir = tempfile::tempdir().unwrap();
    let config = fixture_config("payments.csv", dir.path());
    run_benefits_pipeline(&config, None).unwrap();

    let text = std::fs::read_to_string(dir.path().join("data/municipality_stats.csv")).unwrap();
    let mut lines = text.lines();
    let header = lines.next().unwrap();
    assert!(header.starts_with("code,name,uf,value_mean"));
    let codes: Vec<&str> = lines.map(|l| l.split(',').next().unwrap()).collect();
    assert_eq!(codes, vec!["2531", "2655", "3501", "3515", "3849"]);
}

#[test]
fn no_charts_skips_figures() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = fixture_config("payments.csv", dir.path());
    config.write_charts = false;
    let result = run_benefits_pipeline(&config, None).unwrap();
    assert!(!dir.path().join("figures").exists());
    assert!(result.outputs.iter().all(|o| !o.starts_with("figures/")));
}

// ===========================================================================
// Orchestration
// ===========================================================================

#[test]
fn progress_callback_sees_phases_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let config = fixture_config("grants.csv", dir.path());
    let seen = Rc::new(RefCell::new(Vec::new()));
    let callback: ProgressCallback = {
        let seen = Rc::clone(&seen);
        Box::new(move |phase, _label| seen.borrow_mut().push(phase.to_string()))
    };
    run_grants_pipeline(&config, Some(callback)).unwrap();
    assert_eq!(
        *seen.borrow(),
        vec!["load", "network", "metrics", "communities", "charts", "export"]
    );
}

#[test]
fn phase_timings_recorded() {
    let dir = tempfile::tempdir().unwrap();
    let config = fixture_config("payments.csv", dir.path());
    let result = run_benefits_pipeline(&config, None).unwrap();
    let timings = result
        .metadata
        .get("phase_timings")
        .and_then(|v| v.as_object())
        .unwrap();
    for phase in ["load", "network", "metrics", "communities", "charts", "export"] {
        assert!(timings.contains_key(phase), "missing timing for {phase}");
    }
}

#[test]
fn repeated_runs_produce_identical_tables() {
    let first = tempfile::tempdir().unwrap();
    let second = tempfile::tempdir().unwrap();
    run_grants_pipeline(&fixture_config("grants.csv", first.path()), None).unwrap();
    run_grants_pipeline(&fixture_config("grants.csv", second.path()), None).unwrap();
    run_benefits_pipeline(&fixture_config("payments.csv", first.path().join("b").as_path()), None)
        .unwrap();
    run_benefits_pipeline(&fixture_config("payments.csv", second.path().join("b").as_path()), None)
        .unwrap();

    for rel in [
        "data/agency_metrics.csv",
        "data/network_edges.csv",
        "data/nodes.csv",
        "networks/agency_projection.graphml",
        "reports/network_metrics.json",
        "b/data/municipality_stats.csv",
        "b/data/nodes.csv",
        "b/networks/municipality_network.graphml",
    ] {
        let a = std::fs::read_to_string(first.path().join(rel)).unwrap();
        let b = std::fs::read_to_string(second.path().join(rel)).unwrap();
        assert_eq!(a, b, "{rel} differs between runs");
    }
}

#[test]
fn invalid_threshold_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = fixture_config("payments.csv", dir.path());
    config.similarity_threshold = 1.5;
    assert!(matches!(
        run_benefits_pipeline(&config, None),
        Err(PipelineError::InvalidConfig(_))
    ));
    assert!(!dir.path().join("analysis.json").exists());
}

#[test]
fn grants_file_fed_to_benefits_fails_on_columns() {
    let dir = tempfile::tempdir().unwrap();
    let config = fixture_config("grants.csv", dir.path());
    assert!(matches!(
        run_benefits_pipeline(&config, None),
        Err(PipelineError::MissingColumn { .. })
    ));
}
