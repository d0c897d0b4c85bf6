//! Overall result document (`analysis.json`).

use std::collections::HashMap;
use std::path::Path;

use chrono::Utc;

use crate::config::{AnalysisResult, CommunityOutput, PipelineConfig, PipelineKind};
use crate::data::loader::LoadReport;
use crate::error::Result;
use crate::export::write_json;
use crate::graph::network::Network;
use crate::metrics::communities::Partition;
use crate::phases::benefits::BenefitsState;
use crate::phases::grants::GrantsState;

/// File name of the result document inside the output directory.
pub const ANALYSIS_FILE: &str = "analysis.json";

fn base_metadata(
    config: &PipelineConfig,
    timings: &HashMap<String, f64>,
    total_ms: f64,
) -> HashMap<String, serde_json::Value> {
    let input = Path::new(&config.input_path);
    let input = input.canonicalize().unwrap_or_else(|_| input.to_path_buf());

    let mut metadata = HashMap::new();
    metadata.insert(
        "input_path".to_string(),
        serde_json::Value::String(input.to_string_lossy().to_string()),
    );
    metadata.insert(
        "output_dir".to_string(),
        serde_json::Value::String(config.output_dir.clone()),
    );
    metadata.insert(
        "analysed_at".to_string(),
        serde_json::Value::String(Utc::now().to_rfc3339()),
    );
    metadata.insert(
        "redes_version".to_string(),
        serde_json::Value::String(env!("CARGO_PKG_VERSION").to_string()),
    );
    metadata.insert(
        "analysis_duration_ms".to_string(),
        serde_json::json!(((total_ms * 10.0).round() / 10.0)),
    );
    metadata.insert(
        "phase_timings".to_string(),
        serde_json::to_value(timings).unwrap_or_default(),
    );
    metadata.insert(
        "parameters".to_string(),
        serde_json::json!({
            "delimiter": (config.delimiter as char).to_string(),
            "top_agencies": config.top_agencies,
            "similarity_threshold": config.similarity_threshold,
            "resolution": config.resolution,
            "top_k": config.top_k,
            "path_sources": config.path_sources,
        }),
    );
    metadata
}

fn load_stats(stats: &mut HashMap<String, serde_json::Value>, load: &LoadReport) {
    stats.insert("files".to_string(), serde_json::json!(load.files));
    stats.insert("rows_read".to_string(), serde_json::json!(load.rows_read));
    stats.insert("rows_kept".to_string(), serde_json::json!(load.rows_kept));
    stats.insert(
        "rows_skipped".to_string(),
        serde_json::json!(load.rows_skipped()),
    );
    stats.insert(
        "skipped_by_reason".to_string(),
        serde_json::to_value(&load.skipped).unwrap_or_default(),
    );
}

/// Communities with members listed by label.
fn community_output(partition: &Partition, net: &Network) -> Vec<CommunityOutput> {
    partition
        .communities
        .iter()
        .map(|c| CommunityOutput {
            id: c.id.clone(),
            label: c.label.clone(),
            size: c.members.len(),
            cohesion: c.cohesion,
            members: c
                .members
                .iter()
                .map(|id| net.node(id).map(|n| n.label.clone()).unwrap_or_else(|| id.clone()))
                .collect(),
        })
        .collect()
}

/// Build the AnalysisResult of a grants run.
pub fn build_grants_result(
    config: &PipelineConfig,
    state: &GrantsState,
    timings: &HashMap<String, f64>,
    total_ms: f64,
) -> AnalysisResult {
    let metadata = base_metadata(config, timings, total_ms);

    let mut stats = HashMap::new();
    load_stats(&mut stats, &state.load);
    stats.insert(
        "agencies".to_string(),
        serde_json::json!(state.agencies.len()),
    );
    stats.insert(
        "recipients".to_string(),
        serde_json::json!(state.network.node_count().saturating_sub(state.agencies.len())),
    );
    stats.insert(
        "edges".to_string(),
        serde_json::json!(state.network.edge_count()),
    );
    stats.insert(
        "total_value".to_string(),
        serde_json::json!(state.network.total_weight()),
    );
    stats.insert(
        "density".to_string(),
        serde_json::json!(state.metrics.density),
    );
    stats.insert(
        "projection_edges".to_string(),
        serde_json::json!(state.projection.edge_count()),
    );
    stats.insert(
        "communities".to_string(),
        serde_json::json!(state.partition.len()),
    );
    stats.insert(
        "modularity".to_string(),
        serde_json::json!(state.partition.modularity),
    );

    let mut outputs = state.outputs.written().to_vec();
    outputs.push(ANALYSIS_FILE.to_string());

    AnalysisResult {
        version: "1.0".to_string(),
        pipeline: PipelineKind::Grants,
        metadata,
        stats,
        top_degree: state.metrics.top_degree.clone(),
        top_betweenness: state.metrics.top_betweenness.clone(),
        communities: community_output(&state.partition, &state.projection),
        outputs,
    }
}

/// Build the AnalysisResult of a benefits run.
pub fn build_benefits_result(
    config: &PipelineConfig,
    state: &BenefitsState,
    timings: &HashMap<String, f64>,
    total_ms: f64,
) -> Result<AnalysisResult> {
    let summary = state.summary()?;
    let mut metadata = base_metadata(config, timings, total_ms);
    if let Some(period) = &summary.period {
        metadata.insert(
            "competence".to_string(),
            serde_json::Value::String(period.clone()),
        );
    }

    let mut stats = HashMap::new();
    load_stats(&mut stats, &state.load);
    stats.insert(
        "municipalities".to_string(),
        serde_json::json!(summary.municipalities.len()),
    );
    stats.insert(
        "unique_beneficiaries".to_string(),
        serde_json::json!(summary.unique_beneficiaries),
    );
    stats.insert(
        "total_value".to_string(),
        serde_json::json!(summary.values.total),
    );
    stats.insert(
        "edges".to_string(),
        serde_json::json!(state.network.edge_count()),
    );
    stats.insert(
        "density".to_string(),
        serde_json::json!(state.metrics.density),
    );
    stats.insert(
        "communities".to_string(),
        serde_json::json!(state.partition.len()),
    );
    stats.insert(
        "modularity".to_string(),
        serde_json::json!(state.partition.modularity),
    );

    let mut outputs = state.outputs.written().to_vec();
    outputs.push(ANALYSIS_FILE.to_string());

    Ok(AnalysisResult {
        version: "1.0".to_string(),
        pipeline: PipelineKind::Benefits,
        metadata,
        stats,
        top_degree: state.metrics.top_degree.clone(),
        top_betweenness: state.metrics.top_betweenness.clone(),
        communities: community_output(&state.partition, &state.network),
        outputs,
    })
}

/// Write the analysis result to a JSON file.
pub fn write_output(result: &AnalysisResult, output_path: &Path) -> Result<()> {
    write_json(output_path, result)?;
    log::info!("analysis written to {}", output_path.display());
    Ok(())
}
