//! Phases of the benefits analysis: municipality similarity network.

use std::path::Path;

use crate::config::PipelineConfig;
use crate::data::aggregate::{PaymentAggregator, PaymentSummary};
use crate::data::loader::{stream_payments, LoadReport};
use crate::error::{PipelineError, Result};
use crate::export::charts::{bar_chart, histogram, network_chart};
use crate::export::graph_formats::to_graphml;
use crate::export::report::{benefits_report, BenefitsReport};
use crate::export::tables::node_rows;
use crate::export::OutputDir;
use crate::graph::network::Network;
use crate::graph::similarity::build_similarity;
use crate::metrics::centrality::Centrality;
use crate::metrics::communities::{detect_communities, Partition};
use crate::metrics::structure::NetworkMetrics;

/// Everything the benefits phases produce, filled in phase order.
#[derive(Debug)]
pub struct BenefitsState {
    pub load: LoadReport,
    pub summary: Option<PaymentSummary>,
    pub network: Network,
    pub centrality: Centrality,
    pub metrics: NetworkMetrics,
    pub partition: Partition,
    pub outputs: OutputDir,
}

impl BenefitsState {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            load: LoadReport::default(),
            summary: None,
            network: Network::new(),
            centrality: Centrality::default(),
            metrics: NetworkMetrics::default(),
            partition: Partition {
                communities: Vec::new(),
                modularity: 0.0,
            },
            outputs: OutputDir::new(&config.output_dir),
        }
    }

    pub fn summary(&self) -> Result<&PaymentSummary> {
        self.summary
            .as_ref()
            .ok_or_else(|| PipelineError::empty("aggregating payments"))
    }
}

/// Stream the payments file into per-municipality aggregates.
pub fn run_load_phase(config: &PipelineConfig, state: &mut BenefitsState) -> Result<()> {
    let mut aggregator = PaymentAggregator::new();
    state.load = stream_payments(Path::new(&config.input_path), config.delimiter, |record| {
        aggregator.push(record)
    })?;
    let summary = aggregator.finish();
    log::info!(
        "aggregated {} payments into {} municipalities",
        summary.records,
        summary.municipalities.len()
    );
    state.summary = Some(summary);
    Ok(())
}

pub fn run_network_phase(config: &PipelineConfig, state: &mut BenefitsState) -> Result<()> {
    let network = build_similarity(&state.summary()?.municipalities, config.similarity_threshold);
    if network.edge_count() == 0 {
        log::warn!(
            "no municipality pair is more similar than {}; the network has no edges",
            config.similarity_threshold
        );
    }
    state.network = network;
    Ok(())
}

pub fn run_metrics_phase(config: &PipelineConfig, state: &mut BenefitsState) -> Result<()> {
    let net = &state.network;
    if config.path_sources > 0 && net.node_count() > config.path_sources {
        log::info!(
            "similarity network has {} nodes; sampling {} shortest-path sources",
            net.node_count(),
            config.path_sources
        );
    }
    let centrality = Centrality::compute_with(net, config.path_sources);
    let mut metrics = NetworkMetrics::compute_with(net, config.path_sources);
    metrics.top_degree = centrality.top_degree(net, config.top_k);
    metrics.top_betweenness = centrality.top_betweenness(net, config.top_k);
    log::info!(
        "similarity metrics: density {:.4}, clustering {:.3}, {} components",
        metrics.density,
        metrics.avg_clustering,
        metrics.connected_components
    );
    state.centrality = centrality;
    state.metrics = metrics;
    Ok(())
}

pub fn run_communities_phase(config: &PipelineConfig, state: &mut BenefitsState) -> Result<()> {
    let partition = detect_communities(&mut state.network, config.resolution);
    state.metrics.modularity = Some(partition.modularity);
    state.metrics.communities = Some(partition.len());
    state.partition = partition;
    Ok(())
}

pub fn run_charts_phase(config: &PipelineConfig, state: &mut BenefitsState) -> Result<()> {
    if !config.write_charts {
        log::info!("charts disabled");
        return Ok(());
    }
    let summary = state
        .summary
        .as_ref()
        .ok_or_else(|| PipelineError::empty("aggregating payments"))?;
    let out = &mut state.outputs;

    out.chart(
        "figures/value_distribution",
        &histogram(
            "Installment value distribution",
            "installment (R$)",
            &summary.sorted_values,
            50,
            true,
            "seagreen",
        ),
    )?;

    let mut by_value: Vec<(String, f64)> = summary
        .ufs
        .iter()
        .map(|u| (u.uf.clone(), u.total_value))
        .collect();
    by_value.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    out.chart(
        "figures/uf_values",
        &bar_chart("Total paid by UF", "total value (R$)", &by_value, "darkorange"),
    )?;

    let mut by_people: Vec<(String, f64)> = summary
        .ufs
        .iter()
        .map(|u| (u.uf.clone(), u.distinct as f64))
        .collect();
    by_people.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    out.chart(
        "figures/uf_beneficiaries",
        &bar_chart("Unique beneficiaries by UF", "beneficiaries", &by_people, "steelblue"),
    )?;

    let top: Vec<(String, f64)> = summary
        .top_municipalities(config.top_k)
        .into_iter()
        .map(|m| (format!("{}/{}", m.name, m.uf), m.value_total))
        .collect();
    out.chart(
        "figures/top_municipalities",
        &bar_chart("Top municipalities by total paid", "total value (R$)", &top, "indianred"),
    )?;

    out.chart(
        "figures/municipality_network",
        &network_chart(
            &state.network,
            "Municipality similarity network",
            config.max_chart_nodes,
            config.layout_iterations,
        ),
    )?;
    Ok(())
}

pub fn run_export_phase(config: &PipelineConfig, state: &mut BenefitsState) -> Result<()> {
    let summary = state
        .summary
        .as_ref()
        .ok_or_else(|| PipelineError::empty("aggregating payments"))?;
    let out = &mut state.outputs;

    out.csv("data/municipality_stats.csv", &summary.municipalities)?;
    out.csv("data/uf_summary.csv", &summary.ufs)?;
    out.csv("data/nodes.csv", &node_rows(&state.network, &state.centrality))?;
    out.text(
        "networks/municipality_network.graphml",
        &to_graphml(&state.network),
    )?;

    let stats = summary.descriptive();
    out.json("reports/descriptive_stats.json", &stats)?;
    out.json("reports/network_metrics.json", &state.metrics)?;

    let top = summary.top_municipalities(config.top_k);
    let report = benefits_report(&BenefitsReport {
        stats: &stats,
        network: &state.metrics,
        partition: &state.partition,
        top_municipalities: &top,
        threshold: config.similarity_threshold,
    });
    out.text("reports/report.txt", &report)?;

    log::info!(
        "exported {} files to {}",
        out.written().len(),
        config.output_dir
    );
    Ok(())
}
