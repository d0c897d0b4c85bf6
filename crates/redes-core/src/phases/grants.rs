//! Phases of the grants analysis: agency ↔ recipient network.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;

use crate::config::{
    AgencyMetrics, ConnectionRow, EntityKind, GrantRecord, PipelineConfig, UfSummary,
};
use crate::data::loader::{load_grants, LoadReport};
use crate::error::Result;
use crate::export::charts::{bar_chart, histogram, network_chart};
use crate::export::graph_formats::{to_gexf, to_graphml};
use crate::export::report::{grants_report, GrantsReport};
use crate::export::tables::node_rows;
use crate::export::OutputDir;
use crate::graph::bipartite::{
    build_bipartite, connection_rows, project_agencies, top_agencies, uf_summary,
};
use crate::graph::network::Network;
use crate::metrics::centrality::Centrality;
use crate::metrics::communities::{detect_communities, Partition};
use crate::metrics::stats::{concentration, ValueSummary};
use crate::metrics::structure::NetworkMetrics;

/// Everything the grants phases produce, filled in phase order.
#[derive(Debug)]
pub struct GrantsState {
    pub records: Vec<GrantRecord>,
    pub load: LoadReport,
    pub values: ValueSummary,
    pub agencies: Vec<String>,
    pub network: Network,
    pub projection: Network,
    pub centrality: Centrality,
    pub metrics: NetworkMetrics,
    pub agency_metrics: Vec<AgencyMetrics>,
    pub connections: Vec<ConnectionRow>,
    pub ufs: Vec<UfSummary>,
    pub partition: Partition,
    pub outputs: OutputDir,
}

impl GrantsState {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            records: Vec::new(),
            load: LoadReport::default(),
            values: ValueSummary::default(),
            agencies: Vec::new(),
            network: Network::new(),
            projection: Network::new(),
            centrality: Centrality::default(),
            metrics: NetworkMetrics::default(),
            agency_metrics: Vec::new(),
            connections: Vec::new(),
            ufs: Vec::new(),
            partition: Partition {
                communities: Vec::new(),
                modularity: 0.0,
            },
            outputs: OutputDir::new(&config.output_dir),
        }
    }
}

/// `descriptive_stats.json` for grants.
#[derive(Debug, Clone, Serialize)]
pub struct GrantStats {
    pub records: usize,
    pub agencies_selected: usize,
    pub values: ValueSummary,
    pub by_uf: BTreeMap<String, UfSummary>,
    pub top5_concentration: f64,
    pub top10_concentration: f64,
}

pub fn run_load_phase(config: &PipelineConfig, state: &mut GrantsState) -> Result<()> {
    let (records, report) = load_grants(Path::new(&config.input_path), config.delimiter)?;
    let mut values: Vec<f64> = records.iter().map(|r| r.value).collect();
    state.values = ValueSummary::from_values(&mut values);
    state.ufs = uf_summary(&records);
    state.records = records;
    state.load = report;
    Ok(())
}

pub fn run_network_phase(config: &PipelineConfig, state: &mut GrantsState) -> Result<()> {
    state.agencies = top_agencies(&state.records, config.top_agencies);
    state.network = build_bipartite(&state.records, &state.agencies);
    state.projection = project_agencies(&state.network);
    state.connections = connection_rows(&state.network);
    Ok(())
}

pub fn run_metrics_phase(config: &PipelineConfig, state: &mut GrantsState) -> Result<()> {
    let net = &state.network;
    if config.path_sources > 0 && net.node_count() > config.path_sources {
        log::info!(
            "grants network has {} nodes; sampling {} shortest-path sources",
            net.node_count(),
            config.path_sources
        );
    }
    let centrality = Centrality::compute_with(net, config.path_sources);
    let mut metrics = NetworkMetrics::compute_with(net, config.path_sources);
    metrics.top_degree = centrality.top_degree(net, config.top_k);
    metrics.top_betweenness = centrality.top_betweenness(net, config.top_k);

    let graph = net.inner_graph();
    let mut agency_metrics: Vec<AgencyMetrics> = graph
        .node_indices()
        .filter(|&idx| graph[idx].kind == EntityKind::Agency)
        .map(|idx| {
            let degree = graph.edges(idx).count();
            AgencyMetrics {
                agency: graph[idx].label.clone(),
                degree,
                degree_centrality: centrality.degree[idx.index()],
                betweenness: centrality.betweenness[idx.index()],
                total_value: graph[idx].value,
                recipients: degree,
                agreements: graph.edges(idx).map(|e| e.weight().count).sum(),
            }
        })
        .collect();
    agency_metrics.sort_by(|a, b| {
        b.total_value
            .total_cmp(&a.total_value)
            .then_with(|| a.agency.cmp(&b.agency))
    });

    log::info!(
        "grants metrics: density {:.6}, {} components",
        metrics.density,
        metrics.connected_components
    );
    state.centrality = centrality;
    state.metrics = metrics;
    state.agency_metrics = agency_metrics;
    Ok(())
}

/// Louvain over the agency projection; agencies in the bipartite network
/// inherit the community of their projection node.
pub fn run_communities_phase(config: &PipelineConfig, state: &mut GrantsState) -> Result<()> {
    let partition = detect_communities(&mut state.projection, config.resolution);
    for (i, c) in partition.communities.iter().enumerate() {
        for id in &c.members {
            state.network.set_community(id, i);
        }
    }
    state.metrics.modularity = Some(partition.modularity);
    state.metrics.communities = Some(partition.len());
    state.partition = partition;
    Ok(())
}

pub fn run_charts_phase(config: &PipelineConfig, state: &mut GrantsState) -> Result<()> {
    if !config.write_charts {
        log::info!("charts disabled");
        return Ok(());
    }
    let out = &mut state.outputs;

    let top: Vec<(String, f64)> = state
        .agency_metrics
        .iter()
        .take(10)
        .map(|a| (a.agency.clone(), a.total_value))
        .collect();
    out.chart(
        "figures/top_agencies",
        &bar_chart("Top 10 agencies by agreed value", "total value (R$)", &top, "steelblue"),
    )?;

    let mut ufs: Vec<(String, f64)> = state
        .ufs
        .iter()
        .map(|u| (u.uf.clone(), u.total_value))
        .collect();
    ufs.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ufs.truncate(15);
    out.chart(
        "figures/uf_distribution",
        &bar_chart("Agreed value by UF", "total value (R$)", &ufs, "darkorange"),
    )?;

    out.chart(
        "figures/collaboration_network",
        &network_chart(
            &state.projection,
            "Agency collaboration network (shared recipients)",
            config.max_chart_nodes,
            config.layout_iterations,
        ),
    )?;

    let values: Vec<f64> = state.connections.iter().map(|c| c.total_value).collect();
    out.chart(
        "figures/value_distribution",
        &histogram(
            "Agreement value per connection",
            "value (R$)",
            &values,
            50,
            true,
            "seagreen",
        ),
    )?;

    let degrees: Vec<f64> = state
        .agency_metrics
        .iter()
        .map(|a| a.degree as f64)
        .collect();
    out.chart(
        "figures/degree_distribution",
        &histogram(
            "Agency degree distribution",
            "degree (recipients)",
            &degrees,
            20,
            false,
            "mediumpurple",
        ),
    )?;
    Ok(())
}

pub fn run_export_phase(config: &PipelineConfig, state: &mut GrantsState) -> Result<()> {
    let out = &mut state.outputs;
    out.csv("data/agency_metrics.csv", &state.agency_metrics)?;
    out.csv("data/network_edges.csv", &state.connections)?;
    out.csv("data/uf_summary.csv", &state.ufs)?;
    out.csv("data/nodes.csv", &node_rows(&state.network, &state.centrality))?;

    out.text("networks/grants_network.gexf", &to_gexf(&state.network))?;
    out.text("networks/agency_projection.graphml", &to_graphml(&state.projection))?;

    let totals: Vec<f64> = state.agency_metrics.iter().map(|a| a.total_value).collect();
    let stats = GrantStats {
        records: state.records.len(),
        agencies_selected: state.agencies.len(),
        values: state.values.clone(),
        by_uf: state
            .ufs
            .iter()
            .map(|u| (u.uf.clone(), u.clone()))
            .collect(),
        top5_concentration: concentration(&totals, 5),
        top10_concentration: concentration(&totals, 10),
    };
    out.json("reports/descriptive_stats.json", &stats)?;
    out.json("reports/network_metrics.json", &state.metrics)?;

    let report = grants_report(&GrantsReport {
        agencies: &state.agency_metrics,
        connections: &state.connections,
        values: &state.values,
        network: &state.metrics,
        partition: &state.partition,
    });
    out.text("reports/report.txt", &report)?;

    log::info!(
        "exported {} files to {}",
        out.written().len(),
        config.output_dir
    );
    Ok(())
}
