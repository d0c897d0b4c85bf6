//! Core data types and configuration for network analysis runs.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{PipelineError, Result};

/// Kind of entity represented by a graph node.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Agency,
    Recipient,
    Municipality,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Agency => "agency",
            Self::Recipient => "recipient",
            Self::Municipality => "municipality",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which of the two analyses a run performs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PipelineKind {
    Grants,
    Benefits,
}

impl PipelineKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Grants => "grants",
            Self::Benefits => "benefits",
        }
    }
}

/// One cleaned row of the grants ("convênios") export.
#[derive(Debug, Clone, PartialEq)]
pub struct GrantRecord {
    pub number: Option<String>,
    pub agency_code: Option<String>,
    pub agency: String,
    pub recipient_code: Option<String>,
    pub recipient: String,
    pub value: f64,
    pub released: f64,
    pub published: Option<NaiveDate>,
    pub uf: String,
    pub municipality_code: Option<String>,
    /// 1-based line in the source file, header excluded.
    pub line: usize,
}

/// One cleaned installment row of the benefit-payment export.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentRecord {
    pub competence: Option<String>,
    pub reference: Option<String>,
    pub uf: String,
    pub municipality_code: String,
    pub municipality: String,
    pub cpf: String,
    pub nis: String,
    pub beneficiary: String,
    pub value: f64,
    pub line: usize,
}

/// Placeholder stored when a payment row has no CPF.
pub const NO_CPF: &str = "SEM_CPF";
/// Placeholder stored when a payment row has no NIS.
pub const NO_NIS: &str = "SEM_NIS";
/// Placeholder stored when a grant row has no UF.
pub const NO_UF: &str = "N/A";

/// Aggregated payment figures for one municipality.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MunicipalityStats {
    pub code: String,
    pub name: String,
    pub uf: String,
    pub value_mean: f64,
    pub value_std: f64,
    pub value_total: f64,
    pub installments: usize,
    pub unique_beneficiaries: usize,
    pub with_cpf: usize,
    pub cpf_ratio: f64,
    pub value_per_capita: f64,
}

/// Per-agency row of the grants metrics table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgencyMetrics {
    pub agency: String,
    pub degree: usize,
    pub degree_centrality: f64,
    pub betweenness: f64,
    pub total_value: f64,
    pub recipients: usize,
    pub agreements: usize,
}

/// One aggregated agency → recipient relation, as exported.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConnectionRow {
    pub agency: String,
    pub recipient: String,
    pub total_value: f64,
    pub agreements: usize,
    pub uf: String,
}

/// Totals for one federative unit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UfSummary {
    pub uf: String,
    pub total_value: f64,
    pub mean_value: f64,
    pub std_value: f64,
    pub records: usize,
    /// Distinct agencies (grants) or distinct beneficiaries (benefits).
    pub distinct: usize,
}

/// A detected community of nodes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Community {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub members: Vec<String>,
    #[serde(default)]
    pub cohesion: f64,
}

/// A node id with a score, used by the top-k rankings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RankedNode {
    pub id: String,
    pub label: String,
    pub score: f64,
}

/// Configuration for a pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub input_path: String,
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
    #[serde(default = "default_delimiter")]
    pub delimiter: u8,
    #[serde(default = "default_top_agencies")]
    pub top_agencies: usize,
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,
    #[serde(default = "default_resolution")]
    pub resolution: f64,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// Cap on shortest-path sources for betweenness and average path
    /// length; larger networks are sampled. 0 means always exact.
    #[serde(default = "default_path_sources")]
    pub path_sources: usize,
    #[serde(default = "default_max_chart_nodes")]
    pub max_chart_nodes: usize,
    #[serde(default = "default_layout_iterations")]
    pub layout_iterations: usize,
    #[serde(default = "default_write_charts")]
    pub write_charts: bool,
    #[serde(default)]
    pub verbose: bool,
    #[serde(default)]
    pub quiet: bool,
}

fn default_output_dir() -> String {
    "outputs".to_string()
}
fn default_delimiter() -> u8 {
    b';'
}
fn default_top_agencies() -> usize {
    50
}
fn default_similarity_threshold() -> f64 {
    0.85
}
fn default_resolution() -> f64 {
    1.0
}
fn default_top_k() -> usize {
    10
}
fn default_path_sources() -> usize {
    1000
}
fn default_max_chart_nodes() -> usize {
    300
}
fn default_layout_iterations() -> usize {
    100
}
fn default_write_charts() -> bool {
    true
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input_path: String::new(),
            output_dir: default_output_dir(),
            delimiter: default_delimiter(),
            top_agencies: default_top_agencies(),
            similarity_threshold: default_similarity_threshold(),
            resolution: default_resolution(),
            top_k: default_top_k(),
            path_sources: default_path_sources(),
            max_chart_nodes: default_max_chart_nodes(),
            layout_iterations: default_layout_iterations(),
            write_charts: default_write_charts(),
            verbose: false,
            quiet: false,
        }
    }
}

impl PipelineConfig {
    /// Reject parameter combinations no phase can work with.
    pub fn validate(&self) -> Result<()> {
        if self.input_path.trim().is_empty() {
            return Err(PipelineError::InvalidConfig(
                "input path is empty".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            return Err(PipelineError::InvalidConfig(format!(
                "similarity threshold {} outside [0, 1]",
                self.similarity_threshold
            )));
        }
        if self.resolution.is_nan() || self.resolution <= 0.0 {
            return Err(PipelineError::InvalidConfig(format!(
                "resolution must be positive, got {}",
                self.resolution
            )));
        }
        if self.top_agencies == 0 {
            return Err(PipelineError::InvalidConfig(
                "top_agencies must be at least 1".to_string(),
            ));
        }
        if matches!(self.delimiter, b'"' | b'\n' | b'\r') {
            return Err(PipelineError::InvalidConfig(format!(
                "unusable delimiter {:?}",
                self.delimiter as char
            )));
        }
        Ok(())
    }
}

/// Result of a pipeline run, written as `analysis.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    #[serde(default = "default_version")]
    pub version: String,
    pub pipeline: PipelineKind,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub stats: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub top_degree: Vec<RankedNode>,
    #[serde(default)]
    pub top_betweenness: Vec<RankedNode>,
    #[serde(default)]
    pub communities: Vec<CommunityOutput>,
    #[serde(default)]
    pub outputs: Vec<String>,
}

fn default_version() -> String {
    "1.0".to_string()
}

/// Community in the output JSON; members are listed by label.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommunityOutput {
    pub id: String,
    pub label: String,
    pub size: usize,
    pub cohesion: f64,
    pub members: Vec<String>,
}
