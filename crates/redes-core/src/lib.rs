//! Redes Core: network analysis of public-spending CSV exports.
//!
//! This crate contains all analysis logic: CSV loading and cleaning, graph
//! construction, centrality and community metrics, and export of tables,
//! graph files, charts and reports.

pub mod config;
pub mod data;
pub mod error;
pub mod export;
pub mod graph;
pub mod metrics;
pub mod output;
pub mod phases;
pub mod pipeline;
