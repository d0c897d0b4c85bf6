//! Shared test helpers for integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use redes_core::config::{GrantRecord, PipelineConfig};
use redes_core::data::aggregate::{PaymentAggregator, PaymentSummary};
use redes_core::data::loader::{load_grants, stream_payments, LoadReport};

// ---------------------------------------------------------------------------
// Fixture path resolution
// ---------------------------------------------------------------------------

/// Resolve `tests/fixtures/{name}` relative to the workspace root.
pub fn fixture_path(name: &str) -> PathBuf {
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    Path::new(manifest_dir)
        .join("../../tests/fixtures")
        .join(name)
        .canonicalize()
        .unwrap_or_else(|_| {
            Path::new(manifest_dir)
                .join("../../tests/fixtures")
                .join(name)
        })
}

// ---------------------------------------------------------------------------
// Loaders
// ---------------------------------------------------------------------------

/// Cleaned rows of `grants.csv`.
pub fn fixture_grants() -> (Vec<GrantRecord>, LoadReport) {
    load_grants(&fixture_path("grants.csv"), b';').unwrap()
}

/// `payments.csv` streamed through the aggregator.
pub fn fixture_payments() -> (PaymentSummary, LoadReport) {
    let mut aggregator = PaymentAggregator::new();
    let report = stream_payments(&fixture_path("payments.csv"), b';', |r| aggregator.push(r))
        .unwrap();
    (aggregator.finish(), report)
}

/// Config pointing `fixture` at `output_dir`, small enough for fast layouts.
pub fn fixture_config(fixture: &str, output_dir: &Path) -> PipelineConfig {
    PipelineConfig {
        input_path: fixture_path(fixture).to_string_lossy().to_string(),
        output_dir: output_dir.to_string_lossy().to_string(),
        layout_iterations: 20,
        ..Default::default()
    }
}

/// Write `content` to `dir/name` and return the path.
pub fn write_csv(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

pub fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}
