//! Sequential phase orchestrator with timing.

use std::collections::HashMap;
use std::time::Instant;

use crate::config::{AnalysisResult, PipelineConfig};
use crate::error::Result;
use crate::output::{build_benefits_result, build_grants_result, write_output, ANALYSIS_FILE};
use crate::phases;
use crate::phases::benefits::BenefitsState;
use crate::phases::grants::GrantsState;

/// Phase labels for progress reporting.
const PHASE_LABELS: &[(&str, &str)] = &[
    ("load", "Loading and cleaning CSV rows"),
    ("network", "Building network"),
    ("metrics", "Computing centrality and structure"),
    ("communities", "Detecting communities"),
    ("charts", "Drawing charts"),
    ("export", "Writing tables, graphs and reports"),
];

/// Progress callback type: (phase_name, label).
pub type ProgressCallback = Box<dyn FnMut(&str, &str)>;

/// Type alias for phase function closures to keep signatures readable.
type PhaseFn<S> = Box<dyn FnOnce(&PipelineConfig, &mut S) -> Result<()>>;

/// Run `phase_fns` in order, reporting progress and recording per-phase
/// seconds into `timings`.
fn run_phases<S>(
    config: &PipelineConfig,
    state: &mut S,
    phase_fns: Vec<(&'static str, PhaseFn<S>)>,
    progress_callback: &mut Option<ProgressCallback>,
    timings: &mut HashMap<String, f64>,
) -> Result<()> {
    for (name, phase_fn) in phase_fns {
        // Report progress
        if let Some(cb) = progress_callback.as_mut() {
            let label = PHASE_LABELS
                .iter()
                .find(|(n, _)| *n == name)
                .map(|(_, l)| *l)
                .unwrap_or(name);
            cb(name, label);
        }
        log::info!("phase {name} started");

        let start = Instant::now();
        phase_fn(config, state)?;
        let elapsed = start.elapsed().as_secs_f64();
        log::info!("phase {name} finished in {elapsed:.3}s");
        timings.insert(name.to_string(), elapsed);
    }
    Ok(())
}

/// Execute the grants analysis, write every output including
/// `analysis.json`, and return the result document.
pub fn run_grants_pipeline(
    config: &PipelineConfig,
    mut progress_callback: Option<ProgressCallback>,
) -> Result<AnalysisResult> {
    config.validate()?;
    let mut state = GrantsState::new(config);
    let mut timings: HashMap<String, f64> = HashMap::new();
    let total_start = Instant::now();

    let phase_fns: Vec<(&str, PhaseFn<GrantsState>)> = vec![
        ("load", Box::new(phases::grants::run_load_phase)),
        ("network", Box::new(phases::grants::run_network_phase)),
        ("metrics", Box::new(phases::grants::run_metrics_phase)),
        ("communities", Box::new(phases::grants::run_communities_phase)),
        ("charts", Box::new(phases::grants::run_charts_phase)),
        ("export", Box::new(phases::grants::run_export_phase)),
    ];
    run_phases(
        config,
        &mut state,
        phase_fns,
        &mut progress_callback,
        &mut timings,
    )?;

    let total_ms = total_start.elapsed().as_secs_f64() * 1000.0;
    let result = build_grants_result(config, &state, &timings, total_ms);
    write_output(&result, &state.outputs.path(ANALYSIS_FILE))?;
    Ok(result)
}

/// Execute the benefits analysis, write every output including
/// `analysis.json`, and return the result document.
pub fn run_benefits_pipeline(
    config: &PipelineConfig,
    mut progress_callback: Option<ProgressCallback>,
) -> Result<AnalysisResult> {
    config.validate()?;
    let mut state = BenefitsState::new(config);
    let mut timings: HashMap<String, f64> = HashMap::new();
    let total_start = Instant::now();

    let phase_fns: Vec<(&str, PhaseFn<BenefitsState>)> = vec![
        ("load", Box::new(phases::benefits::run_load_phase)),
        ("network", Box::new(phases::benefits::run_network_phase)),
        ("metrics", Box::new(phases::benefits::run_metrics_phase)),
        ("communities", Box::new(phases::benefits::run_communities_phase)),
        ("charts", Box::new(phases::benefits::run_charts_phase)),
        ("export", Box::new(phases::benefits::run_export_phase)),
    ];
    run_phases(
        config,
        &mut state,
        phase_fns,
        &mut progress_callback,
        &mut timings,
    )?;

    let total_ms = total_start.elapsed().as_secs_f64() * 1000.0;
    let result = build_benefits_result(config, &state, &timings, total_ms)?;
    write_output(&result, &state.outputs.path(ANALYSIS_FILE))?;
    Ok(result)
}
