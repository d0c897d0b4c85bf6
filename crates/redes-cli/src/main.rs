//! Redes CLI: network analysis of Brazilian public-spending exports.

use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{Args, Parser, Subcommand};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

use redes_core::config::{AnalysisResult, PipelineConfig};
use redes_core::data::aggregate::PaymentAggregator;
use redes_core::data::loader::stream_payments;
use redes_core::export::report::{brl, thousands};
use redes_core::pipeline;

#[derive(Parser)]
#[command(
    name = "redes",
    version,
    about = "Redes - Network analysis of grants and benefit payments"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Agency ↔ recipient network from a grants ("convênios") export
    Grants(RunArgs),

    /// Municipality similarity network from a benefit-payment export
    Benefits(RunArgs),

    /// Summarise a payment export without writing any file
    Explore {
        /// CSV file or directory of CSV files
        path: PathBuf,

        /// Field delimiter
        #[arg(long, default_value = ";")]
        delimiter: char,

        /// Number of municipalities to list
        #[arg(long, default_value = "10")]
        top_k: usize,
    },
}

#[derive(Args)]
struct RunArgs {
    /// CSV file or directory of CSV files
    path: PathBuf,

    /// Directory receiving data/, figures/, networks/ and reports/
    #[arg(short, long, default_value = "outputs")]
    output_dir: String,

    /// Agencies kept in the grants network, by number of agreements
    #[arg(long, default_value = "50")]
    top_agencies: usize,

    /// Cosine similarity a municipality pair must exceed to be linked
    #[arg(long, default_value = "0.85")]
    threshold: f64,

    /// Louvain resolution parameter
    #[arg(long, default_value = "1.0")]
    resolution: f64,

    /// Length of the centrality rankings
    #[arg(long, default_value = "10")]
    top_k: usize,

    /// Shortest-path sources for betweenness; larger networks are sampled (0 = exact)
    #[arg(long, default_value = "1000")]
    path_sources: usize,

    /// Field delimiter
    #[arg(long, default_value = ";")]
    delimiter: char,

    /// Skip the chart figures
    #[arg(long)]
    no_charts: bool,

    /// Debug logging and per-phase timing breakdown
    #[arg(long)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(long)]
    quiet: bool,
}

impl RunArgs {
    fn into_config(self) -> PipelineConfig {
        let input = self.path.canonicalize().unwrap_or(self.path);
        PipelineConfig {
            input_path: input.to_string_lossy().to_string(),
            output_dir: self.output_dir,
            delimiter: delimiter_byte(self.delimiter),
            top_agencies: self.top_agencies,
            similarity_threshold: self.threshold,
            resolution: self.resolution,
            top_k: self.top_k,
            path_sources: self.path_sources,
            write_charts: !self.no_charts,
            verbose: self.verbose,
            quiet: self.quiet,
            ..Default::default()
        }
    }
}

type Runner = fn(
    &PipelineConfig,
    Option<pipeline::ProgressCallback>,
) -> redes_core::error::Result<AnalysisResult>;

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Grants(args) => {
            let config = args.into_config();
            init_logging(config.verbose, config.quiet);
            run(&config, "Grants", pipeline::run_grants_pipeline);
        }
        Commands::Benefits(args) => {
            let config = args.into_config();
            init_logging(config.verbose, config.quiet);
            run(&config, "Benefits", pipeline::run_benefits_pipeline);
        }
        Commands::Explore {
            path,
            delimiter,
            top_k,
        } => {
            init_logging(false, false);
            explore(&path, delimiter_byte(delimiter), top_k);
        }
    }
}

fn delimiter_byte(c: char) -> u8 {
    if c.is_ascii() {
        c as u8
    } else {
        eprintln!("Delimiter must be a single ASCII character, got {c:?}");
        std::process::exit(1);
    }
}

/// `RUST_LOG` wins; otherwise `--quiet` → error, `--verbose` → debug, else info.
fn init_logging(verbose: bool, quiet: bool) {
    let default_level = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(config: &PipelineConfig, title: &str, runner: Runner) {
    if config.quiet {
        if let Err(e) = runner(config, None) {
            eprintln!("Analysis failed: {e}");
            std::process::exit(1);
        }
        return;
    }

    let pb = spinner();
    let progress: pipeline::ProgressCallback = {
        let pb = pb.clone();
        Box::new(move |_name, label| {
            pb.set_message(label.to_string());
        })
    };

    let start = Instant::now();
    let result = match runner(config, Some(progress)) {
        Ok(r) => r,
        Err(e) => {
            pb.finish_and_clear();
            eprintln!("Analysis failed: {e}");
            std::process::exit(1);
        }
    };
    pb.finish_and_clear();

    print_summary(config, title, &result);

    let duration = start.elapsed();
    println!(
        "  {:<16} {:.1}ms",
        "Duration:",
        duration.as_secs_f64() * 1000.0
    );

    if config.verbose {
        if let Some(serde_json::Value::Object(timings)) = result.metadata.get("phase_timings") {
            println!("\n  Phase Timings:");
            for (phase, secs) in timings {
                if let Some(val) = secs.as_f64() {
                    println!("    {:<14} {:.1}ms", phase, val * 1000.0);
                }
            }
        }
    }

    println!(
        "\n  {} {} ({} files)",
        style("Output written to:").green(),
        config.output_dir,
        result.outputs.len()
    );
}

fn spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    let template = ProgressStyle::with_template("{spinner:.blue} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    pb.set_style(template.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]));
    pb.set_message("Initialising...");
    pb.enable_steady_tick(std::time::Duration::from_millis(80));
    pb
}

fn stat<'a>(result: &'a AnalysisResult, key: &str) -> &'a serde_json::Value {
    static MISSING: serde_json::Value = serde_json::Value::Null;
    result.stats.get(key).unwrap_or(&MISSING)
}

fn print_summary(config: &PipelineConfig, title: &str, result: &AnalysisResult) {
    println!(
        "\n{}  {} Analysis: {}",
        style("✓").green().bold(),
        title,
        style(
            Path::new(&config.input_path)
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default()
        )
        .bold()
    );

    let keys: &[(&str, &str)] = match result.pipeline {
        redes_core::config::PipelineKind::Grants => &[
            ("Rows kept:", "rows_kept"),
            ("Agencies:", "agencies"),
            ("Recipients:", "recipients"),
            ("Edges:", "edges"),
            ("Communities:", "communities"),
        ],
        redes_core::config::PipelineKind::Benefits => &[
            ("Rows kept:", "rows_kept"),
            ("Municipalities:", "municipalities"),
            ("Beneficiaries:", "unique_beneficiaries"),
            ("Edges:", "edges"),
            ("Communities:", "communities"),
        ],
    };
    for (label, key) in keys {
        println!("  {:<16} {}", label, stat(result, key));
    }
    if let Some(total) = stat(result, "total_value").as_f64() {
        println!("  {:<16} {}", "Total value:", brl(total));
    }
    if let Some(modularity) = stat(result, "modularity").as_f64() {
        println!("  {:<16} {:.4}", "Modularity:", modularity);
    }

    if let Some(top) = result.top_degree.first() {
        println!(
            "  {:<16} {} ({:.4})",
            "Most connected:",
            style(&top.label).cyan(),
            top.score
        );
    }
}

fn explore(path: &Path, delimiter: u8, top_k: usize) {
    let pb = spinner();
    pb.set_message("Streaming payments");

    let mut aggregator = PaymentAggregator::new();
    let report = match stream_payments(path, delimiter, |record| aggregator.push(record)) {
        Ok(r) => r,
        Err(e) => {
            pb.finish_and_clear();
            eprintln!("Exploration failed: {e}");
            std::process::exit(1);
        }
    };
    let summary = aggregator.finish();
    pb.finish_and_clear();

    println!(
        "\n{}  Payment export: {}",
        style("✓").green().bold(),
        style(path.display()).bold()
    );
    println!("  {:<16} {}", "Files:", report.files);
    println!("  {:<16} {}", "Rows read:", thousands(report.rows_read));
    println!("  {:<16} {}", "Rows kept:", thousands(report.rows_kept));
    for (reason, count) in &report.skipped {
        println!("    {:<14} {}", format!("{reason}:"), thousands(*count));
    }
    println!("  {:<16} {}", "UFs:", summary.ufs.len());
    println!("  {:<16} {}", "Municipalities:", thousands(summary.municipalities.len()));
    println!(
        "  {:<16} {}",
        "Beneficiaries:",
        thousands(summary.unique_beneficiaries)
    );
    if let Some(period) = &summary.period {
        println!("  {:<16} {}", "Competence:", period);
    }

    println!("\n  Installment values:");
    println!("    {:<14} {}", "total", brl(summary.values.total));
    println!("    {:<14} {}", "mean", brl(summary.values.mean));
    println!("    {:<14} {}", "median", brl(summary.values.median));
    println!("    {:<14} {}", "std", brl(summary.values.std));
    println!("    {:<14} {}", "min", brl(summary.values.min));
    println!("    {:<14} {}", "max", brl(summary.values.max));

    println!("\n  Top {top_k} municipalities by total paid:");
    for (i, m) in summary.top_municipalities(top_k).iter().enumerate() {
        println!(
            "    {:>2}. {:<32} {:<3} {:>20}  {} beneficiaries",
            i + 1,
            m.name,
            m.uf,
            brl(m.value_total),
            thousands(m.unique_beneficiaries)
        );
    }
}
