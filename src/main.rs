//! Command-line entry points: single-image extraction and the
//! multi-model evaluation harness.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use cargoscan::config;
use cargoscan::eval::{self, EvalConfig};
use cargoscan::extraction::ContainerExtractor;
use cargoscan::llm::OpenRouterClient;
use cargoscan::output;

#[derive(Parser)]
#[command(name = config::APP_NAME, version = config::APP_VERSION)]
#[command(about = "Extract and validate shipping container IDs from images")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Extract container records from a single image.
    Extract {
        /// Path to the container image (JPEG, PNG or TIFF).
        image: PathBuf,

        /// Where to write the extracted records as JSON.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Vision model identifier, e.g. "google/gemini-2.5-flash".
        #[arg(short, long, default_value = config::DEFAULT_MODEL)]
        model: String,

        /// OpenRouter API key.
        #[arg(long, env = config::API_KEY_ENV, hide_env_values = true)]
        api_key: String,

        /// Total collaborator round budget, including the initial
        /// extraction. 1 disables correction.
        #[arg(long, default_value_t = config::DEFAULT_MAX_ITERATIONS)]
        max_iterations: u32,
    },

    /// Run the evaluation grid over models and labelled test cases.
    Eval {
        /// Semicolon-separated model identifiers.
        #[arg(short, long, required = true, value_delimiter = ';')]
        models: Vec<String>,

        /// Specific test case names; all discovered cases when empty.
        #[arg(short, long, value_delimiter = ',')]
        test_cases: Vec<String>,

        /// Directory with images/ and answers/ subdirectories.
        #[arg(long, default_value = "test_data")]
        data_dir: PathBuf,

        /// Concurrent worker threads.
        #[arg(long, default_value_t = 8)]
        max_workers: usize,

        /// Round budget passed to every extraction session.
        #[arg(long, default_value_t = config::DEFAULT_MAX_ITERATIONS)]
        max_iterations: u32,

        /// Where to write the JSON report.
        #[arg(short, long)]
        report: Option<PathBuf>,

        /// OpenRouter API key.
        #[arg(long, env = config::API_KEY_ENV, hide_env_values = true)]
        api_key: String,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    match Cli::parse().command {
        Command::Extract {
            image,
            output,
            model,
            api_key,
            max_iterations,
        } => run_extract(image, output, &model, &api_key, max_iterations),
        Command::Eval {
            models,
            test_cases,
            data_dir,
            max_workers,
            max_iterations,
            report,
            api_key,
        } => run_eval(EvalConfig {
            models,
            test_cases,
            data_dir,
            api_key,
            max_iterations,
            max_workers,
        }, report),
    }
}

fn run_extract(
    image: PathBuf,
    output: Option<PathBuf>,
    model: &str,
    api_key: &str,
    max_iterations: u32,
) -> anyhow::Result<()> {
    let client = OpenRouterClient::openrouter(api_key);
    let extractor = ContainerExtractor::new(Box::new(client), model, max_iterations);

    let outcome = extractor
        .extract_from_path(&image)
        .with_context(|| format!("extraction failed for {}", image.display()))?;

    println!(
        "Found {} container(s) [{}, {} correction round(s)]:",
        outcome.records.len(),
        if outcome.converged() { "converged" } else { "budget exhausted" },
        outcome.correction_attempts,
    );
    for record in &outcome.records {
        let id = record.record.container_id.as_deref().unwrap_or("(missing)");
        let mark = if record.id_valid { "ok" } else { "INVALID" };
        println!("  {id:<14} {mark}");
    }
    if let Some(error) = &outcome.transport_error {
        eprintln!("Warning: correction loop ended early: {error}");
    }

    let path = output.unwrap_or_else(config::default_output_path);
    output::write_json(&outcome.records, &path)
        .with_context(|| format!("failed to write {}", path.display()))?;
    println!("Results written to {}", path.display());

    Ok(())
}

fn run_eval(config: EvalConfig, report_path: Option<PathBuf>) -> anyhow::Result<()> {
    let results = eval::run(&config).context("evaluation run failed")?;
    let report = eval::build_report(results, &config.models);
    eval::print_summary(&report);

    let path = report_path.unwrap_or_else(config::default_report_path);
    output::write_json(&report, &path)
        .with_context(|| format!("failed to write {}", path.display()))?;
    println!("\nReport written to {}", path.display());

    Ok(())
}
