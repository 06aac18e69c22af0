//! Command-line front end: run one request file through the worker and print
//! the result.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use serde_json::{json, Value};

use crate::finalize::{clusters_to_csv, false_negatives_to_csv};
use crate::settings::{AnalysisSettings, SettingsStore};
use crate::utils::init_logging;
use crate::worker::{AnalysisController, ANALYZE_DETAILS};

/// Command-line arguments for apnea-analyzer
#[derive(Parser, Debug)]
#[command(name = "apnea-analyzer")]
#[command(about = "Cluster apnea annotations and flag unannotated flow limitation")]
#[command(version)]
pub struct Args {
    /// Request file: an analyzeDetails message, its payload, or a bare array of detail rows
    pub input: PathBuf,

    /// Print clusters as CSV instead of JSON
    #[arg(long, conflicts_with = "fn_csv")]
    pub csv: bool,

    /// Print false-negative windows as CSV instead of JSON
    #[arg(long = "fn-csv")]
    pub fn_csv: bool,

    /// JSON file with engine defaults
    #[arg(short, long, env = "APNEA_ANALYZER_SETTINGS")]
    pub settings: Option<PathBuf>,

    /// Log at debug level
    #[arg(
        short,
        long,
        env = "APNEA_ANALYZER_DEBUG",
        value_parser = clap::builder::FalseyValueParser::new()
    )]
    pub debug: bool,
}

/// Accepts the three input shapes and always returns a full request message.
pub fn request_message_from(input: Value) -> Value {
    match input {
        Value::Array(rows) => json!({
            "action": ANALYZE_DETAILS,
            "payload": { "detailsData": rows },
        }),
        Value::Object(fields) if !fields.contains_key("action") => json!({
            "action": ANALYZE_DETAILS,
            "payload": Value::Object(fields),
        }),
        other => other,
    }
}

fn read_request(path: &Path) -> Result<Value> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read request from {}", path.display()))?;
    let input: Value = serde_json::from_str(&contents)
        .with_context(|| format!("Request in {} is not valid JSON", path.display()))?;
    Ok(request_message_from(input))
}

fn load_settings(path: Option<PathBuf>) -> Result<AnalysisSettings> {
    match path {
        Some(path) => Ok(SettingsStore::new(path)?.analysis_settings()),
        None => Ok(AnalysisSettings::default()),
    }
}

async fn execute(args: Args) -> Result<String> {
    let settings = load_settings(args.settings)?;
    let message = read_request(&args.input)?;

    let mut controller = AnalysisController::new(settings);
    controller.start()?;
    let pending = controller.submit_message(message).await?;
    let outcome = controller.resolve(pending).await;
    controller.terminate().await?;

    let result = outcome?.context("analysis response was superseded")?;
    let summary = result.summary();
    info!(
        "{} clusters ({} events), {} false-negative windows",
        summary.cluster_count, summary.clustered_event_count, summary.false_negative_count
    );

    if args.csv {
        return Ok(clusters_to_csv(&result.clusters));
    }
    if args.fn_csv {
        return Ok(false_negatives_to_csv(&result.false_negatives));
    }

    let output = json!({
        "clusters": result.clusters,
        "falseNegatives": result.false_negatives,
        "summary": summary,
    });
    let mut rendered = serde_json::to_string_pretty(&output)?;
    rendered.push('\n');
    Ok(rendered)
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    init_logging(args.debug);

    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    let output = runtime.block_on(execute(args))?;
    print!("{output}");
    Ok(())
}
