use std::cell::Cell;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use infolm_rs::{InfoLmConfig, InfoLmScorerBuilder, InformationMeasure, ProgressObserver};

#[path = "infolm/json_report_formatter.rs"]
mod json_report_formatter;

use json_report_formatter::{write_report, Report, ReportMeta};

#[derive(Debug, Parser)]
#[command(name = "infolm")]
#[command(about = "Score candidate sentences against references with InfoLM")]
struct Args {
    #[arg(long, env = "INFOLM_MODEL_DIR", default_value = "models/bert-base-uncased")]
    model_dir: PathBuf,

    /// Candidate sentences, one per line.
    #[arg(long)]
    preds: PathBuf,

    /// Reference sentences, one per line, aligned with `--preds`.
    #[arg(long)]
    targets: PathBuf,

    #[arg(long, env = "INFOLM_MEASURE", default_value = "kl_divergence")]
    measure: String,

    #[arg(long)]
    alpha: Option<f64>,

    #[arg(long)]
    beta: Option<f64>,

    #[arg(long, default_value_t = InfoLmConfig::DEFAULT_TEMPERATURE)]
    temperature: f64,

    /// Defaults to the model config's `max_length`.
    #[arg(long)]
    max_length: Option<usize>,

    #[arg(long, default_value_t = InfoLmConfig::DEFAULT_BATCH_SIZE)]
    batch_size: usize,

    #[arg(long, env = "INFOLM_DEVICE", default_value = "cpu")]
    device: String,

    #[arg(long)]
    no_idf: bool,

    #[arg(long)]
    out: Option<PathBuf>,
}

const PASS_LABELS: [&str; 2] = ["preds", "targets"];

/// One bar over both passes; the message names the pass in progress.
struct BarObserver {
    bar: ProgressBar,
    completed_passes: Cell<usize>,
}

impl BarObserver {
    fn new(total: usize) -> Self {
        let bar = ProgressBar::new(total as u64);
        bar.set_style(
            ProgressStyle::with_template(
                "[{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} ({eta}) {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-"),
        );
        Self::with_bar(bar)
    }

    fn with_bar(bar: ProgressBar) -> Self {
        bar.set_message(pass_label(0));
        Self {
            bar,
            completed_passes: Cell::new(0),
        }
    }
}

fn pass_label(completed_passes: usize) -> &'static str {
    PASS_LABELS.get(completed_passes).copied().unwrap_or("done")
}

impl ProgressObserver for BarObserver {
    fn on_batch(&self, processed: usize, total: usize) {
        self.bar.inc(1);
        if processed == total {
            let completed = self.completed_passes.get() + 1;
            self.completed_passes.set(completed);
            self.bar.set_message(pass_label(completed));
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if let Err(message) = run() {
        eprintln!("error: {message}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let args = Args::parse();

    let preds = read_lines(&args.preds)?;
    let targets = read_lines(&args.targets)?;
    if preds.len() != targets.len() {
        return Err(format!(
            "Line count mismatch: '{}' has {} sentences, '{}' has {}.",
            args.preds.display(),
            preds.len(),
            args.targets.display(),
            targets.len()
        ));
    }

    let measure = InformationMeasure::new(&args.measure, args.alpha, args.beta)
        .map_err(|err| format!("Invalid measure: {err}"))?;

    let config = InfoLmConfig {
        device: args.device.clone(),
        temperature: args.temperature,
        max_length: args.max_length,
        batch_size: args.batch_size,
        idf: !args.no_idf,
        ..InfoLmConfig::from_model_dir(&args.model_dir)
    };
    let scorer = InfoLmScorerBuilder::new(config)
        .with_measure(measure)
        .build()
        .map_err(|err| format!("Failed to build scorer: {err}"))?;

    let batches = preds.len().div_ceil(scorer.batch_size());
    let observer = BarObserver::new(batches * 2);
    let scores = scorer
        .score_with_observer(&preds, &targets, Some(&observer))
        .map_err(|err| format!("Scoring failed: {err}"))?;
    observer.bar.finish_with_message("done");

    let corpus_score = scores.corpus_score();
    println!("{}: {corpus_score:.6}", scorer.measure());

    if let Some(out) = args.out.as_ref() {
        let report = Report {
            meta: ReportMeta {
                model_dir: args.model_dir.display().to_string(),
                measure: scorer.measure().kind().to_string(),
                alpha: args.alpha,
                beta: args.beta,
                temperature: scorer.temperature(),
                max_length: scorer.max_length(),
                batch_size: scorer.batch_size(),
                idf: scorer.idf(),
                device: scorer.device_label(),
                generated_at: Utc::now().to_rfc3339(),
            },
            corpus_score: finite(corpus_score),
            sentence_scores: scores.sentence_scores.iter().copied().map(finite).collect(),
        };
        write_report(out, &report)?;
        tracing::info!(path = %out.display(), "report written");
    }
    Ok(())
}

fn read_lines(path: &Path) -> Result<Vec<String>, String> {
    let text = fs::read_to_string(path)
        .map_err(|err| format!("Failed to read '{}': {err}", path.display()))?;
    Ok(text.lines().map(str::to_string).collect())
}

fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}
