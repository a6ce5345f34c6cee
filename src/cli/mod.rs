//! Dropout-risk CLI Module
//!
//! Command-line interface for training, scoring and evaluating models.

use clap::{Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::config::PipelineConfig;
use crate::export::SerializationFormat;
use crate::inference::{BatchOutcome, Prediction, RiskLevel};
use crate::service::{
    BatchPredictionRequest, DropoutService, InMemoryPredictionSink, InMemoryStudentRepository,
    LabeledStudent, ModelStatus, TrainingRequest,
};
use crate::training::{Algorithm, ModelMetrics};

// ─── Styling helpers ───────────────────────────────────────────────────────────

const W: usize = 58; // box inner width

fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

fn line_box_top()    { println!("  {}", dim(&format!("┌{}┐", "─".repeat(W + 2)))); }
fn line_box_bottom() { println!("  {}", dim(&format!("└{}┘", "─".repeat(W + 2)))); }
fn line_box_sep()    { println!("  {}", dim(&format!("├{}┤", "─".repeat(W + 2)))); }

fn line_box(content: &str) {
    let visible_len = strip_ansi(content).chars().count();
    let pad = W.saturating_sub(visible_len);
    println!("  {}  {}{}{}", dim("│"), content, " ".repeat(pad), dim("│"));
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::new();
    let mut in_escape = false;
    for c in s.chars() {
        if c == '\x1b' { in_escape = true; continue; }
        if in_escape { if c == 'm' { in_escape = false; } continue; }
        out.push(c);
    }
    out
}

fn kv(key: &str, val: &str) -> String {
    format!("{} {}", muted(key), val.white())
}

fn step_ok(msg: &str) {
    println!("  {} {}", ok("✓"), msg);
}

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

fn risk_label(level: RiskLevel) -> ColoredString {
    let s = level.to_string();
    match level {
        RiskLevel::Low => s.truecolor(100, 210, 120).bold(),
        RiskLevel::Medium => s.truecolor(230, 190, 80).bold(),
        RiskLevel::High => s.truecolor(235, 95, 95).bold(),
    }
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "dropout-risk")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Student dropout-risk training and scoring")]
#[command(long_about = None)]
pub struct Cli {
    /// Pipeline configuration file (JSON)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding model artifacts (overrides MODEL_PATH)
    #[arg(long, global = true)]
    pub model_dir: Option<PathBuf>,

    /// Artifact format: binary or json (overrides MODEL_FORMAT)
    #[arg(long, global = true)]
    pub format: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Train a model on labeled students
    Train {
        /// JSON array of { record, history, dropout }
        #[arg(short, long)]
        data: PathBuf,

        /// Algorithm (random_forest, logistic_regression)
        #[arg(short, long, default_value = "random_forest")]
        model: String,

        /// Seed for splitting, resampling and model fitting
        #[arg(long)]
        seed: Option<u64>,

        /// Keep the model in memory only
        #[arg(long)]
        no_save: bool,
    },

    /// Score students with a saved model
    Predict {
        /// JSON array of { record, history }
        #[arg(short, long)]
        students: PathBuf,

        /// Student ids to score; all students when omitted
        ids: Vec<String>,

        /// Algorithm of the saved model to load
        #[arg(short, long, default_value = "random_forest")]
        model: String,

        /// Print the full response as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the saved model's metadata and feature importances
    Info {
        /// Algorithm of the saved model to load
        #[arg(short, long, default_value = "random_forest")]
        model: String,
    },

    /// Evaluate a saved model on held-out labeled students
    Evaluate {
        /// JSON array of { record, history, dropout }
        #[arg(short, long)]
        data: PathBuf,

        /// Algorithm of the saved model to load
        #[arg(short, long, default_value = "random_forest")]
        model: String,
    },
}

type CliService = DropoutService<InMemoryStudentRepository, InMemoryPredictionSink>;

/// Resolve configuration: file (or env defaults), then command-line overrides
pub fn load_config(
    config_path: Option<&Path>,
    model_dir: Option<&Path>,
    format: Option<&str>,
) -> anyhow::Result<PipelineConfig> {
    let mut config = match config_path {
        Some(path) => PipelineConfig::from_file(path)?,
        None => PipelineConfig::default(),
    };
    if let Some(dir) = model_dir {
        config = config.with_model_dir(dir);
    }
    if let Some(format) = format {
        config = config.with_format(format.parse::<SerializationFormat>()?);
    }
    Ok(config)
}

fn read_labeled(path: &Path) -> anyhow::Result<Vec<LabeledStudent>> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

fn load_saved(service: &CliService, algorithm: Algorithm) -> anyhow::Result<()> {
    if !service.load_existing(algorithm)? {
        anyhow::bail!(
            "No saved model at {}; run `dropout-risk train` first",
            service.store().path_for(algorithm).display()
        );
    }
    Ok(())
}

fn print_metrics(metrics: &ModelMetrics) {
    println!();
    println!("  {:<16} {}", muted("Accuracy"), format!("{:.4}", metrics.accuracy).white().bold());
    println!("  {:<16} {}", muted("Precision"), format!("{:.4}", metrics.precision).white());
    println!("  {:<16} {}", muted("Recall"), format!("{:.4}", metrics.recall).white());
    println!("  {:<16} {}", muted("F1"), format!("{:.4}", metrics.f1_score).white());
    if let Some(auc) = metrics.roc_auc {
        println!("  {:<16} {}", muted("ROC AUC"), format!("{:.4}", auc).white());
    }
    if let (Some(mean), Some(std)) = (metrics.cv_mean, metrics.cv_std) {
        println!("  {:<16} {}", muted("CV accuracy"), format!("{:.4} ± {:.4}", mean, std).white());
    }
    println!("  {:<16} {}", muted("Samples"), metrics.n_samples.to_string().white());
}

fn print_prediction(student_id: &str, prediction: &Prediction) {
    line_box_top();
    line_box(&format!("{}  {}", student_id.white().bold(), risk_label(prediction.risk_level)));
    line_box_sep();
    line_box(&kv("risk score   ", &format!("{:.3}", prediction.risk_score)));
    line_box(&kv("confidence   ", &format!("{:.3}", prediction.confidence)));
    line_box(&kv("will drop out", if prediction.dropout_prediction { "yes" } else { "no" }));
    if !prediction.contributing_factors.is_empty() {
        line_box_sep();
        for factor in &prediction.contributing_factors {
            line_box(&format!(
                "{:<26} {} {}",
                muted(&factor.feature),
                format!("{:>8.3}", factor.value).white(),
                dim(&format!("{:+.3}", factor.contribution)),
            ));
        }
    }
    line_box_bottom();
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub fn cmd_train(
    config: PipelineConfig,
    data_path: &Path,
    model_type: &str,
    seed: Option<u64>,
    save: bool,
) -> anyhow::Result<()> {
    section("Train");

    let algorithm: Algorithm = model_type.parse()?;

    step_run("Loading data");
    let start = Instant::now();
    let students = read_labeled(data_path)?;
    step_done(&format!("{} students in {:?}", students.len(), start.elapsed()));

    let mut request = TrainingRequest::new(students)
        .with_model_type(algorithm)
        .with_save_model(save);
    if let Some(seed) = seed {
        request = request.with_seed(seed);
    }

    let service = DropoutService::new(config, InMemoryStudentRepository::new(), InMemoryPredictionSink::new());

    step_run(&format!("Training {}", algorithm.as_str().cyan()));
    let start = Instant::now();
    let response = service.train(request)?;
    step_done(&format!("{:?}", start.elapsed()));

    print_metrics(&response.metrics);
    println!("  {:<16} {}", muted("Model id"), response.model_id.to_string().white());
    println!();
    match response.model_path {
        Some(path) => step_ok(&format!("Saved to {}", path.white())),
        None => println!("  {}", dim("model not saved")),
    }
    println!();

    Ok(())
}

pub fn cmd_predict(
    config: PipelineConfig,
    students_path: &Path,
    ids: &[String],
    model_type: &str,
    json: bool,
) -> anyhow::Result<()> {
    let algorithm: Algorithm = model_type.parse()?;
    let repository = InMemoryStudentRepository::from_json_file(students_path)?;
    let student_ids = if ids.is_empty() {
        repository.student_ids()
    } else {
        ids.to_vec()
    };

    let service = DropoutService::new(config, repository, InMemoryPredictionSink::new());
    if json {
        load_saved(&service, algorithm)?;
    } else {
        section("Predict");
        step_run(&format!("Loading {} model", algorithm.as_str().cyan()));
        let start = Instant::now();
        load_saved(&service, algorithm)?;
        step_done(&format!("{:?}", start.elapsed()));
    }

    let request = BatchPredictionRequest {
        student_ids,
        save_predictions: false,
    };
    let response = service.predict_batch(&request)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }

    println!();
    for outcome in &response.predictions {
        match outcome {
            BatchOutcome::Scored { student_id, prediction } => print_prediction(student_id, prediction),
            BatchOutcome::Failed { student_id, message, .. } => {
                println!("  {} {} {}", "✗".red(), student_id.white().bold(), dim(message));
            }
        }
    }
    println!();
    println!(
        "  {}",
        kv(
            "scored",
            &format!("{}/{}", response.summary.successful, response.summary.total)
        )
    );
    println!();

    Ok(())
}

pub fn cmd_info(config: PipelineConfig, model_type: &str) -> anyhow::Result<()> {
    section("Model");

    let algorithm: Algorithm = model_type.parse()?;
    let service = DropoutService::new(config, InMemoryStudentRepository::new(), InMemoryPredictionSink::new());
    service.load_existing(algorithm)?;

    let info = service.model_info();
    let metadata = match (info.status, info.metadata) {
        (ModelStatus::Trained, Some(metadata)) => metadata,
        _ => {
            println!("  {}", "No trained model found".yellow());
            println!("  {}", dim(&format!("looked in {}", service.store().path_for(algorithm).display())));
            println!();
            return Ok(());
        }
    };

    println!("  {:<16} {}", muted("Algorithm"), metadata.algorithm.as_str().cyan());
    println!("  {:<16} {}", muted("Model id"), metadata.model_id.to_string().white());
    println!("  {:<16} {}", muted("Trained"), metadata.trained_at.format("%Y-%m-%d %H:%M:%S UTC").to_string().white());
    println!(
        "  {:<16} {}",
        muted("Samples"),
        format!(
            "{} train / {} validation / {} synthetic",
            metadata.training_samples, metadata.validation_samples, metadata.synthetic_samples
        )
        .white()
    );
    println!("  {:<16} {}", muted("Seed"), metadata.seed.to_string().white());
    print_metrics(&metadata.metrics);

    section("Feature importances");
    let mut importances = info.feature_importances;
    importances.sort_by(|a, b| b.importance.partial_cmp(&a.importance).unwrap_or(std::cmp::Ordering::Equal));
    for fi in &importances {
        let bar = "█".repeat((fi.importance * 40.0).round() as usize);
        println!("  {:<26} {} {}", muted(&fi.feature), format!("{:.4}", fi.importance).white(), accent(&bar));
    }
    println!();

    Ok(())
}

pub fn cmd_evaluate(config: PipelineConfig, data_path: &Path, model_type: &str) -> anyhow::Result<()> {
    section("Evaluate");

    let algorithm: Algorithm = model_type.parse()?;
    let service = DropoutService::new(config, InMemoryStudentRepository::new(), InMemoryPredictionSink::new());
    step_run(&format!("Loading {} model", algorithm.as_str().cyan()));
    load_saved(&service, algorithm)?;
    step_done(&service.store().path_for(algorithm).display().to_string());

    step_run("Loading data");
    let students = read_labeled(data_path)?;
    step_done(&format!("{} students", students.len()));

    let report = service.evaluate(&students)?;
    print_metrics(&report.metrics);
    println!();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_ansi() {
        let colored = ok("done").to_string();
        assert_eq!(strip_ansi(&colored), "done");
        assert_eq!(strip_ansi("plain"), "plain");
    }

    #[test]
    fn test_cli_parses_train() {
        let cli = Cli::try_parse_from([
            "dropout-risk", "--model-dir", "/tmp/m", "train", "--data", "train.json", "--model", "lr", "--no-save",
        ])
        .unwrap();
        assert_eq!(cli.model_dir, Some(PathBuf::from("/tmp/m")));
        match cli.command {
            Commands::Train { model, no_save, seed, .. } => {
                assert_eq!(model, "lr");
                assert!(no_save);
                assert!(seed.is_none());
            }
            _ => panic!("expected train"),
        }
    }

    #[test]
    fn test_cli_parses_predict_ids() {
        let cli = Cli::try_parse_from(["dropout-risk", "predict", "-s", "students.json", "s1", "s2"]).unwrap();
        match cli.command {
            Commands::Predict { ids, model, json, .. } => {
                assert_eq!(ids, vec!["s1".to_string(), "s2".to_string()]);
                assert_eq!(model, "random_forest");
                assert!(!json);
            }
            _ => panic!("expected predict"),
        }
    }

    #[test]
    fn test_load_config_overrides() {
        let config = load_config(None, Some(Path::new("artifacts")), Some("json")).unwrap();
        assert_eq!(config.model_dir, PathBuf::from("artifacts"));
        assert_eq!(config.format, SerializationFormat::Json);
        assert!(load_config(None, None, Some("xml")).is_err());
    }
}
