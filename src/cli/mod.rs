//! Churn Predictor CLI Module
//!
//! Command-line interface for serving, training, scoring and generating data.

use clap::{Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::dataset::{synthetic, ChurnDataset};
use crate::features::CustomerFeatures;
use crate::predictor::{ChurnPredictor, PredictorConfig, RiskCategory};

// ─── Styling helpers ───────────────────────────────────────────────────────────

const W: usize = 58; // box inner width

fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

fn risk(category: RiskCategory) -> ColoredString {
    let text = category.as_str();
    match category {
        RiskCategory::Low => text.truecolor(16, 185, 129),
        RiskCategory::Medium => text.truecolor(245, 158, 11),
        RiskCategory::High => text.truecolor(239, 68, 68),
    }
}

fn line_box_top()    { println!("  {}", dim("┌─────────────────────────────────────────────────────────┐")); }
fn line_box_bottom() { println!("  {}", dim("└─────────────────────────────────────────────────────────┘")); }
fn line_box_sep()    { println!("  {}", dim("├─────────────────────────────────────────────────────────┤")); }

fn line_box(content: &str) {
    let visible_len = strip_ansi(content).chars().count();
    let pad = W.saturating_sub(visible_len);
    println!("  {}  {}{} {}", dim("│"), content, " ".repeat(pad), dim("│"));
}

fn line_box_center(content: &str) {
    let visible_len = strip_ansi(content).chars().count();
    let total_pad = W.saturating_sub(visible_len);
    let left = total_pad / 2;
    let right = total_pad - left;
    println!("  {}  {}{}{} {}", dim("│"), " ".repeat(left), content, " ".repeat(right), dim("│"));
}

fn line_box_empty() { line_box(""); }

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

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "churn-predictor")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Silent customer churn predictor")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the web server (default)
    Serve {
        /// Server port [env: API_PORT, default 5000]
        #[arg(short, long)]
        port: Option<u16>,

        /// Server host [env: API_HOST, default 0.0.0.0]
        #[arg(long)]
        host: Option<String>,

        /// Training dataset [env: DATA_PATH]
        #[arg(short, long)]
        data: Option<PathBuf>,

        /// Model file [env: MODEL_PATH]
        #[arg(short, long)]
        model: Option<PathBuf>,

        /// Serve the UI from this directory [env: STATIC_DIR]
        #[arg(long)]
        static_dir: Option<PathBuf>,
    },

    /// Train a model on a labelled CSV and save it
    Train {
        /// Labelled customer CSV
        #[arg(short, long, default_value = "customer_churn_data.csv")]
        data: PathBuf,

        /// Output model file
        #[arg(short, long, default_value = "churn_model.json")]
        output: PathBuf,

        /// Number of trees
        #[arg(long, default_value = "100")]
        trees: usize,

        /// Maximum tree depth
        #[arg(long, default_value = "10")]
        max_depth: usize,

        /// Random seed for the split and the forest
        #[arg(long, default_value = "42")]
        seed: u64,
    },

    /// Score one customer with a saved model
    Predict {
        /// Trained model file
        #[arg(short, long, default_value = "churn_model.json")]
        model: PathBuf,

        #[arg(long, allow_hyphen_values = true)]
        engagement_momentum: f64,

        #[arg(long, allow_hyphen_values = true)]
        behavioral_drift: f64,

        #[arg(long, allow_hyphen_values = true)]
        silence_index: f64,

        #[arg(long, allow_hyphen_values = true)]
        response_degradation: f64,

        #[arg(long, allow_hyphen_values = true)]
        session_decay_rate: f64,

        #[arg(long, allow_hyphen_values = true)]
        consistency_score: f64,
    },

    /// Score the first customers of a labelled CSV
    Analyze {
        /// Labelled customer CSV
        #[arg(short, long, default_value = "customer_churn_data.csv")]
        data: PathBuf,

        /// Trained model file
        #[arg(short, long, default_value = "churn_model.json")]
        model: PathBuf,

        /// Number of customers to score
        #[arg(short, long, default_value = "50")]
        limit: usize,
    },

    /// Write a synthetic labelled dataset
    Generate {
        /// Output CSV file
        #[arg(short, long, default_value = "customer_churn_data.csv")]
        output: PathBuf,

        /// Number of customers
        #[arg(short = 'n', long, default_value = "1000")]
        rows: usize,

        /// Random seed
        #[arg(long, default_value = "42")]
        seed: u64,
    },
}

// ─── Commands ──────────────────────────────────────────────────────────────────

fn load_predictor(model_path: &Path) -> anyhow::Result<ChurnPredictor> {
    let mut predictor = ChurnPredictor::default();
    if !predictor.load(model_path)? {
        anyhow::bail!(
            "No model at {}. Run `churn-predictor train` first.",
            model_path.display()
        );
    }
    Ok(predictor)
}

pub fn cmd_train(
    data_path: &Path,
    output: &Path,
    trees: usize,
    max_depth: usize,
    seed: u64,
) -> anyhow::Result<()> {
    section("Train");

    step_run("Loading data");
    let start = Instant::now();
    let dataset = ChurnDataset::from_csv(data_path)?;
    step_done(&format!("{} customers in {:?}", dataset.len(), start.elapsed()));

    let config = PredictorConfig {
        n_estimators: trees,
        max_depth: Some(max_depth),
        random_state: seed,
        ..Default::default()
    };

    step_run(&format!("Training random forest ({} trees)", trees.to_string().cyan()));
    let start = Instant::now();
    let mut predictor = ChurnPredictor::new(config);
    let summary = predictor.train(&dataset)?;
    step_done(&format!("{:?}", start.elapsed()));

    predictor.save(output)?;

    println!();
    println!("  {:<18} {}", muted("Train accuracy"), format!("{:.2}%", summary.train_accuracy).white().bold());
    println!("  {:<18} {}", muted("Test accuracy"), format!("{:.2}%", summary.test_accuracy).white().bold());
    println!("  {:<18} {}", muted("Test F1"), format!("{:.4}", summary.test_metrics.f1_score).white());
    println!("  {:<18} {}", muted("Split"), format!("{} train / {} test", summary.n_train, summary.n_test).white());
    println!("  {:<18} {}", muted("Saved to"), output.display().to_string().white());
    println!();

    Ok(())
}

pub fn cmd_predict(model_path: &Path, customer: &CustomerFeatures) -> anyhow::Result<()> {
    section("Predict");

    let predictor = load_predictor(model_path)?;
    let assessment = predictor.predict(customer)?;

    println!("  {:<18} {}", muted("Churn probability"), format!("{:.2}%", assessment.churn_probability).white().bold());
    println!("  {:<18} {} {}", muted("Risk"), risk(assessment.risk_category), dim("risk"));

    if !assessment.risk_factors.is_empty() {
        println!();
        for factor in &assessment.risk_factors {
            println!(
                "  {} {:<22} {} {}",
                accent("›"),
                factor.feature,
                kv("value", &factor.value.to_string()),
                kv("importance", &format!("{}%", factor.importance)),
            );
        }
    }

    println!();
    println!("  {}", assessment.recommendation.white());
    println!();
    Ok(())
}

pub fn cmd_analyze(data_path: &Path, model_path: &Path, limit: usize) -> anyhow::Result<()> {
    section("Analyze");

    let predictor = load_predictor(model_path)?;
    let dataset = ChurnDataset::from_csv(data_path)?;
    let rows = predictor.analyze(&dataset, limit)?;

    println!(
        "  {:<14} {:>10}  {:<8} {}",
        muted("Customer ID"),
        muted("Churn %"),
        muted("Risk"),
        muted("Actual")
    );
    for row in &rows {
        println!(
            "  {:<14} {:>10}  {:<8} {}",
            row.customer_id,
            format!("{:.2}", row.churn_probability),
            risk(row.risk_category),
            if row.actual_churn == 1 { "Yes" } else { "No" }
        );
    }

    let high = rows.iter().filter(|r| r.risk_category == RiskCategory::High).count();
    println!();
    println!("  {} of {} customers at high risk", high.to_string().white().bold(), rows.len());
    println!();
    Ok(())
}

pub fn cmd_generate(output: &Path, rows: usize, seed: u64) -> anyhow::Result<()> {
    section("Generate");

    step_run(&format!("Generating {} customers", rows));
    let mut df = synthetic::generate(rows, seed)?;
    synthetic::write_csv(&mut df, output)?;
    step_done(&output.display().to_string());
    println!();
    Ok(())
}

pub async fn cmd_serve(
    host: Option<String>,
    port: Option<u16>,
    data: Option<PathBuf>,
    model: Option<PathBuf>,
    static_dir: Option<PathBuf>,
) -> anyhow::Result<()> {
    use crate::server::{run_server, ServerConfig};

    let defaults = ServerConfig::default();
    let config = ServerConfig {
        host: host.unwrap_or(defaults.host),
        port: port.unwrap_or(defaults.port),
        data_path: data.unwrap_or(defaults.data_path),
        model_path: model.unwrap_or(defaults.model_path),
        static_dir: static_dir.or(defaults.static_dir),
        ..defaults
    };

    let base = format!("http://{}:{}", config.host, config.port);

    println!();
    line_box_top();
    line_box_empty();
    line_box_center(&format!("{}", "Silent Churn Predictor".white().bold()));
    line_box_center(&format!("{}", dim(&format!("v{}", env!("CARGO_PKG_VERSION")))));
    line_box_empty();
    line_box_sep();
    line_box_empty();
    line_box(&kv("Web UI ", &base));
    line_box(&kv("Health ", &format!("{}/health", base)));
    line_box(&kv("Data   ", &config.data_path.display().to_string()));
    line_box(&kv("Model  ", &config.model_path.display().to_string()));
    line_box_empty();
    line_box_sep();
    line_box_empty();
    line_box_center(&format!("{}", dim("ctrl+c to stop")));
    line_box_empty();
    line_box_bottom();
    println!();

    run_server(config).await
}
