//! Silent Churn Predictor - Main Entry Point
//!
//! Runs the web server by default; subcommands train, score and generate data.

use clap::Parser;
use churn_predictor::cli::{cmd_analyze, cmd_generate, cmd_predict, cmd_serve, cmd_train, Cli, Commands};
use churn_predictor::features::CustomerFeatures;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "churn_predictor=info,tower_http=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Serve { port, host, data, model, static_dir }) => {
            cmd_serve(host, port, data, model, static_dir).await?;
        }
        Some(Commands::Train { data, output, trees, max_depth, seed }) => {
            tokio::task::spawn_blocking(move || cmd_train(&data, &output, trees, max_depth, seed)).await??;
        }
        Some(Commands::Predict {
            model,
            engagement_momentum,
            behavioral_drift,
            silence_index,
            response_degradation,
            session_decay_rate,
            consistency_score,
        }) => {
            let customer = CustomerFeatures {
                engagement_momentum,
                behavioral_drift,
                silence_index,
                response_degradation,
                session_decay_rate,
                consistency_score,
            };
            cmd_predict(&model, &customer)?;
        }
        Some(Commands::Analyze { data, model, limit }) => {
            cmd_analyze(&data, &model, limit)?;
        }
        Some(Commands::Generate { output, rows, seed }) => {
            cmd_generate(&output, rows, seed)?;
        }
        None => {
            cmd_serve(None, None, None, None, None).await?;
        }
    }

    Ok(())
}
