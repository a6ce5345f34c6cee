//! dropout-risk command-line entry point

use clap::Parser;
use dropout_risk::cli::{cmd_evaluate, cmd_info, cmd_predict, cmd_train, load_config, Cli, Commands};

fn main() -> anyhow::Result<()> {
    // Logs go to stderr so `predict --json` output stays parseable
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dropout_risk=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref(), cli.model_dir.as_deref(), cli.format.as_deref())?;

    match cli.command {
        Commands::Train { data, model, seed, no_save } => {
            cmd_train(config, &data, &model, seed, !no_save)?;
        }
        Commands::Predict { students, ids, model, json } => {
            cmd_predict(config, &students, &ids, &model, json)?;
        }
        Commands::Info { model } => {
            cmd_info(config, &model)?;
        }
        Commands::Evaluate { data, model } => {
            cmd_evaluate(config, &data, &model)?;
        }
    }

    Ok(())
}
