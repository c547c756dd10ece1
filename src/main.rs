use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use datamodeler_lib::{app, AppError, ConfigService, IngestionUseCase};
use tracing::error;

/// Infer a schema from staged datasets and keep the model and service artifacts current.
#[derive(Parser, Debug)]
#[command(name = "datamodeler")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// TOML config file, layered over defaults and under DATAMODELER_* variables.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one ingestion pass over the staging directory.
    Ingest {
        /// Ingest only this staged file name.
        #[arg(long)]
        file: Option<String>,
    },
    /// Print the registered entity names.
    Entities,
    /// Start the HTTP server.
    Serve {
        /// Address to bind, defaults to `http_bind` from the config.
        #[arg(long)]
        bind: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    app::init_tracing();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "datamodeler failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), AppError> {
    let config = ConfigService::load(cli.config.as_deref())?;

    match cli.command {
        Command::Ingest { file: None } => {
            let report = IngestionUseCase::new(config)?.run_pass().await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            if report.failed_count() > 0 {
                return Err(AppError::Internal(format!(
                    "{} dataset(s) failed",
                    report.failed_count()
                )));
            }
        }
        Command::Ingest { file: Some(file) } => {
            let path = config.staging_dir.join(&file);
            let report = IngestionUseCase::new(config)?.ingest_dataset(&path).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Entities => {
            for name in IngestionUseCase::new(config)?.registered_entities()? {
                println!("{}", name);
            }
        }
        Command::Serve { bind } => app::serve(config, bind).await?,
    }
    Ok(())
}
