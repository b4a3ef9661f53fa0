//! VidBatch batch video processor
//!
//! Applies a selected, ordered set of tasks to every video in a folder and
//! writes `<folder>/report/videos_report.csv`.
//!
//! # Usage
//!
//! ```bash
//! vidbatch run ./videos --task audio --task thumbnail --metadata
//! vidbatch run ./videos -t resize --resize 480p --on-failure continue
//! vidbatch probe ./videos/a.mp4 --json
//! ```

use anyhow::Result;
use clap::Parser;
use tracing::{error, info};

use vidbatch_cli::app::DefaultAppContainer;
use vidbatch_cli::cli::{commands, Cli, Commands};
use vidbatch_cli::config_initialization::{build_run_config, load_configuration, log_settings};
use vidbatch_cli::utils::logging::init_logging;

/// Main entry point for the VidBatch CLI application
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = load_configuration(&cli).await?;
    let (level, json_logs) = log_settings(&cli, &config);
    init_logging(&level, json_logs);

    info!("Starting VidBatch");
    let container = DefaultAppContainer::new(config.encoding.clone())?;

    let result = match &cli.command {
        Commands::Run(args) => {
            let run_config = build_run_config(&config, args)?;
            commands::run(&container, run_config, args.json).await.map(|_| ())
        }
        Commands::Probe(args) => commands::probe(&container, &args.input, args.json).map(|_| ()),
    };

    if let Err(e) = &result {
        error!("{:#}", e);
    }
    result
}
