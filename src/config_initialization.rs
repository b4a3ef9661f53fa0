//! Configuration initialization and hierarchy management

use anyhow::{Context, Result};
use tracing::debug;

use crate::adapters::TomlConfigAdapter;
use crate::cli::{Cli, RunArgs};
use crate::domain::config::AppConfig;
use crate::domain::errors::DomainError;
use crate::domain::model::*;
use crate::ports::ConfigPort;

/// Load configuration following precedence: Env > File > Defaults.
///
/// CLI arguments are layered on top by [`log_settings`] and [`build_run_config`].
pub async fn load_configuration(cli: &Cli) -> Result<AppConfig> {
    let adapter = TomlConfigAdapter::new(cli.config.clone())?;
    load_with(&adapter)
        .await
        .with_context(|| "Failed to load configuration")
}

async fn load_with(port: &dyn ConfigPort) -> Result<AppConfig, DomainError> {
    let path = port.get_config_file_path().await?;
    debug!("Resolving configuration from {}", path);
    port.load_config().await
}

/// Effective log level and format
pub fn log_settings(cli: &Cli, config: &AppConfig) -> (String, bool) {
    let level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| config.logging.level.clone());
    (level, cli.log_json || config.logging.json)
}

/// Merge run arguments over the loaded configuration
pub fn build_run_config(config: &AppConfig, args: &RunArgs) -> Result<RunConfig, DomainError> {
    let tasks = if args.tasks.is_empty() {
        config.default_tasks()?
    } else {
        args.tasks.clone()
    };

    let mut settings = config.task_settings()?;
    if let Some(percent) = args.segment_percent {
        settings = TaskSettings::new(
            f64::from(percent) / 100.0,
            settings.convert_format,
            settings.resize,
        )?;
    }
    if let Some(format) = &args.convert_format {
        settings.convert_format = ConvertFormat::parse(format)?;
    }
    if let Some(resize) = &args.resize {
        settings.resize = resize.clone();
    }

    let failure_policy = match &args.on_failure {
        Some(policy) => FailurePolicy::parse(policy)?,
        None => config.failure_policy()?,
    };

    Ok(
        RunConfig::new(&args.folder, tasks, args.metadata || config.batch.extract_metadata)
            .with_settings(settings)
            .with_failure_policy(failure_policy),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn run_args(extra: &[&str]) -> RunArgs {
        let mut argv = vec!["vidbatch", "run", "/videos"];
        argv.extend_from_slice(extra);
        match Cli::try_parse_from(argv).unwrap().command {
            crate::cli::Commands::Run(args) => args,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_cli_overrides_config() {
        let mut config = AppConfig::default();
        config.batch.tasks = vec!["convert".to_string()];
        config.tasks.resize = "720p".to_string();

        let args = run_args(&[
            "--task",
            "resize",
            "--resize",
            "144p",
            "--segment-percent",
            "25",
            "--convert-format",
            "mov",
            "--on-failure",
            "continue",
        ]);
        let run = build_run_config(&config, &args).unwrap();

        assert_eq!(run.selected_tasks, vec![TaskKind::Resize]);
        assert_eq!(run.settings.resize, "144p");
        assert_eq!(run.settings.segment_ratio, 0.25);
        assert_eq!(run.settings.convert_format, ConvertFormat::Mov);
        assert_eq!(run.failure_policy, FailurePolicy::ContinueAndReport);
    }

    #[test]
    fn test_config_fills_missing_arguments() {
        let mut config = AppConfig::default();
        config.batch.tasks = vec!["audio".to_string(), "thumbnail".to_string()];
        config.batch.extract_metadata = true;

        let run = build_run_config(&config, &run_args(&[])).unwrap();

        assert_eq!(
            run.selected_tasks,
            vec![TaskKind::ExtractAudio, TaskKind::GenerateThumbnail]
        );
        assert!(run.extract_metadata);
        assert_eq!(run.settings.resize, "360p");
        assert_eq!(run.failure_policy, FailurePolicy::AbortOnFirstFailure);
    }

    #[test]
    fn test_bad_argument_values() {
        let config = AppConfig::default();
        assert!(build_run_config(&config, &run_args(&["--convert-format", "gif"])).is_err());
        assert!(build_run_config(&config, &run_args(&["--on-failure", "retry"])).is_err());
        // Resize text is checked when the run starts
        assert!(build_run_config(&config, &run_args(&["--resize", "4k"])).is_ok());
    }

    #[test]
    fn test_log_settings_precedence() {
        let mut config = AppConfig::default();
        config.logging.level = "warn".to_string();

        let cli = Cli::try_parse_from(["vidbatch", "probe", "a.mp4"]).unwrap();
        assert_eq!(log_settings(&cli, &config), ("warn".to_string(), false));

        let cli =
            Cli::try_parse_from(["vidbatch", "--log-level", "trace", "--log-json", "probe", "a.mp4"])
                .unwrap();
        assert_eq!(log_settings(&cli, &config), ("trace".to_string(), true));
    }
}
