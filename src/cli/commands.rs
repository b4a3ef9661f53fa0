//! Command implementations

use std::path::Path;
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use tracing::info;

use crate::app::{AppContainer, RunEvent};
use crate::domain::model::*;
use crate::utils::format_elapsed;

/// Execute the run command; progress lines go to stdout
pub async fn run(container: &dyn AppContainer, config: RunConfig, json: bool) -> Result<RunReport> {
    let started = Instant::now();
    let folder = config.input_folder.clone();
    info!("Starting batch run in {}", folder.display());

    let mut handle = container.batch_runner().start(config)?;

    let report = loop {
        match handle.next_event().await {
            Some(RunEvent::Progress(text)) => {
                if !json {
                    println!("{}", text);
                }
            }
            Some(RunEvent::Completed(report)) => break report,
            Some(RunEvent::Failed(message)) => return Err(anyhow!(message)),
            None => return Err(anyhow!("Batch worker stopped without reporting a result")),
        }
    };

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialize run report")?
        );
    } else {
        println!(
            "Processed {} files ({} with problems) in {}",
            report.total_files(),
            report.failed_files(),
            format_elapsed(started.elapsed())
        );
    }

    Ok(report)
}

/// Execute the probe command
pub fn probe(container: &dyn AppContainer, input: &Path, json: bool) -> Result<Metadata> {
    info!("Probing {}", input.display());
    let metadata = container
        .probe_port()
        .read_metadata(input)
        .with_context(|| format!("Failed to probe {}", input.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&metadata)?);
    } else {
        let record = metadata.to_record();
        println!("Resolution: {}", record.resolution);
        println!("Frame Rate: {}", record.frame_rate);
        println!("Duration:   {}", record.duration);
        println!("Codec:      {}", record.codec);
    }

    Ok(metadata)
}
