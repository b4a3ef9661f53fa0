// Batch interactor - Orchestrates the folder processing use case

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error, info, warn};

use crate::app::task_executor::TaskExecutor;
use crate::domain::errors::*;
use crate::domain::model::*;
use crate::domain::rules::*;
use crate::ports::*;

/// Interactor for the batch processing use case
pub struct BatchInteractor {
    media_port: Arc<dyn MediaOpenerPort>,
    probe_port: Arc<dyn FrameProbePort>,
    fs_port: Arc<dyn FsPort>,
    report_port: Arc<dyn ReportPort>,
}

impl BatchInteractor {
    /// Create new batch interactor with injected ports
    pub fn new(
        media_port: Arc<dyn MediaOpenerPort>,
        probe_port: Arc<dyn FrameProbePort>,
        fs_port: Arc<dyn FsPort>,
        report_port: Arc<dyn ReportPort>,
    ) -> Self {
        Self {
            media_port,
            probe_port,
            fs_port,
            report_port,
        }
    }

    /// Process every video in the configured folder.
    ///
    /// Blocks until the run finishes. Under [`FailurePolicy::AbortOnFirstFailure`]
    /// the first error ends the run and no report is written.
    pub fn run(
        &self,
        config: &RunConfig,
        progress: &dyn ProgressSink,
    ) -> Result<RunReport, ProcessingError> {
        let started_at = Utc::now();
        info!(
            "Starting batch run in {} with tasks {:?}",
            config.input_folder.display(),
            config.selected_tasks
        );

        if config.selects(TaskKind::Resize) {
            config.settings.resize_target()?;
        }

        let files = self.fs_port.scan_videos(&config.input_folder)?;
        let total = files.len();
        info!("Found {} video files", total);

        for kind in &config.selected_tasks {
            self.fs_port.create_directory(&config.task_dir(*kind))?;
        }

        let executor = TaskExecutor::new(
            config.settings.clone(),
            Arc::clone(&self.probe_port),
            Arc::clone(&self.fs_port),
        );

        let mut rows = Vec::with_capacity(total);
        for (index, file) in files.iter().enumerate() {
            let row = self.process_file(&executor, config, file, progress)?;
            rows.push(row);
            progress.notify(ProgressEvent::FileFinished {
                index: index + 1,
                total,
            });
        }

        let report = RunReport {
            folder: config.input_folder.clone(),
            rows,
            metadata_requested: config.extract_metadata,
            failure_policy: config.failure_policy,
            started_at,
            finished_at: Utc::now(),
        };

        self.report_port
            .write_report(&report, &ArtifactNaming::report(&config.input_folder))?;

        info!(
            "Batch run finished: {} files, {} with problems",
            report.total_files(),
            report.failed_files()
        );
        Ok(report)
    }

    fn process_file(
        &self,
        executor: &TaskExecutor,
        config: &RunConfig,
        file: &VideoFileRef,
        progress: &dyn ProgressSink,
    ) -> Result<FileReport, ProcessingError> {
        let mut row = FileReport::new(&file.file_name);
        let policy = config.failure_policy;

        let mut source = match self.media_port.open(file.path()) {
            Ok(source) => source,
            Err(e) => {
                if policy == FailurePolicy::AbortOnFirstFailure {
                    error!("Cannot open {}: {}", file.file_name, e);
                    return Err(e.into());
                }
                warn!("Skipping {}: {}", file.file_name, e);
                row.status = FileStatus::Skipped(e.to_string());
                return Ok(row);
            }
        };
        debug!("Opened {} ({:.2}s)", file.file_name, source.duration());

        for kind in &config.selected_tasks {
            progress.notify(ProgressEvent::TaskStarted {
                file_name: file.file_name.clone(),
                task: *kind,
            });

            match executor.execute(*kind, source.as_mut(), file, &config.task_dir(*kind)) {
                Ok(Some(outcome)) => row.record(&outcome),
                Ok(None) => {}
                Err(e) if policy == FailurePolicy::ContinueAndReport => {
                    warn!("{} failed on {}: {}", kind, file.file_name, e);
                    row.fail(format!("{}: {}", kind, e));
                }
                Err(e) => {
                    error!("{} failed on {}: {}", kind, file.file_name, e);
                    return Err(e.into());
                }
            }
        }

        // Release decoder and encoder resources before the next file
        drop(source);

        if config.extract_metadata {
            match self.probe_port.read_metadata(file.path()) {
                Ok(metadata) => row.metadata = Some(metadata),
                Err(e) if policy == FailurePolicy::ContinueAndReport => {
                    warn!("Metadata failed on {}: {}", file.file_name, e);
                    row.fail(format!("metadata: {}", e));
                }
                Err(e) => return Err(e.into()),
            }
        }

        Ok(row)
    }
}
