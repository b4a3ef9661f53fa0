// Task executor - Applies one task kind to one open video

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};

use crate::domain::errors::*;
use crate::domain::model::*;
use crate::domain::rules::*;
use crate::ports::*;

/// Runs individual tasks against an open [`MediaSource`]
pub struct TaskExecutor {
    settings: TaskSettings,
    probe_port: Arc<dyn FrameProbePort>,
    fs_port: Arc<dyn FsPort>,
}

impl TaskExecutor {
    /// Create new task executor with injected ports
    pub fn new(
        settings: TaskSettings,
        probe_port: Arc<dyn FrameProbePort>,
        fs_port: Arc<dyn FsPort>,
    ) -> Self {
        Self {
            settings,
            probe_port,
            fs_port,
        }
    }

    /// Execute `kind` on `file`, writing into `output_dir`.
    ///
    /// `Ok(None)` means the task was skipped without producing anything.
    pub fn execute(
        &self,
        kind: TaskKind,
        source: &mut dyn MediaSource,
        file: &VideoFileRef,
        output_dir: &Path,
    ) -> Result<Option<TaskOutcome>, DomainError> {
        let artifacts = match kind {
            TaskKind::Segment => {
                let end = SamplingRules::segment_end(source.duration(), self.settings.segment_ratio);
                let output = ArtifactNaming::segment(output_dir, file, self.settings.segment_ratio);
                debug!("Segmenting {} to {:.3}s", file.file_name, end);
                source.transcode(&TranscodeJob::clip(end), &output)?;
                vec![output]
            }
            TaskKind::Convert => {
                let output = ArtifactNaming::converted(output_dir, file, self.settings.convert_format);
                source.transcode(&TranscodeJob::whole(), &output)?;
                vec![output]
            }
            TaskKind::ExtractAudio => {
                let output = ArtifactNaming::audio(output_dir, file);
                source.extract_audio(&output)?;
                vec![output]
            }
            TaskKind::Resize => {
                let target = self.settings.resize_target()?;
                let output = ArtifactNaming::resized(output_dir, file);
                debug!("Resizing {} to {:?}", file.file_name, target);
                source.transcode(&TranscodeJob::resize(target.height()), &output)?;
                vec![output]
            }
            TaskKind::ExtractFrames => self.extract_frames(source, file, output_dir)?,
            TaskKind::GenerateThumbnail => match self.generate_thumbnail(file, output_dir)? {
                Some(output) => vec![output],
                None => {
                    info!("No readable frame in {}, thumbnail skipped", file.file_name);
                    return Ok(None);
                }
            },
        };

        Ok(Some(TaskOutcome::succeeded(kind, artifacts)))
    }

    fn extract_frames(
        &self,
        source: &mut dyn MediaSource,
        file: &VideoFileRef,
        output_dir: &Path,
    ) -> Result<Vec<std::path::PathBuf>, DomainError> {
        let frames_dir = ArtifactNaming::frames_dir(output_dir, file);
        self.fs_port.create_directory(&frames_dir)?;

        let mut written = Vec::new();
        for second in SamplingRules::frame_seconds(source.duration()) {
            let frame = source.frame_at(second as f64)?;
            let path = ArtifactNaming::frame(&frames_dir, second);
            self.fs_port.save_image(&frame, &path)?;
            written.push(path);
        }

        info!("Extracted {} frames from {}", written.len(), file.file_name);
        Ok(written)
    }

    /// Uses the cheap probe handle, independent of the open source
    fn generate_thumbnail(
        &self,
        file: &VideoFileRef,
        output_dir: &Path,
    ) -> Result<Option<std::path::PathBuf>, DomainError> {
        let Some(frame) = self.probe_port.first_frame(file.path())? else {
            return Ok(None);
        };
        let output = ArtifactNaming::thumbnail(output_dir, file);
        self.fs_port.save_image(&frame, &output)?;
        Ok(Some(output))
    }
}
