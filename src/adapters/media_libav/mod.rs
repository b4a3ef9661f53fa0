// Media LibAV adapter - Rich video handles backed by libav

use std::path::{Path, PathBuf};

use image::RgbImage;
use tracing::debug;

use crate::domain::config::EncodeSettings;
use crate::domain::errors::*;
use crate::engine;
use crate::engine::frames::FrameGrabber;
use crate::engine::transcode::TranscodeOptions;
use crate::ports::*;

/// Opens [`LibavMediaSource`] handles
pub struct LibavMediaOpener {
    encoding: EncodeSettings,
}

impl LibavMediaOpener {
    /// Create new LibAV media adapter
    pub fn new(encoding: EncodeSettings) -> Result<Self, DomainError> {
        engine::init().map_err(DomainError::from)?;
        Ok(Self { encoding })
    }
}

impl MediaOpenerPort for LibavMediaOpener {
    fn open(&self, path: &Path) -> Result<Box<dyn MediaSource>, DomainError> {
        let grabber = FrameGrabber::open(path)
            .map_err(|e| DomainError::OpenFailed(format!("{}: {}", path.display(), e)))?;

        Ok(Box::new(LibavMediaSource {
            path: path.to_path_buf(),
            grabber,
            encoding: self.encoding.clone(),
        }))
    }
}

/// Open video file.
///
/// Frame sampling reuses the held demuxer; transcodes read the file through
/// their own demuxer.
pub struct LibavMediaSource {
    path: PathBuf,
    grabber: FrameGrabber,
    encoding: EncodeSettings,
}

impl LibavMediaSource {
    fn options(&self, job: &TranscodeJob) -> TranscodeOptions {
        TranscodeOptions {
            end_seconds: job.end_seconds,
            target_height: job.target_height,
            video_codec: self.encoding.video_codec.clone(),
            crf: self.encoding.crf,
            preset: self.encoding.preset.clone(),
            threads: self.encoding.thread_count(),
        }
    }
}

impl MediaSource for LibavMediaSource {
    fn duration(&self) -> f64 {
        self.grabber.duration()
    }

    fn transcode(&mut self, job: &TranscodeJob, output: &Path) -> Result<(), DomainError> {
        debug!("Transcoding {} -> {} ({:?})", self.path.display(), output.display(), job);
        engine::transcode::transcode_video(&self.path, output, &self.options(job))
            .map(|_| ())
            .map_err(DomainError::from)
    }

    fn extract_audio(&mut self, output: &Path) -> Result<(), DomainError> {
        engine::audio::extract_audio(&self.path, output)
            .map(|_| ())
            .map_err(DomainError::from)
    }

    fn frame_at(&mut self, seconds: f64) -> Result<RgbImage, DomainError> {
        self.grabber.frame_at(seconds).map_err(DomainError::from)
    }
}
