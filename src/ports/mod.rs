// Ports - Interface definitions (contracts)

use std::path::Path;

use async_trait::async_trait;
use image::RgbImage;

use crate::domain::config::AppConfig;
use crate::domain::errors::*;
use crate::domain::model::*;

/// Re-encode request shared by Segment, Convert and Resize
#[derive(Debug, Clone, PartialEq)]
pub struct TranscodeJob {
    /// Stop after this many seconds of source time; `None` keeps everything
    pub end_seconds: Option<f64>,
    /// Target height; `None` keeps the source size
    pub target_height: Option<u32>,
}

impl TranscodeJob {
    pub fn whole() -> Self {
        Self {
            end_seconds: None,
            target_height: None,
        }
    }

    pub fn clip(end_seconds: f64) -> Self {
        Self {
            end_seconds: Some(end_seconds),
            target_height: None,
        }
    }

    pub fn resize(target_height: Option<u32>) -> Self {
        Self {
            end_seconds: None,
            target_height,
        }
    }
}

/// Rich handle over an open video file, used by the edit tasks.
///
/// Dropping the handle releases its demuxer and codec resources.
pub trait MediaSource {
    /// Total duration in seconds
    fn duration(&self) -> f64;

    /// Re-encode the video into `output`; the container follows the extension
    fn transcode(&mut self, job: &TranscodeJob, output: &Path) -> Result<(), DomainError>;

    /// Write the audio track to an audio-only file
    fn extract_audio(&mut self, output: &Path) -> Result<(), DomainError>;

    /// Decode the frame displayed at `seconds`
    fn frame_at(&mut self, seconds: f64) -> Result<RgbImage, DomainError>;
}

/// Port opening rich media handles
pub trait MediaOpenerPort: Send + Sync {
    fn open(&self, path: &Path) -> Result<Box<dyn MediaSource>, DomainError>;
}

/// Port for cheap single-frame and header reads.
///
/// Every call opens its own decoder handle, independent of any
/// [`MediaSource`] open on the same file.
pub trait FrameProbePort: Send + Sync {
    /// First decodable frame, `None` when the file yields no frame
    fn first_frame(&self, path: &Path) -> Result<Option<RgbImage>, DomainError>;

    /// Stream properties of the best video stream
    fn read_metadata(&self, path: &Path) -> Result<Metadata, DomainError>;
}

/// Port for file system operations
pub trait FsPort: Send + Sync {
    /// Recognized video files directly inside `folder`, sorted by name
    fn scan_videos(&self, folder: &Path) -> Result<Vec<VideoFileRef>, DomainError>;

    /// Create directory (including parent directories); succeeds if it exists
    fn create_directory(&self, dir: &Path) -> Result<(), DomainError>;

    /// Save a still image; format follows the extension
    fn save_image(&self, image: &RgbImage, path: &Path) -> Result<(), DomainError>;
}

/// Port writing the run report
pub trait ReportPort: Send + Sync {
    /// Write the report to `path`, replacing any previous report
    fn write_report(&self, report: &RunReport, path: &Path) -> Result<(), DomainError>;
}

/// Port for configuration management
#[async_trait]
pub trait ConfigPort: Send + Sync {
    /// Load configuration from its backing store, applying defaults
    async fn load_config(&self) -> Result<AppConfig, DomainError>;

    /// Location the configuration was or would be loaded from
    async fn get_config_file_path(&self) -> Result<String, DomainError>;
}

/// One-way progress notifications from the batch worker.
///
/// Implementations must not block the caller.
pub trait ProgressSink: Send + Sync {
    fn notify(&self, event: ProgressEvent);
}

/// Progress sink that drops every event
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn notify(&self, _event: ProgressEvent) {}
}
