// Domain models - Core types and data structures

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::errors::DomainError;

/// Per-file transformation task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskKind {
    Segment,
    Convert,
    ExtractAudio,
    Resize,
    ExtractFrames,
    GenerateThumbnail,
}

impl TaskKind {
    /// All task kinds in their canonical order
    pub const ALL: [TaskKind; 6] = [
        TaskKind::Segment,
        TaskKind::Convert,
        TaskKind::ExtractAudio,
        TaskKind::Resize,
        TaskKind::ExtractFrames,
        TaskKind::GenerateThumbnail,
    ];

    /// Parse task kind from string (directory name, variant name or short alias)
    pub fn parse(kind_str: &str) -> Result<Self, DomainError> {
        match kind_str.trim().to_lowercase().replace(['-', '_'], "").as_str() {
            "segment" | "segmented" => Ok(TaskKind::Segment),
            "convert" | "converted" => Ok(TaskKind::Convert),
            "audio" | "extractaudio" => Ok(TaskKind::ExtractAudio),
            "resize" | "resized" => Ok(TaskKind::Resize),
            "frames" | "extractframes" => Ok(TaskKind::ExtractFrames),
            "thumbnail" | "generatethumbnail" => Ok(TaskKind::GenerateThumbnail),
            _ => Err(DomainError::BadArgs(format!(
                "Invalid task: {}. Valid tasks: segment, convert, audio, resize, frames, thumbnail",
                kind_str
            ))),
        }
    }

    /// Output subdirectory name under the input folder
    pub fn dir_name(&self) -> &'static str {
        match self {
            TaskKind::Segment => "segmented",
            TaskKind::Convert => "converted",
            TaskKind::ExtractAudio => "audio",
            TaskKind::Resize => "resized",
            TaskKind::ExtractFrames => "frames",
            TaskKind::GenerateThumbnail => "thumbnail",
        }
    }

    /// Report label recorded when the task succeeds
    pub fn label(&self) -> &'static str {
        match self {
            TaskKind::Segment => "Segmented",
            TaskKind::Convert => "Converted",
            TaskKind::ExtractAudio => "Extracted Audio",
            TaskKind::Resize => "Resized",
            TaskKind::ExtractFrames => "Extracted Frames",
            TaskKind::GenerateThumbnail => "Thumbnail Generated",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// Target height for the Resize task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResizeTarget {
    Original,
    P144,
    P240,
    P360,
    P480,
    P720,
    P1080,
}

impl ResizeTarget {
    /// Parse resize option ("Original", "144p" ... "1080p")
    pub fn parse(option: &str) -> Result<Self, DomainError> {
        match option.trim().to_lowercase().as_str() {
            "original" => Ok(ResizeTarget::Original),
            "144p" => Ok(ResizeTarget::P144),
            "240p" => Ok(ResizeTarget::P240),
            "360p" => Ok(ResizeTarget::P360),
            "480p" => Ok(ResizeTarget::P480),
            "720p" => Ok(ResizeTarget::P720),
            "1080p" => Ok(ResizeTarget::P1080),
            _ => Err(DomainError::InvalidResize(format!(
                "{}. Valid options: Original, 144p, 240p, 360p, 480p, 720p, 1080p",
                option
            ))),
        }
    }

    /// Target pixel height, `None` keeps the source size
    pub fn height(&self) -> Option<u32> {
        match self {
            ResizeTarget::Original => None,
            ResizeTarget::P144 => Some(144),
            ResizeTarget::P240 => Some(240),
            ResizeTarget::P360 => Some(360),
            ResizeTarget::P480 => Some(480),
            ResizeTarget::P720 => Some(720),
            ResizeTarget::P1080 => Some(1080),
        }
    }
}

/// Container used by the Convert task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConvertFormat {
    Avi,
    Mp4,
    Mov,
}

impl ConvertFormat {
    pub fn parse(format_str: &str) -> Result<Self, DomainError> {
        match format_str.trim().trim_start_matches('.').to_lowercase().as_str() {
            "avi" => Ok(ConvertFormat::Avi),
            "mp4" => Ok(ConvertFormat::Mp4),
            "mov" => Ok(ConvertFormat::Mov),
            _ => Err(DomainError::BadArgs(format!(
                "Invalid convert format: {}. Valid formats: avi, mp4, mov",
                format_str
            ))),
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ConvertFormat::Avi => "avi",
            ConvertFormat::Mp4 => "mp4",
            ConvertFormat::Mov => "mov",
        }
    }
}

/// What happens when a file or task fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FailurePolicy {
    /// Any failure aborts the whole run and no report is written
    #[default]
    AbortOnFirstFailure,
    /// Failures are recorded per file and the run goes on
    ContinueAndReport,
}

impl FailurePolicy {
    pub fn parse(policy_str: &str) -> Result<Self, DomainError> {
        match policy_str.trim().to_lowercase().as_str() {
            "abort" | "abort-on-first-failure" => Ok(FailurePolicy::AbortOnFirstFailure),
            "continue" | "continue-and-report" => Ok(FailurePolicy::ContinueAndReport),
            _ => Err(DomainError::BadArgs(format!(
                "Invalid failure policy: {}. Valid policies: abort, continue",
                policy_str
            ))),
        }
    }
}

/// Per-task parameters
#[derive(Debug, Clone, PartialEq)]
pub struct TaskSettings {
    /// Fraction of the duration kept by Segment, in (0, 1]
    pub segment_ratio: f64,
    pub convert_format: ConvertFormat,
    /// Raw resize option; validated when a run that selects Resize starts
    pub resize: String,
}

impl Default for TaskSettings {
    fn default() -> Self {
        Self {
            segment_ratio: 0.5,
            convert_format: ConvertFormat::Avi,
            resize: "360p".to_string(),
        }
    }
}

impl TaskSettings {
    /// Create task settings with validation
    pub fn new(
        segment_ratio: f64,
        convert_format: ConvertFormat,
        resize: impl Into<String>,
    ) -> Result<Self, DomainError> {
        if !(segment_ratio > 0.0 && segment_ratio <= 1.0) {
            return Err(DomainError::BadArgs(format!(
                "Segment ratio must be in (0, 1], got {}",
                segment_ratio
            )));
        }

        Ok(Self {
            segment_ratio,
            convert_format,
            resize: resize.into(),
        })
    }

    pub fn resize_target(&self) -> Result<ResizeTarget, DomainError> {
        ResizeTarget::parse(&self.resize)
    }
}

/// Immutable parameters of one batch invocation
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub input_folder: PathBuf,
    pub selected_tasks: Vec<TaskKind>,
    pub extract_metadata: bool,
    pub settings: TaskSettings,
    pub failure_policy: FailurePolicy,
}

impl RunConfig {
    /// Create run config; repeated task kinds keep their first position
    pub fn new(
        input_folder: impl Into<PathBuf>,
        tasks: impl IntoIterator<Item = TaskKind>,
        extract_metadata: bool,
    ) -> Self {
        let mut selected_tasks = Vec::new();
        for task in tasks {
            if !selected_tasks.contains(&task) {
                selected_tasks.push(task);
            }
        }

        Self {
            input_folder: input_folder.into(),
            selected_tasks,
            extract_metadata,
            settings: TaskSettings::default(),
            failure_policy: FailurePolicy::default(),
        }
    }

    pub fn with_settings(mut self, settings: TaskSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Output directory of a task kind
    pub fn task_dir(&self, kind: TaskKind) -> PathBuf {
        self.input_folder.join(kind.dir_name())
    }

    pub fn selects(&self, kind: TaskKind) -> bool {
        self.selected_tasks.contains(&kind)
    }
}

/// A discovered input file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoFileRef {
    pub path: PathBuf,
    pub file_name: String,
}

impl VideoFileRef {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, DomainError> {
        let path = path.into();
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .ok_or_else(|| {
                DomainError::BadArgs(format!("Path has no file name: {}", path.display()))
            })?;

        Ok(Self { path, file_name })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Result of one task on one file
#[derive(Debug, Clone, PartialEq)]
pub struct TaskOutcome {
    pub kind: TaskKind,
    pub label: String,
    pub success: bool,
    pub artifacts: Vec<PathBuf>,
}

impl TaskOutcome {
    pub fn succeeded(kind: TaskKind, artifacts: Vec<PathBuf>) -> Self {
        Self {
            kind,
            label: kind.label().to_string(),
            success: true,
            artifacts,
        }
    }
}

/// Stream properties of a video file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    pub width: u32,
    pub height: u32,
    pub frame_rate: u32,
    pub duration_seconds: u64,
    /// Raw codec tag as reported by the demuxer
    pub codec_tag: u32,
}

/// Report rendering of [`Metadata`]
#[derive(Debug, Clone, Serialize)]
pub struct MetadataRecord {
    #[serde(rename = "Resolution")]
    pub resolution: String,
    #[serde(rename = "Frame Rate")]
    pub frame_rate: String,
    #[serde(rename = "Duration")]
    pub duration: String,
    #[serde(rename = "Codec")]
    pub codec: u32,
}

impl Metadata {
    pub fn resolution(&self) -> String {
        format!("{}x{}", self.width, self.height)
    }

    pub fn to_record(&self) -> MetadataRecord {
        MetadataRecord {
            resolution: self.resolution(),
            frame_rate: format!("{} fps", self.frame_rate),
            duration: format!("{} seconds", self.duration_seconds),
            codec: self.codec_tag,
        }
    }
}

impl Serialize for Metadata {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_record().serialize(serializer)
    }
}

/// Outcome of a whole file
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "reason")]
pub enum FileStatus {
    Succeeded,
    /// Nothing was attempted (the file could not be opened)
    Skipped(String),
    /// At least one task or the metadata read failed
    Failed(String),
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileStatus::Succeeded => write!(f, "succeeded"),
            FileStatus::Skipped(reason) => write!(f, "skipped: {}", reason),
            FileStatus::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

/// One report row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileReport {
    pub file_name: String,
    pub tasks: Vec<String>,
    pub metadata: Option<Metadata>,
    pub status: FileStatus,
}

impl FileReport {
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            tasks: Vec::new(),
            metadata: None,
            status: FileStatus::Succeeded,
        }
    }

    pub fn record(&mut self, outcome: &TaskOutcome) {
        if outcome.success {
            self.tasks.push(outcome.label.clone());
        }
    }

    /// Record a failure, keeping earlier reasons
    pub fn fail(&mut self, reason: impl Into<String>) {
        let reason = reason.into();
        self.status = match &self.status {
            FileStatus::Failed(previous) => FileStatus::Failed(format!("{}; {}", previous, reason)),
            _ => FileStatus::Failed(reason),
        };
    }

    pub fn tasks_column(&self) -> String {
        self.tasks.join("; ")
    }
}

/// Whole-run result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub folder: PathBuf,
    pub rows: Vec<FileReport>,
    pub metadata_requested: bool,
    pub failure_policy: FailurePolicy,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunReport {
    pub fn total_files(&self) -> usize {
        self.rows.len()
    }

    pub fn failed_files(&self) -> usize {
        self.rows
            .iter()
            .filter(|row| row.status != FileStatus::Succeeded)
            .count()
    }
}

/// Progress notification emitted by the pipeline
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    /// A task is about to run on a file
    TaskStarted { file_name: String, task: TaskKind },
    /// A file's processing block completed (1-based index)
    FileFinished { index: usize, total: usize },
}

impl fmt::Display for ProgressEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProgressEvent::TaskStarted { task, .. } => write!(f, "{}", task),
            ProgressEvent::FileFinished { index, total } => {
                write!(f, "Processing: File {}/{}", index, total)
            }
        }
    }
}
