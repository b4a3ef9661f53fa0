// Application configuration - Layered settings (CLI > env > file > defaults)

use serde::{Deserialize, Serialize};

use crate::domain::errors::DomainError;
use crate::domain::model::*;

/// Environment variables recognized as configuration overrides
pub const ENV_OVERRIDES: [&str; 8] = [
    "VIDBATCH_LOG_LEVEL",
    "VIDBATCH_ON_FAILURE",
    "VIDBATCH_RESIZE",
    "VIDBATCH_CONVERT_FORMAT",
    "VIDBATCH_VIDEO_CODEC",
    "VIDBATCH_CRF",
    "VIDBATCH_PRESET",
    "VIDBATCH_THREADS",
];

/// Complete application configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub batch: BatchSection,
    pub tasks: TasksSection,
    pub encoding: EncodeSettings,
    pub logging: LoggingSection,
}

/// `[batch]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchSection {
    /// Default task selection when none is given on the command line
    pub tasks: Vec<String>,
    pub extract_metadata: bool,
    pub on_failure: String,
}

impl Default for BatchSection {
    fn default() -> Self {
        Self {
            tasks: Vec::new(),
            extract_metadata: false,
            on_failure: "abort".to_string(),
        }
    }
}

/// `[tasks]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TasksSection {
    pub segment_ratio: f64,
    pub convert_format: String,
    pub resize: String,
}

impl Default for TasksSection {
    fn default() -> Self {
        Self {
            segment_ratio: 0.5,
            convert_format: "avi".to_string(),
            resize: "360p".to_string(),
        }
    }
}

/// `[encoding]` section, consumed by the libav adapter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodeSettings {
    /// Encoder name for Segment, Convert and Resize
    pub video_codec: String,
    /// Constant Rate Factor (0-51)
    pub crf: u8,
    pub preset: String,
    /// Codec threads; 0 picks from the CPU count
    pub threads: usize,
}

impl Default for EncodeSettings {
    fn default() -> Self {
        Self {
            video_codec: "libx264".to_string(),
            crf: 23,
            preset: "medium".to_string(),
            threads: 0,
        }
    }
}

impl EncodeSettings {
    /// Effective codec thread count
    pub fn thread_count(&self) -> usize {
        if self.threads > 0 {
            return self.threads;
        }
        // Leave headroom for the demuxer and muxer
        let optimal_threads = (num_cpus::get() as f64 * 0.75).ceil() as usize;
        optimal_threads.clamp(1, 16)
    }
}

/// `[logging]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Apply environment overrides; returns how many were applied
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<usize, DomainError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut applied = 0;
        for key in ENV_OVERRIDES {
            let Some(value) = lookup(key) else {
                continue;
            };
            match key {
                "VIDBATCH_LOG_LEVEL" => self.logging.level = value,
                "VIDBATCH_ON_FAILURE" => self.batch.on_failure = value,
                "VIDBATCH_RESIZE" => self.tasks.resize = value,
                "VIDBATCH_CONVERT_FORMAT" => self.tasks.convert_format = value,
                "VIDBATCH_VIDEO_CODEC" => self.encoding.video_codec = value,
                "VIDBATCH_CRF" => {
                    self.encoding.crf = value.parse().map_err(|e| {
                        DomainError::ConfigFail(format!("Invalid VIDBATCH_CRF '{}': {}", value, e))
                    })?
                }
                "VIDBATCH_PRESET" => self.encoding.preset = value,
                "VIDBATCH_THREADS" => {
                    self.encoding.threads = value.parse().map_err(|e| {
                        DomainError::ConfigFail(format!(
                            "Invalid VIDBATCH_THREADS '{}': {}",
                            value, e
                        ))
                    })?
                }
                _ => continue,
            }
            applied += 1;
        }
        Ok(applied)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.encoding.crf > 51 {
            return Err(DomainError::ConfigFail(format!(
                "CRF value {} is invalid (must be 0-51)",
                self.encoding.crf
            )));
        }
        if self.encoding.video_codec.trim().is_empty() {
            return Err(DomainError::ConfigFail("Video codec cannot be empty".to_string()));
        }
        self.failure_policy()?;
        self.task_settings()?;
        self.default_tasks()?;
        Ok(())
    }

    pub fn failure_policy(&self) -> Result<FailurePolicy, DomainError> {
        FailurePolicy::parse(&self.batch.on_failure)
    }

    /// Task settings; the resize option is left unchecked here
    pub fn task_settings(&self) -> Result<TaskSettings, DomainError> {
        TaskSettings::new(
            self.tasks.segment_ratio,
            ConvertFormat::parse(&self.tasks.convert_format)?,
            self.tasks.resize.clone(),
        )
    }

    pub fn default_tasks(&self) -> Result<Vec<TaskKind>, DomainError> {
        self.batch.tasks.iter().map(|t| TaskKind::parse(t)).collect()
    }
}
