// Domain errors - Error types for the domain layer

use std::fmt;

use crate::error::MediaError;

/// Domain-specific error types
#[derive(Debug, Clone, PartialEq)]
pub enum DomainError {
    /// Invalid arguments provided
    BadArgs(String),
    /// Input file could not be opened
    OpenFailed(String),
    /// Resize option outside the supported set
    InvalidResize(String),
    /// A task failed while producing its artifacts
    TaskFailed(String),
    /// Metadata could not be read
    MetadataFailed(String),
    /// Report could not be written
    ReportFailed(String),
    /// Filesystem operation failed
    FsFail(String),
    /// Configuration could not be loaded
    ConfigFail(String),
    /// A run is already in progress
    Busy,
}

impl fmt::Display for DomainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DomainError::BadArgs(msg) => write!(f, "Bad arguments: {}", msg),
            DomainError::OpenFailed(msg) => write!(f, "Open failed: {}", msg),
            DomainError::InvalidResize(msg) => write!(f, "Invalid resize option: {}", msg),
            DomainError::TaskFailed(msg) => write!(f, "Task failed: {}", msg),
            DomainError::MetadataFailed(msg) => write!(f, "Metadata extraction failed: {}", msg),
            DomainError::ReportFailed(msg) => write!(f, "Report failed: {}", msg),
            DomainError::FsFail(msg) => write!(f, "Filesystem error: {}", msg),
            DomainError::ConfigFail(msg) => write!(f, "Configuration error: {}", msg),
            DomainError::Busy => write!(f, "A batch run is already in progress"),
        }
    }
}

impl std::error::Error for DomainError {}

impl From<MediaError> for DomainError {
    fn from(err: MediaError) -> Self {
        match err {
            MediaError::OpenError { .. } => DomainError::OpenFailed(err.to_string()),
            MediaError::IoError(_) | MediaError::PersistError(_) => {
                DomainError::FsFail(err.to_string())
            }
            MediaError::CsvError(_) => DomainError::ReportFailed(err.to_string()),
            _ => DomainError::TaskFailed(err.to_string()),
        }
    }
}

/// Run-fatal error: aborts the remainder of a batch run
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessingError {
    pub message: String,
}

impl ProcessingError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for ProcessingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ProcessingError {}

impl From<DomainError> for ProcessingError {
    fn from(err: DomainError) -> Self {
        Self::new(err.to_string())
    }
}
