//! VidBatch Library
//!
//! Batch processing of a folder of videos: segmenting, format conversion,
//! audio extraction, resizing, frame extraction and thumbnails, with a CSV
//! report of what was done per file.

pub mod adapters;
pub mod app;
pub mod cli;
pub mod config_initialization;
pub mod domain;
pub mod engine;
pub mod error;
pub mod ports;
pub mod utils;

// Re-export commonly used types
pub use app::{BatchInteractor, BatchRunner, RunEvent, RunHandle};
pub use domain::errors::{DomainError, ProcessingError};
pub use domain::model::{FailurePolicy, RunConfig, RunReport, TaskKind, TaskSettings};
pub use error::{MediaError, MediaResult};

