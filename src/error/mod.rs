//! Error handling module for VidBatch media adapters

use thiserror::Error;

/// Error type for libav-backed media operations
#[derive(Error, Debug)]
pub enum MediaError {
    /// FFmpeg initialization error
    #[error("Failed to initialize FFmpeg: {message}")]
    FFmpegInitError { message: String },

    /// Input could not be opened or demuxed
    #[error("Failed to open media file {path}: {message}")]
    OpenError { path: String, message: String },

    /// The input has no stream of the requested kind
    #[error("No {kind} stream found in {path}")]
    StreamNotFound { kind: &'static str, path: String },

    /// No usable encoder for the requested codec
    #[error("Encoder not available: {name}")]
    EncoderNotFound { name: String },

    /// Decode/encode pipeline failure
    #[error("Transcoding failed: {message}")]
    TranscodeError { message: String },

    /// Frame could not be located or converted
    #[error("Frame extraction failed: {message}")]
    FrameError { message: String },

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// FFmpeg error
    #[error("FFmpeg error: {0}")]
    FFmpegError(#[from] ffmpeg_next::Error),

    /// Image encoding error
    #[error("Image error: {0}")]
    ImageError(#[from] image::ImageError),

    /// CSV serialization error
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    /// Atomic report replacement failed
    #[error("Failed to persist file: {0}")]
    PersistError(#[from] tempfile::PersistError),

    /// JSON rendering error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Result type alias for media operations
pub type MediaResult<T> = std::result::Result<T, MediaError>;
