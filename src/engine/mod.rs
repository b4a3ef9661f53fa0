//! libav processing engine
//!
//! Blocking decode/encode routines used by the libav adapters. Every routine
//! opens its own demuxer so callers never share packet-reading state.

use std::path::Path;
use std::sync::Once;

use ffmpeg_next::format;
use ffmpeg_next::Rational;
use tracing::debug;

use crate::error::{MediaError, MediaResult};

pub mod audio;
pub mod frames;
pub mod metadata;
pub mod transcode;

static INIT: Once = Once::new();

/// Initialize libav once per process and quiet its own logging
pub fn init() -> MediaResult<()> {
    let mut result = Ok(());
    INIT.call_once(|| {
        result = ffmpeg_next::init().map_err(|e| MediaError::FFmpegInitError {
            message: e.to_string(),
        });
        ffmpeg_next::util::log::set_level(ffmpeg_next::util::log::Level::Error);
        debug!("libav initialized");
    });
    result
}

/// Open an input file for demuxing
pub fn open_input(path: &Path) -> MediaResult<format::context::Input> {
    format::input(&path).map_err(|e| MediaError::OpenError {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

/// Create an output context; the muxer follows the file extension
pub fn open_output(path: &Path) -> MediaResult<format::context::Output> {
    format::output(&path).map_err(|e| MediaError::TranscodeError {
        message: format!("Failed to create output {}: {}", path.display(), e),
    })
}

/// Duration of an opened input in seconds
pub fn input_duration(ictx: &format::context::Input) -> Option<f64> {
    let container = ictx.duration();
    if container > 0 {
        return Some(container as f64 / f64::from(ffmpeg_next::ffi::AV_TIME_BASE));
    }

    // Some containers only carry per-stream durations
    ictx.streams()
        .best(ffmpeg_next::media::Type::Video)
        .filter(|stream| stream.duration() > 0)
        .map(|stream| stream.duration() as f64 * f64::from(stream.time_base()))
}

/// Convert a timestamp in `time_base` units to seconds
pub fn ts_to_seconds(ts: i64, time_base: Rational) -> f64 {
    ts as f64 * f64::from(time_base)
}

/// Convert seconds to a timestamp in `time_base` units
pub fn seconds_to_ts(seconds: f64, time_base: Rational) -> i64 {
    let unit = f64::from(time_base);
    if unit <= 0.0 {
        return 0;
    }
    (seconds / unit).round() as i64
}
