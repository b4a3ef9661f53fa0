//! Stream property reads for the report's metadata column

use std::path::Path;

use ffmpeg_next::{codec, media};
use tracing::debug;

use crate::domain::model::Metadata;
use crate::domain::rules::SamplingRules;
use crate::engine::{input_duration, open_input};
use crate::error::{MediaError, MediaResult};

/// Read resolution, frame rate, duration and codec tag of the best video stream.
///
/// Duration is the frame count divided by the truncated frame rate. When the
/// container does not store a frame count it is estimated from the duration.
pub fn read_metadata(path: &Path) -> MediaResult<Metadata> {
    let ictx = open_input(path)?;
    let stream = ictx
        .streams()
        .best(media::Type::Video)
        .ok_or_else(|| MediaError::StreamNotFound {
            kind: "video",
            path: path.display().to_string(),
        })?;

    let parameters = stream.parameters();
    // Safety: the parameters belong to a stream of the still-open input
    let codec_tag = unsafe { (*parameters.as_ptr()).codec_tag };

    let context = codec::context::Context::from_parameters(parameters)?;
    let decoder = context.decoder().video()?;

    let rate = match stream.avg_frame_rate() {
        rate if rate.numerator() > 0 && rate.denominator() > 0 => rate,
        _ => stream.rate(),
    };
    let frame_rate = SamplingRules::truncated_rate(rate.numerator(), rate.denominator());

    let frame_count = match stream.frames() {
        count if count > 0 => count as u64,
        _ => {
            let seconds = input_duration(&ictx).unwrap_or(0.0);
            (seconds * f64::from(rate)).round().max(0.0) as u64
        }
    };

    let duration_seconds = SamplingRules::duration_from_frames(frame_count, frame_rate)
        .ok_or_else(|| MediaError::FrameError {
            message: format!("{} reports a zero frame rate", path.display()),
        })?;

    let metadata = Metadata {
        width: decoder.width(),
        height: decoder.height(),
        frame_rate,
        duration_seconds,
        codec_tag,
    };
    debug!("Metadata for {}: {:?}", path.display(), metadata);
    Ok(metadata)
}
