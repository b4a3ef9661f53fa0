//! Frame decoding to RGB images
//!
//! [`FrameGrabber`] keeps one demuxer and decoder open and seeks for every
//! request; [`first_frame`] is a one-shot read used for thumbnails.

use std::path::Path;

use ffmpeg_next::format::{self, Pixel};
use ffmpeg_next::software::scaling::{context::Context as ScalingContext, flag::Flags as ScalingFlags};
use ffmpeg_next::util::frame::video::Video as VideoFrame;
use ffmpeg_next::{codec, decoder, media, Rational};
use image::RgbImage;
use tracing::{debug, trace};

use crate::engine::{input_duration, open_input, seconds_to_ts, ts_to_seconds};
use crate::error::{MediaError, MediaResult};

/// Frames whose timestamp is this close below the target still match
const TIMESTAMP_TOLERANCE: f64 = 0.001;

/// Random access to decoded frames of one file
pub struct FrameGrabber {
    ictx: format::context::Input,
    decoder: decoder::Video,
    stream_index: usize,
    time_base: Rational,
    /// Stream start in `time_base` units
    start_ts: i64,
    duration: f64,
}

impl FrameGrabber {
    /// Open `path` and prepare a decoder for its best video stream
    pub fn open(path: &Path) -> MediaResult<Self> {
        let ictx = open_input(path)?;
        let duration = input_duration(&ictx).ok_or_else(|| MediaError::OpenError {
            path: path.display().to_string(),
            message: "duration is unknown".to_string(),
        })?;

        let (stream_index, time_base, start_ts, decoder) = {
            let stream = ictx
                .streams()
                .best(media::Type::Video)
                .ok_or_else(|| MediaError::StreamNotFound {
                    kind: "video",
                    path: path.display().to_string(),
                })?;
            let context = codec::context::Context::from_parameters(stream.parameters())?;
            let decoder = context.decoder().video()?;
            let start_ts = match stream.start_time() {
                ts if ts == ffmpeg_next::ffi::AV_NOPTS_VALUE => 0,
                ts => ts,
            };
            (stream.index(), stream.time_base(), start_ts, decoder)
        };

        debug!(
            "Opened {} ({:.2}s, {}x{})",
            path.display(),
            duration,
            decoder.width(),
            decoder.height()
        );

        Ok(Self {
            ictx,
            decoder,
            stream_index,
            time_base,
            start_ts,
            duration,
        })
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// Decode the frame displayed at `seconds` from the stream start.
    ///
    /// Past the last frame, the last decoded frame is returned.
    pub fn frame_at(&mut self, seconds: f64) -> MediaResult<RgbImage> {
        let target_ts = self.start_ts + seconds_to_ts(seconds, self.time_base);
        let seek_ts = (ts_to_seconds(target_ts, self.time_base)
            * f64::from(ffmpeg_next::ffi::AV_TIME_BASE)) as i64;

        // Lands on the closest keyframe at or before the target
        self.ictx.seek(seek_ts, ..seek_ts)?;
        self.decoder.flush();

        let target = seconds - TIMESTAMP_TOLERANCE;
        let mut decoded = VideoFrame::empty();
        let mut last: Option<VideoFrame> = None;

        for (stream, packet) in self.ictx.packets() {
            if stream.index() != self.stream_index {
                continue;
            }
            self.decoder.send_packet(&packet)?;
            while self.decoder.receive_frame(&mut decoded).is_ok() {
                let ts = decoded.timestamp().unwrap_or(self.start_ts) - self.start_ts;
                if ts_to_seconds(ts, self.time_base) >= target {
                    trace!("Frame for {:.3}s found at {:.3}s", seconds, ts_to_seconds(ts, self.time_base));
                    return frame_to_image(&decoded);
                }
                last = Some(decoded.clone());
            }
        }

        self.decoder.send_eof()?;
        while self.decoder.receive_frame(&mut decoded).is_ok() {
            let ts = decoded.timestamp().unwrap_or(self.start_ts) - self.start_ts;
            if ts_to_seconds(ts, self.time_base) >= target {
                return frame_to_image(&decoded);
            }
            last = Some(decoded.clone());
        }

        match last {
            Some(frame) => frame_to_image(&frame),
            None => Err(MediaError::FrameError {
                message: format!("No frame decodable at {:.3}s", seconds),
            }),
        }
    }
}

/// Decode the first frame of `path`.
///
/// `Ok(None)` when no frame can be read: the stream has no usable decoder,
/// every packet is rejected, or the frame cannot be converted. Only a file
/// that cannot be opened or has no video stream is an error.
pub fn first_frame(path: &Path) -> MediaResult<Option<RgbImage>> {
    let mut ictx = open_input(path)?;
    let stream = ictx
        .streams()
        .best(media::Type::Video)
        .ok_or_else(|| MediaError::StreamNotFound {
            kind: "video",
            path: path.display().to_string(),
        })?;
    let stream_index = stream.index();
    let decoder = codec::context::Context::from_parameters(stream.parameters())
        .and_then(|context| context.decoder().video());
    let mut decoder = match decoder {
        Ok(decoder) => decoder,
        Err(e) => {
            debug!("No video decoder for {}: {}", path.display(), e);
            return Ok(None);
        }
    };

    let mut decoded = VideoFrame::empty();
    let mut found = false;
    for (stream, packet) in ictx.packets() {
        if stream.index() != stream_index {
            continue;
        }
        if let Err(e) = decoder.send_packet(&packet) {
            trace!("Skipping undecodable packet in {}: {}", path.display(), e);
            continue;
        }
        if decoder.receive_frame(&mut decoded).is_ok() {
            found = true;
            break;
        }
    }

    if !found {
        found = decoder.send_eof().is_ok() && decoder.receive_frame(&mut decoded).is_ok();
    }
    if !found {
        return Ok(None);
    }

    match frame_to_image(&decoded) {
        Ok(image) => Ok(Some(image)),
        Err(e) => {
            debug!("Cannot convert first frame of {}: {}", path.display(), e);
            Ok(None)
        }
    }
}

/// Convert a decoded frame to a packed RGB image
pub fn frame_to_image(frame: &VideoFrame) -> MediaResult<RgbImage> {
    let (width, height) = (frame.width(), frame.height());
    let mut scaler = ScalingContext::get(
        frame.format(),
        width,
        height,
        Pixel::RGB24,
        width,
        height,
        ScalingFlags::BILINEAR,
    )?;

    let mut rgb = VideoFrame::empty();
    scaler.run(frame, &mut rgb)?;

    // Rows may be padded past width * 3
    let stride = rgb.stride(0);
    let row_bytes = width as usize * 3;
    let data = rgb.data(0);
    let mut buffer = Vec::with_capacity(row_bytes * height as usize);
    for row in 0..height as usize {
        let start = row * stride;
        buffer.extend_from_slice(&data[start..start + row_bytes]);
    }

    RgbImage::from_raw(width, height, buffer).ok_or_else(|| MediaError::FrameError {
        message: format!("Frame buffer does not fit {}x{}", width, height),
    })
}
