//! Video re-encoding for the Segment, Convert and Resize tasks
//!
//! The best video stream is decoded, optionally scaled, and re-encoded with
//! the configured encoder. Audio streams are copied when the target muxer
//! accepts their codec and re-encoded to its default audio codec otherwise.
//! Output timestamps are measured from the video stream's start, so the
//! output starts at zero. When an end time is set, frames and audio packets
//! at or past it are dropped and demuxing stops once the video has passed it.

use std::path::Path;
use std::time::Instant;

use ffmpeg_next::codec::{self, decoder, encoder, threading};
use ffmpeg_next::format::{self, Pixel};
use ffmpeg_next::software::scaling::{context::Context as ScalingContext, flag::Flags as ScalingFlags};
use ffmpeg_next::util::frame::video::Video as VideoFrame;
use ffmpeg_next::{ffi, media, picture, Dictionary, Packet, Rational, Rescale};
use tracing::{debug, info};

use crate::domain::rules::SamplingRules;
use crate::engine::audio::AudioTranscoder;
use crate::engine::{open_input, open_output, seconds_to_ts, ts_to_seconds};
use crate::error::{MediaError, MediaResult};

/// `FF_COMPLIANCE_NORMAL`
const STD_COMPLIANCE_NORMAL: i32 = 0;

/// Re-encode parameters
#[derive(Debug, Clone, PartialEq)]
pub struct TranscodeOptions {
    /// Drop source time at or after this point, counted from the stream start
    pub end_seconds: Option<f64>,
    /// Output height; width follows the source aspect ratio
    pub target_height: Option<u32>,
    pub video_codec: String,
    pub crf: u8,
    pub preset: String,
    pub threads: usize,
}

/// Summary of a finished transcode
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TranscodeStats {
    pub frames_encoded: u64,
    pub audio_reencoded: usize,
    pub width: u32,
    pub height: u32,
}

/// Where packets of one input stream go
enum Route {
    Video,
    Copy { ost_index: usize },
    Encode { transcoder: usize },
}

/// Whether the output muxer can store `codec_id` without re-encoding.
///
/// Muxers that cannot tell are trusted to take it.
fn muxer_accepts(octx: &format::context::Output, codec_id: codec::Id) -> bool {
    let answer = unsafe {
        ffi::avformat_query_codec(octx.format().as_ptr(), codec_id.into(), STD_COMPLIANCE_NORMAL)
    };
    answer != 0
}

/// Start of `stream` in seconds, zero when unset
fn stream_start_seconds(stream: &format::stream::Stream) -> f64 {
    match stream.start_time() {
        ts if ts == ffi::AV_NOPTS_VALUE => 0.0,
        ts => ts_to_seconds(ts, stream.time_base()),
    }
}

/// Re-encode `input_path` into `output_path`
pub fn transcode_video(
    input_path: &Path,
    output_path: &Path,
    options: &TranscodeOptions,
) -> MediaResult<TranscodeStats> {
    let started = Instant::now();
    let mut ictx = open_input(input_path)?;
    let mut octx = open_output(output_path)?;

    let (video_index, origin) = {
        let stream = ictx
            .streams()
            .best(media::Type::Video)
            .ok_or_else(|| MediaError::StreamNotFound {
                kind: "video",
                path: input_path.display().to_string(),
            })?;
        (stream.index(), stream_start_seconds(&stream))
    };
    let global_header = octx.format().flags().contains(format::Flags::GLOBAL_HEADER);
    let audio_codec = octx.format().codec(&output_path, media::Type::Audio);

    let stream_count = ictx.nb_streams() as usize;
    let mut routes: Vec<Option<Route>> = (0..stream_count).map(|_| None).collect();
    let mut ist_time_bases = vec![Rational(0, 1); stream_count];
    let mut video: Option<VideoReencoder> = None;
    let mut audio: Vec<AudioTranscoder> = Vec::new();
    let mut ost_index = 0;

    for (ist_index, ist) in ictx.streams().enumerate() {
        let route = if ist_index == video_index {
            video = Some(VideoReencoder::new(&ist, &mut octx, ost_index, origin, options, global_header)?);
            Route::Video
        } else if ist.parameters().medium() == media::Type::Audio {
            let source_codec = ist.parameters().id();
            if muxer_accepts(&octx, source_codec) {
                let mut ost = octx.add_stream(encoder::find(codec::Id::None))?;
                ost.set_parameters(ist.parameters());
                // Let the muxer choose a tag valid for its own container
                unsafe {
                    (*ost.parameters().as_mut_ptr()).codec_tag = 0;
                }
                Route::Copy { ost_index }
            } else {
                debug!(
                    "{:?} audio in stream {} does not fit {}, re-encoding to {:?}",
                    source_codec,
                    ist_index,
                    output_path.display(),
                    audio_codec
                );
                audio.push(AudioTranscoder::new(&ist, &mut octx, audio_codec, ost_index)?);
                Route::Encode {
                    transcoder: audio.len() - 1,
                }
            }
        } else {
            continue;
        };
        routes[ist_index] = Some(route);
        ist_time_bases[ist_index] = ist.time_base();
        ost_index += 1;
    }

    let mut video = video.ok_or_else(|| MediaError::StreamNotFound {
        kind: "video",
        path: input_path.display().to_string(),
    })?;

    octx.set_metadata(ictx.metadata().to_owned());
    octx.write_header()?;

    let ost_time_bases: Vec<Rational> = octx.streams().map(|stream| stream.time_base()).collect();
    let video_ost_tb = ost_time_bases[video.ost_index];
    for transcoder in &mut audio {
        transcoder.sync_output_time_base(&octx);
    }

    for (stream, mut packet) in ictx.packets() {
        let ist_index = stream.index();
        let Some(route) = &routes[ist_index] else {
            continue;
        };

        match *route {
            Route::Video => {
                video.decoder.send_packet(&packet)?;
                video.receive_and_process_decoded_frames(&mut octx, video_ost_tb)?;
                if video.past_end {
                    debug!("Reached clip end at {:?}s", options.end_seconds);
                    break;
                }
            }
            Route::Copy { ost_index } => {
                let time_base = ist_time_bases[ist_index];
                if !shift_to_origin(&mut packet, origin, time_base, options.end_seconds) {
                    continue;
                }
                packet.rescale_ts(time_base, ost_time_bases[ost_index]);
                packet.set_position(-1);
                packet.set_stream(ost_index);
                packet.write_interleaved(&mut octx)?;
            }
            Route::Encode { transcoder } => {
                let time_base = ist_time_bases[ist_index];
                if !shift_to_origin(&mut packet, origin, time_base, options.end_seconds) {
                    continue;
                }
                audio[transcoder].send_packet(&packet, &mut octx)?;
            }
        }
    }

    video.finish(&mut octx, video_ost_tb)?;
    for transcoder in &mut audio {
        transcoder.finish(&mut octx)?;
    }
    octx.write_trailer()?;

    let stats = TranscodeStats {
        frames_encoded: video.frames_encoded,
        audio_reencoded: audio.len(),
        width: video.width,
        height: video.height,
    };
    info!(
        "Encoded {} frames at {}x{} into {} in {:.2}s",
        stats.frames_encoded,
        stats.width,
        stats.height,
        output_path.display(),
        started.elapsed().as_secs_f64()
    );
    Ok(stats)
}

/// Move a packet onto the output timeline.
///
/// Returns `false` when the packet lies at or past `end_seconds`.
fn shift_to_origin(packet: &mut Packet, origin: f64, time_base: Rational, end_seconds: Option<f64>) -> bool {
    let offset = seconds_to_ts(origin, time_base);
    if let Some(end) = end_seconds {
        let ts = packet.pts().or(packet.dts()).unwrap_or(offset);
        if ts_to_seconds(ts - offset, time_base) >= end {
            return false;
        }
    }
    packet.set_pts(packet.pts().map(|ts| ts - offset));
    packet.set_dts(packet.dts().map(|ts| ts - offset));
    true
}

struct VideoReencoder {
    ost_index: usize,
    decoder: decoder::Video,
    encoder: encoder::video::Encoder,
    scaler: Option<ScalingContext>,
    input_time_base: Rational,
    /// Video stream start in `input_time_base` units
    start_ts: i64,
    /// 1/fps when the rate is known, so constant-rate muxers see one tick per frame
    encoder_time_base: Rational,
    last_pts: Option<i64>,
    end_pts: Option<i64>,
    past_end: bool,
    frames_encoded: u64,
    width: u32,
    height: u32,
}

impl VideoReencoder {
    fn new(
        ist: &format::stream::Stream,
        octx: &mut format::context::Output,
        ost_index: usize,
        origin: f64,
        options: &TranscodeOptions,
        global_header: bool,
    ) -> MediaResult<Self> {
        let mut context = codec::context::Context::from_parameters(ist.parameters())?;
        context.set_threading(threading::Config {
            kind: threading::Type::Frame,
            count: options.threads,
            ..Default::default()
        });
        let decoder = context.decoder().video()?;

        let codec = encoder::find_by_name(&options.video_codec).ok_or_else(|| {
            MediaError::EncoderNotFound {
                name: options.video_codec.clone(),
            }
        })?;

        let (width, height) =
            SamplingRules::scaled_size(decoder.width(), decoder.height(), options.target_height);
        let pixel_format = Self::pick_pixel_format(&codec, decoder.format());

        let mut ost = octx.add_stream(codec)?;
        let mut encoder = codec::context::Context::new_with_codec(codec)
            .encoder()
            .video()?;
        encoder.set_width(width);
        encoder.set_height(height);
        encoder.set_aspect_ratio(decoder.aspect_ratio());
        encoder.set_format(pixel_format);
        let frame_rate = decoder
            .frame_rate()
            .filter(|rate| rate.numerator() > 0 && rate.denominator() > 0)
            .or_else(|| {
                let rate = ist.avg_frame_rate();
                (rate.numerator() > 0 && rate.denominator() > 0).then_some(rate)
            });
        let encoder_time_base = frame_rate.map(|rate| rate.invert()).unwrap_or(ist.time_base());
        encoder.set_frame_rate(frame_rate);
        encoder.set_time_base(encoder_time_base);
        ost.set_time_base(encoder_time_base);
        if global_header {
            encoder.set_flags(codec::Flags::GLOBAL_HEADER);
        }

        let mut encoder_options = Dictionary::new();
        encoder_options.set("preset", &options.preset);
        encoder_options.set("crf", &options.crf.to_string());
        encoder_options.set("threads", &options.threads.to_string());

        let encoder = encoder.open_with(encoder_options).map_err(|e| MediaError::TranscodeError {
            message: format!("Failed to open encoder {}: {}", options.video_codec, e),
        })?;
        ost.set_parameters(&encoder);

        let scaler = if (width, height, pixel_format)
            != (decoder.width(), decoder.height(), decoder.format())
        {
            Some(ScalingContext::get(
                decoder.format(),
                decoder.width(),
                decoder.height(),
                pixel_format,
                width,
                height,
                ScalingFlags::BILINEAR,
            )?)
        } else {
            None
        };

        debug!(
            "Video encoder {} {}x{} {:?} (source {}x{} {:?})",
            options.video_codec,
            width,
            height,
            pixel_format,
            decoder.width(),
            decoder.height(),
            decoder.format()
        );

        Ok(Self {
            ost_index,
            decoder,
            encoder,
            scaler,
            input_time_base: ist.time_base(),
            start_ts: seconds_to_ts(origin, ist.time_base()),
            encoder_time_base,
            last_pts: None,
            end_pts: options
                .end_seconds
                .map(|end| seconds_to_ts(origin + end, ist.time_base())),
            past_end: false,
            frames_encoded: 0,
            width,
            height,
        })
    }

    /// Keep the source pixel format when the encoder accepts it
    fn pick_pixel_format(codec: &codec::Codec, source: Pixel) -> Pixel {
        let supported: Vec<Pixel> = codec
            .video()
            .ok()
            .and_then(|video| video.formats())
            .map(|formats| formats.collect())
            .unwrap_or_default();

        if supported.is_empty() || supported.contains(&source) {
            source
        } else if supported.contains(&Pixel::YUV420P) {
            Pixel::YUV420P
        } else {
            supported[0]
        }
    }

    fn receive_and_process_decoded_frames(
        &mut self,
        octx: &mut format::context::Output,
        ost_time_base: Rational,
    ) -> MediaResult<()> {
        let mut decoded = VideoFrame::empty();
        while self.decoder.receive_frame(&mut decoded).is_ok() {
            let timestamp = decoded.timestamp();
            if let (Some(end), Some(ts)) = (self.end_pts, timestamp) {
                if ts >= end {
                    self.past_end = true;
                    continue;
                }
            }

            let pts = timestamp
                .map(|ts| (ts - self.start_ts).rescale(self.input_time_base, self.encoder_time_base));
            if let (Some(pts), Some(last)) = (pts, self.last_pts) {
                // Two source frames rounded onto the same output tick
                if pts <= last {
                    continue;
                }
            }
            if pts.is_some() {
                self.last_pts = pts;
            }

            decoded.set_pts(pts);
            decoded.set_kind(picture::Type::None);
            match &mut self.scaler {
                Some(scaler) => {
                    let mut scaled = VideoFrame::empty();
                    scaler.run(&decoded, &mut scaled)?;
                    scaled.set_pts(pts);
                    self.encoder.send_frame(&scaled)?;
                }
                None => self.encoder.send_frame(&decoded)?,
            }
            self.frames_encoded += 1;
            self.receive_and_process_encoded_packets(octx, ost_time_base)?;
        }
        Ok(())
    }

    fn receive_and_process_encoded_packets(
        &mut self,
        octx: &mut format::context::Output,
        ost_time_base: Rational,
    ) -> MediaResult<()> {
        let mut encoded = Packet::empty();
        while self.encoder.receive_packet(&mut encoded).is_ok() {
            encoded.set_stream(self.ost_index);
            encoded.rescale_ts(self.encoder_time_base, ost_time_base);
            encoded.write_interleaved(octx)?;
        }
        Ok(())
    }

    fn finish(&mut self, octx: &mut format::context::Output, ost_time_base: Rational) -> MediaResult<()> {
        self.decoder.send_eof()?;
        self.receive_and_process_decoded_frames(octx, ost_time_base)?;
        self.encoder.send_eof()?;
        self.receive_and_process_encoded_packets(octx, ost_time_base)
    }
}
