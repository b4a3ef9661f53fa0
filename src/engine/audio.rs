//! Audio re-encoding
//!
//! [`extract_audio`] writes the best audio stream alone with the output
//! container's default audio codec (MP3 for `.mp3`). [`AudioTranscoder`] is
//! also used by the video transcode for audio the target muxer cannot take
//! as-is. A small filter graph converts sample format, layout and frame size
//! for the encoder.

use std::path::Path;

use ffmpeg_next::channel_layout::ChannelLayout;
use ffmpeg_next::codec::{self, decoder, encoder};
use ffmpeg_next::util::frame::audio::Audio as AudioFrame;
use ffmpeg_next::{filter, format, media, Frame, Packet, Rational, Rescale};
use tracing::{debug, info};

use crate::engine::{open_input, open_output};
use crate::error::{MediaError, MediaResult};

const DEFAULT_BIT_RATE: usize = 192_000;

/// Write the best audio stream of `input_path` to `output_path`.
///
/// Returns the number of audio frames encoded.
pub fn extract_audio(input_path: &Path, output_path: &Path) -> MediaResult<u64> {
    let mut ictx = open_input(input_path)?;
    let mut octx = open_output(output_path)?;

    let (stream_index, mut transcoder) = {
        let input = ictx
            .streams()
            .best(media::Type::Audio)
            .ok_or_else(|| MediaError::StreamNotFound {
                kind: "audio",
                path: input_path.display().to_string(),
            })?;
        let codec_id = octx.format().codec(&output_path, media::Type::Audio);
        (input.index(), AudioTranscoder::new(&input, &mut octx, codec_id, 0)?)
    };

    octx.set_metadata(ictx.metadata().to_owned());
    octx.write_header()?;
    transcoder.sync_output_time_base(&octx);

    for (stream, packet) in ictx.packets() {
        if stream.index() == stream_index {
            transcoder.send_packet(&packet, &mut octx)?;
        }
    }

    transcoder.finish(&mut octx)?;
    octx.write_trailer()?;

    info!(
        "Extracted audio to {} ({} frames)",
        output_path.display(),
        transcoder.frames_encoded
    );
    Ok(transcoder.frames_encoded)
}

/// Decode one input audio stream and encode it into output stream `ost_index`.
///
/// Packets are fed in the input stream's time base.
pub(crate) struct AudioTranscoder {
    ost_index: usize,
    filter: filter::Graph,
    decoder: decoder::Audio,
    encoder: encoder::Audio,
    in_time_base: Rational,
    /// 1/sample rate; filter and encoder both run on it
    sample_time_base: Rational,
    out_time_base: Rational,
    frames_encoded: u64,
}

impl AudioTranscoder {
    /// Add an output stream encoded with `codec_id` for `input`
    pub(crate) fn new(
        input: &format::stream::Stream,
        octx: &mut format::context::Output,
        codec_id: codec::Id,
        ost_index: usize,
    ) -> MediaResult<Self> {
        let context = codec::context::Context::from_parameters(input.parameters())?;
        let mut decoder = context.decoder().audio()?;
        decoder.set_parameters(input.parameters())?;
        if decoder.rate() == 0 {
            return Err(MediaError::TranscodeError {
                message: format!("Audio stream {} has no sample rate", input.index()),
            });
        }

        let codec = encoder::find(codec_id)
            .ok_or_else(|| MediaError::EncoderNotFound {
                name: format!("{:?}", codec_id),
            })?
            .audio()?;
        let global_header = octx.format().flags().contains(format::Flags::GLOBAL_HEADER);

        let mut output = octx.add_stream(codec)?;
        let context = codec::context::Context::from_parameters(output.parameters())?;
        let mut encoder = context.encoder().audio()?;

        let sample_format = codec
            .formats()
            .and_then(|mut formats| formats.next())
            .ok_or_else(|| MediaError::TranscodeError {
                message: format!("Encoder {:?} reports no sample formats", codec_id),
            })?;
        let bit_rate = match decoder.bit_rate() {
            0 => DEFAULT_BIT_RATE,
            rate => rate.clamp(64_000, 320_000),
        };
        let sample_time_base = Rational(1, decoder.rate() as i32);

        if global_header {
            encoder.set_flags(codec::Flags::GLOBAL_HEADER);
        }
        encoder.set_rate(decoder.rate() as i32);
        encoder.set_channel_layout(ChannelLayout::STEREO);
        encoder.set_format(sample_format);
        encoder.set_bit_rate(bit_rate);
        encoder.set_max_bit_rate(bit_rate);
        encoder.set_time_base(sample_time_base);
        output.set_time_base(sample_time_base);

        let encoder = encoder.open_as(codec)?;
        output.set_parameters(&encoder);

        let filter = Self::build_filter(&decoder, &encoder, sample_time_base)?;
        debug!(
            "Audio {:?} {}Hz {:?} -> {:?} at {} bps",
            decoder.id(),
            decoder.rate(),
            decoder.format(),
            codec_id,
            bit_rate
        );

        Ok(Self {
            ost_index,
            in_time_base: input.time_base(),
            sample_time_base,
            out_time_base: sample_time_base,
            filter,
            decoder,
            encoder,
            frames_encoded: 0,
        })
    }

    /// The muxer may change the stream time base in `write_header`
    pub(crate) fn sync_output_time_base(&mut self, octx: &format::context::Output) {
        if let Some(stream) = octx.stream(self.ost_index) {
            self.out_time_base = stream.time_base();
        }
    }

    pub(crate) fn send_packet(&mut self, packet: &Packet, octx: &mut format::context::Output) -> MediaResult<()> {
        self.decoder.send_packet(packet)?;
        self.receive_and_process_decoded_frames(octx)
    }

    pub(crate) fn finish(&mut self, octx: &mut format::context::Output) -> MediaResult<()> {
        self.decoder.send_eof()?;
        self.receive_and_process_decoded_frames(octx)?;
        self.flush_filter()?;
        self.receive_and_process_filtered_frames(octx)?;
        self.encoder.send_eof()?;
        self.receive_and_process_encoded_packets(octx)
    }

    fn build_filter(
        decoder: &decoder::Audio,
        encoder: &encoder::Audio,
        time_base: Rational,
    ) -> MediaResult<filter::Graph> {
        let mut filter = filter::Graph::new();

        let source_layout = if decoder.channel_layout().bits() == 0 {
            ChannelLayout::default(i32::from(decoder.channels()))
        } else {
            decoder.channel_layout()
        };
        let args = format!(
            "time_base={}:sample_rate={}:sample_fmt={}:channel_layout=0x{:x}",
            time_base,
            decoder.rate(),
            decoder.format().name(),
            source_layout.bits()
        );

        let missing = |name: &str| MediaError::TranscodeError {
            message: format!("Audio filter graph has no '{}' pad", name),
        };

        let abuffer = filter::find("abuffer").ok_or_else(|| missing("abuffer"))?;
        let abuffersink = filter::find("abuffersink").ok_or_else(|| missing("abuffersink"))?;
        filter.add(&abuffer, "in", &args)?;
        filter.add(&abuffersink, "out", "")?;

        {
            let mut out = filter.get("out").ok_or_else(|| missing("out"))?;
            out.set_sample_format(encoder.format());
            out.set_channel_layout(encoder.channel_layout());
            out.set_sample_rate(encoder.rate());
        }

        filter.output("in", 0)?.input("out", 0)?.parse("anull")?;
        filter.validate()?;

        if let Some(codec) = encoder.codec() {
            if !codec
                .capabilities()
                .contains(codec::capabilities::Capabilities::VARIABLE_FRAME_SIZE)
            {
                filter
                    .get("out")
                    .ok_or_else(|| missing("out"))?
                    .sink()
                    .set_frame_size(encoder.frame_size());
            }
        }

        Ok(filter)
    }

    fn send_frame_to_filter(&mut self, frame: &Frame) -> MediaResult<()> {
        self.filter
            .get("in")
            .ok_or_else(|| MediaError::TranscodeError {
                message: "Audio filter graph has no 'in' pad".to_string(),
            })?
            .source()
            .add(frame)?;
        Ok(())
    }

    fn flush_filter(&mut self) -> MediaResult<()> {
        self.filter
            .get("in")
            .ok_or_else(|| MediaError::TranscodeError {
                message: "Audio filter graph has no 'in' pad".to_string(),
            })?
            .source()
            .flush()?;
        Ok(())
    }

    fn receive_and_process_decoded_frames(&mut self, octx: &mut format::context::Output) -> MediaResult<()> {
        let mut decoded = AudioFrame::empty();
        while self.decoder.receive_frame(&mut decoded).is_ok() {
            let pts = decoded
                .timestamp()
                .map(|ts| ts.rescale(self.in_time_base, self.sample_time_base));
            decoded.set_pts(pts);
            self.send_frame_to_filter(&decoded)?;
            self.receive_and_process_filtered_frames(octx)?;
        }
        Ok(())
    }

    fn receive_and_process_filtered_frames(&mut self, octx: &mut format::context::Output) -> MediaResult<()> {
        let mut filtered = AudioFrame::empty();
        loop {
            let received = match self.filter.get("out") {
                Some(mut out) => out.sink().frame(&mut filtered).is_ok(),
                None => false,
            };
            if !received {
                return Ok(());
            }
            self.encoder.send_frame(&filtered)?;
            self.frames_encoded += 1;
            self.receive_and_process_encoded_packets(octx)?;
        }
    }

    fn receive_and_process_encoded_packets(&mut self, octx: &mut format::context::Output) -> MediaResult<()> {
        let mut encoded = Packet::empty();
        while self.encoder.receive_packet(&mut encoded).is_ok() {
            encoded.set_stream(self.ost_index);
            encoded.rescale_ts(self.sample_time_base, self.out_time_base);
            encoded.write_interleaved(octx)?;
        }
        Ok(())
    }
}
