//! libav adapters end to end, on clips generated with the `ffmpeg` tool.
//!
//! Each test returns early when the tool or a needed encoder is missing.

use std::path::Path;
use std::process::Command;
use std::sync::Arc;

use tempfile::TempDir;
use vidbatch_cli::adapters::{CsvReportAdapter, LibavFrameProbe, LibavMediaOpener, LocalFsAdapter};
use vidbatch_cli::domain::config::EncodeSettings;
use vidbatch_cli::domain::model::*;
use vidbatch_cli::ports::*;
use vidbatch_cli::*;

/// Test utilities for video processing
mod test_utils {
    use super::*;

    /// Whether `ffmpeg` is installed with the encoders the tests rely on
    pub fn ffmpeg_available() -> bool {
        let Ok(output) = Command::new("ffmpeg").args(["-hide_banner", "-encoders"]).output() else {
            eprintln!("ffmpeg not found, skipping");
            return false;
        };
        let encoders = String::from_utf8_lossy(&output.stdout);
        let ready = output.status.success()
            && encoders.contains("libx264")
            && encoders.contains("libmp3lame");
        if !ready {
            eprintln!("ffmpeg lacks libx264 or libmp3lame, skipping");
        }
        ready
    }

    /// Whether `ffmpeg` also has every encoder in `names`
    pub fn encoders_available(names: &[&str]) -> bool {
        let Ok(output) = Command::new("ffmpeg").args(["-hide_banner", "-encoders"]).output() else {
            return false;
        };
        let encoders = String::from_utf8_lossy(&output.stdout);
        let missing: Vec<_> = names.iter().filter(|name| !encoders.contains(*name)).collect();
        if !missing.is_empty() {
            eprintln!("ffmpeg lacks {:?}, skipping", missing);
        }
        missing.is_empty()
    }

    /// Create a 320x240 30 fps clip with a sine audio track and the given codecs
    pub fn create_clip(output_path: &Path, duration: f64, video: &[&str], audio: &[&str]) {
        let duration = duration.to_string();
        let status = Command::new("ffmpeg")
            .args([
                "-hide_banner",
                "-loglevel",
                "error",
                "-f",
                "lavfi",
                "-i",
                "testsrc=size=320x240:rate=30",
                "-f",
                "lavfi",
                "-i",
                "sine=frequency=1000",
                "-t",
                &duration,
            ])
            .args(video)
            .args(audio)
            .arg("-y")
            .arg(output_path)
            .status()
            .unwrap();
        assert!(status.success(), "ffmpeg failed to create {}", output_path.display());
    }

    /// H.264 + AAC test clip
    pub fn create_test_video(output_path: &Path, duration: f64) {
        create_clip(
            output_path,
            duration,
            &["-c:v", "libx264", "-pix_fmt", "yuv420p"],
            &["-c:a", "aac"],
        );
    }

    /// Codecs of the audio streams in `path`
    pub fn audio_codecs(path: &Path) -> Vec<ffmpeg_next::codec::Id> {
        vidbatch_cli::engine::init().unwrap();
        let ictx = ffmpeg_next::format::input(&path).unwrap();
        ictx.streams()
            .filter(|stream| stream.parameters().medium() == ffmpeg_next::media::Type::Audio)
            .map(|stream| stream.parameters().id())
            .collect()
    }

    /// Start time of the video stream in seconds
    pub fn video_start_seconds(path: &Path) -> f64 {
        vidbatch_cli::engine::init().unwrap();
        let ictx = ffmpeg_next::format::input(&path).unwrap();
        let stream = ictx.streams().best(ffmpeg_next::media::Type::Video).unwrap();
        stream.start_time() as f64 * f64::from(stream.time_base())
    }

    pub fn fast_encoding() -> EncodeSettings {
        EncodeSettings {
            preset: "ultrafast".to_string(),
            threads: 2,
            ..EncodeSettings::default()
        }
    }
}

use test_utils::*;

#[test]
fn test_open_reports_duration_and_samples_frames() {
    if !ffmpeg_available() {
        return;
    }
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("clip.mp4");
    create_test_video(&input, 3.7);

    let opener = LibavMediaOpener::new(fast_encoding()).unwrap();
    let mut source = opener.open(&input).unwrap();

    assert!((source.duration() - 3.7).abs() < 0.15, "duration {}", source.duration());
    for second in [2.0, 0.0, 1.0] {
        let frame = source.frame_at(second).unwrap();
        assert_eq!(frame.dimensions(), (320, 240));
    }
}

#[test]
fn test_segment_and_resize_outputs() {
    if !ffmpeg_available() {
        return;
    }
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("clip.mp4");
    create_test_video(&input, 4.0);

    let opener = LibavMediaOpener::new(fast_encoding()).unwrap();
    let probe = LibavFrameProbe::new().unwrap();
    let mut source = opener.open(&input).unwrap();

    let segment = temp_dir.path().join("segment.mp4");
    source.transcode(&TranscodeJob::clip(2.0), &segment).unwrap();
    let segment_metadata = probe.read_metadata(&segment).unwrap();
    assert_eq!(segment_metadata.resolution(), "320x240");
    assert!(segment_metadata.duration_seconds <= 2);

    let resized = temp_dir.path().join("resized.mp4");
    source.transcode(&TranscodeJob::resize(Some(144)), &resized).unwrap();
    let resized_metadata = probe.read_metadata(&resized).unwrap();
    assert_eq!((resized_metadata.width, resized_metadata.height), (192, 144));
    assert_eq!(resized_metadata.duration_seconds, 4);
}

#[test]
fn test_convert_to_avi_and_extract_audio() {
    if !ffmpeg_available() {
        return;
    }
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("clip.mov");
    create_test_video(&input, 2.0);

    let opener = LibavMediaOpener::new(fast_encoding()).unwrap();
    let mut source = opener.open(&input).unwrap();

    let converted = temp_dir.path().join("converted.avi");
    source.transcode(&TranscodeJob::whole(), &converted).unwrap();
    let reopened = opener.open(&converted).unwrap();
    assert!((reopened.duration() - 2.0).abs() < 0.2);

    let audio = temp_dir.path().join("audio.mp3");
    source.extract_audio(&audio).unwrap();
    assert!(std::fs::metadata(&audio).unwrap().len() > 1_000);
}

#[test]
fn test_probe_metadata_and_thumbnail() {
    if !ffmpeg_available() {
        return;
    }
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("clip.mp4");
    create_test_video(&input, 3.0);

    let probe = LibavFrameProbe::new().unwrap();
    let metadata = probe.read_metadata(&input).unwrap();
    assert_eq!(metadata.resolution(), "320x240");
    assert_eq!(metadata.frame_rate, 30);
    assert_eq!(metadata.duration_seconds, 3);
    // 'avc1'
    assert_eq!(metadata.codec_tag, 0x3163_7661);

    let thumbnail = probe.first_frame(&input).unwrap().unwrap();
    assert_eq!(thumbnail.dimensions(), (320, 240));
}

#[test]
fn test_full_pipeline_on_real_files() {
    if !ffmpeg_available() {
        return;
    }
    let temp_dir = TempDir::new().unwrap();
    let folder = temp_dir.path();
    create_test_video(&folder.join("a.mp4"), 2.5);
    create_test_video(&folder.join("b.mov"), 1.5);

    let interactor = BatchInteractor::new(
        Arc::new(LibavMediaOpener::new(fast_encoding()).unwrap()),
        Arc::new(LibavFrameProbe::new().unwrap()),
        Arc::new(LocalFsAdapter::new().unwrap()),
        Arc::new(CsvReportAdapter::new().unwrap()),
    );
    let settings = TaskSettings::new(0.5, ConvertFormat::Mp4, "240p").unwrap();
    let config = RunConfig::new(folder, TaskKind::ALL, true).with_settings(settings);

    let report = interactor.run(&config, &NoProgress).unwrap();

    assert_eq!(report.total_files(), 2);
    for row in &report.rows {
        assert_eq!(
            row.tasks,
            TaskKind::ALL.iter().map(|k| k.label()).collect::<Vec<_>>()
        );
        assert!(row.metadata.is_some());
    }
    for path in [
        "segmented/a.mp4_segment_0.5.mp4",
        "converted/converted_b.mov.mp4",
        "audio/audio_a.mp4.mp3",
        "resized/resized_b.mov",
        "frames/frames_a.mp4/frame_1.jpg",
        "thumbnail/thumbnail_b.mov.jpg",
        "report/videos_report.csv",
    ] {
        assert!(folder.join(path).is_file(), "{} missing", path);
    }
    assert!(!folder.join("frames/frames_b.mov/frame_1.jpg").exists());
}

#[test]
fn test_pcm_audio_mov_converts_to_mp4() {
    if !ffmpeg_available() {
        return;
    }
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("camera.mov");
    create_clip(
        &input,
        2.0,
        &["-c:v", "libx264", "-pix_fmt", "yuv420p"],
        &["-c:a", "pcm_s16le"],
    );

    let opener = LibavMediaOpener::new(fast_encoding()).unwrap();
    let mut source = opener.open(&input).unwrap();

    let converted = temp_dir.path().join("converted.mp4");
    source.transcode(&TranscodeJob::whole(), &converted).unwrap();
    assert_eq!(audio_codecs(&converted).len(), 1);
    let reopened = opener.open(&converted).unwrap();
    assert!((reopened.duration() - 2.0).abs() < 0.2, "duration {}", reopened.duration());

    let segment = temp_dir.path().join("segment.mp4");
    source.transcode(&TranscodeJob::clip(1.0), &segment).unwrap();
    assert_eq!(audio_codecs(&segment).len(), 1);
}

#[test]
fn test_wma_audio_is_reencoded_for_mp4() {
    if !ffmpeg_available() || !encoders_available(&["wmv2", "wmav2"]) {
        return;
    }
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("old.wmv");
    create_clip(&input, 2.0, &["-c:v", "wmv2"], &["-c:a", "wmav2"]);

    let opener = LibavMediaOpener::new(fast_encoding()).unwrap();
    let mut source = opener.open(&input).unwrap();

    let converted = temp_dir.path().join("converted.mp4");
    source.transcode(&TranscodeJob::whole(), &converted).unwrap();
    assert_eq!(audio_codecs(&converted), vec![ffmpeg_next::codec::Id::AAC]);

    // The source container keeps its own audio untouched
    let resized = temp_dir.path().join("resized.wmv");
    source.transcode(&TranscodeJob::resize(Some(144)), &resized).unwrap();
    assert_eq!(audio_codecs(&resized), vec![ffmpeg_next::codec::Id::WMAV2]);
}

#[test]
fn test_mpeg_program_stream_segment_counts_from_stream_start() {
    if !ffmpeg_available() || !encoders_available(&["mpeg1video", "mp2"]) {
        return;
    }
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("broadcast.mpg");
    create_clip(&input, 4.0, &["-c:v", "mpeg1video"], &["-c:a", "mp2"]);
    assert!(video_start_seconds(&input) > 0.0);

    let opener = LibavMediaOpener::new(fast_encoding()).unwrap();
    let mut source = opener.open(&input).unwrap();
    let end = source.duration() * 0.5;

    let segment = temp_dir.path().join("segment.mp4");
    source.transcode(&TranscodeJob::clip(end), &segment).unwrap();

    let reopened = opener.open(&segment).unwrap();
    assert!(
        (reopened.duration() - end).abs() < 0.2,
        "segment {}s, expected {}s",
        reopened.duration(),
        end
    );
    assert!(video_start_seconds(&segment).abs() < 0.2);
}
