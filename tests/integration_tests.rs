use std::fs;
use std::path::Path;
use std::sync::{Arc, Barrier};

use image::RgbImage;
use tempfile::TempDir;
use vidbatch_cli::adapters::{CsvReportAdapter, LocalFsAdapter};
use vidbatch_cli::domain::model::*;
use vidbatch_cli::ports::*;
use vidbatch_cli::*;

/// In-memory stand-ins for the libav adapters
mod test_utils {
    use super::*;

    /// Durations are read from the file content (seconds as text)
    pub struct FakeOpener {
        pub gate: Option<Arc<Barrier>>,
    }

    pub struct FakeSource {
        duration: f64,
    }

    impl MediaOpenerPort for FakeOpener {
        fn open(&self, path: &Path) -> Result<Box<dyn MediaSource>, DomainError> {
            if let Some(gate) = &self.gate {
                gate.wait();
            }
            let content = fs::read_to_string(path)
                .map_err(|e| DomainError::OpenFailed(format!("{}: {}", path.display(), e)))?;
            let duration = content.trim().parse().map_err(|_| {
                DomainError::OpenFailed(format!("{}: invalid data", path.display()))
            })?;
            Ok(Box::new(FakeSource { duration }))
        }
    }

    impl MediaSource for FakeSource {
        fn duration(&self) -> f64 {
            self.duration
        }

        fn transcode(&mut self, job: &TranscodeJob, output: &Path) -> Result<(), DomainError> {
            fs::write(output, format!("{:?}", job)).map_err(|e| DomainError::TaskFailed(e.to_string()))
        }

        fn extract_audio(&mut self, output: &Path) -> Result<(), DomainError> {
            fs::write(output, b"ID3").map_err(|e| DomainError::TaskFailed(e.to_string()))
        }

        fn frame_at(&mut self, _seconds: f64) -> Result<RgbImage, DomainError> {
            Ok(RgbImage::new(8, 8))
        }
    }

    /// Files whose name contains "noframe" yield no thumbnail frame
    pub struct FakeProbe;

    impl FrameProbePort for FakeProbe {
        fn first_frame(&self, path: &Path) -> Result<Option<RgbImage>, DomainError> {
            if path.to_string_lossy().contains("noframe") {
                Ok(None)
            } else {
                Ok(Some(RgbImage::new(8, 8)))
            }
        }

        fn read_metadata(&self, path: &Path) -> Result<Metadata, DomainError> {
            let content = fs::read_to_string(path).map_err(|e| DomainError::MetadataFailed(e.to_string()))?;
            let duration: f64 = content
                .trim()
                .parse()
                .map_err(|_| DomainError::MetadataFailed("invalid data".to_string()))?;
            Ok(Metadata {
                width: 320,
                height: 240,
                frame_rate: 30,
                duration_seconds: duration as u64,
                codec_tag: 0,
            })
        }
    }

    pub fn interactor_with_gate(gate: Option<Arc<Barrier>>) -> BatchInteractor {
        BatchInteractor::new(
            Arc::new(FakeOpener { gate }),
            Arc::new(FakeProbe),
            Arc::new(LocalFsAdapter::new().unwrap()),
            Arc::new(CsvReportAdapter::new().unwrap()),
        )
    }

    pub fn interactor() -> BatchInteractor {
        interactor_with_gate(None)
    }

    pub fn add_video(dir: &Path, name: &str, duration: f64) {
        fs::write(dir.join(name), duration.to_string()).unwrap();
    }

    pub fn read_report(folder: &Path) -> String {
        fs::read_to_string(folder.join("report").join("videos_report.csv")).unwrap()
    }
}

use test_utils::*;

#[test]
fn test_empty_folder_creates_directories_and_header_only_report() {
    let temp_dir = TempDir::new().unwrap();
    let config = RunConfig::new(temp_dir.path(), TaskKind::ALL, false);

    let report = interactor().run(&config, &NoProgress).unwrap();

    assert_eq!(report.total_files(), 0);
    for kind in TaskKind::ALL {
        assert!(temp_dir.path().join(kind.dir_name()).is_dir(), "{} missing", kind);
    }
    assert_eq!(read_report(temp_dir.path()), "File Name,Tasks\n");
}

#[test]
fn test_rerun_over_existing_outputs_succeeds() {
    let temp_dir = TempDir::new().unwrap();
    add_video(temp_dir.path(), "a.mp4", 2.0);
    let config = RunConfig::new(
        temp_dir.path(),
        [TaskKind::Segment, TaskKind::ExtractFrames],
        false,
    );

    let first = interactor().run(&config, &NoProgress).unwrap();
    let second = interactor().run(&config, &NoProgress).unwrap();

    assert_eq!(first.rows[0].tasks, second.rows[0].tasks);
    assert!(temp_dir
        .path()
        .join("segmented")
        .join("a.mp4_segment_0.5.mp4")
        .is_file());
    // Only recognized extensions are picked up; the outputs are in subdirectories
    assert_eq!(second.total_files(), 1);
}

#[test]
fn test_invalid_resize_fails_without_report() {
    let temp_dir = TempDir::new().unwrap();
    add_video(temp_dir.path(), "a.mp4", 2.0);
    let settings = TaskSettings::new(0.5, ConvertFormat::Avi, "999p").unwrap();
    let config = RunConfig::new(temp_dir.path(), [TaskKind::Resize], false).with_settings(settings);

    let err = interactor().run(&config, &NoProgress).unwrap_err();

    assert!(err.message.contains("999p"));
    assert!(!temp_dir.path().join("report").exists());
    assert!(!temp_dir.path().join("resized").exists());
}

#[test]
fn test_audio_thumbnail_metadata_end_to_end() {
    let temp_dir = TempDir::new().unwrap();
    let folder = temp_dir.path();
    add_video(folder, "a.mp4", 4.0);
    add_video(folder, "b.mov", 6.0);
    fs::write(folder.join("notes.txt"), "ignored").unwrap();

    let config = RunConfig::new(
        folder,
        [TaskKind::ExtractAudio, TaskKind::GenerateThumbnail],
        true,
    );
    let report = interactor().run(&config, &NoProgress).unwrap();

    assert_eq!(report.total_files(), 2);
    for name in ["a.mp4", "b.mov"] {
        assert!(folder.join("audio").join(format!("audio_{}.mp3", name)).is_file());
        assert!(folder
            .join("thumbnail")
            .join(format!("thumbnail_{}.jpg", name))
            .is_file());
    }

    let mut reader = csv::Reader::from_path(folder.join("report").join("videos_report.csv")).unwrap();
    let headers: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
    assert_eq!(headers, vec!["File Name", "Tasks", "Metadata"]);

    let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
    assert_eq!(rows.len(), 2);
    assert_eq!(&rows[0][0], "a.mp4");
    assert_eq!(&rows[1][0], "b.mov");
    for row in &rows {
        assert_eq!(&row[1], "Extracted Audio; Thumbnail Generated");
        let metadata: serde_json::Value = serde_json::from_str(&row[2]).unwrap();
        assert_eq!(metadata["Resolution"], "320x240");
        assert_eq!(metadata["Frame Rate"], "30 fps");
    }
    assert_eq!(
        serde_json::from_str::<serde_json::Value>(&rows[1][2]).unwrap()["Duration"],
        "6 seconds"
    );
}

#[test]
fn test_unreadable_thumbnail_is_skipped() {
    let temp_dir = TempDir::new().unwrap();
    add_video(temp_dir.path(), "a_noframe.mp4", 3.0);
    add_video(temp_dir.path(), "b.mp4", 3.0);
    let config = RunConfig::new(
        temp_dir.path(),
        [TaskKind::GenerateThumbnail, TaskKind::Convert],
        false,
    );

    let report = interactor().run(&config, &NoProgress).unwrap();

    assert_eq!(report.rows[0].tasks, vec!["Converted"]);
    assert_eq!(report.rows[1].tasks, vec!["Thumbnail Generated", "Converted"]);
    assert!(!temp_dir
        .path()
        .join("thumbnail")
        .join("thumbnail_a_noframe.mp4.jpg")
        .exists());
    assert!(temp_dir
        .path()
        .join("converted")
        .join("converted_a_noframe.mp4.avi")
        .is_file());
}

#[test]
fn test_frames_for_fractional_duration() {
    let temp_dir = TempDir::new().unwrap();
    add_video(temp_dir.path(), "clip.mp4", 3.7);
    let config = RunConfig::new(temp_dir.path(), [TaskKind::ExtractFrames], false);

    interactor().run(&config, &NoProgress).unwrap();

    let frames_dir = temp_dir.path().join("frames").join("frames_clip.mp4");
    let mut names: Vec<String> = fs::read_dir(&frames_dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    assert_eq!(names, vec!["frame_0.jpg", "frame_1.jpg", "frame_2.jpg"]);
}

#[test]
fn test_open_failure_policies() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("a.mkv"), "garbage").unwrap();
    add_video(temp_dir.path(), "b.mp4", 2.0);

    let config = RunConfig::new(temp_dir.path(), [TaskKind::ExtractAudio], false);
    let err = interactor().run(&config, &NoProgress).unwrap_err();
    assert!(err.message.contains("invalid data"));
    assert!(!temp_dir.path().join("report").join("videos_report.csv").exists());

    let config = config.with_failure_policy(FailurePolicy::ContinueAndReport);
    let report = interactor().run(&config, &NoProgress).unwrap();
    assert_eq!(report.failed_files(), 1);

    let content = read_report(temp_dir.path());
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines[0], "File Name,Tasks,Status");
    assert!(lines[1].starts_with("a.mkv,,skipped: "));
    assert_eq!(lines[2], "b.mp4,Extracted Audio,succeeded");
}

#[tokio::test]
async fn test_runner_streams_progress_then_completes() {
    let temp_dir = TempDir::new().unwrap();
    add_video(temp_dir.path(), "a.mp4", 2.0);
    add_video(temp_dir.path(), "b.mp4", 2.0);
    let runner = BatchRunner::new(Arc::new(interactor()));
    let config = RunConfig::new(temp_dir.path(), [TaskKind::ExtractAudio], false);

    let mut handle = runner.start(config).unwrap();
    let mut progress = Vec::new();
    let report = loop {
        match handle.next_event().await.unwrap() {
            RunEvent::Progress(text) => progress.push(text),
            RunEvent::Completed(report) => break report,
            RunEvent::Failed(message) => panic!("run failed: {}", message),
        }
    };

    assert_eq!(
        progress,
        vec!["audio", "Processing: File 1/2", "audio", "Processing: File 2/2"]
    );
    assert_eq!(report.total_files(), 2);
    assert!(!runner.is_running());
}

#[tokio::test]
async fn test_runner_reports_failure_and_reenables() {
    let temp_dir = TempDir::new().unwrap();
    let runner = BatchRunner::new(Arc::new(interactor()));
    let missing = temp_dir.path().join("missing");

    let err = runner
        .start(RunConfig::new(&missing, [TaskKind::Convert], false))
        .unwrap()
        .wait()
        .await
        .unwrap_err();
    assert!(err.message.contains("missing"));

    // A new run is accepted once the failed one has ended
    let report = runner
        .start(RunConfig::new(temp_dir.path(), [TaskKind::Convert], false))
        .unwrap()
        .wait()
        .await
        .unwrap();
    assert_eq!(report.total_files(), 0);
}

#[tokio::test]
async fn test_runner_refuses_concurrent_runs() {
    let temp_dir = TempDir::new().unwrap();
    add_video(temp_dir.path(), "a.mp4", 1.0);
    let gate = Arc::new(Barrier::new(2));
    let runner = BatchRunner::new(Arc::new(interactor_with_gate(Some(Arc::clone(&gate)))));
    let config = RunConfig::new(temp_dir.path(), [TaskKind::ExtractAudio], false);

    let handle = runner.start(config.clone()).unwrap();
    assert!(runner.is_running());
    assert!(matches!(runner.start(config), Err(DomainError::Busy)));

    // Let the worker open its file and finish
    gate.wait();
    let report = handle.wait().await.unwrap();
    assert_eq!(report.total_files(), 1);
    assert!(!runner.is_running());
}
