// Domain rules - Business logic and policies

use std::path::{Path, PathBuf};

use crate::domain::model::*;

/// Name of the report directory under the input folder
pub const REPORT_DIR: &str = "report";

/// File name of the CSV report
pub const REPORT_FILE: &str = "videos_report.csv";

/// Recognized input video extensions
pub struct VideoExtensions;

impl VideoExtensions {
    pub const RECOGNIZED: [&'static str; 10] = [
        "mp4", "avi", "mkv", "3gp", "wmv", "flv", "mov", "m4v", "mpeg", "mpg",
    ];

    /// Check a file name against the recognized extensions (case-insensitive)
    pub fn is_recognized(file_name: &str) -> bool {
        Path::new(file_name)
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .is_some_and(|ext| Self::RECOGNIZED.contains(&ext.as_str()))
    }
}

/// Naming rules for task artifacts
pub struct ArtifactNaming;

impl ArtifactNaming {
    /// `<file>_segment_<ratio>.mp4`; the ratio always keeps a decimal (`1.0`)
    pub fn segment(dir: &Path, file: &VideoFileRef, ratio: f64) -> PathBuf {
        dir.join(format!("{}_segment_{:?}.mp4", file.file_name, ratio))
    }

    /// `converted_<file>.<format>`
    pub fn converted(dir: &Path, file: &VideoFileRef, format: ConvertFormat) -> PathBuf {
        dir.join(format!("converted_{}.{}", file.file_name, format.extension()))
    }

    /// `audio_<file>.mp3`
    pub fn audio(dir: &Path, file: &VideoFileRef) -> PathBuf {
        dir.join(format!("audio_{}.mp3", file.file_name))
    }

    /// `resized_<file>`, keeping the source container
    pub fn resized(dir: &Path, file: &VideoFileRef) -> PathBuf {
        dir.join(format!("resized_{}", file.file_name))
    }

    /// Per-file frame directory `frames_<file>`
    pub fn frames_dir(dir: &Path, file: &VideoFileRef) -> PathBuf {
        dir.join(format!("frames_{}", file.file_name))
    }

    /// `frame_<second>.jpg`
    pub fn frame(frames_dir: &Path, second: u64) -> PathBuf {
        frames_dir.join(format!("frame_{}.jpg", second))
    }

    /// `thumbnail_<file>.jpg`
    pub fn thumbnail(dir: &Path, file: &VideoFileRef) -> PathBuf {
        dir.join(format!("thumbnail_{}.jpg", file.file_name))
    }

    /// Report path under the input folder
    pub fn report(folder: &Path) -> PathBuf {
        folder.join(REPORT_DIR).join(REPORT_FILE)
    }
}

/// Sampling and geometry rules
pub struct SamplingRules;

impl SamplingRules {
    /// Whole-second timestamps `0..floor(duration)`
    pub fn frame_seconds(duration: f64) -> Vec<u64> {
        if !duration.is_finite() || duration < 1.0 {
            return Vec::new();
        }
        (0..duration.floor() as u64).collect()
    }

    /// End of the segment clip in seconds
    pub fn segment_end(duration: f64, ratio: f64) -> f64 {
        duration * ratio
    }

    /// Output size for a target height, preserving aspect ratio with even dimensions
    pub fn scaled_size(width: u32, height: u32, target_height: Option<u32>) -> (u32, u32) {
        match target_height {
            None => (width, height),
            Some(_) if width == 0 || height == 0 => (width, height),
            Some(target) => {
                let scaled = (width as f64 * target as f64 / height as f64).round() as u32;
                let even_width = (scaled + 1) & !1;
                let even_height = (target + 1) & !1;
                (even_width.max(2), even_height.max(2))
            }
        }
    }

    /// Frame rate truncated to an integer
    pub fn truncated_rate(numerator: i32, denominator: i32) -> u32 {
        if numerator <= 0 || denominator <= 0 {
            return 0;
        }
        (numerator / denominator) as u32
    }

    /// Whole-second duration as frame count divided by frame rate
    pub fn duration_from_frames(frame_count: u64, frame_rate: u32) -> Option<u64> {
        if frame_rate == 0 {
            None
        } else {
            Some(frame_count / frame_rate as u64)
        }
    }
}
