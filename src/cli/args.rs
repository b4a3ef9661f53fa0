//! Command-line argument definitions

use std::path::PathBuf;

use clap::Args;
use clap_num::number_range;

use crate::domain::model::TaskKind;

fn parse_task(value: &str) -> Result<TaskKind, String> {
    TaskKind::parse(value).map_err(|e| e.to_string())
}

fn parse_percent(value: &str) -> Result<u8, String> {
    number_range(value, 1, 100)
}

/// Arguments for the run command
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Folder containing the videos
    pub folder: PathBuf,

    /// Task to apply, in order (segment, convert, audio, resize, frames, thumbnail)
    #[arg(short, long = "task", value_name = "TASK", value_parser = parse_task)]
    pub tasks: Vec<TaskKind>,

    /// Add a metadata column to the report
    #[arg(short, long)]
    pub metadata: bool,

    /// Share of the duration kept by the segment task (1-100)
    #[arg(long, value_parser = parse_percent)]
    pub segment_percent: Option<u8>,

    /// Container for the convert task (avi, mp4, mov)
    #[arg(long)]
    pub convert_format: Option<String>,

    /// Target for the resize task (Original, 144p, 240p, 360p, 480p, 720p, 1080p)
    #[arg(long)]
    pub resize: Option<String>,

    /// Failure handling (abort, continue)
    #[arg(long)]
    pub on_failure: Option<String>,

    /// Print the run report as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the probe command
#[derive(Args, Debug)]
pub struct ProbeArgs {
    /// Input video file path
    pub input: PathBuf,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}
