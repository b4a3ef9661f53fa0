//! Small helpers shared by the CLI

use std::time::Duration;

pub mod logging;

/// Wall-clock time of a run as `MM:SS.mmm`, or `H:MM:SS.mmm` past an hour
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    let millis = elapsed.subsec_millis();
    match secs / 3600 {
        0 => format!("{:02}:{:02}.{:03}", secs / 60, secs % 60, millis),
        hours => format!("{}:{:02}:{:02}.{:03}", hours, (secs % 3600) / 60, secs % 60, millis),
    }
}
