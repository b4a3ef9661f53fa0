// Adapters - External system implementations

pub mod fs_local;
pub mod media_libav;
pub mod probe_libav;
pub mod report_csv;
pub mod toml_config;

// Re-export adapters
pub use fs_local::LocalFsAdapter;
pub use media_libav::{LibavMediaOpener, LibavMediaSource};
pub use probe_libav::LibavFrameProbe;
pub use report_csv::CsvReportAdapter;
pub use toml_config::TomlConfigAdapter;
