// CSV report adapter - Tabular run report

use std::fs;
use std::path::Path;

use tracing::info;

use crate::domain::errors::*;
use crate::domain::model::*;
use crate::error::{MediaError, MediaResult};
use crate::ports::*;

/// Writes the run report as CSV
pub struct CsvReportAdapter;

impl CsvReportAdapter {
    pub fn new() -> Result<Self, DomainError> {
        Ok(Self)
    }

    /// Header for a report; optional columns follow the run's settings
    pub fn header(report: &RunReport) -> Vec<&'static str> {
        let mut fields = vec!["File Name", "Tasks"];
        if report.metadata_requested {
            fields.push("Metadata");
        }
        if report.failure_policy == FailurePolicy::ContinueAndReport {
            fields.push("Status");
        }
        fields
    }

    fn row(report: &RunReport, file: &FileReport) -> MediaResult<Vec<String>> {
        let mut record = vec![file.file_name.clone(), file.tasks_column()];
        if report.metadata_requested {
            let metadata = match &file.metadata {
                Some(metadata) => serde_json::to_string(&metadata.to_record())?,
                None => String::new(),
            };
            record.push(metadata);
        }
        if report.failure_policy == FailurePolicy::ContinueAndReport {
            record.push(file.status.to_string());
        }
        Ok(record)
    }

    fn write_atomically(&self, report: &RunReport, path: &Path) -> MediaResult<()> {
        let dir = path.parent().ok_or_else(|| {
            MediaError::IoError(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("Report path has no parent: {}", path.display()),
            ))
        })?;
        fs::create_dir_all(dir)?;

        let temp = tempfile::Builder::new()
            .prefix(".videos_report")
            .suffix(".csv")
            .tempfile_in(dir)?;

        {
            let mut writer = csv::Writer::from_writer(temp.as_file());
            writer.write_record(Self::header(report))?;
            for file in &report.rows {
                writer.write_record(Self::row(report, file)?)?;
            }
            writer.flush()?;
        }

        temp.persist(path)?;
        Ok(())
    }
}

impl ReportPort for CsvReportAdapter {
    fn write_report(&self, report: &RunReport, path: &Path) -> Result<(), DomainError> {
        self.write_atomically(report, path).map_err(|e| {
            DomainError::ReportFailed(format!("{}: {}", path.display(), e))
        })?;
        info!("Report written: {} ({} rows)", path.display(), report.rows.len());
        Ok(())
    }
}
