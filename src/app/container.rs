use std::sync::Arc;

use crate::adapters::{CsvReportAdapter, LibavFrameProbe, LibavMediaOpener, LocalFsAdapter};
use crate::app::{batch_interactor::BatchInteractor, runner::BatchRunner};
use crate::domain::config::EncodeSettings;
use crate::domain::errors::DomainError;
use crate::ports::{FrameProbePort, FsPort, MediaOpenerPort, ReportPort};

pub trait AppContainer: Send + Sync {
    fn batch_runner(&self) -> BatchRunner;
    fn probe_port(&self) -> Arc<dyn FrameProbePort>;
}

/// Wires the libav and local filesystem adapters
pub struct DefaultAppContainer {
    batch_runner: BatchRunner,
    probe_port: Arc<dyn FrameProbePort>,
}

impl DefaultAppContainer {
    pub fn new(encoding: EncodeSettings) -> Result<Self, DomainError> {
        let media_port = Arc::new(LibavMediaOpener::new(encoding)?);
        let probe_port: Arc<dyn FrameProbePort> = Arc::new(LibavFrameProbe::new()?);
        let fs_port = Arc::new(LocalFsAdapter::new()?);
        let report_port = Arc::new(CsvReportAdapter::new()?);

        let batch_interactor = Arc::new(BatchInteractor::new(
            media_port as Arc<dyn MediaOpenerPort>,
            Arc::clone(&probe_port),
            fs_port as Arc<dyn FsPort>,
            report_port as Arc<dyn ReportPort>,
        ));
        let batch_runner = BatchRunner::new(batch_interactor);

        Ok(Self {
            batch_runner,
            probe_port,
        })
    }
}

impl AppContainer for DefaultAppContainer {
    fn batch_runner(&self) -> BatchRunner {
        self.batch_runner.clone()
    }

    fn probe_port(&self) -> Arc<dyn FrameProbePort> {
        Arc::clone(&self.probe_port)
    }
}
