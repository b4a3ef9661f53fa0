//! Background execution of batch runs
//!
//! A run executes on one blocking worker thread. The caller receives
//! [`RunEvent`]s over an unbounded channel so the worker never waits on it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{debug, error};

use crate::app::batch_interactor::BatchInteractor;
use crate::domain::errors::*;
use crate::domain::model::*;
use crate::ports::ProgressSink;

/// Notification from a running batch
#[derive(Debug, Clone, PartialEq)]
pub enum RunEvent {
    Progress(String),
    Completed(RunReport),
    Failed(String),
}

/// Starts batch runs, one at a time
#[derive(Clone)]
pub struct BatchRunner {
    interactor: Arc<BatchInteractor>,
    busy: Arc<AtomicBool>,
}

impl BatchRunner {
    pub fn new(interactor: Arc<BatchInteractor>) -> Self {
        Self {
            interactor,
            busy: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Whether a run is in progress
    pub fn is_running(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// Start a run on a blocking worker.
    ///
    /// Must be called from within a tokio runtime. Fails with
    /// [`DomainError::Busy`] while another run is in progress.
    pub fn start(&self, config: RunConfig) -> Result<RunHandle, DomainError> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(DomainError::Busy);
        }

        let guard = BusyGuard(Arc::clone(&self.busy));
        let interactor = Arc::clone(&self.interactor);
        let (sender, events) = unbounded_channel();

        let worker = tokio::task::spawn_blocking(move || {
            let sink = ChannelProgress {
                sender: sender.clone(),
            };
            let result = interactor.run(&config, &sink);

            // A new run may start as soon as the final event is observed
            drop(guard);
            let event = match result {
                Ok(report) => RunEvent::Completed(report),
                Err(e) => {
                    error!("Batch run failed: {}", e);
                    RunEvent::Failed(e.message)
                }
            };
            if sender.send(event).is_err() {
                debug!("Run handle dropped before completion");
            }
        });

        Ok(RunHandle { events, worker })
    }
}

/// Clears the busy flag when the worker exits, including on panic
struct BusyGuard(Arc<AtomicBool>);

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

struct ChannelProgress {
    sender: UnboundedSender<RunEvent>,
}

impl ProgressSink for ChannelProgress {
    fn notify(&self, event: ProgressEvent) {
        // The receiver may be gone; the run still completes
        let _ = self.sender.send(RunEvent::Progress(event.to_string()));
    }
}

/// Caller side of a started run
pub struct RunHandle {
    events: UnboundedReceiver<RunEvent>,
    worker: JoinHandle<()>,
}

impl RunHandle {
    /// Next event in order; `None` once the run has ended and all events were read
    pub async fn next_event(&mut self) -> Option<RunEvent> {
        self.events.recv().await
    }

    /// Drain events until the run ends
    pub async fn wait(mut self) -> Result<RunReport, ProcessingError> {
        while let Some(event) = self.events.recv().await {
            match event {
                RunEvent::Progress(_) => {}
                RunEvent::Completed(report) => return Ok(report),
                RunEvent::Failed(message) => return Err(ProcessingError::new(message)),
            }
        }

        match self.worker.await {
            Ok(()) => Err(ProcessingError::new("Batch worker exited without a result")),
            Err(e) => Err(ProcessingError::new(format!("Batch worker panicked: {}", e))),
        }
    }
}
