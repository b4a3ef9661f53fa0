// Application layer - Use case interactors

pub mod batch_interactor;
pub mod container;
pub mod runner;
pub mod task_executor;

// Re-export interactors
pub use batch_interactor::BatchInteractor;
pub use container::{AppContainer, DefaultAppContainer};
pub use runner::{BatchRunner, RunEvent, RunHandle};
pub use task_executor::TaskExecutor;
