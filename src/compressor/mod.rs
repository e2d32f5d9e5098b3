//! # Compressor Module
//!
//! Orchestrazione del batch, separata in sottomoduli:
//! - `batch_coordinator`: Driver principale e macchina a stati
//! - `dispatcher`: Pool di worker con backpressure e isolamento dei crash
//! - `encode_task`: Unità di lavoro per singolo file e suo risultato
//! - `progress_tracker`: Log per file, progress bar ed eventi JSON
//! - `path_resolver`: Logica di calcolo path centralizzata

pub mod batch_coordinator;
pub mod dispatcher;
pub mod encode_task;
pub mod path_resolver;
pub mod progress_tracker;

pub use batch_coordinator::{BatchCoordinator, BatchState};
pub use dispatcher::Dispatcher;
pub use encode_task::{EncodeTask, FailureKind, TaskOutcome, TaskResult};
pub use path_resolver::PathResolver;
pub use progress_tracker::ProgressTracker;
