//! # Space Video Compressor Library
//!
//! Ricodifica in H.265 tutti i video di un albero di directory, replicandone
//! la struttura in una directory di output.
//!
//! ## Responsabilità:
//! - Definisce la struttura modulare dell'applicazione
//! - Espone i tipi e le funzioni principali tramite re-exports
//! - Fornisce un'interfaccia pulita per il main.rs e per altri consumatori
//!
//! ## Architettura dei moduli:
//! - `config`: Gestione configurazione e validazione parametri
//! - `error`: Tipi di errore e classificazione fatale / per file
//! - `tree_mirror`: Discovery dei video e mirror delle directory
//! - `path_mapper`: Nomi di lavoro sanitizzati e ripristino degli originali
//! - `resolution`: Calcolo della risoluzione target
//! - `video_processor`: Invocazione di ffprobe / ffmpeg
//! - `compressor`: Coordinatore del batch, dispatcher e task
//! - `report`: Report finale ed exit code
//! - `progress`, `json_output`, `logging`: Feedback verso l'utente
//!
//! ## Utilizzo:
//! ```rust,ignore
//! use space_video_compressor::{BatchCoordinator, Config};
//!
//! let mut coordinator = BatchCoordinator::new(&path, Config::default())?;
//! let report = coordinator.run().await?;
//! std::process::exit(report.outcome().exit_code() as i32);
//! ```

pub mod compressor;
pub mod config;
pub mod error;
pub mod file_manager;
pub mod json_output;
pub mod logging;
pub mod path_mapper;
pub mod platform;
pub mod progress;
pub mod report;
pub mod resolution;
pub mod shutdown;
pub mod tree_mirror;
pub mod utils;
pub mod video_processor;

#[cfg(test)]
mod test_fixtures;

pub use compressor::{BatchCoordinator, BatchState, EncodeTask, FailureKind, TaskResult};
pub use config::{Concurrency, Config};
pub use error::CompressError;
pub use report::{BatchOutcome, BatchReport};
pub use resolution::Resolution;
