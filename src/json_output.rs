//! # JSON Output Module
//!
//! Output strutturato in JSON (una riga per evento su stdout) per chi
//! pilota il compressore da un altro processo.
//!
//! ## Tipi di messaggi:
//! - `start`: Inizio del batch
//! - `file_start`: Un worker ha preso in carico un file
//! - `file_complete`: Esito di un file (successo o fallimento)
//! - `complete`: Fine del batch con statistiche finali
//! - `error`: Errore fatale, il batch non è partito o si è interrotto

use crate::compressor::encode_task::{EncodeTask, FailureKind, TaskOutcome, TaskResult};
use crate::config::Config;
use crate::report::{BatchOutcome, BatchReport};
use crate::resolution::Resolution;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum JsonMessage {
    #[serde(rename = "start")]
    Start {
        source_dir: PathBuf,
        output_dir: PathBuf,
        total_files: usize,
        config: JsonConfig,
    },

    #[serde(rename = "file_start")]
    FileStart {
        path: PathBuf,
        index: usize,
        source: Resolution,
        target: Resolution,
    },

    #[serde(rename = "file_complete")]
    FileComplete {
        path: PathBuf,
        success: bool,
        output_path: Option<PathBuf>,
        source_size: Option<u64>,
        output_size: Option<u64>,
        failure: Option<FailureKind>,
        error: Option<String>,
        elapsed_seconds: f64,
    },

    #[serde(rename = "complete")]
    Complete {
        total: usize,
        succeeded: usize,
        failed: usize,
        bytes_saved: u64,
        reduction_percent: f64,
        duration_seconds: f64,
        outcome: BatchOutcome,
    },

    #[serde(rename = "error")]
    Error { message: String },
}

/// Encoding settings echoed in the `start` event
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonConfig {
    pub max_width: u32,
    pub max_height: u32,
    pub workers: usize,
    pub video_crf: u8,
    pub preset: String,
    pub audio_bitrate: String,
    pub frame_rate: Option<u32>,
}

impl JsonMessage {
    /// Emette il messaggio JSON su stdout
    pub fn emit(&self) {
        if let Ok(json) = serde_json::to_string(self) {
            println!("{}", json);
        }
    }

    pub fn start(source_dir: PathBuf, output_dir: PathBuf, total_files: usize, config: JsonConfig) -> Self {
        Self::Start {
            source_dir,
            output_dir,
            total_files,
            config,
        }
    }

    pub fn file_start(task: &EncodeTask) -> Self {
        Self::FileStart {
            path: task.relative_path.clone(),
            index: task.id,
            source: task.source_resolution,
            target: task.target,
        }
    }

    pub fn file_complete(result: &TaskResult) -> Self {
        let elapsed_seconds = result.elapsed.as_secs_f64();
        match &result.outcome {
            TaskOutcome::Success {
                output_path,
                source_size,
                output_size,
            } => Self::FileComplete {
                path: result.relative_path.clone(),
                success: true,
                output_path: Some(output_path.clone()),
                source_size: Some(*source_size),
                output_size: Some(*output_size),
                failure: None,
                error: None,
                elapsed_seconds,
            },
            TaskOutcome::Failure { kind, diagnostic } => Self::FileComplete {
                path: result.relative_path.clone(),
                success: false,
                output_path: None,
                source_size: None,
                output_size: None,
                failure: Some(*kind),
                error: Some(diagnostic.clone()),
                elapsed_seconds,
            },
        }
    }

    pub fn complete(report: &BatchReport) -> Self {
        Self::Complete {
            total: report.total,
            succeeded: report.succeeded,
            failed: report.failed,
            bytes_saved: report.bytes_saved(),
            reduction_percent: report.reduction_percent(),
            duration_seconds: report.elapsed.as_secs_f64(),
            outcome: report.outcome(),
        }
    }

    pub fn error(message: String) -> Self {
        Self::Error { message }
    }
}

impl From<&Config> for JsonConfig {
    fn from(config: &Config) -> Self {
        Self {
            max_width: config.max_width,
            max_height: config.max_height,
            workers: config.workers.resolve(),
            video_crf: config.video_crf,
            preset: config.preset.clone(),
            audio_bitrate: config.audio_bitrate.clone(),
            frame_rate: config.frame_rate,
        }
    }
}
