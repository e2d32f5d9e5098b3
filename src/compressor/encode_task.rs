//! # Encode Task Module
//!
//! L'unità di lavoro: un file sorgente, un path di output, una risoluzione
//! target. L'esecuzione produce sempre un `TaskResult`, mai un errore: i
//! fallimenti vengono convertiti qui, al confine del task.

use crate::error::CompressError;
use crate::file_manager::FileManager;
use crate::resolution::Resolution;
use crate::shutdown::StopSignal;
use crate::tree_mirror::SourceFile;
use crate::video_processor::VideoProcessor;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::info;

/// One file's transcode, immutable once built
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodeTask {
    /// Position in the planned batch
    pub id: usize,
    pub source_path: PathBuf,
    /// Source path relative to the source root, original name included
    pub relative_path: PathBuf,
    /// Mirrored directory + sanitized working name
    pub output_path: PathBuf,
    /// Lowercased container extension
    pub extension: String,
    pub source_resolution: Resolution,
    pub target: Resolution,
}

impl EncodeTask {
    /// Runs the encoder for this task. Partial output is deleted on failure.
    pub async fn execute(self, processor: &VideoProcessor, stop: StopSignal) -> TaskResult {
        let started = Instant::now();
        info!(
            file = %self.relative_path.display(),
            source = %self.source_resolution,
            target = %self.target,
            "Encoding started"
        );

        let result = processor
            .encode(&self.source_path, &self.output_path, self.target, &self.extension, stop)
            .await;
        let elapsed = started.elapsed();

        match result {
            Ok(()) => {
                let source_size = FileManager::get_file_size(&self.source_path).await.unwrap_or(0);
                let output_size = FileManager::get_file_size(&self.output_path).await.unwrap_or(0);
                TaskResult::success(self, source_size, output_size, elapsed)
            }
            Err(e) => {
                FileManager::remove_partial_output(&self.output_path).await;
                TaskResult::failure(self, FailureKind::from(&e), e.to_string(), elapsed)
            }
        }
    }
}

/// Why a file did not produce an output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Probe,
    Encoder,
    Timeout,
    Cancelled,
    Crashed,
    NameCollision,
    Restore,
    Io,
}

impl From<&CompressError> for FailureKind {
    fn from(error: &CompressError) -> Self {
        match error {
            CompressError::Probe(_) | CompressError::Json(_) => Self::Probe,
            CompressError::Encoder(_) => Self::Encoder,
            CompressError::Timeout(_) => Self::Timeout,
            CompressError::Cancelled(_) => Self::Cancelled,
            CompressError::NameCollision(_) => Self::NameCollision,
            _ => Self::Io,
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Probe => "probe failed",
            Self::Encoder => "encoder failed",
            Self::Timeout => "timed out",
            Self::Cancelled => "cancelled",
            Self::Crashed => "worker crashed",
            Self::NameCollision => "name collision",
            Self::Restore => "restore failed",
            Self::Io => "I/O error",
        };
        f.write_str(label)
    }
}

/// Outcome of one file; the diagnostic exists only for failures
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TaskOutcome {
    Success {
        output_path: PathBuf,
        source_size: u64,
        output_size: u64,
    },
    Failure {
        kind: FailureKind,
        diagnostic: String,
    },
}

/// Result record for one discovered file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    pub relative_path: PathBuf,
    pub source_path: PathBuf,
    /// The dispatched task; None when the file could not be planned
    pub task: Option<EncodeTask>,
    pub outcome: TaskOutcome,
    pub elapsed: Duration,
}

impl TaskResult {
    pub fn success(task: EncodeTask, source_size: u64, output_size: u64, elapsed: Duration) -> Self {
        Self {
            relative_path: task.relative_path.clone(),
            source_path: task.source_path.clone(),
            outcome: TaskOutcome::Success {
                output_path: task.output_path.clone(),
                source_size,
                output_size,
            },
            task: Some(task),
            elapsed,
        }
    }

    pub fn failure(task: EncodeTask, kind: FailureKind, diagnostic: String, elapsed: Duration) -> Self {
        Self {
            relative_path: task.relative_path.clone(),
            source_path: task.source_path.clone(),
            task: Some(task),
            outcome: TaskOutcome::Failure { kind, diagnostic },
            elapsed,
        }
    }

    /// Failure for a file that never became an `EncodeTask`
    pub fn unplanned(file: &SourceFile, kind: FailureKind, diagnostic: String, elapsed: Duration) -> Self {
        Self {
            relative_path: file.relative_path.clone(),
            source_path: file.path.clone(),
            task: None,
            outcome: TaskOutcome::Failure { kind, diagnostic },
            elapsed,
        }
    }

    /// Same result with the output moved to `output_path`
    pub fn relocated(self, output_path: PathBuf) -> Self {
        match self.outcome {
            TaskOutcome::Success { source_size, output_size, .. } => Self {
                outcome: TaskOutcome::Success {
                    output_path,
                    source_size,
                    output_size,
                },
                ..self
            },
            TaskOutcome::Failure { .. } => self,
        }
    }

    /// Same result turned into a failure
    pub fn into_failure(self, kind: FailureKind, diagnostic: String) -> Self {
        Self {
            outcome: TaskOutcome::Failure { kind, diagnostic },
            ..self
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, TaskOutcome::Success { .. })
    }

    pub fn output_path(&self) -> Option<&Path> {
        match &self.outcome {
            TaskOutcome::Success { output_path, .. } => Some(output_path),
            TaskOutcome::Failure { .. } => None,
        }
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        match &self.outcome {
            TaskOutcome::Failure { kind, .. } => Some(*kind),
            TaskOutcome::Success { .. } => None,
        }
    }

    pub fn diagnostic(&self) -> Option<&str> {
        match &self.outcome {
            TaskOutcome::Failure { diagnostic, .. } => Some(diagnostic),
            TaskOutcome::Success { .. } => None,
        }
    }
}

#[cfg(test)]
pub(crate) fn sample_task(id: usize, relative: &str) -> EncodeTask {
    EncodeTask {
        id,
        source_path: PathBuf::from("/src").join(relative),
        relative_path: PathBuf::from(relative),
        output_path: PathBuf::from("/out").join(relative),
        extension: "mp4".to_string(),
        source_resolution: Resolution::new(1920, 1080),
        target: Resolution::new(1280, 720),
    }
}
