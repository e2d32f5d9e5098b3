//! # Batch Report Module
//!
//! Riepilogo finale di un batch: conteggi, byte risparmiati e lista dei
//! fallimenti con la loro diagnostica.
//!
//! ## Esito ed exit code:
//! - `Completed` (0): nessun fallimento
//! - `Degraded` (1): almeno un file è fallito
//! - `Aborted` (2): il batch è stato interrotto

use crate::compressor::encode_task::{TaskOutcome, TaskResult};
use crate::file_manager::FileManager;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How a batch ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchOutcome {
    Completed,
    Degraded,
    Aborted,
}

impl BatchOutcome {
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Completed => 0,
            Self::Degraded => 1,
            Self::Aborted => 2,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchReport {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Successful results, sorted by relative path once finalized
    pub successes: Vec<TaskResult>,
    /// Failed results, sorted by relative path once finalized
    pub failures: Vec<TaskResult>,
    /// Source bytes of the successful files
    pub bytes_in: u64,
    /// Output bytes of the successful files
    pub bytes_out: u64,
    pub aborted: bool,
    pub elapsed: Duration,
}

impl BatchReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, result: TaskResult) {
        self.total += 1;
        match &result.outcome {
            TaskOutcome::Success { source_size, output_size, .. } => {
                self.succeeded += 1;
                self.bytes_in += source_size;
                self.bytes_out += output_size;
                self.successes.push(result);
            }
            TaskOutcome::Failure { .. } => {
                self.failed += 1;
                self.failures.push(result);
            }
        }
    }

    /// Sorts the result lists and stamps the batch duration
    pub fn finalize(&mut self, aborted: bool, elapsed: Duration) {
        self.successes.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
        self.failures.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
        self.aborted = aborted;
        self.elapsed = elapsed;
    }

    pub fn outcome(&self) -> BatchOutcome {
        if self.aborted {
            BatchOutcome::Aborted
        } else if self.failed > 0 {
            BatchOutcome::Degraded
        } else {
            BatchOutcome::Completed
        }
    }

    pub fn bytes_saved(&self) -> u64 {
        self.bytes_in.saturating_sub(self.bytes_out)
    }

    pub fn reduction_percent(&self) -> f64 {
        FileManager::calculate_reduction(self.bytes_in, self.bytes_out)
    }

    /// One-line summary for the progress bar and the log
    pub fn format_summary(&self) -> String {
        format!(
            "Processed: {} files | Succeeded: {} | Failed: {} | Total saved: {} ({:.2}%) | {:.1}s",
            self.total,
            self.succeeded,
            self.failed,
            FileManager::format_size(self.bytes_saved()),
            self.reduction_percent(),
            self.elapsed.as_secs_f64()
        )
    }

    /// One entry per failure. With `verbose` the full diagnostic follows each
    /// entry, otherwise only its last line.
    pub fn failure_lines(&self, verbose: bool) -> Vec<String> {
        self.failures
            .iter()
            .filter_map(|result| match &result.outcome {
                TaskOutcome::Failure { kind, diagnostic } => {
                    let detail = if verbose {
                        diagnostic.as_str()
                    } else {
                        diagnostic.lines().last().unwrap_or_default()
                    };
                    Some(format!("{} ({}): {}", result.relative_path.display(), kind, detail))
                }
                TaskOutcome::Success { .. } => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compressor::encode_task::{sample_task, FailureKind};

    fn failure(relative: &str, diagnostic: &str) -> TaskResult {
        TaskResult::failure(sample_task(0, relative), FailureKind::Encoder, diagnostic.to_string(), Duration::ZERO)
    }

    #[test]
    fn test_counts_and_bytes() {
        let mut report = BatchReport::new();
        report.record(TaskResult::success(sample_task(0, "a.mp4"), 1000, 400, Duration::ZERO));
        report.record(TaskResult::success(sample_task(1, "b.mp4"), 1000, 600, Duration::ZERO));
        report.record(failure("c.mp4", "boom"));
        report.finalize(false, Duration::from_secs(3));

        assert_eq!((report.total, report.succeeded, report.failed), (3, 2, 1));
        assert_eq!(report.bytes_saved(), 1000);
        assert!((report.reduction_percent() - 50.0).abs() < f64::EPSILON);
        assert_eq!(report.outcome(), BatchOutcome::Degraded);
        assert_eq!(report.outcome().exit_code(), 1);
        assert!(report.format_summary().contains("Failed: 1"));
    }

    #[test]
    fn test_outcomes() {
        let mut report = BatchReport::new();
        report.finalize(false, Duration::ZERO);
        assert_eq!(report.outcome(), BatchOutcome::Completed);
        assert_eq!(report.outcome().exit_code(), 0);

        report.finalize(true, Duration::ZERO);
        assert_eq!(report.outcome(), BatchOutcome::Aborted);
        assert_eq!(report.outcome().exit_code(), 2);
    }

    #[test]
    fn test_failures_sorted_by_relative_path() {
        let mut report = BatchReport::new();
        report.record(failure("z/late.mp4", "x"));
        report.record(failure("a/early.mp4", "y"));
        report.record(failure("m/middle.mp4", "z"));
        report.finalize(false, Duration::ZERO);

        let order: Vec<_> = report.failures.iter().map(|r| r.relative_path.clone()).collect();
        assert_eq!(
            order,
            vec![
                std::path::PathBuf::from("a/early.mp4"),
                std::path::PathBuf::from("m/middle.mp4"),
                std::path::PathBuf::from("z/late.mp4"),
            ]
        );
    }

    #[test]
    fn test_failure_lines_verbosity() {
        let mut report = BatchReport::new();
        report.record(failure("a.mp4", "first line\nInvalid data found"));
        report.finalize(false, Duration::ZERO);

        let short = report.failure_lines(false);
        assert_eq!(short, vec!["a.mp4 (encoder failed): Invalid data found".to_string()]);

        let full = report.failure_lines(true);
        assert!(full[0].contains("first line\nInvalid data found"));
    }
}
