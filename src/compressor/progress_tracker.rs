//! # Progress Tracking Module
//!
//! Reagisce al completamento di un file: log per file e barra di progresso.
//! Viene chiamato dal dispatcher man mano che i risultati arrivano, sempre
//! dallo stesso task. Gli eventi JSON `file_complete` partono solo dopo il
//! ripristino dei nomi, dal coordinator.

use super::encode_task::{TaskOutcome, TaskResult};
use crate::file_manager::FileManager;
use crate::progress::ProgressManager;
use tracing::{debug, error, info};

pub struct ProgressTracker {
    total_files: usize,
    completed: usize,
    succeeded: usize,
    failed: usize,
    bytes_saved: u64,
    progress_manager: ProgressManager,
}

impl ProgressTracker {
    pub fn new(total_files: usize, show_bar: bool) -> Self {
        Self {
            total_files,
            completed: 0,
            succeeded: 0,
            failed: 0,
            bytes_saved: 0,
            progress_manager: ProgressManager::new(total_files as u64, show_bar),
        }
    }

    /// Logs one finished file and advances the bar
    pub fn handle_result(&mut self, result: &TaskResult) {
        self.completed += 1;
        let name = result.relative_path.display();

        let message = match &result.outcome {
            TaskOutcome::Success {
                source_size,
                output_size,
                ..
            } => {
                self.succeeded += 1;
                self.bytes_saved += source_size.saturating_sub(*output_size);
                let reduction = FileManager::calculate_reduction(*source_size, *output_size);
                info!(
                    "[{}/{}] [OK] {}: {} -> {} ({:.1}% saved, {:.1}s)",
                    self.completed,
                    self.total_files,
                    name,
                    FileManager::format_size(*source_size),
                    FileManager::format_size(*output_size),
                    reduction,
                    result.elapsed.as_secs_f64()
                );
                format!("[OK] {}: {:.1}% saved", name, reduction)
            }
            TaskOutcome::Failure { kind, diagnostic } => {
                self.failed += 1;
                error!("[{}/{}] [ERROR] {}: {}", self.completed, self.total_files, name, kind);
                debug!("Diagnostic for {}:\n{}", name, diagnostic);
                format!("[ERROR] {}: {}", name, kind)
            }
        };

        self.progress_manager.update(&message);
    }

    pub fn finish(&self, summary: &str) {
        self.progress_manager.finish(summary);
    }

    pub fn total_files(&self) -> usize {
        self.total_files
    }

    pub fn completed(&self) -> usize {
        self.completed
    }

    pub fn succeeded(&self) -> usize {
        self.succeeded
    }

    pub fn failed(&self) -> usize {
        self.failed
    }

    pub fn bytes_saved(&self) -> u64 {
        self.bytes_saved
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compressor::encode_task::{sample_task, FailureKind};
    use std::time::Duration;

    #[test]
    fn test_counts_results() {
        let mut tracker = ProgressTracker::new(3, false);
        tracker.handle_result(&TaskResult::success(sample_task(0, "a.mp4"), 1000, 300, Duration::ZERO));
        tracker.handle_result(&TaskResult::failure(
            sample_task(1, "b.mp4"),
            FailureKind::Encoder,
            "bad".into(),
            Duration::ZERO,
        ));

        assert_eq!(tracker.total_files(), 3);
        assert_eq!(tracker.completed(), 2);
        assert_eq!(tracker.succeeded(), 1);
        assert_eq!(tracker.failed(), 1);
        assert_eq!(tracker.bytes_saved(), 700);
        tracker.finish("done");
    }
}
