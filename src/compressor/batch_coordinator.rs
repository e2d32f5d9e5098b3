//! # Batch Coordinator
//!
//! Driver di un batch: mirror delle directory, costruzione dei task,
//! dispatch ai worker, ripristino dei nomi originali e report finale.
//!
//! ## Stati:
//! `Idle → Mirroring → Dispatching → Reporting → Done`, con `Failed` come
//! stato terminale per gli errori fatali (sorgente mancante, tool assenti,
//! directory di output non creabili). I fallimenti dei singoli file non
//! cambiano stato: finiscono nel report.

use super::dispatcher::Dispatcher;
use super::encode_task::{EncodeTask, FailureKind, TaskResult};
use super::path_resolver::PathResolver;
use super::progress_tracker::ProgressTracker;
use crate::config::Config;
use crate::error::CompressError;
use crate::file_manager::FileManager;
use crate::json_output::{JsonConfig, JsonMessage};
use crate::path_mapper::PathMapper;
use crate::progress::ProgressManager;
use crate::report::BatchReport;
use crate::resolution::ResolutionPlanner;
use crate::shutdown::{stop_channel, StopHandle, StopSignal};
use crate::tree_mirror::{SourceFile, TreeMirror};
use crate::video_processor::VideoProcessor;
use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchState {
    Idle,
    Mirroring,
    Dispatching,
    Reporting,
    Done,
    Failed(String),
}

/// A discovered file with its reserved working output path
struct Candidate {
    file: SourceFile,
    output_path: PathBuf,
}

pub struct BatchCoordinator {
    config: Config,
    source_root: PathBuf,
    output_root: PathBuf,
    state: BatchState,
    mapper: PathMapper,
    stop_handle: StopHandle,
    stop: StopSignal,
    show_progress: bool,
}

impl BatchCoordinator {
    /// Rejects an invalid configuration up front
    pub fn new(source_root: &Path, config: Config) -> Result<Self, CompressError> {
        config
            .validate()
            .map_err(|e| CompressError::Validation(e.to_string()))?;

        let output_root = PathResolver::output_root(source_root, &config);
        let (stop_handle, stop) = stop_channel();

        Ok(Self {
            config,
            source_root: source_root.to_path_buf(),
            output_root,
            state: BatchState::Idle,
            mapper: PathMapper::new(),
            stop_handle,
            stop,
            show_progress: false,
        })
    }

    /// Draw an indicatif bar while running
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn state(&self) -> &BatchState {
        &self.state
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    /// Handle for requesting a stop from outside (Ctrl-C)
    pub fn stop_handle(&self) -> StopHandle {
        self.stop_handle.clone()
    }

    /// Runs the whole batch. `Err` only for fatal errors.
    pub async fn run(&mut self) -> Result<BatchReport, CompressError> {
        match self.run_batch().await {
            Ok(report) => {
                self.transition(BatchState::Done);
                Ok(report)
            }
            Err(e) => {
                error!("Batch aborted: {}", e);
                self.transition(BatchState::Failed(e.to_string()));
                Err(e)
            }
        }
    }

    async fn run_batch(&mut self) -> Result<BatchReport, CompressError> {
        let started = Instant::now();

        let source_root = self.preflight()?;
        let tools = VideoProcessor::check_dependencies(&self.config)?;
        let processor = Arc::new(VideoProcessor::new(&self.config, tools));

        self.transition(BatchState::Mirroring);
        let dirs = TreeMirror::mirror(&source_root, &self.output_root)?;
        info!("Mirrored {} directories into {}", dirs, self.output_root.display());

        self.transition(BatchState::Dispatching);
        let mut report = BatchReport::new();
        let candidates = self.register_names(&source_root, &mut report);

        if self.config.json_output {
            JsonMessage::start(
                source_root.clone(),
                self.output_root.clone(),
                report.total + candidates.len(),
                JsonConfig::from(&self.config),
            )
            .emit();
            for failure in &report.failures {
                JsonMessage::file_complete(failure).emit();
            }
        }
        let tasks = self.plan_tasks(candidates, &processor, &mut report).await;

        let results = self.dispatch(tasks, processor).await;

        self.transition(BatchState::Reporting);
        for result in self.restore_names(results).await {
            self.complete_file(result, &mut report);
        }
        report.finalize(self.stop.is_stopped(), started.elapsed());
        self.log_summary(&report);

        Ok(report)
    }

    /// Checks the source root and output root before touching the disk
    fn preflight(&self) -> Result<PathBuf, CompressError> {
        let source_root = self
            .source_root
            .canonicalize()
            .map_err(|_| CompressError::SourceNotFound(self.source_root.clone()))?;
        if !source_root.is_dir() {
            return Err(CompressError::SourceNotFound(self.source_root.clone()));
        }

        if PathResolver::is_same_dir(&source_root, &self.output_root) {
            return Err(CompressError::Validation(format!(
                "output directory {} is the source directory",
                self.output_root.display()
            )));
        }

        info!(
            "Starting batch: {} -> {}",
            source_root.display(),
            self.output_root.display()
        );
        debug!(
            "Bounds {}x{}, crf {}, preset {}, workers {}",
            self.config.max_width,
            self.config.max_height,
            self.config.video_crf,
            self.config.preset,
            self.config.workers
        );
        Ok(source_root)
    }

    /// Discovers files in traversal order and reserves a working name for each
    fn register_names(&mut self, source_root: &Path, report: &mut BatchReport) -> Vec<Candidate> {
        let mut discovery = TreeMirror::discover(source_root, Some(&self.output_root));
        let mut candidates = Vec::new();

        for file in discovery.by_ref() {
            let output_dir = PathResolver::output_dir(&self.output_root, &file);
            match self.mapper.register(&output_dir, file.file_name()) {
                Ok(working_name) => candidates.push(Candidate {
                    output_path: output_dir.join(working_name),
                    file,
                }),
                Err(e) => {
                    warn!("Cannot name output for {}: {}", file.relative_path.display(), e);
                    report.record(TaskResult::unplanned(
                        &file,
                        FailureKind::NameCollision,
                        e.to_string(),
                        Duration::ZERO,
                    ));
                }
            }
        }

        let skipped = discovery.skipped_unsupported();
        if skipped > 0 {
            warn!("Skipped {} files with unsupported extensions", skipped);
        }
        let links = discovery.skipped_links();
        if links > 0 {
            warn!("Skipped {} links that do not point to a file", links);
        }
        if candidates.is_empty() && report.total == 0 {
            warn!("No video files found in {}", source_root.display());
        } else {
            info!("Found {} video files", candidates.len() + report.total);
        }
        candidates
    }

    /// Probes every candidate and builds its task. Unplannable files become
    /// failures in `report` and are not dispatched.
    async fn plan_tasks(
        &self,
        candidates: Vec<Candidate>,
        processor: &Arc<VideoProcessor>,
        report: &mut BatchReport,
    ) -> Vec<EncodeTask> {
        if candidates.is_empty() {
            return Vec::new();
        }

        let spinner = ProgressManager::spinner(
            &format!("Probing {} files...", candidates.len()),
            self.show_progress,
        );
        let planner = ResolutionPlanner::from_config(&self.config);
        let concurrency = self.config.workers.resolve();

        let planned: Vec<Result<EncodeTask, TaskResult>> = stream::iter(candidates.into_iter().enumerate())
            .map(|(id, candidate)| {
                let processor = processor.clone();
                let stop = self.stop.clone();
                async move {
                    let started = Instant::now();
                    let Candidate { file, output_path } = candidate;
                    let plan = match processor.probe(&file.path, stop).await {
                        Ok(source) => planner.plan(source).map(|target| (source, target)),
                        Err(e) => Err(e),
                    };
                    match plan {
                        Ok((source_resolution, target)) => Ok(EncodeTask {
                            id,
                            source_path: file.path,
                            relative_path: file.relative_path,
                            output_path,
                            extension: file.extension,
                            source_resolution,
                            target,
                        }),
                        Err(e) => {
                            warn!("Cannot plan {}: {}", file.relative_path.display(), e);
                            Err(TaskResult::unplanned(
                                &file,
                                FailureKind::from(&e),
                                e.to_string(),
                                started.elapsed(),
                            ))
                        }
                    }
                }
            })
            .buffered(concurrency)
            .collect()
            .await;
        spinner.finish_and_clear();

        let mut tasks = Vec::with_capacity(planned.len());
        for entry in planned {
            match entry {
                Ok(task) => tasks.push(task),
                Err(failure) => self.complete_file(failure, report),
            }
        }
        tasks
    }

    async fn dispatch(&self, tasks: Vec<EncodeTask>, processor: Arc<VideoProcessor>) -> Vec<TaskResult> {
        let dispatcher = Dispatcher::new(self.config.workers.resolve(), self.stop.clone());
        info!(
            "Encoding {} files with {} workers",
            tasks.len(),
            dispatcher.concurrency()
        );

        let mut tracker = ProgressTracker::new(tasks.len(), self.show_progress);
        let json_output = self.config.json_output;

        let results = dispatcher
            .run_all(
                tasks,
                move |task, stop| {
                    let processor = processor.clone();
                    async move {
                        if json_output {
                            JsonMessage::file_start(&task).emit();
                        }
                        task.execute(&processor, stop).await
                    }
                },
                |result| tracker.handle_result(result),
            )
            .await;

        tracker.finish(&format!(
            "{} succeeded, {} failed",
            tracker.succeeded(),
            tracker.failed()
        ));
        results
    }

    /// Moves every successful output from its working name back to the
    /// original name. Two phases: all working files go to hidden staging
    /// names first, so no rename can land on another task's working file.
    async fn restore_names(&self, results: Vec<TaskResult>) -> Vec<TaskResult> {
        let mut staged = Vec::with_capacity(results.len());

        for (index, result) in results.into_iter().enumerate() {
            let Some(working_path) = result.output_path().map(Path::to_path_buf) else {
                staged.push((result, None));
                continue;
            };
            let output_dir = working_path.parent().unwrap_or_else(|| Path::new("")).to_path_buf();
            let working_name = working_path
                .file_name()
                .and_then(|name| name.to_str())
                .unwrap_or_default();

            let original = match self.mapper.restore(&output_dir, working_name) {
                Some(original) if original != working_name => original.to_string(),
                _ => {
                    staged.push((result, None));
                    continue;
                }
            };

            let staging = FileManager::staging_path(&working_path, index);
            match tokio::fs::rename(&working_path, &staging).await {
                Ok(()) => {
                    let destination = PathResolver::restored_path(&output_dir, &original);
                    staged.push((result, Some((staging, destination))));
                }
                Err(e) => {
                    FileManager::remove_partial_output(&working_path).await;
                    staged.push((restore_failed(result, &working_path, e), None));
                }
            }
        }

        let mut restored = Vec::with_capacity(staged.len());
        for (result, pending) in staged {
            let Some((staging, destination)) = pending else {
                restored.push(result);
                continue;
            };
            match tokio::fs::rename(&staging, &destination).await {
                Ok(()) => {
                    debug!("Restored {}", destination.display());
                    restored.push(result.relocated(destination));
                }
                Err(e) => {
                    FileManager::remove_partial_output(&staging).await;
                    restored.push(restore_failed(result, &destination, e));
                }
            }
        }
        restored
    }

    /// Records a file's final result. Its `file_complete` event carries the
    /// path the output ends up at.
    fn complete_file(&self, result: TaskResult, report: &mut BatchReport) {
        if self.config.json_output {
            JsonMessage::file_complete(&result).emit();
        }
        report.record(result);
    }

    fn log_summary(&self, report: &BatchReport) {
        if self.config.json_output {
            JsonMessage::complete(report).emit();
        }

        info!("{}", report.format_summary());
        if report.aborted {
            warn!("Batch was stopped before all files were processed");
        }
        if report.failed > 0 {
            warn!("{} files failed:", report.failed);
            for line in report.failure_lines(self.config.debug) {
                warn!("  {}", line);
            }
        }
    }

    fn transition(&mut self, next: BatchState) {
        debug!("Batch state: {:?} -> {:?}", self.state, next);
        self.state = next;
    }
}

fn restore_failed(result: TaskResult, path: &Path, error: std::io::Error) -> TaskResult {
    warn!("Cannot restore {}: {}", path.display(), error);
    let diagnostic = format!("failed to restore original name {}: {}", path.display(), error);
    result.into_failure(FailureKind::Restore, diagnostic)
}
