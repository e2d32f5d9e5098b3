//! # Progress Bar Module
//!
//! Feedback visivo con `indicatif` durante il batch.
//!
//! ## Responsabilità:
//! - Barra di progresso principale (un tick per file completato)
//! - Spinner per la fase di probing, di durata indeterminata
//! - Versione nascosta quando l'output non è un terminale, in modalità JSON
//!   o con `--no-progress`
//!
//! ## Visual feedback:
//! ```text
//! ⠋ [00:12:15] [========================>---------------] 9/15 (60%) [OK] trip/day1.mp4: 41.3% saved
//! ```

use indicatif::{ProgressBar, ProgressStyle};
use std::io::IsTerminal;
use std::time::Duration;

/// Manages the batch progress bar
#[derive(Clone)]
pub struct ProgressManager {
    bar: ProgressBar,
}

impl ProgressManager {
    /// Create a new progress manager; `visible = false` draws nothing
    pub fn new(total_files: u64, visible: bool) -> Self {
        if !visible {
            return Self {
                bar: ProgressBar::hidden(),
            };
        }

        let bar = ProgressBar::new(total_files);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
        {
            bar.set_style(style.progress_chars("=>-"));
        }
        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }

    /// Whether a bar should be drawn at all
    pub fn should_display(requested: bool, json_output: bool) -> bool {
        requested && !json_output && std::io::stderr().is_terminal()
    }

    /// Update progress with a message
    pub fn update(&self, message: &str) {
        self.bar.inc(1);
        self.bar.set_message(message.to_string());
    }

    /// Finish with a final message
    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }

    /// Create a spinner for indeterminate progress
    pub fn spinner(message: &str, visible: bool) -> ProgressBar {
        if !visible {
            return ProgressBar::hidden();
        }

        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            spinner.set_style(style);
        }
        spinner.set_message(message.to_string());
        spinner.enable_steady_tick(Duration::from_millis(100));

        spinner
    }

    pub fn position(&self) -> u64 {
        self.bar.position()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hidden_bar_still_counts() {
        let progress = ProgressManager::new(3, false);
        progress.update("one");
        progress.update("two");
        assert_eq!(progress.position(), 2);
        progress.finish("done");
    }

    #[test]
    fn test_json_mode_hides_bar() {
        assert!(!ProgressManager::should_display(true, true));
        assert!(!ProgressManager::should_display(false, false));
    }
}
