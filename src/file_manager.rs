//! # File Management Module
//!
//! Operazioni sui file di output e utilità di formattazione.
//!
//! ## Responsabilità:
//! - Dimensione dei file sorgente e di output
//! - Rimozione degli output parziali dopo un encode fallito
//! - Rinomina in due fasi per il ripristino dei nomi originali
//! - Formattazione human-readable delle dimensioni e calcolo riduzione

use anyhow::Result;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

/// Manages file operations on the output tree
pub struct FileManager;

impl FileManager {
    /// Size of a file in bytes
    pub async fn get_file_size(path: &Path) -> Result<u64> {
        let metadata = fs::metadata(path).await?;
        Ok(metadata.len())
    }

    /// Deletes a partial output left behind by a failed encode.
    ///
    /// Returns whether a file was removed.
    pub async fn remove_partial_output(path: &Path) -> bool {
        match fs::remove_file(path).await {
            Ok(()) => {
                debug!("Removed partial output: {}", path.display());
                true
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
            Err(e) => {
                warn!("Failed to remove partial output {}: {}", path.display(), e);
                false
            }
        }
    }

    /// Hidden staging name used between the two phases of a restore
    pub fn staging_path(path: &Path, index: usize) -> PathBuf {
        let name = path.file_name().unwrap_or_default().to_string_lossy();
        path.with_file_name(format!(".{}.restore-{}", name, index))
    }

    /// Get human-readable file size
    pub fn format_size(size: u64) -> String {
        const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
        let mut size = size as f64;
        let mut unit_index = 0;

        while size >= 1024.0 && unit_index < UNITS.len() - 1 {
            size /= 1024.0;
            unit_index += 1;
        }

        if unit_index == 0 {
            format!("{} {}", size as u64, UNITS[unit_index])
        } else {
            format!("{:.2} {}", size, UNITS[unit_index])
        }
    }

    /// Calculate percentage reduction
    pub fn calculate_reduction(original_size: u64, new_size: u64) -> f64 {
        if original_size == 0 {
            0.0
        } else {
            ((original_size as f64 - new_size as f64) / original_size as f64) * 100.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_format_size() {
        assert_eq!(FileManager::format_size(512), "512 B");
        assert_eq!(FileManager::format_size(1536), "1.50 KB");
        assert_eq!(FileManager::format_size(5 * 1024 * 1024), "5.00 MB");
    }

    #[test]
    fn test_calculate_reduction() {
        assert_eq!(FileManager::calculate_reduction(0, 10), 0.0);
        assert_eq!(FileManager::calculate_reduction(200, 50), 75.0);
    }

    #[test]
    fn test_staging_path_is_hidden_sibling() {
        let staged = FileManager::staging_path(Path::new("/out/a/my_clip.mp4"), 3);
        assert_eq!(staged, PathBuf::from("/out/a/.my_clip.mp4.restore-3"));
    }

    #[tokio::test]
    async fn test_remove_partial_output() {
        let temp = TempDir::new().unwrap();
        let partial = temp.path().join("broken.mp4");
        tokio::fs::write(&partial, b"half an encode").await.unwrap();

        assert!(FileManager::remove_partial_output(&partial).await);
        assert!(!partial.exists());
        assert!(!FileManager::remove_partial_output(&partial).await);
    }
}
