//! # Tree Mirror Module
//!
//! Questo modulo gestisce la discovery dei video e la replica della struttura
//! delle directory sorgente nella directory di output.
//!
//! ## Responsabilità:
//! - Discovery ricorsiva e lazy dei file video (estensione case-insensitive)
//! - Creazione di tutte le directory di output PRIMA dell'avvio degli encode
//! - Esclusione della directory di output se si trova dentro la sorgente
//!
//! ## Formati supportati:
//! - MP4, MKV, AVI, MOV, FLV, WMV
//!
//! ## Ordine:
//! L'attraversamento è depth-first con le entry di ogni directory ordinate per
//! nome, quindi stabile per uno stesso stato del filesystem.
//!
//! ## Esempio:
//! ```rust,ignore
//! TreeMirror::mirror(&source, &output)?;
//! for file in TreeMirror::discover(&source, Some(&output)) {
//!     println!("{}", file.relative_path.display());
//! }
//! ```

use crate::error::CompressError;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

/// Container extensions picked up by discovery (lowercase)
pub const SUPPORTED_EXTENSIONS: &[&str] = &["mp4", "mkv", "avi", "mov", "flv", "wmv"];

/// A discovered video file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Absolute path of the file
    pub path: PathBuf,
    /// Path relative to the source root
    pub relative_path: PathBuf,
    /// Lowercased container extension
    pub extension: String,
}

impl SourceFile {
    /// Directory of the file relative to the source root (empty for the root)
    pub fn relative_dir(&self) -> &Path {
        self.relative_path.parent().unwrap_or_else(|| Path::new(""))
    }

    pub fn file_name(&self) -> &OsStr {
        self.relative_path.file_name().unwrap_or_default()
    }
}

/// Walks a source tree and mirrors its directories
pub struct TreeMirror;

impl TreeMirror {
    /// Check if a path has a supported video extension
    pub fn is_supported(path: &Path) -> bool {
        Self::supported_extension(path).is_some()
    }

    fn supported_extension(path: &Path) -> Option<String> {
        let ext = path.extension()?.to_string_lossy().to_lowercase();
        SUPPORTED_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
    }

    /// Lazily enumerates supported video files under `root`.
    ///
    /// `exclude` is skipped entirely (used when the output root lives inside
    /// the source tree).
    pub fn discover(root: &Path, exclude: Option<&Path>) -> Discovery {
        Discovery::new(root, exclude)
    }

    /// Creates under `dest_root` every directory found under `root`.
    ///
    /// Idempotent: existing directories are left alone. Returns the number of
    /// directories ensured (including `dest_root` itself).
    pub fn mirror(root: &Path, dest_root: &Path) -> Result<usize, CompressError> {
        let root = root
            .canonicalize()
            .map_err(|_| CompressError::SourceNotFound(root.to_path_buf()))?;

        std::fs::create_dir_all(dest_root).map_err(|source| CompressError::Mirror {
            path: dest_root.to_path_buf(),
            source,
        })?;
        let dest_canonical = dest_root.canonicalize()?;

        let mut created = 0;
        let walker = WalkDir::new(&root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| entry.path() != dest_canonical);

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if e.depth() == 0 => return Err(CompressError::SourceNotFound(root.clone())),
                Err(e) => {
                    warn!("Skipping unreadable entry while mirroring: {}", e);
                    continue;
                }
            };

            if !entry.file_type().is_dir() {
                continue;
            }

            let relative = entry.path().strip_prefix(&root).unwrap_or_else(|_| Path::new(""));
            let target = dest_root.join(relative);
            std::fs::create_dir_all(&target).map_err(|source| CompressError::Mirror {
                path: target.clone(),
                source,
            })?;
            debug!("Mirrored directory: {}", target.display());
            created += 1;
        }

        Ok(created)
    }
}

/// Lazy, finite sequence of discovered video files
pub struct Discovery {
    root: PathBuf,
    walker: Box<dyn Iterator<Item = walkdir::Result<DirEntry>> + Send>,
    skipped_unsupported: usize,
    skipped_links: usize,
}

impl Discovery {
    fn new(root: &Path, exclude: Option<&Path>) -> Self {
        let root = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());
        let exclude = exclude.map(|p| p.canonicalize().unwrap_or_else(|_| p.to_path_buf()));

        let walker = WalkDir::new(&root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(move |entry| exclude.as_deref() != Some(entry.path()));

        Self {
            root,
            walker: Box::new(walker),
            skipped_unsupported: 0,
            skipped_links: 0,
        }
    }

    /// Files seen so far that were skipped for their extension
    pub fn skipped_unsupported(&self) -> usize {
        self.skipped_unsupported
    }

    /// Symlinks seen so far that do not resolve to a regular file
    pub fn skipped_links(&self) -> usize {
        self.skipped_links
    }
}

impl Iterator for Discovery {
    type Item = SourceFile;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entry = match self.walker.next()? {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable entry during discovery: {}", e);
                    continue;
                }
            };

            let path = entry.path();
            if entry.path_is_symlink() {
                // links to directories are not followed
                if !path.is_file() {
                    if !path.is_dir() {
                        warn!("Skipping dangling link: {}", path.display());
                    }
                    self.skipped_links += 1;
                    continue;
                }
            } else if !entry.file_type().is_file() {
                continue;
            }

            let Some(extension) = TreeMirror::supported_extension(path) else {
                debug!("Skipping unsupported file: {}", path.display());
                self.skipped_unsupported += 1;
                continue;
            };

            let relative_path = path
                .strip_prefix(&self.root)
                .map(Path::to_path_buf)
                .unwrap_or_else(|_| PathBuf::from(entry.file_name()));

            return Some(SourceFile {
                path: path.to_path_buf(),
                relative_path,
                extension,
            });
        }
    }
}
