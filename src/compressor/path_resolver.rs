//! # Path Resolution Module
//!
//! Centralizza il calcolo dei path di output: radice di output, directory
//! mirrorata per ogni file e path di lavoro del file codificato.

use crate::config::Config;
use crate::tree_mirror::SourceFile;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Suffix appended to the source directory name for the default output root
pub const OUTPUT_SUFFIX: &str = "_compressed";

pub struct PathResolver;

impl PathResolver {
    /// `<source>_compressed`, next to the source directory
    pub fn default_output_root(source_root: &Path) -> PathBuf {
        match source_root.file_name() {
            Some(name) => {
                let mut sibling = OsString::from(name);
                sibling.push(OUTPUT_SUFFIX);
                source_root.with_file_name(sibling)
            }
            None => source_root.join(OUTPUT_SUFFIX.trim_start_matches('_')),
        }
    }

    /// Output root from config, or the default sibling
    pub fn output_root(source_root: &Path, config: &Config) -> PathBuf {
        let root = config
            .output_path
            .clone()
            .unwrap_or_else(|| Self::default_output_root(source_root));
        debug!("Output root: {}", root.display());
        root
    }

    /// Mirrored directory that receives the encoded version of `file`
    pub fn output_dir(output_root: &Path, file: &SourceFile) -> PathBuf {
        output_root.join(file.relative_dir())
    }

    /// Final location for an original file name in a mirrored directory
    pub fn restored_path(output_dir: &Path, original_name: &str) -> PathBuf {
        output_dir.join(original_name)
    }

    /// True if `output_root` names the same directory as `source_root`
    pub fn is_same_dir(source_root: &Path, output_root: &Path) -> bool {
        match (source_root.canonicalize(), output_root.canonicalize()) {
            (Ok(source), Ok(output)) => source == output,
            _ => source_root == output_root,
        }
    }
}
