//! # Platform-specific utilities
//!
//! Questo modulo centralizza la risoluzione dei tool esterni (ffmpeg, ffprobe)
//! in modo cross-platform: path espliciti da configurazione oppure lookup nel
//! `PATH` di sistema con il nome eseguibile della piattaforma.

use crate::config::Config;
use crate::error::CompressError;
use std::env;
use std::path::{Path, PathBuf};
use tracing::debug;

/// External tools this program drives
pub const REQUIRED_TOOLS: &[&str] = &["ffmpeg", "ffprobe"];

/// Platform-specific command lookup
pub struct PlatformCommands;

impl PlatformCommands {
    /// Platform-specific executable name
    pub fn executable_name(base_name: &str) -> String {
        if cfg!(windows) {
            format!("{}.exe", base_name)
        } else {
            base_name.to_string()
        }
    }

    /// Find a tool in the system PATH
    pub fn find_in_path(base_name: &str) -> Option<PathBuf> {
        let executable = Self::executable_name(base_name);
        let path_var = env::var_os("PATH")?;
        env::split_paths(&path_var)
            .map(|dir| dir.join(&executable))
            .find(|candidate| candidate.is_file())
    }

    /// Resolve a tool, preferring an explicit override
    pub fn resolve(base_name: &str, override_path: Option<&Path>) -> Result<PathBuf, CompressError> {
        if let Some(path) = override_path {
            if path.is_file() {
                debug!("Using configured {}: {}", base_name, path.display());
                return Ok(path.to_path_buf());
            }
            return Err(CompressError::MissingDependency(format!(
                "{} not found at configured path {}",
                base_name,
                path.display()
            )));
        }

        Self::find_in_path(base_name)
            .inspect(|path| debug!("Using system {}: {}", base_name, path.display()))
            .ok_or_else(|| {
                CompressError::MissingDependency(format!(
                    "{} is required but was not found in PATH ({})",
                    base_name,
                    Self::install_hint(base_name)
                ))
            })
    }

    /// Installation hint shown for a missing tool
    pub fn install_hint(tool_name: &str) -> &'static str {
        match tool_name {
            "ffmpeg" | "ffprobe" if cfg!(target_os = "linux") => "install with: sudo apt-get install ffmpeg",
            "ffmpeg" | "ffprobe" if cfg!(target_os = "macos") => "install with: brew install ffmpeg",
            _ => "download from https://ffmpeg.org/download.html",
        }
    }

    /// Human-readable availability report for `check-tools`
    pub fn tools_report(config: &Config) -> (String, bool) {
        let mut report = String::from("Tool availability:\n");
        let mut all_found = true;

        for tool in REQUIRED_TOOLS {
            let override_path = match *tool {
                "ffmpeg" => config.ffmpeg_path.as_deref(),
                _ => config.ffprobe_path.as_deref(),
            };
            match Self::resolve(tool, override_path) {
                Ok(path) => report.push_str(&format!("  [OK] {} -> {}\n", tool, path.display())),
                Err(e) => {
                    all_found = false;
                    report.push_str(&format!("  [MISSING] {}\n", e));
                }
            }
        }

        report.push_str(&format!("System: {}\n", Self::system_info()));
        (report, all_found)
    }

    /// Get system information for debugging
    pub fn system_info() -> SystemInfo {
        SystemInfo {
            os: env::consts::OS,
            arch: env::consts::ARCH,
            family: env::consts::FAMILY,
        }
    }
}

/// Resolved locations of the external tools for one batch
#[derive(Debug, Clone)]
pub struct ToolPaths {
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
}

impl ToolPaths {
    /// Resolve both tools; a missing one is fatal for the batch
    pub fn resolve(config: &Config) -> Result<Self, CompressError> {
        Ok(Self {
            ffmpeg: PlatformCommands::resolve("ffmpeg", config.ffmpeg_path.as_deref())?,
            ffprobe: PlatformCommands::resolve("ffprobe", config.ffprobe_path.as_deref())?,
        })
    }
}

/// System information structure
#[derive(Debug, Clone)]
pub struct SystemInfo {
    pub os: &'static str,
    pub arch: &'static str,
    pub family: &'static str,
}

impl std::fmt::Display for SystemInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} ({})", self.os, self.arch, self.family)
    }
}
