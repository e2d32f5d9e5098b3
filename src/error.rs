//! # Error Types Module
//!
//! Questo modulo definisce tutti i tipi di errore custom dell'applicazione.
//!
//! ## Responsabilità:
//! - Definisce `CompressError` enum per categorizzare tutti gli errori possibili
//! - Separa gli errori fatali (bloccano il batch) da quelli per singolo file
//! - Integra con `thiserror` per automatic error conversion
//!
//! ## Categorie di errori:
//! - **Fatali**: `SourceNotFound`, `Mirror`, `MissingDependency`, `Validation`
//! - **Per file**: `Probe`, `Encoder`, `Timeout`, `Cancelled`, `NameCollision`
//! - `Io` / `Json`: dipende dal contesto in cui vengono sollevati
//!
//! ## Esempio:
//! ```rust,ignore
//! if !source.is_dir() {
//!     return Err(CompressError::SourceNotFound(source.to_path_buf()));
//! }
//! ```

use std::path::PathBuf;
use std::time::Duration;

/// Custom error types for batch video compression
#[derive(thiserror::Error, Debug)]
pub enum CompressError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Source directory does not exist or is not readable: {}", .0.display())]
    SourceNotFound(PathBuf),

    #[error("Failed to create output directory {}: {source}", .path.display())]
    Mirror {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Dependency missing: {0}")]
    MissingDependency(String),

    #[error("Probe error: {0}")]
    Probe(String),

    #[error("Encoder error: {0}")]
    Encoder(String),

    #[error("Timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("Cancelled: {0}")]
    Cancelled(String),

    #[error("Unresolvable file name: {0}")]
    NameCollision(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl CompressError {
    /// Whether this error must abort the whole batch rather than a single file
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::SourceNotFound(_)
                | Self::Mirror { .. }
                | Self::MissingDependency(_)
                | Self::Validation(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(CompressError::SourceNotFound(PathBuf::from("/nope")).is_fatal());
        assert!(CompressError::MissingDependency("ffmpeg".into()).is_fatal());
        assert!(CompressError::Mirror {
            path: PathBuf::from("/out"),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        }
        .is_fatal());

        assert!(!CompressError::Probe("bad".into()).is_fatal());
        assert!(!CompressError::Encoder("exit 1".into()).is_fatal());
        assert!(!CompressError::Timeout(Duration::from_secs(5)).is_fatal());
        assert!(!CompressError::NameCollision("a.mp4".into()).is_fatal());
    }

    #[test]
    fn test_timeout_message() {
        let err = CompressError::Timeout(Duration::from_secs(90));
        assert_eq!(err.to_string(), "Timed out after 90s");
    }
}
