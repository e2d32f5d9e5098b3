//! # Configuration Management Module
//!
//! Questo modulo gestisce tutta la configurazione dell'applicazione.
//!
//! ## Responsabilità:
//! - Definisce la struct `Config` con tutti i parametri di compressione
//! - Fornisce validazione robusta dei parametri di input
//! - Supporta caricamento/salvataggio configurazione da/verso file JSON
//! - Fornisce valori di default sensati per tutti i parametri
//!
//! ## Parametri di configurazione:
//! - `max_width` / `max_height`: Risoluzione massima di output (default: 1920x1080)
//! - `workers`: Numero di encoder paralleli, `auto` = numero di core (default: auto)
//! - `video_crf`: CRF x265 (0-51, default: 28, più basso = migliore qualità)
//! - `preset`: Preset x265 (default: "medium")
//! - `audio_bitrate`: Bitrate audio AAC (default: "128k")
//! - `frame_rate`: Frame rate forzato in output (default: None = quello sorgente)
//! - `encode_timeout_secs`: Tempo massimo per un singolo encode (default: 3600)
//! - `probe_timeout_secs`: Tempo massimo per ffprobe (default: 60)
//! - `diagnostic_limit`: Byte massimi di diagnostica conservati per errore (default: 4000)
//! - `output_path`: Directory di output (default: None = `<sorgente>_compressed`)
//!
//! ## Esempio:
//! ```rust,ignore
//! let config = Config {
//!     max_width: 1280,
//!     max_height: 720,
//!     workers: Concurrency::Fixed(4),
//!     ..Default::default()
//! };
//! config.validate()?;
//! ```

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// x265 presets accepted by ffmpeg
const X265_PRESETS: &[&str] = &[
    "ultrafast", "superfast", "veryfast", "faster", "fast",
    "medium", "slow", "slower", "veryslow", "placebo",
];

/// How many encoders may run at the same time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Concurrency {
    /// One worker per available processor core
    Auto,
    Fixed(usize),
}

impl Concurrency {
    /// Resolve to a concrete worker count (never zero)
    pub fn resolve(&self) -> usize {
        match self {
            Self::Auto => std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            Self::Fixed(n) => (*n).max(1),
        }
    }
}

impl Default for Concurrency {
    fn default() -> Self {
        Self::Auto
    }
}

impl FromStr for Concurrency {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("auto") {
            return Ok(Self::Auto);
        }
        match s.parse::<usize>() {
            Ok(0) => Err("process count must be a positive integer or 'auto'".to_string()),
            Ok(n) => Ok(Self::Fixed(n)),
            Err(_) => Err(format!("invalid process count '{}': expected a positive integer or 'auto'", s)),
        }
    }
}

impl fmt::Display for Concurrency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::Fixed(n) => write!(f, "{}", n),
        }
    }
}

impl TryFrom<String> for Concurrency {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Concurrency> for String {
    fn from(value: Concurrency) -> Self {
        value.to_string()
    }
}

/// Configuration for a compression batch
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Maximum output width in pixels
    pub max_width: u32,
    /// Maximum output height in pixels
    pub max_height: u32,
    /// Number of parallel encoders
    pub workers: Concurrency,
    /// x265 CRF value (0-51, lower = better quality)
    pub video_crf: u8,
    /// x265 preset
    pub preset: String,
    /// AAC audio bitrate
    pub audio_bitrate: String,
    /// Force an output frame rate
    pub frame_rate: Option<u32>,
    /// Ceiling for one encoder run, in seconds
    pub encode_timeout_secs: u64,
    /// Ceiling for one probe run, in seconds
    pub probe_timeout_secs: u64,
    /// Maximum bytes of encoder output kept as failure diagnostic
    pub diagnostic_limit: usize,
    /// Output root (None = `<source>_compressed` next to the source)
    pub output_path: Option<PathBuf>,
    /// Output progress and status as JSON lines on stdout
    pub json_output: bool,
    /// Include full failure diagnostics in the final summary
    pub debug: bool,
    /// Explicit ffmpeg binary (None = resolve from PATH)
    pub ffmpeg_path: Option<PathBuf>,
    /// Explicit ffprobe binary (None = resolve from PATH)
    pub ffprobe_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_width: 1920,
            max_height: 1080,
            workers: Concurrency::Auto,
            video_crf: 28,
            preset: "medium".to_string(),
            audio_bitrate: "128k".to_string(),
            frame_rate: None,
            encode_timeout_secs: 3600,
            probe_timeout_secs: 60,
            diagnostic_limit: 4000,
            output_path: None,
            json_output: false,
            debug: false,
            ffmpeg_path: None,
            ffprobe_path: None,
        }
    }
}

impl Config {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        if self.max_width < 2 || self.max_height < 2 {
            return Err(anyhow::anyhow!("Maximum width and height must be at least 2 pixels"));
        }

        if self.video_crf > 51 {
            return Err(anyhow::anyhow!("Video CRF must be between 0 and 51"));
        }

        if !X265_PRESETS.contains(&self.preset.as_str()) {
            return Err(anyhow::anyhow!(
                "Unknown x265 preset '{}' (expected one of: {})",
                self.preset,
                X265_PRESETS.join(", ")
            ));
        }

        if let Concurrency::Fixed(0) = self.workers {
            return Err(anyhow::anyhow!("Number of processes must be greater than 0"));
        }

        if self.frame_rate == Some(0) {
            return Err(anyhow::anyhow!("Frame rate must be greater than 0"));
        }

        if self.encode_timeout_secs == 0 || self.probe_timeout_secs == 0 {
            return Err(anyhow::anyhow!("Timeouts must be greater than 0 seconds"));
        }

        if self.diagnostic_limit == 0 {
            return Err(anyhow::anyhow!("Diagnostic limit must be greater than 0"));
        }

        Ok(())
    }

    pub fn encode_timeout(&self) -> Duration {
        Duration::from_secs(self.encode_timeout_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    /// Default location of the configuration file
    pub fn default_location() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("video-compressor").join("config.json"))
    }

    /// Load configuration from file
    pub async fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path).await?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Invalid config file {}: {}", path.display(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }
}
