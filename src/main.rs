//! # Video Compressor - Main Entry Point
//!
//! Punto di ingresso dell'applicazione.
//!
//! ## Responsabilità:
//! - Parsing degli argomenti della command line con `clap`
//! - Caricamento della configurazione (file + override da CLI)
//! - Inizializzazione del sistema di logging con `tracing`, dopo la config
//! - Avvio del batch e traduzione dell'esito in exit code
//!
//! ## Exit code:
//! - `0`: tutti i file compressi
//! - `1`: batch completato con almeno un file fallito
//! - `2`: errore fatale o batch interrotto
//!
//! ## Esempio di utilizzo:
//! ```bash
//! video-compressor run /path/to/videos --maxwidth 1280 --maxheight 720 --processes 4 --debug
//! ```

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, error, warn};

use space_video_compressor::json_output::JsonMessage;
use space_video_compressor::logging;
use space_video_compressor::platform::PlatformCommands;
use space_video_compressor::progress::ProgressManager;
use space_video_compressor::{BatchCoordinator, BatchOutcome, Concurrency, Config};

const FATAL_EXIT_CODE: u8 = 2;

#[derive(Parser)]
#[command(name = "video-compressor", version)]
#[command(about = "Compress a directory tree of videos to H.265, mirroring its structure")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compress every video found under SOURCE_DIR
    Run(RunArgs),

    /// Check that ffmpeg and ffprobe can be found
    CheckTools {
        /// Configuration file with tool path overrides
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[derive(Args)]
struct RunArgs {
    /// Directory containing the videos to compress
    source_dir: PathBuf,

    /// Output directory (default: <SOURCE_DIR>_compressed)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Verbose logging and full failure diagnostics
    #[arg(long)]
    debug: bool,

    /// Maximum output width
    #[arg(long)]
    maxwidth: Option<u32>,

    /// Maximum output height
    #[arg(long)]
    maxheight: Option<u32>,

    /// Parallel encoders, or "auto" for one per core
    #[arg(long, value_name = "N|auto")]
    processes: Option<Concurrency>,

    /// x265 CRF (0-51, lower = better quality)
    #[arg(long)]
    crf: Option<u8>,

    /// x265 preset
    #[arg(long)]
    preset: Option<String>,

    /// Force the output frame rate
    #[arg(long)]
    frame_rate: Option<u32>,

    /// Per-file encode timeout in seconds
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Configuration file (default: <config dir>/video-compressor/config.json)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Also append logs to this file
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Output progress as JSON lines on stdout
    #[arg(long)]
    json: bool,

    /// Don't draw a progress bar
    #[arg(long)]
    no_progress: bool,
}

impl RunArgs {
    /// CLI flags win over file values
    fn apply(&self, mut config: Config) -> Config {
        if let Some(ref output) = self.output {
            config.output_path = Some(output.clone());
        }
        if let Some(width) = self.maxwidth {
            config.max_width = width;
        }
        if let Some(height) = self.maxheight {
            config.max_height = height;
        }
        if let Some(processes) = self.processes {
            config.workers = processes;
        }
        if let Some(crf) = self.crf {
            config.video_crf = crf;
        }
        if let Some(ref preset) = self.preset {
            config.preset = preset.clone();
        }
        if self.frame_rate.is_some() {
            config.frame_rate = self.frame_rate;
        }
        if let Some(timeout) = self.timeout {
            config.encode_timeout_secs = timeout;
        }
        config.debug |= self.debug;
        config.json_output |= self.json;
        config
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Command::Run(args) => run(args).await,
        Command::CheckTools { config } => check_tools(config.as_deref()).await,
    }
}

async fn run(args: RunArgs) -> ExitCode {
    // logging waits for the merged config: `debug` may come from the file
    let config = match load_config(args.config.as_deref()).await {
        Ok(config) => args.apply(config),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            if args.json {
                JsonMessage::error(format!("{:#}", e)).emit();
            }
            return ExitCode::from(FATAL_EXIT_CODE);
        }
    };

    if let Err(e) = logging::init(config.debug, args.log_file.as_deref()) {
        eprintln!("Error: {:#}", e);
        return ExitCode::from(FATAL_EXIT_CODE);
    }

    let json_output = config.json_output;
    match compress(&args, config).await {
        Ok(outcome) => ExitCode::from(outcome.exit_code()),
        Err(e) => {
            error!("{:#}", e);
            if json_output {
                JsonMessage::error(format!("{:#}", e)).emit();
            }
            ExitCode::from(FATAL_EXIT_CODE)
        }
    }
}

async fn compress(args: &RunArgs, config: Config) -> Result<BatchOutcome> {
    let show_progress = ProgressManager::should_display(!args.no_progress, config.json_output);

    let mut coordinator = BatchCoordinator::new(&args.source_dir, config)?.with_progress(show_progress);

    let stop = coordinator.stop_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping batch");
            stop.stop();
        }
    });

    let report = coordinator.run().await?;
    Ok(report.outcome())
}

async fn check_tools(config_path: Option<&Path>) -> ExitCode {
    let config = match load_config(config_path).await {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return ExitCode::from(FATAL_EXIT_CODE);
        }
    };

    let (report, all_found) = PlatformCommands::tools_report(&config);
    print!("{}", report);
    if all_found {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(FATAL_EXIT_CODE)
    }
}

/// Explicit path must exist; the default location is optional
async fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => {
            if !path.is_file() {
                anyhow::bail!("Config file not found: {}", path.display());
            }
            Config::from_file(path)
                .await
                .with_context(|| format!("Failed to load config {}", path.display()))
        }
        None => match Config::default_location() {
            Some(default) => {
                debug!("Looking for config at {}", default.display());
                Config::from_file(&default).await
            }
            None => Ok(Config::default()),
        },
    }
}
