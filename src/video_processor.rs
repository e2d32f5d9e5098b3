//! # Video Processing Module
//!
//! Questo modulo gestisce l'interazione con i tool esterni ffprobe e ffmpeg.
//!
//! ## Responsabilità:
//! - Lettura della risoluzione sorgente con ffprobe
//! - Ricodifica H.265 (libx265) con risoluzione target, CRF e preset configurabili
//! - Timeout per ogni processo esterno: allo scadere il processo viene terminato
//! - Stop globale: i processi in corso vengono terminati
//! - Cattura della diagnostica (stderr, altrimenti stdout) troncata
//!
//! ## Pipeline di compressione:
//! - Codec video: libx265, `-vf scale=W:H`
//! - Codec audio: AAC con bitrate configurabile
//! - Metadata copiati dalla sorgente (`-map_metadata 0`)
//! - Tag `hvc1` per MP4/MOV (compatibilità QuickTime)
//! - Il container di output è quello della sorgente
//!
//! ## Esempio:
//! ```rust,ignore
//! let processor = VideoProcessor::new(&config, tools);
//! let source = processor.probe(&path, stop.clone()).await?;
//! processor.encode(&path, &output, target, "mp4", stop).await?;
//! ```

use crate::args;
use crate::config::Config;
use crate::error::CompressError;
use crate::platform::ToolPaths;
use crate::resolution::Resolution;
use crate::shutdown::StopSignal;
use crate::utils::truncate_diagnostic;
use serde::Deserialize;
use std::ffi::OsString;
use std::path::Path;
use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// Containers that get the `hvc1` tag for Apple players
const HVC1_CONTAINERS: &[&str] = &["mp4", "mov"];

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    width: Option<u32>,
    height: Option<u32>,
}

/// Drives ffprobe and ffmpeg for one batch
#[derive(Debug, Clone)]
pub struct VideoProcessor {
    tools: ToolPaths,
    video_crf: u8,
    preset: String,
    audio_bitrate: String,
    frame_rate: Option<u32>,
    encode_timeout: Duration,
    probe_timeout: Duration,
    diagnostic_limit: usize,
}

impl VideoProcessor {
    pub fn new(config: &Config, tools: ToolPaths) -> Self {
        Self {
            tools,
            video_crf: config.video_crf,
            preset: config.preset.clone(),
            audio_bitrate: config.audio_bitrate.clone(),
            frame_rate: config.frame_rate,
            encode_timeout: config.encode_timeout(),
            probe_timeout: config.probe_timeout(),
            diagnostic_limit: config.diagnostic_limit,
        }
    }

    /// Resolve the external tools for `config`; missing tools are fatal
    pub fn check_dependencies(config: &Config) -> Result<ToolPaths, CompressError> {
        ToolPaths::resolve(config)
    }

    /// Reads the pixel dimensions of the first video stream
    pub async fn probe(&self, video_path: &Path, stop: StopSignal) -> Result<Resolution, CompressError> {
        let mut cmd = Command::new(&self.tools.ffprobe);
        cmd.args([
            "-v", "error",
            "-select_streams", "v:0",
            "-show_entries", "stream=width,height",
            "-of", "json",
        ])
        .arg(video_path);

        let output = run_tool(cmd, self.probe_timeout, stop).await?;
        if !output.status.success() {
            return Err(CompressError::Probe(self.diagnostic("ffprobe", &output)));
        }

        parse_probe_output(&output.stdout)
    }

    /// Command line for encoding `input` into `output` at `target`
    pub fn encode_args(&self, input: &Path, output: &Path, target: Resolution, extension: &str) -> Vec<OsString> {
        let mut cmd_args: Vec<OsString> = vec!["-nostdin".into(), "-y".into(), "-i".into(), input.into()];

        let mut encoder = args![
            "-map_metadata", "0",
            "-c:v", "libx265",
            "-preset", self.preset,
            "-crf", self.video_crf,
            "-x265-params", "log-level=error",
            "-vf", format!("scale={}:{}", target.width, target.height),
        ];
        if let Some(fps) = self.frame_rate {
            encoder.extend(args!["-r", fps]);
        }
        if HVC1_CONTAINERS.contains(&extension.to_lowercase().as_str()) {
            encoder.extend(args!["-tag:v", "hvc1"]);
        }
        encoder.extend(args![
            "-c:a", "aac",
            "-b:a", self.audio_bitrate,
            "-loglevel", "error",
        ]);

        cmd_args.extend(encoder.into_iter().map(OsString::from));
        cmd_args.push(output.into());
        cmd_args
    }

    /// Encodes `input` to `output`. The output's parent directory must exist.
    ///
    /// On error the output may be partially written; the caller removes it.
    pub async fn encode(
        &self,
        input: &Path,
        output: &Path,
        target: Resolution,
        extension: &str,
        stop: StopSignal,
    ) -> Result<(), CompressError> {
        let mut cmd = Command::new(&self.tools.ffmpeg);
        cmd.args(self.encode_args(input, output, target, extension));
        debug!(command = ?cmd.as_std(), "Launching encoder");

        let result = run_tool(cmd, self.encode_timeout, stop).await?;
        if !result.status.success() {
            return Err(CompressError::Encoder(self.diagnostic("ffmpeg", &result)));
        }

        if !tokio::fs::try_exists(output).await.unwrap_or(false) {
            return Err(CompressError::Encoder(format!(
                "ffmpeg exited successfully but did not write {}",
                output.display()
            )));
        }

        Ok(())
    }

    /// Bounded diagnostic text for a failed tool run
    fn diagnostic(&self, tool: &str, output: &Output) -> String {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let text = if stderr.trim().is_empty() {
            String::from_utf8_lossy(&output.stdout)
        } else {
            stderr
        };

        if text.trim().is_empty() {
            format!("{} exited with {}", tool, output.status)
        } else {
            format!(
                "{} exited with {}: {}",
                tool,
                output.status,
                truncate_diagnostic(&text, self.diagnostic_limit)
            )
        }
    }
}

/// Runs an external tool to completion, killing it on timeout or stop.
async fn run_tool(mut command: Command, limit: Duration, mut stop: StopSignal) -> Result<Output, CompressError> {
    if stop.is_stopped() {
        return Err(CompressError::Cancelled("batch stopped before launch".to_string()));
    }

    let program = command.as_std().get_program().to_string_lossy().into_owned();
    let child = command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| {
            CompressError::Io(std::io::Error::new(e.kind(), format!("failed to launch {}: {}", program, e)))
        })?;

    // dropping the pending wait drops the child, which kills it
    tokio::select! {
        result = tokio::time::timeout(limit, child.wait_with_output()) => match result {
            Ok(output) => Ok(output?),
            Err(_) => {
                debug!("Killed {} after {:?}", program, limit);
                Err(CompressError::Timeout(limit))
            }
        },
        _ = stop.stopped() => {
            debug!("Killed {} on stop request", program);
            Err(CompressError::Cancelled("batch stopped while running".to_string()))
        }
    }
}

fn parse_probe_output(stdout: &[u8]) -> Result<Resolution, CompressError> {
    let probe: ProbeOutput = serde_json::from_slice(stdout)
        .map_err(|e| CompressError::Probe(format!("unreadable ffprobe output: {}", e)))?;

    let stream = probe
        .streams
        .first()
        .ok_or_else(|| CompressError::Probe("no video stream found".to_string()))?;

    match (stream.width, stream.height) {
        (Some(width), Some(height)) if width > 0 && height > 0 => Ok(Resolution::new(width, height)),
        _ => Err(CompressError::Probe("video stream has no dimensions".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shutdown::stop_channel;
    use crate::test_fixtures::FakeTools;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn processor(config: &Config) -> VideoProcessor {
        VideoProcessor::new(config, FakeTools::paths())
    }

    fn lossy(args: &[OsString]) -> Vec<String> {
        args.iter().map(|a| a.to_string_lossy().into_owned()).collect()
    }

    #[test]
    fn test_parse_probe_output() {
        let json = br#"{"streams":[{"width":1920,"height":1080}]}"#;
        assert_eq!(parse_probe_output(json).unwrap(), Resolution::new(1920, 1080));

        assert!(matches!(parse_probe_output(b"{\"streams\":[]}"), Err(CompressError::Probe(_))));
        assert!(matches!(parse_probe_output(b"{}"), Err(CompressError::Probe(_))));
        assert!(matches!(parse_probe_output(b"not json"), Err(CompressError::Probe(_))));
        assert!(matches!(
            parse_probe_output(br#"{"streams":[{"width":0,"height":1080}]}"#),
            Err(CompressError::Probe(_))
        ));
    }

    #[test]
    fn test_encode_args() {
        let config = Config {
            video_crf: 30,
            preset: "slow".to_string(),
            frame_rate: Some(30),
            ..Default::default()
        };
        let args = lossy(&processor(&config).encode_args(
            Path::new("/in/my clip.mp4"),
            Path::new("/out/my_clip.mp4"),
            Resolution::new(1280, 720),
            "mp4",
        ));

        assert_eq!(&args[..4], ["-nostdin", "-y", "-i", "/in/my clip.mp4"]);
        assert_eq!(args.last().unwrap(), "/out/my_clip.mp4");
        let joined = args.join(" ");
        assert!(joined.contains("-c:v libx265"));
        assert!(joined.contains("-crf 30"));
        assert!(joined.contains("-preset slow"));
        assert!(joined.contains("-vf scale=1280:720"));
        assert!(joined.contains("-r 30"));
        assert!(joined.contains("-tag:v hvc1"));
    }

    #[test]
    fn test_mkv_has_no_hvc1_tag() {
        let args = lossy(&processor(&Config::default()).encode_args(
            Path::new("/in/a.mkv"),
            Path::new("/out/a.mkv"),
            Resolution::new(640, 480),
            "mkv",
        ));
        assert!(!args.iter().any(|a| a == "hvc1"));
        assert!(!args.iter().any(|a| a == "-r"));
    }

    #[test]
    fn test_diagnostic_is_bounded() {
        let config = Config {
            diagnostic_limit: 16,
            ..Default::default()
        };
        let processor = processor(&config);
        let output = Output {
            status: exit_status(1),
            stdout: Vec::new(),
            stderr: format!("{}\nInvalid data found", "noise ".repeat(100)).into_bytes(),
        };
        let diagnostic = processor.diagnostic("ffmpeg", &output);
        assert!(diagnostic.starts_with("ffmpeg exited with"));
        assert!(diagnostic.ends_with("data found"));
        assert!(!diagnostic.contains("noise noise"));
        assert!(diagnostic.len() < 80);
    }

    #[cfg(unix)]
    fn exit_status(code: i32) -> std::process::ExitStatus {
        use std::os::unix::process::ExitStatusExt;
        std::process::ExitStatus::from_raw(code << 8)
    }

    #[cfg(windows)]
    fn exit_status(code: u32) -> std::process::ExitStatus {
        use std::os::windows::process::ExitStatusExt;
        std::process::ExitStatus::from_raw(code)
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_probe_with_fake_ffprobe() {
        let temp = TempDir::new().unwrap();
        let video = FakeTools::video(temp.path(), "a/clip.mp4", 1920, 1080, None);
        let corrupt = temp.path().join("corrupt.mkv");
        std::fs::write(&corrupt, b"garbage").unwrap();

        let (_handle, stop) = stop_channel();
        let processor = processor(&Config::default());

        assert_eq!(processor.probe(&video, stop.clone()).await.unwrap(), Resolution::new(1920, 1080));
        assert!(matches!(processor.probe(&corrupt, stop).await, Err(CompressError::Probe(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_encode_failure_reports_diagnostic() {
        let temp = TempDir::new().unwrap();
        let video = FakeTools::video(temp.path(), "bad.mp4", 640, 480, Some("FAIL"));
        let output = temp.path().join("out.mp4");

        let (_handle, stop) = stop_channel();
        let err = processor(&Config::default())
            .encode(&video, &output, Resolution::new(640, 480), "mp4", stop)
            .await
            .unwrap_err();

        match err {
            CompressError::Encoder(diagnostic) => assert!(diagnostic.contains("simulated encoder failure")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_encode_timeout_kills_encoder() {
        let temp = TempDir::new().unwrap();
        let video = FakeTools::video(temp.path(), "slow.mp4", 640, 480, Some("HANG"));
        let output: PathBuf = temp.path().join("out.mp4");
        let config = Config {
            encode_timeout_secs: 1,
            ..Default::default()
        };

        let (_handle, stop) = stop_channel();
        let started = std::time::Instant::now();
        let err = processor(&config)
            .encode(&video, &output, Resolution::new(640, 480), "mp4", stop)
            .await
            .unwrap_err();

        assert!(matches!(err, CompressError::Timeout(_)));
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_stop_kills_running_encoder() {
        let temp = TempDir::new().unwrap();
        let video = FakeTools::video(temp.path(), "slow.mp4", 640, 480, Some("HANG"));
        let output = temp.path().join("out.mp4");

        let (handle, stop) = stop_channel();
        let processor = processor(&Config::default());
        let encode = tokio::spawn(async move {
            processor
                .encode(&video, &output, Resolution::new(640, 480), "mp4", stop)
                .await
        });

        tokio::time::sleep(Duration::from_millis(200)).await;
        handle.stop();

        let result = tokio::time::timeout(Duration::from_secs(5), encode)
            .await
            .expect("encode should stop promptly")
            .unwrap();
        assert!(matches!(result, Err(CompressError::Cancelled(_))));
    }
}
