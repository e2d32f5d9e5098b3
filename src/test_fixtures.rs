//! Fake ffmpeg / ffprobe scripts for end-to-end tests.
//!
//! Fixture "videos" are JSON files holding what ffprobe would report, plus an
//! optional marker:
//! - `FAIL`: the encoder writes a partial file and exits 1
//! - `HANG`: the encoder sleeps for 30s
//! - `PROBEFAIL`: ffprobe exits 1
//!
//! On success the fake encoder writes its own argument list into the output
//! file so tests can check the requested scale.

use crate::config::{Concurrency, Config};
use crate::platform::ToolPaths;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

const FAKE_FFPROBE: &str = r#"#!/bin/sh
for arg in "$@"; do last="$arg"; done
if grep -q PROBEFAIL "$last" 2>/dev/null; then
  echo "fixture: moov atom not found" >&2
  exit 1
fi
cat "$last"
"#;

const FAKE_FFMPEG: &str = r#"#!/bin/sh
input=""
prev=""
for arg in "$@"; do
  if [ "$prev" = "-i" ]; then input="$arg"; fi
  prev="$arg"
done
output="$prev"
if grep -q HANG "$input"; then exec sleep 30; fi
if grep -q FAIL "$input"; then
  echo "partial frames" > "$output"
  echo "fixture: simulated encoder failure for $input" >&2
  exit 1
fi
echo "$@" > "$output"
"#;

pub(crate) struct FakeTools;

impl FakeTools {
    /// Paths of the fake tools (written once per test process)
    pub fn paths() -> ToolPaths {
        let dir = fixture_dir();
        ToolPaths {
            ffmpeg: dir.join("ffmpeg"),
            ffprobe: dir.join("ffprobe"),
        }
    }

    /// Config wired to the fake tools
    pub fn config(output: &Path, workers: usize) -> Config {
        let tools = Self::paths();
        Config {
            output_path: Some(output.to_path_buf()),
            workers: Concurrency::Fixed(workers),
            ffmpeg_path: Some(tools.ffmpeg),
            ffprobe_path: Some(tools.ffprobe),
            encode_timeout_secs: 5,
            probe_timeout_secs: 5,
            ..Default::default()
        }
    }

    /// Writes a fixture video at `root/relative` and returns its path
    pub fn video(root: &Path, relative: &str, width: u32, height: u32, marker: Option<&str>) -> PathBuf {
        let path = root.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        let content = match marker {
            Some(marker) => format!(
                r#"{{"streams":[{{"width":{},"height":{}}}],"fixture":"{}"}}"#,
                width, height, marker
            ),
            None => format!(r#"{{"streams":[{{"width":{},"height":{}}}]}}"#, width, height),
        };
        std::fs::write(&path, content).unwrap();
        path
    }
}

fn fixture_dir() -> &'static Path {
    static DIR: OnceLock<PathBuf> = OnceLock::new();
    DIR.get_or_init(|| {
        let dir = std::env::temp_dir().join(format!("video-compressor-fixtures-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        write_script(&dir.join("ffprobe"), FAKE_FFPROBE);
        write_script(&dir.join("ffmpeg"), FAKE_FFMPEG);
        dir
    })
}

fn write_script(path: &Path, body: &str) {
    // only complete, executable scripts appear at `path`
    let staging = path.with_extension("tmp");
    std::fs::write(&staging, body).unwrap();
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&staging, std::fs::Permissions::from_mode(0o755)).unwrap();
    }
    std::fs::rename(&staging, path).unwrap();
}
