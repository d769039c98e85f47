use crate::error::{NicoError, Result};
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

/// Best separate video and audio, merged; otherwise the best single stream.
pub const FORMAT: &str = "bestvideo+bestaudio/best";
/// File name inside the output directory, filled in by the engine.
pub const OUTPUT_TEMPLATE: &str = "%(title)s.%(ext)s";

/// Resolves a watch URL and saves the media into a directory.
#[async_trait]
pub trait Downloader: Send + Sync {
    /// Returns the path of the saved file.
    async fn download(&self, url: &str, output_dir: &Path) -> Result<PathBuf>;
}

/// The `yt-dlp` executable.
#[derive(Debug, Clone)]
pub struct YtDlp {
    program: PathBuf,
}

impl YtDlp {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        YtDlp {
            program: program.into(),
        }
    }

    /// Command line for one download. Output is forced to UTF-8 so the printed
    /// path survives titles the console code page cannot encode.
    pub fn args(url: &str, output_dir: &Path) -> Vec<OsString> {
        vec![
            "--encoding".into(),
            "utf-8".into(),
            "-f".into(),
            FORMAT.into(),
            "-o".into(),
            output_dir.join(OUTPUT_TEMPLATE).into_os_string(),
            "--print".into(),
            "after_move:filepath".into(),
            "--progress".into(),
            "--no-simulate".into(),
            url.into(),
        ]
    }

    /// The final path is the last line printed by `--print after_move:filepath`.
    fn saved_path(stdout: &[u8]) -> Option<PathBuf> {
        String::from_utf8_lossy(stdout)
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .last()
            .map(PathBuf::from)
    }
}

#[async_trait]
impl Downloader for YtDlp {
    async fn download(&self, url: &str, output_dir: &Path) -> Result<PathBuf> {
        let program = self.program.display().to_string();
        tracing::debug!("{} downloading {} into {}", program, url, output_dir.display());
        let output = Command::new(&self.program)
            .args(Self::args(url, output_dir))
            .env("PYTHONIOENCODING", "utf-8")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| NicoError::Spawn {
                program: program.clone(),
                source,
            })?;
        if !output.status.success() {
            return Err(NicoError::Failed {
                program,
                status: output.status,
            });
        }
        Self::saved_path(&output.stdout).ok_or(NicoError::MissingOutput)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_request_best_quality_into_directory() {
        let dir = Path::new("downloads");
        let args = YtDlp::args("https://www.nicovideo.jp/watch/sm9", dir);
        let f = args.iter().position(|a| a == "-f").unwrap();
        assert_eq!(args[f + 1], FORMAT);
        let o = args.iter().position(|a| a == "-o").unwrap();
        assert_eq!(PathBuf::from(&args[o + 1]), dir.join("%(title)s.%(ext)s"));
        assert_eq!(args.last().unwrap(), "https://www.nicovideo.jp/watch/sm9");
    }

    #[test]
    fn args_force_utf8_output() {
        let args = YtDlp::args("https://www.nicovideo.jp/watch/sm9", Path::new("."));
        let enc = args.iter().position(|a| a == "--encoding").unwrap();
        assert_eq!(args[enc + 1], "utf-8");
        let print = args.iter().position(|a| a == "--print").unwrap();
        assert!(enc < print);
    }

    #[test]
    fn saved_path_keeps_japanese_title() {
        let stdout = "/dl/テスト動画.mp4\n".as_bytes();
        assert_eq!(
            YtDlp::saved_path(stdout),
            Some(PathBuf::from("/dl/テスト動画.mp4"))
        );
    }

    #[test]
    fn saved_path_takes_last_line() {
        let stdout = b"\n/tmp/first.mp4\n/tmp/Title.mp4\n\n";
        assert_eq!(
            YtDlp::saved_path(stdout),
            Some(PathBuf::from("/tmp/Title.mp4"))
        );
        assert_eq!(YtDlp::saved_path(b"  \n"), None);
    }

    #[tokio::test]
    async fn missing_program_is_spawn_error() {
        let engine = YtDlp::new("nicodl-no-such-engine");
        let err = engine
            .download("https://www.nicovideo.jp/watch/sm9", Path::new("."))
            .await
            .unwrap_err();
        assert!(matches!(err, NicoError::Spawn { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn non_zero_exit_is_failure() {
        let engine = YtDlp::new("false");
        let err = engine
            .download("https://www.nicovideo.jp/watch/sm9", Path::new("."))
            .await
            .unwrap_err();
        match err {
            NicoError::Failed { program, status } => {
                assert_eq!(program, "false");
                assert!(!status.success());
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn silent_success_is_missing_output() {
        let engine = YtDlp::new("true");
        let err = engine
            .download("https://www.nicovideo.jp/watch/sm9", Path::new("."))
            .await
            .unwrap_err();
        assert!(matches!(err, NicoError::MissingOutput));
    }
}
