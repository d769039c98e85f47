use crate::error::{NicoError, Result};
use async_trait::async_trait;
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

/// Container of every re-encoded file.
pub const CONTAINER: &str = "mp4";

/// Target height offered by the resolution menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    P1080,
    P720,
    P480,
}

impl Resolution {
    /// Map a resolution menu entry (`1`, `2`, `3`).
    pub fn from_choice(choice: &str) -> Option<Self> {
        match choice {
            "1" => Some(Resolution::P1080),
            "2" => Some(Resolution::P720),
            "3" => Some(Resolution::P480),
            _ => None,
        }
    }

    pub fn height(self) -> u32 {
        match self {
            Resolution::P1080 => 1080,
            Resolution::P720 => 720,
            Resolution::P480 => 480,
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}p", self.height())
    }
}

/// `<stem>_<height>.mp4` next to the input.
pub fn output_path(input: &Path, resolution: Resolution) -> PathBuf {
    let mut name = input
        .file_stem()
        .map(|stem| stem.to_os_string())
        .unwrap_or_else(|| OsString::from("output"));
    name.push(format!("_{}.{}", resolution.height(), CONTAINER));
    input.with_file_name(name)
}

/// Re-encodes a downloaded file to a target height.
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Returns the path of the new file.
    async fn transcode(&self, input: &Path, resolution: Resolution) -> Result<PathBuf>;
}

/// The `ffmpeg` executable.
#[derive(Debug, Clone)]
pub struct Ffmpeg {
    program: PathBuf,
}

impl Ffmpeg {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Ffmpeg {
            program: program.into(),
        }
    }

    /// Scale to the target height with an even, aspect-preserving width and
    /// copy the audio stream untouched. `-n` turns an existing output into a
    /// failure rather than a prompt on stdin.
    pub fn args(input: &Path, output: &Path, resolution: Resolution) -> Vec<OsString> {
        vec![
            "-nostdin".into(),
            "-n".into(),
            "-i".into(),
            input.as_os_str().to_os_string(),
            "-vf".into(),
            format!("scale=-2:{}", resolution.height()).into(),
            "-c:a".into(),
            "copy".into(),
            output.as_os_str().to_os_string(),
        ]
    }
}

#[async_trait]
impl Transcoder for Ffmpeg {
    async fn transcode(&self, input: &Path, resolution: Resolution) -> Result<PathBuf> {
        let output = output_path(input, resolution);
        let program = self.program.display().to_string();
        tracing::debug!("{} {} -> {}", program, input.display(), output.display());
        let status = Command::new(&self.program)
            .args(Self::args(input, &output, resolution))
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .status()
            .await
            .map_err(|source| NicoError::Spawn {
                program: program.clone(),
                source,
            })?;
        if !status.success() {
            return Err(NicoError::Failed { program, status });
        }
        Ok(output)
    }
}
