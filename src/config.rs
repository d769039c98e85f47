//! Runtime configuration.
//!
//! There is no settings file; the external tools can be overridden through
//! environment variables and everything else has a fixed default.

use std::env;
use std::path::PathBuf;

pub const YTDLP_ENV: &str = "NICODL_YTDLP";
pub const FFMPEG_ENV: &str = "NICODL_FFMPEG";

#[derive(Debug, Clone)]
pub struct Config {
    /// Download engine executable.
    pub ytdlp: PathBuf,
    /// Transcoder executable.
    pub ffmpeg: PathBuf,
    /// Initial session output directory.
    pub output_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ytdlp: PathBuf::from("yt-dlp"),
            ffmpeg: PathBuf::from("ffmpeg"),
            output_dir: default_output_dir(),
        }
    }
}

impl Config {
    /// Defaults with the tool overrides from the environment applied.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(program) = env::var_os(YTDLP_ENV).filter(|v| !v.is_empty()) {
            config.ytdlp = PathBuf::from(program);
        }
        if let Some(program) = env::var_os(FFMPEG_ENV).filter(|v| !v.is_empty()) {
            config.ffmpeg = PathBuf::from(program);
        }
        config
    }
}

fn current_dir() -> PathBuf {
    env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

/// The user's Downloads folder on Windows, the working directory elsewhere.
pub fn default_output_dir() -> PathBuf {
    if cfg!(windows) {
        directories::UserDirs::new()
            .and_then(|dirs| dirs.download_dir().map(|d| d.to_path_buf()))
            .unwrap_or_else(current_dir)
    } else {
        current_dir()
    }
}
