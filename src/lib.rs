//! Download a niconico video at the best available quality and optionally
//! re-encode it to a smaller height with ffmpeg.

pub mod config;
pub mod download;
pub mod error;
pub mod interrupt;
pub mod session;
pub mod timestamp;
pub mod transcode;
pub mod validate;

pub use config::Config;
pub use download::{Downloader, YtDlp};
pub use error::{NicoError, Result};
pub use interrupt::Interrupt;
pub use session::Session;
pub use transcode::{Ffmpeg, Resolution, Transcoder};
