//! Interactive menu loop.
//!
//! `Session` owns the only mutable state of a run, the output directory, and
//! drives the download, timestamp and re-encode steps from user input. Every
//! prompt and every external step is raced against the [`Interrupt`] token so
//! Ctrl-C lands back in the main menu.

use crate::download::Downloader;
use crate::error::Result;
use crate::interrupt::Interrupt;
use crate::timestamp;
use crate::transcode::{Resolution, Transcoder};
use crate::validate::is_valid_niconico_url;
use std::future::Future;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};

const CANCELLED: &str = "Operation cancelled. Returning to main menu.";
/// How close to a Ctrl-C an end of input still counts as that interrupt.
const EOF_GRACE: Duration = Duration::from_millis(250);

/// Main menu entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
    Download,
    SetOutputDir,
    Exit,
}

impl MenuChoice {
    pub fn parse(choice: &str) -> Option<Self> {
        match choice {
            "1" => Some(MenuChoice::Download),
            "2" => Some(MenuChoice::SetOutputDir),
            "3" => Some(MenuChoice::Exit),
            _ => None,
        }
    }
}

/// Result of reading one prompt.
enum Input {
    Line(String),
    Interrupted,
    Closed,
}

/// Whether the loop keeps going after an action.
#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Menu,
    Exit,
}

pub struct Session<D, T> {
    output_dir: PathBuf,
    downloader: D,
    transcoder: T,
    interrupt: Interrupt,
}

impl<D: Downloader, T: Transcoder> Session<D, T> {
    pub fn new(output_dir: PathBuf, downloader: D, transcoder: T, interrupt: Interrupt) -> Self {
        Session {
            output_dir,
            downloader,
            transcoder,
            interrupt,
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Run the menu until the user exits or `input` is closed.
    pub async fn run<R, W>(&mut self, input: R, out: &mut W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: Write,
    {
        let mut lines = input.lines();
        loop {
            self.interrupt.clear();
            writeln!(out, "\nPlease choose an option:")?;
            writeln!(out, "1. Download content")?;
            writeln!(out, "2. Set output directory")?;
            writeln!(out, "3. Exit")?;
            let choice = match self.prompt(&mut lines, out, "Enter your choice (1-3): ").await? {
                Input::Line(line) => line,
                Input::Interrupted => {
                    writeln!(out, "\n{}", CANCELLED)?;
                    continue;
                }
                Input::Closed => break,
            };
            if self.cancelled(out)? {
                continue;
            }
            let flow = match MenuChoice::parse(choice.trim()) {
                Some(MenuChoice::Download) => self.download(&mut lines, out).await?,
                Some(MenuChoice::SetOutputDir) => self.set_output_dir(&mut lines, out).await?,
                Some(MenuChoice::Exit) => {
                    writeln!(out, "Thank you for using Niconico Downloader. Goodbye!")?;
                    Flow::Exit
                }
                None => {
                    writeln!(out, "Invalid choice. Please enter 1, 2, or 3.")?;
                    Flow::Menu
                }
            };
            if flow == Flow::Exit {
                break;
            }
        }
        tracing::debug!("session finished");
        Ok(())
    }

    async fn download<R, W>(&mut self, lines: &mut Lines<R>, out: &mut W) -> Result<Flow>
    where
        R: AsyncBufRead + Unpin,
        W: Write,
    {
        let url = match self.prompt(lines, out, "Enter the Niconico video URL: ").await? {
            Input::Line(line) => line.trim().to_string(),
            Input::Interrupted => return self.abandon(out),
            Input::Closed => return Ok(Flow::Exit),
        };
        if !is_valid_niconico_url(&url) {
            writeln!(out, "Invalid Niconico URL. Please provide a valid URL.")?;
            return Ok(Flow::Menu);
        }

        let Some(file) = self.fetch(&url, out).await? else {
            return Ok(Flow::Menu);
        };

        writeln!(out, "\nChoose a resolution to re-encode the video:")?;
        writeln!(out, "1. 1080p")?;
        writeln!(out, "2. 720p")?;
        writeln!(out, "3. 480p")?;
        let choice = match self.prompt(lines, out, "Enter the resolution (1-3): ").await? {
            Input::Line(line) => line,
            Input::Interrupted => return self.abandon(out),
            Input::Closed => return Ok(Flow::Exit),
        };
        match Resolution::from_choice(choice.trim()) {
            Some(resolution) => {
                self.reencode(&file, resolution, out).await?;
            }
            None => writeln!(out, "Invalid resolution choice.")?,
        }
        Ok(Flow::Menu)
    }

    /// Download and stamp the file. `None` means there is nothing to re-encode.
    async fn fetch<W: Write>(&self, url: &str, out: &mut W) -> Result<Option<PathBuf>> {
        if self.cancelled(out)? {
            return Ok(None);
        }
        let result = match self
            .until_interrupted(self.downloader.download(url, &self.output_dir))
            .await
        {
            Some(result) => result,
            None => {
                writeln!(out, "\n{}", CANCELLED)?;
                return Ok(None);
            }
        };
        match result {
            Ok(file) => {
                writeln!(out, "Successfully downloaded best quality video from {}", url)?;
                if let Err(err) = timestamp::touch(&file) {
                    tracing::warn!("could not update timestamps of {}: {}", file.display(), err);
                }
                Ok(Some(file))
            }
            Err(err) => {
                tracing::debug!("download of {} failed: {:?}", url, err);
                writeln!(out, "An error occurred while downloading the content: {}", err)?;
                Ok(None)
            }
        }
    }

    async fn reencode<W: Write>(
        &self,
        file: &Path,
        resolution: Resolution,
        out: &mut W,
    ) -> Result<Option<PathBuf>> {
        if self.cancelled(out)? {
            return Ok(None);
        }
        writeln!(out, "Re-encoding to {}...", resolution)?;
        out.flush()?;
        let result = match self
            .until_interrupted(self.transcoder.transcode(file, resolution))
            .await
        {
            Some(result) => result,
            None => {
                writeln!(out, "\n{}", CANCELLED)?;
                return Ok(None);
            }
        };
        match result {
            Ok(output) => {
                writeln!(out, "Successfully re-encoded the video to {}.", resolution)?;
                Ok(Some(output))
            }
            Err(err) => {
                writeln!(out, "An error occurred during re-encoding: {}", err)?;
                Ok(None)
            }
        }
    }

    async fn set_output_dir<R, W>(&mut self, lines: &mut Lines<R>, out: &mut W) -> Result<Flow>
    where
        R: AsyncBufRead + Unpin,
        W: Write,
    {
        let dir = match self.prompt(lines, out, "Enter the new output directory path: ").await? {
            Input::Line(line) => PathBuf::from(line.trim()),
            Input::Interrupted => return self.abandon(out),
            Input::Closed => return Ok(Flow::Exit),
        };
        if dir.is_dir() {
            writeln!(out, "Output directory set to: {}", dir.display())?;
            tracing::info!("output directory changed to {}", dir.display());
            self.output_dir = dir;
        } else {
            writeln!(out, "Invalid directory path. Please try again.")?;
        }
        Ok(Flow::Menu)
    }

    async fn prompt<R, W>(&self, lines: &mut Lines<R>, out: &mut W, text: &str) -> Result<Input>
    where
        R: AsyncBufRead + Unpin,
        W: Write,
    {
        write!(out, "{}", text)?;
        out.flush()?;
        // `next_line` is cancel safe, a partially read line stays buffered.
        let line = tokio::select! {
            biased;
            _ = self.interrupt.triggered() => return Ok(Input::Interrupted),
            line = lines.next_line() => line?,
        };
        match line {
            Some(line) => Ok(Input::Line(line)),
            None => Ok(self.end_of_input().await),
        }
    }

    /// End of input caused by Ctrl-C counts as an interrupt. The signal may
    /// land just before, or just after, the read returns.
    async fn end_of_input(&self) -> Input {
        if self.interrupt.is_pending() || self.interrupt.take_recent(EOF_GRACE) {
            return Input::Interrupted;
        }
        match tokio::time::timeout(EOF_GRACE, self.interrupt.triggered()).await {
            Ok(()) => {
                // this end of input already accounts for the trigger
                self.interrupt.take_recent(EOF_GRACE);
                Input::Interrupted
            }
            Err(_) => Input::Closed,
        }
    }

    /// Drive `fut` unless the interrupt fires first; dropping it kills any
    /// child process it spawned.
    async fn until_interrupted<F: Future>(&self, fut: F) -> Option<F::Output> {
        tokio::select! {
            biased;
            _ = self.interrupt.triggered() => None,
            output = fut => Some(output),
        }
    }

    /// Checkpoint: report and consume a pending interrupt.
    fn cancelled<W: Write>(&self, out: &mut W) -> Result<bool> {
        if self.interrupt.clear() {
            writeln!(out, "\n{}", CANCELLED)?;
            return Ok(true);
        }
        Ok(false)
    }

    fn abandon<W: Write>(&self, out: &mut W) -> Result<Flow> {
        writeln!(out, "\n{}", CANCELLED)?;
        Ok(Flow::Menu)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn menu_choices() {
        assert_eq!(MenuChoice::parse("1"), Some(MenuChoice::Download));
        assert_eq!(MenuChoice::parse("2"), Some(MenuChoice::SetOutputDir));
        assert_eq!(MenuChoice::parse("3"), Some(MenuChoice::Exit));
        assert_eq!(MenuChoice::parse("4"), None);
        assert_eq!(MenuChoice::parse("download"), None);
    }
}
