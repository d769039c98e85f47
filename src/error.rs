use std::process::ExitStatus;
use thiserror::Error;

pub type Result<T, E = NicoError> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum NicoError {
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("{program} exited with {status}")]
    Failed { program: String, status: ExitStatus },

    #[error("download engine did not report a saved file")]
    MissingOutput,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
