pub mod bio;
pub mod cli;
pub mod core;
pub mod io;
pub mod repos;
pub mod utils;

pub use crate::core::gisaid_batch::{GisaidBatch, Submission};

use thiserror::Error;

/// Crate version, reported by `--version`
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Error, Debug)]
pub enum SteamboatError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    AlreadyExists(String),

    #[error("Command failed with exit code {code}: {command}\n{stderr}")]
    CommandFailed {
        command: String,
        code: i32,
        stderr: String,
    },

    #[error("Unsupported platform: {0}")]
    Unsupported(String),

    #[error("{0}")]
    Other(String),
}

impl From<csv::Error> for SteamboatError {
    fn from(err: csv::Error) -> Self {
        if err.is_io_error() {
            match err.into_kind() {
                csv::ErrorKind::Io(io) => SteamboatError::Io(io),
                other => SteamboatError::Parse(format!("{:?}", other)),
            }
        } else {
            SteamboatError::Parse(err.to_string())
        }
    }
}

impl From<serde_yaml::Error> for SteamboatError {
    fn from(err: serde_yaml::Error) -> Self {
        SteamboatError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SteamboatError>;
