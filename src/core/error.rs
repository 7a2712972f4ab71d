use thiserror::Error;
use std::io;
use std::path::PathBuf;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Output error on {target}: {source}")]
    Output {
        target: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed to create report file {}: {source}", .path.display())]
    CreateFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Encoding error: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Transcript error at line {line}: {message}")]
    Transcript {
        line: usize,
        message: String,
    },

    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
}

impl ReportError {
    /// Wraps an I/O failure against a named output target.
    pub fn output(target: impl Into<String>, source: io::Error) -> Self {
        ReportError::Output { target: target.into(), source }
    }
}

pub type Result<T> = std::result::Result<T, ReportError>;
