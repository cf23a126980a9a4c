use std::path::PathBuf;

use thiserror::Error;

/// Reasons a request is refused before any output is written.
#[derive(Error, Debug)]
pub enum RequestError {
    #[error("Input file not found: {}", .0.display())]
    InputNotFound(PathBuf),

    #[error("Target size must be a positive number of megabytes, got {0}")]
    InvalidTarget(f64),

    #[error("Output {} would overwrite the input", .0.display())]
    OutputIsInput(PathBuf),
}
