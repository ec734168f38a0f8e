use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CompressError {
    #[error("required external tool '{0}' was not found in PATH")]
    MissingDependency(&'static str),

    #[error("input file not found: {0:?}")]
    InputNotFound(PathBuf),

    #[error("failed to probe {path:?}: {reason}")]
    Probe { path: PathBuf, reason: String },

    #[error("ffmpeg pass {pass} failed ({status}); last output:\n{log_tail}")]
    Encode {
        pass: u8,
        status: ExitStatus,
        log_tail: String,
    },

    #[error("unknown profile '{0}' (use --list-profiles to see what is configured)")]
    UnknownProfile(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
