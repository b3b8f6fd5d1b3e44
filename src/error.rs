// src/error.rs

//! Error taxonomy shared by the library and the CLI
//!
//! Every fallible operation in ralph returns [`Result`]. The variants are
//! grouped by what the user can do about them: bad input, bad database
//! state, I/O trouble, authentication, cancellation, and internal logic
//! errors. Errors are `Clone` because task results are observed by multiple
//! consumers (see the `task` module), so variants carry owned strings and
//! paths instead of source errors.

use std::path::PathBuf;
use thiserror::Error;

/// Errors produced by ralph operations
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Error {
    // ---- input ----
    #[error("unknown package '{0}'")]
    UnknownPackage(String),

    #[error("no version of '{name}' matches '{requirement}'")]
    NoMatchingVersion { name: String, requirement: String },

    #[error("invalid version '{input}': {reason}")]
    BadVersion { input: String, reason: String },

    #[error("invalid version requirement '{input}': {reason}")]
    BadRequirement { input: String, reason: String },

    #[error("invalid argument: {0}")]
    BadArgument(String),

    // ---- state ----
    #[error("source '{0}' is already registered")]
    SourceAlreadyRegistered(String),

    #[error("unknown source '{0}'")]
    UnknownSource(String),

    #[error("package '{0}' is not installed")]
    NotInstalled(String),

    #[error("database unavailable: {0}")]
    DatabaseUnavailable(String),

    // ---- i/o ----
    #[error("network error: {0}")]
    Network(String),

    #[error("git error: {message} (code {code})")]
    Git { message: String, code: i32 },

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("malformed source data in {}: {message}", path.display())]
    SourceFormat { path: PathBuf, message: String },

    // ---- auth ----
    #[error("authentication required for {0}")]
    AuthRequired(String),

    #[error("authentication failed for {0}")]
    AuthFailed(String),

    // ---- lifecycle ----
    #[error("operation canceled")]
    Canceled,

    // ---- internal ----
    #[error("internal error: {0}")]
    Logic(String),
}

impl Error {
    /// Build a filesystem error that names the offending path
    pub fn filesystem(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        Error::Filesystem(format!("{}: {}", path.into().display(), err))
    }

    /// Process exit code for this error
    ///
    /// User-facing failures exit 1; logic errors exit -1 (255 on Unix).
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Logic(_) => -1,
            _ => 1,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Filesystem(err.to_string())
    }
}

impl From<git2::Error> for Error {
    fn from(err: git2::Error) -> Self {
        if err.code() == git2::ErrorCode::Auth {
            return Error::AuthFailed(err.message().to_string());
        }
        if err.class() == git2::ErrorClass::Net {
            return Error::Network(err.message().to_string());
        }
        Error::Git {
            message: err.message().to_string(),
            code: err.raw_code(),
        }
    }
}

/// Result type for ralph operations
pub type Result<T> = std::result::Result<T, Error>;
