use thiserror::Error;

/// Errors produced anywhere in the dotmd engine.
///
/// Adapters (CLI, HTTP, JSON-RPC) translate these into their own wire
/// representation but never invent new error semantics of their own.
#[derive(Error, Debug)]
pub enum DotmdError {
    #[error("failed to read {path}: {message}")]
    Read { path: String, message: String },

    #[error("failed to parse {path}: {message}")]
    Parse { path: String, message: String },

    #[error("failed to write to {store}: {message}")]
    IndexWrite { store: String, message: String },

    #[error(
        "index was built with embedding model '{indexed}' but query configured '{configured}'"
    )]
    ModelMismatch { indexed: String, configured: String },

    #[error("no successful index found at {path}")]
    IndexMissing { path: String },

    #[error("operation cancelled after deadline")]
    Cancelled,

    #[error("invalid configuration: {message}")]
    Config { message: String },

    #[error("internal error: {message}")]
    Internal { message: String },
}

impl DotmdError {
    pub fn read(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Read {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn parse(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn index_write(store: impl Into<String>, message: impl Into<String>) -> Self {
        Self::IndexWrite {
            store: store.into(),
            message: message.into(),
        }
    }

    pub fn model_mismatch(indexed: impl Into<String>, configured: impl Into<String>) -> Self {
        Self::ModelMismatch {
            indexed: indexed.into(),
            configured: configured.into(),
        }
    }

    pub fn index_missing(path: impl Into<String>) -> Self {
        Self::IndexMissing { path: path.into() }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// True for error kinds that must abort the whole batch/call immediately
    /// rather than being recorded and skipped (see Propagation policy).
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::ModelMismatch { .. } | Self::Config { .. } | Self::IndexMissing { .. } | Self::Cancelled
        )
    }
}

pub type Result<T> = std::result::Result<T, DotmdError>;

impl From<std::io::Error> for DotmdError {
    fn from(error: std::io::Error) -> Self {
        Self::Read {
            path: String::new(),
            message: error.to_string(),
        }
    }
}

impl From<serde_json::Error> for DotmdError {
    fn from(error: serde_json::Error) -> Self {
        Self::Parse {
            path: String::new(),
            message: error.to_string(),
        }
    }
}
