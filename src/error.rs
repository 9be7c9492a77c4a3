//! Typed errors for the extraction pipeline.
//!
//! Library code returns [`PipelineError`]; the binary wraps it in `anyhow`.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Level ordering or allow-list invariant violated; aborts the run
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// Network failure or non-success response for one URL
    #[error("failed to fetch {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Fetched markup has no content region
    #[error("content region not found in {url}")]
    Parse { url: String },

    /// Dump source could not be opened or read
    #[error("dump stream {path} unreadable: {message}")]
    Stream { path: PathBuf, message: String },

    /// A mode's title set is empty when extraction begins
    #[error("no titles to extract for mode `{mode}`")]
    EmptyTitleSet { mode: String },

    /// Cancelled by the user during dump processing
    #[error("operation cancelled")]
    Interrupted,

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PipelineError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn stream(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::Stream {
            path: path.into(),
            message: message.to_string(),
        }
    }

    /// Whether the pipeline logs this and moves on to the next URL or mode.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Fetch { .. } | Self::Parse { .. } | Self::EmptyTitleSet { .. }
        )
    }
}
