//! Error taxonomy for the ingest pipeline.
//!
//! Only [`ThermologError::SourceUnavailable`] is fatal, and only at startup.
//! Everything else is reported by the ingest loop and then skipped.

use std::io;

use crate::store::LogTier;

/// Errors produced by the sample source, the log store and sample parsing.
#[derive(Debug, thiserror::Error)]
pub enum ThermologError {
    /// The sample source could not be opened.
    #[error("could not open sample source {port}: {source}")]
    SourceUnavailable {
        port: String,
        #[source]
        source: io::Error,
    },

    /// A sample line was not a finite real number.
    #[error("not a temperature sample: {input:?}")]
    Parse { input: String },

    /// An append or prune on a log file could not complete.
    #[error("{tier} log I/O failed: {source}")]
    StorageIo {
        tier: LogTier,
        #[source]
        source: io::Error,
    },
}

impl ThermologError {
    pub(crate) fn storage(tier: LogTier, source: io::Error) -> Self {
        Self::StorageIo { tier, source }
    }
}

/// Result alias used throughout `thermolog-core`.
pub type Result<T> = std::result::Result<T, ThermologError>;
