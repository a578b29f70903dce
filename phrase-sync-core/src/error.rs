//! Error taxonomy for pull/push.
//!
//! [`SyncError`] is fatal: it aborts a whole command before any unit of work is
//! scheduled. [`UnitError`] belongs to a single locale download or file upload
//! and ends up in the report next to its siblings' outcomes.

use std::path::PathBuf;

use serde::Serializer;
use thiserror::Error;

use crate::contract::ServiceError;
use crate::encoding::EncodingError;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Unrecognized format: {0}")]
    UnknownFormat(String),

    #[error("Need either a file or a directory to push")]
    NoPathsGiven,

    #[error("Could not find any files to upload")]
    NothingToUpload,

    #[error("--locale should not be specified when multiple files are to be uploaded ({count} selected)")]
    AmbiguousLocale { count: usize },

    #[error("Tag {0} is invalid: only letters, numbers, underscores, dashes and dots are allowed")]
    InvalidTag(String),

    #[error("Error encountered fetching the locales: {0}")]
    ListLocales(#[source] ServiceError),
}

#[derive(Debug, Error)]
pub enum UnitError {
    #[error("Error {action} {}: {source}", .path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    Service(#[source] ServiceError),

    #[error(transparent)]
    Encoding(#[from] EncodingError),
}

impl UnitError {
    pub(crate) fn io(action: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        UnitError::Io {
            action,
            path: path.into(),
            source,
        }
    }
}

/// Serialize a unit error as its display string, for reports.
pub(crate) fn serialize_error<S: Serializer>(error: &UnitError, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(error)
}
