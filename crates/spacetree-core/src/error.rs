//! Error and warning types for probing and scanning.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors reported by a filesystem probe.
///
/// None of these abort a scan: the scanner absorbs them locally and records
/// a [`ScanWarning`].
#[derive(Debug, Error)]
pub enum ProbeError {
    /// Path does not exist (anymore).
    #[error("Path not found: {path}")]
    NotFound { path: PathBuf },

    /// Permission denied for a path.
    #[error("Permission denied: {path}")]
    PermissionDenied { path: PathBuf },

    /// Generic I/O error.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ProbeError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            std::io::ErrorKind::NotFound => Self::NotFound { path },
            _ => Self::Io { path, source },
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn path(&self) -> &std::path::Path {
        match self {
            Self::NotFound { path } | Self::PermissionDenied { path } | Self::Io { path, .. } => {
                path
            }
        }
    }
}

/// Kind of scan warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WarningKind {
    /// A directory could not be listed; it was kept as an empty, Done node.
    ListingFailed,
    /// Volume capacity was unavailable and treated as zero.
    VolumeQueryFailed,
    /// Metadata of an item could not be re-read during refresh.
    MetadataError,
}

/// Non-fatal condition encountered during a scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanWarning {
    /// Path where the warning occurred.
    pub path: PathBuf,
    /// Human-readable message.
    pub message: String,
    /// Kind of warning.
    pub kind: WarningKind,
}

impl ScanWarning {
    /// Create a new scan warning.
    pub fn new(path: impl Into<PathBuf>, message: impl Into<String>, kind: WarningKind) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            kind,
        }
    }

    /// A listing failure from a probe error.
    pub fn listing_failed(error: &ProbeError) -> Self {
        Self::new(error.path(), error.to_string(), WarningKind::ListingFailed)
    }

    /// A volume whose capacity could not be queried.
    pub fn volume_query_failed(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            message: format!("Volume space unavailable: {}", path.display()),
            path,
            kind: WarningKind::VolumeQueryFailed,
        }
    }
}
