//! Error types for module publishing.
//!
//! Every failure aborts the publish run. Each variant names the step that
//! failed and, where a file is involved, the path, so that the single-line
//! message printed by the CLI is actionable on its own.

use crate::archive::ArchiveError;
use crate::atomic::AtomicWriteError;
use crate::escape::EscapeError;
use crate::manifest::ManifestError;
use crate::version::VersionError;
use crate::version_list::ListError;
use camino::Utf8PathBuf;
use thiserror::Error;

/// Errors that can occur while publishing a module version.
#[derive(Debug, Error)]
pub enum PublishError {
    /// One or more required inputs were empty.
    #[error("required flags: -src, -version, -out (missing: {})", .flags.join(", "))]
    MissingFlag {
        /// The missing flags, with their leading dash.
        flags: Vec<&'static str>,
    },

    /// The version is not a valid semantic version.
    #[error("invalid version {version:?} (want semver like v1.2.3): {reason}")]
    InvalidVersion {
        /// The rejected version.
        version: String,
        /// Why the version was rejected.
        reason: String,
    },

    /// The source directory could not be resolved to an absolute path.
    #[error("resolve source directory {path}: {reason}")]
    SourceDir {
        /// The source directory as given.
        path: Utf8PathBuf,
        /// Description of the failure.
        reason: String,
    },

    /// The manifest is absent or unreadable.
    #[error("{0}")]
    ManifestNotFound(#[source] ManifestError),

    /// The manifest is malformed.
    #[error("{0}")]
    ManifestParse(#[source] ManifestError),

    /// The manifest declares no module path.
    #[error("{0}")]
    ManifestIncomplete(#[source] ManifestError),

    /// The module path cannot be escaped for the proxy layout.
    #[error("escape module path: {0}")]
    InvalidIdentifier(#[source] EscapeError),

    /// The archive builder failed.
    #[error("build module zip: {0}")]
    ArchiveBuild(#[from] ArchiveError),

    /// The `.info` descriptor could not be serialized.
    #[error("serialize version info: {0}")]
    SerializeInfo(#[from] serde_json::Error),

    /// A directory of the output tree could not be created.
    #[error("create directory {path}: {source}")]
    CreateDirectory {
        /// Directory that could not be created.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A published file could not be written.
    #[error("write {path}: {source}")]
    WriteFile {
        /// File that could not be written.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The existing version list could not be opened.
    #[error("read list {path}: {source}")]
    ListRead {
        /// List file location.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The existing version list could not be read to the end.
    #[error("scan list {path}: {source}")]
    ListScan {
        /// List file location.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The replacement version list could not be written.
    #[error("write list {path}: {source}")]
    ListWrite {
        /// List file location.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The replacement version list could not be renamed into place.
    #[error("rename list {path}: {source}")]
    ListRename {
        /// List file location.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl From<ManifestError> for PublishError {
    fn from(err: ManifestError) -> Self {
        match err {
            ManifestError::NotFound { .. } => Self::ManifestNotFound(err),
            ManifestError::Parse { .. } => Self::ManifestParse(err),
            ManifestError::Incomplete { .. } => Self::ManifestIncomplete(err),
        }
    }
}

impl From<VersionError> for PublishError {
    fn from(err: VersionError) -> Self {
        Self::InvalidVersion {
            version: err.value,
            reason: err.reason,
        }
    }
}

impl From<EscapeError> for PublishError {
    fn from(err: EscapeError) -> Self {
        match err {
            EscapeError::InvalidVersion { version, reason } => {
                Self::InvalidVersion { version, reason }
            }
            EscapeError::InvalidIdentifier { .. } => Self::InvalidIdentifier(err),
        }
    }
}

impl From<ListError> for PublishError {
    fn from(err: ListError) -> Self {
        match err {
            ListError::Read { path, source } => Self::ListRead { path, source },
            ListError::Scan { path, source } => Self::ListScan { path, source },
            ListError::Write { path, source } => Self::ListWrite { path, source },
            ListError::Rename { path, source } => Self::ListRename { path, source },
        }
    }
}

impl From<AtomicWriteError> for PublishError {
    fn from(err: AtomicWriteError) -> Self {
        match err {
            AtomicWriteError::Write { path, source } | AtomicWriteError::Rename { path, source } => {
                Self::WriteFile { path, source }
            }
        }
    }
}

/// Result type alias using [`PublishError`].
pub type Result<T> = std::result::Result<T, PublishError>;
