//! Maintenance of the per-module `@v/list` catalogue.
//!
//! The list is rebuilt wholesale on every publish: existing entries are read,
//! lines that are not valid versions are dropped, the new version is inserted
//! if absent, and the result is sorted by semver precedence and written back
//! through [`crate::atomic::write_file_atomic`]. Readers therefore only ever
//! see a complete, sorted, duplicate-free list.

use crate::atomic::{AtomicWriteError, write_file_atomic};
use crate::version::Version;
use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, warn};
use std::io::{BufRead, BufReader};
use thiserror::Error;

/// File name of the version list inside an `@v` directory.
pub const LIST_FILE: &str = "list";

/// Errors raised while updating the version list.
#[derive(Debug, Error)]
pub enum ListError {
    /// The existing list exists but could not be opened.
    #[error("read list {path}: {source}")]
    Read {
        /// List file location.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Reading the existing list failed part-way through.
    #[error("scan list {path}: {source}")]
    Scan {
        /// List file location.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The replacement list could not be written.
    #[error("write list {path}: {source}")]
    Write {
        /// List file location.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The replacement list could not be renamed into place.
    #[error("rename list {path}: {source}")]
    Rename {
        /// List file location.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl From<AtomicWriteError> for ListError {
    fn from(err: AtomicWriteError) -> Self {
        match err {
            AtomicWriteError::Write { path, source } => Self::Write { path, source },
            AtomicWriteError::Rename { path, source } => Self::Rename { path, source },
        }
    }
}

/// An ordered, duplicate-free set of published versions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionList {
    versions: Vec<Version>,
}

impl VersionList {
    /// Insert `version` unless an identical string is already present.
    ///
    /// Returns `true` when the version was added.
    pub fn insert(&mut self, version: &Version) -> bool {
        match self.versions.binary_search(version) {
            Ok(_) => false,
            Err(index) => {
                self.versions.insert(index, version.clone());
                true
            }
        }
    }

    /// Return `true` when the exact version string is present.
    #[must_use]
    pub fn contains(&self, version: &Version) -> bool {
        // Ties in `Ord` fall back to the raw string, so `Equal` means identical.
        self.versions.binary_search(version).is_ok()
    }

    /// Return the versions in ascending precedence order.
    #[must_use]
    pub fn versions(&self) -> &[Version] {
        &self.versions
    }

    /// Return the number of listed versions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.versions.len()
    }

    /// Return `true` when no versions are listed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    /// Render one version per line, each terminated by a newline.
    #[must_use]
    pub fn render(&self) -> String {
        self.versions
            .iter()
            .map(|v| format!("{v}\n"))
            .collect()
    }
}

impl FromIterator<Version> for VersionList {
    fn from_iter<I: IntoIterator<Item = Version>>(iter: I) -> Self {
        let mut versions: Vec<Version> = iter.into_iter().collect();
        versions.sort_unstable();
        versions.dedup();
        Self { versions }
    }
}

/// Outcome of [`update_list_file`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListUpdate {
    path: Utf8PathBuf,
    list: VersionList,
    inserted: bool,
    dropped: Vec<String>,
}

impl ListUpdate {
    /// Return the list file location.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Return the list as written.
    #[must_use]
    pub fn list(&self) -> &VersionList {
        &self.list
    }

    /// Return `true` when the published version was new to the list.
    #[must_use]
    pub fn inserted(&self) -> bool {
        self.inserted
    }

    /// Return the non-empty lines discarded because they were not versions.
    #[must_use]
    pub fn dropped(&self) -> &[String] {
        &self.dropped
    }
}

/// Existing list contents split into valid entries and discarded lines.
#[derive(Debug, Default)]
struct ScannedList {
    list: VersionList,
    dropped: Vec<String>,
}

/// Insert `version` into `<at_v_dir>/list`, keeping it sorted and unique.
///
/// # Errors
///
/// Returns [`ListError::Read`] or [`ListError::Scan`] if the existing list
/// cannot be read, and [`ListError::Write`] or [`ListError::Rename`] if the
/// replacement cannot be put in place. The existing list is untouched on
/// every error path.
pub fn update_list_file(at_v_dir: &Utf8Path, version: &Version) -> Result<ListUpdate, ListError> {
    let path = at_v_dir.join(LIST_FILE);
    let ScannedList { mut list, dropped } = read_list(&path)?;

    for line in &dropped {
        warn!("dropping malformed entry {line:?} from {path}");
    }

    let inserted = list.insert(version);
    debug!(
        "{path}: {} version(s), {version} {}",
        list.len(),
        if inserted { "added" } else { "already present" }
    );

    write_file_atomic(at_v_dir, LIST_FILE, list.render().as_bytes())?;

    Ok(ListUpdate {
        path,
        list,
        inserted,
        dropped,
    })
}

fn read_list(path: &Utf8Path) -> Result<ScannedList, ListError> {
    let file = match std::fs::File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(ScannedList::default()),
        Err(source) => {
            return Err(ListError::Read {
                path: path.to_owned(),
                source,
            });
        }
    };

    let mut versions = Vec::new();
    let mut dropped = Vec::new();
    for chunk in BufReader::new(file).split(b'\n') {
        let mut line = chunk.map_err(|source| ListError::Scan {
            path: path.to_owned(),
            source,
        })?;
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        if line.is_empty() {
            continue;
        }
        match String::from_utf8(line) {
            Ok(text) => match Version::try_from(text.as_str()) {
                Ok(version) => versions.push(version),
                Err(_) => dropped.push(text),
            },
            Err(e) => dropped.push(String::from_utf8_lossy(e.as_bytes()).into_owned()),
        }
    }
    Ok(ScannedList {
        list: versions.into_iter().collect(),
        dropped,
    })
}

#[cfg(test)]
#[path = "version_list_tests.rs"]
mod tests;
