//! Reproducible module zip creation.
//!
//! A module zip contains every regular file of the module tree under the
//! prefix `<module>@<version>/`. The same tree always yields the same bytes:
//! entries are sorted, timestamps are fixed to the DOS epoch and permissions
//! to `0o644`. Content that belongs to other modules or to version control
//! is excluded:
//!
//! - VCS metadata directories (`.git`, `.hg`, `.svn`, `.bzr`);
//! - subdirectories carrying their own `go.mod` (nested modules);
//! - files below a vendored package directory (`vendor/<pkg>/...`) and
//!   every file below a nested `vendor` directory. Files directly inside
//!   the root `vendor/`, such as `vendor/modules.txt`, are kept;
//! - symlinks and other non-regular files.

use crate::manifest::{MANIFEST_FILE, ModulePath};
use crate::version::Version;
use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, trace};
use std::collections::HashMap;
use std::io::{Cursor, Write};
use thiserror::Error;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Largest total uncompressed size of a module zip.
pub const MAX_ZIP_FILE: u64 = 500 << 20;

/// Largest accepted root `go.mod`.
pub const MAX_GO_MOD: u64 = 16 << 20;

/// Largest accepted root `LICENSE`.
pub const MAX_LICENSE: u64 = 16 << 20;

const VCS_DIRS: &[&str] = &[".bzr", ".git", ".hg", ".svn"];

/// Errors raised while building a module zip.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// A directory of the source tree could not be listed.
    #[error("walk {path}: {source}")]
    Walk {
        /// Directory being listed.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A source file could not be read.
    #[error("read {path}: {source}")]
    Read {
        /// File being read.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A file name in the source tree is not valid UTF-8.
    #[error("file name {path:?} is not valid UTF-8")]
    NonUtf8Path {
        /// The offending path.
        path: std::path::PathBuf,
    },

    /// A single file exceeds its size limit.
    #[error("{path} is {size} bytes, exceeding the {limit}-byte limit")]
    FileTooLarge {
        /// Module-relative file path.
        path: String,
        /// Actual size in bytes.
        size: u64,
        /// Limit in bytes.
        limit: u64,
    },

    /// The module's files exceed the total size limit.
    #[error("module source tree exceeds the {limit}-byte limit")]
    ModuleTooLarge {
        /// Limit in bytes.
        limit: u64,
    },

    /// Two files differ only in letter case.
    #[error("case-insensitive file name collision: {first:?} and {second:?}")]
    CaseCollision {
        /// The file encountered first.
        first: String,
        /// The colliding file.
        second: String,
    },

    /// The zip writer failed.
    #[error("zip: {0}")]
    Zip(#[from] zip::result::ZipError),
}

/// Produces the canonical archive of a module version.
#[cfg_attr(test, mockall::automock)]
pub trait ArchiveBuilder {
    /// Build the archive for `module@version` from the tree at `src_root`.
    ///
    /// # Errors
    ///
    /// Returns an [`ArchiveError`] if the tree cannot be read or violates
    /// the archive constraints.
    fn build(
        &self,
        module: &ModulePath,
        version: &Version,
        src_root: &Utf8Path,
    ) -> Result<Vec<u8>, ArchiveError>;
}

/// Default [`ArchiveBuilder`] writing deflate-compressed module zips.
#[derive(Debug, Clone, Copy, Default)]
pub struct ModuleZipBuilder;

impl ArchiveBuilder for ModuleZipBuilder {
    fn build(
        &self,
        module: &ModulePath,
        version: &Version,
        src_root: &Utf8Path,
    ) -> Result<Vec<u8>, ArchiveError> {
        let files = collect_files(src_root)?;
        check_limits(&files)?;

        let prefix = format!("{module}@{version}/");
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(zip::DateTime::default())
            .unix_permissions(0o644);

        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for file in &files {
            let data = std::fs::read(&file.path).map_err(|source| ArchiveError::Read {
                path: file.path.clone(),
                source,
            })?;
            writer.start_file(format!("{prefix}{}", file.relative), options)?;
            writer.write_all(&data).map_err(|source| ArchiveError::Read {
                path: file.path.clone(),
                source,
            })?;
        }
        let bytes = writer.finish()?.into_inner();
        debug!(
            "archived {} file(s) from {src_root} as {prefix} ({} bytes)",
            files.len(),
            bytes.len()
        );
        Ok(bytes)
    }
}

/// A regular file selected for the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
struct SourceFile {
    /// Absolute or caller-relative location on disk.
    path: Utf8PathBuf,
    /// Slash-separated path relative to the module root.
    relative: String,
    size: u64,
}

fn collect_files(src_root: &Utf8Path) -> Result<Vec<SourceFile>, ArchiveError> {
    let mut files = Vec::new();
    walk(src_root, src_root, &mut files)?;
    files.sort_by(|a, b| a.relative.cmp(&b.relative));
    Ok(files)
}

fn walk(
    root: &Utf8Path,
    dir: &Utf8Path,
    files: &mut Vec<SourceFile>,
) -> Result<(), ArchiveError> {
    let walk_err = |source| ArchiveError::Walk {
        path: dir.to_owned(),
        source,
    };

    for dir_entry in std::fs::read_dir(dir).map_err(walk_err)? {
        let entry = dir_entry.map_err(walk_err)?;
        let path = Utf8PathBuf::from_path_buf(entry.path())
            .map_err(|path| ArchiveError::NonUtf8Path { path })?;
        let file_type = entry.file_type().map_err(walk_err)?;
        let name = path.file_name().unwrap_or_default();

        if file_type.is_dir() {
            if VCS_DIRS.contains(&name) {
                trace!("skipping VCS directory {path}");
                continue;
            }
            if path.join(MANIFEST_FILE).is_file() {
                trace!("skipping nested module {path}");
                continue;
            }
            walk(root, &path, files)?;
            continue;
        }
        if !file_type.is_file() {
            trace!("skipping non-regular file {path}");
            continue;
        }

        let relative = relative_slash_path(root, &path);
        if is_vendored_package(&relative) {
            trace!("skipping vendored file {relative}");
            continue;
        }
        let size = entry.metadata().map_err(walk_err)?.len();
        files.push(SourceFile {
            path,
            relative,
            size,
        });
    }
    Ok(())
}

fn relative_slash_path(root: &Utf8Path, path: &Utf8Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_str())
        .collect::<Vec<_>>()
        .join("/")
}

/// Files inside a package below `vendor/` belong to another module.
///
/// For a nested `/vendor/` the remainder is taken from a fixed offset into
/// the whole name rather than from the match, so every file anywhere below
/// a nested `vendor` directory is excluded. Module checksums depend on this
/// exact file set.
fn is_vendored_package(relative: &str) -> bool {
    const NESTED_VENDOR: &str = "/vendor/";

    if let Some(rest) = relative.strip_prefix("vendor/") {
        return rest.contains('/');
    }
    if !relative.contains(NESTED_VENDOR) {
        return false;
    }
    relative
        .as_bytes()
        .get(NESTED_VENDOR.len()..)
        .is_some_and(|rest| rest.contains(&b'/'))
}

fn check_limits(files: &[SourceFile]) -> Result<(), ArchiveError> {
    let mut total: u64 = 0;
    let mut folded: HashMap<String, &str> = HashMap::with_capacity(files.len());

    for file in files {
        let limit = match file.relative.as_str() {
            MANIFEST_FILE => Some(MAX_GO_MOD),
            "LICENSE" => Some(MAX_LICENSE),
            _ => None,
        };
        if let Some(limit) = limit {
            if file.size > limit {
                return Err(ArchiveError::FileTooLarge {
                    path: file.relative.clone(),
                    size: file.size,
                    limit,
                });
            }
        }

        total = total.saturating_add(file.size);
        if total > MAX_ZIP_FILE {
            return Err(ArchiveError::ModuleTooLarge {
                limit: MAX_ZIP_FILE,
            });
        }

        if let Some(first) = folded.insert(file.relative.to_lowercase(), &file.relative) {
            return Err(ArchiveError::CaseCollision {
                first: first.to_owned(),
                second: file.relative.clone(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "archive_tests.rs"]
mod tests;
