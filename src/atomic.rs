//! Same-directory temp file plus rename.
//!
//! The rename is the only visible mutation: on any earlier failure the
//! target keeps its previous content and the temp file is removed when the
//! [`tempfile::NamedTempFile`] handle drops.

use camino::{Utf8Path, Utf8PathBuf};
use log::trace;
use std::io::Write;
use tempfile::NamedTempFile;
use thiserror::Error;

/// Permissions applied to every published file.
pub const FILE_MODE: u32 = 0o644;

/// Errors raised by [`write_file_atomic`].
#[derive(Debug, Error)]
pub enum AtomicWriteError {
    /// Creating, writing, or closing the temp file failed.
    #[error("write temp file for {path}: {source}")]
    Write {
        /// Final target path.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Renaming the temp file over the target failed.
    #[error("rename temp file onto {path}: {source}")]
    Rename {
        /// Final target path.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Atomically replace `dir/name` with `data`.
///
/// # Errors
///
/// Returns [`AtomicWriteError::Write`] if the temp file cannot be prepared
/// and [`AtomicWriteError::Rename`] if it cannot be moved into place.
pub fn write_file_atomic(
    dir: &Utf8Path,
    name: &str,
    data: &[u8],
) -> Result<Utf8PathBuf, AtomicWriteError> {
    let target = dir.join(name);
    let write_err = |source| AtomicWriteError::Write {
        path: target.clone(),
        source,
    };

    let mut tmp = tempfile::Builder::new()
        .prefix(&format!("{name}.tmp-"))
        .tempfile_in(dir)
        .map_err(write_err)?;
    trace!("staging {target} via {}", tmp.path().display());

    tmp.write_all(data).map_err(write_err)?;
    set_file_mode(&tmp).map_err(write_err)?;
    tmp.flush().map_err(write_err)?;

    tmp.persist(&target).map_err(|e| AtomicWriteError::Rename {
        path: target.clone(),
        source: e.error,
    })?;
    Ok(target)
}

#[cfg(unix)]
fn set_file_mode(tmp: &NamedTempFile) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    tmp.as_file()
        .set_permissions(std::fs::Permissions::from_mode(FILE_MODE))
}

#[cfg(not(unix))]
fn set_file_mode(_tmp: &NamedTempFile) -> std::io::Result<()> {
    Ok(())
}

/// Plainly truncate-write `path` with the published file mode.
///
/// # Errors
///
/// Returns the underlying I/O error.
pub fn write_file(path: &Utf8Path, data: &[u8]) -> std::io::Result<()> {
    let mut options = std::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(FILE_MODE);
    }
    let mut file = options.open(path)?;
    file.write_all(data)?;
    file.flush()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utf8_dir(temp_dir: &tempfile::TempDir) -> &Utf8Path {
        Utf8Path::from_path(temp_dir.path()).expect("temp dir path is UTF-8")
    }

    fn entries(dir: &Utf8Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .expect("read dir")
            .map(|entry| {
                entry
                    .expect("dir entry")
                    .file_name()
                    .to_string_lossy()
                    .into_owned()
            })
            .collect();
        names.sort();
        names
    }

    #[test]
    fn replaces_existing_content_without_leftovers() {
        let temp_dir = tempfile::tempdir().expect("create temp dir");
        let dir = utf8_dir(&temp_dir);
        std::fs::write(dir.join("list"), "old\n").expect("seed file");

        let written = write_file_atomic(dir, "list", b"new\n").expect("atomic write");

        assert_eq!(written, dir.join("list"));
        assert_eq!(std::fs::read_to_string(&written).expect("read back"), "new\n");
        assert_eq!(entries(dir), vec!["list".to_owned()]);
    }

    #[cfg(unix)]
    #[test]
    fn applies_published_file_mode() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = tempfile::tempdir().expect("create temp dir");
        let dir = utf8_dir(&temp_dir);
        let written = write_file_atomic(dir, "list", b"v1.0.0\n").expect("atomic write");

        let mode = std::fs::metadata(&written)
            .expect("metadata")
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, FILE_MODE);
    }

    #[test]
    fn failed_rename_leaves_target_untouched() {
        let temp_dir = tempfile::tempdir().expect("create temp dir");
        let dir = utf8_dir(&temp_dir);
        // A non-empty directory cannot be replaced by a file rename.
        std::fs::create_dir_all(dir.join("list").join("occupied")).expect("create blocker");

        let err = write_file_atomic(dir, "list", b"v1.0.0\n").expect_err("rename should fail");

        assert!(matches!(err, AtomicWriteError::Rename { .. }), "got {err}");
        assert!(dir.join("list").join("occupied").is_dir());
        assert_eq!(entries(dir), vec!["list".to_owned()]);
    }

    #[test]
    fn missing_directory_reports_write_error() {
        let temp_dir = tempfile::tempdir().expect("create temp dir");
        let dir = utf8_dir(&temp_dir).join("absent");

        let err = write_file_atomic(&dir, "list", b"v1.0.0\n").expect_err("no directory");
        assert!(matches!(err, AtomicWriteError::Write { .. }), "got {err}");
    }

    #[test]
    fn write_file_truncates_previous_content() {
        let temp_dir = tempfile::tempdir().expect("create temp dir");
        let path = utf8_dir(&temp_dir).join("v1.0.0.mod");
        std::fs::write(&path, "module example.com/much/longer/path\n").expect("seed");

        write_file(&path, b"module example.com/m\n").expect("write");
        assert_eq!(
            std::fs::read_to_string(&path).expect("read back"),
            "module example.com/m\n"
        );
    }
}
