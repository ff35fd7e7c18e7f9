//! File-based module proxy layout.
//!
//! ```text
//! <out>/<escaped-module>/@v/<escaped-version>.mod
//! <out>/<escaped-module>/@v/<escaped-version>.info
//! <out>/<escaped-module>/@v/<escaped-version>.zip
//! <out>/<escaped-module>/@v/list
//! ```

use crate::escape::{EscapedPath, EscapedVersion};
use crate::version_list::LIST_FILE;
use camino::{Utf8Path, Utf8PathBuf};

/// Permissions applied to created directories.
pub const DIR_MODE: u32 = 0o755;

/// Name of the per-module version directory.
pub const VERSION_DIR: &str = "@v";

/// Paths for one module version inside a proxy tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyLayout {
    at_v: Utf8PathBuf,
    version: EscapedVersion,
}

impl ProxyLayout {
    /// Compute the layout of `module@version` under `out_root`.
    #[must_use]
    pub fn new(out_root: &Utf8Path, module: &EscapedPath, version: EscapedVersion) -> Self {
        let at_v = module
            .as_str()
            .split('/')
            .fold(out_root.to_owned(), |dir, element| dir.join(element))
            .join(VERSION_DIR);
        Self { at_v, version }
    }

    /// Return the `@v` directory.
    #[must_use]
    pub fn at_v_dir(&self) -> &Utf8Path {
        &self.at_v
    }

    /// Return the path of the `.mod` copy.
    #[must_use]
    pub fn mod_file(&self) -> Utf8PathBuf {
        self.at_v.join(self.version.file_name("mod"))
    }

    /// Return the path of the `.info` descriptor.
    #[must_use]
    pub fn info_file(&self) -> Utf8PathBuf {
        self.at_v.join(self.version.file_name("info"))
    }

    /// Return the file name of the `.zip` archive.
    #[must_use]
    pub fn zip_file_name(&self) -> String {
        self.version.file_name("zip")
    }

    /// Return the path of the `.zip` archive.
    #[must_use]
    pub fn zip_file(&self) -> Utf8PathBuf {
        self.at_v.join(self.zip_file_name())
    }

    /// Return the path of the version list.
    #[must_use]
    pub fn list_file(&self) -> Utf8PathBuf {
        self.at_v.join(LIST_FILE)
    }

    /// Create the `@v` directory and any missing parents.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        let mut builder = std::fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(DIR_MODE);
        }
        builder.create(&self.at_v)
    }
}
