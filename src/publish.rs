//! Publish one module version into a proxy tree.
//!
//! [`publish`] validates its inputs before touching the filesystem, then
//! writes the `.mod`, `.info` and `.zip` files and finally merges the
//! version into `list`. The first failure aborts the run. Files written by
//! earlier steps are left in place.

use crate::archive::ArchiveBuilder;
use crate::atomic::{write_file, write_file_atomic};
use crate::error::{PublishError, Result};
use crate::escape::{escape_path, escape_version};
use crate::info::Info;
use crate::layout::ProxyLayout;
use crate::manifest::read_manifest;
use crate::version::Version;
use crate::version_list::{ListUpdate, update_list_file};
use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, Utc};
use log::{debug, info};
use std::fmt;

/// Inputs of a single publish run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishConfig {
    /// Module source tree containing `go.mod`.
    pub src_dir: Utf8PathBuf,
    /// Version to publish, e.g. `v1.0.3`.
    pub version: String,
    /// Root of the proxy tree.
    pub out_root: Utf8PathBuf,
}

impl PublishConfig {
    /// Check that every input is present and the version is well formed.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError::MissingFlag`] naming every empty input, or
    /// [`PublishError::InvalidVersion`] when the version does not parse.
    pub fn validate(&self) -> Result<Version> {
        let flags: Vec<&'static str> = [
            ("-src", self.src_dir.as_str()),
            ("-version", self.version.as_str()),
            ("-out", self.out_root.as_str()),
        ]
        .into_iter()
        .filter(|(_, value)| value.is_empty())
        .map(|(flag, _)| flag)
        .collect();

        if !flags.is_empty() {
            return Err(PublishError::MissingFlag { flags });
        }
        Ok(Version::try_from(self.version.as_str())?)
    }
}

/// Files written by a successful run.
#[derive(Debug)]
pub struct PublishReport {
    mod_file: Utf8PathBuf,
    info_file: Utf8PathBuf,
    zip_file: Utf8PathBuf,
    list: ListUpdate,
}

impl PublishReport {
    /// Return the path of the `.mod` copy.
    #[must_use]
    pub fn mod_file(&self) -> &Utf8Path {
        &self.mod_file
    }

    /// Return the path of the `.info` descriptor.
    #[must_use]
    pub fn info_file(&self) -> &Utf8Path {
        &self.info_file
    }

    /// Return the path of the `.zip` archive.
    #[must_use]
    pub fn zip_file(&self) -> &Utf8Path {
        &self.zip_file
    }

    /// Return the path of the version list.
    #[must_use]
    pub fn list_file(&self) -> &Utf8Path {
        self.list.path()
    }

    /// Return the outcome of the list update.
    #[must_use]
    pub fn list_update(&self) -> &ListUpdate {
        &self.list
    }
}

impl fmt::Display for PublishReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Wrote:")?;
        writeln!(f, "  {}", self.mod_file)?;
        writeln!(f, "  {}", self.info_file)?;
        writeln!(f, "  {}", self.zip_file)?;
        write!(f, "  {}", self.list.path())
    }
}

/// Publish `config.version` of the module at `config.src_dir`.
///
/// `now` becomes the `Time` field of the `.info` descriptor.
///
/// # Errors
///
/// Returns the [`PublishError`] of the first step that fails. Input
/// validation errors are reported before anything is created below
/// `config.out_root`.
pub fn publish(
    config: &PublishConfig,
    archiver: &dyn ArchiveBuilder,
    now: DateTime<Utc>,
) -> Result<PublishReport> {
    let version = config.validate()?;

    let src_dir = absolute_dir(&config.src_dir)?;
    debug!("reading manifest from {src_dir}");
    let manifest = read_manifest(&src_dir)?;
    let module = manifest.module();
    debug!("module path is {module}");

    let layout = ProxyLayout::new(
        &config.out_root,
        &escape_path(module)?,
        escape_version(&version)?,
    );

    debug!("creating {}", layout.at_v_dir());
    layout
        .ensure_dirs()
        .map_err(|source| PublishError::CreateDirectory {
            path: layout.at_v_dir().to_owned(),
            source,
        })?;

    let mod_file = layout.mod_file();
    debug!("writing {mod_file}");
    write_published(&mod_file, manifest.bytes())?;

    let info_file = layout.info_file();
    debug!("writing {info_file}");
    let descriptor = Info::new(&version, now).to_json_line()?;
    write_published(&info_file, descriptor.as_bytes())?;

    debug!("archiving {src_dir}");
    let archive = archiver.build(module, &version, &src_dir)?;
    let zip_file = write_file_atomic(layout.at_v_dir(), &layout.zip_file_name(), &archive)?;
    debug!("wrote {zip_file} ({} bytes)", archive.len());

    let list = update_list_file(layout.at_v_dir(), &version)?;

    info!("published {module}@{version} to {}", config.out_root);
    Ok(PublishReport {
        mod_file,
        info_file,
        zip_file,
        list,
    })
}

fn absolute_dir(src_dir: &Utf8Path) -> Result<Utf8PathBuf> {
    let source_dir_err = |reason: String| PublishError::SourceDir {
        path: src_dir.to_owned(),
        reason,
    };
    let absolute = std::path::absolute(src_dir).map_err(|e| source_dir_err(e.to_string()))?;
    Utf8PathBuf::from_path_buf(absolute)
        .map_err(|path| source_dir_err(format!("{} is not valid UTF-8", path.display())))
}

fn write_published(path: &Utf8Path, data: &[u8]) -> Result<()> {
    write_file(path, data).map_err(|source| PublishError::WriteFile {
        path: path.to_owned(),
        source,
    })
}

#[cfg(test)]
#[path = "publish_tests.rs"]
mod tests;
