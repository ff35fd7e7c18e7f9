//! gopack library.
//!
//! This crate publishes a single Go module version into a file-based module
//! proxy tree (`GOPROXY=file://...`). It is used by the `gopack` CLI binary
//! and can be driven programmatically through [`publish::publish`].
//!
//! # Modules
//!
//! - [`archive`] - Reproducible module zip creation
//! - [`atomic`] - Same-directory temp file plus rename writes
//! - [`cli`] - Command-line argument definitions
//! - [`error`] - Publish error taxonomy
//! - [`escape`] - Case-escaping of module paths and versions
//! - [`info`] - The `.info` version descriptor
//! - [`layout`] - Paths inside the proxy tree
//! - [`manifest`] - `go.mod` reading and module path extraction
//! - [`publish`] - Publish orchestration
//! - [`version`] - Semantic version parsing and ordering
//! - [`version_list`] - The sorted `list` file

pub mod archive;
pub mod atomic;
pub mod cli;
pub mod error;
pub mod escape;
pub mod info;
pub mod layout;
pub mod manifest;
pub mod publish;
pub mod version;
pub mod version_list;

pub use error::{PublishError, Result};
pub use publish::{PublishConfig, PublishReport, publish};
