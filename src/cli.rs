//! CLI argument definitions for gopack.
//!
//! Flags follow the Go convention of single-dash long names (`-src dir`).
//! [`normalize_args`] rewrites those to the double-dash form before clap
//! parses them, so `-src x`, `-src=x`, `--src x` and `--src=x` are
//! equivalent.

use crate::publish::PublishConfig;
use camino::Utf8PathBuf;
use clap::Parser;
use log::LevelFilter;
use std::ffi::OsString;

/// Long flag names accepted with a single leading dash.
const GO_STYLE_FLAGS: &[&str] = &["src", "version", "out", "verbose", "help"];

/// Publish a Go module version into a file-based GOPROXY tree.
#[derive(Parser, Debug, Default, Clone, PartialEq, Eq)]
#[command(name = "gopack", about, disable_version_flag = true)]
#[command(long_about = concat!(
    "Publish a Go module version into a file-based GOPROXY tree.\n\n",
    "Reads go.mod from the source directory and writes the .mod, .info and ",
    ".zip files for the version under <out>/<module>/@v/, then adds the ",
    "version to the sorted list file. Uppercase letters in the module path ",
    "and version are escaped as '!' followed by the lowercase letter.\n\n",
    "Point Go at the tree with GOPROXY=file://<out>.",
))]
#[command(after_help = concat!(
    "EXAMPLES:\n",
    "  Publish the module in the current directory:\n",
    "    $ gopack -src . -version v1.0.3 -out /tmp/goproxy\n\n",
    "  Show each step:\n",
    "    $ gopack -v -v -src ./hello -version v0.2.0-rc.1 -out /tmp/goproxy",
))]
pub struct Cli {
    /// Module source directory (worktree root with go.mod).
    #[arg(long, value_name = "DIR")]
    pub src: Option<Utf8PathBuf>,

    /// Version to publish, e.g. v1.0.3.
    #[arg(long, value_name = "SEMVER")]
    pub version: Option<String>,

    /// GOPROXY root directory, e.g. /tmp/goproxy.
    #[arg(long, value_name = "DIR")]
    pub out: Option<Utf8PathBuf>,

    /// Increase log verbosity (repeatable: -v, -vv, -vvv).
    #[arg(short, long = "verbose", action = clap::ArgAction::Count)]
    pub verbosity: u8,
}

impl Cli {
    /// Build the publish inputs. Absent flags become empty values, which
    /// [`PublishConfig::validate`] reports together.
    #[must_use]
    pub fn to_config(&self) -> PublishConfig {
        PublishConfig {
            src_dir: self.src.clone().unwrap_or_default(),
            version: self.version.clone().unwrap_or_default(),
            out_root: self.out.clone().unwrap_or_default(),
        }
    }

    /// Return the log level selected by `-v`.
    #[must_use]
    pub fn log_level(&self) -> LevelFilter {
        match self.verbosity {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }
}

/// Rewrite Go-style `-name` flags to `--name`.
///
/// Arguments after a bare `--` and values that are not known flag names
/// pass through unchanged. The first argument is the program name.
///
/// # Examples
///
/// ```
/// use gopack::cli::normalize_args;
///
/// let args = normalize_args(["gopack", "-src=.", "-version", "v1.0.0", "-vv"]);
/// assert_eq!(args, ["gopack", "--src=.", "--version", "v1.0.0", "-vv"]);
/// ```
#[must_use]
pub fn normalize_args<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let mut passthrough = false;
    args.into_iter()
        .map(Into::into)
        .enumerate()
        .map(|(index, arg)| {
            if index == 0 || passthrough {
                return arg;
            }
            if arg == "--" {
                passthrough = true;
                return arg;
            }
            match arg.to_str().and_then(go_style_flag) {
                Some(long) => long.into(),
                None => arg,
            }
        })
        .collect()
}

fn go_style_flag(arg: &str) -> Option<String> {
    let body = arg.strip_prefix('-')?;
    if body.starts_with('-') {
        return None;
    }
    let name = body.split_once('=').map_or(body, |(name, _)| name);
    GO_STYLE_FLAGS.contains(&name).then(|| format!("-{arg}"))
}
