//! gopack CLI entrypoint.
//!
//! Publishes one module version into a file-based GOPROXY tree and prints
//! the written paths.

use chrono::Utc;
use clap::Parser;
use gopack::archive::ModuleZipBuilder;
use gopack::cli::{Cli, normalize_args};
use gopack::{Result, publish};
use log::LevelFilter;
use std::io::Write;

fn main() {
    let cli = Cli::parse_from(normalize_args(std::env::args_os()));
    init_logging(cli.log_level());

    let mut stdout = std::io::stdout();
    let mut stderr = std::io::stderr();
    let run_result = run(&cli, &mut stdout);
    let exit_code = exit_code_for_run_result(run_result, &mut stderr);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

/// Sets the log level from `-v` unless `RUST_LOG` is present.
fn init_logging(level: LevelFilter) {
    env_logger::Builder::new()
        .filter_level(level)
        .format_timestamp(None)
        .parse_default_env()
        .init();
}

fn run(cli: &Cli, stdout: &mut dyn Write) -> Result<()> {
    let report = publish(&cli.to_config(), &ModuleZipBuilder, Utc::now())?;
    write_line(stdout, report);
    Ok(())
}

fn exit_code_for_run_result(result: Result<()>, stderr: &mut dyn Write) -> i32 {
    match result {
        Ok(()) => 0,
        Err(err) => {
            write_line(stderr, format_args!("error: {err}"));
            1
        }
    }
}

fn write_line(out: &mut dyn Write, message: impl std::fmt::Display) {
    if writeln!(out, "{message}").is_err() {
        // Best-effort output; ignore write failures.
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use gopack::PublishError;

    #[test]
    fn exit_code_for_run_result_returns_zero_on_success() {
        let mut stderr = Vec::new();
        let exit_code = exit_code_for_run_result(Ok(()), &mut stderr);
        assert_eq!(exit_code, 0);
        assert!(stderr.is_empty());
    }

    #[test]
    fn exit_code_for_run_result_prints_error_and_returns_one() {
        let err = PublishError::MissingFlag {
            flags: vec!["-version"],
        };

        let mut stderr = Vec::new();
        let exit_code = exit_code_for_run_result(Err(err), &mut stderr);
        assert_eq!(exit_code, 1);

        let stderr_text = String::from_utf8(stderr).expect("stderr was not UTF-8");
        assert!(stderr_text.starts_with("error: required flags"));
        assert_eq!(stderr_text.lines().count(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn run_prints_written_paths() {
        let temp_dir = tempfile::tempdir().expect("create temp dir");
        let root = Utf8PathBuf::from_path_buf(temp_dir.path().to_path_buf())
            .expect("temp dir path is UTF-8");
        let src = root.join("src");
        std::fs::create_dir(&src).expect("create src");
        std::fs::write(src.join("go.mod"), "module example.com/cli\n").expect("write go.mod");
        let cli = Cli {
            src: Some(src),
            version: Some("v0.1.0".to_owned()),
            out: Some(root.join("proxy")),
            verbosity: 0,
        };

        let mut stdout = Vec::new();
        run(&cli, &mut stdout).expect("publish succeeds");

        let stdout_text = String::from_utf8(stdout).expect("stdout was not UTF-8");
        let at_v = root.join("proxy/example.com/cli/@v");
        assert_eq!(
            stdout_text,
            format!(
                "Wrote:\n  {at_v}/v0.1.0.mod\n  {at_v}/v0.1.0.info\n  {at_v}/v0.1.0.zip\n  {at_v}/list\n"
            )
        );
    }
}
