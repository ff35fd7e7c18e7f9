//! Behaviour tests for publishing module versions into a proxy tree.

use camino::{Utf8Path, Utf8PathBuf};
use chrono::Utc;
use gopack::archive::ModuleZipBuilder;
use gopack::escape::escape_path;
use gopack::manifest::ModulePath;
use gopack::{PublishConfig, PublishReport, publish};
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use tempfile::TempDir;

#[derive(Default)]
struct PublishWorld {
    _temp_dir: Option<TempDir>,
    src: Option<Utf8PathBuf>,
    out: Option<Utf8PathBuf>,
    module: Option<String>,
    report: Option<PublishReport>,
    last_error: Option<String>,
}

impl PublishWorld {
    fn out(&self) -> &Utf8Path {
        self.out.as_deref().expect("proxy root set")
    }

    fn at_v_dir(&self) -> Utf8PathBuf {
        let module = self.module.as_deref().expect("module declared");
        let module = ModulePath::try_from(module).expect("valid module path");
        let escaped = escape_path(&module).expect("escapable module path");
        self.out().join(escaped.as_str()).join("@v")
    }

    fn report(&self) -> &PublishReport {
        match (&self.report, &self.last_error) {
            (Some(report), _) => report,
            (None, Some(error)) => panic!("publishing failed: {error}"),
            (None, None) => panic!("nothing was published"),
        }
    }
}

#[fixture]
fn world() -> PublishWorld {
    PublishWorld::default()
}

fn prepare_dirs(world: &mut PublishWorld) -> Utf8PathBuf {
    let temp_dir = tempfile::tempdir().expect("create temp dir");
    let root = Utf8PathBuf::from_path_buf(temp_dir.path().to_path_buf())
        .expect("temp dir path is UTF-8");
    let src = root.join("src");
    std::fs::create_dir_all(&src).expect("create source dir");
    world.src = Some(src.clone());
    world.out = Some(root.join("proxy"));
    world._temp_dir = Some(temp_dir);
    src
}

#[given("a module source declaring {module}")]
fn given_module_source(world: &mut PublishWorld, module: String) {
    let src = prepare_dirs(world);
    std::fs::write(src.join("go.mod"), format!("module {module}\n\ngo 1.22\n"))
        .expect("write go.mod");
    std::fs::write(src.join("lib.go"), "package lib\n").expect("write source file");
    world.module = Some(module);
}

#[given("a source directory without a manifest")]
fn given_source_without_manifest(world: &mut PublishWorld) {
    let src = prepare_dirs(world);
    std::fs::write(src.join("lib.go"), "package lib\n").expect("write source file");
}

#[given("the version list already holds {entries}")]
fn given_existing_list(world: &mut PublishWorld, entries: String) {
    let at_v = world.at_v_dir();
    std::fs::create_dir_all(&at_v).expect("create @v dir");
    let mut content = entries.split(',').collect::<Vec<_>>().join("\n");
    content.push('\n');
    std::fs::write(at_v.join("list"), content).expect("seed list");
}

#[when("version {version} is published")]
fn when_version_published(world: &mut PublishWorld, version: String) {
    let config = PublishConfig {
        src_dir: world.src.clone().expect("source dir set"),
        version,
        out_root: world.out().to_owned(),
    };
    match publish(&config, &ModuleZipBuilder, Utc::now()) {
        Ok(report) => {
            world.report = Some(report);
            world.last_error = None;
        }
        Err(error) => {
            world.report = None;
            world.last_error = Some(error.to_string());
        }
    }
}

#[then("the proxy holds the mod, info and zip files for {version}")]
fn then_proxy_holds_files(world: &mut PublishWorld, version: String) {
    let at_v = world.at_v_dir();
    let report = world.report();

    assert_eq!(report.mod_file(), at_v.join(format!("{version}.mod")));
    let manifest = std::fs::read_to_string(report.mod_file()).expect("read .mod");
    assert!(manifest.starts_with("module "));

    let info = std::fs::read_to_string(report.info_file()).expect("read .info");
    let parsed: serde_json::Value = serde_json::from_str(&info).expect("info is JSON");
    assert_eq!(parsed["Version"], version.as_str());
    assert!(parsed["Time"].as_str().is_some_and(|t| t.ends_with('Z')));

    let zip = std::fs::read(report.zip_file()).expect("read .zip");
    assert!(zip.starts_with(b"PK"));
}

#[then("the version list reads {expected}")]
fn then_list_reads(world: &mut PublishWorld, expected: String) {
    let list = std::fs::read_to_string(world.at_v_dir().join("list")).expect("read list");
    let mut want = expected.split(',').collect::<Vec<_>>().join("\n");
    want.push('\n');
    assert_eq!(list, want);
}

#[then("the files live under {dir}")]
fn then_files_live_under(world: &mut PublishWorld, dir: String) {
    let expected = world.out().join(&dir);
    let report = world.report();
    assert_eq!(report.mod_file().parent(), Some(expected.as_path()));
    assert_eq!(report.list_file().parent(), Some(expected.as_path()));
    assert!(
        !dir.chars().any(|c| c.is_ascii_uppercase()),
        "escaped path must not contain uppercase letters"
    );
}

#[then("the zip is named {name}")]
fn then_zip_named(world: &mut PublishWorld, name: String) {
    assert_eq!(world.report().zip_file().file_name(), Some(name.as_str()));
}

#[then("publishing fails mentioning {fragment}")]
fn then_publishing_fails(world: &mut PublishWorld, fragment: String) {
    let error = world
        .last_error
        .as_deref()
        .expect("expected publishing to fail");
    assert!(
        error.contains(&fragment),
        "expected error mentioning {fragment:?}, got {error:?}"
    );
}

#[then("nothing is written under the proxy root")]
fn then_nothing_written(world: &mut PublishWorld) {
    let out = world.out();
    let empty = !out.exists()
        || std::fs::read_dir(out)
            .expect("read proxy root")
            .next()
            .is_none();
    assert!(empty, "expected {out} to be empty");
}

#[scenario(
    path = "tests/features/publish.feature",
    name = "Publish a first version"
)]
fn scenario_publish_first_version(world: PublishWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/publish.feature",
    name = "Repeated publishes keep the list sorted and unique"
)]
fn scenario_repeated_publishes(world: PublishWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/publish.feature",
    name = "Uppercase module paths are escaped"
)]
fn scenario_uppercase_escaped(world: PublishWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/publish.feature",
    name = "Malformed list entries are dropped"
)]
fn scenario_malformed_list(world: PublishWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/publish.feature",
    name = "An invalid version is rejected before any write"
)]
fn scenario_invalid_version(world: PublishWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/publish.feature",
    name = "A source tree without go.mod is rejected"
)]
fn scenario_missing_manifest(world: PublishWorld) {
    let _ = world;
}
