use std::fs;
use std::io::Read;
use std::path::PathBuf;
use std::process::Output;

use vdb_core::{DataPolicy, Import, ModelMetadata, VdbDescriptor, serialize_descriptor};
use vdb_packager::ArchiveWriter;

/// Helper to create a temp directory that is cleaned up on drop.
struct TempDir {
    path: PathBuf,
}

impl TempDir {
    fn new(name: &str) -> Self {
        let path =
            std::env::temp_dir().join(format!("vdb_cli_test_{name}_{}", std::process::id()));
        let _ = fs::remove_dir_all(&path);
        fs::create_dir_all(&path).expect("failed to create temp dir");
        Self { path }
    }

    fn path(&self) -> &PathBuf {
        &self.path
    }

    fn join(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.path);
    }
}

fn vdb_package(args: &[&str]) -> Output {
    std::process::Command::new(env!("CARGO_BIN_EXE_vdb-package"))
        .args(args)
        .output()
        .expect("failed to run vdb-package")
}

/// Writes a project descriptor at the default location.
fn write_project(dir: &TempDir, vdb: &VdbDescriptor) -> PathBuf {
    let path = dir.join("src/main/vdb/META-INF/vdb.xml");
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, serialize_descriptor(vdb).unwrap()).expect("failed to write descriptor");
    path
}

/// Builds a dependency `.vdb` holding `vdb` plus one DDL file per model.
fn write_dependency(dir: &TempDir, file_name: &str, vdb: &VdbDescriptor) -> PathBuf {
    let path = dir.join(&format!("deps/{file_name}"));
    let mut archive = ArchiveWriter::create(&path).unwrap();
    archive
        .add_bytes("META-INF/vdb.xml", &serialize_descriptor(vdb).unwrap())
        .unwrap();
    for model in vdb.models.keys() {
        archive
            .add_bytes(&format!("ddl/{model}.ddl"), model.as_bytes())
            .unwrap();
    }
    archive.finish().unwrap();
    path
}

fn archive_names(path: &PathBuf) -> Vec<String> {
    let mut zip = zip::ZipArchive::new(fs::File::open(path).unwrap()).unwrap();
    (0..zip.len())
        .map(|i| zip.by_index(i).unwrap().name().to_string())
        .collect()
}

fn lib_x() -> VdbDescriptor {
    let mut vdb = VdbDescriptor::new("libX", "1.0");
    vdb.add_model(ModelMetadata::new("M1"));
    vdb.add_data_policy(DataPolicy::new("readers").grant_all());
    vdb
}

// ---------------------------------------------------------------------------
// package
// ---------------------------------------------------------------------------

#[test]
fn package_merges_dependency_and_writes_archive() {
    let dir = TempDir::new("package_merge");
    let mut top = VdbDescriptor::new("portfolio", "1");
    top.imports.push(Import::new("libX", "1.0").with_data_policies());
    write_project(&dir, &top);
    let dep = write_dependency(&dir, "libx-1.0.vdb", &lib_x());

    let out = vdb_package(&[
        "package",
        "--base",
        dir.path().to_str().unwrap(),
        "--final-name",
        "portfolio",
        "--dependency",
        &format!("libx={}", dep.display()),
    ]);

    assert!(
        out.status.success(),
        "package should succeed: {}",
        String::from_utf8_lossy(&out.stderr)
    );
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("Merged libX@1.0 from 'libx'"));

    let archive = dir.join("target/portfolio.vdb");
    let names = archive_names(&archive);
    assert!(names.contains(&"ddl/M1.ddl".to_string()));
    assert_eq!(names.last().map(String::as_str), Some("META-INF/vdb.xml"));
    assert!(dir.join("target/vdb.xml").is_file());
}

#[test]
fn package_reports_unresolved_imports() {
    let dir = TempDir::new("package_unresolved");
    let mut top = VdbDescriptor::new("portfolio", "1");
    top.imports.push(Import::new("libX", "1.0"));
    write_project(&dir, &top);

    let out = vdb_package(&["package", "--base", dir.path().to_str().unwrap()]);

    assert!(out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("libX@1.0"), "stderr: {stderr}");
    assert!(dir.join("target/vdb.vdb").is_file());
}

#[test]
fn package_fails_on_nested_import() {
    let dir = TempDir::new("package_nested");
    let mut top = VdbDescriptor::new("portfolio", "1");
    top.imports.push(Import::new("libX", "1.0"));
    write_project(&dir, &top);
    let mut nested = lib_x();
    nested.imports.push(Import::new("libZ", "1"));
    let dep = write_dependency(&dir, "libx-1.0.vdb", &nested);

    let out = vdb_package(&[
        "package",
        "--base",
        dir.path().to_str().unwrap(),
        "--dependency",
        &format!("libx={}", dep.display()),
    ]);

    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(
        stderr.lines().any(|line| line.starts_with("error:")),
        "stderr: {stderr}"
    );
    assert!(stderr.contains("libX@1.0"));
    assert!(!dir.join("target/vdb.vdb").exists());
}

#[test]
fn package_logs_progress_at_info_by_default() {
    let dir = TempDir::new("package_info_log");
    write_project(&dir, &VdbDescriptor::new("portfolio", "1"));

    let out = std::process::Command::new(env!("CARGO_BIN_EXE_vdb-package"))
        .args(["package", "--base", dir.path().to_str().unwrap()])
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run vdb-package");

    assert!(out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("Packaged VDB"), "stderr: {stderr}");
    assert!(!stderr.contains("DEBUG"), "stderr: {stderr}");
}

#[test]
fn package_without_descriptor_fails() {
    let dir = TempDir::new("package_no_descriptor");

    let out = vdb_package(&["package", "--base", dir.path().to_str().unwrap()]);

    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("descriptor"));
}

#[test]
fn package_reads_config_file() {
    let dir = TempDir::new("package_config");
    write_project(&dir, &VdbDescriptor::new("portfolio", "1"));
    fs::write(dir.join("NOTICE"), "notice").unwrap();
    fs::write(
        dir.join("vdb-package.yaml"),
        "final_name: from-config\nincludes:\n  - NOTICE\n",
    )
    .unwrap();

    let out = vdb_package(&["package", "--base", dir.path().to_str().unwrap()]);

    assert!(
        out.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&out.stderr)
    );
    let names = archive_names(&dir.join("target/from-config.vdb"));
    assert!(names.contains(&"NOTICE".to_string()));
}

// ---------------------------------------------------------------------------
// merge / inspect / init-config
// ---------------------------------------------------------------------------

#[test]
fn merge_writes_merged_descriptor() {
    let dir = TempDir::new("merge");
    let mut top = VdbDescriptor::new("portfolio", "1");
    top.imports.push(Import::new("libX", "1.0").with_data_policies());
    let descriptor = write_project(&dir, &top);
    let dep = write_dependency(&dir, "libx-1.0.vdb", &lib_x());
    let merged_path = dir.join("merged/vdb.xml");

    let out = vdb_package(&[
        "merge",
        "--descriptor",
        descriptor.to_str().unwrap(),
        "--dependency",
        &format!("libx={}", dep.display()),
        "--scratch",
        dir.join("scratch").to_str().unwrap(),
        "--output",
        merged_path.to_str().unwrap(),
    ]);

    assert!(
        out.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&out.stderr)
    );
    let merged = vdb_core::parse_descriptor(&fs::read(&merged_path).unwrap()).unwrap();
    assert!(merged.imports.is_empty());
    assert!(merged.models.contains_key("M1"));
    assert!(merged.data_policies["readers"].schemas.contains("M1"));
}

#[test]
fn inspect_prints_json() {
    let dir = TempDir::new("inspect");
    let archive = write_dependency(&dir, "libx-1.0.vdb", &lib_x());

    let out = vdb_package(&["inspect", archive.to_str().unwrap(), "--format", "json"]);

    assert!(out.status.success());
    let json: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(json["name"], "libX");
    assert_eq!(json["version"], "1.0");
    assert!(json["models"]["M1"].is_object());
}

#[test]
fn inspect_prints_xml_by_default() {
    let dir = TempDir::new("inspect_xml");
    let archive = write_dependency(&dir, "libx-1.0.vdb", &lib_x());

    let out = vdb_package(&["inspect", archive.to_str().unwrap()]);

    assert!(out.status.success());
    let parsed = vdb_core::parse_descriptor(&out.stdout).unwrap();
    assert_eq!(parsed, lib_x());
}

#[test]
fn init_config_writes_defaults_and_refuses_overwrite() {
    let dir = TempDir::new("init_config");
    let path = dir.join("vdb-package.yaml");

    let out = vdb_package(&["init-config", path.to_str().unwrap()]);
    assert!(out.status.success());
    let mut raw = String::new();
    fs::File::open(&path)
        .unwrap()
        .read_to_string(&mut raw)
        .unwrap();
    assert!(raw.contains("resource_dir: src/main/vdb"));

    let again = vdb_package(&["init-config", path.to_str().unwrap()]);
    assert!(!again.status.success());
    assert!(String::from_utf8_lossy(&again.stderr).contains("--force"));

    let forced = vdb_package(&["init-config", path.to_str().unwrap(), "--force"]);
    assert!(forced.status.success());
}
