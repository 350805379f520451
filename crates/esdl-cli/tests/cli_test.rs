//! Command-line behavior that needs no network access

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// `esdl` with its configuration directory redirected into `home`
fn esdl(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("esdl").unwrap();
    cmd.env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path().join(".config"))
        .env_remove("ESDL_REGION")
        .env_remove("ESDL_ENDPOINT")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_help_lists_commands() {
    let home = TempDir::new().unwrap();
    esdl(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("ls"))
        .stdout(predicate::str::contains("get"))
        .stdout(predicate::str::contains("open"))
        .stdout(predicate::str::contains("read"));
}

#[test]
fn test_get_help_shows_include() {
    let home = TempDir::new().unwrap();
    esdl(&home)
        .args(["get", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--include"))
        .stdout(predicate::str::contains("--recursive"));
}

#[test]
fn test_unsupported_scheme_is_invalid_location() {
    let home = TempDir::new().unwrap();
    esdl(&home)
        .args(["ls", "ftp://example.com/cube.zarr"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("unsupported scheme"));
}

#[test]
fn test_missing_bucket_is_invalid_location() {
    let home = TempDir::new().unwrap();
    esdl(&home)
        .args(["open", "s3:///cube.zarr"])
        .assert()
        .code(3);
}

#[test]
fn test_sources_in_different_buckets() {
    let home = TempDir::new().unwrap();
    esdl(&home)
        .args(["get", "a/cube.zarr", "b/cube.zarr", "-o"])
        .arg(home.path().join("out"))
        .assert()
        .code(3)
        .stderr(predicate::str::contains("sources span buckets"));
}

#[test]
fn test_get_requires_a_source() {
    let home = TempDir::new().unwrap();
    esdl(&home).arg("get").assert().code(3);
}

#[test]
fn test_bad_chunk_index() {
    let home = TempDir::new().unwrap();
    esdl(&home)
        .args(["read", "bucket/cube.zarr", "gpp", "--chunk", "1,x"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("invalid value"));
}

#[test]
fn test_config_path_and_show() {
    let home = TempDir::new().unwrap();

    let output = esdl(&home).args(["config", "--path"]).output().unwrap();
    assert!(output.status.success());
    let path = String::from_utf8(output.stdout).unwrap();
    assert!(path.trim().ends_with("config.toml"));
    assert!(path.contains("esdl"));

    esdl(&home)
        .args(["config", "--show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[store]"))
        .stdout(predicate::str::contains("esdl-esdc-v2.0.1"))
        .stdout(predicate::str::contains("[download]"));
}

/// Write `contents` to the configuration file `esdl` reads under `home`
fn write_config(home: &TempDir, contents: &str) {
    let output = esdl(home).args(["config", "--path"]).output().unwrap();
    let path = String::from_utf8(output.stdout).unwrap();
    let path = std::path::Path::new(path.trim());
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, contents).unwrap();
}

#[test]
fn test_malformed_config_is_reported() {
    let home = TempDir::new().unwrap();
    write_config(&home, "[store]\nanonymous = flase\n");

    esdl(&home)
        .args(["ls", "esdl-test"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Configuration error"));

    // the path stays reachable so the file can be fixed
    esdl(&home).args(["config", "--path"]).assert().success();
}

#[test]
fn test_config_region_reaches_store_options() {
    let home = TempDir::new().unwrap();
    write_config(&home, "[store]\nregion = \"us-west-2\"\n");

    esdl(&home)
        .args(["-v", "ls", "ftp://example.com/cube.zarr"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("us-west-2"));
}

#[test]
#[ignore = "Requires network access to the public archive"]
fn test_e2e_list_public_bucket() {
    let home = TempDir::new().unwrap();
    esdl(&home)
        .args(["ls", "esdl-esdc-v2.0.1"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "esdl-esdc-v2.0.1/Cube_2019highColombiaCube_184x120x120.zarr",
        ));
}

#[test]
#[ignore = "Requires network access to the public archive"]
fn test_e2e_open_public_cube() {
    let home = TempDir::new().unwrap();
    esdl(&home)
        .args([
            "open",
            "https://s3.eu-central-1.amazonaws.com/esdl-esdc-v2.0.1/Cube_2019highColombiaCube_184x120x120.zarr",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("time: 184"));
}
