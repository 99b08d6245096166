use assert_cmd::cargo::cargo_bin_cmd;
use serde_json::Value;
use std::error::Error;
use std::path::{Path, PathBuf};

fn write_u16(dir: &Path, name: &str, values: &[u16]) -> PathBuf {
    let path = dir.join(name);
    let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
    std::fs::write(&path, bytes).expect("write fixture");
    path
}

fn write_u32(dir: &Path, name: &str, values: &[u32]) -> PathBuf {
    let path = dir.join(name);
    let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
    std::fs::write(&path, bytes).expect("write fixture");
    path
}

fn workspace_root() -> PathBuf {
    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    manifest_dir
        .parent()
        .expect("crates dir")
        .parent()
        .expect("workspace root")
        .to_path_buf()
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

#[test]
fn decode_summarizes_channels_with_name_based_widths() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let samples = write_u32(dir.path(), "samples.bin", &[70_000, 3]);
    let bay = write_u16(dir.path(), "Bay.bin", &[1, 2, 3]);
    let notes = dir.path().join("notes.txt");
    std::fs::write(&notes, "hello")?;

    let mut cmd = cargo_bin_cmd!("binpeak");
    cmd.args(["decode", &path_arg(&samples), &path_arg(&bay), &path_arg(&notes)]);
    let out = cmd.assert().success().get_output().stdout.clone();
    let json: Value = serde_json::from_slice(&out)?;

    let channels = json["channels"].as_array().expect("channels");
    assert_eq!(channels.len(), 2);
    assert_eq!(channels[0]["name"], "Bay.bin");
    assert_eq!(channels[0]["width"], "u16");
    assert_eq!(channels[0]["len"], 3);
    assert_eq!(channels[1]["name"], "samples.bin");
    assert_eq!(channels[1]["width"], "u32");
    assert_eq!(channels[1]["max"], 70000.0);

    let notices = json["notices"].as_array().expect("notices");
    assert_eq!(notices.len(), 3);
    assert_eq!(notices[2]["kind"], "unsupported");
    assert_eq!(notices[2]["extension"], "txt");
    Ok(())
}

#[test]
fn analyze_runs_detection_on_reference() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let reference = write_u16(
        dir.path(),
        "bay_1_left_VL.bin",
        &[0, 0, 0, 0, 0, 100, 100, 0, 0, 0],
    );
    let other = write_u16(dir.path(), "aux.bin", &[5, 250]);

    let mut cmd = cargo_bin_cmd!("binpeak");
    cmd.args(["analyze", &path_arg(&reference), &path_arg(&other)]);
    let out = cmd.assert().success().get_output().stdout.clone();
    let json: Value = serde_json::from_slice(&out)?;

    assert_eq!(json["reference"], "bay_1_left_VL.bin");
    assert_eq!(json["detection"]["rising"], serde_json::json!([4]));
    assert_eq!(json["detection"]["falling"], serde_json::json!([7]));
    assert_eq!(json["detection"]["peaks"], serde_json::json!([5]));
    assert_eq!(json["range"]["min"], 0.0);
    assert_eq!(json["range"]["max"], 250.0);
    Ok(())
}

#[test]
fn analyze_fails_without_reference() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let other = write_u16(dir.path(), "aux.bin", &[5, 6]);

    let mut cmd = cargo_bin_cmd!("binpeak");
    cmd.args(["analyze", &path_arg(&other)]);
    let err = cmd.assert().failure().get_output().stderr.clone();
    assert!(String::from_utf8(err)?.contains("No bay_1_left_VL.bin found"));
    Ok(())
}

#[test]
fn config_file_changes_reference_and_width() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let reference = write_u32(
        dir.path(),
        "bay_2_right.bin",
        &[0, 0, 0, 0, 0, 100, 100, 0, 0, 0],
    );
    let config = workspace_root().join("test_data/bay2_reference.toml");

    let mut cmd = cargo_bin_cmd!("binpeak");
    cmd.args([
        "--config",
        &path_arg(&config),
        "analyze",
        &path_arg(&reference),
    ]);
    let out = cmd.assert().success().get_output().stdout.clone();
    let json: Value = serde_json::from_slice(&out)?;
    assert_eq!(json["reference"], "bay_2_right.bin");
    assert_eq!(json["channels"][0]["width"], "u32");
    assert_eq!(json["detection"]["peaks"], serde_json::json!([5]));
    Ok(())
}
