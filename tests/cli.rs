use assert_cmd::Command;
use predicates::prelude::*;
use std::error::Error;
use tempfile::tempdir;

fn probe_cmd() -> Command {
    let mut cmd = Command::cargo_bin("dimension-probe").expect("dimension-probe binary");
    cmd.env_remove("RUST_LOG");
    cmd
}

fn processor_cmd() -> Command {
    let mut cmd = Command::cargo_bin("detection-processor").expect("detection-processor binary");
    for key in [
        "RUST_LOG",
        "VISION_CONFIG",
        "VISION_MODEL_PATH",
        "VISION_CLASSES_PATH",
        "VISION_INPUT_SIZE",
        "VISION_CONF_THRESHOLD",
        "VISION_IOU_THRESHOLD",
        "VISION_MAX_DETECTIONS",
        "VISION_FALLBACK_STRIDE",
    ] {
        cmd.env_remove(key);
    }
    cmd
}

fn stdout_json(output: &std::process::Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).expect("stdout is a JSON document")
}

#[test]
fn probe_prints_width_and_height() {
    probe_cmd()
        .arg("stub://1280x720?fps=30&frames=1")
        .assert()
        .success()
        .stdout("1280,720\n");
}

#[test]
fn probe_missing_file_fails_without_stdout() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let missing = dir.path().join("missing.mp4");

    probe_cmd()
        .arg(&missing)
        .assert()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::starts_with("Error"));
    Ok(())
}

#[test]
fn probe_requires_exactly_one_path() {
    probe_cmd()
        .assert()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("Usage: dimension-probe"));

    probe_cmd()
        .args(["a.mp4", "b.mp4"])
        .assert()
        .code(1)
        .stdout(predicate::str::is_empty());
}

#[test]
fn processor_usage_error_is_json() {
    let output = processor_cmd().output().expect("run detection-processor");
    assert_eq!(output.status.code(), Some(1));

    let json = stdout_json(&output);
    assert_eq!(json["status"], "failed");
    assert_eq!(json["error"], "Usage: detection-processor <file_path>");
}

#[test]
fn processor_missing_file_is_failed_envelope() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let missing = dir.path().join("nothing.jpg");

    let output = processor_cmd().arg(&missing).output()?;
    assert_eq!(output.status.code(), Some(1));

    let json = stdout_json(&output);
    assert_eq!(json["status"], "failed");
    assert_eq!(json["fileName"], "nothing.jpg");
    assert_eq!(json["totalDetections"], 0);
    assert!(json["errorMessage"]
        .as_str()
        .unwrap()
        .starts_with("File not found:"));
    Ok(())
}

#[test]
fn processor_unsupported_extension_is_failed_envelope() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let doc = dir.path().join("report.pdf");
    std::fs::write(&doc, "%PDF-1.7")?;

    let output = processor_cmd().arg(&doc).output()?;
    assert_eq!(output.status.code(), Some(1));

    let json = stdout_json(&output);
    assert_eq!(json["status"], "failed");
    assert_eq!(json["fileType"], "UNKNOWN");
    assert_eq!(json["errorMessage"], "Unsupported file type: .pdf");
    assert_eq!(json["detections"], serde_json::json!([]));
    Ok(())
}

#[test]
fn processor_missing_model_is_failed_envelope() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let image_path = dir.path().join("frame.png");
    image::RgbImage::from_pixel(8, 8, image::Rgb([1, 2, 3])).save(&image_path)?;
    let model = dir.path().join("absent.onnx");

    let output = processor_cmd()
        .arg(&image_path)
        .arg("--model")
        .arg(&model)
        .output()?;
    assert_eq!(output.status.code(), Some(1));

    let json = stdout_json(&output);
    assert_eq!(json["status"], "failed");
    assert_eq!(json["fileName"], "frame.png");
    assert!(json["errorMessage"]
        .as_str()
        .unwrap()
        .contains("absent.onnx"));
    Ok(())
}

#[test]
fn processor_invalid_config_is_failed_envelope() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let image_path = dir.path().join("frame.png");
    image::RgbImage::from_pixel(8, 8, image::Rgb([1, 2, 3])).save(&image_path)?;

    let output = processor_cmd()
        .arg(&image_path)
        .env("VISION_CONF_THRESHOLD", "2")
        .output()?;
    assert_eq!(output.status.code(), Some(1));

    let json = stdout_json(&output);
    assert_eq!(json["status"], "failed");
    assert!(json["errorMessage"]
        .as_str()
        .unwrap()
        .contains("confidence threshold"));
    Ok(())
}
