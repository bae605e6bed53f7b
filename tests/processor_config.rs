use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

use tempfile::{Builder, NamedTempFile};

use vision_probe::config::ProcessorConfig;

static ENV_LOCK: Mutex<()> = Mutex::new(());

const ENV_KEYS: [&str; 8] = [
    "VISION_CONFIG",
    "VISION_MODEL_PATH",
    "VISION_CLASSES_PATH",
    "VISION_INPUT_SIZE",
    "VISION_CONF_THRESHOLD",
    "VISION_IOU_THRESHOLD",
    "VISION_MAX_DETECTIONS",
    "VISION_FALLBACK_STRIDE",
];

fn clear_env() {
    for key in ENV_KEYS {
        std::env::remove_var(key);
    }
}

#[test]
fn defaults_without_file_or_env() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let cfg = ProcessorConfig::load().expect("load defaults");

    assert_eq!(cfg.detector.model_path, PathBuf::from("yolov8n.onnx"));
    assert_eq!(cfg.detector.classes_path, None);
    assert_eq!(cfg.detector.input_size, 640);
    assert_eq!(cfg.detector.decode.confidence_threshold, 0.25);
    assert_eq!(cfg.detector.decode.iou_threshold, 0.7);
    assert_eq!(cfg.detector.decode.max_detections, 300);
    assert_eq!(cfg.fallback_stride, 30);
}

#[test]
fn loads_json_config_with_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    let json = r#"{
        "model": {
            "path": "/opt/models/yolo11s.onnx",
            "classes_path": "/opt/models/labels.txt",
            "input_size": 320,
            "confidence_threshold": 0.4
        },
        "video": {
            "fallback_stride": 15
        }
    }"#;
    file.write_all(json.as_bytes()).expect("write config");

    std::env::set_var("VISION_CONFIG", file.path());
    std::env::set_var("VISION_IOU_THRESHOLD", "0.5");
    std::env::set_var("VISION_MODEL_PATH", "/srv/yolov10n.onnx");

    let cfg = ProcessorConfig::load().expect("load config");

    assert_eq!(cfg.detector.model_path, PathBuf::from("/srv/yolov10n.onnx"));
    assert_eq!(
        cfg.detector.classes_path,
        Some(PathBuf::from("/opt/models/labels.txt"))
    );
    assert_eq!(cfg.detector.input_size, 320);
    assert_eq!(cfg.detector.decode.confidence_threshold, 0.4);
    assert_eq!(cfg.detector.decode.iou_threshold, 0.5);
    assert_eq!(cfg.detector.decode.max_detections, 300);
    assert_eq!(cfg.fallback_stride, 15);

    clear_env();
}

#[test]
fn loads_toml_config() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("temp config");
    let toml = r#"
[model]
path = "models/custom.onnx"
max_detections = 50

[video]
fallback_stride = 10
"#;
    file.write_all(toml.as_bytes()).expect("write config");
    std::env::set_var("VISION_CONFIG", file.path());

    let cfg = ProcessorConfig::load().expect("load config");

    assert_eq!(cfg.detector.model_path, PathBuf::from("models/custom.onnx"));
    assert_eq!(cfg.detector.decode.max_detections, 50);
    assert_eq!(cfg.fallback_stride, 10);

    clear_env();
}

#[test]
fn rejects_invalid_values() {
    let _guard = ENV_LOCK.lock().unwrap();

    for (key, value, expected) in [
        ("VISION_CONF_THRESHOLD", "1.5", "confidence threshold"),
        ("VISION_IOU_THRESHOLD", "abc", "VISION_IOU_THRESHOLD must be"),
        ("VISION_INPUT_SIZE", "300", "multiple of 32"),
        ("VISION_INPUT_SIZE", "40000", "at most 4096"),
        ("VISION_FALLBACK_STRIDE", "0", "stride"),
        ("VISION_MAX_DETECTIONS", "0", "max detections"),
    ] {
        clear_env();
        std::env::set_var(key, value);
        let err = ProcessorConfig::load().expect_err(key);
        assert!(
            err.to_string().contains(expected),
            "{}={} gave '{}'",
            key,
            value,
            err
        );
    }

    clear_env();
}

#[test]
fn unknown_config_fields_are_rejected() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    file.write_all(br#"{"model": {"weights": "yolo.pt"}}"#)
        .expect("write config");
    std::env::set_var("VISION_CONFIG", file.path());

    let err = ProcessorConfig::load().expect_err("unknown field");
    assert!(err.to_string().contains("invalid config file"));

    clear_env();
}
