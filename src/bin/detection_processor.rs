//! detection-processor - run the object detector over an image or video
//!
//! Prints a single pretty-printed JSON envelope on stdout. Exit status is 0
//! when the envelope reports `completed` and 1 otherwise (including bad
//! usage, which still produces a JSON error object).

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

use vision_probe::{load_backend, processor, ProcessorConfig, ResultEnvelope, UsageError};

const USAGE: &str = "Usage: detection-processor <file_path>";

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Detect objects in an image or video and print JSON results"
)]
struct Args {
    /// Image (.jpg .jpeg .png .gif .bmp) or video (.mp4 .avi .mov .wmv .mkv).
    file_path: PathBuf,

    /// ONNX model to load (overrides VISION_MODEL_PATH and the config file).
    #[arg(long)]
    model: Option<PathBuf>,

    /// Newline-delimited class names (defaults to the COCO labels).
    #[arg(long)]
    classes: Option<PathBuf>,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err)
            if matches!(
                err.kind(),
                clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion
            ) =>
        {
            err.exit()
        }
        Err(err) => {
            log::debug!("argument error: {}", err);
            return emit_usage_error();
        }
    };

    let envelope = match ProcessorConfig::load() {
        Ok(mut config) => {
            if let Some(model) = args.model {
                config.detector.model_path = model;
            }
            if let Some(classes) = args.classes {
                config.detector.classes_path = Some(classes);
            }
            processor::run(&args.file_path, &config, load_backend)
        }
        Err(err) => ResultEnvelope::failed(processor::file_name(&args.file_path), &err),
    };

    emit(&envelope)
}

fn emit(envelope: &ResultEnvelope) -> ExitCode {
    match envelope.to_json() {
        Ok(json) => {
            println!("{}", json);
            ExitCode::from(envelope.exit_code())
        }
        Err(err) => {
            eprintln!("failed to serialize result: {}", err);
            ExitCode::from(1)
        }
    }
}

fn emit_usage_error() -> ExitCode {
    match serde_json::to_string(&UsageError::new(USAGE)) {
        Ok(json) => println!("{}", json),
        Err(_) => eprintln!("{}", USAGE),
    }
    ExitCode::from(1)
}
