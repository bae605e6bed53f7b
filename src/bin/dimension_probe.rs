//! dimension-probe - print a video's frame size as `width,height`
//!
//! Exit status is 0 on success. On any failure nothing is written to stdout,
//! a one-line reason goes to stderr, and the exit status is 1.

use clap::Parser;
use std::process::ExitCode;

use vision_probe::probe_dimensions;

const USAGE: &str = "Usage: dimension-probe <video_file_path>";

#[derive(Parser, Debug)]
#[command(author, version, about = "Print a video's frame dimensions as width,height")]
struct Args {
    /// Path to a local video file.
    video_path: String,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) if is_informational(&err) => err.exit(),
        Err(_) => {
            eprintln!("{}", USAGE);
            return ExitCode::from(1);
        }
    };

    match probe_dimensions(&args.video_path) {
        Ok(dims) => {
            println!("{}", dims);
            ExitCode::SUCCESS
        }
        Err(err) => {
            log::debug!("probe of {} failed: {:#}", args.video_path, err);
            if err.chain().any(|cause| cause.to_string().starts_with("Could not open video")) {
                eprintln!("Error: Could not open video file");
            } else {
                eprintln!("Error reading video: {:#}", err);
            }
            ExitCode::from(1)
        }
    }
}

fn is_informational(err: &clap::Error) -> bool {
    matches!(
        err.kind(),
        clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion
    )
}
