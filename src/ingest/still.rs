use anyhow::{Context, Result};
use image::ImageReader;
use std::path::Path;

use crate::frame::Frame;

/// Decode an image file into an RGB24 frame.
///
/// The decoder is chosen from the file contents, not the extension.
/// Animated GIFs contribute their first frame only.
pub fn load_image(path: &Path) -> Result<Frame> {
    let decoded = ImageReader::open(path)
        .and_then(|reader| reader.with_guessed_format())
        .map_err(image::ImageError::IoError)
        .and_then(|reader| reader.decode())
        .with_context(|| format!("Could not load image: {}", path.display()))?;
    let frame = Frame::from(decoded.to_rgb8());
    log::debug!(
        "decoded image {} ({}x{})",
        path.display(),
        frame.width,
        frame.height
    );
    Ok(frame)
}
