//! Video dimension probe.

use anyhow::{anyhow, Result};

use crate::ingest::VideoSource;

/// Frame size reported by a video container.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// `width,height`, as printed by `dimension-probe`.
impl std::fmt::Display for Dimensions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{}", self.width, self.height)
    }
}

/// Open `path` as a video and read its frame size. No frames are decoded.
pub fn probe_dimensions(path: &str) -> Result<Dimensions> {
    let source = VideoSource::open(path)?;
    let props = source.properties();
    if props.width == 0 || props.height == 0 {
        return Err(anyhow!(
            "video stream in {} reports no frame dimensions",
            path
        ));
    }
    Ok(Dimensions {
        width: props.width,
        height: props.height,
    })
}
