//! Media sources.
//!
//! - Still images (JPEG, PNG, GIF, BMP) decoded with the `image` crate
//! - Local video files (feature: ingest-file-ffmpeg)
//! - Synthetic `stub://` video (testing)
//!
//! Every source yields RGB24 `Frame`s. Video sources own their decoder and
//! release it when dropped, so a capture handle never outlives the call that
//! opened it.

#[cfg(feature = "ingest-file-ffmpeg")]
pub(crate) mod file_ffmpeg;
pub mod still;
pub mod video;

pub use still::load_image;
pub use video::{SyntheticConfig, VideoProperties, VideoSource};
