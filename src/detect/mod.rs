mod backend;
mod backends;
pub mod classes;
pub mod postprocess;
mod result;

use anyhow::Result;

use crate::config::DetectorSettings;

pub use backend::DetectorBackend;
pub use backends::StubBackend;
#[cfg(feature = "backend-tract")]
pub use backends::TractBackend;
pub use classes::ClassNames;
pub use postprocess::{DecodeParams, InputScale};
pub use result::{BoundingBox, Detection};

/// Build the configured model backend.
///
/// The ONNX runtime is an optional dependency; builds without it report the
/// missing library here instead of failing at link time.
pub fn load_backend(settings: &DetectorSettings) -> Result<Box<dyn DetectorBackend>> {
    #[cfg(feature = "backend-tract")]
    {
        let mut backend = TractBackend::from_settings(settings)?;
        backend.warm_up()?;
        log::info!(
            "detector backend '{}' ready ({})",
            backend.name(),
            settings.model_path.display()
        );
        Ok(Box::new(backend))
    }
    #[cfg(not(feature = "backend-tract"))]
    {
        Err(anyhow::anyhow!(
            "object detection library unavailable: rebuild with the backend-tract feature to load {}",
            settings.model_path.display()
        ))
    }
}
