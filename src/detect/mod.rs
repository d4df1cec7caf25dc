//! Face detection.
//!
//! Backends turn a frame into normalised candidate boxes; `Detection` carries
//! them into frame pixel space for the tracking layer.

mod backend;
mod backends;
pub mod preprocess;
mod result;
pub mod ssd;

use std::path::Path;

use anyhow::{anyhow, Context, Result};

use crate::config::DetectorSettings;

pub use backend::DetectorBackend;
pub use backends::StubBackend;
#[cfg(feature = "backend-tract")]
pub use backends::TractBackend;
pub use result::{Detection, RawDetection};

/// Open the detector named by the CLI's topology/weights pair.
///
/// A `stub://` topology selects the synthetic bright-region detector; anything
/// else is loaded as a real model. Failure is a setup error.
#[cfg_attr(not(feature = "backend-tract"), allow(unused_variables))]
pub fn open_backend(
    topology: &Path,
    weights: &Path,
    settings: &DetectorSettings,
) -> Result<Box<dyn DetectorBackend>> {
    let stub = topology.to_string_lossy().starts_with("stub://");
    let mut backend: Box<dyn DetectorBackend> = if stub {
        Box::new(StubBackend::new())
    } else {
        check_model_pair(topology, weights)?;
        #[cfg(feature = "backend-tract")]
        {
            Box::new(TractBackend::new(topology, weights, settings)?)
        }
        #[cfg(not(feature = "backend-tract"))]
        {
            anyhow::bail!(
                "loading detector {} requires the backend-tract feature",
                topology.display()
            )
        }
    };
    backend.warm_up()?;
    log::info!("detector backend: {}", backend.name());
    Ok(backend)
}

/// Both model files must exist and share a directory; the weights are
/// resolved relative to the topology. Paths are compared after resolving
/// `.`, `..` and symlinks.
pub fn check_model_pair(topology: &Path, weights: &Path) -> Result<()> {
    if !weights.is_file() {
        return Err(anyhow!("detector weights {} not found", weights.display()));
    }
    let topology_dir = std::fs::canonicalize(topology)
        .with_context(|| format!("detector topology {} not found", topology.display()))?
        .parent()
        .map(Path::to_path_buf);
    let weights_dir = std::fs::canonicalize(weights)
        .with_context(|| format!("failed to resolve {}", weights.display()))?
        .parent()
        .map(Path::to_path_buf);
    if topology_dir != weights_dir {
        return Err(anyhow!(
            "detector weights {} must sit beside topology {}",
            weights.display(),
            topology.display()
        ));
    }
    Ok(())
}
