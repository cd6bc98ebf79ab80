use candle_core::Device;
use tracing::debug;

#[cfg(any(feature = "metal", feature = "cuda"))]
use tracing::{info, warn};

use super::error::EmbeddingError;

/// Selects the compute device for `component` based on enabled features (falls back to CPU).
///
/// The sentence embedder and the logo detector call this independently; `component` only
/// labels the log lines.
pub fn select_device(component: &str) -> Result<Device, EmbeddingError> {
    #[cfg(any(feature = "metal", feature = "cuda"))]
    let mut failures: Vec<String> = Vec::new();

    #[cfg(feature = "metal")]
    {
        match Device::new_metal(0) {
            Ok(device) => {
                info!(component, "Using Metal GPU acceleration");
                return Ok(device);
            }
            Err(e) => {
                let msg = e.to_string();
                warn!(component, error = %msg, "Metal device unavailable");
                failures.push(format!("metal failed: {msg}"));
            }
        }
    }

    #[cfg(feature = "cuda")]
    {
        match Device::new_cuda(0) {
            Ok(device) => {
                info!(component, "Using CUDA GPU acceleration");
                return Ok(device);
            }
            Err(e) => {
                let msg = e.to_string();
                warn!(component, error = %msg, "CUDA device unavailable");
                failures.push(format!("cuda failed: {msg}"));
            }
        }
    }

    #[cfg(any(feature = "metal", feature = "cuda"))]
    warn!(component, reason = %failures.join("; "), "Falling back to CPU device");

    debug!(component, "Using CPU device");
    Ok(Device::Cpu)
}
