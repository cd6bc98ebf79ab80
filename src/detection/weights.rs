//! Detector weight loading.
//!
//! Trust is decided per call: a trusted file is memory-mapped, anything else is read into
//! memory and parsed from the buffer. Nothing global changes between calls.

use std::path::Path;

use candle_core::{DType, Device};
use candle_nn::VarBuilder;
use tracing::debug;

use super::error::DetectorError;

/// Whether a weights file comes from a source the operator vouches for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WeightTrust {
    /// Memory-map the file; it must not change while the process runs.
    Trusted,
    /// Copy the file into memory before parsing.
    #[default]
    Untrusted,
}

impl WeightTrust {
    pub fn from_flag(trusted: bool) -> Self {
        if trusted {
            WeightTrust::Trusted
        } else {
            WeightTrust::Untrusted
        }
    }
}

/// Returns `true` if `path` has a `.safetensors` extension (case-insensitive).
pub fn is_safetensors(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("safetensors"))
}

/// Opens a safetensors weights file as a [`VarBuilder`].
pub fn load_var_builder(
    path: &Path,
    trust: WeightTrust,
    device: &Device,
) -> Result<VarBuilder<'static>, DetectorError> {
    if !is_safetensors(path) {
        return Err(DetectorError::UnsupportedWeights {
            path: path.to_path_buf(),
        });
    }

    let load_failed = |reason: String| DetectorError::LoadFailed {
        path: path.to_path_buf(),
        reason,
    };

    debug!(path = %path.display(), ?trust, "Opening detector weights");

    match trust {
        WeightTrust::Trusted => {
            // SAFETY: the operator marked the file as trusted; it is not modified while mapped.
            unsafe { VarBuilder::from_mmaped_safetensors(&[path], DType::F32, device) }
                .map_err(|e| load_failed(e.to_string()))
        }
        WeightTrust::Untrusted => {
            let bytes = std::fs::read(path).map_err(|e| load_failed(e.to_string()))?;
            VarBuilder::from_buffered_safetensors(bytes, DType::F32, device)
                .map_err(|e| load_failed(e.to_string()))
        }
    }
}
