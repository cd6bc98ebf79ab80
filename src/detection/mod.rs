//! Halal logo detection.
//!
//! [`LogoDetection`] is the seam the analysis pipeline depends on. [`YoloLogoDetector`]
//! runs a YOLOv8 model loaded from safetensors; when the weights file is missing it stays
//! usable but reports "no logo" for every image.

mod error;
#[cfg(any(test, feature = "mock"))]
mod mock;
pub mod weights;
pub mod yolo;


pub use error::DetectorError;
#[cfg(any(test, feature = "mock"))]
pub use mock::MockLogoDetector;
pub use weights::WeightTrust;

use std::path::{Path, PathBuf};
use std::str::FromStr;

use candle_core::{DType, Device, Module, Tensor};
use image::imageops::FilterType;
use tracing::{debug, info, instrument, warn};

use crate::constants::{DETECTOR_INPUT_SIZE, DETECTOR_PREDICT_FLOOR};
use crate::embedding::device::select_device;
use yolo::{Multiples, YoloV8};

/// Detects a certified halal logo on a product image.
pub trait LogoDetection: Send + Sync {
    /// Returns `true` if at least one box scores `confidence_threshold` or higher.
    fn detect(&self, image: &Path, confidence_threshold: f32) -> Result<bool, DetectorError>;

    /// Returns `true` when a model is loaded.
    fn is_available(&self) -> bool;
}

/// YOLOv8 variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModelSize {
    #[default]
    N,
    S,
    M,
    L,
    X,
}

impl ModelSize {
    pub fn multiples(&self) -> Multiples {
        match self {
            ModelSize::N => Multiples::n(),
            ModelSize::S => Multiples::s(),
            ModelSize::M => Multiples::m(),
            ModelSize::L => Multiples::l(),
            ModelSize::X => Multiples::x(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelSize::N => "n",
            ModelSize::S => "s",
            ModelSize::M => "m",
            ModelSize::L => "l",
            ModelSize::X => "x",
        }
    }
}

impl FromStr for ModelSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "n" => Ok(ModelSize::N),
            "s" => Ok(ModelSize::S),
            "m" => Ok(ModelSize::M),
            "l" => Ok(ModelSize::L),
            "x" => Ok(ModelSize::X),
            other => Err(format!("unknown model size '{other}' (expected n, s, m, l or x)")),
        }
    }
}

impl std::fmt::Display for ModelSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

struct LoadedModel {
    model: YoloV8,
    device: Device,
}

/// Logo detector backed by a YOLOv8 model.
pub struct YoloLogoDetector {
    model: Option<LoadedModel>,
    weights_path: PathBuf,
    input_size: u32,
}

impl std::fmt::Debug for YoloLogoDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YoloLogoDetector")
            .field("weights_path", &self.weights_path)
            .field("available", &self.model.is_some())
            .field("input_size", &self.input_size)
            .finish()
    }
}

impl YoloLogoDetector {
    /// Loads weights from `weights_path`.
    ///
    /// A missing file yields an unavailable detector (logged at warn level). A present but
    /// unreadable or malformed file is an error.
    #[instrument(skip_all, fields(path = %weights_path.display(), size = %size, num_classes))]
    pub fn load(
        weights_path: &Path,
        size: ModelSize,
        num_classes: usize,
        trust: WeightTrust,
    ) -> Result<Self, DetectorError> {
        if !weights_path.exists() {
            warn!("Logo detector weights not found; logo detection disabled");
            return Ok(Self::unavailable(weights_path));
        }

        let device = select_device("logo-detector").map_err(|e| DetectorError::LoadFailed {
            path: weights_path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let vb = weights::load_var_builder(weights_path, trust, &device)?;
        let model = YoloV8::load(vb, size.multiples(), num_classes).map_err(|e| {
            DetectorError::LoadFailed {
                path: weights_path.to_path_buf(),
                reason: e.to_string(),
            }
        })?;

        info!(?trust, ?device, "Logo detector loaded");

        Ok(Self {
            model: Some(LoadedModel { model, device }),
            weights_path: weights_path.to_path_buf(),
            input_size: DETECTOR_INPUT_SIZE as u32,
        })
    }

    /// A detector with no model; every call to `detect` returns `false`.
    pub fn unavailable(weights_path: &Path) -> Self {
        Self {
            model: None,
            weights_path: weights_path.to_path_buf(),
            input_size: DETECTOR_INPUT_SIZE as u32,
        }
    }

    /// Overrides the longer input side (rounded down to a multiple of 32, at least 32).
    pub fn with_input_size(mut self, input_size: u32) -> Self {
        self.input_size = ((input_size / 32) * 32).max(32);
        self
    }

    pub fn weights_path(&self) -> &Path {
        &self.weights_path
    }
}

impl LogoDetection for YoloLogoDetector {
    fn detect(&self, image: &Path, confidence_threshold: f32) -> Result<bool, DetectorError> {
        let Some(loaded) = &self.model else {
            debug!("Logo detector unavailable; reporting no logo");
            return Ok(false);
        };

        if !image.exists() {
            return Err(DetectorError::ImageNotFound {
                path: image.to_path_buf(),
            });
        }

        let input = preprocess(image, self.input_size, &loaded.device)?;
        let pred = loaded.model.forward(&input)?;
        let best = yolo::max_class_score(&pred)?;
        let cutoff = effective_cutoff(confidence_threshold);
        let detected = best >= cutoff;

        debug!(best_score = best, cutoff, detected, "Logo detection complete");
        Ok(detected)
    }

    fn is_available(&self) -> bool {
        self.model.is_some()
    }
}

/// Boxes under the detector's own floor never count, whatever the caller asks for.
pub fn effective_cutoff(confidence_threshold: f32) -> f32 {
    confidence_threshold.max(DETECTOR_PREDICT_FLOOR)
}

/// Returns the `(width, height)` fed to the model: the longer side becomes `target`
/// (normally [`DETECTOR_INPUT_SIZE`]) and both sides are multiples of 32.
pub fn input_dims(width: u32, height: u32, target: u32) -> (u32, u32) {
    let round = |v: u32| ((v / 32) * 32).max(32);
    if width < height {
        (round(width * target / height.max(1)), target)
    } else {
        (target, round(height * target / width.max(1)))
    }
}

fn preprocess(path: &Path, target: u32, device: &Device) -> Result<Tensor, DetectorError> {
    let original = image::ImageReader::open(path)
        .map_err(|e| DetectorError::ImageDecode {
            path: path.to_path_buf(),
            source: image::ImageError::IoError(e),
        })?
        .with_guessed_format()
        .map_err(|e| DetectorError::ImageDecode {
            path: path.to_path_buf(),
            source: image::ImageError::IoError(e),
        })?
        .decode()
        .map_err(|source| DetectorError::ImageDecode {
            path: path.to_path_buf(),
            source,
        })?;

    let (width, height) = input_dims(original.width(), original.height(), target);
    let resized = original.resize_exact(width, height, FilterType::CatmullRom);
    let data = resized.to_rgb8().into_raw();

    let tensor = Tensor::from_vec(data, (height as usize, width as usize, 3), device)?
        .permute((2, 0, 1))?
        .unsqueeze(0)?
        .to_dtype(DType::F32)?;
    Ok((tensor * (1. / 255.))?)
}
