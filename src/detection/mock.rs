use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

use super::{DetectorError, LogoDetection};

/// Scripted detector for tests: returns a fixed outcome and records every call.
#[derive(Debug)]
pub struct MockLogoDetector {
    outcome: Result<bool, String>,
    available: bool,
    calls: AtomicUsize,
    seen: Mutex<Vec<(PathBuf, f32)>>,
}

impl MockLogoDetector {
    /// A loaded detector that always answers `detected`.
    pub fn new(detected: bool) -> Self {
        Self {
            outcome: Ok(detected),
            available: true,
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// A detector with no model (always answers `false`).
    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new(false)
        }
    }

    /// A detector whose every call fails with an inference error.
    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            outcome: Err(reason.into()),
            ..Self::new(false)
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Thresholds passed to `detect`, in call order.
    pub fn thresholds(&self) -> Vec<f32> {
        self.seen.lock().iter().map(|(_, t)| *t).collect()
    }

    /// Image paths passed to `detect`, in call order.
    pub fn images(&self) -> Vec<PathBuf> {
        self.seen.lock().iter().map(|(p, _)| p.clone()).collect()
    }
}

impl LogoDetection for MockLogoDetector {
    fn detect(&self, image: &Path, confidence_threshold: f32) -> Result<bool, DetectorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen
            .lock()
            .push((image.to_path_buf(), confidence_threshold));

        if !self.available {
            return Ok(false);
        }

        match &self.outcome {
            Ok(detected) => Ok(*detected),
            Err(reason) => Err(DetectorError::InferenceFailed {
                reason: reason.clone(),
            }),
        }
    }

    fn is_available(&self) -> bool {
        self.available
    }
}
