//! Intensity and k-ratio value types.

use serde::{Deserialize, Serialize};

/// An emitted X-ray intensity with its statistical uncertainty.
///
/// Produced by the simulation runner for one detector/transition pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Intensity {
    /// Intensity value (counts, arbitrary units).
    pub value: f64,
    /// One-sigma statistical uncertainty on the value.
    pub uncertainty: f64,
}

impl Intensity {
    pub fn new(value: f64, uncertainty: f64) -> Self {
        Self { value, uncertainty }
    }

    /// Relative uncertainty, zero for a zero value.
    pub fn relative_uncertainty(&self) -> f64 {
        if self.value == 0.0 {
            0.0
        } else {
            self.uncertainty / self.value
        }
    }
}

/// A k-ratio (measured or calculated) with its uncertainty.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KRatio {
    /// Ratio of unknown to standard intensity.
    pub value: f64,
    /// One-sigma uncertainty on the ratio.
    pub uncertainty: f64,
}

impl KRatio {
    pub fn new(value: f64, uncertainty: f64) -> Self {
        Self { value, uncertainty }
    }
}
