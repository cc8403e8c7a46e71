//! Simulation configuration passed to the runner.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::models::material::SampleGeometry;

/// Electron beam parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BeamConfig {
    /// Incident energy in keV.
    pub energy_kev: f64,
    /// Probe current in nA.
    pub current_na: f64,
    /// Probe diameter in nm.
    pub diameter_nm: f64,
}

impl BeamConfig {
    pub fn new(energy_kev: f64) -> Self {
        Self {
            energy_kev,
            current_na: 10.0,
            diameter_nm: 10.0,
        }
    }
}

/// Photon intensity detector parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Take-off elevation in degrees.
    pub elevation_deg: f64,
    /// Azimuth in degrees.
    pub azimuth_deg: f64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            elevation_deg: 40.0,
            azimuth_deg: 0.0,
        }
    }
}

/// Complete configuration for one simulation job: beam, geometry and
/// detectors. The quantification loop clones the measurement's template,
/// renames it per job and swaps in the current composition estimate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationOptions {
    pub name: String,
    pub beam: BeamConfig,
    pub geometry: SampleGeometry,
    pub detectors: BTreeMap<String, DetectorConfig>,
}

impl SimulationOptions {
    pub fn new(name: impl Into<String>, beam: BeamConfig, geometry: SampleGeometry) -> Self {
        Self {
            name: name.into(),
            beam,
            geometry,
            detectors: BTreeMap::new(),
        }
    }

    pub fn add_detector(&mut self, key: impl Into<String>, config: DetectorConfig) {
        self.detectors.insert(key.into(), config);
    }

    pub fn has_detector(&self, key: &str) -> bool {
        self.detectors.contains_key(key)
    }
}
