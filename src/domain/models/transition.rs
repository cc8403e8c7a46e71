//! Characteristic X-ray transitions.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::models::element::symbol;

/// Characteristic line family of a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum XRayLine {
    Ka,
    La,
    Ma,
}

impl XRayLine {
    /// Siegbahn notation for display.
    pub fn siegbahn(self) -> &'static str {
        match self {
            XRayLine::Ka => "Kα",
            XRayLine::La => "Lα",
            XRayLine::Ma => "Mα",
        }
    }
}

/// A characteristic X-ray line of one element, e.g. Cu Kα.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Transition {
    /// Atomic number of the emitting element.
    pub z: u32,
    /// Line family.
    pub line: XRayLine,
}

/// Minimum overvoltage (beam energy over excitation energy) for a line to be
/// considered statistically usable.
const MIN_OVERVOLTAGE: f64 = 1.5;

impl Transition {
    pub fn new(z: u32, line: XRayLine) -> Self {
        Self { z, line }
    }

    /// Approximate line energy in keV (Moseley-type fits).
    ///
    /// Good to a few percent over the EPMA range, which is enough for line
    /// selection; exact energies belong to the physics engine behind the
    /// runner.
    pub fn energy_kev(&self) -> f64 {
        let z = f64::from(self.z);
        match self.line {
            XRayLine::Ka => 0.0102 * (z - 1.0).powi(2),
            XRayLine::La => 1.889e-3 * (z - 7.4).powi(2),
            XRayLine::Ma => 0.661e-3 * (z - 21.0).powi(2),
        }
    }

    /// Approximate excitation (edge) energy in keV.
    pub fn excitation_energy_kev(&self) -> f64 {
        // Edges sit slightly above the line energies of their family.
        self.energy_kev() * 1.15
    }

    /// Selects the most statistically favorable line for an element at the
    /// given beam energy: the highest-energy family that the beam can excite
    /// with a reasonable overvoltage. Falls back to Mα when nothing
    /// qualifies.
    pub fn select(z: u32, beam_energy_kev: f64) -> Self {
        for line in [XRayLine::Ka, XRayLine::La, XRayLine::Ma] {
            let candidate = Self::new(z, line);
            if candidate.excitation_energy_kev() * MIN_OVERVOLTAGE <= beam_energy_kev {
                return candidate;
            }
        }
        Self::new(z, XRayLine::Ma)
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", symbol(self.z), self.line.siegbahn())
    }
}
