//! Experimental measurement of one unknown specimen.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::intensity::KRatio;
use crate::domain::models::material::{BodyId, Material};
use crate::domain::models::options::SimulationOptions;
use crate::domain::models::rule::CompositionRule;
use crate::domain::models::transition::Transition;

/// Measured k-ratios for one specimen/detector pair, together with the
/// simulation template, the reference standards and the rules covering
/// elements without a measured k-ratio.
///
/// Two invariants are enforced on mutation:
///
/// - an atomic number is bound to at most one of k-ratios and rules;
/// - at most one by-difference rule exists per measurement, since two such
///   rules would make the composition under-determined.
///
/// A measurement is immutable once handed to a running quantification loop
/// (the loop holds it behind `Arc` and reads only).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Measurement {
    options: SimulationOptions,
    unknown_body: BodyId,
    detector_key: String,
    transitions: BTreeMap<u32, Transition>,
    kratios: BTreeMap<u32, KRatio>,
    standards: BTreeMap<u32, Material>,
    rules: BTreeMap<u32, CompositionRule>,
}

impl Measurement {
    /// Creates a measurement from a simulation template.
    ///
    /// `unknown_body` is the body the k-ratios were measured from and the one
    /// whose material the loop re-composes each iteration; `detector_key`
    /// names the detector channel supplying intensities. Both must exist in
    /// the template.
    pub fn new(
        options: SimulationOptions,
        unknown_body: BodyId,
        detector_key: impl Into<String>,
    ) -> DomainResult<Self> {
        let detector_key = detector_key.into();
        if !options.geometry.contains_body(unknown_body) {
            return Err(DomainError::UnknownBody(unknown_body.0));
        }
        if !options.has_detector(&detector_key) {
            return Err(DomainError::UnknownDetector(detector_key));
        }
        Ok(Self {
            options,
            unknown_body,
            detector_key,
            transitions: BTreeMap::new(),
            kratios: BTreeMap::new(),
            standards: BTreeMap::new(),
            rules: BTreeMap::new(),
        })
    }

    /// Adds a measured k-ratio with an auto-selected transition and a
    /// pure-element standard.
    pub fn add_kratio(&mut self, z: u32, value: f64, uncertainty: f64) -> DomainResult<()> {
        let transition = Transition::select(z, self.options.beam.energy_kev);
        self.add_kratio_with(transition, value, uncertainty, None)
    }

    /// Adds a measured k-ratio for an explicit transition and optional
    /// standard (pure element when `None`).
    pub fn add_kratio_with(
        &mut self,
        transition: Transition,
        value: f64,
        uncertainty: f64,
        standard: Option<Material>,
    ) -> DomainResult<()> {
        let z = transition.z;
        if self.kratios.contains_key(&z) {
            return Err(DomainError::KRatioAlreadyDefined(z));
        }
        if self.rules.contains_key(&z) {
            return Err(DomainError::RuleAlreadyDefined(z));
        }
        if value <= 0.0 {
            return Err(DomainError::InvalidKRatioValue { z, value });
        }
        if uncertainty < 0.0 {
            return Err(DomainError::InvalidKRatioUncertainty {
                z,
                value: uncertainty,
            });
        }

        self.transitions.insert(z, transition);
        self.kratios.insert(z, KRatio::new(value, uncertainty));
        self.standards
            .insert(z, standard.unwrap_or_else(|| Material::pure(z)));
        Ok(())
    }

    /// Binds a rule for an element without a measured k-ratio.
    pub fn add_rule(&mut self, rule: CompositionRule) -> DomainResult<()> {
        let z = rule.z();
        if self.rules.contains_key(&z) {
            return Err(DomainError::RuleAlreadyDefined(z));
        }
        if self.kratios.contains_key(&z) {
            return Err(DomainError::KRatioAlreadyDefined(z));
        }
        if rule.is_difference() {
            if let Some(existing) = self.rules.values().find(|r| r.is_difference()) {
                return Err(DomainError::DuplicateDifferenceRule {
                    existing: existing.z(),
                    requested: z,
                });
            }
        }
        self.rules.insert(z, rule);
        Ok(())
    }

    pub fn remove_kratio(&mut self, z: u32) -> DomainResult<()> {
        if self.kratios.remove(&z).is_none() {
            return Err(DomainError::ElementNotFound(z));
        }
        self.transitions.remove(&z);
        self.standards.remove(&z);
        Ok(())
    }

    pub fn remove_rule(&mut self, z: u32) -> DomainResult<()> {
        if self.rules.remove(&z).is_none() {
            return Err(DomainError::ElementNotFound(z));
        }
        Ok(())
    }

    pub fn has_kratio(&self, z: u32) -> bool {
        self.kratios.contains_key(&z)
    }

    pub fn has_rule(&self, z: u32) -> bool {
        self.rules.contains_key(&z)
    }

    pub fn options(&self) -> &SimulationOptions {
        &self.options
    }

    pub fn unknown_body(&self) -> BodyId {
        self.unknown_body
    }

    pub fn detector_key(&self) -> &str {
        &self.detector_key
    }

    /// Measured k-ratios keyed by atomic number.
    pub fn kratios(&self) -> &BTreeMap<u32, KRatio> {
        &self.kratios
    }

    /// Reference standards keyed by atomic number.
    pub fn standards(&self) -> &BTreeMap<u32, Material> {
        &self.standards
    }

    /// Measured transitions keyed by atomic number.
    pub fn transitions(&self) -> &BTreeMap<u32, Transition> {
        &self.transitions
    }

    /// Rules keyed by atomic number, in deterministic (ascending) order.
    pub fn rules(&self) -> &BTreeMap<u32, CompositionRule> {
        &self.rules
    }

    pub fn measured_elements(&self) -> impl Iterator<Item = u32> + '_ {
        self.kratios.keys().copied()
    }
}
