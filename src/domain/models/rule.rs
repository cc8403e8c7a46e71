//! Composition-constraint rules for unmeasured elements.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::composition::Composition;
use crate::domain::models::element::symbol;

/// Tolerance when testing whether the measured fractions already exceed unity.
const SUM_EPSILON: f64 = 1e-12;

/// Derives the weight fraction of one unmeasured element from the rest of the
/// composition.
///
/// The implementation set is closed, so the strategies are a sum type rather
/// than a trait object; configuration selects one by name.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum CompositionRule {
    /// `wf(z) = 1 - Σ wf(others)`. At most one per measurement.
    ElementByDifference { z: u32 },
    /// `wf(z) = fraction`, independent of the other elements.
    FixedElement { z: u32, fraction: f64 },
}

impl CompositionRule {
    pub fn difference(z: u32) -> Self {
        Self::ElementByDifference { z }
    }

    /// Fixed-fraction rule; the fraction must lie in `[0, 1]`.
    pub fn fixed(z: u32, fraction: f64) -> DomainResult<Self> {
        if !(0.0..=1.0).contains(&fraction) {
            return Err(DomainError::InvalidFixedFraction { z, fraction });
        }
        Ok(Self::FixedElement { z, fraction })
    }

    /// Atomic number the rule governs.
    pub fn z(&self) -> u32 {
        match self {
            Self::ElementByDifference { z } | Self::FixedElement { z, .. } => *z,
        }
    }

    pub fn is_difference(&self) -> bool {
        matches!(self, Self::ElementByDifference { .. })
    }

    /// Sets this rule's element in `composition`.
    ///
    /// Idempotent for a stable input: the governed fraction is recomputed
    /// from the other elements, never accumulated.
    pub fn update(&self, composition: &mut Composition) -> DomainResult<()> {
        match *self {
            Self::ElementByDifference { z } => {
                let sum = composition.total_without(z);
                if sum > 1.0 + SUM_EPSILON {
                    return Err(DomainError::NegativeDifference { z, sum });
                }
                composition.set(z, (1.0 - sum).max(0.0));
            }
            Self::FixedElement { z, fraction } => {
                composition.set(z, fraction);
            }
        }
        Ok(())
    }
}

impl fmt::Display for CompositionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ElementByDifference { z } => write!(f, "{} by difference", symbol(*z)),
            Self::FixedElement { z, fraction } => {
                write!(f, "{} fixed at {fraction}", symbol(*z))
            }
        }
    }
}
