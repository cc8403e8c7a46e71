//! Convergence-test strategies over the iteration history.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Composition, KRatio};

/// Which k-ratios the k-ratio criterion compares.
///
/// The two interpretations behave differently on slowly drifting estimates,
/// so the choice is a configuration knob rather than a fixed semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KRatioComparison {
    /// `|measured - last calculated| < limit` per element.
    MeasuredVsCalculated,
    /// `|last calculated - previous calculated| < limit` per element.
    SuccessiveCalculated,
}

impl KRatioComparison {
    pub fn name(self) -> &'static str {
        match self {
            Self::MeasuredVsCalculated => "measured",
            Self::SuccessiveCalculated => "successive",
        }
    }
}

impl FromStr for KRatioComparison {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "measured" => Ok(Self::MeasuredVsCalculated),
            "successive" => Ok(Self::SuccessiveCalculated),
            other => Err(format!("unknown k-ratio comparison: {other}")),
        }
    }
}

/// Convergence criterion, selected by name at configuration time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ConvergenceCriterion {
    /// Converged when every measured element's weight fraction moved less
    /// than `limit` between the last two composition snapshots.
    Composition { limit: f64 },
    /// The composition condition plus a per-element k-ratio residual below
    /// `limit`; strictly stricter than `Composition` alone.
    KRatio {
        limit: f64,
        comparison: KRatioComparison,
    },
}

impl ConvergenceCriterion {
    /// Composition criterion; the limit must be positive.
    pub fn composition(limit: f64) -> DomainResult<Self> {
        if limit <= 0.0 {
            return Err(DomainError::InvalidConvergenceLimit(limit));
        }
        Ok(Self::Composition { limit })
    }

    /// K-ratio criterion; the limit must be positive.
    pub fn kratio(limit: f64, comparison: KRatioComparison) -> DomainResult<Self> {
        if limit <= 0.0 {
            return Err(DomainError::InvalidConvergenceLimit(limit));
        }
        Ok(Self::KRatio { limit, comparison })
    }

    pub fn limit(&self) -> f64 {
        match self {
            Self::Composition { limit } | Self::KRatio { limit, .. } => *limit,
        }
    }

    /// Human-readable strategy name, used for provenance and configuration.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Composition { .. } => "composition",
            Self::KRatio { .. } => "kratio",
        }
    }
}

impl fmt::Display for ConvergenceCriterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(limit={})", self.name(), self.limit())
    }
}

/// Decides from the accumulated history whether iteration should stop.
///
/// Seeded with the initial composition, so the first `add_iteration` already
/// yields two snapshots to compare. With fewer than two snapshots
/// `has_converged` is false.
#[derive(Debug, Clone)]
pub struct Convergor {
    criterion: ConvergenceCriterion,
    measured: BTreeMap<u32, KRatio>,
    compositions: Vec<Composition>,
    calculated: Vec<BTreeMap<u32, KRatio>>,
}

impl Convergor {
    /// Creates a convergor for a set of measured k-ratios.
    ///
    /// Every measured element must be present in the initial composition.
    pub fn new(
        criterion: ConvergenceCriterion,
        measured: BTreeMap<u32, KRatio>,
        initial_composition: Composition,
    ) -> DomainResult<Self> {
        for &z in measured.keys() {
            if !initial_composition.contains(z) {
                return Err(DomainError::MissingKRatio(z));
            }
        }
        Ok(Self {
            criterion,
            measured,
            compositions: vec![initial_composition],
            calculated: Vec::new(),
        })
    }

    pub fn criterion(&self) -> &ConvergenceCriterion {
        &self.criterion
    }

    /// Number of iterations registered so far.
    pub fn iterations(&self) -> usize {
        self.calculated.len()
    }

    /// Registers the outcome of one iteration.
    pub fn add_iteration(&mut self, calculated: BTreeMap<u32, KRatio>, composition: Composition) {
        self.calculated.push(calculated);
        self.compositions.push(composition);
    }

    /// Latest composition snapshot after at least one iteration.
    pub fn last_composition(&self) -> DomainResult<&Composition> {
        if self.calculated.is_empty() {
            return Err(DomainError::InsufficientHistory {
                required: 1,
                available: 0,
            });
        }
        // compositions is never empty: seeded at construction
        Ok(self.compositions.last().unwrap())
    }

    /// Whether the estimate is stable under the configured criterion.
    pub fn has_converged(&self) -> bool {
        let [.., previous, current] = self.compositions.as_slice() else {
            return false;
        };

        let limit = self.criterion.limit();
        let mut residuals: BTreeMap<u32, f64> = BTreeMap::new();
        for &z in self.measured.keys() {
            let residual = (current.get(z) - previous.get(z)).abs();
            if residual >= limit {
                residuals.insert(z, residual);
            }
        }

        let index = self.compositions.len() - 1;
        debug!(iteration = index, estimate = ?current, residuals = ?residuals);

        if !residuals.is_empty() {
            return false;
        }

        match self.criterion {
            ConvergenceCriterion::Composition { .. } => true,
            ConvergenceCriterion::KRatio { limit, comparison } => {
                self.kratios_converged(limit, comparison)
            }
        }
    }

    fn kratios_converged(&self, limit: f64, comparison: KRatioComparison) -> bool {
        match comparison {
            KRatioComparison::MeasuredVsCalculated => {
                let Some(last) = self.calculated.last() else {
                    return false;
                };
                self.measured.iter().all(|(z, measured)| {
                    let calculated = last.get(z).map_or(0.0, |k| k.value);
                    (measured.value - calculated).abs() < limit
                })
            }
            KRatioComparison::SuccessiveCalculated => {
                let [.., previous, current] = self.calculated.as_slice() else {
                    return false;
                };
                self.measured.keys().all(|z| {
                    let a = previous.get(z).map_or(0.0, |k| k.value);
                    let b = current.get(z).map_or(0.0, |k| k.value);
                    (b - a).abs() < limit
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kratios(entries: &[(u32, f64)]) -> BTreeMap<u32, KRatio> {
        entries
            .iter()
            .map(|&(z, v)| (z, KRatio::new(v, 0.0)))
            .collect()
    }

    fn composition(entries: &[(u32, f64)]) -> Composition {
        entries.iter().copied().collect()
    }

    #[test]
    fn rejects_non_positive_limit() {
        assert!(ConvergenceCriterion::composition(0.0).is_err());
        assert!(ConvergenceCriterion::kratio(-0.1, KRatioComparison::MeasuredVsCalculated).is_err());
    }

    #[test]
    fn rejects_initial_composition_missing_a_measured_element() {
        let criterion = ConvergenceCriterion::composition(0.01).unwrap();
        let err = Convergor::new(criterion, kratios(&[(29, 0.2)]), Composition::new()).unwrap_err();
        assert!(matches!(err, DomainError::MissingKRatio(29)));
    }

    #[test]
    fn composition_criterion_needs_two_snapshots_within_limit() {
        let criterion = ConvergenceCriterion::composition(0.01).unwrap();
        let mut convergor =
            Convergor::new(criterion, kratios(&[(29, 0.2)]), composition(&[(29, 0.5)])).unwrap();

        convergor.add_iteration(kratios(&[(29, 0.25)]), composition(&[(29, 0.3)]));
        assert!(!convergor.has_converged());

        convergor.add_iteration(kratios(&[(29, 0.21)]), composition(&[(29, 0.295)]));
        assert!(convergor.has_converged());
    }

    #[test]
    fn no_convergence_before_any_iteration() {
        let criterion = ConvergenceCriterion::composition(10.0).unwrap();
        let convergor =
            Convergor::new(criterion, kratios(&[(29, 0.2)]), composition(&[(29, 0.5)])).unwrap();
        assert!(!convergor.has_converged());
        assert!(convergor.last_composition().is_err());
    }

    #[test]
    fn kratio_criterion_requires_both_conditions() {
        let criterion =
            ConvergenceCriterion::kratio(0.01, KRatioComparison::MeasuredVsCalculated).unwrap();
        let mut convergor =
            Convergor::new(criterion, kratios(&[(29, 0.2)]), composition(&[(29, 0.3)])).unwrap();

        // Compositions are within limit but the calculated k-ratio is far
        // from the measured one.
        convergor.add_iteration(kratios(&[(29, 0.5)]), composition(&[(29, 0.299)]));
        assert!(!convergor.has_converged());

        // Now both conditions hold.
        convergor.add_iteration(kratios(&[(29, 0.205)]), composition(&[(29, 0.2985)]));
        assert!(convergor.has_converged());
    }

    #[test]
    fn successive_comparison_needs_two_calculated_sets() {
        let criterion =
            ConvergenceCriterion::kratio(0.01, KRatioComparison::SuccessiveCalculated).unwrap();
        let mut convergor =
            Convergor::new(criterion, kratios(&[(29, 0.2)]), composition(&[(29, 0.3)])).unwrap();

        convergor.add_iteration(kratios(&[(29, 0.205)]), composition(&[(29, 0.2999)]));
        assert!(!convergor.has_converged());

        convergor.add_iteration(kratios(&[(29, 0.206)]), composition(&[(29, 0.2998)]));
        assert!(convergor.has_converged());
    }

    #[test]
    fn successive_comparison_blocks_on_jumping_kratios() {
        let criterion =
            ConvergenceCriterion::kratio(0.01, KRatioComparison::SuccessiveCalculated).unwrap();
        let mut convergor =
            Convergor::new(criterion, kratios(&[(29, 0.2)]), composition(&[(29, 0.3)])).unwrap();

        convergor.add_iteration(kratios(&[(29, 0.2)]), composition(&[(29, 0.2999)]));
        convergor.add_iteration(kratios(&[(29, 0.3)]), composition(&[(29, 0.2998)]));
        assert!(!convergor.has_converged());
    }

    #[test]
    fn comparison_names_parse_back() {
        for comparison in [
            KRatioComparison::MeasuredVsCalculated,
            KRatioComparison::SuccessiveCalculated,
        ] {
            assert_eq!(comparison.name().parse::<KRatioComparison>(), Ok(comparison));
        }
        assert!("nope".parse::<KRatioComparison>().is_err());
    }
}
