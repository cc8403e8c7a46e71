//! Composition-update strategies.
//!
//! The update formulas follow the classic EPMA iteration literature as
//! catalogued by Scott, Love and Reed (1992); the hyperbolic update uses the
//! Ziebold and Ogilvie (1964) calibration relation.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::models::{Composition, KRatio};

/// Composition-update algorithm, selected by name at configuration time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IterationAlgorithm {
    /// First-order update `wf' = wf * k / k_calc`.
    Simple,
    /// Hyperbolic update through the Ziebold-Ogilvie relation.
    Heinrich1972,
    /// Secant acceleration of the simple update using one iteration of
    /// memory.
    Wegstein1958,
}

impl IterationAlgorithm {
    /// Human-readable strategy name, used for provenance and configuration.
    pub fn name(self) -> &'static str {
        match self {
            Self::Simple => "simple",
            Self::Heinrich1972 => "heinrich1972",
            Self::Wegstein1958 => "wegstein1958",
        }
    }
}

impl fmt::Display for IterationAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for IterationAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "simple" => Ok(Self::Simple),
            "heinrich1972" | "heinrich" => Ok(Self::Heinrich1972),
            "wegstein1958" | "wegstein" => Ok(Self::Wegstein1958),
            other => Err(format!("unknown iteration algorithm: {other}")),
        }
    }
}

/// Proposes the next composition estimate from the current one and the
/// measured/calculated k-ratio pair of the last simulation.
///
/// Only elements with a measured k-ratio are updated; rule-governed elements
/// are left untouched for the caller to fill afterwards. A zero calculated
/// k-ratio is a no-op update for that element, never an error. Proposals are
/// clamped at zero.
#[derive(Debug, Clone)]
pub struct CompositionIterator {
    algorithm: IterationAlgorithm,
    // One iteration of memory for the Wegstein secant.
    previous: Option<(Composition, BTreeMap<u32, KRatio>)>,
}

impl CompositionIterator {
    pub fn new(algorithm: IterationAlgorithm) -> Self {
        Self {
            algorithm,
            previous: None,
        }
    }

    pub fn algorithm(&self) -> IterationAlgorithm {
        self.algorithm
    }

    /// Computes the next composition.
    pub fn next(
        &mut self,
        current: &Composition,
        measured: &BTreeMap<u32, KRatio>,
        calculated: &BTreeMap<u32, KRatio>,
    ) -> Composition {
        let mut proposed = current.clone();

        for (&z, k) in measured {
            let wf = current.get(z);
            let kc = calculated.get(&z).map_or(0.0, |k| k.value);
            if kc == 0.0 {
                continue;
            }

            let next = match self.algorithm {
                IterationAlgorithm::Simple => Self::simple(wf, k.value, kc),
                IterationAlgorithm::Heinrich1972 => Self::heinrich(wf, k.value, kc),
                IterationAlgorithm::Wegstein1958 => self.wegstein(z, wf, k.value, kc),
            };
            proposed.set(z, next.max(0.0));
        }

        self.previous = Some((current.clone(), calculated.clone()));
        proposed
    }

    fn simple(wf: f64, k: f64, kc: f64) -> f64 {
        wf * k / kc
    }

    /// Ziebold-Ogilvie hyperbolic update: estimate the calibration constant
    /// from the current point, then solve it for the measured k-ratio.
    fn heinrich(wf: f64, k: f64, kc: f64) -> f64 {
        if wf >= 1.0 {
            return Self::simple(wf, k, kc);
        }
        let alpha = (wf * (1.0 - kc)) / (kc * (1.0 - wf));
        let denominator = 1.0 - k * (1.0 - alpha);
        if denominator == 0.0 {
            return wf;
        }
        (alpha * k) / denominator
    }

    /// Wegstein secant step; falls back to the simple update on the first
    /// iteration or a degenerate secant.
    fn wegstein(&self, z: u32, wf: f64, k: f64, kc: f64) -> f64 {
        let Some((previous_composition, previous_calculated)) = &self.previous else {
            return Self::simple(wf, k, kc);
        };
        let wf_prev = previous_composition.get(z);
        let kc_prev = previous_calculated.get(&z).map_or(0.0, |k| k.value);
        if kc_prev == 0.0 || wf == wf_prev {
            return Self::simple(wf, k, kc);
        }

        let fa = wf / kc;
        let fa_prev = wf_prev / kc_prev;
        let derivative = (fa - fa_prev) / (wf - wf_prev);
        let denominator = 1.0 - k * derivative;
        if denominator == 0.0 {
            return Self::simple(wf, k, kc);
        }
        wf + (k * fa - wf) / denominator
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

    #[test]
    fn simple_update_scales_by_kratio_ratio() {
        let mut it = CompositionIterator::new(IterationAlgorithm::Simple);
        let current: Composition = [(29, 0.5)].into_iter().collect();
        let proposed = it.next(&current, &kratios(&[(29, 0.2)]), &kratios(&[(29, 0.4)]));
        assert!((proposed.get(29) - 0.25).abs() < 1e-12);
    }

    #[test]
    fn zero_calculated_kratio_is_a_no_op() {
        let mut it = CompositionIterator::new(IterationAlgorithm::Simple);
        let current: Composition = [(29, 0.5)].into_iter().collect();
        let proposed = it.next(&current, &kratios(&[(29, 0.2)]), &kratios(&[(29, 0.0)]));
        assert!((proposed.get(29) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn rule_elements_are_left_untouched() {
        let mut it = CompositionIterator::new(IterationAlgorithm::Simple);
        let current: Composition = [(29, 0.5), (79, 0.5)].into_iter().collect();
        let proposed = it.next(&current, &kratios(&[(29, 0.2)]), &kratios(&[(29, 0.4)]));
        assert!((proposed.get(79) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn heinrich_inverts_the_hyperbolic_relation_in_one_step() {
        // Mock physics following k = wf / (alpha + (1 - alpha) wf) exactly;
        // the update must land on the measured point in a single step.
        let alpha = 0.81;
        let target_wf = 0.21;
        let measured_k = target_wf / (alpha + (1.0 - alpha) * target_wf);

        let wf = 0.5;
        let kc = wf / (alpha + (1.0 - alpha) * wf);
        let mut it = CompositionIterator::new(IterationAlgorithm::Heinrich1972);
        let current: Composition = [(29, wf)].into_iter().collect();
        let proposed = it.next(
            &current,
            &kratios(&[(29, measured_k)]),
            &kratios(&[(29, kc)]),
        );
        assert!((proposed.get(29) - target_wf).abs() < 1e-9);
    }

    #[test]
    fn wegstein_first_step_matches_simple() {
        let current: Composition = [(29, 0.5)].into_iter().collect();
        let measured = kratios(&[(29, 0.2)]);
        let calculated = kratios(&[(29, 0.4)]);

        let mut wegstein = CompositionIterator::new(IterationAlgorithm::Wegstein1958);
        let mut simple = CompositionIterator::new(IterationAlgorithm::Simple);
        let w = wegstein.next(&current, &measured, &calculated);
        let s = simple.next(&current, &measured, &calculated);
        assert!((w.get(29) - s.get(29)).abs() < 1e-12);
    }

    #[test]
    fn wegstein_second_step_uses_the_secant() {
        let mut it = CompositionIterator::new(IterationAlgorithm::Wegstein1958);
        let measured = kratios(&[(29, 0.2)]);

        let first: Composition = [(29, 0.5)].into_iter().collect();
        let second = it.next(&first, &measured, &kratios(&[(29, 0.4)]));

        let proposed = it.next(&second, &measured, &kratios(&[(29, 0.3)]));

        // Secant through (0.5, 0.4) and (0.25, 0.3): fa = wf/kc.
        let fa = second.get(29) / 0.3;
        let fa_prev = 0.5 / 0.4;
        let derivative = (fa - fa_prev) / (second.get(29) - 0.5);
        let expected = second.get(29) + (0.2 * fa - second.get(29)) / (1.0 - 0.2 * derivative);
        assert!((proposed.get(29) - expected).abs() < 1e-12);
    }

    #[test]
    fn negative_proposals_are_clamped_to_zero() {
        let mut it = CompositionIterator::new(IterationAlgorithm::Heinrich1972);
        // kc > 1 makes alpha negative and the raw update dips below zero.
        let current: Composition = [(29, 0.5)].into_iter().collect();
        let proposed = it.next(&current, &kratios(&[(29, 0.1)]), &kratios(&[(29, 1.5)]));
        assert_eq!(proposed.get(29), 0.0);
    }

    #[test]
    fn algorithm_names_parse_back() {
        for algorithm in [
            IterationAlgorithm::Simple,
            IterationAlgorithm::Heinrich1972,
            IterationAlgorithm::Wegstein1958,
        ] {
            assert_eq!(algorithm.name().parse::<IterationAlgorithm>(), Ok(algorithm));
        }
        assert!("nope".parse::<IterationAlgorithm>().is_err());
    }
}
