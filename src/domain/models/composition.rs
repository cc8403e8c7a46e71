//! Elemental composition as weight fractions.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A mapping from atomic number to weight fraction.
///
/// Fractions conceptually sum to 1 across all elements present (measured plus
/// rule-derived); this type does not enforce the sum, callers normalize where
/// the algorithm requires it. Absent elements read as 0.0. The map is ordered
/// by atomic number, which makes rule application and CSV export
/// deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Composition {
    fractions: BTreeMap<u32, f64>,
}

impl Composition {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the weight fraction of an element.
    pub fn set(&mut self, z: u32, fraction: f64) {
        self.fractions.insert(z, fraction);
    }

    /// Weight fraction of an element, 0.0 if absent.
    pub fn get(&self, z: u32) -> f64 {
        self.fractions.get(&z).copied().unwrap_or(0.0)
    }

    pub fn contains(&self, z: u32) -> bool {
        self.fractions.contains_key(&z)
    }

    pub fn remove(&mut self, z: u32) -> Option<f64> {
        self.fractions.remove(&z)
    }

    /// Sum of all weight fractions.
    pub fn total(&self) -> f64 {
        self.fractions.values().sum()
    }

    /// Sum of the weight fractions of all elements except `z`.
    pub fn total_without(&self, z: u32) -> f64 {
        self.fractions
            .iter()
            .filter(|(&other, _)| other != z)
            .map(|(_, wf)| wf)
            .sum()
    }

    /// Scales all fractions so they sum to 1. A zero total is left untouched.
    pub fn normalize(&mut self) {
        let total = self.total();
        if total > 0.0 {
            for wf in self.fractions.values_mut() {
                *wf /= total;
            }
        }
    }

    /// Iterates over `(atomic number, weight fraction)` in atomic-number order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, f64)> + '_ {
        self.fractions.iter().map(|(&z, &wf)| (z, wf))
    }

    /// Atomic numbers present, in ascending order.
    pub fn elements(&self) -> impl Iterator<Item = u32> + '_ {
        self.fractions.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.fractions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fractions.is_empty()
    }
}

impl FromIterator<(u32, f64)> for Composition {
    fn from_iter<T: IntoIterator<Item = (u32, f64)>>(iter: T) -> Self {
        Self {
            fractions: iter.into_iter().collect(),
        }
    }
}
