//! K-ratio calculation from raw intensities.

use std::collections::BTreeMap;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Intensity, KRatio};

/// Turns simulated unknown intensities into calculated k-ratios against the
/// cached standard intensities.
///
/// Configured once per measurement, after the standards have been simulated
/// exactly once, and stateless thereafter. Uncertainties combine in relative
/// quadrature.
#[derive(Debug, Clone)]
pub struct KRatioCalculator {
    standards: BTreeMap<u32, Intensity>,
}

impl KRatioCalculator {
    /// Creates a calculator from the standard intensities keyed by atomic
    /// number. Standard values must be positive.
    pub fn new(standards: BTreeMap<u32, Intensity>) -> DomainResult<Self> {
        for (&z, intensity) in &standards {
            if intensity.value <= 0.0 {
                return Err(DomainError::InvalidStandardIntensity {
                    z,
                    value: intensity.value,
                });
            }
        }
        Ok(Self { standards })
    }

    /// Strategy name for provenance.
    pub fn name(&self) -> &'static str {
        "simple"
    }

    /// Calculates the k-ratio for one element.
    ///
    /// A zero unknown intensity yields the degenerate `(0, 0)` k-ratio so
    /// the loop can keep probing.
    pub fn calculate(&self, z: u32, unknown: Intensity) -> DomainResult<KRatio> {
        let standard = self
            .standards
            .get(&z)
            .ok_or(DomainError::MissingStandardIntensity(z))?;

        if unknown.value == 0.0 {
            return Ok(KRatio::new(0.0, 0.0));
        }

        let value = unknown.value / standard.value;
        let relative = unknown
            .relative_uncertainty()
            .hypot(standard.relative_uncertainty());
        Ok(KRatio::new(value, value * relative))
    }

    /// Calculates k-ratios for a whole set of unknown intensities.
    pub fn calculate_all(
        &self,
        unknowns: &BTreeMap<u32, Intensity>,
    ) -> DomainResult<BTreeMap<u32, KRatio>> {
        unknowns
            .iter()
            .map(|(&z, &unknown)| Ok((z, self.calculate(z, unknown)?)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn calculator(value: f64, uncertainty: f64) -> KRatioCalculator {
        let standards = [(29, Intensity::new(value, uncertainty))].into_iter().collect();
        KRatioCalculator::new(standards).unwrap()
    }

    #[test]
    fn relative_quadrature() {
        let c = calculator(2.0, 0.2);
        let k = c.calculate(29, Intensity::new(1.0, 0.1)).unwrap();
        assert!((k.value - 0.5).abs() < 1e-12);
        // 0.5 * sqrt(0.1^2 + 0.1^2)
        assert!((k.uncertainty - 0.070_710_678).abs() < 1e-6);
    }

    #[test]
    fn zero_unknown_intensity_is_degenerate() {
        let c = calculator(2.0, 0.2);
        let k = c.calculate(29, Intensity::new(0.0, 0.0)).unwrap();
        assert_eq!(k, KRatio::new(0.0, 0.0));
    }

    #[test]
    fn rejects_non_positive_standard() {
        let standards = [(29, Intensity::new(0.0, 0.0))].into_iter().collect();
        assert!(matches!(
            KRatioCalculator::new(standards),
            Err(DomainError::InvalidStandardIntensity { z: 29, .. })
        ));
    }

    #[test]
    fn missing_standard_is_an_error() {
        let c = calculator(2.0, 0.2);
        assert!(matches!(
            c.calculate(79, Intensity::new(1.0, 0.1)),
            Err(DomainError::MissingStandardIntensity(79))
        ));
    }

    #[test]
    fn calculate_all_covers_every_element() {
        let standards = [
            (29, Intensity::new(2.0, 0.2)),
            (79, Intensity::new(4.0, 0.4)),
        ]
        .into_iter()
        .collect();
        let c = KRatioCalculator::new(standards).unwrap();

        let unknowns: BTreeMap<u32, Intensity> = [
            (29, Intensity::new(1.0, 0.1)),
            (79, Intensity::new(1.0, 0.1)),
        ]
        .into_iter()
        .collect();
        let kratios = c.calculate_all(&unknowns).unwrap();
        assert!((kratios[&29].value - 0.5).abs() < 1e-12);
        assert!((kratios[&79].value - 0.25).abs() < 1e-12);
    }

    proptest! {
        #[test]
        fn kratio_is_intensity_ratio_with_non_negative_uncertainty(
            unk in 1e-6f64..1e6,
            unk_unc in 0.0f64..1e3,
            std in 1e-6f64..1e6,
            std_unc in 0.0f64..1e3,
        ) {
            let c = calculator(std, std_unc);
            let k = c.calculate(29, Intensity::new(unk, unk_unc)).unwrap();
            prop_assert!((k.value - unk / std).abs() <= 1e-9 * k.value.abs().max(1.0));
            prop_assert!(k.uncertainty >= 0.0);
        }
    }
}
