//! Domain errors for the quantification engine.

use thiserror::Error;

use crate::domain::models::element::symbol;

/// Domain-level errors.
///
/// Configuration errors (caller mistakes) are reported immediately and never
/// retried. `Simulation` wraps failures surfaced by the runner collaborator
/// and terminates the owning quantification loop. `Cancelled` is the
/// cancellation-kind failure a loop reports when it is shut down mid-flight.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("a k-ratio is already defined for element {}", symbol(*.0))]
    KRatioAlreadyDefined(u32),

    #[error("a rule is already defined for element {}", symbol(*.0))]
    RuleAlreadyDefined(u32),

    #[error(
        "a by-difference rule is already bound to element {}; cannot bind another to {}",
        symbol(*existing), symbol(*requested)
    )]
    DuplicateDifferenceRule { existing: u32, requested: u32 },

    #[error("k-ratio value for element {} must be positive, got {value}", symbol(*z))]
    InvalidKRatioValue { z: u32, value: f64 },

    #[error(
        "k-ratio uncertainty for element {} must be non-negative, got {value}",
        symbol(*z)
    )]
    InvalidKRatioUncertainty { z: u32, value: f64 },

    #[error("fixed fraction for element {} must lie in [0, 1], got {fraction}", symbol(*z))]
    InvalidFixedFraction { z: u32, fraction: f64 },

    #[error(
        "by-difference rule for element {} underflows: other fractions sum to {sum}",
        symbol(*z)
    )]
    NegativeDifference { z: u32, sum: f64 },

    #[error("no k-ratio or rule defined for element {}", symbol(*.0))]
    ElementNotFound(u32),

    #[error("no measured k-ratio for element {}", symbol(*.0))]
    MissingKRatio(u32),

    #[error("detector {0:?} is not part of the simulation options")]
    UnknownDetector(String),

    #[error("body index {0} is not part of the sample geometry")]
    UnknownBody(usize),

    #[error("material index {0} is not part of the sample geometry")]
    UnknownMaterial(usize),

    #[error("standard result carries no intensity for element {}", symbol(*.0))]
    MissingStandardIntensity(u32),

    #[error(
        "standard intensity for element {} must be positive, got {value}",
        symbol(*z)
    )]
    InvalidStandardIntensity { z: u32, value: f64 },

    #[error("convergence limit must be greater than 0.0, got {0}")]
    InvalidConvergenceLimit(f64),

    #[error("maximum number of iterations must be greater or equal to 1")]
    InvalidMaxIterations,

    #[error("iteration history holds {available} records, {required} required")]
    InsufficientHistory { required: usize, available: usize },

    #[error("a measurement named {0:?} was already queued")]
    DuplicateMeasurement(String),

    #[error("simulation failed: {0}")]
    Simulation(String),

    #[error("quantification cancelled")]
    Cancelled,
}

pub type DomainResult<T> = Result<T, DomainError>;
