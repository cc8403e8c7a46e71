//! Service layer: the quantification strategies and control loops.

pub mod calculator;
pub mod convergor;
pub mod iterator;
pub mod quantification;
pub mod scheduler;

pub use calculator::KRatioCalculator;
pub use convergor::{ConvergenceCriterion, Convergor, KRatioComparison};
pub use iterator::{CompositionIterator, IterationAlgorithm};
pub use quantification::{Quantification, QuantificationConfig, QuantificationOutcome};
pub use scheduler::{QuantificationScheduler, SchedulerConfig};
