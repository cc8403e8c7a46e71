//! epquant - Iterative k-ratio quantification engine
//!
//! epquant reconstructs the elemental composition of an unknown specimen from
//! measured k-ratios (measured intensity over pure-standard intensity) by
//! iterating against a physics simulation: simulate the current composition
//! estimate, compare the calculated k-ratios to the measured ones, refine the
//! estimate and repeat until the convergence criterion is met.
//!
//! # Architecture
//!
//! This crate follows Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): compositions, measurements, rules and the
//!   simulation runner port
//! - **Service Layer** (`services`): the k-ratio calculator, iteration and
//!   convergence strategies, the quantification loop and its scheduler
//! - **Adapters** (`adapters`): concrete runner implementations
//! - **Infrastructure Layer** (`infrastructure`): configuration, logging and
//!   result persistence
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use epquant::adapters::runner::MockRunner;
//! use epquant::services::{QuantificationConfig, QuantificationScheduler, SchedulerConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let runner = Arc::new(MockRunner::new());
//!     let mut scheduler = QuantificationScheduler::new(
//!         runner,
//!         SchedulerConfig::default(),
//!         QuantificationConfig::default(),
//!     );
//!     // scheduler.put("unknown", measurement)?;
//!     let reports = scheduler.run_all().await?;
//!     for report in reports {
//!         println!("{}: {:?}", report.name, report.terminal);
//!     }
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::errors::{DomainError, DomainResult};
pub use domain::models::{
    BeamConfig, Body, BodyId, Composition, CompositionRule, DetectorConfig, Intensity,
    IterationRecord, KRatio, Material, MaterialId, Measurement, QuantificationReport,
    QuantificationState, SampleGeometry, SimulationOptions, TerminalState, Transition, XRayLine,
};
pub use domain::ports::{DetectorResult, JobHandle, ResultSet, SimulationRunner};
pub use infrastructure::archive::ResultArchive;
pub use infrastructure::config::{ConfigError, Settings};
pub use services::{
    ConvergenceCriterion, Convergor, CompositionIterator, IterationAlgorithm, KRatioCalculator,
    KRatioComparison, Quantification, QuantificationConfig, QuantificationOutcome,
    QuantificationScheduler, SchedulerConfig,
};
