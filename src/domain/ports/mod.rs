//! Ports (interfaces) consumed by the quantification core.

pub mod runner;

pub use runner::{DetectorResult, JobHandle, ResultSet, SimulationRunner};
