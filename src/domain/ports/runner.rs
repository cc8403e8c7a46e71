//! Simulation runner port - interface to the external physics engine.

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::{Intensity, SimulationOptions, Transition};

/// Opaque handle to a submitted simulation job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobHandle(Uuid);

impl JobHandle {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Emitted intensities recorded by one detector.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectorResult {
    intensities: BTreeMap<Transition, Intensity>,
}

impl DetectorResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, transition: Transition, intensity: Intensity) {
        self.intensities.insert(transition, intensity);
    }

    pub fn intensity(&self, transition: &Transition) -> Option<Intensity> {
        self.intensities.get(transition).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Transition, &Intensity)> {
        self.intensities.iter()
    }
}

/// Result set of one simulation job: per-detector emitted intensities.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultSet {
    detectors: BTreeMap<String, DetectorResult>,
}

impl ResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_detector(&mut self, key: impl Into<String>, result: DetectorResult) {
        self.detectors.insert(key.into(), result);
    }

    pub fn detector(&self, key: &str) -> Option<&DetectorResult> {
        self.detectors.get(key)
    }

    /// Intensity for one detector/transition pair, if recorded.
    pub fn intensity(&self, detector_key: &str, transition: &Transition) -> Option<Intensity> {
        self.detectors
            .get(detector_key)
            .and_then(|d| d.intensity(transition))
    }
}

/// Trait for simulation runner implementations.
///
/// The runner is the only collaborator shared between concurrently running
/// quantification loops; implementations must accept concurrent submissions.
/// A loop never has more than one job in flight, so per-loop ordering is the
/// caller's concern, not the runner's.
#[async_trait]
pub trait SimulationRunner: Send + Sync {
    /// Get the runner implementation name.
    fn name(&self) -> &'static str;

    /// Submit a simulation job for asynchronous execution.
    async fn submit(&self, options: SimulationOptions) -> DomainResult<JobHandle>;

    /// Wait for a submitted job and return its result set.
    async fn await_result(&self, handle: JobHandle) -> DomainResult<ResultSet>;

    /// Cancel an in-flight job. Cancelling an unknown or finished job is not
    /// an error.
    async fn cancel(&self, handle: JobHandle) -> DomainResult<()>;
}
