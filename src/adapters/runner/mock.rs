//! In-process mock runner with analytic pseudo-physics.
//!
//! Emitted intensity follows the Ziebold-Ogilvie hyperbolic relation
//! `k = wf / (alpha + (1 - alpha) * wf)` with a configurable calibration
//! constant per element, so quantification against this runner has a known
//! exact solution. Useful for integration tests and dry runs without a
//! Monte Carlo engine.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{BodyId, Intensity, SimulationOptions, Transition};
use crate::domain::ports::{DetectorResult, JobHandle, ResultSet, SimulationRunner};

#[derive(Debug, Clone)]
struct Job {
    options: SimulationOptions,
    /// Multiplier applied to emitted intensities, for forcing drift.
    scale: f64,
}

/// Mock simulation runner.
pub struct MockRunner {
    standard_counts: f64,
    alphas: BTreeMap<u32, f64>,
    delay: Duration,
    fail_matching: Option<String>,
    drift: f64,
    state: Mutex<MockState>,
}

#[derive(Default)]
struct MockState {
    jobs: HashMap<JobHandle, Job>,
    iteration_jobs: u32,
}

impl MockRunner {
    pub fn new() -> Self {
        Self {
            standard_counts: 1000.0,
            alphas: BTreeMap::new(),
            delay: Duration::ZERO,
            fail_matching: None,
            drift: 1.0,
            state: Mutex::new(MockState::default()),
        }
    }

    /// Sets the calibration constant for one element. Elements without one
    /// emit linearly (`alpha = 1`).
    #[must_use]
    pub fn with_alpha(mut self, z: u32, alpha: f64) -> Self {
        self.alphas.insert(z, alpha);
        self
    }

    /// Counts emitted by a pure standard.
    #[must_use]
    pub fn with_standard_counts(mut self, counts: f64) -> Self {
        self.standard_counts = counts;
        self
    }

    /// Simulated run time per job.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Fails any job whose name contains the pattern.
    #[must_use]
    pub fn with_failure_matching(mut self, pattern: impl Into<String>) -> Self {
        self.fail_matching = Some(pattern.into());
        self
    }

    /// Scales each successive iteration job's intensities by this factor,
    /// keeping the estimates moving so convergence never happens.
    #[must_use]
    pub fn with_drift(mut self, factor: f64) -> Self {
        self.drift = factor;
        self
    }

    fn alpha(&self, z: u32) -> f64 {
        self.alphas.get(&z).copied().unwrap_or(1.0)
    }

    fn simulate(&self, job: &Job) -> DomainResult<ResultSet> {
        let options = &job.options;
        let material = options.geometry.material_of(BodyId(0))?;

        let mut results = ResultSet::new();
        for key in options.detectors.keys() {
            let mut detector = DetectorResult::new();
            for (z, wf) in material.composition.iter() {
                let alpha = self.alpha(z);
                let k = wf / (alpha + (1.0 - alpha) * wf);
                let counts = (k * self.standard_counts * job.scale).max(0.0);
                let transition = Transition::select(z, options.beam.energy_kev);
                detector.insert(transition, Intensity::new(counts, counts.sqrt()));
            }
            results.insert_detector(key.clone(), detector);
        }
        Ok(results)
    }
}

impl Default for MockRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SimulationRunner for MockRunner {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn submit(&self, options: SimulationOptions) -> DomainResult<JobHandle> {
        let handle = JobHandle::new();
        let mut state = self.state.lock().await;

        let scale = if options.name.contains("-iteration") {
            let scale = self.drift.powi(state.iteration_jobs.try_into().unwrap_or(i32::MAX));
            state.iteration_jobs += 1;
            scale
        } else {
            1.0
        };

        debug!(name = %options.name, %handle, "job submitted");
        state.jobs.insert(handle, Job { options, scale });
        Ok(handle)
    }

    async fn await_result(&self, handle: JobHandle) -> DomainResult<ResultSet> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let job = {
            let mut state = self.state.lock().await;
            state
                .jobs
                .remove(&handle)
                .ok_or_else(|| DomainError::Simulation(format!("unknown job {handle}")))?
        };

        if let Some(pattern) = &self.fail_matching {
            if job.options.name.contains(pattern.as_str()) {
                return Err(DomainError::Simulation(format!(
                    "job {} failed",
                    job.options.name
                )));
            }
        }

        self.simulate(&job)
    }

    async fn cancel(&self, handle: JobHandle) -> DomainResult<()> {
        let mut state = self.state.lock().await;
        if state.jobs.remove(&handle).is_some() {
            debug!(%handle, "job cancelled");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{BeamConfig, Composition, DetectorConfig, Material, SampleGeometry};
    use crate::domain::models::transition::XRayLine;

    fn options(composition: Composition) -> SimulationOptions {
        let geometry = SampleGeometry::substrate(Material::new("unknown", composition));
        let mut options = SimulationOptions::new("job", BeamConfig::new(20.0), geometry);
        options.add_detector("xray", DetectorConfig::default());
        options
    }

    #[tokio::test]
    async fn pure_element_emits_standard_counts() {
        let runner = MockRunner::new().with_standard_counts(500.0);
        let composition: Composition = [(29, 1.0)].into_iter().collect();

        let handle = runner.submit(options(composition)).await.unwrap();
        let results = runner.await_result(handle).await.unwrap();

        let transition = Transition::new(29, XRayLine::Ka);
        let intensity = results.intensity("xray", &transition).unwrap();
        assert!((intensity.value - 500.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn hyperbolic_model_follows_alpha() {
        let alpha = 0.8;
        let wf = 0.3;
        let runner = MockRunner::new().with_alpha(29, alpha);
        let composition: Composition = [(29, wf)].into_iter().collect();

        let handle = runner.submit(options(composition)).await.unwrap();
        let results = runner.await_result(handle).await.unwrap();

        let transition = Transition::new(29, XRayLine::Ka);
        let intensity = results.intensity("xray", &transition).unwrap();
        let expected = wf / (alpha + (1.0 - alpha) * wf) * 1000.0;
        assert!((intensity.value - expected).abs() < 1e-9);
    }

    #[tokio::test]
    async fn cancelled_job_is_forgotten() {
        let runner = MockRunner::new();
        let composition: Composition = [(29, 1.0)].into_iter().collect();

        let handle = runner.submit(options(composition)).await.unwrap();
        runner.cancel(handle).await.unwrap();
        assert!(runner.await_result(handle).await.is_err());

        // Cancelling again is a no-op.
        runner.cancel(handle).await.unwrap();
    }

    #[tokio::test]
    async fn failure_pattern_fails_matching_jobs_only() {
        let runner = MockRunner::new().with_failure_matching("-iteration");
        let composition: Composition = [(29, 1.0)].into_iter().collect();

        let mut failing = options(composition.clone());
        failing.name = "unknown-iteration1".into();
        let handle = runner.submit(failing).await.unwrap();
        assert!(matches!(
            runner.await_result(handle).await,
            Err(DomainError::Simulation(_))
        ));

        let handle = runner.submit(options(composition)).await.unwrap();
        assert!(runner.await_result(handle).await.is_ok());
    }
}
