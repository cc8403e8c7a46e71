//! Per-measurement quantification control loop.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use tokio::select;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    Composition, Intensity, IterationRecord, Measurement, QuantificationState, SampleGeometry,
    SimulationOptions, TerminalState,
};
use crate::domain::ports::{ResultSet, SimulationRunner};
use crate::services::calculator::KRatioCalculator;
use crate::services::convergor::{ConvergenceCriterion, Convergor};
use crate::services::iterator::{CompositionIterator, IterationAlgorithm};

/// Loop parameters: strategy selections and the iteration budget.
#[derive(Debug, Clone, Copy)]
pub struct QuantificationConfig {
    pub max_iterations: u32,
    pub algorithm: IterationAlgorithm,
    pub criterion: ConvergenceCriterion,
}

impl QuantificationConfig {
    /// Builds a validated configuration.
    pub fn new(
        max_iterations: u32,
        algorithm: IterationAlgorithm,
        criterion: ConvergenceCriterion,
    ) -> DomainResult<Self> {
        if max_iterations < 1 {
            return Err(DomainError::InvalidMaxIterations);
        }
        Ok(Self {
            max_iterations,
            algorithm,
            criterion,
        })
    }
}

impl Default for QuantificationConfig {
    fn default() -> Self {
        Self {
            max_iterations: 50,
            algorithm: IterationAlgorithm::Heinrich1972,
            // new() only rejects non-positive limits
            criterion: ConvergenceCriterion::composition(1e-5).unwrap(),
        }
    }
}

/// Terminal result of one quantification loop.
///
/// `state.terminal` is always set; `error` carries the underlying failure
/// when it is `Failed`. The partial history stays inspectable either way.
#[derive(Debug)]
pub struct QuantificationOutcome {
    pub state: QuantificationState,
    pub error: Option<DomainError>,
}

impl QuantificationOutcome {
    pub fn terminal(&self) -> TerminalState {
        // run() always sets the terminal state before returning
        self.state.terminal.unwrap_or(TerminalState::Failed)
    }
}

/// The iterate-until-converged loop for one measurement.
///
/// Owns one iterator, one convergor and one calculator instance; shares the
/// measurement read-only and submits jobs to the runner strictly one at a
/// time, so there is never more than one job in flight per loop.
pub struct Quantification<R: SimulationRunner> {
    runner: Arc<R>,
    measurement: Arc<Measurement>,
    config: QuantificationConfig,
}

impl<R: SimulationRunner> Quantification<R> {
    pub fn new(
        runner: Arc<R>,
        measurement: Arc<Measurement>,
        config: QuantificationConfig,
    ) -> Self {
        Self {
            runner,
            measurement,
            config,
        }
    }

    /// Runs the loop to a terminal state.
    ///
    /// Suspends only while awaiting a runner result. A shutdown signal on
    /// `shutdown` cancels the in-flight job and terminates the loop with a
    /// cancellation failure.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) -> QuantificationOutcome {
        let started = Instant::now();
        let initial = self.initial_composition();
        let mut state = QuantificationState::new(Composition::new());

        let result = self.run_inner(initial, &mut state, &mut shutdown).await;
        state.elapsed = started.elapsed();

        let error = match result {
            Ok(terminal) => {
                state.terminal = Some(terminal);
                None
            }
            Err(error) => {
                warn!(
                    name = %self.measurement.options().name,
                    %error,
                    "quantification failed"
                );
                state.terminal = Some(TerminalState::Failed);
                Some(error)
            }
        };

        info!(
            name = %self.measurement.options().name,
            iterations = state.iteration_count,
            terminal = ?state.terminal,
            elapsed_ms = state.elapsed.as_millis(),
            "quantification finished"
        );
        QuantificationOutcome { state, error }
    }

    async fn run_inner(
        &self,
        initial: Composition,
        state: &mut QuantificationState,
        shutdown: &mut broadcast::Receiver<()>,
    ) -> DomainResult<TerminalState> {
        let measurement = &self.measurement;
        let measured = measurement.kratios().clone();

        // Simulate every standard exactly once and configure the calculator.
        let standard_intensities = self.run_standards(shutdown).await?;
        let calculator = KRatioCalculator::new(standard_intensities)?;

        let mut composition = initial;
        self.apply_rules(&mut composition)?;
        debug!(name = %measurement.options().name, initial = ?composition);

        let mut iterator = CompositionIterator::new(self.config.algorithm);
        let mut convergor =
            Convergor::new(self.config.criterion, measured.clone(), composition.clone())?;

        state.composition = composition.clone();

        while state.iteration_count < self.config.max_iterations {
            let index = state.iteration_count + 1;

            // One simulation of the unknown with the current estimate.
            let results = self
                .run_iteration(index, &composition, shutdown)
                .await?;
            let unknowns = self.read_intensities(&results);
            let calculated = calculator.calculate_all(&unknowns)?;

            // Propose the next estimate and fill rule-governed elements.
            let mut proposed = iterator.next(&composition, &measured, &calculated);
            self.apply_rules(&mut proposed)?;

            convergor.add_iteration(calculated.clone(), proposed.clone());
            state.history.push(IterationRecord {
                composition: proposed.clone(),
                measured: measured.clone(),
                calculated,
            });
            composition = proposed;
            state.composition = composition.clone();
            state.iteration_count = index;

            if convergor.has_converged() {
                return Ok(TerminalState::Converged);
            }
        }

        Ok(TerminalState::MaxIterationsReached)
    }

    /// Initial guess assuming unit matrix correction: `wf = k * C(standard)`,
    /// the DTSA-II seeding.
    fn initial_composition(&self) -> Composition {
        let standards = self.measurement.standards();
        self.measurement
            .kratios()
            .iter()
            .map(|(&z, k)| {
                let standard_wf = standards.get(&z).map_or(1.0, |m| m.composition.get(z));
                (z, k.value * standard_wf)
            })
            .collect()
    }

    fn apply_rules(&self, composition: &mut Composition) -> DomainResult<()> {
        for rule in self.measurement.rules().values() {
            rule.update(composition)?;
        }
        Ok(())
    }

    /// Simulates every (element, standard) pair once and reads back the
    /// standard intensities.
    async fn run_standards(
        &self,
        shutdown: &mut broadcast::Receiver<()>,
    ) -> DomainResult<BTreeMap<u32, Intensity>> {
        let measurement = &self.measurement;
        let mut intensities = BTreeMap::new();

        for (&z, standard) in measurement.standards() {
            let template = measurement.options();
            let mut options = SimulationOptions::new(
                format!("{}-std{z}", template.name),
                template.beam,
                SampleGeometry::substrate(standard.clone()),
            );
            options.detectors = template.detectors.clone();

            debug!(name = %options.name, "simulating standard");
            let results = self.submit_and_await(options, shutdown).await?;

            let transition = measurement.transitions()[&z];
            let intensity = results
                .intensity(measurement.detector_key(), &transition)
                .ok_or(DomainError::MissingStandardIntensity(z))?;
            intensities.insert(z, intensity);
        }

        Ok(intensities)
    }

    /// Normalizes a copy of the composition, assigns it to the unknown body
    /// and simulates it.
    async fn run_iteration(
        &self,
        index: u32,
        composition: &Composition,
        shutdown: &mut broadcast::Receiver<()>,
    ) -> DomainResult<ResultSet> {
        let measurement = &self.measurement;
        let mut simulated = composition.clone();
        self.apply_rules(&mut simulated)?;
        simulated.normalize();

        let mut options = measurement.options().clone();
        options.name = format!("{}-iteration{index}", options.name);
        options
            .geometry
            .material_of_mut(measurement.unknown_body())?
            .composition = simulated;

        debug!(name = %options.name, "simulating iteration");
        self.submit_and_await(options, shutdown).await
    }

    /// Unknown intensities per measured element; a missing transition in the
    /// result set reads as zero so the loop can keep probing.
    fn read_intensities(&self, results: &ResultSet) -> BTreeMap<u32, Intensity> {
        let measurement = &self.measurement;
        measurement
            .transitions()
            .iter()
            .map(|(&z, transition)| {
                let intensity = results
                    .intensity(measurement.detector_key(), transition)
                    .unwrap_or(Intensity::new(0.0, 0.0));
                (z, intensity)
            })
            .collect()
    }

    /// Submits one job and awaits it, cancelling the job if shutdown fires
    /// first.
    async fn submit_and_await(
        &self,
        options: SimulationOptions,
        shutdown: &mut broadcast::Receiver<()>,
    ) -> DomainResult<ResultSet> {
        let handle = self.runner.submit(options).await?;
        select! {
            result = self.runner.await_result(handle) => result,
            () = recv_shutdown(shutdown) => {
                let _ = self.runner.cancel(handle).await;
                Err(DomainError::Cancelled)
            }
        }
    }
}

/// Resolves when a shutdown signal arrives. A closed channel means shutdown
/// can never be requested, so it pends forever instead of firing spuriously.
async fn recv_shutdown(shutdown: &mut broadcast::Receiver<()>) {
    loop {
        match shutdown.recv().await {
            Ok(()) | Err(broadcast::error::RecvError::Lagged(_)) => return,
            Err(broadcast::error::RecvError::Closed) => std::future::pending::<()>().await,
        }
    }
}
