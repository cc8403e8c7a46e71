//! Concurrent scheduling of quantification loops.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{broadcast, Semaphore};
use tracing::{debug, info, warn};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Measurement, QuantificationReport, TerminalState};
use crate::domain::ports::SimulationRunner;
use crate::infrastructure::archive::ResultArchive;
use crate::services::quantification::{Quantification, QuantificationConfig, QuantificationOutcome};

/// Scheduler-level knobs: worker budget and result persistence.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Upper bound on concurrently running loops.
    pub max_workers: usize,
    /// Directory receiving one result archive per measurement; `None`
    /// disables persistence.
    pub output_dir: Option<PathBuf>,
    /// Re-run and overwrite measurements whose archive already exists.
    pub overwrite: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_workers: 4,
            output_dir: None,
            overwrite: false,
        }
    }
}

/// Fans a batch of measurements out over a bounded pool of quantification
/// loops.
///
/// Measurements are queued by unique name, then `run_all` drives them all to
/// a terminal state. Loops are independent; one failing never stops the
/// others. `shutdown` broadcasts cancellation to every loop still running.
pub struct QuantificationScheduler<R: SimulationRunner + 'static> {
    runner: Arc<R>,
    config: SchedulerConfig,
    quantification: QuantificationConfig,
    measurements: BTreeMap<String, Arc<Measurement>>,
    shutdown_tx: broadcast::Sender<()>,
}

impl<R: SimulationRunner + 'static> QuantificationScheduler<R> {
    pub fn new(
        runner: Arc<R>,
        config: SchedulerConfig,
        quantification: QuantificationConfig,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            runner,
            config,
            quantification,
            measurements: BTreeMap::new(),
            shutdown_tx,
        }
    }

    /// Queues a measurement under a unique name.
    pub fn put(&mut self, name: impl Into<String>, measurement: Measurement) -> DomainResult<()> {
        let name = name.into();
        if self.measurements.contains_key(&name) {
            return Err(DomainError::DuplicateMeasurement(name));
        }
        self.measurements.insert(name, Arc::new(measurement));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.measurements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.measurements.is_empty()
    }

    /// Handle for requesting shutdown from another task.
    pub fn shutdown_handle(&self) -> broadcast::Sender<()> {
        self.shutdown_tx.clone()
    }

    /// Requests cancellation of every running loop.
    pub fn shutdown(&self) {
        // send only fails with no receivers, i.e. nothing left to cancel
        let _ = self.shutdown_tx.send(());
    }

    /// Runs every queued measurement to a terminal state and reports the
    /// results, ordered by measurement name.
    ///
    /// At most `max_workers` loops run at once. With persistence enabled and
    /// `overwrite` off, measurements whose archive already exists are skipped.
    pub async fn run_all(&mut self) -> DomainResult<Vec<QuantificationReport>> {
        let semaphore = Arc::new(Semaphore::new(self.config.max_workers.max(1)));

        // Give every queued loop its receiver before the first permit wait:
        // broadcast buffers per receiver, so a shutdown sent while the pool
        // is busy still reaches loops that have not started yet.
        let mut queued = vec![];
        for (name, measurement) in std::mem::take(&mut self.measurements) {
            if !self.config.overwrite {
                if let Some(dir) = self.archive_dir(&name) {
                    if dir.exists() {
                        info!(%name, "archive exists, skipping");
                        continue;
                    }
                }
            }
            let shutdown = self.shutdown_tx.subscribe();
            let archive_dir = self.archive_dir(&name);
            queued.push((name, measurement, shutdown, archive_dir));
        }

        let mut handles = vec![];
        for (name, measurement, shutdown, archive_dir) in queued {
            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|_| DomainError::Cancelled)?;

            let runner = Arc::clone(&self.runner);
            let quantification = self.quantification;

            let handle = tokio::spawn(async move {
                let _permit = permit;
                info!(%name, "quantification started");
                let outcome = Quantification::new(runner, measurement, quantification)
                    .run(shutdown)
                    .await;
                (name, archive_dir, outcome)
            });
            handles.push(handle);
        }

        let mut reports = Vec::new();
        for handle in handles {
            let (name, archive_dir, outcome) = handle
                .await
                .map_err(|error| DomainError::Simulation(error.to_string()))?;

            if let Some(dir) = archive_dir {
                // Failed loops leave nothing behind, so a later batch with
                // overwrite off picks them up again.
                if outcome.terminal() == TerminalState::Failed {
                    debug!(%name, "failed, not persisting");
                } else {
                    let archive = ResultArchive::from_state(&outcome.state, &self.quantification);
                    if let Err(error) = archive.save(&dir) {
                        warn!(%name, %error, "failed to persist result archive");
                    }
                }
            }

            reports.push(self.report(name, &outcome));
        }

        reports.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(reports)
    }

    fn archive_dir(&self, name: &str) -> Option<PathBuf> {
        self.config.output_dir.as_ref().map(|dir| dir.join(name))
    }

    fn report(&self, name: String, outcome: &QuantificationOutcome) -> QuantificationReport {
        QuantificationReport {
            name,
            composition: outcome.state.composition.clone(),
            iterations: outcome.state.iteration_count,
            elapsed: outcome.state.elapsed,
            terminal: outcome.terminal(),
            iterator: self.quantification.algorithm.name().to_string(),
            convergor: self.quantification.criterion.name().to_string(),
            completed_at: Utc::now(),
            error: outcome.error.as_ref().map(ToString::to_string),
        }
    }
}
