//! Persisted result container.
//!
//! One quantification result is stored as a directory holding two files:
//! `compositions.csv`, one row per iteration with one column per element
//! (weight fractions, absent elements written as 0.0), and `stats.json` with
//! the run statistics and strategy provenance.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::domain::models::element::{atomic_number, symbol};
use crate::domain::models::{Composition, TerminalState};
use crate::services::quantification::QuantificationConfig;
use crate::domain::models::QuantificationState;

const COMPOSITIONS_FILE: &str = "compositions.csv";
const STATS_FILE: &str = "stats.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Stats {
    iterations: usize,
    elapsed_time_s: f64,
    max_iterations: u32,
    convergence_limit: f64,
    iterator: String,
    convergor: String,
    terminal: Option<TerminalState>,
}

/// Complete, self-describing record of one quantification run.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultArchive {
    /// Composition snapshot per iteration, oldest first.
    pub compositions: Vec<Composition>,
    pub elapsed_time_s: f64,
    pub max_iterations: u32,
    pub convergence_limit: f64,
    pub iterator: String,
    pub convergor: String,
    pub terminal: Option<TerminalState>,
}

impl ResultArchive {
    /// Snapshots a finished (or failed) loop state.
    pub fn from_state(state: &QuantificationState, config: &QuantificationConfig) -> Self {
        Self {
            compositions: state
                .history
                .iter()
                .map(|record| record.composition.clone())
                .collect(),
            elapsed_time_s: state.elapsed.as_secs_f64(),
            max_iterations: config.max_iterations,
            convergence_limit: config.criterion.limit(),
            iterator: config.algorithm.name().to_string(),
            convergor: config.criterion.name().to_string(),
            terminal: state.terminal,
        }
    }

    pub fn iterations(&self) -> usize {
        self.compositions.len()
    }

    /// Composition of the last iteration, if any completed.
    pub fn final_composition(&self) -> Option<&Composition> {
        self.compositions.last()
    }

    /// Writes the archive into `dir`, creating it if needed. An existing
    /// archive in the same directory is overwritten.
    pub fn save(&self, dir: impl AsRef<Path>) -> Result<()> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create archive directory {}", dir.display()))?;

        self.write_compositions(&dir.join(COMPOSITIONS_FILE))?;

        let stats = Stats {
            iterations: self.compositions.len(),
            elapsed_time_s: self.elapsed_time_s,
            max_iterations: self.max_iterations,
            convergence_limit: self.convergence_limit,
            iterator: self.iterator.clone(),
            convergor: self.convergor.clone(),
            terminal: self.terminal,
        };
        let json = serde_json::to_string_pretty(&stats)?;
        fs::write(dir.join(STATS_FILE), json)
            .with_context(|| format!("failed to write {}", STATS_FILE))?;
        Ok(())
    }

    /// Reads an archive back from `dir`.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();

        let json = fs::read_to_string(dir.join(STATS_FILE))
            .with_context(|| format!("failed to read {} in {}", STATS_FILE, dir.display()))?;
        let stats: Stats = serde_json::from_str(&json)
            .with_context(|| format!("failed to parse {}", STATS_FILE))?;

        let compositions = read_compositions(&dir.join(COMPOSITIONS_FILE))?;
        if compositions.len() != stats.iterations {
            bail!(
                "archive is inconsistent: stats claim {} iterations, {} holds {} rows",
                stats.iterations,
                COMPOSITIONS_FILE,
                compositions.len()
            );
        }

        Ok(Self {
            compositions,
            elapsed_time_s: stats.elapsed_time_s,
            max_iterations: stats.max_iterations,
            convergence_limit: stats.convergence_limit,
            iterator: stats.iterator,
            convergor: stats.convergor,
            terminal: stats.terminal,
        })
    }

    fn write_compositions(&self, path: &Path) -> Result<()> {
        // A loop that failed before its first iteration has no rows and no
        // element columns; write an empty file rather than a blank header.
        if self.compositions.is_empty() {
            fs::write(path, "")
                .with_context(|| format!("failed to write {}", path.display()))?;
            return Ok(());
        }

        // Columns cover the union of elements over all iterations.
        let elements: BTreeSet<u32> = self
            .compositions
            .iter()
            .flat_map(Composition::elements)
            .collect();

        let mut writer = csv::Writer::from_path(path)
            .with_context(|| format!("failed to create {}", path.display()))?;

        let header: Vec<&str> = elements.iter().map(|&z| symbol(z)).collect();
        writer.write_record(&header)?;

        for composition in &self.compositions {
            let row: Vec<String> = elements
                .iter()
                .map(|&z| composition.get(z).to_string())
                .collect();
            writer.write_record(&row)?;
        }
        writer.flush()?;
        Ok(())
    }
}

fn read_compositions(path: &Path) -> Result<Vec<Composition>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    if content.trim().is_empty() {
        return Ok(Vec::new());
    }
    let mut reader = csv::Reader::from_reader(content.as_bytes());

    let elements: Vec<u32> = reader
        .headers()?
        .iter()
        .map(|name| {
            atomic_number(name)
                .with_context(|| format!("unknown element symbol {name:?} in {}", path.display()))
        })
        .collect::<Result<_>>()?;

    let mut compositions = Vec::new();
    for record in reader.records() {
        let record = record?;
        let mut composition = Composition::new();
        for (&z, field) in elements.iter().zip(record.iter()) {
            let wf: f64 = field
                .parse()
                .with_context(|| format!("invalid weight fraction {field:?}"))?;
            composition.set(z, wf);
        }
        compositions.push(composition);
    }
    Ok(compositions)
}
