use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{ctmc::solve::SolverKind, error::ArgumentError, reachability::ExploreLimits};

/// Parameters of one dataset generation run. Deserializable from a TOML
/// file; every field has a default so partial files work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorOptions {
    pub min_places: usize,
    pub max_places: usize,
    pub min_transitions: usize,
    pub max_transitions: usize,
    /// Sorted state-count bucket boundaries; empty means a single bucket.
    pub state_bins: Vec<usize>,
    /// Valid SPNs to collect per `(places, transitions, bucket)` bin.
    pub per_bin: usize,
    pub connection_prob: f64,
    pub max_rate: u32,
    pub place_limit: u32,
    pub mark_limit: usize,
    pub solver: SolverKind,
    /// Candidates per batch; defaults to the worker count.
    pub mini_batch_size: Option<usize>,
    /// Defaults to the machine's available parallelism.
    pub worker_count: Option<usize>,
    pub master_seed: u64,
    /// Total candidate cap; unfilled bins are reported as warnings when it
    /// is reached. No cap means the run only ends when all bins are full.
    pub max_attempts: Option<u64>,
    /// Reuse one spanning-tree skeleton per mini batch (marking and rates
    /// still vary per candidate).
    pub shared_structure: bool,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        GeneratorOptions {
            min_places: 2,
            max_places: 5,
            min_transitions: 2,
            max_transitions: 5,
            state_bins: vec![16, 64, 256],
            per_bin: 10,
            connection_prob: 0.1,
            max_rate: 10,
            place_limit: 10,
            mark_limit: 500,
            solver: SolverKind::Exact,
            mini_batch_size: None,
            worker_count: None,
            master_seed: 42,
            max_attempts: Some(1_000_000),
            shared_structure: false,
        }
    }
}

impl GeneratorOptions {
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    pub fn validate(&self) -> Result<(), ArgumentError> {
        if self.min_places == 0 || self.min_places > self.max_places {
            return Err(ArgumentError::EmptyRange {
                min: self.min_places,
                max: self.max_places,
            });
        }
        if self.min_transitions == 0 || self.min_transitions > self.max_transitions {
            return Err(ArgumentError::EmptyRange {
                min: self.min_transitions,
                max: self.max_transitions,
            });
        }
        if self.state_bins.windows(2).any(|w| w[0] >= w[1]) {
            return Err(ArgumentError::UnsortedStateBins(self.state_bins.clone()));
        }
        if self.per_bin == 0 {
            return Err(ArgumentError::ZeroPerBin);
        }
        if !(0.0..=1.0).contains(&self.connection_prob) || self.connection_prob.is_nan() {
            return Err(ArgumentError::ProbabilityOutOfRange(self.connection_prob));
        }
        if self.max_rate == 0 {
            return Err(ArgumentError::ZeroMaxRate(self.max_rate));
        }
        if self.worker_count == Some(0) {
            return Err(ArgumentError::ZeroWorkers);
        }
        if self.mini_batch_size == Some(0) {
            return Err(ArgumentError::EmptyBatch);
        }
        Ok(())
    }

    pub fn resolved_worker_count(&self) -> usize {
        self.worker_count.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }

    pub fn resolved_mini_batch_size(&self) -> usize {
        self.mini_batch_size
            .unwrap_or_else(|| self.resolved_worker_count())
    }

    pub fn explore_limits(&self) -> ExploreLimits {
        ExploreLimits::default()
            .with_place_limit(self.place_limit)
            .with_mark_limit(self.mark_limit)
    }

    pub fn with_places(mut self, min: usize, max: usize) -> Self {
        self.min_places = min;
        self.max_places = max;
        self
    }

    pub fn with_transitions(mut self, min: usize, max: usize) -> Self {
        self.min_transitions = min;
        self.max_transitions = max;
        self
    }

    pub fn with_state_bins(mut self, state_bins: Vec<usize>) -> Self {
        self.state_bins = state_bins;
        self
    }

    pub fn with_per_bin(mut self, per_bin: usize) -> Self {
        self.per_bin = per_bin;
        self
    }

    pub fn with_master_seed(mut self, master_seed: u64) -> Self {
        self.master_seed = master_seed;
        self
    }

    pub fn with_worker_count(mut self, worker_count: usize) -> Self {
        self.worker_count = Some(worker_count);
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: Option<u64>) -> Self {
        self.max_attempts = max_attempts;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert!(GeneratorOptions::default().validate().is_ok());
    }

    #[test]
    fn bad_ranges_are_rejected() {
        let options = GeneratorOptions::default().with_places(4, 2);
        assert!(matches!(
            options.validate(),
            Err(ArgumentError::EmptyRange { .. })
        ));

        let options = GeneratorOptions::default().with_transitions(0, 2);
        assert!(options.validate().is_err());
    }

    #[test]
    fn parses_partial_toml() {
        let options: GeneratorOptions = toml::from_str(
            r#"
            min_places = 3
            max_places = 4
            per_bin = 2
            state_bins = [8, 32]
            solver = "gmres"
            "#,
        )
        .unwrap();

        assert_eq!(options.min_places, 3);
        assert_eq!(options.per_bin, 2);
        assert_eq!(options.solver, SolverKind::Gmres);
        // untouched fields keep their defaults
        assert_eq!(options.mark_limit, 500);
    }
}
