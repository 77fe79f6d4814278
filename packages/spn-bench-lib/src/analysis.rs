use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::{ctmc::solve::SolveError, reachability::ReachabilityGraph};

const SUM_TOLERANCE: f64 = 1e-6;
const NEGATIVE_TOLERANCE: f64 = 1e-9;

/// Validated steady-state distribution over the states of a reachability
/// graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SteadyState {
    probabilities: Array1<f64>,
}

impl SteadyState {
    /// Checks that a raw solver solution is a probability vector: finite,
    /// summing to one, and non-negative up to rounding. Tiny negative
    /// entries are clamped to zero.
    pub fn from_solution(mut pi: Array1<f64>) -> Result<Self, SolveError> {
        if pi.iter().any(|v| !v.is_finite()) {
            return Err(SolveError::NotAProbability { sum: f64::NAN });
        }

        let sum: f64 = pi.sum();
        if (sum - 1.0).abs() > SUM_TOLERANCE {
            return Err(SolveError::NotAProbability { sum });
        }
        if pi.iter().any(|&v| v < -NEGATIVE_TOLERANCE) {
            return Err(SolveError::NotAProbability { sum });
        }

        for v in pi.iter_mut() {
            if *v < 0.0 {
                *v = 0.0;
            }
        }

        Ok(SteadyState { probabilities: pi })
    }

    pub fn probabilities(&self) -> &Array1<f64> {
        &self.probabilities
    }

    pub fn state_count(&self) -> usize {
        self.probabilities.len()
    }
}

/// Steady-state metrics derived for one SPN.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpnAnalysis {
    /// Shape `P x (K + 1)` where `K` is the largest observed token count;
    /// entry `(p, k)` is the steady-state probability that place `p` holds
    /// exactly `k` tokens. Every row sums to one.
    pub marking_density: Array2<f64>,
    /// `mean_tokens[p] = sum_k k * marking_density[p, k]`.
    pub mean_tokens: Array1<f64>,
    pub total_mean_tokens: f64,
}

/// Derives marking density and mean token counts from a steady state.
pub fn analyze(graph: &ReachabilityGraph, steady: &SteadyState) -> SpnAnalysis {
    debug_assert_eq!(graph.state_count(), steady.state_count());

    let places = graph.markings[0].place_count();
    let max_tokens = graph.max_token_count() as usize;

    let mut density = Array2::zeros((places, max_tokens + 1));
    for (marking, &pi) in graph.markings.iter().zip(steady.probabilities().iter()) {
        for (p, &tokens) in marking.iter().enumerate() {
            density[[p, tokens as usize]] += pi;
        }
    }

    let mean_tokens: Array1<f64> = (0..places)
        .map(|p| {
            (0..=max_tokens)
                .map(|k| k as f64 * density[[p, k]])
                .sum::<f64>()
        })
        .collect();
    let total_mean_tokens = mean_tokens.sum();

    SpnAnalysis {
        marking_density: density,
        mean_tokens,
        total_mean_tokens,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        reachability::{ExploreLimits, get_reachability_graph},
        spn::SpnMatrix,
    };

    #[test]
    fn rejects_non_distributions() {
        assert!(SteadyState::from_solution(Array1::from(vec![0.7, 0.7])).is_err());
        assert!(SteadyState::from_solution(Array1::from(vec![1.5, -0.5])).is_err());
        assert!(SteadyState::from_solution(Array1::from(vec![f64::NAN, 1.0])).is_err());
    }

    #[test]
    fn clamps_rounding_noise() {
        let pi = SteadyState::from_solution(Array1::from(vec![1.0 + 1e-12, -1e-12])).unwrap();

        assert!(pi.probabilities().iter().all(|&v| v >= 0.0));
    }

    #[test]
    fn producer_consumer_metrics() {
        let matrix =
            SpnMatrix::from_rows(vec![vec![1, 0, 0, 1, 1], vec![0, 1, 1, 0, 0]]).unwrap();
        let graph = get_reachability_graph(&matrix, ExploreLimits::default());
        let steady = SteadyState::from_solution(Array1::from(vec![0.5, 0.5])).unwrap();

        let analysis = analyze(&graph, &steady);

        // each place holds 0 or 1 token with equal probability
        assert_eq!(analysis.marking_density.shape(), &[2, 2]);
        for p in 0..2 {
            assert!((analysis.marking_density[[p, 0]] - 0.5).abs() < 1e-12);
            assert!((analysis.marking_density[[p, 1]] - 0.5).abs() < 1e-12);
            assert!((analysis.mean_tokens[p] - 0.5).abs() < 1e-12);
        }
        assert!((analysis.total_mean_tokens - 1.0).abs() < 1e-12);
    }

    #[test]
    fn density_rows_sum_to_one() {
        let matrix =
            SpnMatrix::from_rows(vec![vec![1, 0, 0, 1, 2], vec![0, 1, 1, 0, 1]]).unwrap();
        let graph = get_reachability_graph(&matrix, ExploreLimits::default());
        let n = graph.state_count();
        let steady =
            SteadyState::from_solution(Array1::from(vec![1.0 / n as f64; n])).unwrap();

        let analysis = analyze(&graph, &steady);

        for row in analysis.marking_density.rows() {
            assert!((row.sum() - 1.0).abs() < 1e-9);
        }
    }
}
