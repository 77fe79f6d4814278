use std::{fmt::Display, str::FromStr};

use ndarray::Array1;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ctmc::sparse::CscMatrix;

pub mod gmres;
pub mod lu;

use gmres::{GmresOptions, gmres};
use lu::LuFactors;

/// Failure of a steady-state solve. These are candidate rejections, not
/// fatal errors: the generator logs them and draws the next candidate.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
pub enum SolveError {
    #[error("matrix is singular at column {column}")]
    Singular { column: usize },

    #[error("numerical breakdown at iteration {iteration}")]
    Breakdown { iteration: usize },

    #[error("no convergence after {iterations} iterations (residual {residual:e})")]
    DidNotConverge { iterations: usize, residual: f64 },

    #[error("solution is not a probability distribution (sum {sum})")]
    NotAProbability { sum: f64 },
}

/// Strategy interface for solving the constrained steady-state system
/// `A pi = y`. Implementations may fail; failure rejects the candidate.
pub trait SteadyStateSolver {
    fn name(&self) -> &'static str;
    fn solve(&self, a: &CscMatrix, y: &Array1<f64>) -> Result<Array1<f64>, SolveError>;
}

/// Reference solver: direct sparse LU.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectSolver;

impl SteadyStateSolver for DirectSolver {
    fn name(&self) -> &'static str {
        "exact"
    }

    fn solve(&self, a: &CscMatrix, y: &Array1<f64>) -> Result<Array1<f64>, SolveError> {
        Ok(LuFactors::factorize(a)?.solve(y))
    }
}

/// Iterative solver: restarted GMRES. Approximate; its precision loss
/// against the direct solver is what the benchmark mode measures.
#[derive(Debug, Clone, Copy, Default)]
pub struct GmresSolver {
    pub options: GmresOptions,
}

impl SteadyStateSolver for GmresSolver {
    fn name(&self) -> &'static str {
        "gmres"
    }

    fn solve(&self, a: &CscMatrix, y: &Array1<f64>) -> Result<Array1<f64>, SolveError> {
        gmres(a, y, &self.options)
    }
}

/// Which solver the pipeline uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SolverKind {
    #[default]
    Exact,
    Gmres,
}

impl SolverKind {
    pub fn instantiate(&self) -> Box<dyn SteadyStateSolver + Send + Sync> {
        match self {
            SolverKind::Exact => Box::new(DirectSolver),
            SolverKind::Gmres => Box::new(GmresSolver::default()),
        }
    }
}

impl FromStr for SolverKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "exact" | "lu" | "direct" => Ok(SolverKind::Exact),
            "gmres" | "iterative" => Ok(SolverKind::Gmres),
            _ => Err(anyhow::anyhow!("unknown solver: {}", s)),
        }
    }
}

impl Display for SolverKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SolverKind::Exact => write!(f, "exact"),
            SolverKind::Gmres => write!(f, "gmres"),
        }
    }
}
