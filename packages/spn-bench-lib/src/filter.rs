use serde::{Deserialize, Serialize};

use crate::{
    analysis::{SpnAnalysis, SteadyState, analyze},
    ctmc::{build_generator, constrained_system, solve::SolveError, solve::SolverKind},
    reachability::{ExploreLimits, ReachabilityGraph, ReachabilityExplorer},
    spn::{FiringRates, SpnMatrix, repair::has_no_isolated_nodes},
};

/// Everything recorded for an SPN that passed the validity pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpnRecord {
    pub matrix: SpnMatrix,
    pub rates: FiringRates,
    pub graph: ReachabilityGraph,
    pub steady_state: SteadyState,
    pub analysis: SpnAnalysis,
}

impl SpnRecord {
    pub fn state_count(&self) -> usize {
        self.graph.state_count()
    }

    pub fn to_json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Why a candidate was rejected. One variant per stage of the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RejectReason {
    /// The net has an isolated place or transition.
    Disconnected,
    /// Exploration hit the place or mark limit.
    Unbounded,
    /// The steady-state solve failed.
    Unsolvable(SolveError),
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectReason::Disconnected => write!(f, "disconnected"),
            RejectReason::Unbounded => write!(f, "unbounded"),
            RejectReason::Unsolvable(e) => write!(f, "unsolvable: {}", e),
        }
    }
}

/// Outcome of running one candidate through the pipeline. Rejections are
/// ordinary values; the generator recovers by drawing the next candidate.
#[derive(Debug, Clone, PartialEq)]
pub enum CandidateOutcome {
    Valid(Box<SpnRecord>),
    Invalid(RejectReason),
}

impl CandidateOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, CandidateOutcome::Valid(_))
    }

    pub fn unwrap_valid(self) -> SpnRecord {
        match self {
            CandidateOutcome::Valid(record) => *record,
            CandidateOutcome::Invalid(reason) => {
                panic!("called unwrap_valid on a rejected candidate: {}", reason)
            }
        }
    }

    pub fn reject_reason(&self) -> Option<&RejectReason> {
        match self {
            CandidateOutcome::Valid(_) => None,
            CandidateOutcome::Invalid(reason) => Some(reason),
        }
    }
}

/// Options of the validity pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilterOptions {
    pub place_limit: u32,
    /// Accepted for signature compatibility with older tooling; the
    /// pipeline never reads it.
    pub marks_lower_limit: usize,
    pub marks_upper_limit: usize,
    pub solver: SolverKind,
}

impl Default for FilterOptions {
    fn default() -> Self {
        FilterOptions {
            place_limit: 10,
            marks_lower_limit: 4,
            marks_upper_limit: 500,
            solver: SolverKind::Exact,
        }
    }
}

impl FilterOptions {
    pub fn with_place_limit(mut self, place_limit: u32) -> Self {
        self.place_limit = place_limit;
        self
    }

    pub fn with_marks_upper_limit(mut self, marks_upper_limit: usize) -> Self {
        self.marks_upper_limit = marks_upper_limit;
        self
    }

    pub fn with_solver(mut self, solver: SolverKind) -> Self {
        self.solver = solver;
        self
    }

    pub fn explore_limits(&self) -> ExploreLimits {
        ExploreLimits::default()
            .with_place_limit(self.place_limit)
            .with_mark_limit(self.marks_upper_limit)
    }
}

/// Runs one candidate through connectivity, boundedness and solvability.
///
/// The candidate walks `CANDIDATE -> CONNECTED -> BOUNDED -> SOLVABLE ->
/// VALID`; the first failing stage produces the rejection. Structural repair
/// is the caller's concern and must happen before this check.
pub fn filter_spn(
    matrix: &SpnMatrix,
    rates: Option<&FiringRates>,
    options: &FilterOptions,
) -> CandidateOutcome {
    // CANDIDATE -> CONNECTED
    if !has_no_isolated_nodes(matrix) {
        return CandidateOutcome::Invalid(RejectReason::Disconnected);
    }

    // CONNECTED -> BOUNDED
    let graph = ReachabilityExplorer::new(matrix, options.explore_limits()).explore();
    if !graph.bounded {
        return CandidateOutcome::Invalid(RejectReason::Unbounded);
    }

    let owned_rates;
    let rates = match rates {
        Some(rates) => rates,
        None => {
            owned_rates = FiringRates::uniform(matrix.transition_count());
            &owned_rates
        }
    };

    // BOUNDED -> SOLVABLE
    let q = build_generator(&graph, rates);
    let (a, y) = constrained_system(&q);
    let solution = match options.solver.instantiate().solve(&a, &y) {
        Ok(solution) => solution,
        Err(e) => return CandidateOutcome::Invalid(RejectReason::Unsolvable(e)),
    };
    let steady_state = match SteadyState::from_solution(solution) {
        Ok(steady_state) => steady_state,
        Err(e) => return CandidateOutcome::Invalid(RejectReason::Unsolvable(e)),
    };

    // SOLVABLE -> VALID
    let analysis = analyze(&graph, &steady_state);

    CandidateOutcome::Valid(Box::new(SpnRecord {
        matrix: matrix.clone(),
        rates: rates.clone(),
        graph,
        steady_state,
        analysis,
    }))
}
