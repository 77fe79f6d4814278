use thiserror::Error;

/// Validation failures on caller-supplied arguments. These surface to the
/// caller directly; nothing recovers from them.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ArgumentError {
    #[error("place count must be at least 1, got {0}")]
    NoPlaces(usize),

    #[error("transition count must be at least 1, got {0}")]
    NoTransitions(usize),

    #[error("connection probability must be in [0, 1], got {0}")]
    ProbabilityOutOfRange(f64),

    #[error("maximum firing rate must be at least 1, got {0}")]
    ZeroMaxRate(u32),

    #[error("batch size must be at least 1")]
    EmptyBatch,

    #[error("range [{min}, {max}] is empty")]
    EmptyRange { min: usize, max: usize },

    #[error("state bin boundaries must be strictly ascending: {0:?}")]
    UnsortedStateBins(Vec<usize>),

    #[error("per-bin target must be at least 1")]
    ZeroPerBin,

    #[error("worker count must be at least 1")]
    ZeroWorkers,

    #[error("matrix row {row} has width {got}, expected {expected}")]
    RaggedMatrix {
        row: usize,
        got: usize,
        expected: usize,
    },

    #[error("arc entry at place {place}, column {column} is {value}, arcs must be 0 or 1")]
    NonUnitArc {
        place: usize,
        column: usize,
        value: u32,
    },

    #[error("firing rate vector has length {got}, expected {expected}")]
    RateCountMismatch { got: usize, expected: usize },
}
