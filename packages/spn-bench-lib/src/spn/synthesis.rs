use rand::{Rng, seq::SliceRandom};

use crate::{
    error::ArgumentError,
    spn::{FiringRates, SpnMatrix},
};

/// Structural parameters for random SPN synthesis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SynthesisParams {
    pub places: usize,
    pub transitions: usize,
    /// Probability of turning each remaining zero arc position into an arc
    /// after the spanning tree is built.
    pub connection_prob: f64,
    /// Firing rates are drawn uniformly from the integers `1..=max_rate`.
    pub max_rate: u32,
}

impl SynthesisParams {
    pub fn new(places: usize, transitions: usize) -> Self {
        SynthesisParams {
            places,
            transitions,
            connection_prob: 0.1,
            max_rate: 10,
        }
    }

    pub fn with_connection_prob(mut self, connection_prob: f64) -> Self {
        self.connection_prob = connection_prob;
        self
    }

    pub fn with_max_rate(mut self, max_rate: u32) -> Self {
        self.max_rate = max_rate;
        self
    }

    pub fn validate(&self) -> Result<(), ArgumentError> {
        if self.places == 0 {
            return Err(ArgumentError::NoPlaces(self.places));
        }
        if self.transitions == 0 {
            return Err(ArgumentError::NoTransitions(self.transitions));
        }
        if !(0.0..=1.0).contains(&self.connection_prob) || self.connection_prob.is_nan() {
            return Err(ArgumentError::ProbabilityOutOfRange(self.connection_prob));
        }
        if self.max_rate == 0 {
            return Err(ArgumentError::ZeroMaxRate(self.max_rate));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Node {
    Place(usize),
    Transition(usize),
}

/// Generates one random SPN whose underlying undirected bipartite graph is
/// connected and whose initial marking holds at least one token.
pub fn synthesize<R: Rng>(
    params: &SynthesisParams,
    rng: &mut R,
) -> Result<(SpnMatrix, FiringRates), ArgumentError> {
    params.validate()?;

    let mut matrix = SpnMatrix::new(params.places, params.transitions);
    seed_spanning_tree(&mut matrix, rng);
    densify(&mut matrix, params.connection_prob, rng);
    draw_initial_marking(&mut matrix, rng);

    let rates = draw_rates(params, rng);

    Ok((matrix, rates))
}

/// Batch synthesis. With `shared_structure`, the spanning-tree arcs are
/// generated once and replicated across all outputs; every output still
/// receives its own densification, initial marking and rates, producing a
/// family that differs only in dynamics.
pub fn synthesize_many<R: Rng>(
    params: &SynthesisParams,
    count: usize,
    shared_structure: bool,
    rng: &mut R,
) -> Result<Vec<(SpnMatrix, FiringRates)>, ArgumentError> {
    params.validate()?;
    if count == 0 {
        return Err(ArgumentError::EmptyBatch);
    }

    if !shared_structure {
        return (0..count).map(|_| synthesize(params, rng)).collect();
    }

    let mut skeleton = SpnMatrix::new(params.places, params.transitions);
    seed_spanning_tree(&mut skeleton, rng);

    let mut out = Vec::with_capacity(count);
    for _ in 0..count {
        let mut matrix = skeleton.clone();
        densify(&mut matrix, params.connection_prob, rng);
        draw_initial_marking(&mut matrix, rng);
        out.push((matrix, draw_rates(params, rng)));
    }
    Ok(out)
}

/// Connects all places and transitions into one spanning tree of the
/// bipartite graph. Every node added after the seed pair attaches to a
/// uniformly random already-connected node of the other kind, with the arc
/// direction decided by a fair coin.
fn seed_spanning_tree<R: Rng>(matrix: &mut SpnMatrix, rng: &mut R) {
    let places = matrix.place_count();
    let transitions = matrix.transition_count();

    let p0 = rng.gen_range(0..places);
    let t0 = rng.gen_range(0..transitions);
    add_random_direction_arc(matrix, p0, t0, rng);

    let mut connected_places = vec![p0];
    let mut connected_transitions = vec![t0];

    let mut pending: Vec<Node> = (0..places)
        .filter(|&p| p != p0)
        .map(Node::Place)
        .chain((0..transitions).filter(|&t| t != t0).map(Node::Transition))
        .collect();
    pending.shuffle(rng);

    for node in pending {
        match node {
            Node::Place(p) => {
                let t = connected_transitions[rng.gen_range(0..connected_transitions.len())];
                add_random_direction_arc(matrix, p, t, rng);
                connected_places.push(p);
            }
            Node::Transition(t) => {
                let p = connected_places[rng.gen_range(0..connected_places.len())];
                add_random_direction_arc(matrix, p, t, rng);
                connected_transitions.push(t);
            }
        }
    }
}

fn add_random_direction_arc<R: Rng>(
    matrix: &mut SpnMatrix,
    place: usize,
    transition: usize,
    rng: &mut R,
) {
    if rng.gen_bool(0.5) {
        matrix.set_tin(place, transition, 1);
    } else {
        matrix.set_tout(place, transition, 1);
    }
}

/// Turns each remaining zero position of `Tin` and `Tout` into an arc with
/// probability `prob`, independently.
fn densify<R: Rng>(matrix: &mut SpnMatrix, prob: f64, rng: &mut R) {
    if prob == 0.0 {
        return;
    }
    for p in 0..matrix.place_count() {
        for t in 0..matrix.transition_count() {
            if matrix.tin(p, t) == 0 && rng.gen_bool(prob) {
                matrix.set_tin(p, t, 1);
            }
            if matrix.tout(p, t) == 0 && rng.gen_bool(prob) {
                matrix.set_tout(p, t, 1);
            }
        }
    }
}

/// Draws each initial token count from `{0, 1}` with equal probability,
/// redrawing until the marking is not all-zero.
fn draw_initial_marking<R: Rng>(matrix: &mut SpnMatrix, rng: &mut R) {
    if !matrix.initial_marking().is_zero() {
        return;
    }
    loop {
        for p in 0..matrix.place_count() {
            matrix.set_m0(p, rng.gen_range(0..2));
        }
        if !matrix.initial_marking().is_zero() {
            return;
        }
    }
}

fn draw_rates<R: Rng>(params: &SynthesisParams, rng: &mut R) -> FiringRates {
    (0..params.transitions)
        .map(|_| rng.gen_range(1..=params.max_rate) as f64)
        .collect::<Vec<_>>()
        .into()
}
