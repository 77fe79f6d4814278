use serde::{Deserialize, Serialize};

use crate::{
    error::ArgumentError,
    marking::{Marking, MarkingDelta},
};

pub mod repair;
pub mod synthesis;
pub mod text;

pub type PlaceId = usize;
pub type TransitionId = usize;

/// A stochastic Petri net in compound matrix form.
///
/// The matrix has shape `P x (2T + 1)` and is partitioned as
/// `[Tin | Tout | M0]`: `Tin[p, t]` is 1 iff place `p` is an input of
/// transition `t`, `Tout[p, t]` is 1 iff it is an output, and the last
/// column holds the initial marking. Arcs carry unit weight only; the
/// constructors reject anything else in the arc area.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpnMatrix {
    places: usize,
    transitions: usize,
    data: Box<[u32]>,
}

impl SpnMatrix {
    /// An empty net: no arcs, all-zero initial marking.
    pub fn new(places: usize, transitions: usize) -> Self {
        SpnMatrix {
            places,
            transitions,
            data: vec![0; places * (2 * transitions + 1)].into_boxed_slice(),
        }
    }

    /// Builds a matrix from compound-form rows `[Tin | Tout | M0]`.
    pub fn from_rows(rows: Vec<Vec<u32>>) -> Result<Self, ArgumentError> {
        let places = rows.len();
        if places == 0 {
            return Err(ArgumentError::NoPlaces(0));
        }

        let width = rows[0].len();
        if width < 3 || width % 2 == 0 {
            return Err(ArgumentError::RaggedMatrix {
                row: 0,
                got: width,
                expected: width + 1,
            });
        }
        let transitions = (width - 1) / 2;

        let mut data = Vec::with_capacity(places * width);
        for (p, row) in rows.iter().enumerate() {
            if row.len() != width {
                return Err(ArgumentError::RaggedMatrix {
                    row: p,
                    got: row.len(),
                    expected: width,
                });
            }
            for (column, &value) in row.iter().enumerate() {
                if column < 2 * transitions && value > 1 {
                    return Err(ArgumentError::NonUnitArc {
                        place: p,
                        column,
                        value,
                    });
                }
                data.push(value);
            }
        }

        Ok(SpnMatrix {
            places,
            transitions,
            data: data.into_boxed_slice(),
        })
    }

    pub fn place_count(&self) -> usize {
        self.places
    }

    pub fn transition_count(&self) -> usize {
        self.transitions
    }

    fn row_width(&self) -> usize {
        2 * self.transitions + 1
    }

    pub fn tin(&self, place: PlaceId, transition: TransitionId) -> u32 {
        self.data[place * self.row_width() + transition]
    }

    pub fn tout(&self, place: PlaceId, transition: TransitionId) -> u32 {
        self.data[place * self.row_width() + self.transitions + transition]
    }

    pub fn m0(&self, place: PlaceId) -> u32 {
        self.data[place * self.row_width() + 2 * self.transitions]
    }

    pub fn set_tin(&mut self, place: PlaceId, transition: TransitionId, value: u32) {
        debug_assert!(value <= 1, "arcs carry unit weight");
        let w = self.row_width();
        self.data[place * w + transition] = value;
    }

    pub fn set_tout(&mut self, place: PlaceId, transition: TransitionId, value: u32) {
        debug_assert!(value <= 1, "arcs carry unit weight");
        let w = self.row_width();
        self.data[place * w + self.transitions + transition] = value;
    }

    pub fn set_m0(&mut self, place: PlaceId, tokens: u32) {
        let w = self.row_width();
        self.data[place * w + 2 * self.transitions] = tokens;
    }

    pub fn initial_marking(&self) -> Marking {
        (0..self.places).map(|p| self.m0(p)).collect()
    }

    /// Column `t` of the incidence matrix `C = Tout - Tin`: the marking
    /// change produced by firing transition `t`.
    pub fn incidence_column(&self, transition: TransitionId) -> MarkingDelta {
        (0..self.places)
            .map(|p| self.tout(p, transition) as i32 - self.tin(p, transition) as i32)
            .collect::<Vec<_>>()
            .into()
    }

    /// A transition is enabled iff every place holds at least the tokens its
    /// input arc consumes. A transition without inputs is always enabled.
    pub fn enabled(&self, marking: &Marking, transition: TransitionId) -> bool {
        debug_assert_eq!(marking.place_count(), self.places);
        (0..self.places).all(|p| marking[p] >= self.tin(p, transition))
    }

    pub fn enabled_transitions(&self, marking: &Marking) -> Vec<TransitionId> {
        (0..self.transitions)
            .filter(|&t| self.enabled(marking, t))
            .collect()
    }

    /// Fires `transition` in `marking`. The caller must have checked
    /// `enabled` first.
    pub fn fire(&self, marking: &Marking, transition: TransitionId) -> Marking {
        marking.apply_delta(&self.incidence_column(transition))
    }

    /// In-degree of a place in the arc area: arcs from transitions into `p`
    /// plus arcs from `p` into transitions.
    pub fn place_arc_count(&self, place: PlaceId) -> u32 {
        (0..self.transitions)
            .map(|t| self.tin(place, t) + self.tout(place, t))
            .sum()
    }

    pub fn transition_arc_count(&self, transition: TransitionId) -> u32 {
        (0..self.places)
            .map(|p| self.tin(p, transition) + self.tout(p, transition))
            .sum()
    }

    /// Petgraph view of the bipartite net: place nodes first, then
    /// transition nodes; arc direction follows token flow.
    pub fn to_graph(&self) -> petgraph::graph::DiGraph<String, &'static str> {
        let mut graph = petgraph::graph::DiGraph::new();

        let place_nodes: Vec<_> = (0..self.places)
            .map(|p| graph.add_node(format!("p{} ({})", p + 1, self.m0(p))))
            .collect();
        let transition_nodes: Vec<_> = (0..self.transitions)
            .map(|t| graph.add_node(format!("t{}", t + 1)))
            .collect();

        for p in 0..self.places {
            for t in 0..self.transitions {
                if self.tin(p, t) == 1 {
                    graph.add_edge(place_nodes[p], transition_nodes[t], "");
                }
                if self.tout(p, t) == 1 {
                    graph.add_edge(transition_nodes[t], place_nodes[p], "");
                }
            }
        }

        graph
    }

    pub fn to_dot(&self) -> String {
        petgraph::dot::Dot::with_config(
            &self.to_graph(),
            &[petgraph::dot::Config::EdgeNoLabel],
        )
        .to_string()
    }

    pub fn to_json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json_file(&self, path: &str) -> anyhow::Result<()> {
        Ok(std::fs::write(path, self.to_json()?)?)
    }

    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}

/// Exponential firing rates, one per transition. The synthesizer draws them
/// uniformly from the integers `1..=max_rate`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FiringRates {
    rates: Box<[f64]>,
}

impl FiringRates {
    pub fn new(rates: Box<[f64]>) -> Result<Self, ArgumentError> {
        if rates.is_empty() {
            return Err(ArgumentError::NoTransitions(0));
        }
        Ok(FiringRates { rates })
    }

    /// Rate 1 for every transition. Used when a caller filters a bare matrix
    /// without supplying its own rates.
    pub fn uniform(transition_count: usize) -> Self {
        FiringRates {
            rates: vec![1.0; transition_count].into_boxed_slice(),
        }
    }

    pub fn transition_count(&self) -> usize {
        self.rates.len()
    }

    pub fn rate(&self, transition: TransitionId) -> f64 {
        self.rates[transition]
    }

    pub fn iter(&self) -> std::slice::Iter<'_, f64> {
        self.rates.iter()
    }

    pub fn matches(&self, matrix: &SpnMatrix) -> Result<(), ArgumentError> {
        if self.rates.len() != matrix.transition_count() {
            return Err(ArgumentError::RateCountMismatch {
                got: self.rates.len(),
                expected: matrix.transition_count(),
            });
        }
        Ok(())
    }
}

impl From<Vec<f64>> for FiringRates {
    fn from(rates: Vec<f64>) -> Self {
        FiringRates {
            rates: rates.into_boxed_slice(),
        }
    }
}
