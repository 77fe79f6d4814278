use std::collections::VecDeque;

use hashbrown::HashMap;
use petgraph::graph::DiGraph;
use serde::{Deserialize, Serialize};

use crate::{hash::MarkingHasher, marking::Marking, spn::SpnMatrix};

/// Exploration limits. Exceeding either one aborts the search and marks the
/// graph unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExploreLimits {
    /// Maximum token count any single place may reach.
    pub place_limit: u32,
    /// Maximum number of distinct markings to explore.
    pub mark_limit: usize,
}

impl Default for ExploreLimits {
    fn default() -> Self {
        ExploreLimits {
            place_limit: 10,
            mark_limit: 500,
        }
    }
}

impl ExploreLimits {
    pub fn with_place_limit(mut self, place_limit: u32) -> Self {
        self.place_limit = place_limit;
        self
    }

    pub fn with_mark_limit(mut self, mark_limit: usize) -> Self {
        self.mark_limit = mark_limit;
        self
    }
}

/// The explored marking state space of an SPN.
///
/// `markings[0]` is the initial marking. Edges are stored as parallel
/// vectors: `edges[i]` is a `(source, target)` index pair into `markings`
/// and `fired_transitions[i]` is the transition fired on that edge. Edges
/// appear in (BFS visit order of source, ascending transition index) order.
///
/// If `bounded` is true, `markings` holds every marking reachable from the
/// initial one and contains no duplicates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReachabilityGraph {
    pub markings: Vec<Marking>,
    pub edges: Vec<(u32, u32)>,
    pub fired_transitions: Vec<u32>,
    pub bounded: bool,
}

impl ReachabilityGraph {
    pub fn state_count(&self) -> usize {
        self.markings.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Largest token count observed at any place in any explored marking.
    pub fn max_token_count(&self) -> u32 {
        self.markings
            .iter()
            .map(|m| m.max_tokens())
            .max()
            .unwrap_or(0)
    }

    /// Petgraph view with marking strings as node weights and transition
    /// indices as edge weights.
    pub fn to_graph(&self) -> DiGraph<String, String> {
        let mut graph = DiGraph::new();
        let nodes: Vec<_> = self
            .markings
            .iter()
            .map(|m| graph.add_node(m.to_string()))
            .collect();
        for (&(src, dst), &t) in self.edges.iter().zip(self.fired_transitions.iter()) {
            graph.add_edge(nodes[src as usize], nodes[dst as usize], format!("t{}", t));
        }
        graph
    }

    pub fn to_dot(&self) -> String {
        petgraph::dot::Dot::new(&self.to_graph()).to_string()
    }
}

/// Breadth-first exploration of the marking space of an SPN.
///
/// Duplicate markings are detected through a fingerprint map from hash to
/// the marking indices that produced it; every candidate is verified by
/// exact vector comparison, so fingerprint collisions cost time but never
/// correctness.
#[derive(Debug)]
pub struct ReachabilityExplorer<'a> {
    matrix: &'a SpnMatrix,
    limits: ExploreLimits,
    hasher: MarkingHasher,
    buckets: HashMap<u64, Vec<u32>>,
}

impl<'a> ReachabilityExplorer<'a> {
    pub fn new(matrix: &'a SpnMatrix, limits: ExploreLimits) -> Self {
        ReachabilityExplorer {
            matrix,
            limits,
            hasher: MarkingHasher::new(),
            buckets: HashMap::new(),
        }
    }

    pub fn explore(mut self) -> ReachabilityGraph {
        let initial = self.matrix.initial_marking();

        let mut graph = ReachabilityGraph {
            markings: Vec::with_capacity(self.limits.mark_limit.min(1024)),
            edges: Vec::with_capacity(self.limits.mark_limit.min(1024)),
            fired_transitions: Vec::with_capacity(self.limits.mark_limit.min(1024)),
            bounded: true,
        };

        let h = self.hasher.hash(&initial);
        self.buckets.entry(h).or_default().push(0);
        graph.markings.push(initial);

        let mut queue: VecDeque<u32> = VecDeque::new();
        queue.push_back(0);

        'bfs: while let Some(current) = queue.pop_front() {
            for t in 0..self.matrix.transition_count() {
                let marking = &graph.markings[current as usize];
                if !self.matrix.enabled(marking, t) {
                    continue;
                }

                let successor = self.matrix.fire(marking, t);

                if successor.max_tokens() > self.limits.place_limit {
                    graph.bounded = false;
                    break 'bfs;
                }

                let index = match self.find(&graph, &successor) {
                    Some(index) => index,
                    None => {
                        if graph.markings.len() >= self.limits.mark_limit {
                            graph.bounded = false;
                            break 'bfs;
                        }
                        let index = graph.markings.len() as u32;
                        let h = self.hasher.hash(&successor);
                        self.buckets.entry(h).or_default().push(index);
                        graph.markings.push(successor);
                        queue.push_back(index);
                        index
                    }
                };

                graph.edges.push((current, index));
                graph.fired_transitions.push(t as u32);
            }
        }

        graph
    }

    /// Looks up a marking by fingerprint bucket, verifying every bucketed
    /// candidate by exact comparison.
    fn find(&mut self, graph: &ReachabilityGraph, marking: &Marking) -> Option<u32> {
        let h = self.hasher.hash(marking);
        self.buckets.get(&h)?.iter().copied().find(|&i| {
            graph.markings[i as usize] == *marking
        })
    }
}

/// Explores the reachability graph of `matrix` under `limits`.
pub fn get_reachability_graph(matrix: &SpnMatrix, limits: ExploreLimits) -> ReachabilityGraph {
    ReachabilityExplorer::new(matrix, limits).explore()
}
