use ndarray::Array1;

use crate::{
    ctmc::sparse::{CooMatrix, CscMatrix},
    reachability::ReachabilityGraph,
    spn::FiringRates,
};

pub mod solve;
pub mod sparse;

/// Builds the raw CTMC generator matrix `Q` from a bounded reachability
/// graph.
///
/// For every edge `(i, j)` fired by transition `t`, the rate `lambda_t`
/// flows from state `i` to state `j`: `Q[j, i] += lambda_t` and
/// `Q[i, i] -= lambda_t`. Parallel edges between the same state pair sum.
/// Every column of the result sums to zero.
pub fn build_generator(graph: &ReachabilityGraph, rates: &FiringRates) -> CscMatrix {
    let n = graph.state_count();
    let mut coo = CooMatrix::new(n, n);

    for (&(src, dst), &t) in graph.edges.iter().zip(graph.fired_transitions.iter()) {
        let rate = rates.rate(t as usize);
        coo.push(dst as usize, src as usize, rate);
        coo.push(src as usize, src as usize, -rate);
    }

    coo.to_csc()
}

/// Replaces row 0 of `Q` with the probability-conservation equation.
///
/// `Q pi = 0` alone is rank-deficient: its null space is spanned by the
/// steady-state vector. Overwriting one row with `sum(pi) = 1` yields a
/// nonsingular system whose unique solution is the steady state. Returns
/// the substituted matrix and the right-hand side `y = (1, 0, ..., 0)`.
pub fn constrained_system(q: &CscMatrix) -> (CscMatrix, Array1<f64>) {
    let n = q.rows();
    let mut coo = CooMatrix::new(n, n);

    for col in 0..n {
        for (row, value) in q.column(col) {
            if row != 0 {
                coo.push(row, col, value);
            }
        }
        coo.push(0, col, 1.0);
    }

    let mut y = Array1::zeros(n);
    y[0] = 1.0;

    (coo.to_csc(), y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        reachability::{ExploreLimits, get_reachability_graph},
        spn::SpnMatrix,
    };

    fn producer_consumer_graph() -> (ReachabilityGraph, FiringRates) {
        let matrix =
            SpnMatrix::from_rows(vec![vec![1, 0, 0, 1, 1], vec![0, 1, 1, 0, 0]]).unwrap();
        let graph = get_reachability_graph(&matrix, ExploreLimits::default());
        (graph, FiringRates::from(vec![2.0, 3.0]))
    }

    #[test]
    fn generator_columns_sum_to_zero() {
        let (graph, rates) = producer_consumer_graph();
        let q = build_generator(&graph, &rates);

        for col in 0..q.cols() {
            let sum: f64 = q.column(col).map(|(_, v)| v).sum();
            assert!(sum.abs() < 1e-12);
        }
    }

    #[test]
    fn generator_entries() {
        let (graph, rates) = producer_consumer_graph();
        let q = build_generator(&graph, &rates);

        // state 0 = [1,0] leaves via t0 (rate 2), state 1 = [0,1] via t1 (rate 3)
        assert_eq!(q.get(0, 0), -2.0);
        assert_eq!(q.get(1, 0), 2.0);
        assert_eq!(q.get(1, 1), -3.0);
        assert_eq!(q.get(0, 1), 3.0);
    }

    #[test]
    fn constraint_row_substitution() {
        let (graph, rates) = producer_consumer_graph();
        let q = build_generator(&graph, &rates);
        let (a, y) = constrained_system(&q);

        for col in 0..a.cols() {
            assert_eq!(a.get(0, col), 1.0);
        }
        assert_eq!(y[0], 1.0);
        assert!(y.iter().skip(1).all(|&v| v == 0.0));
    }
}
