use rand::{Rng, seq::SliceRandom};

use crate::spn::SpnMatrix;

/// True iff every place row has at least one arc and every transition column
/// has at least one arc (summing `Tin` and `Tout`).
pub fn has_no_isolated_nodes(matrix: &SpnMatrix) -> bool {
    (0..matrix.place_count()).all(|p| matrix.place_arc_count(p) > 0)
        && (0..matrix.transition_count()).all(|t| matrix.transition_arc_count(t) > 0)
}

/// Connects every isolated node to the rest of the net.
///
/// An isolated place receives one outgoing arc (it becomes the input of a
/// uniformly random transition) and one incoming arc (it becomes the output
/// of a uniformly random transition), so it has both inflow and outflow. An
/// isolated transition receives a single arc to a uniformly random place in
/// a coin-flipped direction. Afterwards `has_no_isolated_nodes` holds.
pub fn add_edges_to_isolated_nodes<R: Rng>(matrix: &mut SpnMatrix, rng: &mut R) {
    let places = matrix.place_count();
    let transitions = matrix.transition_count();

    for p in 0..places {
        if matrix.place_arc_count(p) == 0 {
            matrix.set_tin(p, rng.gen_range(0..transitions), 1);
            matrix.set_tout(p, rng.gen_range(0..transitions), 1);
        }
    }

    for t in 0..transitions {
        if matrix.transition_arc_count(t) == 0 {
            let p = rng.gen_range(0..places);
            if rng.gen_bool(0.5) {
                matrix.set_tin(p, t, 1);
            } else {
                matrix.set_tout(p, t, 1);
            }
        }
    }
}

/// Reduces every node's in-degree and out-degree to at most `max_degree` by
/// removing uniformly random surplus arcs, then reconnects any node that
/// became isolated. Not used by the generation pipeline; offered for
/// thinning over-connected nets.
pub fn prune_to_max_degree<R: Rng>(matrix: &mut SpnMatrix, max_degree: usize, rng: &mut R) {
    let places = matrix.place_count();
    let transitions = matrix.transition_count();

    // place out-degree: arcs in Tin; place in-degree: arcs in Tout
    for p in 0..places {
        let outgoing: Vec<usize> = (0..transitions).filter(|&t| matrix.tin(p, t) == 1).collect();
        for &t in surplus(outgoing, max_degree, rng).iter() {
            matrix.set_tin(p, t, 0);
        }

        let incoming: Vec<usize> = (0..transitions)
            .filter(|&t| matrix.tout(p, t) == 1)
            .collect();
        for &t in surplus(incoming, max_degree, rng).iter() {
            matrix.set_tout(p, t, 0);
        }
    }

    // transition in-degree: arcs in Tin; transition out-degree: arcs in Tout
    for t in 0..transitions {
        let inputs: Vec<usize> = (0..places).filter(|&p| matrix.tin(p, t) == 1).collect();
        for &p in surplus(inputs, max_degree, rng).iter() {
            matrix.set_tin(p, t, 0);
        }

        let outputs: Vec<usize> = (0..places).filter(|&p| matrix.tout(p, t) == 1).collect();
        for &p in surplus(outputs, max_degree, rng).iter() {
            matrix.set_tout(p, t, 0);
        }
    }

    add_edges_to_isolated_nodes(matrix, rng);
}

/// Uniformly random selection of the arcs beyond `keep`.
fn surplus<R: Rng>(mut arcs: Vec<usize>, keep: usize, rng: &mut R) -> Vec<usize> {
    if arcs.len() <= keep {
        return vec![];
    }
    arcs.shuffle(rng);
    arcs.split_off(keep)
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    #[test]
    fn detects_isolated_place() {
        // second place has no arcs at all
        let matrix =
            SpnMatrix::from_rows(vec![vec![1, 0, 0, 1, 1], vec![0, 0, 0, 0, 0]]).unwrap();

        assert!(!has_no_isolated_nodes(&matrix));
    }

    #[test]
    fn detects_isolated_transition() {
        // second transition has no arcs in either direction
        let matrix =
            SpnMatrix::from_rows(vec![vec![1, 0, 0, 0, 1], vec![0, 0, 1, 0, 0]]).unwrap();

        assert!(!has_no_isolated_nodes(&matrix));
    }

    #[test]
    fn repair_establishes_connectivity() {
        let mut rng = StdRng::seed_from_u64(5);

        for seed in 0..20 {
            let mut matrix = SpnMatrix::new(3 + seed % 4, 2 + seed % 3);
            add_edges_to_isolated_nodes(&mut matrix, &mut rng);

            assert!(has_no_isolated_nodes(&matrix));
        }
    }

    #[test]
    fn repaired_place_has_inflow_and_outflow() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut matrix =
            SpnMatrix::from_rows(vec![vec![1, 0, 0, 1, 1], vec![0, 0, 0, 0, 0]]).unwrap();
        add_edges_to_isolated_nodes(&mut matrix, &mut rng);

        let outflow: u32 = (0..2).map(|t| matrix.tin(1, t)).sum();
        let inflow: u32 = (0..2).map(|t| matrix.tout(1, t)).sum();
        assert!(outflow >= 1);
        assert!(inflow >= 1);
    }

    #[test]
    fn pruning_thins_over_connected_nets() {
        let mut rng = StdRng::seed_from_u64(9);

        // fully connected in both directions, every degree is 4
        let mut matrix = SpnMatrix::new(4, 4);
        for p in 0..4 {
            for t in 0..4 {
                matrix.set_tin(p, t, 1);
                matrix.set_tout(p, t, 1);
            }
        }

        prune_to_max_degree(&mut matrix, 2, &mut rng);

        let arcs: u32 = (0..4).map(|p| matrix.place_arc_count(p)).sum();
        assert!(arcs < 32);
        assert!(has_no_isolated_nodes(&matrix));
    }

    #[test]
    fn pruning_leaves_sparse_nets_alone() {
        let mut rng = StdRng::seed_from_u64(13);

        // a simple cycle: every degree is 1
        let mut matrix = SpnMatrix::new(3, 3);
        for i in 0..3 {
            matrix.set_tin(i, i, 1);
            matrix.set_tout(i, (i + 1) % 3, 1);
        }
        let before = matrix.clone();

        prune_to_max_degree(&mut matrix, 2, &mut rng);

        assert_eq!(matrix, before);
    }
}
