use spn_bench_lib::{
    ExploreLimits, SpnMatrix, get_reachability_graph,
    marking::Marking,
    spn::synthesis::{SynthesisParams, synthesize},
};

use rand::{SeedableRng, rngs::StdRng};

/// Tin = [[1,0],[0,1]], Tout = [[0,1],[1,0]], M0 = [1,0]: one token moving
/// between two places.
fn producer_consumer() -> SpnMatrix {
    SpnMatrix::from_rows(vec![vec![1, 0, 0, 1, 1], vec![0, 1, 1, 0, 0]]).unwrap()
}

/// A cyclic shifter over `places` places: transition `i` moves one token
/// from place `i` to place `i + 1` (wrapping). `m0` is the initial marking.
fn shifter(places: usize, m0: Vec<u32>) -> SpnMatrix {
    let mut rows = vec![vec![0u32; 2 * places + 1]; places];
    for t in 0..places {
        rows[t][t] = 1; // input: place t
        rows[(t + 1) % places][places + t] = 1; // output: place t + 1
    }
    for (p, tokens) in m0.into_iter().enumerate() {
        rows[p][2 * places] = tokens;
    }
    SpnMatrix::from_rows(rows).unwrap()
}

#[test]
fn producer_consumer_loop() {
    let graph = get_reachability_graph(&producer_consumer(), ExploreLimits::default());

    assert!(graph.bounded);
    assert_eq!(graph.state_count(), 2);
    assert_eq!(graph.edge_count(), 2);
    assert!(graph.markings.contains(&Marking::from(vec![1, 0])));
    assert!(graph.markings.contains(&Marking::from(vec![0, 1])));
}

#[test]
fn edge_order_is_bfs_then_transition_index() {
    let graph = get_reachability_graph(&producer_consumer(), ExploreLimits::default());

    assert_eq!(graph.edges, vec![(0, 1), (1, 0)]);
    assert_eq!(graph.fired_transitions, vec![0, 1]);
}

#[test]
fn initial_marking_is_state_zero() {
    let matrix = shifter(3, vec![2, 0, 1]);
    let graph = get_reachability_graph(&matrix, ExploreLimits::default());

    assert_eq!(graph.markings[0], matrix.initial_marking());
}

#[test]
fn two_place_shifter_enumerates_all_token_distributions() {
    // every reachable marking distributes 5 tokens over 2 places
    let graph = get_reachability_graph(&shifter(2, vec![1, 4]), ExploreLimits::default());

    assert!(graph.bounded);
    assert_eq!(graph.state_count(), 6);
    assert_eq!(graph.edge_count(), 10);
    for marking in &graph.markings {
        assert_eq!(marking.total_tokens(), 5);
    }
}

#[test]
fn colliding_fingerprints_are_resolved_by_comparison() {
    // [31,0,1] and [0,32,0] hash identically under the base-31 polynomial
    // (31*32 = 31 + 961); both are reachable here, so conflating them would
    // lose a state
    let mut rows = vec![vec![0u32; 5]; 3];
    // t0 moves a token from place 0 to place 1
    rows[0][0] = 1;
    rows[1][2] = 1;
    // t1 moves a token from place 2 to place 1
    rows[2][1] = 1;
    rows[1][3] = 1;
    rows[0][4] = 31;
    rows[2][4] = 1;
    let matrix = SpnMatrix::from_rows(rows).unwrap();

    let limits = ExploreLimits::default().with_place_limit(40);
    let graph = get_reachability_graph(&matrix, limits);

    assert!(graph.bounded);
    assert_eq!(graph.state_count(), 64);
    assert!(graph.markings.contains(&Marking::from(vec![31, 0, 1])));
    assert!(graph.markings.contains(&Marking::from(vec![0, 32, 0])));
}

#[test]
fn mark_limit_flags_unbounded() {
    // 126 reachable markings for 5 tokens over 5 places, far above limit 5
    let matrix = shifter(5, vec![5, 0, 0, 0, 0]);
    let limits = ExploreLimits::default().with_mark_limit(5);

    let graph = get_reachability_graph(&matrix, limits);

    assert!(!graph.bounded);
}

#[test]
fn place_limit_flags_unbounded() {
    // a transition with no inputs grows its output place without bound
    let matrix = SpnMatrix::from_rows(vec![vec![0, 1, 1]]).unwrap();

    let graph = get_reachability_graph(&matrix, ExploreLimits::default());

    assert!(!graph.bounded);
}

#[test]
fn closure_and_uniqueness_on_random_nets() {
    let mut rng = StdRng::seed_from_u64(17);

    for seed in 0..30 {
        let params = SynthesisParams::new(2 + seed % 4, 2 + seed % 3).with_connection_prob(0.2);
        let (matrix, _) = synthesize(&params, &mut rng).unwrap();
        let graph = get_reachability_graph(&matrix, ExploreLimits::default());

        // initial marking is state 0
        assert_eq!(graph.markings[0], matrix.initial_marking());

        // every edge is a legal firing: source enables t and target is the
        // fired result
        for (&(src, dst), &t) in graph.edges.iter().zip(graph.fired_transitions.iter()) {
            let src_marking = &graph.markings[src as usize];
            assert!(matrix.enabled(src_marking, t as usize));
            assert_eq!(
                matrix.fire(src_marking, t as usize),
                graph.markings[dst as usize]
            );
        }

        // no duplicate markings
        for i in 0..graph.state_count() {
            for j in i + 1..graph.state_count() {
                assert_ne!(graph.markings[i], graph.markings[j]);
            }
        }

        // when bounded, every enabled transition of every state has an edge
        if graph.bounded {
            for (i, marking) in graph.markings.iter().enumerate() {
                let outgoing = graph
                    .edges
                    .iter()
                    .filter(|(src, _)| *src as usize == i)
                    .count();
                assert_eq!(outgoing, matrix.enabled_transitions(marking).len());
            }
        }
    }
}
