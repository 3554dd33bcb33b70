use proptest::prelude::*;

/// Property-based checks for the selection bookkeeping and ensembles.
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Variable;
    use crate::ensemble::{aggregate, EnsembleRule};
    use crate::graph::{Endpoint, Graph};
    use crate::ranking::selection::{self, SubsampleRanks};

    fn endpoint() -> impl Strategy<Value = Endpoint> {
        prop_oneof![
            Just(Endpoint::Tail),
            Just(Endpoint::Arrow),
            Just(Endpoint::Circle)
        ]
    }

    /// Random graph over 4 nodes: each of the 6 pairs is absent or has marks.
    fn graph() -> impl Strategy<Value = Graph> {
        prop::collection::vec(prop::option::of((endpoint(), endpoint())), 6).prop_map(|edges| {
            let mut g = Graph::new(["a", "b", "c", "d"].iter().map(|n| Variable::continuous(*n)).collect());
            let pairs = [(0, 1), (0, 2), (0, 3), (1, 2), (1, 3), (2, 3)];
            for (marks, (i, j)) in edges.into_iter().zip(pairs) {
                if let Some((at_i, at_j)) = marks {
                    g.set_edge(i, j, at_i, at_j);
                }
            }
            g
        })
    }

    /// B subsamples ranking a pool of `m` predictors for one target.
    fn subsamples(m: usize) -> impl Strategy<Value = Vec<SubsampleRanks>> {
        let one = Just((0..m).collect::<Vec<usize>>())
            .prop_shuffle()
            .prop_map(|position| SubsampleRanks {
                effect: vec![position.iter().map(|&r| 1.0 / (r + 1) as f64).collect()],
                position: vec![position],
            });
        prop::collection::vec(one, 1..12)
    }

    // =========================================================================
    // Error bounds stay in range
    // =========================================================================
    proptest! {
        #[test]
        fn test_pcer_in_unit_interval(pi in 0.0f64..=1.0, q in 1usize..20, extra in 0usize..40) {
            let p = 2 * q + extra;
            let v = selection::pcer(pi, q, p);
            prop_assert!((0.0..=1.0).contains(&v));
        }

        #[test]
        fn test_expected_errors_in_range(q in 1usize..20, sum in -5.0f64..30.0) {
            let v = selection::expected_errors(q, sum);
            prop_assert!(v >= 0.0 && v <= q as f64);
        }

        #[test]
        fn test_mb_bound_in_range(pi in 0.0f64..=1.0, q in 1usize..20, extra in 0usize..40) {
            let p = 2 * q + extra;
            let v = selection::expected_false_positives(pi, q, p);
            prop_assert!(v >= 0.0 && v <= q as f64);
        }
    }

    // =========================================================================
    // Selection frequencies grow with q
    // =========================================================================
    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn test_tally_monotone_in_q(samples in subsamples(6), q in 1usize..6) {
            let smaller = selection::tallies(&samples, 1, 6, q);
            let larger = selection::tallies(&samples, 1, 6, q + 1);
            for (s, l) in smaller.iter().zip(&larger) {
                prop_assert!(s <= l);
            }
            // every subsample places exactly q predictors in its top q
            prop_assert_eq!(smaller.iter().sum::<usize>(), q * samples.len());
        }

        #[test]
        fn test_selection_respects_threshold(samples in subsamples(8), lift in 0.5f64..4.0) {
            if let Some(sel) = selection::select(&samples, 1, 8, lift) {
                prop_assert!(sel.q >= 1 && sel.q <= 4);
                prop_assert_eq!(sel.pairs.len(), sel.q);
                prop_assert!(sel.sum + 1e-12 >= lift * (sel.q * sel.q) as f64 / 8.0);
                for w in sel.pairs.windows(2) {
                    prop_assert!(w[0].1 >= w[1].1);
                }
            }
        }
    }

    // =========================================================================
    // Ensembles
    // =========================================================================
    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn test_ensemble_idempotent(g in graph(), b in 1usize..6) {
            let graphs = vec![g.clone(); b];
            for rule in [EnsembleRule::Preserved, EnsembleRule::Highest, EnsembleRule::Majority] {
                prop_assert_eq!(aggregate(&graphs, rule).unwrap(), g.clone());
            }
        }

        #[test]
        fn test_ensemble_order_independent(mut graphs in prop::collection::vec(graph(), 1..6)) {
            for rule in [EnsembleRule::Preserved, EnsembleRule::Highest, EnsembleRule::Majority] {
                let forward = aggregate(&graphs, rule).unwrap();
                graphs.reverse();
                let backward = aggregate(&graphs, rule).unwrap();
                prop_assert_eq!(forward, backward);
            }
        }
    }
}
