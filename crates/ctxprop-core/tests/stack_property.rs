//! Property-based coverage for the thread-local nested stack's out-of-order
//! close invariant (spec §8 testable property 3, §9 "Property-based tests on
//! random close permutations are the right verification").
//!
//! Model: nodes are pushed `0..n` in increasing order, so the parent chain is
//! strictly decreasing by push index regardless of close order. At every
//! point in a random close permutation, the active value must equal the
//! highest push index among nodes not yet closed (or nothing, once all are
//! closed) — closes never reorder the chain, they only tombstone it.

use proptest::prelude::*;

use ctxprop_core::Stack;

/// `n` paired with a random permutation of `0..n` — the order closes will be
/// issued in.
fn sized_permutation() -> impl Strategy<Value = (usize, Vec<usize>)> {
    (1_usize..8).prop_flat_map(|n| {
        Just((0..n).collect::<Vec<_>>())
            .prop_shuffle()
            .prop_map(move |order| (n, order))
    })
}

proptest! {
    #[test]
    fn active_value_tracks_max_open_index_under_any_close_order((n, order) in sized_permutation()) {
        let stack: Stack<usize> = Stack::new();
        let nodes: Vec<_> = (0..n).map(|i| stack.push(i).0).collect();

        let mut open = vec![true; n];
        prop_assert_eq!(stack.active(), Some(n - 1));

        for &idx in &order {
            stack.close(&nodes[idx]);
            open[idx] = false;

            let expected = open
                .iter()
                .enumerate()
                .rev()
                .find(|&(_, &is_open)| is_open)
                .map(|(i, _)| i);
            prop_assert_eq!(stack.active(), expected);
        }

        prop_assert_eq!(stack.active(), None);
    }

    #[test]
    fn repeated_close_of_the_same_node_is_idempotent(n in 1_usize..6) {
        let stack: Stack<usize> = Stack::new();
        let nodes: Vec<_> = (0..n).map(|i| stack.push(i).0).collect();

        for node in &nodes {
            let first = stack.close(node);
            let second = stack.close(node);
            prop_assert!(second.is_none(), "second close must report no change");
            let _ = first;
        }
        prop_assert_eq!(stack.active(), None);
    }
}
