//! Sequence-space rollover behavior.

use std::time::Duration;

use resq_conformance::scenario::{run, ticked};

#[tokio::test]
async fn consecutive_rollovers_stay_in_order() {
    // A space of five ids wraps twice within a single run.
    let ids = [3, 4, 0, 1, 2, 3, 4, 0, 1];
    let outcome = run(Duration::from_millis(60), 4, ticked(15, &ids)).await;
    assert_eq!(outcome.emitted, ids);
    assert!(outcome.rejected.is_empty());
}

#[tokio::test]
async fn reorder_straddling_the_boundary_resolves() {
    // 0 and 4 swap places around the wrap of a [0, 4] space.
    let ids = [2, 3, 0, 4, 1, 2];
    let outcome = run(Duration::from_millis(60), 4, ticked(15, &ids)).await;
    assert_eq!(outcome.emitted, vec![2, 3, 4, 0, 1, 2]);
    assert!(outcome.rejected.is_empty());
}
