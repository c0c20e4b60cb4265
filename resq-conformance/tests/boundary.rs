//! Degenerate spaces and startup edges.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use resq_sequencer::Sequencer;

#[tokio::test]
async fn trivial_space_passes_packets_through() {
    // With max_seq_id = 0 every packet carries id 0 and flows out in
    // arrival order.
    let s = Sequencer::new(Duration::from_millis(40), 0);
    let cancel = CancellationToken::new();
    for payload in ["a", "b", "c"] {
        s.add(0, payload).await.unwrap();
        assert_eq!(s.wait_next(&cancel).await.unwrap(), payload);
    }
}

#[tokio::test]
async fn burst_before_the_loop_first_runs() {
    // Adds issued immediately after construction, before the emit task has
    // had a chance to poll, still come out in order.
    let s = Sequencer::new(Duration::from_millis(40), 100);
    for n in 0u64..4 {
        s.add(n, n).await.unwrap();
    }
    let cancel = CancellationToken::new();
    for expect in 0u64..4 {
        assert_eq!(s.wait_next(&cancel).await.unwrap(), expect);
    }
}

#[tokio::test]
async fn pre_prime_timer_fire_is_harmless() {
    // Let the jitter timer expire with nothing primed, then feed a stream
    // that starts well above zero; nothing is rejected.
    let s = Sequencer::new(Duration::from_millis(10), 100);
    tokio::time::sleep(Duration::from_millis(60)).await;
    let cancel = CancellationToken::new();
    for n in [5u64, 6, 7] {
        s.add(n, n).await.unwrap();
        assert_eq!(s.wait_next(&cancel).await.unwrap(), n);
    }
}
