#![forbid(unsafe_code)]

//! Scripted arrival/emission scenario runner.
//!
//! Drives a fresh sequencer with a timed arrival script while a concurrent
//! consumer collects everything emitted, mirroring how the sequencer sits
//! between a transport callback and a consumer loop in production.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use resq_core::SeqNo;
use resq_sequencer::{Sequencer, SequencerError};

/// Extra wait after the script ends so the jitter backstop can flush the
/// tail of the pipeline before the consumer is cancelled.
const SETTLE: Duration = Duration::from_millis(120);

/// One scripted arrival: wait `delay`, then add `seq` (the packet payload is
/// the id itself).
pub struct Step {
    pub delay: Duration,
    pub seq: SeqNo,
}

impl Step {
    #[must_use]
    pub fn new(delay_ms: u64, seq: SeqNo) -> Self {
        Self { delay: Duration::from_millis(delay_ms), seq }
    }
}

/// Evenly spaced arrivals, like a ticker-driven producer.
#[must_use]
pub fn ticked(step_ms: u64, seqs: &[SeqNo]) -> Vec<Step> {
    seqs.iter().map(|&n| Step::new(step_ms, n)).collect()
}

/// Outcome of a scenario run: ids emitted in order, and ids whose add was
/// rejected inside a recovery window.
#[derive(Debug)]
pub struct Outcome {
    pub emitted: Vec<SeqNo>,
    pub rejected: Vec<SeqNo>,
}

impl Outcome {
    /// Number of adds the sequencer accepted.
    #[must_use]
    pub fn accepted(&self, total_steps: usize) -> usize {
        total_steps - self.rejected.len()
    }
}

/// Run `steps` against a fresh sequencer and collect everything emitted.
pub async fn run(jitter: Duration, max_seq_id: SeqNo, steps: Vec<Step>) -> Outcome {
    let sequencer = Arc::new(Sequencer::new(jitter, max_seq_id));
    let cancel = CancellationToken::new();

    let consumer = tokio::spawn({
        let sequencer = sequencer.clone();
        let cancel = cancel.clone();
        async move {
            let mut emitted = Vec::new();
            loop {
                match sequencer.wait_next(&cancel).await {
                    Ok(n) => emitted.push(n),
                    Err(SequencerError::Cancelled) => break,
                    Err(e) => panic!("unexpected consumer error: {e}"),
                }
            }
            emitted
        }
    });

    let mut rejected = Vec::new();
    for step in steps {
        tokio::time::sleep(step.delay).await;
        match sequencer.add(step.seq, step.seq).await {
            Ok(()) => {}
            Err(SequencerError::InRecovery) => rejected.push(step.seq),
            Err(e) => panic!("unexpected add error: {e}"),
        }
    }

    // Let the jitter backstop flush anything still pending, then stop the
    // consumer.
    tokio::time::sleep(jitter + SETTLE).await;
    cancel.cancel();
    let emitted = consumer.await.expect("consumer task");

    Outcome { emitted, rejected }
}
