#![forbid(unsafe_code)]

//! Out-of-order packet resequencer.
//!
//! Accepts `(seq id, packet)` pairs from a reordering transport and emits
//! them in strictly increasing sequence order. A jitter timer bounds how
//! long the expected-next cursor waits for a missing id before skipping
//! ahead; after such a skip a recovery window suppresses stale late
//! arrivals whose raw id falls below the new cursor.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, trace, warn};

use resq_core::{ResqConfig, SeqNo, SeqSpace};

use crate::cache::PacketCache;
use crate::errors::{SequencerError, SequencerResult};
use crate::settings::{SequencerSettings, DEFAULT_RECOVERY_WINDOW};
use crate::state::SequencerState;

/// Capacity of the emission queue and of the wakeup signal.
const CHANNEL_DEPTH: usize = 10;

/// Resequencer handle. Cheap to share behind an [`Arc`]; `add`, `try_next`
/// and `wait_next` all take `&self` and may run concurrently.
///
/// The emit loop is spawned at construction and stops when the last handle
/// is dropped, so construction must happen inside a Tokio runtime.
pub struct Sequencer<T> {
    space: SeqSpace,
    pending: Arc<PacketCache<SeqNo, T>>,
    state: Arc<Mutex<SequencerState>>,
    wake_tx: mpsc::Sender<()>,
    next_rx: Mutex<mpsc::Receiver<T>>,
}

impl<T: Send + Sync + 'static> Sequencer<T> {
    /// Create a resequencer for ids in `[0, max_seq_id]` that waits at most
    /// `jitter` for a missing id before skipping ahead.
    #[must_use]
    pub fn new(jitter: Duration, max_seq_id: SeqNo) -> Self {
        Self::build(jitter, max_seq_id, DEFAULT_RECOVERY_WINDOW)
    }

    /// Create a resequencer from a parsed configuration file.
    #[must_use]
    pub fn from_config(cfg: &ResqConfig) -> Self {
        Self::build(cfg.jitter(), cfg.max_seq_id, cfg.recovery_window)
    }

    fn build(jitter: Duration, max_seq_id: SeqNo, recovery_window: u64) -> Self {
        let space = SeqSpace::new(max_seq_id);
        let pending = Arc::new(PacketCache::new());
        let state = Arc::new(Mutex::new(SequencerState::new(recovery_window)));
        let (wake_tx, wake_rx) = mpsc::channel(CHANNEL_DEPTH);
        let (next_tx, next_rx) = mpsc::channel(CHANNEL_DEPTH);

        let emit = EmitLoop {
            jitter,
            space,
            pending: pending.clone(),
            state: state.clone(),
            next_tx,
            wake_rx,
        };
        tokio::spawn(emit.run());

        Self { space, pending, state, wake_tx, next_rx: Mutex::new(next_rx) }
    }

    /// Accept packet `n`. Ownership of the packet transfers into the
    /// sequencer; it is handed back through `try_next`/`wait_next` once its
    /// turn comes. Duplicate ids overwrite the buffered packet.
    ///
    /// # Errors
    ///
    /// [`SequencerError::InRecovery`] when a post-timeout recovery window is
    /// active and `n` falls below the cursor. The packet is dropped; the
    /// caller may log the rejection but must not retry it.
    #[instrument(name = "resq.sequencer.add", skip_all, fields(seq = n))]
    pub async fn add(&self, n: SeqNo, packet: T) -> SequencerResult<()> {
        debug_assert!(n <= self.space.max(), "seq id {n} outside the sequence space");

        {
            let mut st = self.state.lock().await;
            if st.in_recovery(&self.space) && n < st.cursor {
                debug!("dropping late packet {} inside recovery window", n);
                return Err(SequencerError::InRecovery);
            }
        }

        self.pending.store(n, packet);

        let wake = {
            let mut st = self.state.lock().await;
            st.note_arrival(n, &self.space)
        };
        if wake {
            // Coalescing hint. A full channel already implies an upcoming
            // drain, so the overflow wakeup can be dropped.
            let _ = self.wake_tx.try_send(());
        }
        Ok(())
    }

    /// Non-blocking pop of the next in-order packet.
    ///
    /// # Errors
    ///
    /// [`SequencerError::NoPacketReady`] when no packet is waiting.
    pub fn try_next(&self) -> SequencerResult<T> {
        let mut rx = self
            .next_rx
            .try_lock()
            .map_err(|_| SequencerError::NoPacketReady)?;
        match rx.try_recv() {
            Ok(packet) => Ok(packet),
            Err(TryRecvError::Empty) => Err(SequencerError::NoPacketReady),
            Err(TryRecvError::Disconnected) => {
                panic!("emission queue closed while sequencer alive")
            }
        }
    }

    /// Suspend until the next in-order packet arrives or `cancel` fires.
    /// Exactly one of the two outcomes is returned per call.
    ///
    /// # Errors
    ///
    /// [`SequencerError::Cancelled`] when the token fires first.
    pub async fn wait_next(&self, cancel: &CancellationToken) -> SequencerResult<T> {
        let mut rx = tokio::select! {
            guard = self.next_rx.lock() => guard,
            () = cancel.cancelled() => return Err(SequencerError::Cancelled),
        };
        tokio::select! {
            packet = rx.recv() => match packet {
                Some(p) => Ok(p),
                None => panic!("emission queue closed while sequencer alive"),
            },
            () = cancel.cancelled() => Err(SequencerError::Cancelled),
        }
    }

    /// Replace the recovery window. Takes effect for subsequent recovery
    /// checks.
    pub async fn set_recovery_window(&self, window: u64) {
        self.state.lock().await.set_recovery_window(window);
    }

    /// Currently configured recovery window.
    pub async fn recovery_window(&self) -> u64 {
        self.state.lock().await.recovery_window()
    }

    /// Number of packets buffered awaiting their turn.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Subscribe to a settings watch channel so updates (currently the
    /// recovery window) take effect live.
    pub fn apply_settings(&self, mut rx: watch::Receiver<SequencerSettings>) {
        let state = self.state.clone();
        tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let window = rx.borrow().recovery_window;
                state.lock().await.set_recovery_window(window);
                trace!("recovery window updated to {}", window);
            }
        });
    }
}

/// Long-running drain task. Owns the receive half of the wakeup signal and
/// the send half of the emission queue; terminates once every [`Sequencer`]
/// handle, and with it the wakeup sender, is gone.
struct EmitLoop<T> {
    jitter: Duration,
    space: SeqSpace,
    pending: Arc<PacketCache<SeqNo, T>>,
    state: Arc<Mutex<SequencerState>>,
    next_tx: mpsc::Sender<T>,
    wake_rx: mpsc::Receiver<()>,
}

impl<T: Send + Sync + 'static> EmitLoop<T> {
    async fn run(mut self) {
        let timer = time::sleep(self.jitter);
        tokio::pin!(timer);
        // The timer is one-shot: a fire leaves it disarmed until the next
        // wakeup resets it.
        let mut armed = true;
        loop {
            tokio::select! {
                wake = self.wake_rx.recv() => match wake {
                    Some(()) => {
                        timer.as_mut().reset(Instant::now() + self.jitter);
                        armed = true;
                        if !self.emit_ready(false).await {
                            break;
                        }
                    }
                    None => break,
                },
                () = timer.as_mut(), if armed => {
                    armed = false;
                    if !self.emit_ready(true).await {
                        break;
                    }
                }
            }
        }
        debug!("emit loop stopped");
    }

    /// Drain the emittable prefix onto the emission queue, jumping the
    /// cursor past a missing id when its jitter budget has expired. Returns
    /// false when the consumer side is gone and the loop should stop.
    async fn emit_ready(&mut self, timed_out: bool) -> bool {
        let mut st = self.state.lock().await;
        if !st.primed {
            // A timer fire before the first arrival must not start a
            // recovery window, or the first genuine late packet would be
            // rejected against an arbitrary cursor.
            return true;
        }

        if !self.drain(&mut st).await {
            return false;
        }

        if timed_out {
            // Only jump if draining left the cursor stalled behind the
            // watermark; a prefix completed by an unsignaled arrival must
            // flow out rather than be skipped.
            if st.watermark > self.space.successor(st.cursor) {
                warn!(
                    "jitter budget exhausted waiting for {}, skipping ahead to {}",
                    st.cursor, st.watermark
                );
                st.cursor = st.watermark;
                if !self.drain(&mut st).await {
                    return false;
                }
            }
            // Whatever is still buffered is ambiguous between ancient late
            // arrivals and post-rollover ids that happen to number low. The
            // recovery window resolves new arrivals going forward.
            st.begin_recovery();
            self.pending.clear();
        }
        true
    }

    async fn drain(&self, st: &mut SequencerState) -> bool {
        while st.cursor <= st.watermark {
            let Some(packet) = self.pending.take(&st.cursor) else { break };
            trace!("emitting {}", st.cursor);
            if self.next_tx.send(packet).await.is_err() {
                // Consumer half dropped: the sequencer is being torn down.
                return false;
            }
            st.cursor = self.space.successor(st.cursor);
        }
        true
    }
}
