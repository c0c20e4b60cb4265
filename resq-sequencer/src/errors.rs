#![forbid(unsafe_code)]

use thiserror::Error;

/// Result type for sequencer operations
pub type SequencerResult<T> = Result<T, SequencerError>;

/// Sequencer error types. All three are recoverable at the call site.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequencerError {
    /// `try_next` observed an empty emission queue. A polling signal, not a
    /// failure.
    #[error("no packet ready")]
    NoPacketReady,

    /// `wait_next` was cancelled before a packet became available.
    #[error("wait for next packet cancelled")]
    Cancelled,

    /// `add` rejected a packet whose id fell below the cursor while a
    /// post-timeout recovery window was active. The packet is dropped; do
    /// not retry it.
    #[error("sequencer in recovery, late packet dropped")]
    InRecovery,
}

impl SequencerError {
    /// Stable machine-readable tag, for logs and cross-language callers.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NoPacketReady => "no_packet_ready",
            Self::Cancelled => "ctx_canceled",
            Self::InRecovery => "in_recovery",
        }
    }
}
