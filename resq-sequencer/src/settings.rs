#![forbid(unsafe_code)]

//! Runtime-tunable sequencer settings and watcher.

use tokio::sync::{watch, watch::Receiver};

/// Recovery window applied when nothing else is configured.
pub const DEFAULT_RECOVERY_WINDOW: u64 = 10;

/// Mutable sequencer configuration applied while the instance runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequencerSettings {
    /// Number of sequence steps after a timeout during which below-cursor
    /// late arrivals are dropped.
    pub recovery_window: u64,
}

impl Default for SequencerSettings {
    fn default() -> Self {
        Self { recovery_window: DEFAULT_RECOVERY_WINDOW }
    }
}

/// Create a watch channel seeded with default settings.
pub fn settings_watch() -> (watch::Sender<SequencerSettings>, Receiver<SequencerSettings>) {
    watch::channel(SequencerSettings::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn watch_seeds_defaults() {
        let (_tx, rx) = settings_watch();
        assert_eq!(rx.borrow().recovery_window, DEFAULT_RECOVERY_WINDOW);
    }
}
