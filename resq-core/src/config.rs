#![forbid(unsafe_code)]

//! resq configuration handling. Parses a TOML file into a strongly-typed
//! structure and supports hot-reloading via the `notify` crate. All public
//! APIs are `async`-ready but do not impose an async runtime themselves.

use serde::Deserialize;
use std::{fs, path::Path, sync::Arc, time::Duration};
use tokio::sync::watch;
use notify::{RecommendedWatcher, RecursiveMode, Result as NotifyResult, Watcher, Event, EventKind};
use tracing::warn;

use crate::{ResqError, SeqNo};

/// Primary configuration structure for a resequencer instance.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ResqConfig {
    /// Logging verbosity (`error`, `warn`, `info`, `debug`, `trace`).
    pub log_level: Option<String>,

    /// Upper bound, in milliseconds, on how long the cursor waits for a
    /// missing sequence id before skipping ahead.
    pub jitter_ms: u64,

    /// Largest sequence id before the space rolls over to zero.
    pub max_seq_id: SeqNo,

    /// Number of sequence steps after a timeout during which below-cursor
    /// late arrivals are dropped.
    pub recovery_window: u64,
}

impl Default for ResqConfig {
    fn default() -> Self {
        Self {
            log_level: Some("info".to_string()),
            jitter_ms: default_jitter_ms(),
            max_seq_id: default_max_seq_id(),
            recovery_window: default_recovery_window(),
        }
    }
}

fn default_jitter_ms() -> u64 {
    30
}

fn default_max_seq_id() -> SeqNo {
    65535
}

fn default_recovery_window() -> u64 {
    10
}

impl ResqConfig {
    /// Load a configuration file from the given path.
    pub fn from_file<P: AsRef<Path>>(path: P) -> crate::ResqResult<Self> {
        let data = fs::read_to_string(&path).map_err(ResqError::from)?;
        let cfg = toml::from_str::<ResqConfig>(&data).map_err(ResqError::ConfigParse)?;
        Ok(cfg)
    }

    /// Load config alias version
    pub fn load<P: AsRef<Path>>(path: P) -> crate::ResqResult<Self> {
        Self::from_file(path)
    }

    /// Jitter budget as a [`Duration`].
    #[must_use]
    pub fn jitter(&self) -> Duration {
        Duration::from_millis(self.jitter_ms)
    }

    /// Watch the configuration file for changes and receive updates through a watch channel.
    ///
    /// Returns the initial configuration and a [`watch::Receiver`] that yields a new
    /// [`ResqConfig`] wrapped in [`Arc`] every time the file is modified on disk.
    pub fn watch_file<P: AsRef<Path>>(path: P) -> crate::ResqResult<(Arc<ResqConfig>, watch::Receiver<Arc<ResqConfig>>)> {
        let path_buf = path.as_ref().to_path_buf();
        let initial_cfg = Arc::new(Self::from_file(&path_buf)?);
        // Clone for closure capture to avoid moving the original `path_buf`.
        let path_in_closure = path_buf.clone();
        let (tx, rx) = watch::channel::<Arc<ResqConfig>>(initial_cfg.clone());

        // `notify` requires the watcher to stay alive for as long as we want events. We therefore
        // spawn it on a background task and intentionally leak it so that it lives for the process
        // lifetime. This avoids polluting the public API with a guard type the caller must hold.
        let mut watcher: RecommendedWatcher = notify::recommended_watcher(move |res: NotifyResult<Event>| {
            if let Ok(event) = res {
                // Interested only in content modifications.
                if matches!(event.kind, EventKind::Modify(_)) {
                    match Self::from_file(&path_in_closure) {
                        Ok(updated) => {
                            let _ = tx.send(Arc::new(updated));
                        }
                        Err(e) => warn!("ignoring unparsable config reload: {e}"),
                    }
                }
            }
        })?;

        watcher.watch(&path_buf, RecursiveMode::NonRecursive)?;
        // Leak the watcher so it keeps running. Safe because it lives for the entire program.
        std::mem::forget(watcher);

        Ok((initial_cfg, rx))
    }
}
