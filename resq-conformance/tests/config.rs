//! Configuration-driven construction.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use resq_core::ResqConfig;
use resq_sequencer::Sequencer;

#[tokio::test]
async fn watch_file_delivers_reloads() {
    let path = std::env::temp_dir().join("resq-conformance-watch.toml");
    std::fs::write(&path, "jitter_ms = 10\n").unwrap();

    let (initial, mut rx) = ResqConfig::watch_file(&path).unwrap();
    assert_eq!(initial.jitter_ms, 10);

    // Give the platform watcher a moment before rewriting the file.
    tokio::time::sleep(Duration::from_millis(100)).await;
    std::fs::write(&path, "jitter_ms = 25\nrecovery_window = 2\n").unwrap();

    // Watchers may coalesce or duplicate events; poll the channel until the
    // rewritten values show up.
    let updated = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            rx.changed().await.expect("watch channel");
            let cfg = rx.borrow().clone();
            if cfg.jitter_ms == 25 {
                break cfg;
            }
        }
    })
    .await
    .expect("config reload");
    assert_eq!(updated.recovery_window, 2);

    let _ = std::fs::remove_file(&path);
}

#[tokio::test]
async fn file_config_drives_the_sequencer() {
    let path = std::env::temp_dir().join("resq-conformance-config.toml");
    std::fs::write(&path, "jitter_ms = 40\nmax_seq_id = 100\nrecovery_window = 4\n").unwrap();
    let cfg = ResqConfig::from_file(&path).unwrap();
    let _ = std::fs::remove_file(&path);

    assert_eq!(cfg.jitter(), Duration::from_millis(40));
    let s: Sequencer<u64> = Sequencer::from_config(&cfg);
    assert_eq!(s.recovery_window().await, 4);

    let cancel = CancellationToken::new();
    s.add(10, 10).await.unwrap();
    assert_eq!(s.wait_next(&cancel).await.unwrap(), 10);
}
