//! Custom test assertions for integration tests

use std::time::Duration;
use tokio::sync::broadcast;
use v2a_dl::{Client, DownloadKey, Event};

/// Wait for the first event matching `predicate`
///
/// Returns `None` on timeout or when the channel closes.
pub async fn wait_for_event(
    events: &mut broadcast::Receiver<Event>,
    timeout: Duration,
    predicate: impl Fn(&Event) -> bool,
) -> Option<Event> {
    tokio::time::timeout(timeout, async {
        loop {
            match events.recv().await {
                Ok(event) if predicate(&event) => return Some(event),
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    })
    .await
    .ok()
    .flatten()
}

/// Poll until `key` is tracked as in flight
pub async fn wait_until_in_flight(client: &Client, key: &DownloadKey, timeout: Duration) -> bool {
    tokio::time::timeout(timeout, async {
        while !client.in_flight().contains(key) {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .is_ok()
}

/// Assert the file at `path` exists and holds `expected`
pub fn assert_file_contents(path: &std::path::Path, expected: &[u8]) {
    let actual = std::fs::read(path)
        .unwrap_or_else(|e| panic!("failed to read {}: {}", path.display(), e));
    assert_eq!(actual, expected, "unexpected contents in {}", path.display());
}
