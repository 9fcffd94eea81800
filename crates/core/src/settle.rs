//! Waits for a newly created file to finish being written.

use std::path::Path;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settle {
    /// Sleep once for a fixed duration.
    Fixed(Duration),
    /// Sample the file size every `interval` until two samples agree, giving up
    /// after `max_wait`.
    SizeStable { interval: Duration, max_wait: Duration },
}

impl Default for Settle {
    fn default() -> Self {
        Settle::Fixed(Duration::from_secs(1))
    }
}

impl Settle {
    pub async fn wait(&self, path: &Path) {
        match self {
            Settle::Fixed(delay) => sleep(*delay).await,
            Settle::SizeStable { interval, max_wait } => {
                wait_for_stable_size(path, *interval, *max_wait).await
            }
        }
    }
}

async fn file_size(path: &Path) -> Option<u64> {
    tokio::fs::metadata(path).await.ok().map(|m| m.len())
}

async fn wait_for_stable_size(path: &Path, interval: Duration, max_wait: Duration) {
    let deadline = Instant::now() + max_wait;
    let mut last = file_size(path).await;
    loop {
        sleep(interval).await;
        let current = file_size(path).await;
        match current {
            None => {
                debug!(path = %path.display(), "file vanished while settling");
                return;
            }
            Some(size) if current == last => {
                debug!(path = %path.display(), size, "file size settled");
                return;
            }
            Some(_) => {}
        }
        if Instant::now() >= deadline {
            warn!(path = %path.display(), "file still growing after settle limit; uploading anyway");
            return;
        }
        last = current;
    }
}
