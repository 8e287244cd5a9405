use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

const MIN_POLL: Duration = Duration::from_millis(20);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeNotification {
    pub path: PathBuf,
}

pub async fn read_payload(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read now playing file {}", path.display()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Fingerprint {
    modified: Option<SystemTime>,
    len: u64,
}

async fn fingerprint(path: &Path) -> Option<Fingerprint> {
    let meta = tokio::fs::metadata(path).await.ok()?;
    Some(Fingerprint {
        modified: meta.modified().ok(),
        len: meta.len(),
    })
}

pub fn spawn_file_watcher(
    path: PathBuf,
    poll_interval: Duration,
    tx: mpsc::Sender<ChangeNotification>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut known = fingerprint(&path).await;
        let sleep = poll_interval.max(MIN_POLL);
        debug!(path = %path.display(), ?sleep, "watching now playing file");
        loop {
            tokio::time::sleep(sleep).await;
            let current = fingerprint(&path).await;
            if current.is_some() && current != known {
                trace!(path = %path.display(), "now playing file fingerprint changed");
                let change = ChangeNotification { path: path.clone() };
                if tx.send(change).await.is_err() {
                    debug!("change receiver dropped; stopping file watcher");
                    break;
                }
            }
            known = current;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::{fingerprint, read_payload, spawn_file_watcher};
    use std::time::Duration;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn reports_rewrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nowmusic.txt");
        std::fs::write(&path, "a").unwrap();

        let (tx, mut rx) = mpsc::channel(8);
        let handle = spawn_file_watcher(path.clone(), Duration::from_millis(20), tx);

        tokio::time::sleep(Duration::from_millis(60)).await;
        std::fs::write(&path, "a longer payload").unwrap();

        let change = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("watcher should notice the rewrite")
            .unwrap();
        assert_eq!(change.path, path);

        drop(rx);
        handle.abort();
    }

    #[tokio::test]
    async fn missing_file_is_quiet() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.txt");

        let (tx, mut rx) = mpsc::channel(8);
        let handle = spawn_file_watcher(path, Duration::from_millis(20), tx);

        let res = tokio::time::timeout(Duration::from_millis(200), rx.recv()).await;
        assert!(res.is_err());
        handle.abort();
    }

    #[tokio::test]
    async fn fingerprint_tracks_size_and_absence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nowmusic.txt");
        assert!(fingerprint(&path).await.is_none());

        std::fs::write(&path, "abc").unwrap();
        let first = fingerprint(&path).await.unwrap();
        assert_eq!(first.len, 3);

        std::fs::write(&path, "abcdef").unwrap();
        assert_ne!(fingerprint(&path).await, Some(first));
    }

    #[tokio::test]
    async fn read_error_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.txt");
        let err = read_payload(&path).await.unwrap_err();
        assert!(err.to_string().contains("absent.txt"));
    }
}
