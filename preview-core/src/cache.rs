// ABOUTME: Session-scoped fetch cache mapping image locations to local temp files
// ABOUTME: Guarantees one fetch in flight per location and invalidates on source change

use crate::constants::cache::{FLUSH_GRACE, TEMP_FILE_PREFIX};
use crate::downloader::{copy_local, ImageDownloader};
use crate::error::{PreviewError, Result};
use crate::location::ResolvedLocation;
use futures_util::future::{self, BoxFuture, FutureExt, Shared};
use notify::event::ModifyKind;
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempPath;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::AbortHandle;

/// What a materialized location settles to: a path (or data URI) the
/// renderer can read directly.
pub type FetchResult = std::result::Result<String, Arc<PreviewError>>;

/// A fetch that any number of callers can await; all observe the same result.
pub type SharedFetch = Shared<BoxFuture<'static, FetchResult>>;

/// Messages the cache posts back to its owner. `entry_id` ties the message to
/// the entry that produced it so late messages never touch a newer entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheEvent {
    SourceChanged { key: String, entry_id: u64 },
    FetchFailed { key: String, entry_id: u64 },
}

struct CacheEntry {
    id: u64,
    fetch: SharedFetch,
    task: AbortHandle,
    temp: TempPath,
    watcher: Option<RecommendedWatcher>,
}

pub struct FetchCache {
    entries: HashMap<String, CacheEntry>,
    downloader: Arc<ImageDownloader>,
    events: UnboundedSender<CacheEvent>,
    next_id: u64,
}

impl FetchCache {
    pub fn new(events: UnboundedSender<CacheEvent>) -> Self {
        Self::with_downloader(ImageDownloader::new(), events)
    }

    pub fn with_downloader(downloader: ImageDownloader, events: UnboundedSender<CacheEvent>) -> Self {
        Self {
            entries: HashMap::new(),
            downloader: Arc::new(downloader),
            events,
            next_id: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Returns a future of a local readable path for `location`.
    ///
    /// Data URIs settle immediately to themselves and never enter the cache.
    /// A location that already has an entry gets the existing future back.
    /// Otherwise a temp file is allocated and the fetch starts right away.
    /// Setup failures (malformed URL, temp file, watch) are returned as `Err`
    /// and leave no entry behind, so the next scan can retry.
    pub fn materialize(&mut self, location: &ResolvedLocation) -> Result<SharedFetch> {
        if let ResolvedLocation::DataUri(data) = location {
            return Ok(future::ready(Ok(data.clone())).boxed().shared());
        }

        let key = location.as_str();
        if let Some(entry) = self.entries.get(key) {
            log::debug!("Cache hit: {}", key);
            return Ok(entry.fetch.clone());
        }

        log::debug!("Cache miss: {}", key);
        let entry = self.start_fetch(location)?;
        let fetch = entry.fetch.clone();
        self.entries.insert(key.to_string(), entry);
        Ok(fetch)
    }

    fn start_fetch(&mut self, location: &ResolvedLocation) -> Result<CacheEntry> {
        let key = location.as_str().to_string();
        let id = self.next_id;
        self.next_id += 1;

        let temp = allocate_temp_path(location.extension().as_deref())?;
        let destination = temp.to_path_buf();

        let (watcher, task) = match location {
            ResolvedLocation::NetworkUrl(url) => {
                let url = ImageDownloader::validate_url(url)?;
                let downloader = Arc::clone(&self.downloader);
                let task = tokio::spawn(async move {
                    downloader.download_to(url, &destination).await?;
                    Ok::<PathBuf, PreviewError>(destination)
                });
                (None, task)
            }
            ResolvedLocation::LocalPath(path) => {
                let source = PathBuf::from(path);
                let watcher = watch_source(&source, &key, id, self.events.clone())?;
                let task = tokio::spawn(async move {
                    copy_local(&source, &destination).await?;
                    Ok::<PathBuf, PreviewError>(destination)
                });
                (Some(watcher), task)
            }
            ResolvedLocation::DataUri(_) => {
                return Err(PreviewError::InvalidUrl {
                    url: key,
                    reason: "data URIs are rendered inline, not fetched".to_string(),
                });
            }
        };

        let abort = task.abort_handle();
        let events = self.events.clone();
        let fetch_key = key.clone();
        let fetch = async move {
            let outcome: std::result::Result<PathBuf, PreviewError> = match task.await {
                Ok(result) => result,
                Err(join_error) => Err(PreviewError::Aborted(format!(
                    "{}: {}",
                    fetch_key, join_error
                ))),
            };

            match outcome {
                Ok(path) => Ok(path.to_string_lossy().into_owned()),
                Err(e) => {
                    log::debug!(
                        "Fetch failed for {} (retryable: {}): {}",
                        fetch_key,
                        e.is_retryable(),
                        e
                    );
                    let _ = events.send(CacheEvent::FetchFailed {
                        key: fetch_key,
                        entry_id: id,
                    });
                    Err(Arc::new(e))
                }
            }
        }
        .boxed()
        .shared();

        // Drive the fetch even when nobody awaits it yet
        tokio::spawn(fetch.clone().map(|_| ()));

        Ok(CacheEntry {
            id,
            fetch,
            task: abort,
            temp,
            watcher,
        })
    }

    /// Drops the entry for `key` if it is still the one that produced
    /// `entry_id`: closes its watch and deletes its temp file.
    pub fn invalidate(&mut self, key: &str, entry_id: u64) -> bool {
        let matches = self
            .entries
            .get(key)
            .is_some_and(|entry| entry.id == entry_id);
        if !matches {
            return false;
        }

        if let Some(entry) = self.entries.remove(key) {
            log::debug!("Invalidated cache entry: {}", key);
            discard(entry);
        }
        true
    }

    /// Awaits every pending fetch together under one grace period, then
    /// deletes all temp files and empties the cache. Fetches still running
    /// at the deadline are aborted.
    pub async fn cleanup(&mut self) {
        let entries: Vec<(String, CacheEntry)> = self.entries.drain().collect();
        if entries.is_empty() {
            return;
        }
        log::debug!("Flushing {} cache entries", entries.len());

        let pending = future::join_all(entries.iter().map(|(_, entry)| entry.fetch.clone()));
        if tokio::time::timeout(FLUSH_GRACE, pending).await.is_err() {
            log::debug!("Abandoning fetches still in flight after {:?}", FLUSH_GRACE);
        }

        for (_, entry) in entries {
            discard(entry);
        }
    }
}

impl Drop for FetchCache {
    fn drop(&mut self) {
        for (_, entry) in self.entries.drain() {
            discard(entry);
        }
    }
}

fn discard(entry: CacheEntry) {
    entry.task.abort();
    drop(entry.watcher);
    if let Err(e) = entry.temp.close() {
        log::debug!("Failed to remove temp file: {}", e);
    }
}

fn allocate_temp_path(extension: Option<&str>) -> Result<TempPath> {
    let suffix = extension.map(|ext| format!(".{}", ext)).unwrap_or_default();
    let file = tempfile::Builder::new()
        .prefix(TEMP_FILE_PREFIX)
        .suffix(&suffix)
        .tempfile()?;
    // Keep only the path; the handle is reopened by whichever fetch writes it
    Ok(file.into_temp_path())
}

fn watch_source(
    source: &Path,
    key: &str,
    entry_id: u64,
    events: UnboundedSender<CacheEvent>,
) -> Result<RecommendedWatcher> {
    let key = key.to_string();
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
        let Ok(event) = res else {
            return;
        };
        let changed = match event.kind {
            EventKind::Modify(ModifyKind::Metadata(_)) => false,
            EventKind::Modify(_) | EventKind::Create(_) | EventKind::Remove(_) => true,
            _ => false,
        };
        if changed {
            let _ = events.send(CacheEvent::SourceChanged {
                key: key.clone(),
                entry_id,
            });
        }
    })
    .map_err(|source_err| PreviewError::Watch {
        path: source.display().to_string(),
        source: source_err,
    })?;

    watcher
        .watch(source, RecursiveMode::NonRecursive)
        .map_err(|source_err| PreviewError::Watch {
            path: source.display().to_string(),
            source: source_err,
        })?;

    Ok(watcher)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;
    use std::time::Duration;
    use tempfile::TempDir;
    use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};

    fn cache() -> (FetchCache, UnboundedReceiver<CacheEvent>) {
        let (tx, rx) = unbounded_channel();
        (FetchCache::new(tx), rx)
    }

    #[tokio::test]
    async fn test_data_uri_is_not_cached() {
        let (mut cache, _rx) = cache();
        let data = "data:image/png;base64,AAAA";
        let fetch = cache
            .materialize(&ResolvedLocation::DataUri(data.to_string()))
            .unwrap();

        let settled = fetch.now_or_never().expect("data URIs settle immediately");
        assert_eq!(settled.unwrap(), data);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_materialize_fetches_once() {
        let mut server = Server::new_async().await;
        let body = b"GIF89a-bytes".to_vec();
        let mock = server
            .mock("GET", "/a.gif")
            .with_status(200)
            .with_body(&body)
            .expect(1)
            .create_async()
            .await;

        let (mut cache, _rx) = cache();
        let location = ResolvedLocation::NetworkUrl(format!("{}/a.gif", server.url()));

        let first = cache.materialize(&location).unwrap();
        let second = cache.materialize(&location).unwrap();
        let (a, b) = tokio::join!(first, second);

        mock.assert_async().await;
        let a = a.unwrap();
        assert_eq!(a, b.unwrap());
        assert!(a.ends_with(".gif"));
        assert_eq!(std::fs::read(&a).unwrap(), body);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_local_copy_and_cleanup_removes_temp_file() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("logo.png");
        std::fs::write(&source, b"png bytes").unwrap();

        let (mut cache, _rx) = cache();
        let location = ResolvedLocation::LocalPath(source.to_string_lossy().into_owned());
        let local = cache.materialize(&location).unwrap().await.unwrap();

        assert_ne!(Path::new(&local), source.as_path());
        assert_eq!(std::fs::read(&local).unwrap(), b"png bytes");
        assert!(cache.contains(location.as_str()));

        cache.cleanup().await;
        assert!(cache.is_empty());
        assert!(!Path::new(&local).exists());
    }

    #[tokio::test]
    async fn test_source_change_posts_event_and_invalidate_drops_entry() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("logo.png");
        std::fs::write(&source, b"v1").unwrap();

        let (mut cache, mut rx) = cache();
        let location = ResolvedLocation::LocalPath(source.to_string_lossy().into_owned());
        let first = cache.materialize(&location).unwrap().await.unwrap();

        std::fs::write(&source, b"v2").unwrap();
        let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("watch event")
            .expect("channel open");

        let CacheEvent::SourceChanged { key, entry_id } = event else {
            panic!("expected a source change, got {:?}", event);
        };
        assert_eq!(key, location.as_str());

        // A stale id leaves the entry alone
        assert!(!cache.invalidate(&key, entry_id + 1));
        assert!(cache.invalidate(&key, entry_id));
        assert!(!cache.contains(&key));
        assert!(!Path::new(&first).exists());

        let second = cache.materialize(&location).unwrap().await.unwrap();
        assert_ne!(first, second);
        assert_eq!(std::fs::read(&second).unwrap(), b"v2");
    }

    #[tokio::test]
    async fn test_malformed_url_is_a_setup_failure() {
        let (mut cache, _rx) = cache();
        let result = cache.materialize(&ResolvedLocation::NetworkUrl("http://".to_string()));
        assert!(matches!(result, Err(PreviewError::InvalidUrl { .. })));
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_missing_local_source_is_a_setup_failure() {
        let (mut cache, _rx) = cache();
        let result = cache.materialize(&ResolvedLocation::LocalPath(
            "/definitely/not/here.png".to_string(),
        ));
        assert!(matches!(result, Err(PreviewError::Watch { .. })));
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_cleanup_of_stalled_fetches_shares_one_grace_period() {
        // Accepts connections but never answers
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        let _accept = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let (mut cache, _rx) = cache();
        for name in ["a.png", "b.png", "c.png"] {
            let location = ResolvedLocation::NetworkUrl(format!("http://{}/{}", address, name));
            cache.materialize(&location).unwrap();
        }
        assert_eq!(cache.len(), 3);

        let started = tokio::time::Instant::now();
        cache.cleanup().await;
        let elapsed = started.elapsed();

        assert!(cache.is_empty());
        assert!(elapsed >= FLUSH_GRACE);
        assert!(
            elapsed < FLUSH_GRACE * 2,
            "cleanup took {:?} for three stalled fetches",
            elapsed
        );
    }

    #[tokio::test]
    async fn test_failed_fetch_settles_with_error_and_reports() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/gone.png")
            .with_status(404)
            .create_async()
            .await;

        let (mut cache, mut rx) = cache();
        let location = ResolvedLocation::NetworkUrl(format!("{}/gone.png", server.url()));
        let result = cache.materialize(&location).unwrap().await;

        mock.assert_async().await;
        assert!(result.is_err());

        let event = rx.recv().await.unwrap();
        let CacheEvent::FetchFailed { key, entry_id } = event else {
            panic!("expected a failure report, got {:?}", event);
        };
        assert!(cache.invalidate(&key, entry_id));
        assert!(cache.is_empty());
    }
}
