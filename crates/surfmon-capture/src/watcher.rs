//! Directory watcher

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use surfmon_core::{Pipeline, RawMessage};
use thiserror::Error;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

/// File name suffix of client messages
pub const MESSAGE_SUFFIX: &str = ".msg";

/// Wait between the creation event and reading the file, so the writer can
/// finish flushing it
const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(100);

#[derive(Error, Debug)]
pub enum WatchError {
    #[error("Watch directory does not exist: {0}")]
    MissingDirectory(PathBuf),

    #[error("Failed to watch {path}: {source}")]
    Notify {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },
}

/// Watches one directory (non-recursively) for new message files
pub struct DirectoryWatcher {
    directory: PathBuf,
    pipeline: Arc<Pipeline>,
    settle_delay: Duration,
}

impl DirectoryWatcher {
    pub fn new(directory: impl Into<PathBuf>, pipeline: Arc<Pipeline>) -> Self {
        Self {
            directory: directory.into(),
            pipeline,
            settle_delay: DEFAULT_SETTLE_DELAY,
        }
    }

    pub fn with_settle_delay(mut self, settle_delay: Duration) -> Self {
        self.settle_delay = settle_delay;
        self
    }

    /// Whether a path names a client message file
    pub fn is_message_file(path: &Path) -> bool {
        path.file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.ends_with(MESSAGE_SUFFIX))
    }

    /// Register the OS watch. Events are queued from this point on.
    pub fn start(self) -> Result<RunningWatcher, WatchError> {
        if !self.directory.is_dir() {
            return Err(WatchError::MissingDirectory(self.directory));
        }

        let (tx, rx) = mpsc::channel::<PathBuf>(256);

        let mut watcher = RecommendedWatcher::new(
            move |result: Result<Event, notify::Error>| match result {
                Ok(event) => {
                    queue_created(&tx, event);
                }
                Err(e) => {
                    warn!(error = %e, "File watcher error");
                }
            },
            Config::default(),
        )
        .map_err(|source| WatchError::Notify {
            path: self.directory.clone(),
            source,
        })?;

        watcher
            .watch(&self.directory, RecursiveMode::NonRecursive)
            .map_err(|source| WatchError::Notify {
                path: self.directory.clone(),
                source,
            })?;

        info!(directory = %self.directory.display(), "Watching for {} files", MESSAGE_SUFFIX);

        Ok(RunningWatcher {
            _watcher: watcher,
            events: rx,
            pipeline: self.pipeline,
            settle_delay: self.settle_delay,
        })
    }
}

/// An active watch, consuming creation events
pub struct RunningWatcher {
    _watcher: RecommendedWatcher,
    events: mpsc::Receiver<PathBuf>,
    pipeline: Arc<Pipeline>,
    settle_delay: Duration,
}

impl RunningWatcher {
    /// Ingest message files until shutdown. Returns how many were ingested.
    ///
    /// Files are processed one at a time; a shutdown signal received while a
    /// file is being ingested takes effect once that file is done.
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) -> u64 {
        let mut ingested = 0u64;

        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    info!("Directory watcher shutting down");
                    break;
                }
                event = self.events.recv() => match event {
                    Some(path) => {
                        if self.ingest_file(&path).await {
                            ingested += 1;
                        }
                    }
                    None => break,
                },
            }
        }

        ingested
    }

    async fn ingest_file(&self, path: &Path) -> bool {
        tokio::time::sleep(self.settle_delay).await;

        if path.is_dir() {
            debug!(path = %path.display(), "Ignoring directory");
            return false;
        }

        match tokio::fs::read(path).await {
            Ok(bytes) => {
                debug!(path = %path.display(), size = bytes.len(), "Read message file");
                self.pipeline.ingest(RawMessage::Bytes(bytes)).await;
                true
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read message file");
                false
            }
        }
    }
}

/// Queue the message files an event created. Returns how many were queued.
fn queue_created(tx: &mpsc::Sender<PathBuf>, event: Event) -> usize {
    if !matches!(event.kind, EventKind::Create(_)) {
        return 0;
    }
    let mut queued = 0;
    for path in event.paths {
        if !DirectoryWatcher::is_message_file(&path) {
            continue;
        }
        debug!(path = %path.display(), "Message file created");
        match tx.blocking_send(path) {
            Ok(()) => queued += 1,
            Err(e) => debug!(path = %e.0.display(), "Watcher stopped, dropping event"),
        }
    }
    queued
}

#[cfg(test)]
mod tests {
    use super::*;
    use surfmon_core::{Field, HistoryStore};
    use surfmon_decode::WindsurfDecoder;
    use tempfile::tempdir;

    fn pipeline() -> Arc<Pipeline> {
        Arc::new(Pipeline::new(
            Box::new(WindsurfDecoder::default()),
            Arc::new(HistoryStore::new(10)),
        ))
    }

    async fn wait_for_history(pipeline: &Pipeline, len: usize) -> bool {
        for _ in 0..50 {
            if pipeline.history().len() >= len {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        false
    }

    #[test]
    fn test_message_suffix_filter() {
        assert!(DirectoryWatcher::is_message_file(Path::new("/tmp/a.msg")));
        assert!(DirectoryWatcher::is_message_file(Path::new("b.msg")));
        assert!(!DirectoryWatcher::is_message_file(Path::new("a.msg.tmp")));
        assert!(!DirectoryWatcher::is_message_file(Path::new("a.txt")));
        assert!(!DirectoryWatcher::is_message_file(Path::new("/")));
    }

    #[test]
    fn test_events_after_stop_are_dropped() {
        use notify::event::{CreateKind, ModifyKind};

        let created = |name: &str| {
            Event::new(EventKind::Create(CreateKind::File)).add_path(PathBuf::from(name))
        };

        let (tx, mut rx) = mpsc::channel::<PathBuf>(4);
        assert_eq!(queue_created(&tx, created("/w/a.msg")), 1);
        assert_eq!(queue_created(&tx, created("/w/a.txt")), 0);
        let modified = Event::new(EventKind::Modify(ModifyKind::Any)).add_path("/w/b.msg".into());
        assert_eq!(queue_created(&tx, modified), 0);
        assert_eq!(rx.try_recv().unwrap(), PathBuf::from("/w/a.msg"));

        drop(rx);
        assert_eq!(queue_created(&tx, created("/w/c.msg")), 0);
    }

    #[test]
    fn test_missing_directory_is_an_error() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope");
        let result = DirectoryWatcher::new(&missing, pipeline()).start();
        assert!(matches!(result, Err(WatchError::MissingDirectory(p)) if p == missing));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_ingests_new_message_files_only() {
        let dir = tempdir().unwrap();
        let pipeline = pipeline();
        let running = DirectoryWatcher::new(dir.path(), pipeline.clone())
            .with_settle_delay(Duration::from_millis(20))
            .start()
            .unwrap();

        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let task = tokio::spawn(running.run(shutdown_rx));

        std::fs::write(dir.path().join("ignored.txt"), b"windsurf-0.1$x\"").unwrap();
        std::fs::create_dir(dir.path().join("folder.msg")).unwrap();
        std::fs::write(dir.path().join("one.msg"), b"windsurf-1.0$s1\"").unwrap();

        assert!(wait_for_history(&pipeline, 1).await);
        // Give stray events a chance to show up before checking the count.
        tokio::time::sleep(Duration::from_millis(300)).await;

        shutdown_tx.send(()).unwrap();
        let ingested = task.await.unwrap();

        assert_eq!(ingested, 1);
        let latest = pipeline.history().latest().unwrap();
        assert_eq!(latest.fields().get(Field::ClientVersion), Some("windsurf-1.0"));
        assert_eq!(latest.fields().get(Field::SessionId), Some("s1"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_shutdown_stops_idle_watcher() {
        let dir = tempdir().unwrap();
        let running = DirectoryWatcher::new(dir.path(), pipeline()).start().unwrap();

        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let task = tokio::spawn(running.run(shutdown_rx));
        shutdown_tx.send(()).unwrap();

        let ingested = tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(ingested, 0);
    }
}
