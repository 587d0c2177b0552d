//! Message capture for surfmon
//!
//! Messages are dropped by the client as `.msg` files into a directory;
//! [`DirectoryWatcher`] feeds each new file through the ingestion pipeline.

pub mod watcher;

pub use watcher::{DirectoryWatcher, RunningWatcher, WatchError, MESSAGE_SUFFIX};
