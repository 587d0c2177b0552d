//! Per-record JSON file exporter

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use surfmon_core::{ExportPlugin, MessageRecord, PluginInfo, PluginResult};
use tracing::debug;

/// Writes each record to `<output_dir>/message_<timestamp>.json`.
///
/// Files are written under a temporary name and renamed into place, so a
/// reader never observes a partially written record.
pub struct JsonFileExporter {
    output_dir: PathBuf,
    records_written: AtomicU64,
}

impl JsonFileExporter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            records_written: AtomicU64::new(0),
        }
    }

    /// File name for a record, derived from its timestamp
    pub fn file_name(record: &MessageRecord) -> String {
        format!(
            "message_{}.json",
            record.timestamp().format("%Y%m%d_%H%M%S_%3f")
        )
    }

    pub fn records_written(&self) -> u64 {
        self.records_written.load(Ordering::Relaxed)
    }

    /// Write a record and return the path it landed at
    pub async fn write(&self, record: &MessageRecord) -> PluginResult<PathBuf> {
        tokio::fs::create_dir_all(&self.output_dir).await?;

        let path = self.free_path(&Self::file_name(record)).await?;
        let json = serde_json::to_string_pretty(&record.payload())?;

        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &path).await?;

        self.records_written.fetch_add(1, Ordering::Relaxed);
        debug!("Persisted record to {}", path.display());
        Ok(path)
    }

    /// `name`, or `name` with a numeric suffix if a record already claimed it
    async fn free_path(&self, name: &str) -> PluginResult<PathBuf> {
        let path = self.output_dir.join(name);
        if !tokio::fs::try_exists(&path).await? {
            return Ok(path);
        }

        let stem = name.trim_end_matches(".json");
        let mut n = 1u32;
        loop {
            let candidate = self.output_dir.join(format!("{stem}_{n}.json"));
            if !tokio::fs::try_exists(&candidate).await? {
                return Ok(candidate);
            }
            n += 1;
        }
    }
}

impl PluginInfo for JsonFileExporter {
    fn name(&self) -> &str {
        "json-file"
    }

    fn description(&self) -> &str {
        "Persists each record as a JSON file"
    }
}

#[async_trait]
impl ExportPlugin for JsonFileExporter {
    async fn export(&self, record: &MessageRecord) -> PluginResult<()> {
        self.write(record).await.map(|_| ())
    }
}
