//! surfmon core - message records, history, configuration and the ingestion pipeline
//!
//! This crate provides the foundational types shared by every other surfmon crate:
//!
//! - **Record**: the decoded message unit and its extracted fields
//! - **History**: the bounded, thread-safe record history
//! - **Config**: the on-disk configuration file and its defaults
//! - **Plugins**: trait definitions for the decode and export stages
//! - **Pipeline**: the per-message ingestion unit of work

pub mod config;
pub mod history;
pub mod pipeline;
pub mod plugins;
pub mod record;

// Re-export commonly used types
pub use config::{AppConfig, ApiSettings, ConfigError, ConfigStore, MonitoringSettings};
pub use history::HistoryStore;
pub use pipeline::Pipeline;
pub use plugins::{DecodePlugin, ExportPlugin, PluginError, PluginInfo, PluginResult};
pub use record::{
    DecodedMessage, DetailSection, Field, FieldMap, MessageRecord, RawMessage, RecordPayload,
};

/// Two-byte prefix that opens most Windsurf client messages
pub const MAGIC_HEADER: [u8; 2] = [0xC1, 0x0A];

/// surfmon version
pub const SURFMON_VERSION: &str = env!("CARGO_PKG_VERSION");
