//! Plugin traits for the pipeline stages
//!
//! Decoding and exporting are defined as traits so the pipeline can be
//! assembled from interchangeable parts (and from test doubles).

use crate::record::{DecodedMessage, MessageRecord, RawMessage};
use async_trait::async_trait;
use thiserror::Error;

/// Plugin error type
#[derive(Error, Debug)]
pub enum PluginError {
    #[error("Plugin initialization failed: {0}")]
    InitializationFailed(String),

    #[error("Plugin operation failed: {0}")]
    OperationFailed(String),

    #[error("Plugin is disabled")]
    Disabled,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

pub type PluginResult<T> = Result<T, PluginError>;

/// Basic plugin information
pub trait PluginInfo {
    /// Plugin name
    fn name(&self) -> &str;

    /// Plugin version
    fn version(&self) -> &str {
        env!("CARGO_PKG_VERSION")
    }

    /// Plugin description
    fn description(&self) -> &str {
        ""
    }
}

// =============================================================================
// DECODE PLUGINS
// =============================================================================

/// Decode plugin - turns raw input into canonical bytes, a hex dump and fields.
///
/// Decoding is total: malformed input degrades to a cruder encoding or to
/// absent fields, never to an error.
pub trait DecodePlugin: PluginInfo + Send + Sync {
    fn decode(&self, raw: RawMessage) -> DecodedMessage;
}

// =============================================================================
// EXPORT PLUGINS
// =============================================================================

/// Export plugin - sends a record somewhere outside the process
#[async_trait]
pub trait ExportPlugin: PluginInfo + Send + Sync {
    /// Export a record
    async fn export(&self, record: &MessageRecord) -> PluginResult<()>;

    /// Whether export is attempted at all
    fn is_enabled(&self) -> bool {
        true
    }
}
