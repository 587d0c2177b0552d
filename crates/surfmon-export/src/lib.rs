//! Export plugins for surfmon
//!
//! - **json_file**: one pretty-printed JSON file per record
//! - **webhook**: forwards records to the configured HTTP endpoint

pub mod json_file;
pub mod webhook;

pub use json_file::JsonFileExporter;
pub use webhook::{DispatchError, WebhookDispatcher};
