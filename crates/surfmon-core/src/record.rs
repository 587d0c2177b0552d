//! Message records and extracted fields

use crate::MAGIC_HEADER;
use chrono::{DateTime, Local, SecondsFormat};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Placeholder shown for fields the extractor could not recover
pub const UNKNOWN: &str = "Unknown";

/// Input handed to the pipeline before normalization
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawMessage {
    /// Bytes read from a file or watcher event
    Bytes(Vec<u8>),
    /// Textual encoding given on the command line
    Text(String),
}

impl From<Vec<u8>> for RawMessage {
    fn from(bytes: Vec<u8>) -> Self {
        RawMessage::Bytes(bytes)
    }
}

impl From<&[u8]> for RawMessage {
    fn from(bytes: &[u8]) -> Self {
        RawMessage::Bytes(bytes.to_vec())
    }
}

impl From<String> for RawMessage {
    fn from(text: String) -> Self {
        RawMessage::Text(text)
    }
}

impl From<&str> for RawMessage {
    fn from(text: &str) -> Self {
        RawMessage::Text(text.to_string())
    }
}

/// Field the extractor tries to recover from message text
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    ClientVersion,
    SessionId,
    Language,
    Version,
    MachineId,
    InstallationPath,
}

impl Field {
    /// All fields, in display order
    pub const ALL: [Field; 6] = [
        Field::ClientVersion,
        Field::SessionId,
        Field::Language,
        Field::Version,
        Field::MachineId,
        Field::InstallationPath,
    ];

    /// Wire name used in serialized records
    pub fn as_str(self) -> &'static str {
        match self {
            Field::ClientVersion => "client_version",
            Field::SessionId => "session_id",
            Field::Language => "language",
            Field::Version => "version",
            Field::MachineId => "machine_id",
            Field::InstallationPath => "installation_path",
        }
    }

    /// Human readable label
    pub fn label(self) -> &'static str {
        match self {
            Field::ClientVersion => "Client Version",
            Field::SessionId => "Session ID",
            Field::Language => "Language",
            Field::Version => "Version",
            Field::MachineId => "Machine ID",
            Field::InstallationPath => "Installation Path",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Extracted fields of one message.
///
/// Absent fields are simply missing from the map. When extraction itself
/// failed, `error` carries the description and no field is present.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldMap {
    values: BTreeMap<Field, String>,
    error: Option<String>,
}

impl FieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map describing a failed extraction
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            values: BTreeMap::new(),
            error: Some(error.into()),
        }
    }

    pub fn insert(&mut self, field: Field, value: impl Into<String>) {
        self.values.insert(field, value.into());
    }

    pub fn get(&self, field: Field) -> Option<&str> {
        self.values.get(&field).map(String::as_str)
    }

    /// Value or the `Unknown` placeholder
    pub fn display(&self, field: Field) -> &str {
        self.get(field).unwrap_or(UNKNOWN)
    }

    pub fn contains(&self, field: Field) -> bool {
        self.values.contains_key(&field)
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.error.is_none()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &str)> {
        self.values.iter().map(|(k, v)| (*k, v.as_str()))
    }
}

impl Serialize for FieldMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = self.values.len() + usize::from(self.error.is_some());
        let mut map = serializer.serialize_map(Some(len))?;
        for (field, value) in &self.values {
            map.serialize_entry(field.as_str(), value)?;
        }
        if let Some(error) = &self.error {
            map.serialize_entry("error", error)?;
        }
        map.end()
    }
}

/// Output of a decode plugin, before it is stamped into a record
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedMessage {
    /// Canonical bytes after normalization
    pub bytes: Vec<u8>,
    /// Rendered hex dump of `bytes`
    pub hex_dump: String,
    /// Extracted fields
    pub fields: FieldMap,
}

/// A decoded message.
///
/// Everything but the dispatch flag is fixed at creation.
#[derive(Debug, Clone)]
pub struct MessageRecord {
    timestamp: DateTime<Local>,
    raw: Vec<u8>,
    hex_dump: String,
    fields: FieldMap,
    dispatched: bool,
}

impl MessageRecord {
    /// Stamp a decoded message with the current time
    pub fn new(decoded: DecodedMessage) -> Self {
        Self::with_timestamp(decoded, Local::now())
    }

    pub fn with_timestamp(decoded: DecodedMessage, timestamp: DateTime<Local>) -> Self {
        Self {
            timestamp,
            raw: decoded.bytes,
            hex_dump: decoded.hex_dump,
            fields: decoded.fields,
            dispatched: false,
        }
    }

    pub fn timestamp(&self) -> DateTime<Local> {
        self.timestamp
    }

    pub fn raw_bytes(&self) -> &[u8] {
        &self.raw
    }

    pub fn hex_dump(&self) -> &str {
        &self.hex_dump
    }

    pub fn fields(&self) -> &FieldMap {
        &self.fields
    }

    pub fn is_dispatched(&self) -> bool {
        self.dispatched
    }

    /// Record a successful dispatch. Only ever flips false to true.
    pub fn mark_dispatched(&mut self) {
        self.dispatched = true;
    }

    pub fn size(&self) -> usize {
        self.raw.len()
    }

    pub fn has_magic_header(&self) -> bool {
        self.raw.starts_with(&MAGIC_HEADER)
    }

    /// Serialized form used for persistence and forwarding
    pub fn payload(&self) -> RecordPayload<'_> {
        RecordPayload {
            timestamp: self.timestamp.to_rfc3339_opts(SecondsFormat::Micros, false),
            parsed_data: &self.fields,
            hex_dump: &self.hex_dump,
            raw_data: hex::encode(&self.raw),
        }
    }

    /// Grouped view of the record for reports and the dashboard
    pub fn detail_sections(&self) -> Vec<DetailSection> {
        let fields = &self.fields;
        let entry = |field: Field| (field.label(), fields.display(field).to_string());

        vec![
            DetailSection {
                title: "Message Info",
                entries: vec![
                    ("Time", self.timestamp.format("%Y-%m-%d %H:%M:%S").to_string()),
                    (
                        "API Status",
                        (if self.dispatched { "Sent ✓" } else { "Not sent ✗" }).to_string(),
                    ),
                ],
            },
            DetailSection {
                title: "Client Data",
                entries: vec![
                    entry(Field::ClientVersion),
                    entry(Field::SessionId),
                    entry(Field::Language),
                    entry(Field::Version),
                ],
            },
            DetailSection {
                title: "System Info",
                entries: vec![entry(Field::MachineId), entry(Field::InstallationPath)],
            },
            DetailSection {
                title: "Technical Details",
                entries: vec![
                    ("Size", format!("{} bytes", self.size())),
                    (
                        "Magic Header",
                        (if self.has_magic_header() { "Present" } else { "Absent" }).to_string(),
                    ),
                ],
            },
        ]
    }
}

impl fmt::Display for MessageRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} - {}",
            self.timestamp.to_rfc3339_opts(SecondsFormat::Secs, false),
            self.fields.display(Field::ClientVersion)
        )
    }
}

/// Titled group of label/value pairs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailSection {
    pub title: &'static str,
    pub entries: Vec<(&'static str, String)>,
}

/// Wire form of a record
#[derive(Debug, Serialize)]
pub struct RecordPayload<'a> {
    pub timestamp: String,
    pub parsed_data: &'a FieldMap,
    pub hex_dump: &'a str,
    pub raw_data: String,
}
