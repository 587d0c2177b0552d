//! The Windsurf message decoder

use crate::extract::{ExtractOptions, FieldExtractor};
use crate::hexdump::hex_dump;
use crate::normalize::normalize;
use surfmon_core::{DecodePlugin, DecodedMessage, PluginInfo, RawMessage};
use tracing::debug;

/// Normalizes input, renders its hex dump and extracts fields
#[derive(Debug, Clone, Default)]
pub struct WindsurfDecoder {
    extractor: FieldExtractor,
}

impl WindsurfDecoder {
    pub fn new(options: ExtractOptions) -> Self {
        Self {
            extractor: FieldExtractor::new(options),
        }
    }
}

impl PluginInfo for WindsurfDecoder {
    fn name(&self) -> &str {
        "windsurf"
    }

    fn description(&self) -> &str {
        "Decodes Windsurf client messages"
    }
}

impl DecodePlugin for WindsurfDecoder {
    fn decode(&self, raw: RawMessage) -> DecodedMessage {
        let bytes = normalize(raw);
        let hex_dump = hex_dump(&bytes, 0);
        let fields = self.extractor.extract_bytes(&bytes);

        debug!(size = bytes.len(), fields = fields.len(), "Decoded message");

        DecodedMessage {
            bytes,
            hex_dump,
            fields,
        }
    }
}
