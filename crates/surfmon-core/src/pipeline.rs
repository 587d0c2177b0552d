//! Ingestion pipeline - normalize, extract, persist, dispatch, record
//!
//! One call to [`Pipeline::ingest`] is one unit of work. Concurrent callers
//! are serialized so messages are processed one at a time in arrival order.
//! The history lock is only taken for the final append, never while a sink
//! or the dispatcher is awaited.

use crate::history::HistoryStore;
use crate::plugins::{DecodePlugin, ExportPlugin};
use crate::record::{MessageRecord, RawMessage};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// The message ingestion pipeline
pub struct Pipeline {
    /// Decoder producing bytes, hex dump and fields
    decoder: Box<dyn DecodePlugin>,

    /// Persistence sinks, run before dispatch
    sinks: Vec<Box<dyn ExportPlugin>>,

    /// Outbound forwarder; success marks the record dispatched
    dispatcher: Option<Box<dyn ExportPlugin>>,

    /// Shared record history
    history: Arc<HistoryStore>,

    /// Serializes units of work
    ingest_lock: Mutex<()>,
}

impl Pipeline {
    /// Create a new pipeline around a decoder and a history store
    pub fn new(decoder: Box<dyn DecodePlugin>, history: Arc<HistoryStore>) -> Self {
        Self {
            decoder,
            sinks: Vec::new(),
            dispatcher: None,
            history,
            ingest_lock: Mutex::new(()),
        }
    }

    /// Add a persistence sink
    pub fn add_sink(&mut self, sink: Box<dyn ExportPlugin>) {
        info!("Added sink: {} v{}", sink.name(), sink.version());
        self.sinks.push(sink);
    }

    /// Set the outbound dispatcher
    pub fn set_dispatcher(&mut self, dispatcher: Box<dyn ExportPlugin>) {
        info!(
            "Dispatcher set: {} v{} (enabled: {})",
            dispatcher.name(),
            dispatcher.version(),
            dispatcher.is_enabled()
        );
        self.dispatcher = Some(dispatcher);
    }

    /// The shared history this pipeline appends to
    pub fn history(&self) -> &Arc<HistoryStore> {
        &self.history
    }

    /// Run one message through the pipeline.
    ///
    /// Never fails: persistence and dispatch errors are logged and the record
    /// is still appended to history.
    pub async fn ingest(&self, raw: RawMessage) -> Arc<MessageRecord> {
        let _guard = self.ingest_lock.lock().await;

        let decoded = self.decoder.decode(raw);
        let mut record = MessageRecord::new(decoded);
        debug!(
            size = record.size(),
            fields = record.fields().len(),
            decoder = self.decoder.name(),
            "Decoded message"
        );
        if let Some(err) = record.fields().error() {
            warn!(error = %err, "Field extraction failed");
        }

        for sink in &self.sinks {
            if let Err(e) = sink.export(&record).await {
                error!(sink = sink.name(), error = %e, "Failed to persist record");
            }
        }

        if let Some(dispatcher) = self.dispatcher.as_ref().filter(|d| d.is_enabled()) {
            match dispatcher.export(&record).await {
                Ok(()) => record.mark_dispatched(),
                Err(e) => {
                    warn!(dispatcher = dispatcher.name(), error = %e, "Failed to dispatch record")
                }
            }
        }

        let record = Arc::new(record);
        self.history.append(record.clone());
        info!("Ingested message: {}", record);
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugins::{PluginError, PluginInfo, PluginResult};
    use crate::record::{DecodedMessage, Field, FieldMap};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct EchoDecoder;

    impl PluginInfo for EchoDecoder {
        fn name(&self) -> &str {
            "echo"
        }
    }

    impl DecodePlugin for EchoDecoder {
        fn decode(&self, raw: RawMessage) -> DecodedMessage {
            let bytes = match raw {
                RawMessage::Bytes(b) => b,
                RawMessage::Text(t) => t.into_bytes(),
            };
            let mut fields = FieldMap::new();
            fields.insert(Field::SessionId, String::from_utf8_lossy(&bytes).to_string());
            DecodedMessage {
                bytes,
                hex_dump: String::new(),
                fields,
            }
        }
    }

    struct CountingExporter {
        calls: Arc<AtomicUsize>,
        fail: bool,
        enabled: bool,
    }

    impl CountingExporter {
        fn boxed(calls: &Arc<AtomicUsize>, fail: bool, enabled: bool) -> Box<dyn ExportPlugin> {
            Box::new(Self {
                calls: calls.clone(),
                fail,
                enabled,
            })
        }
    }

    impl PluginInfo for CountingExporter {
        fn name(&self) -> &str {
            "counting"
        }

        fn version(&self) -> &str {
            "test"
        }
    }

    #[async_trait]
    impl ExportPlugin for CountingExporter {
        async fn export(&self, _record: &MessageRecord) -> PluginResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(PluginError::OperationFailed("nope".into()))
            } else {
                Ok(())
            }
        }

        fn is_enabled(&self) -> bool {
            self.enabled
        }
    }

    fn pipeline(max_history: usize) -> Pipeline {
        Pipeline::new(Box::new(EchoDecoder), Arc::new(HistoryStore::new(max_history)))
    }

    #[test]
    fn test_plugin_version_defaults_to_crate_version() {
        assert_eq!(EchoDecoder.version(), env!("CARGO_PKG_VERSION"));
        let calls = Arc::new(AtomicUsize::new(0));
        assert_eq!(CountingExporter::boxed(&calls, false, true).version(), "test");
    }

    #[tokio::test]
    async fn test_ingest_appends_in_order() {
        let pipeline = pipeline(10);
        for msg in ["a", "b", "c"] {
            pipeline.ingest(msg.into()).await;
        }

        let ids: Vec<String> = pipeline
            .history()
            .recent(10)
            .iter()
            .map(|r| r.fields().display(Field::SessionId).to_string())
            .collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_failing_sink_does_not_abort_ingestion() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut pipeline = pipeline(10);
        pipeline.add_sink(CountingExporter::boxed(&calls, true, true));

        let record = pipeline.ingest("x".into()).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!record.is_dispatched());
        assert_eq!(pipeline.history().len(), 1);
    }

    #[tokio::test]
    async fn test_record_is_forwarded_after_persistence_failure() {
        let sink_calls = Arc::new(AtomicUsize::new(0));
        let dispatch_calls = Arc::new(AtomicUsize::new(0));
        let mut pipeline = pipeline(10);
        pipeline.add_sink(CountingExporter::boxed(&sink_calls, true, true));
        pipeline.set_dispatcher(CountingExporter::boxed(&dispatch_calls, false, true));

        let record = pipeline.ingest("x".into()).await;
        assert_eq!(sink_calls.load(Ordering::SeqCst), 1);
        assert_eq!(dispatch_calls.load(Ordering::SeqCst), 1);
        assert!(record.is_dispatched());
        assert!(pipeline.history().latest().unwrap().is_dispatched());
    }

    #[tokio::test]
    async fn test_successful_dispatch_marks_record() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut pipeline = pipeline(10);
        pipeline.set_dispatcher(CountingExporter::boxed(&calls, false, true));

        let record = pipeline.ingest("x".into()).await;
        assert!(record.is_dispatched());
        assert!(pipeline.history().latest().unwrap().is_dispatched());
    }

    #[tokio::test]
    async fn test_failed_dispatch_leaves_record_unsent() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut pipeline = pipeline(10);
        pipeline.set_dispatcher(CountingExporter::boxed(&calls, true, true));

        let record = pipeline.ingest("x".into()).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!record.is_dispatched());
        assert_eq!(pipeline.history().len(), 1);
    }

    #[tokio::test]
    async fn test_disabled_dispatcher_is_skipped() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut pipeline = pipeline(10);
        pipeline.set_dispatcher(CountingExporter::boxed(&calls, false, false));

        let record = pipeline.ingest("x".into()).await;
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(!record.is_dispatched());
    }

    #[tokio::test]
    async fn test_empty_message_is_still_recorded() {
        let pipeline = pipeline(10);
        let record = pipeline.ingest(RawMessage::Bytes(Vec::new())).await;
        assert_eq!(record.size(), 0);
        assert_eq!(pipeline.history().len(), 1);
    }

    #[tokio::test]
    async fn test_history_bound_holds_through_pipeline() {
        let pipeline = pipeline(3);
        for n in 0..10 {
            pipeline.ingest(n.to_string().into()).await;
        }
        assert_eq!(pipeline.history().len(), 3);
        assert_eq!(
            pipeline.history().latest().unwrap().fields().get(Field::SessionId),
            Some("9")
        );
    }
}
