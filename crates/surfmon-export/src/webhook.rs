//! Webhook dispatcher
//!
//! Forwards records to the configured endpoint as a single JSON POST. There
//! is no batching and no retry: a failed forward is logged and the record
//! stays marked as not sent.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use surfmon_core::{
    ApiSettings, ExportPlugin, MessageRecord, PluginError, PluginInfo, PluginResult, SURFMON_VERSION,
};
use thiserror::Error;
use tracing::{debug, warn};

/// Why a record was not forwarded
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Forwarding is disabled")]
    Disabled,

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Endpoint returned {status}: {body}")]
    Status { status: StatusCode, body: String },
}

/// Forwards records over HTTP
pub struct WebhookDispatcher {
    settings: ApiSettings,
    client: Client,
}

impl WebhookDispatcher {
    /// Build a dispatcher and its HTTP client from the API settings
    pub fn new(settings: ApiSettings) -> PluginResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .user_agent(format!("surfmon/{}", SURFMON_VERSION))
            .build()
            .map_err(|e| {
                PluginError::InitializationFailed(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self { settings, client })
    }

    /// Forward a record, reporting why it failed
    pub async fn try_send(&self, record: &MessageRecord) -> Result<(), DispatchError> {
        if !self.settings.enabled {
            return Err(DispatchError::Disabled);
        }

        let mut request = self.client.post(&self.settings.endpoint);
        for (key, value) in &self.settings.headers {
            request = request.header(key.as_str(), value.as_str());
        }
        // A configured Authorization header takes precedence over the key
        let has_authorization = self
            .settings
            .headers
            .keys()
            .any(|key| key.eq_ignore_ascii_case("authorization"));
        if !self.settings.api_key.is_empty() && !has_authorization {
            request = request.bearer_auth(&self.settings.api_key);
        }

        let response = request.json(&record.payload()).send().await?;
        let status = response.status();
        if status.is_success() {
            debug!(%status, endpoint = %self.settings.endpoint, "Record forwarded");
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(DispatchError::Status { status, body })
        }
    }

    /// Forward a record. Failures are logged, never raised.
    pub async fn send(&self, record: &MessageRecord) -> bool {
        match self.try_send(record).await {
            Ok(()) => true,
            Err(DispatchError::Disabled) => {
                debug!("Forwarding disabled, record not sent");
                false
            }
            Err(e) => {
                warn!(endpoint = %self.settings.endpoint, "Failed to forward record: {}", e);
                false
            }
        }
    }
}

impl PluginInfo for WebhookDispatcher {
    fn name(&self) -> &str {
        "webhook"
    }

    fn description(&self) -> &str {
        "Forwards records to an HTTP endpoint"
    }
}

#[async_trait]
impl ExportPlugin for WebhookDispatcher {
    async fn export(&self, record: &MessageRecord) -> PluginResult<()> {
        self.try_send(record).await.map_err(|e| match e {
            DispatchError::Disabled => PluginError::Disabled,
            other => PluginError::OperationFailed(other.to_string()),
        })
    }

    fn is_enabled(&self) -> bool {
        self.settings.enabled
    }
}
