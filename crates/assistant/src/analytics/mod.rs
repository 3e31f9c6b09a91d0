//! Fire-and-forget analytics events.
//!
//! Events never block a request: the pipeline hands them to
//! [`record_detached`], which spawns the send and only logs failures.

mod klaviyo;

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{info, warn};

pub use klaviyo::KlaviyoSink;

/// Errors that can occur when recording an event.
#[derive(Debug, Error)]
pub enum AnalyticsError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Sink could not be set up.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Destination for analytics events.
#[async_trait]
pub trait AnalyticsSink: Send + Sync {
    async fn record(&self, event: &str, properties: Value) -> Result<(), AnalyticsError>;
}

/// Spawn an event send without waiting for it.
pub fn record_detached(
    sink: &Arc<dyn AnalyticsSink>,
    event: &'static str,
    properties: Value,
) -> JoinHandle<()> {
    let sink = Arc::clone(sink);
    tokio::spawn(async move {
        if let Err(e) = sink.record(event, properties).await {
            warn!(error = %e, event, "Analytics event dropped");
        }
    })
}

/// Writes events to the log. Used when no analytics backend is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

#[async_trait]
impl AnalyticsSink for TracingSink {
    async fn record(&self, event: &str, properties: Value) -> Result<(), AnalyticsError> {
        info!(event, %properties, "analytics event");
        Ok(())
    }
}

/// Keeps events in memory for inspection.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<(String, Value)>>,
}

impl MemorySink {
    /// Every recorded event, oldest first.
    #[must_use]
    pub fn events(&self) -> Vec<(String, Value)> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Names of recorded events, oldest first.
    #[must_use]
    pub fn event_names(&self) -> Vec<String> {
        self.events().into_iter().map(|(name, _)| name).collect()
    }
}

#[async_trait]
impl AnalyticsSink for MemorySink {
    async fn record(&self, event: &str, properties: Value) -> Result<(), AnalyticsError> {
        if let Ok(mut events) = self.events.lock() {
            events.push((event.to_string(), properties));
        }
        Ok(())
    }
}
