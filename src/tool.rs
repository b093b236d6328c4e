//! The interface every forwarding tool implements.
//!
//! The pipeline drives a tool through `initialize` → `process`* → `commit`
//! → `cleanup`, sequentially. A tool that returns an error from `process`
//! is disabled by the driver; errors a tool recovers from locally surface
//! as [`Delivery::Dropped`] instead.

use async_trait::async_trait;

use crate::alert::AlertFields;
use crate::splunk::SplunkError;

/// Outcome of a single `process` call that did not fail outright.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// The message reached the transport.
    Sent,
    /// The tool is disabled and did nothing.
    Skipped,
    /// Sending failed; the tool logged it and stays enabled.
    Dropped {
        /// Error text from the failed send.
        reason: String,
    },
}

/// Errors a tool hands back to the driver.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// Splunk login or delivery failed.
    #[error(transparent)]
    Splunk(#[from] SplunkError),
}

/// A pipeline output tool.
#[async_trait]
pub trait Tool: Send {
    /// Configured tool name.
    fn name(&self) -> &str;

    /// Why the tool is disabled, or `None` while it is enabled.
    fn disabled_reason(&self) -> Option<&str>;

    /// Whether the tool still processes alerts.
    fn is_enabled(&self) -> bool {
        self.disabled_reason().is_none()
    }

    /// Stop processing alerts for the rest of the tool's life.
    fn disable(&mut self, reason: String);

    /// Messages delivered so far.
    fn messages_sent(&self) -> u64;

    /// Called once before the first alert.
    ///
    /// # Errors
    ///
    /// Returns an error when the tool cannot get ready to deliver.
    async fn initialize(&mut self) -> Result<(), ToolError> {
        Ok(())
    }

    /// Deliver one alert.
    ///
    /// # Errors
    ///
    /// Returns an error for failures the tool does not recover from itself.
    async fn process(&mut self, alert: &dyn AlertFields) -> Result<Delivery, ToolError>;

    /// Called once after the last alert of a run.
    ///
    /// # Errors
    ///
    /// Returns an error when buffered work cannot be flushed.
    async fn commit(&mut self) -> Result<(), ToolError> {
        Ok(())
    }

    /// Release connections and report totals. Called exactly once.
    async fn cleanup(&mut self);
}
