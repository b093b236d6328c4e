//! `ToSplunk`: pushes every alert to Splunk's streaming receiver.

use async_trait::async_trait;
use chrono::Local;
use tracing::{debug, error};

use super::client::SplunkClient;
use super::SplunkError;
use crate::alert::AlertFields;
use crate::config::{Secret, SplunkConfig};
use crate::format::http_message;
use crate::tool::{Delivery, Tool, ToolError};

/// Splunk forwarding tool.
#[derive(Debug)]
pub struct ToSplunk {
    name: String,
    client: SplunkClient,
    disabled: Option<String>,
    configured: bool,
}

impl ToSplunk {
    /// Build the tool and log in.
    ///
    /// A failed login does not abort construction: the tool comes back
    /// disabled with the error as its reason.
    ///
    /// # Errors
    ///
    /// Returns an error only when the client itself cannot be built
    /// (invalid URL, TLS backend failure).
    pub async fn connect(config: &SplunkConfig, password: Secret) -> Result<Self, SplunkError> {
        let client = SplunkClient::new(config, password)?;
        let mut tool = Self {
            name: config.name.clone(),
            client,
            disabled: None,
            configured: config.enabled,
        };

        if !config.enabled {
            tool.disabled = Some("disabled by configuration".to_owned());
            return Ok(tool);
        }

        if let Err(e) = tool.client.authenticate().await {
            error!(tool = %tool.name, error = %e, "unable to authenticate with splunk");
            tool.disabled = Some(e.to_string());
        }
        Ok(tool)
    }

    /// The underlying client.
    pub fn client(&self) -> &SplunkClient {
        &self.client
    }

    /// Mutable access to the underlying client, e.g. to update defaults.
    pub fn client_mut(&mut self) -> &mut SplunkClient {
        &mut self.client
    }
}

#[async_trait]
impl Tool for ToSplunk {
    fn name(&self) -> &str {
        &self.name
    }

    fn disabled_reason(&self) -> Option<&str> {
        self.disabled.as_deref()
    }

    fn disable(&mut self, reason: String) {
        self.disabled = Some(reason);
    }

    fn messages_sent(&self) -> u64 {
        self.client.messages_sent()
    }

    async fn initialize(&mut self) -> Result<(), ToolError> {
        if self.is_enabled() {
            self.client.authenticate().await?;
        }
        Ok(())
    }

    async fn process(&mut self, alert: &dyn AlertFields) -> Result<Delivery, ToolError> {
        if !self.is_enabled() {
            return Ok(Delivery::Skipped);
        }
        let message = http_message(alert, &Local::now());
        self.client.send_message(&message).await?;
        Ok(Delivery::Sent)
    }

    async fn cleanup(&mut self) {
        if !self.configured {
            debug!(tool = %self.name, "splunk tool disabled by configuration, nothing to close");
            return;
        }
        self.client.close().await;
    }
}
