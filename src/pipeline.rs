//! Minimal pipeline driver.
//!
//! Builds the configured tools, feeds them alerts one at a time and shuts
//! them down. Policy: a tool whose `process` returns an error is disabled
//! for the rest of the run; `Delivery::Dropped` is only counted.

use anyhow::Context;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, error, info, warn};

use crate::alert::{Alert, AlertFields};
use crate::config::{Config, Secret};
use crate::splunk::tool::ToSplunk;
use crate::syslog::ToSyslog;
use crate::tool::{Delivery, Tool};

/// Per-tool counters for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolReport {
    /// Tool name.
    pub name: String,
    /// Messages delivered.
    pub sent: u64,
    /// Messages the tool failed to send but recovered from.
    pub dropped: u64,
    /// Alerts skipped because the tool was disabled.
    pub skipped: u64,
    /// Disable reason at the time of the report.
    pub disabled: Option<String>,
}

/// Summary of a pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Alerts fed to the tools.
    pub alerts: u64,
    /// Alert lines that could not be parsed.
    pub malformed: u64,
    /// One entry per tool, in configuration order.
    pub tools: Vec<ToolReport>,
}

struct Entry {
    tool: Box<dyn Tool>,
    dropped: u64,
    skipped: u64,
}

/// Drives a set of tools.
pub struct Pipeline {
    entries: Vec<Entry>,
    alerts: u64,
    malformed: u64,
}

impl Pipeline {
    /// Wrap already-built tools.
    pub fn new(tools: Vec<Box<dyn Tool>>) -> Self {
        Self {
            entries: tools
                .into_iter()
                .map(|tool| Entry {
                    tool,
                    dropped: 0,
                    skipped: 0,
                })
                .collect(),
            alerts: 0,
            malformed: 0,
        }
    }

    /// Build every tool declared in the configuration.
    ///
    /// Splunk login failures and TCP connect failures leave the affected
    /// tool disabled; they do not fail the whole pipeline.
    ///
    /// # Errors
    ///
    /// Returns an error when an enabled Splunk tool has no resolvable
    /// password or its HTTP client cannot be built.
    pub async fn from_config(config: &Config) -> anyhow::Result<Self> {
        let mut tools: Vec<Box<dyn Tool>> = Vec::new();

        for splunk in &config.splunk {
            let password = if splunk.enabled {
                splunk.resolve_password()?
            } else {
                Secret::default()
            };
            let tool = ToSplunk::connect(splunk, password)
                .await
                .with_context(|| format!("failed to build splunk tool {:?}", splunk.name))?;
            tools.push(Box::new(tool));
        }

        for syslog in &config.syslog {
            tools.push(Box::new(ToSyslog::connect(syslog.clone()).await));
        }

        Ok(Self::new(tools))
    }

    /// Names of all tools, in order.
    pub fn tool_names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.tool.name()).collect()
    }

    /// Call `initialize` on every enabled tool, disabling those that fail.
    pub async fn initialize(&mut self) {
        for entry in &mut self.entries {
            if !entry.tool.is_enabled() {
                continue;
            }
            if let Err(e) = entry.tool.initialize().await {
                error!(tool = %entry.tool.name(), error = %e, "tool failed to initialize, disabling");
                entry.tool.disable(e.to_string());
            }
        }
    }

    /// Feed one alert to every tool.
    pub async fn process(&mut self, alert: &dyn AlertFields) {
        self.alerts = self.alerts.saturating_add(1);

        for entry in &mut self.entries {
            match entry.tool.process(alert).await {
                Ok(Delivery::Sent) => {}
                Ok(Delivery::Skipped) => entry.skipped = entry.skipped.saturating_add(1),
                Ok(Delivery::Dropped { reason }) => {
                    debug!(tool = %entry.tool.name(), reason = %reason, "message dropped");
                    entry.dropped = entry.dropped.saturating_add(1);
                }
                Err(e) => {
                    error!(tool = %entry.tool.name(), error = %e, "tool failed, disabling");
                    entry.tool.disable(e.to_string());
                }
            }
        }
    }

    /// Read JSON-lines alerts until EOF and feed each to the tools.
    ///
    /// Blank lines are ignored; malformed lines are logged and counted.
    ///
    /// # Errors
    ///
    /// Returns an error only when reading from `reader` fails.
    pub async fn run_lines<R>(&mut self, reader: R) -> anyhow::Result<()>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = reader.lines();
        let mut line_no: u64 = 0;
        while let Some(line) = lines.next_line().await.context("failed to read alerts")? {
            line_no = line_no.saturating_add(1);
            if line.trim().is_empty() {
                continue;
            }
            match Alert::from_json_line(&line) {
                Ok(alert) => self.process(&alert).await,
                Err(e) => {
                    warn!(line = line_no, error = %e, "skipping malformed alert");
                    self.malformed = self.malformed.saturating_add(1);
                }
            }
        }
        Ok(())
    }

    /// Snapshot of the counters so far.
    pub fn report(&self) -> RunReport {
        RunReport {
            alerts: self.alerts,
            malformed: self.malformed,
            tools: self
                .entries
                .iter()
                .map(|e| ToolReport {
                    name: e.tool.name().to_owned(),
                    sent: e.tool.messages_sent(),
                    dropped: e.dropped,
                    skipped: e.skipped,
                    disabled: e.tool.disabled_reason().map(str::to_owned),
                })
                .collect(),
        }
    }

    /// Commit and clean up every tool, consuming the pipeline.
    pub async fn shutdown(mut self) -> RunReport {
        for entry in &mut self.entries {
            if entry.tool.is_enabled() {
                if let Err(e) = entry.tool.commit().await {
                    warn!(tool = %entry.tool.name(), error = %e, "tool commit failed");
                }
            }
        }

        // Report before cleanup so reasons reflect the run, not the close.
        let report = self.report();
        for entry in &mut self.entries {
            entry.tool.cleanup().await;
        }

        info!(
            alerts = report.alerts,
            malformed = report.malformed,
            tools = report.tools.len(),
            "pipeline finished"
        );
        report
    }
}
