//! Configuration loading and validation.
//!
//! One TOML file declares the logging options plus any number of Splunk and
//! Syslog tools:
//! - `[logging]` — debug flag and optional JSON log directory
//! - `[[splunk]]` — one table per Splunk HTTP tool
//! - `[[syslog]]` — one table per Syslog socket tool

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

/// Top-level configuration file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Logging options.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Splunk HTTP tools.
    #[serde(default)]
    pub splunk: Vec<SplunkConfig>,

    /// Syslog socket tools.
    #[serde(default)]
    pub syslog: Vec<SyslogConfig>,
}

/// Logging options.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingConfig {
    /// Enable debug-level output and full error detail.
    #[serde(default)]
    pub debug: bool,

    /// Directory for daily-rotated JSON logs. Stderr only when unset.
    #[serde(default)]
    pub logs_dir: Option<PathBuf>,
}

/// A string that never shows up in `Debug` output.
#[derive(Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    /// Wrap a secret value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The underlying value.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

/// Splunk HTTP tool settings.
#[derive(Debug, Clone, Deserialize)]
pub struct SplunkConfig {
    /// Tool name used in logs and reports.
    pub name: String,

    /// Whether the tool takes part in the run.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Base URL including scheme, e.g. `https://splunk.example.com`.
    pub host: String,

    /// Management port of the Splunk REST API.
    #[serde(default = "default_splunk_port")]
    pub port: u16,

    /// Login user name.
    pub username: String,

    /// Inline password. Prefer `password_env`.
    #[serde(default)]
    pub password: Option<Secret>,

    /// Environment variable holding the password.
    #[serde(default)]
    pub password_env: Option<String>,

    /// Verify the server's TLS certificate.
    #[serde(default = "default_true")]
    pub cert_check: bool,

    /// Default `source` for streamed events.
    #[serde(default)]
    pub source: Option<String>,

    /// Default `sourcetype` for streamed events.
    #[serde(default)]
    pub sourcetype: Option<String>,

    /// Default `index` for streamed events.
    #[serde(default)]
    pub index: Option<String>,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Age after which the session key is renewed before the next send.
    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: u64,
}

impl SplunkConfig {
    /// `host:port`, the root all REST endpoints hang off.
    pub fn base_url(&self) -> String {
        format!("{}:{}", self.host.trim_end_matches('/'), self.port)
    }

    /// Resolve the password from `password_env` or the inline value.
    ///
    /// # Errors
    ///
    /// Returns an error when neither source yields a password.
    pub fn resolve_password(&self) -> anyhow::Result<Secret> {
        self.resolve_password_with(|key| std::env::var(key).ok())
    }

    /// Resolve the password using the supplied environment lookup.
    ///
    /// The environment variable wins over the inline value when both exist.
    ///
    /// # Errors
    ///
    /// Returns an error when neither source yields a password.
    pub fn resolve_password_with(
        &self,
        env: impl Fn(&str) -> Option<String>,
    ) -> anyhow::Result<Secret> {
        if let Some(var) = &self.password_env {
            if let Some(value) = env(var) {
                return Ok(Secret::new(value));
            }
        }
        self.password.clone().ok_or_else(|| match &self.password_env {
            Some(var) => anyhow::anyhow!(
                "splunk tool {:?}: environment variable {var} is not set",
                self.name
            ),
            None => anyhow::anyhow!("splunk tool {:?}: no password configured", self.name),
        })
    }
}

/// Transport used by a Syslog tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(try_from = "String")]
pub enum Protocol {
    /// Persistent stream connection.
    Tcp,
    /// Connectionless datagrams.
    #[default]
    Udp,
}

impl TryFrom<String> for Protocol {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.to_ascii_lowercase().as_str() {
            "tcp" => Ok(Self::Tcp),
            "udp" => Ok(Self::Udp),
            _ => Err(format!("unknown protocol {value:?}, expected \"tcp\" or \"udp\"")),
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tcp => f.write_str("tcp"),
            Self::Udp => f.write_str("udp"),
        }
    }
}

/// Syslog socket tool settings.
#[derive(Debug, Clone, Deserialize)]
pub struct SyslogConfig {
    /// Tool name used in logs and reports.
    pub name: String,

    /// Whether the tool takes part in the run.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Collector host name or address.
    pub host: String,

    /// Collector port.
    #[serde(default = "default_syslog_port")]
    pub port: u16,

    /// `tcp` or `udp`, case-insensitive.
    #[serde(default)]
    pub protocol: Protocol,

    /// Prefix written verbatim before the fields of every message.
    #[serde(default)]
    pub message_head: String,

    /// Alert fields to forward, in output order.
    pub message_fields: Vec<String>,

    /// TCP connect timeout in seconds.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

// Default value functions for serde

fn default_true() -> bool {
    true
}
fn default_splunk_port() -> u16 {
    8089
}
fn default_syslog_port() -> u16 {
    514
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_session_ttl_secs() -> u64 {
    3000
}
fn default_connect_timeout_secs() -> u64 {
    10
}

impl Config {
    /// Parse a configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid TOML for this schema.
    pub fn from_toml(toml_str: &str) -> anyhow::Result<Self> {
        toml::from_str(toml_str).context("invalid configuration")
    }

    /// Check cross-field constraints serde cannot express, resolving
    /// `password_env` from the process environment.
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.validate_with(|key| std::env::var(key).ok())
    }

    /// Check cross-field constraints using the supplied environment lookup.
    ///
    /// Disabled tools are checked for shape too, so flipping `enabled` never
    /// turns a file invalid. Only enabled Splunk tools need a password that
    /// actually resolves.
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate_with(&self, env: impl Fn(&str) -> Option<String>) -> anyhow::Result<()> {
        let mut names = HashSet::new();

        for tool in &self.splunk {
            check_common("splunk", &tool.name, &tool.host, tool.port)?;
            if !names.insert(tool.name.as_str()) {
                anyhow::bail!("duplicate tool name {:?}", tool.name);
            }
            check_splunk_host(tool)?;
            if tool.password.is_none() && tool.password_env.is_none() {
                anyhow::bail!(
                    "splunk tool {:?}: set either password or password_env",
                    tool.name
                );
            }
            if tool.enabled {
                tool.resolve_password_with(&env)?;
            }
            if tool.timeout_secs == 0 {
                anyhow::bail!("splunk tool {:?}: timeout_secs must be > 0", tool.name);
            }
        }

        for tool in &self.syslog {
            check_common("syslog", &tool.name, &tool.host, tool.port)?;
            if !names.insert(tool.name.as_str()) {
                anyhow::bail!("duplicate tool name {:?}", tool.name);
            }
            if tool.message_fields.is_empty() {
                anyhow::bail!("syslog tool {:?}: message_fields is empty", tool.name);
            }
        }

        Ok(())
    }
}

/// `host` must be a bare `scheme://name`; the port comes from `port`.
fn check_splunk_host(tool: &SplunkConfig) -> anyhow::Result<()> {
    let url = url::Url::parse(&tool.host)
        .with_context(|| format!("splunk tool {:?}: host is not a valid URL", tool.name))?;
    if !matches!(url.scheme(), "http" | "https") {
        anyhow::bail!(
            "splunk tool {:?}: host must start with http:// or https://",
            tool.name
        );
    }
    if url.port().is_some() {
        anyhow::bail!(
            "splunk tool {:?}: put the port in `port`, not in host",
            tool.name
        );
    }
    if url.path() != "/" || url.query().is_some() || url.fragment().is_some() {
        anyhow::bail!(
            "splunk tool {:?}: host must not carry a path, query or fragment",
            tool.name
        );
    }
    url::Url::parse(&tool.base_url())
        .with_context(|| format!("splunk tool {:?}: invalid base URL", tool.name))?;
    Ok(())
}

fn check_common(kind: &str, name: &str, host: &str, port: u16) -> anyhow::Result<()> {
    if name.trim().is_empty() {
        anyhow::bail!("{kind} tool with empty name");
    }
    if host.trim().is_empty() {
        anyhow::bail!("{kind} tool {name:?}: host is empty");
    }
    if port == 0 {
        anyhow::bail!("{kind} tool {name:?}: port must be non-zero");
    }
    Ok(())
}

/// Load and validate a configuration file.
///
/// # Errors
///
/// Returns an error if the file cannot be read, parsed, or validated.
pub fn load_config(path: &Path) -> anyhow::Result<Config> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config at {}", path.display()))?;
    let config = Config::from_toml(&contents)
        .with_context(|| format!("failed to parse config at {}", path.display()))?;
    config
        .validate()
        .with_context(|| format!("invalid config at {}", path.display()))?;
    Ok(config)
}
