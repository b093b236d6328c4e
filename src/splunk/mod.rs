//! Splunk HTTP delivery.
//!
//! - [`client::SplunkClient`] — session handling and the REST calls
//! - [`session`] — session key parsing and staleness tracking
//! - [`tool::ToSplunk`] — the pipeline tool wrapping a client

use regex::Regex;

pub mod client;
pub mod session;
pub mod tool;

/// Login endpoint, relative to the base URL.
pub const AUTH_SERVICE: &str = "/services/auth/login/";

/// Streaming receiver endpoint, relative to the base URL.
pub const STREAM_SERVICE: &str = "/services/receivers/stream/";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors returned by the Splunk client.
#[derive(Debug, thiserror::Error)]
pub enum SplunkError {
    /// HTTP transport failure (connect, timeout, TLS).
    #[error("splunk request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// Splunk responded with a non-success status.
    #[error("splunk returned non-success status {status}: {body}")]
    HttpStatus {
        /// HTTP status code.
        status: u16,
        /// Sanitized response body.
        body: String,
    },
    /// Login succeeded but no session key could be read from the body.
    #[error("splunk login response carried no session key: {0}")]
    SessionKey(String),
    /// The configured host and port do not form a valid URL.
    #[error("invalid splunk url: {0}")]
    Url(#[from] url::ParseError),
}

impl SplunkError {
    /// Whether Splunk rejected the credentials or the session key.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::HttpStatus { status: 401, .. })
    }
}

// ---------------------------------------------------------------------------
// Stream target
// ---------------------------------------------------------------------------

/// `source`, `sourcetype` and `index` attached to streamed events.
///
/// As defaults every field is optional; unset fields are left off the
/// request and Splunk applies its own defaults. As an override, unset fields
/// fall back to the client defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamTarget {
    /// Event source.
    pub source: Option<String>,
    /// Event sourcetype.
    pub sourcetype: Option<String>,
    /// Destination index.
    pub index: Option<String>,
}

impl StreamTarget {
    /// Target with only `source` set.
    pub fn source(source: impl Into<String>) -> Self {
        Self {
            source: Some(source.into()),
            ..Self::default()
        }
    }

    /// Fields of `self`, with `other` filling any gaps.
    pub fn or(&self, other: &Self) -> Self {
        Self {
            source: self.source.clone().or_else(|| other.source.clone()),
            sourcetype: self.sourcetype.clone().or_else(|| other.sourcetype.clone()),
            index: self.index.clone().or_else(|| other.index.clone()),
        }
    }

    /// Query pairs in wire order, skipping unset fields.
    pub fn query_pairs(&self) -> Vec<(&'static str, &str)> {
        [
            ("source", self.source.as_deref()),
            ("sourcetype", self.sourcetype.as_deref()),
            ("index", self.index.as_deref()),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.map(|v| (key, v)))
        .collect()
    }
}

// ---------------------------------------------------------------------------
// HTTP helpers
// ---------------------------------------------------------------------------

/// Check HTTP response status and return body text or a structured error.
///
/// # Errors
///
/// Returns `SplunkError::Request` on transport failure, `SplunkError::HttpStatus` on non-2xx.
pub async fn check_http_response(response: reqwest::Response) -> Result<String, SplunkError> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(SplunkError::HttpStatus {
            status: status.as_u16(),
            body: sanitize_http_error_body(&body),
        });
    }
    Ok(body)
}

fn sanitize_http_error_body(raw: &str) -> String {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");

    let mut sanitized = collapsed;
    for pattern in [
        r"(?i)<sessionKey>[^<]*</sessionKey>",
        r"Splunk [A-Za-z0-9_^\-]{16,}",
    ] {
        if let Ok(regex) = Regex::new(pattern) {
            sanitized = regex.replace_all(&sanitized, "[REDACTED]").into_owned();
        }
    }

    const MAX_ERROR_BODY_CHARS: usize = 256;
    if sanitized.chars().count() > MAX_ERROR_BODY_CHARS {
        let shortened = sanitized
            .chars()
            .take(MAX_ERROR_BODY_CHARS)
            .collect::<String>();
        return format!("{shortened}...[truncated]");
    }

    sanitized
}
