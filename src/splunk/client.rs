//! Splunk REST client: login, streaming receiver, connection close.

use std::time::Duration;

use reqwest::header::{AUTHORIZATION, CONNECTION};
use tracing::{debug, info, warn};
use url::Url;

use super::session::{parse_session_key, Session};
use super::{check_http_response, SplunkError, StreamTarget, AUTH_SERVICE, STREAM_SERVICE};
use crate::config::{Secret, SplunkConfig};

/// Header selecting Splunk's streaming input mode.
pub const INPUT_MODE_HEADER: &str = "x-splunk-input-mode";

/// Client for one Splunk instance.
///
/// Owns its HTTP connection pool and session. Not shared: the pipeline
/// drives it one message at a time.
#[derive(Debug)]
pub struct SplunkClient {
    http: reqwest::Client,
    base_url: String,
    username: String,
    password: Secret,
    defaults: StreamTarget,
    session: Session,
    session_ttl: Duration,
    messages_sent: u64,
}

impl SplunkClient {
    /// Build an unauthenticated client from tool settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is invalid or the HTTP client
    /// cannot be built.
    pub fn new(config: &SplunkConfig, password: Secret) -> Result<Self, SplunkError> {
        let base_url = config.base_url();
        Url::parse(&base_url)?;

        let http = reqwest::Client::builder()
            .danger_accept_invalid_certs(!config.cert_check)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url,
            username: config.username.clone(),
            password,
            defaults: StreamTarget {
                source: config.source.clone(),
                sourcetype: config.sourcetype.clone(),
                index: config.index.clone(),
            },
            session: Session::Unauthenticated,
            session_ttl: Duration::from_secs(config.session_ttl_secs),
            messages_sent: 0,
        })
    }

    /// Build a client and log in straight away.
    ///
    /// # Errors
    ///
    /// Returns an error if the client cannot be built or login fails.
    pub async fn connect(config: &SplunkConfig, password: Secret) -> Result<Self, SplunkError> {
        let mut client = Self::new(config, password)?;
        client.authenticate().await?;
        Ok(client)
    }

    /// Log in unless a fresh session is already held.
    ///
    /// # Errors
    ///
    /// Returns `SplunkError::HttpStatus` when Splunk rejects the login and
    /// `SplunkError::SessionKey` when the response carries no key. The
    /// session is left untouched on error.
    pub async fn authenticate(&mut self) -> Result<(), SplunkError> {
        if self.is_authenticated() {
            return Ok(());
        }

        let url = format!("{}{AUTH_SERVICE}", self.base_url);
        let response = self
            .http
            .post(&url)
            .form(&[
                ("username", self.username.as_str()),
                ("password", self.password.expose()),
            ])
            .send()
            .await?;

        let body = check_http_response(response).await?;
        let key = parse_session_key(&body)?;
        self.session = Session::from_key(&key);

        debug!(base_url = %self.base_url, username = %self.username, "authenticated with splunk");
        Ok(())
    }

    /// Whether a session is held and still inside its TTL.
    pub fn is_authenticated(&self) -> bool {
        self.session.is_valid(self.session_ttl)
    }

    /// Drop the held session so the next call logs in again.
    pub fn invalidate_session(&mut self) {
        self.session = Session::Unauthenticated;
    }

    /// Send a message using the default stream target.
    ///
    /// # Errors
    ///
    /// See [`SplunkClient::send_message_with`].
    pub async fn send_message(&mut self, message: &str) -> Result<(), SplunkError> {
        self.send_message_with(message, &StreamTarget::default())
            .await
    }

    /// Send a message, overriding parts of the stream target for this call.
    ///
    /// Fields left unset in `target` fall back to the defaults. The defaults
    /// themselves are never changed here; use
    /// [`SplunkClient::update_defaults`] for that.
    ///
    /// # Errors
    ///
    /// Returns the login error when re-authentication fails, or the transport
    /// or status error of the send itself. A `401` also drops the session.
    pub async fn send_message_with(
        &mut self,
        message: &str,
        target: &StreamTarget,
    ) -> Result<(), SplunkError> {
        self.authenticate().await?;
        let header = self
            .session
            .header()
            .ok_or_else(|| SplunkError::SessionKey("no session after login".to_owned()))?
            .to_owned();

        let url = self.stream_url(&target.or(&self.defaults))?;
        let response = self
            .http
            .post(url)
            .header(AUTHORIZATION, header)
            .header(INPUT_MODE_HEADER, "streaming")
            .body(message.to_owned())
            .send()
            .await?;
        let status = response.status();

        if let Err(err) = check_http_response(response).await {
            if err.is_unauthorized() {
                warn!(base_url = %self.base_url, "splunk rejected the session key, will log in again");
                self.invalidate_session();
            }
            return Err(err);
        }

        self.messages_sent = self.messages_sent.saturating_add(1);
        debug!(status = status.as_u16(), "message sent to splunk");
        Ok(())
    }

    /// Permanently replace the default stream target fields that are set in
    /// `target`. Unset fields keep their current default.
    pub fn update_defaults(&mut self, target: StreamTarget) {
        self.defaults = target.or(&self.defaults);
    }

    /// Current default stream target.
    pub fn defaults(&self) -> &StreamTarget {
        &self.defaults
    }

    /// Streaming receiver URL for a target.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is not a valid URL.
    pub fn stream_url(&self, target: &StreamTarget) -> Result<Url, SplunkError> {
        let mut url = Url::parse(&format!("{}{STREAM_SERVICE}", self.base_url))?;
        let pairs = target.query_pairs();
        if !pairs.is_empty() {
            url.query_pairs_mut().extend_pairs(pairs);
        }
        Ok(url)
    }

    /// Messages accepted by Splunk so far.
    pub fn messages_sent(&self) -> u64 {
        self.messages_sent
    }

    /// Report totals and ask the server to close the connection.
    ///
    /// Best effort: failures are logged, never returned. The session is kept.
    pub async fn close(&self) {
        info!(
            base_url = %self.base_url,
            sent = self.messages_sent,
            "total messages processed by splunk"
        );

        match self
            .http
            .post(&self.base_url)
            .header(CONNECTION, "close")
            .send()
            .await
        {
            Ok(response) => debug!(status = response.status().as_u16(), "splunk close acknowledged"),
            Err(e) => debug!(error = %e, "splunk close request failed"),
        }
    }
}
