//! Splunk session keys.
//!
//! Login returns `<response><sessionKey>KEY</sessionKey></response>`; the
//! key is the text of the first child element of the root. Splunk expires
//! idle sessions server-side, so a session also remembers when it was
//! obtained and reports itself stale after a configured TTL.

use std::time::{Duration, Instant};

use quick_xml::events::Event;
use quick_xml::Reader;

use super::SplunkError;

/// Authentication state of a client.
#[derive(Clone, Default)]
pub enum Session {
    /// No usable session key.
    #[default]
    Unauthenticated,
    /// A session key is held.
    Authenticated {
        /// Ready-to-send `Authorization` header value (`Splunk KEY`).
        header: String,
        /// When the key was obtained.
        obtained_at: Instant,
    },
}

impl Session {
    /// Wrap a fresh session key.
    pub fn from_key(key: &str) -> Self {
        Self::Authenticated {
            header: format!("Splunk {key}"),
            obtained_at: Instant::now(),
        }
    }

    /// The `Authorization` header value, if the session holds a key.
    pub fn header(&self) -> Option<&str> {
        match self {
            Self::Unauthenticated => None,
            Self::Authenticated { header, .. } => Some(header),
        }
    }

    /// Whether a key is held and younger than `ttl`.
    pub fn is_valid(&self, ttl: Duration) -> bool {
        match self {
            Self::Unauthenticated => false,
            Self::Authenticated { obtained_at, .. } => obtained_at.elapsed() < ttl,
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unauthenticated => f.write_str("Unauthenticated"),
            Self::Authenticated { obtained_at, .. } => f
                .debug_struct("Authenticated")
                .field("header", &"[REDACTED]")
                .field("obtained_at", obtained_at)
                .finish(),
        }
    }
}

/// Extract the session key from a login response body.
///
/// # Errors
///
/// Returns `SplunkError::SessionKey` when the body is not XML, has no child
/// element under the root, or the child is empty.
pub fn parse_session_key(body: &str) -> Result<String, SplunkError> {
    let mut reader = Reader::from_str(body);
    reader.config_mut().trim_text(true);

    let mut depth: usize = 0;
    let mut in_first_child = false;
    let mut key = String::new();

    loop {
        match reader.read_event() {
            // Only the text before the first nested element counts.
            Ok(Event::Start(_) | Event::Empty(_)) if in_first_child => break,
            Ok(Event::Start(_)) => {
                depth = depth.saturating_add(1);
                if depth == 2 {
                    in_first_child = true;
                }
            }
            Ok(Event::Empty(_)) if depth == 1 => {
                return Err(SplunkError::SessionKey("first element is empty".to_owned()));
            }
            Ok(Event::Text(text)) if in_first_child && depth == 2 => {
                let unescaped = text
                    .unescape()
                    .map_err(|e| SplunkError::SessionKey(format!("bad XML text: {e}")))?;
                key.push_str(unescaped.trim());
            }
            Ok(Event::CData(data)) if in_first_child && depth == 2 => {
                key.push_str(String::from_utf8_lossy(&data).trim());
            }
            Ok(Event::End(_)) => {
                if in_first_child && depth == 2 {
                    break;
                }
                depth = depth.saturating_sub(1);
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(SplunkError::SessionKey(format!("invalid XML: {e}"))),
        }
    }

    if key.is_empty() {
        return Err(SplunkError::SessionKey(
            "no text in first element".to_owned(),
        ));
    }
    Ok(key)
}
