//! Message formatting for the forwarding tools.
//!
//! Both formats are plain text lines. Values are written as-is: embedded
//! quotes, spaces and control characters are not escaped, so collectors
//! that split on whitespace or quotes can mis-parse hostile values.

use chrono::{DateTime, TimeZone};

use crate::alert::AlertFields;

/// Marker inserted between the timestamp and the fields of HTTP messages.
pub const HTTP_MARKER: &str = "LQMT:";

/// `asctime`-style timestamp, e.g. `Thu Oct 15 14:19:00 2026`.
const ASCTIME_FORMAT: &str = "%a %b %e %H:%M:%S %Y";

/// Format an alert as `"<timestamp> LQMT: k1=v1 k2=v2"` for the Splunk tool.
///
/// Uses every field of the alert, empty ones included, in the alert's order.
pub fn http_message<Tz>(alert: &dyn AlertFields, now: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let mut message = format!("{} {HTTP_MARKER}", now.format(ASCTIME_FORMAT));
    for (key, value) in alert.all_fields(true) {
        message.push(' ');
        message.push_str(&key);
        message.push('=');
        message.push_str(&value);
    }
    message
}

/// Format an alert as `<head>f1="v1" f2="v2"` for the Syslog tool.
///
/// Only `fields` are written, in that order. A value already wrapped in a
/// pair of double quotes is unwrapped first so quoting never doubles.
pub fn socket_message(alert: &dyn AlertFields, fields: &[String], head: &str) -> String {
    let values = alert.fields(fields);
    let tokens: Vec<String> = fields
        .iter()
        .zip(values.iter())
        .map(|(name, value)| format!("{name}=\"{}\"", strip_quotes(value)))
        .collect();
    format!("{head}{}", tokens.join(" "))
}

/// Encode a formatted line as a newline-terminated UTF-8 frame.
pub fn frame(line: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(line.len().saturating_add(1));
    bytes.extend_from_slice(line.as_bytes());
    bytes.push(b'\n');
    bytes
}

fn strip_quotes(value: &str) -> &str {
    if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        value
            .strip_prefix('"')
            .and_then(|v| v.strip_suffix('"'))
            .unwrap_or(value)
    } else {
        value
    }
}
