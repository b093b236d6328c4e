//! lqmt-forward — output tools for the LQMT alert pipeline.
//!
//! Two independent tools forward alerts to external collectors:
//! - [`splunk::tool::ToSplunk`] posts `key=value` lines to Splunk's REST API
//! - [`syslog::ToSyslog`] writes `field="value"` lines to a TCP or UDP socket
//!
//! Both implement [`tool::Tool`] and are driven by [`pipeline::Pipeline`].
//!
//! See `DESIGN.md` for the architecture notes.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod alert;
pub mod config;
pub mod format;
pub mod logging;

pub mod splunk;
pub mod syslog;
pub mod tool;

pub mod pipeline;
