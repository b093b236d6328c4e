//! `ToSyslog`: forwards alerts as text lines to a remote syslog collector.
//!
//! The socket is opened once when the tool is built. A TCP tool that cannot
//! connect is disabled for good; UDP never probes the remote end. Send
//! failures are logged and reported as [`Delivery::Dropped`], and the tool
//! keeps trying on the next alert.

use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::net::{lookup_host, TcpStream, UdpSocket};
use tracing::{debug, error, info};

use crate::alert::AlertFields;
use crate::config::{Protocol, SyslogConfig};
use crate::format::{frame, socket_message};
use crate::tool::{Delivery, Tool, ToolError};

/// Reason recorded once the socket has been closed by `cleanup`.
pub const CLOSED_REASON: &str = "closed";

/// An open socket to the collector.
#[derive(Debug)]
pub enum Link {
    /// Connected stream.
    Tcp(TcpStream),
    /// Unconnected datagram socket bound in the target's address family.
    Udp {
        /// Local socket.
        socket: UdpSocket,
        /// Collector address, resolved once at construction.
        target: SocketAddr,
    },
}

/// Whether the tool can still send.
#[derive(Debug)]
pub enum LinkState {
    /// Socket open.
    Connected(Link),
    /// Socket unavailable for the rest of the tool's life.
    Disabled {
        /// Why the tool stopped.
        reason: String,
    },
}

impl LinkState {
    /// The disable reason, or `None` while connected.
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Connected(_) => None,
            Self::Disabled { reason } => Some(reason),
        }
    }
}

/// Syslog forwarding tool.
#[derive(Debug)]
pub struct ToSyslog {
    config: SyslogConfig,
    state: LinkState,
    sent: u64,
}

impl ToSyslog {
    /// Build the tool and open its socket.
    ///
    /// Never fails: a TCP connect error (or timeout), or a UDP host that does
    /// not resolve, leaves the tool disabled with the error as its reason.
    pub async fn connect(config: SyslogConfig) -> Self {
        let state = if config.enabled {
            match open_link(&config).await {
                Ok(link) => {
                    info!(
                        tool = %config.name,
                        host = %config.host,
                        port = config.port,
                        protocol = %config.protocol,
                        "syslog tool ready"
                    );
                    LinkState::Connected(link)
                }
                Err(e) => {
                    error!(
                        tool = %config.name,
                        host = %config.host,
                        port = config.port,
                        error = %e,
                        "unable to connect to remote syslog server"
                    );
                    LinkState::Disabled {
                        reason: e.to_string(),
                    }
                }
            }
        } else {
            LinkState::Disabled {
                reason: "disabled by configuration".to_owned(),
            }
        };

        Self {
            config,
            state,
            sent: 0,
        }
    }

    /// Current socket state.
    pub fn state(&self) -> &LinkState {
        &self.state
    }

    /// Settings the tool was built from.
    pub fn config(&self) -> &SyslogConfig {
        &self.config
    }

    async fn send_frame(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        match &mut self.state {
            LinkState::Connected(Link::Tcp(stream)) => stream.write_all(bytes).await,
            LinkState::Connected(Link::Udp { socket, target }) => {
                socket.send_to(bytes, *target).await.map(|_| ())
            }
            LinkState::Disabled { .. } => Ok(()),
        }
    }
}

async fn open_link(config: &SyslogConfig) -> std::io::Result<Link> {
    match config.protocol {
        Protocol::Tcp => {
            let connect = TcpStream::connect((config.host.as_str(), config.port));
            let timeout = Duration::from_secs(config.connect_timeout_secs);
            let stream = tokio::time::timeout(timeout, connect)
                .await
                .map_err(|_| {
                    std::io::Error::new(
                        std::io::ErrorKind::TimedOut,
                        format!("connect timed out after {}s", config.connect_timeout_secs),
                    )
                })??;
            Ok(Link::Tcp(stream))
        }
        Protocol::Udp => {
            let target = lookup_host((config.host.as_str(), config.port))
                .await?
                .next()
                .ok_or_else(|| {
                    std::io::Error::new(
                        std::io::ErrorKind::NotFound,
                        format!("no address found for {}", config.host),
                    )
                })?;
            let local = if target.is_ipv6() { "[::]:0" } else { "0.0.0.0:0" };
            let socket = UdpSocket::bind(local).await?;
            Ok(Link::Udp { socket, target })
        }
    }
}

#[async_trait]
impl Tool for ToSyslog {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn disabled_reason(&self) -> Option<&str> {
        self.state.reason()
    }

    fn disable(&mut self, reason: String) {
        self.state = LinkState::Disabled { reason };
    }

    fn messages_sent(&self) -> u64 {
        self.sent
    }

    async fn process(&mut self, alert: &dyn AlertFields) -> Result<Delivery, ToolError> {
        if !self.is_enabled() {
            return Ok(Delivery::Skipped);
        }

        let line = socket_message(alert, &self.config.message_fields, &self.config.message_head);
        match self.send_frame(&frame(&line)).await {
            Ok(()) => {
                self.sent = self.sent.saturating_add(1);
                Ok(Delivery::Sent)
            }
            Err(e) => {
                error!(tool = %self.config.name, error = %e, "error while sending data to remote syslog server");
                debug!(tool = %self.config.name, error = ?e, line = %line, "syslog send failure detail");
                Ok(Delivery::Dropped {
                    reason: e.to_string(),
                })
            }
        }
    }

    async fn cleanup(&mut self) {
        info!(tool = %self.config.name, sent = self.sent, "messages sent to syslog server");

        let previous = std::mem::replace(
            &mut self.state,
            LinkState::Disabled {
                reason: CLOSED_REASON.to_owned(),
            },
        );
        match previous {
            LinkState::Connected(Link::Tcp(mut stream)) => {
                if let Err(e) = stream.shutdown().await {
                    error!(tool = %self.config.name, error = %e, "error while closing connection to remote syslog server");
                }
            }
            LinkState::Connected(Link::Udp { .. }) => {}
            LinkState::Disabled { reason } => {
                // Keep the earlier reason; the socket was never open.
                self.state = LinkState::Disabled { reason };
            }
        }
    }
}
