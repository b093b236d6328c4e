//! Scripted stand-in for the Splunk REST API.
//!
//! Records every request. Login returns `key-N` (N counts logins) unless a
//! login status is scripted; stream requests pop statuses from a queue and
//! default to 200.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub target: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl Recorded {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn path(&self) -> &str {
        self.target.split('?').next().unwrap_or_default()
    }

    pub fn query(&self) -> Option<&str> {
        self.target.split_once('?').map(|(_, q)| q)
    }
}

#[derive(Default)]
struct Script {
    requests: Vec<Recorded>,
    logins: u32,
    login_status: Option<u16>,
    stream_statuses: VecDeque<u16>,
}

#[derive(Clone)]
pub struct MockSplunk {
    pub addr: SocketAddr,
    script: Arc<Mutex<Script>>,
}

impl MockSplunk {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("listener should bind");
        let addr = listener.local_addr().expect("listener should expose addr");
        let script = Arc::new(Mutex::new(Script::default()));

        let shared = Arc::clone(&script);
        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                let shared = Arc::clone(&shared);
                tokio::spawn(async move {
                    handle(socket, shared).await;
                });
            }
        });

        Self { addr, script }
    }

    pub fn host(&self) -> String {
        "http://127.0.0.1".to_owned()
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    pub fn fail_login(&self, status: u16) {
        self.script.lock().expect("lock").login_status = Some(status);
    }

    pub fn queue_stream_status(&self, status: u16) {
        self.script
            .lock()
            .expect("lock")
            .stream_statuses
            .push_back(status);
    }

    pub fn logins(&self) -> u32 {
        self.script.lock().expect("lock").logins
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.script.lock().expect("lock").requests.clone()
    }

    pub fn stream_requests(&self) -> Vec<Recorded> {
        self.requests()
            .into_iter()
            .filter(|r| r.path() == "/services/receivers/stream/")
            .collect()
    }
}

async fn handle(mut socket: TcpStream, script: Arc<Mutex<Script>>) {
    let Some(request) = read_request(&mut socket).await else {
        return;
    };

    let (status, body) = {
        let mut script = script.lock().expect("lock");
        let reply = match request.path() {
            "/services/auth/login/" => match script.login_status {
                Some(status) => (status, "<response><messages><msg type=\"WARN\">Login failed</msg></messages></response>".to_owned()),
                None => {
                    script.logins += 1;
                    (
                        200,
                        format!(
                            "<response>\n  <sessionKey>key-{}</sessionKey>\n</response>",
                            script.logins
                        ),
                    )
                }
            },
            "/services/receivers/stream/" => {
                let status = script.stream_statuses.pop_front().unwrap_or(200);
                (status, String::new())
            }
            _ => (200, String::new()),
        };
        script.requests.push(request);
        reply
    };

    let response = format!(
        "HTTP/1.1 {status} {}\r\nContent-Type: text/xml\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        reason(status),
        body.len()
    );
    let _ = socket.write_all(response.as_bytes()).await;
    let _ = socket.shutdown().await;
}

async fn read_request(socket: &mut TcpStream) -> Option<Recorded> {
    let mut buf = Vec::new();
    let mut chunk = [0_u8; 4096];

    let header_end = loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = find(&buf, b"\r\n\r\n") {
            break pos;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).into_owned();
    let mut lines = head.split("\r\n");
    let request_line = lines.next()?;
    let mut parts = request_line.split_whitespace();
    let method = parts.next()?.to_owned();
    let target = parts.next()?.to_owned();

    let headers: Vec<(String, String)> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_owned(), v.trim().to_owned()))
        .collect();

    let content_length = headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.parse::<usize>().ok())
        .unwrap_or(0);

    let body_start = header_end + 4;
    while buf.len() < body_start + content_length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let body_end = buf.len().min(body_start + content_length);
    let body = String::from_utf8_lossy(&buf[body_start..body_end]).into_owned();

    Some(Recorded {
        method,
        target,
        headers,
        body,
    })
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}
