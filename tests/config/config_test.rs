//! Config file loading.

use std::io::Write;

use lqmt_forward::config::{load_config, Protocol};

fn write_config(contents: &str) -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("lqmt-forward.toml");
    let mut f = std::fs::File::create(&path).expect("create file");
    f.write_all(contents.as_bytes()).expect("write");
    (dir, path)
}

#[test]
fn parse_complete_config() {
    let (_dir, path) = write_config(
        r#"
[logging]
debug = true
logs_dir = "/tmp/lqmt-logs"

[[splunk]]
name = "splunk-main"
enabled = true
host = "https://splunk.example.com"
port = 8090
username = "admin"
password = "changeme"
cert_check = false
source = "lqmt"
sourcetype = "lqmt:alert"
index = "security"
timeout_secs = 12
session_ttl_secs = 600

[[syslog]]
name = "syslog-tcp"
host = "collector.example.com"
port = 1514
protocol = "TCP"
message_head = "LQMT: "
message_fields = ["alertType", "indicator", "action"]
connect_timeout_secs = 3

[[syslog]]
name = "syslog-udp"
enabled = false
host = "127.0.0.1"
message_fields = ["alertType"]
"#,
    );

    let config = load_config(&path).expect("parse config");

    assert!(config.logging.debug);
    assert_eq!(
        config.logging.logs_dir.as_deref(),
        Some(std::path::Path::new("/tmp/lqmt-logs"))
    );

    let splunk = &config.splunk[0];
    assert_eq!(splunk.base_url(), "https://splunk.example.com:8090");
    assert!(!splunk.cert_check);
    assert_eq!(splunk.source.as_deref(), Some("lqmt"));
    assert_eq!(splunk.sourcetype.as_deref(), Some("lqmt:alert"));
    assert_eq!(splunk.index.as_deref(), Some("security"));
    assert_eq!(splunk.timeout_secs, 12);
    assert_eq!(splunk.session_ttl_secs, 600);
    assert_eq!(
        splunk.resolve_password().expect("inline password").expose(),
        "changeme"
    );

    let tcp = &config.syslog[0];
    assert_eq!(tcp.protocol, Protocol::Tcp);
    assert_eq!(tcp.port, 1514);
    assert_eq!(tcp.message_head, "LQMT: ");
    assert_eq!(tcp.message_fields, vec!["alertType", "indicator", "action"]);
    assert_eq!(tcp.connect_timeout_secs, 3);

    let udp = &config.syslog[1];
    assert!(!udp.enabled);
    assert_eq!(udp.protocol, Protocol::Udp);
    assert_eq!(udp.port, 514);
}

#[test]
fn empty_file_is_a_valid_config_with_no_tools() {
    let (_dir, path) = write_config("");
    let config = load_config(&path).expect("empty config");
    assert!(config.splunk.is_empty());
    assert!(config.syslog.is_empty());
    assert!(!config.logging.debug);
}

#[test]
fn unknown_protocol_is_rejected() {
    let (_dir, path) = write_config(
        r#"
[[syslog]]
name = "s"
host = "h"
protocol = "sctp"
message_fields = ["a"]
"#,
    );
    let err = load_config(&path).expect_err("bad protocol");
    assert!(format!("{err:#}").contains("sctp"));
}

#[test]
fn validation_errors_name_the_file() {
    let (_dir, path) = write_config(
        r#"
[[syslog]]
name = "s"
host = "h"
port = 0
message_fields = ["a"]
"#,
    );
    let err = load_config(&path).expect_err("port 0");
    let rendered = format!("{err:#}");
    assert!(rendered.contains("lqmt-forward.toml"));
    assert!(rendered.contains("port"));
}

#[test]
fn missing_file_is_an_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let err = load_config(&dir.path().join("absent.toml")).expect_err("no file");
    assert!(err.to_string().contains("failed to read config"));
}
