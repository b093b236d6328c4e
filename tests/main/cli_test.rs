//! CLI contract tests.

use std::io::Write;

use assert_cmd::Command;

const VALID: &str = r#"
[[splunk]]
name = "splunk"
enabled = false
host = "https://splunk.local"
username = "admin"
password = "x"

[[syslog]]
name = "syslog"
host = "127.0.0.1"
message_fields = ["alertType"]
"#;

fn config_file(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(contents.as_bytes()).expect("write");
    file
}

#[test]
fn check_accepts_valid_config() {
    let file = config_file(VALID);
    let assert = Command::cargo_bin("lqmt-forward")
        .expect("binary builds")
        .args(["check", "--config"])
        .arg(file.path())
        .assert()
        .success();
    let stdout = String::from_utf8_lossy(&assert.get_output().stdout).into_owned();
    assert!(stdout.contains("ok (1 splunk, 1 syslog)"), "stdout: {stdout}");
}

#[test]
fn check_rejects_invalid_config() {
    let file = config_file("[[syslog]]\nname = \"s\"\nhost = \"h\"\nmessage_fields = []\n");
    Command::cargo_bin("lqmt-forward")
        .expect("binary builds")
        .args(["check", "--config"])
        .arg(file.path())
        .assert()
        .failure();
}

#[test]
fn run_forwards_stdin_alerts_over_udp() {
    let receiver = std::net::UdpSocket::bind("127.0.0.1:0").expect("bind");
    receiver
        .set_read_timeout(Some(std::time::Duration::from_secs(5)))
        .expect("timeout");
    let port = receiver.local_addr().expect("addr").port();

    let file = config_file(&format!(
        "[[syslog]]\nname = \"udp\"\nhost = \"127.0.0.1\"\nport = {port}\nmessage_head = \"H \"\nmessage_fields = [\"alertType\"]\n"
    ));

    Command::cargo_bin("lqmt-forward")
        .expect("binary builds")
        .args(["run", "--config"])
        .arg(file.path())
        .write_stdin("{\"alertType\":\"scan\"}\n")
        .assert()
        .success();

    let mut buf = [0_u8; 256];
    let (n, _) = receiver.recv_from(&mut buf).expect("datagram");
    assert_eq!(String::from_utf8_lossy(&buf[..n]), "H alertType=\"scan\"\n");
}

#[test]
fn check_rejects_enabled_splunk_with_unset_password_env() {
    let file = config_file(
        "[[splunk]]\nname = \"splunk\"\nhost = \"https://splunk.local\"\nusername = \"admin\"\npassword_env = \"LQMT_FORWARD_CLI_UNSET_PW\"\n",
    );
    let assert = Command::cargo_bin("lqmt-forward")
        .expect("binary builds")
        .env_remove("LQMT_FORWARD_CLI_UNSET_PW")
        .args(["check", "--config"])
        .arg(file.path())
        .assert()
        .failure();
    let stderr = String::from_utf8_lossy(&assert.get_output().stderr).into_owned();
    assert!(stderr.contains("LQMT_FORWARD_CLI_UNSET_PW"), "stderr: {stderr}");
}

#[test]
fn run_forwards_alerts_from_file_with_debug() {
    let receiver = std::net::UdpSocket::bind("127.0.0.1:0").expect("bind");
    receiver
        .set_read_timeout(Some(std::time::Duration::from_secs(5)))
        .expect("timeout");
    let port = receiver.local_addr().expect("addr").port();

    let file = config_file(&format!(
        "[[syslog]]\nname = \"udp\"\nhost = \"127.0.0.1\"\nport = {port}\nmessage_fields = [\"alertType\", \"ip\"]\n"
    ));
    let alerts = config_file("{\"alertType\":\"block\",\"ip\":\"2.2.2.2\"}\n\nnot json\n");

    Command::cargo_bin("lqmt-forward")
        .expect("binary builds")
        .args(["--debug", "run", "--config"])
        .arg(file.path())
        .arg("--alerts")
        .arg(alerts.path())
        .assert()
        .success();

    let mut buf = [0_u8; 256];
    let (n, _) = receiver.recv_from(&mut buf).expect("datagram");
    assert_eq!(
        String::from_utf8_lossy(&buf[..n]),
        "alertType=\"block\" ip=\"2.2.2.2\"\n"
    );
}
