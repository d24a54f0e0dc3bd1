use assert_cmd::Command;

fn sockbridge(dir: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("sockbridge").unwrap();
    cmd.current_dir(dir).env_remove("RUST_LOG");
    cmd
}

#[test]
fn help_lists_options() {
    let dir = tempfile::tempdir().unwrap();
    let out = sockbridge(dir.path()).arg("--help").assert().success();
    let stdout = String::from_utf8_lossy(&out.get_output().stdout).to_string();
    assert!(stdout.contains("--verbose"));
    assert!(stdout.contains("--no-signal-handler"));
}

#[test]
fn no_rules_exits_with_config_code() {
    let dir = tempfile::tempdir().unwrap();
    let empty = dir.path().join("empty.json");
    std::fs::write(&empty, "{}").unwrap();

    sockbridge(dir.path())
        .args(["--config", empty.to_str().unwrap()])
        .assert()
        .code(2);
}

#[test]
fn unpaired_config_exits_with_config_code() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = dir.path().join("sockbridge.json");
    std::fs::write(&cfg, r#"{"sources":["a.sock","b.sock"],"destinations":[":9000"]}"#).unwrap();

    sockbridge(dir.path()).assert().code(2);
}

#[test]
fn bad_address_exits_with_config_code() {
    let dir = tempfile::tempdir().unwrap();
    sockbridge(dir.path())
        .args(["localhost:http", "/tmp/x.sock", "--config", "none.json"])
        .assert()
        .code(2);
}

#[test]
fn busy_tcp_port_exits_with_conflict_code() {
    let dir = tempfile::tempdir().unwrap();
    let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = taken.local_addr().unwrap().to_string();

    sockbridge(dir.path())
        .args([addr.as_str(), "127.0.0.1:9", "--config", "none.json"])
        .assert()
        .code(3);
}

#[test]
fn live_unix_socket_exits_with_conflict_code_and_survives() {
    let dir = tempfile::tempdir().unwrap();
    let sock = dir.path().join("live.sock");
    let _owner = std::os::unix::net::UnixListener::bind(&sock).unwrap();

    sockbridge(dir.path())
        .args([sock.to_str().unwrap(), "127.0.0.1:9", "--config", "none.json"])
        .assert()
        .code(3);
    assert!(sock.exists());
}

#[test]
fn interrupt_right_after_startup_removes_unix_socket() {
    use std::io::{BufRead, BufReader, Read};
    use std::process::{Command as StdCommand, Stdio};

    let dir = tempfile::tempdir().unwrap();
    let sock = dir.path().join("p.sock");
    let rules = format!(
        r#"{{"sources":["{}","127.0.0.1:0"],"destinations":["127.0.0.1:9","127.0.0.1:9"]}}"#,
        sock.display()
    );
    std::fs::write(dir.path().join("rules.json"), rules).unwrap();

    let mut child = StdCommand::new(assert_cmd::cargo::cargo_bin("sockbridge"))
        .current_dir(dir.path())
        .env_remove("RUST_LOG")
        .args(["--config", "rules.json"])
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();

    let mut stdout = BufReader::new(child.stdout.take().unwrap());
    let mut connected = 0;
    let mut line = String::new();
    while connected < 2 {
        line.clear();
        if stdout.read_line(&mut line).unwrap() == 0 {
            break;
        }
        if line.starts_with("CONNECTED:") {
            connected += 1;
        }
    }
    assert_eq!(connected, 2, "bridge did not report both listeners");
    assert!(sock.exists());

    // Sent with no delay, while the serve loop may not be polling yet.
    let sent = StdCommand::new("kill")
        .args(["-INT", &child.id().to_string()])
        .status()
        .unwrap();
    assert!(sent.success());

    let status = child.wait().unwrap();
    let mut rest = String::new();
    stdout.read_to_string(&mut rest).unwrap();

    assert_eq!(status.code(), Some(0));
    assert!(!sock.exists());
    assert!(rest.contains("disconnected..."));
}
