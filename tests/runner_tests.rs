#![cfg(unix)]

use port_hunter_rs::error::ScanError;
use port_hunter_rs::pipeline::{run_scan, ScanOptions};
use port_hunter_rs::runner::ScanCommand;
use std::fs;
use std::time::Duration;

fn script(dir: &tempfile::TempDir, body: &str) -> String {
    let path = dir.path().join("fake-scanner.sh");
    fs::write(&path, body).expect("write script");
    format!("sh {}", path.display())
}

#[tokio::test]
async fn runs_command_with_target_and_parses_output() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let command = script(
        &dir,
        "echo \"Nmap scan report for $1\"\necho '22/tcp open ssh'\necho '80/tcp closed http'\n",
    );
    let cmd = ScanCommand::new(&command, "10.9.8.7").expect("valid");

    let snapshot = run_scan(&cmd, &ScanOptions::default()).await.expect("scan");
    assert!(snapshot.captured_at().is_ok());
    let entries: Vec<String> = snapshot.host_ports["10.9.8.7"]
        .iter()
        .map(|e| e.to_string())
        .collect();
    assert_eq!(entries, vec!["22/tcp [open] (ssh)", "80/tcp [closed] (http)"]);
}

#[tokio::test]
async fn stderr_is_captured_too() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let command = script(
        &dir,
        "echo \"Nmap scan report for $1\" >&2\necho '443/tcp open https' >&2\n",
    );
    let cmd = ScanCommand::new(&command, "h").expect("valid");
    let text = cmd.run(None).await.expect("run");
    assert!(text.contains("443/tcp open https"));
}

#[tokio::test]
async fn nonzero_exit_keeps_output() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let command = script(
        &dir,
        "echo 'You requested a scan type which requires root privileges.'\nexit 1\n",
    );
    let cmd = ScanCommand::new(&command, "10.0.0.1").expect("valid");

    match cmd.run(None).await {
        Err(ScanError::Execution { output, .. }) => {
            assert!(output.contains("requires root privileges"));
        }
        other => panic!("expected execution error, got {other:?}"),
    }
}

#[tokio::test]
async fn missing_binary_is_a_launch_error() {
    let cmd = ScanCommand::new("port-hunter-no-such-binary -sV", "10.0.0.1").expect("valid");
    let err = cmd.run(None).await.expect_err("launch");
    assert!(matches!(err, ScanError::Launch { .. }));
}

#[tokio::test]
async fn slow_scan_times_out() {
    let cmd = ScanCommand::new("sleep", "5").expect("valid");
    let err = cmd
        .run(Some(Duration::from_millis(100)))
        .await
        .expect_err("timeout");
    assert!(matches!(err, ScanError::Timeout(_)));
}
