// End-to-end tests for the brewtheory executable

use brewtheory::service::SERVICE_READY_LINE;

use rpc_core::config::{CERTIFICATE_FILE_NAME, CONFIG_DIR_ENV_VAR};

use std::io::{BufRead, BufReader};
use std::process::{Command, Stdio};

use tempfile::TempDir;

const BINARY: &str = env!("CARGO_BIN_EXE_brewtheory");

/// **VALUE**: The executable prints `SERVICE_READY` as its first stdout line.
///
/// **WHY THIS MATTERS**: The front-end launches this binary and blocks until it reads that
/// line. Any log output interleaved on stdout would break the handshake between processes.
///
/// **BUG THIS CATCHES**: Would catch logs going to stdout, a missing readiness line, or a
/// certificate not written to the overridden config directory.
#[test]
fn given_valid_flags_when_launching_binary_then_first_stdout_line_is_service_ready() {
    // GIVEN: Throwaway config and log locations
    let temp = TempDir::new().expect("temp dir");
    let log_file = temp.path().join("logs").join("brewtheory.log");

    // WHEN: Launching the binary
    let mut child = Command::new(BINARY)
        .args(["--listen", "127.0.0.1:0", "--loglevel", "info", "--logfile"])
        .arg(&log_file)
        .env(CONFIG_DIR_ENV_VAR, temp.path())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn binary");

    let stdout = child.stdout.take().expect("stdout");
    let first_line = BufReader::new(stdout).lines().next();

    child.kill().ok();
    child.wait().ok();

    // THEN
    let first_line = first_line.expect("a line").expect("utf8 line");
    assert_eq!(first_line, SERVICE_READY_LINE);
    assert!(temp.path().join(CERTIFICATE_FILE_NAME).exists());
    assert!(log_file.exists());
}

/// **VALUE**: An unusable listen address exits with a failure status.
///
/// **BUG THIS CATCHES**: Would catch a bootstrap failure that hangs or exits 0.
#[test]
fn given_unbindable_address_when_launching_binary_then_exits_with_failure() {
    let temp = TempDir::new().expect("temp dir");

    let output = Command::new(BINARY)
        .args(["--listen", "not-an-address", "--logfile"])
        .arg(temp.path().join("brewtheory.log"))
        .env(CONFIG_DIR_ENV_VAR, temp.path())
        .output()
        .expect("run binary");

    assert!(!output.status.success());
    assert!(!String::from_utf8_lossy(&output.stdout).contains(SERVICE_READY_LINE));
}

/// **VALUE**: An invalid log level is rejected before anything starts.
#[test]
fn given_invalid_log_level_when_launching_binary_then_exits_with_failure() {
    let temp = TempDir::new().expect("temp dir");

    let output = Command::new(BINARY)
        .args(["--loglevel", "LOUD", "--logfile"])
        .arg(temp.path().join("brewtheory.log"))
        .env(CONFIG_DIR_ENV_VAR, temp.path())
        .output()
        .expect("run binary");

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("LOUD"));
}
