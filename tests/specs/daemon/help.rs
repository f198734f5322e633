//! Help and version output.

use assert_cmd::Command;

fn mcplogd() -> Command {
    Command::cargo_bin("mcplogd").expect("mcplogd binary built")
}

#[test]
fn help_describes_the_daemon() {
    let assert = mcplogd().arg("--help").assert().success();
    let stdout = String::from_utf8_lossy(&assert.get_output().stdout).into_owned();
    assert!(stdout.contains("mcplogd"));
    assert!(stdout.contains("USAGE"));
    assert!(stdout.contains("log aggregation"));
}

#[test]
fn version_prints_the_crate_version() {
    let assert = mcplogd().arg("--version").assert().success();
    let stdout = String::from_utf8_lossy(&assert.get_output().stdout).into_owned();
    assert!(stdout.starts_with("mcplogd "));
}

#[test]
fn unexpected_argument_exits_nonzero() {
    let assert = mcplogd().arg("--bogus").assert().code(1);
    let stderr = String::from_utf8_lossy(&assert.get_output().stderr).into_owned();
    assert!(stderr.contains("unexpected argument"));
}
