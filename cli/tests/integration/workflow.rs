//! End-to-end tests: publish tarballs into a directory store, look them up,
//! point an agent at a new version, and let the agent upgrade itself.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::time::Duration;

use predicates::prelude::*;

use crate::helpers::{Sandbox, exists, stdout_json};

fn publish(sandbox: &Sandbox, binaries: &[&str]) {
    let mut cmd = sandbox.cmd();
    cmd.arg("publish");
    for b in binaries {
        cmd.arg(sandbox.tarball(b));
    }
    cmd.assert().success();
}

#[test]
fn test_publish_writes_catalog_and_tarballs() {
    let sandbox = Sandbox::new();
    let output = sandbox
        .cmd()
        .arg("--json")
        .arg("publish")
        .arg(sandbox.tarball("1.2.0-jammy-amd64"))
        .arg(sandbox.tarball("1.2.0-jammy-arm64"))
        .output()
        .expect("run");
    assert!(output.status.success(), "{output:?}");

    let v = stdout_json(&output.stdout);
    assert_eq!(v["namespace"], "io.tooldist");
    let tools = v["tools"].as_array().expect("tools array");
    assert_eq!(tools.len(), 2);
    assert_eq!(tools[0]["binary"], "1.2.0-jammy-amd64");
    assert!(tools[0]["size"].as_u64().unwrap() > 0);
    assert_eq!(tools[0]["sha256"].as_str().unwrap().len(), 64);

    let store = sandbox.store();
    assert!(store.join("tools/streams/v1/index.json").is_file());
    assert!(
        store
            .join("tools/releases/tooldist-1.2.0-jammy-arm64.tgz")
            .is_file()
    );
}

fn listed(sandbox: &Sandbox) -> serde_json::Value {
    let output = sandbox
        .cmd()
        .args(["--json", "tools", "--series", "jammy", "--arch", "amd64"])
        .output()
        .expect("run");
    assert!(output.status.success(), "{output:?}");
    stdout_json(&output.stdout)
}

#[test]
fn test_republish_without_files_keeps_catalog() {
    let sandbox = Sandbox::new();
    publish(&sandbox, &["1.2.0-jammy-amd64"]);
    let before = listed(&sandbox);

    sandbox.cmd().arg("publish").assert().success();

    let after = listed(&sandbox);
    assert_eq!(after.as_array().unwrap().len(), 1);
    assert_eq!(before[0]["sha256"], after[0]["sha256"]);
    assert_eq!(before[0]["size"], after[0]["size"]);
}

#[test]
fn test_publish_without_files_discovers_copied_tarballs() {
    let sandbox = Sandbox::new();
    let releases = sandbox.store().join("tools/releases");
    std::fs::create_dir_all(&releases).unwrap();
    std::fs::copy(
        sandbox.tarball("1.2.0-jammy-amd64"),
        releases.join("tooldist-1.2.0-jammy-amd64.tgz"),
    )
    .unwrap();
    std::fs::write(releases.join("notes.txt"), b"ignored").unwrap();

    sandbox.cmd().arg("publish").assert().success();

    let v = listed(&sandbox);
    assert_eq!(v[0]["binary"], "1.2.0-jammy-amd64");
    assert_eq!(v[0]["sha256"].as_str().unwrap().len(), 64);
}

#[test]
fn test_tools_filters_by_version_and_platform() {
    let sandbox = Sandbox::new();
    publish(
        &sandbox,
        &["1.2.0-jammy-amd64", "1.3.0-jammy-amd64", "1.4.0-jammy-amd64", "1.4.0-focal-amd64"],
    );

    let output = sandbox
        .cmd()
        .args(["--json", "tools", "--major", "1", "--released", "--series", "jammy"])
        .args(["--arch", "amd64"])
        .output()
        .expect("run");
    let v = stdout_json(&output.stdout);
    let binaries: Vec<&str> = v
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["binary"].as_str().unwrap())
        .collect();
    assert_eq!(binaries, ["1.2.0-jammy-amd64", "1.4.0-jammy-amd64"]);

    let output = sandbox
        .cmd()
        .args(["--json", "tools", "--version", "1.4.0", "--series", "focal"])
        .args(["--arch", "amd64"])
        .output()
        .expect("run");
    let v = stdout_json(&output.stdout);
    assert_eq!(v[0]["binary"], "1.4.0-focal-amd64");
    assert!(v[0]["url"].as_str().unwrap().starts_with("file://"));
}

#[test]
fn test_tools_on_empty_store_finds_nothing() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .args(["tools", "--series", "jammy", "--arch", "amd64"])
        .assert()
        .success()
        .stderr(predicate::str::contains("no matching tools found"));
}

#[test]
fn test_set_version_records_signal() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .args(["set-version", "machine-0", "1.4.0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("agent machine-0 will upgrade to 1.4.0"))
        .stdout(predicate::str::contains("unknown"));
    assert_eq!(
        std::fs::read_to_string(sandbox.store().join("agents/machine-0/desired-version"))
            .unwrap(),
        "1.4.0\n"
    );
}

#[cfg(unix)]
#[test]
fn test_agent_upgrades_and_requests_restart() {
    let sandbox = Sandbox::new();
    publish(&sandbox, &["1.2.0-jammy-amd64", "1.4.0-jammy-amd64"]);
    sandbox
        .cmd()
        .args(["set-version", "machine-0", "1.4.0"])
        .assert()
        .success();

    // The agent currently runs 1.2.0.
    let tools = sandbox.data_dir().join("tools");
    std::fs::create_dir_all(tools.join("1.2.0-jammy-amd64")).unwrap();
    std::os::unix::fs::symlink("1.2.0-jammy-amd64", tools.join("machine-0")).unwrap();

    let output = sandbox
        .cmd()
        .args(["--json", "agent", "--tag", "machine-0"])
        .env("TOOLDIST_AGENT_DATA_DIR", sandbox.data_dir())
        .env("TOOLDIST_AGENT_SERIES", "jammy")
        .env("TOOLDIST_AGENT_ARCH", "amd64")
        .env("TOOLDIST_AGENT_POLL_INTERVAL_SECS", "1")
        .env("TOOLDIST_AGENT_RETRY_DELAY_SECS", "1")
        .timeout(Duration::from_secs(60))
        .output()
        .expect("run");

    assert_eq!(output.status.code(), Some(3), "{output:?}");
    let v = stdout_json(&output.stdout);
    assert_eq!(v["upgraded"], true);
    assert_eq!(v["old_tools"], "1.2.0-jammy-amd64");
    assert_eq!(v["new_tools"], "1.4.0-jammy-amd64");

    assert_eq!(
        std::fs::read_link(tools.join("machine-0")).unwrap(),
        std::path::PathBuf::from("1.4.0-jammy-amd64")
    );
    assert!(tools.join("1.4.0-jammy-amd64/tooldistd").is_file());
    assert!(tools.join("1.4.0-jammy-amd64/downloaded-tools.txt").is_file());
    assert!(exists(&tools.join("1.2.0-jammy-amd64")));

    // The agent reported what it ran before the upgrade.
    assert_eq!(
        std::fs::read_to_string(sandbox.store().join("agents/machine-0/running-version"))
            .unwrap(),
        "1.2.0-jammy-amd64\n"
    );
    let output = sandbox
        .cmd()
        .args(["--json", "set-version", "machine-0", "1.4.0"])
        .output()
        .expect("run");
    let v = stdout_json(&output.stdout);
    assert_eq!(v["desired_version"], "1.4.0");
    assert_eq!(v["running_version"], "1.2.0-jammy-amd64");
}
