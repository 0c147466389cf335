//! Shared helpers for integration tests.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use flate2::Compression;
use flate2::write::GzEncoder;
use tempfile::TempDir;

/// A scratch environment: an isolated config path plus a store directory.
pub struct Sandbox {
    pub dir: TempDir,
}

impl Sandbox {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("tempdir"),
        }
    }

    pub fn store(&self) -> PathBuf {
        self.dir.path().join("store")
    }

    pub fn config(&self) -> PathBuf {
        self.dir.path().join("config.yaml")
    }

    pub fn data_dir(&self) -> PathBuf {
        self.dir.path().join("agent")
    }

    /// `tooldist` with colors off, the sandbox config, and no inherited
    /// agent overrides.
    pub fn cmd(&self) -> Command {
        let mut cmd = tooldist();
        cmd.env("TOOLDIST_CONFIG", self.config())
            .env_remove("TOOLDIST_STORE")
            .env_remove("TOOLDIST_AGENT_TAG")
            .env_remove("TOOLDIST_AGENT_DATA_DIR")
            .env_remove("RUST_LOG")
            .arg("--store")
            .arg(self.store());
        cmd
    }

    /// Write a tools tarball named for `binary` into the sandbox.
    pub fn tarball(&self, binary: &str) -> PathBuf {
        let path = self.dir.path().join(format!("tooldist-{binary}.tgz"));
        std::fs::write(&path, tarball_bytes(binary)).unwrap();
        path
    }
}

pub fn tooldist() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("tooldist"));
    cmd.env("NO_COLOR", "1");
    cmd
}

pub fn tarball_bytes(binary: &str) -> Vec<u8> {
    let script = format!("#!/bin/sh\necho {binary}\n");
    let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
    let mut header = tar::Header::new_gnu();
    header.set_size(script.len() as u64);
    header.set_mode(0o755);
    header.set_cksum();
    builder
        .append_data(&mut header, "tooldistd", script.as_bytes())
        .unwrap();
    builder.into_inner().unwrap().finish().unwrap()
}

pub fn stdout_json(output: &[u8]) -> serde_json::Value {
    serde_json::from_slice(output).expect("stdout is one JSON document")
}

pub fn exists(path: &Path) -> bool {
    path.symlink_metadata().is_ok()
}
