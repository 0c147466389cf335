//! Unit tests for the on-disk install area.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use flate2::Compression;
use flate2::write::GzEncoder;
use sha2::{Digest, Sha256};
use tempfile::TempDir;
use tooldist_cli::application::ports::ToolsInstaller;
use tooldist_cli::application::services::body::from_bytes;
use tooldist_cli::domain::upgrade::{DOWNLOADED_TOOLS_FILE, tools_root, version_dir};
use tooldist_cli::domain::{AgentIdentity, ErrorKind, InstalledTools, ToolsError};
use tooldist_cli::infra::install::TarballInstaller;
use tooldist_common::ArtifactDescriptor;

use crate::mocks::binary;

fn tarball(files: &[(&str, &[u8])]) -> Vec<u8> {
    let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
    for (name, data) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o755);
        header.set_cksum();
        builder.append_data(&mut header, name, *data).unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap()
}

fn descriptor(b: &str, data: &[u8]) -> ArtifactDescriptor {
    let binary = binary(b);
    ArtifactDescriptor {
        release: binary.series.clone(),
        version: binary.number.clone(),
        arch: binary.arch.clone(),
        size: data.len() as u64,
        path: format!("releases/tooldist-{b}.tgz"),
        resolved_url: Some(format!("file:///store/tools/releases/tooldist-{b}.tgz")),
        file_type: "tar.gz".into(),
        sha256: format!("{:x}", Sha256::digest(data)),
    }
}

fn agent(dir: &TempDir) -> AgentIdentity {
    AgentIdentity {
        tag: "machine-0".into(),
        data_dir: dir.path().to_path_buf(),
        series: "jammy".into(),
        arch: "amd64".into(),
    }
}

async fn install(
    installer: &TarballInstaller,
    agent: &AgentIdentity,
    desc: &ArtifactDescriptor,
    data: &[u8],
) {
    let staged = installer
        .stage(agent, desc, from_bytes(data.to_vec()))
        .await
        .expect("stage");
    installer.unpack(agent, desc, &staged).await.expect("unpack");
    assert!(!staged.path.exists(), "staged file should be removed");
    installer
        .activate(agent, &desc.binary())
        .await
        .expect("activate");
}

#[tokio::test]
async fn test_install_unpacks_records_and_activates() {
    let dir = TempDir::new().unwrap();
    let agent = agent(&dir);
    let data = tarball(&[("tooldistd", b"#!/bin/sh\necho agent\n")]);
    let desc = descriptor("1.2.3-jammy-amd64", &data);
    let installer = TarballInstaller;

    install(&installer, &agent, &desc, &data).await;

    let target = version_dir(&agent.data_dir, &desc.binary());
    assert_eq!(
        std::fs::read(target.join("tooldistd")).unwrap(),
        b"#!/bin/sh\necho agent\n"
    );
    let record: InstalledTools =
        serde_json::from_slice(&std::fs::read(target.join(DOWNLOADED_TOOLS_FILE)).unwrap())
            .unwrap();
    assert!(record.matches(&desc));
    assert_eq!(record.size, data.len() as u64);
    assert_eq!(
        installer.current_tools(&agent).await.expect("current"),
        binary("1.2.3-jammy-amd64")
    );
    assert!(installer.find_unpacked(&agent, &desc).await.expect("find"));
}

#[tokio::test]
async fn test_install_twice_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let agent = agent(&dir);
    let data = tarball(&[("tooldistd", b"v1")]);
    let desc = descriptor("1.2.3-jammy-amd64", &data);
    let installer = TarballInstaller;

    install(&installer, &agent, &desc, &data).await;
    install(&installer, &agent, &desc, &data).await;

    assert_eq!(
        installer.current_tools(&agent).await.expect("current"),
        desc.binary()
    );
    let leftovers: Vec<_> = std::fs::read_dir(tools_root(&agent.data_dir))
        .unwrap()
        .filter_map(Result::ok)
        .filter(|e| e.file_name().to_string_lossy().starts_with(".tmp-"))
        .collect();
    assert!(leftovers.is_empty(), "temporary entries left behind");
}

#[tokio::test]
async fn test_activate_switches_between_versions() {
    let dir = TempDir::new().unwrap();
    let agent = agent(&dir);
    let installer = TarballInstaller;
    let old = tarball(&[("tooldistd", b"old")]);
    let new = tarball(&[("tooldistd", b"new")]);
    let old_desc = descriptor("1.2.3-jammy-amd64", &old);
    let new_desc = descriptor("1.2.4-jammy-amd64", &new);

    install(&installer, &agent, &old_desc, &old).await;
    install(&installer, &agent, &new_desc, &new).await;

    assert_eq!(
        installer.current_tools(&agent).await.expect("current"),
        new_desc.binary()
    );
    assert!(version_dir(&agent.data_dir, &old_desc.binary()).exists());
}

#[tokio::test]
async fn test_checksum_mismatch_is_transient_and_leaves_nothing() {
    let dir = TempDir::new().unwrap();
    let agent = agent(&dir);
    let data = tarball(&[("tooldistd", b"v1")]);
    let mut desc = descriptor("1.2.3-jammy-amd64", &data);
    desc.sha256 = "0".repeat(64);

    let err = TarballInstaller
        .stage(&agent, &desc, from_bytes(data))
        .await
        .expect_err("bad digest");

    assert!(matches!(err, ToolsError::ChecksumMismatch { .. }));
    assert_eq!(err.kind(), ErrorKind::Transient);
    let entries = std::fs::read_dir(tools_root(&agent.data_dir)).unwrap().count();
    assert_eq!(entries, 0);
}

#[tokio::test]
async fn test_size_mismatch_is_transient() {
    let dir = TempDir::new().unwrap();
    let agent = agent(&dir);
    let data = tarball(&[("tooldistd", b"v1")]);
    let mut desc = descriptor("1.2.3-jammy-amd64", &data);
    desc.size += 1;

    let err = TarballInstaller
        .stage(&agent, &desc, from_bytes(data))
        .await
        .expect_err("short body");
    assert!(matches!(err, ToolsError::SizeMismatch { .. }));
    assert_eq!(err.kind(), ErrorKind::Transient);
}

#[tokio::test]
async fn test_corrupt_archive_fails_without_partial_install() {
    let dir = TempDir::new().unwrap();
    let agent = agent(&dir);
    let data = b"definitely not gzip".to_vec();
    let desc = descriptor("1.2.3-jammy-amd64", &data);
    let installer = TarballInstaller;

    let staged = installer
        .stage(&agent, &desc, from_bytes(data))
        .await
        .expect("stage");
    let err = installer
        .unpack(&agent, &desc, &staged)
        .await
        .expect_err("corrupt archive");

    assert_eq!(err.kind(), ErrorKind::Transient);
    assert!(!version_dir(&agent.data_dir, &desc.binary()).exists());
    assert!(!installer.find_unpacked(&agent, &desc).await.expect("find"));
}

fn leftovers(agent: &AgentIdentity) -> Vec<String> {
    std::fs::read_dir(tools_root(&agent.data_dir))
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|name| name.starts_with(".tmp-"))
        .collect()
}

#[tokio::test]
async fn test_retrying_corrupt_archive_leaves_no_downloads() {
    let dir = TempDir::new().unwrap();
    let agent = agent(&dir);
    let data = b"definitely not gzip".to_vec();
    let desc = descriptor("1.2.3-jammy-amd64", &data);
    let installer = TarballInstaller;

    for _ in 0..3 {
        let staged = installer
            .stage(&agent, &desc, from_bytes(data.clone()))
            .await
            .expect("stage");
        let err = installer
            .unpack(&agent, &desc, &staged)
            .await
            .expect_err("corrupt archive");
        assert_eq!(err.kind(), ErrorKind::Transient);
        assert!(!staged.path.exists());
    }

    assert!(leftovers(&agent).is_empty(), "{:?}", leftovers(&agent));
}

#[tokio::test]
async fn test_stage_sweeps_stale_downloads() {
    let dir = TempDir::new().unwrap();
    let agent = agent(&dir);
    let root = tools_root(&agent.data_dir);
    std::fs::create_dir_all(&root).unwrap();
    let stale = root.join(".tmp-download-stale");
    std::fs::write(&stale, b"half a tarball").unwrap();
    std::fs::File::options()
        .write(true)
        .open(&stale)
        .unwrap()
        .set_modified(std::time::SystemTime::now() - std::time::Duration::from_secs(2 * 60 * 60))
        .unwrap();
    let fresh = root.join(".tmp-download-fresh");
    std::fs::write(&fresh, b"in progress").unwrap();

    let data = tarball(&[("tooldistd", b"v1")]);
    let desc = descriptor("1.2.3-jammy-amd64", &data);
    install(&TarballInstaller, &agent, &desc, &data).await;

    assert!(!stale.exists());
    assert!(fresh.exists());
}

#[tokio::test]
async fn test_missing_current_tools_is_not_found() {
    let dir = TempDir::new().unwrap();
    let err = TarballInstaller
        .current_tools(&agent(&dir))
        .await
        .expect_err("nothing installed");
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_activate_requires_unpacked_tools() {
    let dir = TempDir::new().unwrap();
    let err = TarballInstaller
        .activate(&agent(&dir), &binary("1.2.3-jammy-amd64"))
        .await
        .expect_err("not unpacked");
    assert_eq!(err.kind(), ErrorKind::Precondition);
}
