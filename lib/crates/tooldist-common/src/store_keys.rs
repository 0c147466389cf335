//! Key layout of the shared store.

use crate::version::Binary;

/// Prefix under which all catalog data and tarballs live.
/// Format: tools/{relative path}
pub const TOOLS_PREFIX: &str = "tools";

/// Index document, relative to [`TOOLS_PREFIX`].
pub const INDEX_PATH: &str = "streams/v1/index.json";

/// Directory of published tarballs, relative to [`TOOLS_PREFIX`].
pub const RELEASES_DIR: &str = "releases";

/// Tarball file name prefix.
pub const ARTIFACT_PREFIX: &str = "tooldist-";

/// Tarball file name suffix.
pub const ARTIFACT_SUFFIX: &str = ".tgz";

/// Default catalog namespace.
pub const DEFAULT_NAMESPACE: &str = "io.tooldist";

/// Full store key for a path relative to the tools prefix.
#[must_use]
pub fn tools_key(relative: &str) -> String {
    format!("{TOOLS_PREFIX}/{relative}")
}

/// Tarball file name for a binary version.
#[must_use]
pub fn artifact_file_name(binary: &Binary) -> String {
    format!("{ARTIFACT_PREFIX}{binary}{ARTIFACT_SUFFIX}")
}

/// Canonical relative path of a tarball, e.g. `releases/tooldist-1.2.3-precise-amd64.tgz`.
#[must_use]
pub fn artifact_path(binary: &Binary) -> String {
    format!("{RELEASES_DIR}/{}", artifact_file_name(binary))
}

/// Recover the binary version from a tarball file name or key.
///
/// Only the final path component is inspected.
#[must_use]
pub fn parse_artifact_name(name: &str) -> Option<Binary> {
    let file = name.rsplit('/').next()?;
    file.strip_prefix(ARTIFACT_PREFIX)?
        .strip_suffix(ARTIFACT_SUFFIX)?
        .parse()
        .ok()
}

/// Content id advertised by the index of a namespace.
#[must_use]
pub fn content_id(namespace: &str) -> String {
    format!("{namespace}:released:tools")
}

/// Listing document path of a product stream, relative to [`TOOLS_PREFIX`].
#[must_use]
pub fn listing_path(product_id: &str) -> String {
    format!("streams/v1/{}.json", product_id.replace(':', "-"))
}

/// Key of the desired-version signal of an agent.
/// Format: agents/{tag}/desired-version
/// Value: version number string
#[must_use]
pub fn desired_version_key(agent_tag: &str) -> String {
    format!("agents/{agent_tag}/desired-version")
}

/// Key of the tools an agent reports running.
/// Format: agents/{tag}/running-version
/// Value: binary version string
#[must_use]
pub fn running_version_key(agent_tag: &str) -> String {
    format!("agents/{agent_tag}/running-version")
}
