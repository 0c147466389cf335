//! Domain layer — pure business logic, types, and validation.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All functions are synchronous and take data in, returning data out.

pub mod catalog;
pub mod config;
pub mod constraint;
pub mod digest;
pub mod error;
pub mod upgrade;

pub use catalog::{MetadataFile, check_listing, encode_catalog, from_artifacts, merge};
pub use config::{AgentConfig, SourceConfig, ToolsConfig};
pub use constraint::{LookupParams, ToolsConstraint, VersionFilter, append_matching};
pub use error::{ConfigError, ErrorKind, ToolsError};
pub use upgrade::{AgentIdentity, InstalledTools, UpgradeOutcome, UpgraderExit};
