//! Infrastructure layer — concrete implementations of application port traits.
//!
//! This module contains all I/O-performing code: stores, artifact fetching,
//! the local install area, timers, and configuration loading.
//!
//! Imports from `crate::domain` and `crate::application::ports` are allowed.
//! Imports from `crate::commands` or `crate::output` are forbidden.

pub mod config;
pub mod fetch;
pub mod fs;
pub mod install;
pub mod store;
pub mod timer;
