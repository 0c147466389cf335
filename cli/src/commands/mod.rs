//! Command implementations

pub mod agent;
pub mod publish;
pub mod set_version;
pub mod tools;
pub mod version;
