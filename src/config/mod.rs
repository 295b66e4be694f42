//! Configuration module for pocket-ledger
//!
//! This module provides configuration management including:
//! - XDG-compliant path resolution
//! - User settings persistence (backup, retry and monitoring preferences)

pub mod paths;
pub mod settings;

pub use paths::LedgerPaths;
pub use settings::Settings;
