//! Validation errors raised by the extension layer itself.
//!
//! Parse errors of the wrapped framework are left to `clap::Error`; these
//! variants cover what this crate adds on top (presets, config files).

use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq)]
pub enum ExtraError {
    /// Two parameters share an id, a long name or a short name
    DuplicateParameter { command: String, name: String },
    /// Explicit configuration file (or pattern) matched nothing
    ConfigNotFound(String),
    /// Configuration file content could not be parsed in any supported format
    MalformedConfig { path: PathBuf, reason: String },
    /// Key in the configuration file matches no parameter (strict mode)
    UnknownConfigKey { command: String, key: String },
    /// Configuration value with a shape the parameter cannot take
    InvalidConfigValue { key: String, reason: String },
    /// Verbosity level outside of the known names
    UnknownLevel(String),
    /// Nothing to run
    EmptyCommand,
    /// No plugin registered under this name
    UnknownPlugin { group: String, name: String },
}

impl std::fmt::Display for ExtraError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtraError::DuplicateParameter { command, name } => {
                write!(f, "Parameter {} is declared more than once on {}", name, command)
            }
            ExtraError::ConfigNotFound(pattern) => {
                write!(f, "No configuration file found at {}", pattern)
            }
            ExtraError::MalformedConfig { path, reason } => {
                write!(
                    f,
                    "Error parsing configuration file {}: {}",
                    path.display(),
                    reason
                )
            }
            ExtraError::UnknownConfigKey { command, key } => {
                write!(
                    f,
                    "Parameter {} is not allowed in configuration file of {}",
                    key, command
                )
            }
            ExtraError::InvalidConfigValue { key, reason } => {
                write!(f, "Invalid configuration value for {}: {}", key, reason)
            }
            ExtraError::UnknownLevel(level) => {
                write!(
                    f,
                    "Unknown verbosity level {}. Either CRITICAL, ERROR, WARNING, INFO or DEBUG.",
                    level
                )
            }
            ExtraError::EmptyCommand => write!(f, "Command is empty"),
            ExtraError::UnknownPlugin { group, name } => {
                write!(f, "No plugin named {} in {}", name, group)
            }
        }
    }
}

impl std::error::Error for ExtraError {}
