//! Configuration file support.
//!
//! A configuration file holds a table named after the CLI, with nested tables
//! named after its subcommands. Its values become the defaults of the
//! matching parameters before the command line is parsed.
//!
//! # Structure
//!
//! - `format` - Supported formats and their parsers
//! - `apply` - Injection of values as parameter defaults

mod apply;
mod format;

use anyhow::{Context, Result};
use clap::{Arg, ArgAction, Command, ValueHint};
use log::debug;
use serde_json::Value;
use std::collections::HashSet;
use std::path::PathBuf;

use crate::error::ExtraError;
use crate::runtime::Runtime;

pub use apply::{EXCLUDED_PARAMS, apply_defaults, find_arg};
pub use format::{ConfigFormat, parse_config};

pub const CONFIG_ID: &str = "config";
pub const NO_CONFIG_ID: &str = "no_config";

/// How the configuration file should be located.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConfigRequest {
    /// Search the default location, skip silently if nothing is there
    #[default]
    Default,
    /// Explicit path or glob pattern, must match a file
    Path(String),
    /// Do not load any configuration
    Disabled,
}

/// Scan raw arguments for `--config`, `-C` and `--no-config`. Stops at `--`.
pub fn config_from_args(args: &[String]) -> ConfigRequest {
    let mut request = ConfigRequest::Default;
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--" => break,
            "--no-config" => request = ConfigRequest::Disabled,
            "--config" | "-C" => {
                if let Some(path) = iter.next() {
                    request = ConfigRequest::Path(path.clone());
                }
            }
            other => {
                if let Some(path) = other.strip_prefix("--config=") {
                    request = ConfigRequest::Path(path.to_string());
                } else if let Some(path) = other.strip_prefix("-C")
                    && !path.is_empty()
                {
                    request = ConfigRequest::Path(path.trim_start_matches('=').to_string());
                }
            }
        }
    }
    request
}

/// Where and how configuration files are looked up.
#[derive(Debug, Clone)]
pub struct ConfigSettings {
    /// Name of the application folder in the user's config directory
    pub app_name: String,
    pub formats: Vec<ConfigFormat>,
    /// Reject keys matching no parameter
    pub strict: bool,
    /// Overrides the platform config directory
    pub search_dir: Option<PathBuf>,
}

impl ConfigSettings {
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            formats: ConfigFormat::ALL.to_vec(),
            strict: false,
            search_dir: None,
        }
    }

    fn search_dir<R: Runtime>(&self, runtime: &R) -> Option<PathBuf> {
        match &self.search_dir {
            Some(dir) => Some(dir.clone()),
            None => runtime.config_dir().map(|dir| dir.join(&self.app_name)),
        }
    }

    /// Glob patterns of the default search, one per extension. Glob
    /// metacharacters in the directory itself are escaped.
    pub fn default_patterns<R: Runtime>(&self, runtime: &R) -> Vec<String> {
        let Some(dir) = self.search_dir(runtime) else {
            return Vec::new();
        };
        let dir = PathBuf::from(glob::Pattern::escape(&dir.display().to_string()));
        self.formats
            .iter()
            .flat_map(|format| format.extensions())
            .map(|ext| dir.join(format!("*.{}", ext)).display().to_string())
            .collect()
    }

    /// Human-readable default location, as shown in help screens. Not a
    /// glob pattern: extensions are listed between braces.
    pub fn default_location<R: Runtime>(&self, runtime: &R) -> String {
        let extensions: Vec<&str> = self
            .formats
            .iter()
            .flat_map(|format| format.extensions().iter().copied())
            .collect();
        match self.search_dir(runtime) {
            Some(dir) => dir
                .join(format!("*.{{{}}}", extensions.join(",")))
                .display()
                .to_string(),
            None => String::new(),
        }
    }
}

/// The `--config` and `--no-config` options.
pub fn config_args(default_location: &str) -> Vec<Arg> {
    let mut config = Arg::new(CONFIG_ID)
        .short('C')
        .long("config")
        .value_name("CONFIG_PATH")
        .value_hint(ValueHint::FilePath)
        .overrides_with(NO_CONFIG_ID)
        .help("Location of the configuration file. Supports glob patterns.");
    if !default_location.is_empty() {
        config = config.long_help(format!(
            "Location of the configuration file. Supports glob patterns. \
             Defaults to the first file matching {}",
            default_location
        ));
    }
    vec![
        config,
        Arg::new(NO_CONFIG_ID)
            .long("no-config")
            .action(ArgAction::SetTrue)
            .overrides_with(CONFIG_ID)
            .help("Ignore all configuration files."),
    ]
}

/// Resolve the configuration file to load, if any.
#[tracing::instrument(level = "debug", skip(runtime, settings))]
pub fn locate<R: Runtime>(
    runtime: &R,
    request: &ConfigRequest,
    settings: &ConfigSettings,
) -> Result<Option<PathBuf>> {
    match request {
        ConfigRequest::Disabled => Ok(None),
        ConfigRequest::Path(pattern) => {
            let found = runtime
                .glob(pattern)?
                .into_iter()
                .find(|path| runtime.is_file(path));
            match found {
                Some(path) => Ok(Some(path)),
                None => Err(ExtraError::ConfigNotFound(pattern.clone()).into()),
            }
        }
        ConfigRequest::Default => {
            for pattern in settings.default_patterns(runtime) {
                if let Some(path) = runtime
                    .glob(&pattern)?
                    .into_iter()
                    .find(|path| runtime.is_file(path))
                {
                    return Ok(Some(path));
                }
            }
            debug!("No configuration file found in default location");
            Ok(None)
        }
    }
}

/// A command with the configuration defaults applied.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub command: Command,
    pub path: Option<PathBuf>,
    /// Dotted paths of the parameters set from the file
    pub applied: HashSet<String>,
}

/// Locate, parse and apply the configuration file to `cmd`.
#[tracing::instrument(level = "debug", skip(runtime, cmd, settings))]
pub fn load_into<R: Runtime>(
    runtime: &R,
    cmd: Command,
    request: &ConfigRequest,
    settings: &ConfigSettings,
) -> Result<LoadedConfig> {
    let Some(path) = locate(runtime, request, settings)? else {
        return Ok(LoadedConfig {
            command: cmd,
            path: None,
            applied: HashSet::new(),
        });
    };

    debug!("Load configuration from {}", path.display());
    let content = runtime
        .read_to_string(&path)
        .with_context(|| format!("Failed to load configuration file {}", path.display()))?;
    let tree = parse_config(&path, &content, &settings.formats)?;

    let section = match tree.get(cmd.get_name()) {
        Some(Value::Object(section)) => section.clone(),
        Some(_) => {
            return Err(ExtraError::MalformedConfig {
                path,
                reason: format!("{} is not a table", cmd.get_name()),
            }
            .into());
        }
        None => {
            debug!(
                "No {} section in {}, nothing to apply",
                cmd.get_name(),
                path.display()
            );
            return Ok(LoadedConfig {
                command: cmd,
                path: Some(path),
                applied: HashSet::new(),
            });
        }
    };

    let (command, applied) = apply_defaults(cmd, &section, settings.strict)?;
    Ok(LoadedConfig {
        command,
        path: Some(path),
        applied,
    })
}
