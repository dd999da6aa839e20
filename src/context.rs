//! Per-invocation shared state handed to command handlers.

use clap::ArgMatches;
use clap::parser::ValueSource;
use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use crate::theme::HelpTheme;

/// Where the value of a parameter comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamSource {
    CommandLine,
    EnvVariable,
    /// Default injected from the configuration file
    DefaultMap,
    Default,
}

impl std::fmt::Display for ParamSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ParamSource::CommandLine => "COMMANDLINE",
            ParamSource::EnvVariable => "ENVIRONMENT",
            ParamSource::DefaultMap => "DEFAULT_MAP",
            ParamSource::Default => "DEFAULT",
        };
        f.write_str(label)
    }
}

type CloseCallback = Box<dyn FnOnce(&ExtraContext)>;

pub struct ExtraContext {
    /// Arguments as received, before any parsing, without the program name.
    pub raw_args: Vec<String>,
    pub matches: ArgMatches,
    pub color: bool,
    pub theme: HelpTheme,
    /// Configuration file the defaults were read from, if any.
    pub config_path: Option<PathBuf>,
    config_params: HashSet<String>,
    meta: BTreeMap<String, String>,
    start: Instant,
    close_callbacks: Vec<CloseCallback>,
}

impl std::fmt::Debug for ExtraContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtraContext")
            .field("raw_args", &self.raw_args)
            .field("color", &self.color)
            .field("config_path", &self.config_path)
            .field("meta", &self.meta)
            .finish_non_exhaustive()
    }
}

impl ExtraContext {
    pub fn new(raw_args: Vec<String>, matches: ArgMatches, color: bool, theme: HelpTheme) -> Self {
        Self {
            raw_args,
            matches,
            color,
            theme,
            config_path: None,
            config_params: HashSet::new(),
            meta: BTreeMap::new(),
            start: Instant::now(),
            close_callbacks: Vec::new(),
        }
    }

    /// Record the parameters whose defaults were read from `path`. Parameters
    /// are addressed by dotted paths relative to the root command, like
    /// `subcommand.param_id`.
    pub fn with_config(mut self, path: Option<PathBuf>, params: HashSet<String>) -> Self {
        self.config_path = path;
        self.config_params = params;
        self
    }

    pub fn with_start(mut self, start: Instant) -> Self {
        self.start = start;
        self
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn meta(&self, key: &str) -> Option<&str> {
        self.meta.get(key).map(String::as_str)
    }

    pub fn set_meta(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.meta.insert(key.into(), value.into());
    }

    /// Deepest invoked subcommand: its dotted path and its matches.
    pub fn invoked_subcommand(&self) -> (Vec<String>, &ArgMatches) {
        let mut path = Vec::new();
        let mut matches = &self.matches;
        while let Some((name, sub)) = matches.subcommand() {
            path.push(name.to_string());
            matches = sub;
        }
        (path, matches)
    }

    /// Source of a parameter value, addressed as `id` or `sub.id`.
    pub fn param_source(&self, param: &str) -> Option<ParamSource> {
        let mut parts: Vec<&str> = param.split('.').collect();
        let id = parts.pop()?;
        let mut matches = &self.matches;
        for name in parts {
            matches = matches.subcommand_matches(name)?;
        }
        if !matches.ids().any(|known| known.as_str() == id) {
            return None;
        }
        let source = match matches.value_source(id)? {
            ValueSource::CommandLine => ParamSource::CommandLine,
            ValueSource::EnvVariable => ParamSource::EnvVariable,
            _ if self.config_params.contains(param) => ParamSource::DefaultMap,
            _ => ParamSource::Default,
        };
        Some(source)
    }

    /// Register a callback to run when the invocation ends.
    pub fn call_on_close<F>(&mut self, callback: F)
    where
        F: FnOnce(&ExtraContext) + 'static,
    {
        self.close_callbacks.push(Box::new(callback));
    }

    /// Run close callbacks in registration order. Each runs once.
    pub fn close(&mut self) {
        let callbacks = std::mem::take(&mut self.close_callbacks);
        for callback in callbacks {
            callback(self);
        }
    }
}
