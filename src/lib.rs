//! Drop-in extensions for clap: preset options, colored help screens,
//! configuration files and helpers to test and run CLIs.
//!
//! Everything clap exports under the names used to build commands is
//! re-exported here, so `clap_extra` can stand in for `clap` in a CLI's
//! imports.

pub mod color;
pub mod command;
pub mod config;
pub mod context;
pub mod error;
pub mod help;
pub mod logging;
pub mod params;
pub mod plugins;
pub mod run;
pub mod runtime;
pub mod testing;
pub mod theme;

use std::io::{self, Write};

pub use clap::builder::PossibleValuesParser;
pub use clap::parser::ValueSource;
pub use clap::{
    Arg, ArgAction, ArgGroup, ArgMatches, ColorChoice, Command, ValueEnum, ValueHint,
    value_parser,
};

pub use color::strip_ansi;
pub use command::{ExtraCommand, extra_command, extra_command_with, extra_group, extra_group_with};
pub use config::{ConfigFormat, ConfigSettings};
pub use context::{ExtraContext, ParamSource};
pub use error::ExtraError;
pub use help::HelpFormatter;
pub use logging::Verbosity;
pub use params::ExtraParams;
pub use testing::{ExtraCliRunner, InvokeResult};
pub use theme::{HelpTheme, default_theme, nocolor_theme};

/// Write `message` and a newline, stripping ANSI codes unless `color` is on.
pub fn echo(out: &mut dyn Write, message: &str, color: bool) -> io::Result<()> {
    if color {
        writeln!(out, "{}", message)
    } else {
        writeln!(out, "{}", strip_ansi(message))
    }
}

#[cfg(test)]
pub mod test_utils {
    use crate::runtime::MockRuntime;
    use std::path::PathBuf;
    use std::sync::{Mutex, MutexGuard};

    static LOGGER_LOCK: Mutex<()> = Mutex::new(());

    /// Serialize tests touching the global log level.
    pub fn logger_lock() -> MutexGuard<'static, ()> {
        LOGGER_LOCK
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn test_home() -> PathBuf {
        PathBuf::from("/home/user")
    }

    /// Configure a mock runtime with common defaults for tests.
    /// - config dir set to `~/.config` under [`test_home`]
    /// - no environment variable set
    pub fn configure_mock_runtime_basics(runtime: &mut MockRuntime) {
        runtime
            .expect_config_dir()
            .returning(|| Some(test_home().join(".config")));
        runtime
            .expect_env_var()
            .returning(|_| Err(std::env::VarError::NotPresent));
        runtime.expect_env_vars().returning(Vec::new);
    }
}
