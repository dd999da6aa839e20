//! Helpers to run external commands and print their traces.

use anyhow::{Context, Result};
use log::debug;
use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::io::{self, Write};
use std::process::Command;

use crate::error::ExtraError;
use crate::runtime::{RealRuntime, Runtime};
use crate::theme::default_theme;

pub const PROMPT: &str = "► ";
/// Blank prefix as wide as [`PROMPT`].
pub const INDENT: &str = "  ";

/// Extra environment variables, sorted by name.
pub type EnvVars = BTreeMap<String, String>;

/// Drop `None` entries and turn the rest into strings. Accepts anything
/// path-like.
pub fn args_cleanup<I, T>(args: I) -> Vec<String>
where
    I: IntoIterator<Item = Option<T>>,
    T: AsRef<OsStr>,
{
    args.into_iter()
        .flatten()
        .map(|arg| arg.as_ref().to_string_lossy().into_owned())
        .collect()
}

/// Render a command line the way it would appear typed in a terminal.
pub fn format_cli(cmd: &[String], extra_env: Option<&EnvVars>) -> Result<String> {
    if cmd.is_empty() {
        return Err(ExtraError::EmptyCommand.into());
    }
    let env_prefix: String = extra_env
        .into_iter()
        .flatten()
        .map(|(key, value)| format!("{}={} ", key, value))
        .collect();
    let cmd_str = default_theme().invoked_command.apply(&cmd.join(" "));
    Ok(format!("{}{}{}", PROMPT, env_prefix, cmd_str))
}

/// Prefix every non-blank line of `text` with [`INDENT`].
fn indent(text: &str) -> String {
    text.split_inclusive('\n')
        .map(|line| {
            if line.trim().is_empty() {
                line.to_string()
            } else {
                format!("{}{}", INDENT, line)
            }
        })
        .collect()
}

/// Print a full trace of a command execution: the command line, then its
/// output, error and return code when provided.
pub fn print_cli_output(
    out: &mut dyn Write,
    cmd: &[String],
    output: Option<&str>,
    error: Option<&str>,
    code: Option<i32>,
    extra_env: Option<&EnvVars>,
) -> Result<()> {
    let theme = default_theme();
    writeln!(out, "\n{}", format_cli(cmd, extra_env)?)?;
    if let Some(output) = output.filter(|o| !o.is_empty()) {
        writeln!(out, "{}", indent(output))?;
    }
    if let Some(error) = error.filter(|e| !e.is_empty()) {
        writeln!(out, "{}", indent(&theme.error.apply(error)))?;
    }
    if let Some(code) = code {
        writeln!(out, "{}", theme.error.apply(&format!("{}Return code: {}", INDENT, code)))?;
    }
    Ok(())
}

/// Copy of the environment from `runtime` updated with `extend`. `None`
/// when there is nothing to extend, meaning the child inherits as is.
pub fn env_copy_from<R: Runtime>(runtime: &R, extend: Option<&EnvVars>) -> Option<EnvVars> {
    let extend = extend.filter(|vars| !vars.is_empty())?;
    let mut env: EnvVars = runtime.env_vars().into_iter().collect();
    env.extend(extend.iter().map(|(k, v)| (k.clone(), v.clone())));
    Some(env)
}

/// [`env_copy_from`] against the process environment.
pub fn env_copy(extend: Option<&EnvVars>) -> Option<EnvVars> {
    env_copy_from(&RealRuntime, extend)
}

#[cfg(unix)]
fn exit_code(status: std::process::ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    status
        .code()
        .or_else(|| status.signal().map(|signal| -signal))
        .unwrap_or(-1)
}

#[cfg(not(unix))]
fn exit_code(status: std::process::ExitStatus) -> i32 {
    status.code().unwrap_or(-1)
}

/// Run `args` as a process and capture its output. Returns the exit code,
/// stdout and stderr. Output must be valid UTF-8.
#[tracing::instrument(level = "debug", skip(extra_env))]
pub fn run_cmd(
    args: &[String],
    extra_env: Option<&EnvVars>,
    print_output: bool,
) -> Result<(i32, String, String)> {
    let (program, rest) = args.split_first().ok_or(ExtraError::EmptyCommand)?;
    let mut command = Command::new(program);
    command.args(rest);
    if let Some(env) = env_copy(extra_env) {
        command.env_clear().envs(env);
    }

    debug!("Running {:?}", args);
    let output = command
        .output()
        .with_context(|| format!("Failed to run {}", program))?;
    let stdout = String::from_utf8(output.stdout)
        .with_context(|| format!("Output of {} is not valid UTF-8", program))?;
    let stderr = String::from_utf8(output.stderr)
        .with_context(|| format!("Error output of {} is not valid UTF-8", program))?;
    let code = exit_code(output.status);

    if print_output {
        print_cli_output(
            &mut io::stdout().lock(),
            args,
            Some(&stdout),
            Some(&stderr),
            Some(code),
            extra_env,
        )?;
    }
    Ok((code, stdout, stderr))
}
