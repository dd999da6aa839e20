//! Preset parameters and their merge into user-defined commands.

use anyhow::Result;
use clap::{Arg, ArgAction, Command};
use std::collections::{HashMap, HashSet};

use crate::color::color_args;
use crate::config::config_args;
use crate::error::ExtraError;
use crate::logging::verbosity_arg;

pub const TIME_ID: &str = "time";
pub const NO_TIME_ID: &str = "no_time";
pub const SHOW_PARAMS_ID: &str = "show_params";
pub const VERSION_ID: &str = "version";
pub const HELP_ID: &str = "help";

/// Which parameters to add on top of the ones a command already declares.
#[derive(Debug, Clone, Default)]
pub enum ExtraParams {
    /// The default preset
    #[default]
    Defaults,
    /// Exactly these parameters, instead of the preset
    Replace(Vec<Arg>),
    /// The preset followed by these parameters
    Extend(Vec<Arg>),
}

/// The `--time/--no-time` pair.
pub fn time_args() -> Vec<Arg> {
    vec![
        Arg::new(TIME_ID)
            .long("time")
            .action(ArgAction::SetTrue)
            .overrides_with(NO_TIME_ID)
            .help("Measure and print elapsed execution time."),
        Arg::new(NO_TIME_ID)
            .long("no-time")
            .action(ArgAction::SetTrue)
            .overrides_with(TIME_ID)
            .help("Do not measure execution time. Default."),
    ]
}

pub fn show_params_arg() -> Arg {
    Arg::new(SHOW_PARAMS_ID)
        .long("show-params")
        .action(ArgAction::SetTrue)
        .help("Show all CLI parameters, their provenance, defaults and value, then exit.")
}

pub fn version_arg() -> Arg {
    Arg::new(VERSION_ID)
        .long("version")
        .action(ArgAction::Version)
        .help("Show the version and exit.")
}

pub fn help_arg() -> Arg {
    Arg::new(HELP_ID)
        .short('h')
        .long("help")
        .action(ArgAction::Help)
        .help("Show this message and exit.")
}

/// The default preset for `cmd`. `--version` is only part of it when the
/// command declares a version.
pub fn default_params(cmd: &Command) -> Vec<Arg> {
    let mut params = time_args();
    params.extend(color_args());
    params.extend(config_args(""));
    params.push(show_params_arg());
    params.push(verbosity_arg());
    if cmd.get_version().is_some() {
        params.push(version_arg());
    }
    params.push(help_arg());
    params
}

fn arg_names(arg: &Arg) -> Vec<String> {
    let mut names = vec![arg.get_id().as_str().to_string()];
    if let Some(long) = arg.get_long() {
        names.push(format!("--{}", long));
    }
    for alias in arg.get_all_aliases().unwrap_or_default() {
        names.push(format!("--{}", alias));
    }
    if let Some(short) = arg.get_short() {
        names.push(format!("-{}", short));
    }
    names
}

/// Fail if any id, long or short name of `params` is already taken by `cmd`
/// or by another of `params`.
pub fn check_duplicates(cmd: &Command, params: &[Arg]) -> Result<()> {
    let mut seen: HashSet<String> = cmd.get_arguments().flat_map(arg_names).collect();
    for arg in params {
        for name in arg_names(arg) {
            if !seen.insert(name.clone()) {
                return Err(ExtraError::DuplicateParameter {
                    command: cmd.get_name().to_string(),
                    name,
                }
                .into());
            }
        }
    }
    Ok(())
}

/// Append `params` to `cmd`, taking over the help and version flags when the
/// list provides its own.
pub fn merge_params(mut cmd: Command, params: Vec<Arg>) -> Result<Command> {
    check_duplicates(&cmd, &params)?;
    for arg in &params {
        match arg.get_action() {
            ArgAction::Help => cmd = cmd.disable_help_flag(true),
            ArgAction::Version => cmd = cmd.disable_version_flag(true),
            _ => {}
        }
    }
    Ok(cmd.args(params))
}

/// Resolve an `ExtraParams` selection against `cmd` and merge it.
pub fn with_params(cmd: Command, params: ExtraParams) -> Result<Command> {
    let params = match params {
        ExtraParams::Defaults => default_params(&cmd),
        ExtraParams::Replace(params) => params,
        ExtraParams::Extend(extra) => {
            let mut params = default_params(&cmd);
            params.extend(extra);
            params
        }
    };
    merge_params(cmd, params)
}

/// Turn a command into a group: a subcommand is required, and help is shown
/// when invoked without arguments.
pub fn as_group(cmd: Command) -> Command {
    cmd.subcommand_required(true).arg_required_else_help(true)
}

fn arg_spec(arg: &Arg) -> String {
    let mut names = Vec::new();
    if let Some(short) = arg.get_short() {
        names.push(format!("-{}", short));
    }
    if let Some(long) = arg.get_long() {
        names.push(format!("--{}", long));
    }
    let mut spec = names.join(", ");
    if arg.get_action().takes_values() {
        let value_names: Vec<String> = match arg.get_value_names() {
            Some(values) => values.iter().map(|v| v.to_string()).collect(),
            None => vec![arg.get_id().as_str().to_uppercase()],
        };
        if !spec.is_empty() {
            spec.push(' ');
        }
        spec.push_str(&value_names.join(" "));
    }
    spec
}

/// Render a table of every parameter of the command tree.
/// `from_config` lists the dotted paths whose default comes from the
/// configuration file.
pub fn show_params(cmd: &Command, from_config: &HashSet<String>) -> String {
    let header = ["ID", "Spec.", "Action", "Default", "Env. vars", "Source"]
        .map(String::from)
        .to_vec();
    let mut rows = vec![header];
    collect_rows(cmd, cmd.get_name(), "", from_config, &mut rows);

    let mut widths: HashMap<usize, usize> = HashMap::new();
    for row in &rows {
        for (i, cell) in row.iter().enumerate() {
            let width = widths.entry(i).or_default();
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut table = String::new();
    for row in rows {
        let line: Vec<String> = row
            .iter()
            .enumerate()
            .map(|(i, cell)| format!("{:<width$}", cell, width = widths[&i]))
            .collect();
        table.push_str(line.join("  ").trim_end());
        table.push('\n');
    }
    table
}

/// `command_path` names the row IDs and starts with the root name.
/// `key_prefix` is relative to the root, like the keys of `from_config`.
fn collect_rows(
    cmd: &Command,
    command_path: &str,
    key_prefix: &str,
    from_config: &HashSet<String>,
    rows: &mut Vec<Vec<String>>,
) {
    for arg in cmd.get_arguments() {
        let key = format!("{}{}", key_prefix, arg.get_id());
        let defaults: Vec<String> = arg
            .get_default_values()
            .iter()
            .map(|v| v.to_string_lossy().into_owned())
            .collect();
        let source = if from_config.contains(&key) {
            "DEFAULT_MAP"
        } else {
            "DEFAULT"
        };
        rows.push(vec![
            format!("{}.{}", command_path, arg.get_id()),
            arg_spec(arg),
            format!("{:?}", arg.get_action()),
            defaults.join(", "),
            arg.get_env()
                .map(|env| env.to_string_lossy().into_owned())
                .unwrap_or_default(),
            source.to_string(),
        ]);
    }
    for sub in cmd.get_subcommands() {
        collect_rows(
            sub,
            &format!("{}.{}", command_path, sub.get_name()),
            &format!("{}{}.", key_prefix, sub.get_name()),
            from_config,
            rows,
        );
    }
}
