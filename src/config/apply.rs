//! Injection of configuration values into a command tree as defaults.

use anyhow::Result;
use clap::{Arg, Command};
use log::debug;
use serde_json::{Map, Value};
use std::collections::HashSet;

use crate::error::ExtraError;

/// Parameters that never take their value from a configuration file.
pub const EXCLUDED_PARAMS: &[&str] = &["config", "no_config", "help", "version", "show_params"];

/// Find the argument a configuration key refers to. Keys match an argument
/// id or a long name, dashes and underscores being interchangeable.
pub fn find_arg<'a>(cmd: &'a Command, key: &str) -> Option<&'a Arg> {
    let snake = key.replace('-', "_");
    let kebab = key.replace('_', "-");
    cmd.get_arguments().find(|arg| {
        let id = arg.get_id().as_str();
        id == key || id == snake || arg.get_long() == Some(kebab.as_str())
    })
}

/// Turn a configuration value into the default values of an argument.
/// `None` means the value should be ignored.
fn to_defaults(key: &str, value: &Value) -> Result<Option<Vec<String>>, ExtraError> {
    let scalar = |value: &Value| -> Result<String, ExtraError> {
        match value {
            Value::String(s) => Ok(s.clone()),
            Value::Bool(b) => Ok(b.to_string()),
            Value::Number(n) => Ok(n.to_string()),
            _ => Err(ExtraError::InvalidConfigValue {
                key: key.to_string(),
                reason: "nested tables and lists are not supported".to_string(),
            }),
        }
    };

    match value {
        Value::Null => Ok(None),
        Value::Array(items) => items
            .iter()
            .map(scalar)
            .collect::<Result<Vec<_>, _>>()
            .map(Some),
        Value::Object(_) => Err(ExtraError::InvalidConfigValue {
            key: key.to_string(),
            reason: "a table cannot be the value of a parameter".to_string(),
        }),
        other => Ok(Some(vec![scalar(other)?])),
    }
}

/// Apply `section` to `cmd`, recursing into subcommand tables. Returns the
/// updated command and the dotted paths (`sub.param_id`) of the parameters
/// whose default now comes from the configuration.
pub fn apply_defaults(
    cmd: Command,
    section: &Map<String, Value>,
    strict: bool,
) -> Result<(Command, HashSet<String>)> {
    let command_path = cmd.get_name().to_string();
    apply_to_command(cmd, section, strict, &command_path, "")
}

fn apply_to_command(
    mut cmd: Command,
    section: &Map<String, Value>,
    strict: bool,
    command_path: &str,
    prefix: &str,
) -> Result<(Command, HashSet<String>)> {
    let mut applied = HashSet::new();

    for (key, value) in section {
        if let Value::Object(table) = value
            && let Some(sub) = cmd.find_subcommand(key).cloned()
        {
            let name = sub.get_name().to_string();
            let sub_path = format!("{} {}", command_path, name);
            let sub_prefix = format!("{}{}.", prefix, name);
            let (sub, sub_applied) =
                apply_to_command(sub, table, strict, &sub_path, &sub_prefix)?;
            cmd = cmd.mut_subcommand(name, move |_| sub);
            applied.extend(sub_applied);
            continue;
        }

        let Some(arg) = find_arg(&cmd, key) else {
            if strict {
                return Err(ExtraError::UnknownConfigKey {
                    command: command_path.to_string(),
                    key: key.clone(),
                }
                .into());
            }
            debug!("Ignoring unrecognized configuration key {} for {}", key, command_path);
            continue;
        };

        let id = arg.get_id().as_str().to_string();
        if EXCLUDED_PARAMS.contains(&id.as_str()) {
            debug!("Parameter {} cannot be set from configuration", id);
            continue;
        }

        let Some(defaults) = to_defaults(key, value)? else {
            continue;
        };
        debug!("Default of {}{} set from configuration: {:?}", prefix, id, defaults);
        cmd = cmd.mut_arg(id.clone(), move |arg| arg.default_values(defaults));
        applied.insert(format!("{}{}", prefix, id));
    }

    Ok((cmd, applied))
}
