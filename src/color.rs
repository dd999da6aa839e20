//! Color switches: `--color/--no-color` options, environment flags and ANSI
//! stripping.

use clap::{Arg, ArgAction};
use log::debug;
use regex::Regex;
use std::sync::LazyLock;

use crate::context::ParamSource;
use crate::runtime::Runtime;

/// Environment variables recognized as color switches, with the value they
/// pass to the `--color` flag when set to a truthy value.
pub const COLOR_ENV_VARS: &[(&str, bool)] = &[
    ("COLOR", true),
    ("COLORS", true),
    ("CLICOLOR", true),
    ("CLICOLORS", true),
    ("FORCE_COLOR", true),
    ("FORCE_COLORS", true),
    ("CLICOLOR_FORCE", true),
    ("CLICOLORS_FORCE", true),
    ("NOCOLOR", false),
    ("NOCOLORS", false),
    ("NO_COLOR", false),
    ("NO_COLORS", false),
];

pub const COLOR_ID: &str = "color";
pub const NO_COLOR_ID: &str = "no_color";

static ANSI_ESCAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\x1b\[[0-?]*[ -/]*[@-~]|\x1b\][^\x07\x1b]*(?:\x07|\x1b\\)|\x1b[@-Z\\-_]")
        .expect("valid ANSI escape pattern")
});

/// Normalize an environment value the way INI booleans are read. Values that
/// are neither true nor false count as true: the variable is set after all.
pub fn parse_env_bool(value: &str) -> bool {
    match value.trim().to_lowercase().as_str() {
        "0" | "no" | "false" | "off" => false,
        _ => true,
    }
}

/// Collect the color votes of all recognized variables present in the
/// environment.
pub fn colorize_from_env<R: Runtime>(runtime: &R) -> Vec<bool> {
    let mut votes = Vec::new();
    for (var, default) in COLOR_ENV_VARS {
        let value = match runtime.env_var(var) {
            Ok(value) => parse_env_bool(&value),
            Err(std::env::VarError::NotUnicode(_)) => true,
            Err(std::env::VarError::NotPresent) => continue,
        };
        debug!("Color flag {}={} found in environment", var, value);
        votes.push(*default ^ !value);
    }
    votes
}

/// Re-interpret the color value against the environment. The environment only
/// wins over the built-in default: a value from the command line or from a
/// configuration file is kept.
pub fn resolve_color<R: Runtime>(runtime: &R, value: bool, source: ParamSource) -> bool {
    if source != ParamSource::Default {
        return value;
    }
    let votes = colorize_from_env(runtime);
    if votes.is_empty() {
        value
    } else {
        votes.contains(&true)
    }
}

/// Scan raw arguments for the last color flag. Stops at `--`.
pub fn color_from_args(args: &[String]) -> Option<bool> {
    let mut color = None;
    for arg in args {
        match arg.as_str() {
            "--" => break,
            "--color" | "--ansi" => color = Some(true),
            "--no-color" | "--no-ansi" => color = Some(false),
            _ => {}
        }
    }
    color
}

/// The `--color/--no-color` pair, aliased by `--ansi/--no-ansi`.
pub fn color_args() -> Vec<Arg> {
    vec![
        Arg::new(COLOR_ID)
            .long("color")
            .visible_alias("ansi")
            .action(ArgAction::SetTrue)
            .overrides_with(NO_COLOR_ID)
            .help("Keep colors and ANSI codes in output. Enabled by default.")
            .long_help(
                "Keep colors and ANSI codes in output. Enabled by default. \
                 Also read from the COLOR, FORCE_COLOR and NO_COLOR family of variables.",
            ),
        Arg::new(NO_COLOR_ID)
            .long("no-color")
            .visible_alias("no-ansi")
            .action(ArgAction::SetTrue)
            .overrides_with(COLOR_ID)
            .help("Strip out all colors and all ANSI codes from output."),
    ]
}

/// Remove ANSI escape sequences from `text`.
pub fn strip_ansi(text: &str) -> String {
    ANSI_ESCAPE.replace_all(text, "").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::MockRuntime;
    use std::collections::HashMap;

    fn runtime_with_env(vars: &[(&str, &str)]) -> MockRuntime {
        let env: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let mut runtime = MockRuntime::new();
        runtime.expect_env_var().returning(move |key| {
            env.get(key)
                .cloned()
                .ok_or(std::env::VarError::NotPresent)
        });
        runtime
    }

    #[test]
    fn test_parse_env_bool() {
        for value in ["1", "yes", "TRUE", "on", "", "whatever"] {
            assert!(parse_env_bool(value), "{:?}", value);
        }
        for value in ["0", "no", "False", "OFF", " off "] {
            assert!(!parse_env_bool(value), "{:?}", value);
        }
    }

    #[test]
    fn test_no_env_keeps_value() {
        let runtime = runtime_with_env(&[]);
        assert!(resolve_color(&runtime, true, ParamSource::Default));
        assert!(!resolve_color(&runtime, false, ParamSource::Default));
    }

    #[test]
    fn test_no_color_env_disables_default() {
        let runtime = runtime_with_env(&[("NO_COLOR", "1")]);
        assert!(!resolve_color(&runtime, true, ParamSource::Default));
    }

    #[test]
    fn test_no_color_set_to_false_enables() {
        let runtime = runtime_with_env(&[("NO_COLOR", "false")]);
        assert!(resolve_color(&runtime, false, ParamSource::Default));
    }

    #[test]
    fn test_one_positive_vote_is_enough() {
        let runtime = runtime_with_env(&[("NO_COLOR", ""), ("FORCE_COLOR", "1")]);
        assert!(resolve_color(&runtime, false, ParamSource::Default));
    }

    #[test]
    fn test_env_does_not_override_explicit_sources() {
        let runtime = runtime_with_env(&[("NO_COLOR", "1")]);
        assert!(resolve_color(&runtime, true, ParamSource::CommandLine));
        assert!(resolve_color(&runtime, true, ParamSource::DefaultMap));
    }

    #[test]
    fn test_color_from_args_last_wins() {
        let args = |v: &[&str]| v.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        assert_eq!(color_from_args(&args(&["sub"])), None);
        assert_eq!(color_from_args(&args(&["--no-color"])), Some(false));
        assert_eq!(
            color_from_args(&args(&["--no-ansi", "x", "--color"])),
            Some(true)
        );
        assert_eq!(color_from_args(&args(&["--", "--no-color"])), None);
    }

    #[test]
    fn test_color_args_override_each_other() {
        let cmd = clap::Command::new("cli").args(color_args());
        let matches = cmd
            .clone()
            .try_get_matches_from(["cli", "--no-color", "--ansi"])
            .unwrap();
        assert!(matches.get_flag(COLOR_ID));
        assert!(!matches.get_flag(NO_COLOR_ID));

        let matches = cmd.try_get_matches_from(["cli", "--no-ansi"]).unwrap();
        assert!(matches.get_flag(NO_COLOR_ID));
    }

    #[test]
    fn test_strip_ansi() {
        assert_eq!(strip_ansi("\u{1b}[31mred\u{1b}[0m plain"), "red plain");
        assert_eq!(strip_ansi("\u{1b}[1;38;5;208mbold\u{1b}[0m"), "bold");
        assert_eq!(
            strip_ansi("\u{1b}]8;;http://x\u{1b}\\link\u{1b}]8;;\u{1b}\\"),
            "link"
        );
        assert_eq!(strip_ansi("no codes"), "no codes");
    }
}
