//! Commands and groups with preset options, configuration files and
//! colorized help.

use anyhow::Result;
use clap::Command;
use clap::error::ErrorKind;
use log::{debug, info};
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use crate::color::{COLOR_ID, NO_COLOR_ID, color_from_args, resolve_color};
use crate::config::{CONFIG_ID, ConfigFormat, ConfigRequest, ConfigSettings, LoadedConfig};
use crate::context::{ExtraContext, ParamSource};
use crate::help::{HelpFormatter, highlight};
use crate::logging::{VERBOSITY_ID, Verbosity, init_logger, reset_logger};
use crate::params::{ExtraParams, SHOW_PARAMS_ID, TIME_ID, as_group, show_params, with_params};
use crate::runtime::{RealRuntime, Runtime};
use crate::theme::{HelpTheme, default_theme, nocolor_theme};

/// A clap command wrapped with the extra invocation pipeline.
#[derive(Debug, Clone)]
pub struct ExtraCommand<R: Runtime = RealRuntime> {
    command: Command,
    runtime: R,
    theme: HelpTheme,
    config: ConfigSettings,
}

/// Wrap `cmd` with the default preset parameters.
pub fn extra_command(cmd: Command) -> Result<ExtraCommand> {
    ExtraCommand::with_params(cmd, ExtraParams::Defaults)
}

/// Same as [`extra_command`], with an explicit parameter selection.
pub fn extra_command_with(cmd: Command, params: ExtraParams) -> Result<ExtraCommand> {
    ExtraCommand::with_params(cmd, params)
}

/// Wrap `cmd` as a group: a subcommand is required.
pub fn extra_group(cmd: Command) -> Result<ExtraCommand> {
    ExtraCommand::with_params(as_group(cmd), ExtraParams::Defaults)
}

/// Same as [`extra_group`], with an explicit parameter selection.
pub fn extra_group_with(cmd: Command, params: ExtraParams) -> Result<ExtraCommand> {
    ExtraCommand::with_params(as_group(cmd), params)
}

impl ExtraCommand<RealRuntime> {
    pub fn new(cmd: Command) -> Result<Self> {
        Self::with_params(cmd, ExtraParams::Defaults)
    }

    pub fn with_params(cmd: Command, params: ExtraParams) -> Result<Self> {
        let app_name = cmd.get_name().to_string();
        Ok(Self {
            command: with_params(cmd, params)?,
            runtime: RealRuntime,
            theme: default_theme(),
            config: ConfigSettings::new(app_name),
        })
    }
}

impl<R: Runtime> ExtraCommand<R> {
    pub fn runtime<R2: Runtime>(self, runtime: R2) -> ExtraCommand<R2> {
        ExtraCommand {
            command: self.command,
            runtime,
            theme: self.theme,
            config: self.config,
        }
    }

    pub fn theme(mut self, theme: HelpTheme) -> Self {
        self.theme = theme;
        self
    }

    /// Reject configuration keys matching no parameter.
    pub fn strict(mut self, strict: bool) -> Self {
        self.config.strict = strict;
        self
    }

    pub fn config_formats(mut self, formats: Vec<ConfigFormat>) -> Self {
        self.config.formats = formats;
        self
    }

    /// Directory searched for configuration files by default.
    pub fn config_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.search_dir = Some(dir.into());
        self
    }

    pub fn app_name(mut self, name: impl Into<String>) -> Self {
        self.config.app_name = name.into();
        self
    }

    pub fn command(&self) -> &Command {
        &self.command
    }

    fn has_param(&self, id: &str) -> bool {
        self.command
            .get_arguments()
            .any(|arg| arg.get_id().as_str() == id)
    }

    fn flag_in_args(raw_args: &[String], flag: &str) -> bool {
        raw_args
            .iter()
            .take_while(|arg| arg.as_str() != "--")
            .any(|arg| arg == flag)
    }

    /// The command with its `--config` help pointing to the default location.
    fn prepared_command(&self) -> Command {
        if !self.has_param(CONFIG_ID) {
            return self.command.clone();
        }
        let location = self.config.default_location(&self.runtime);
        if location.is_empty() {
            return self.command.clone();
        }
        self.command.clone().mut_arg(CONFIG_ID, |arg| {
            arg.long_help(format!(
                "Location of the configuration file. Supports glob patterns. \
                 Defaults to the first file matching {}",
                location
            ))
        })
    }

    /// Color value and where it comes from, before parsing.
    fn color_request(&self, raw_args: &[String], loaded: &LoadedConfig) -> (bool, ParamSource) {
        if !self.has_param(COLOR_ID) {
            return (true, ParamSource::Default);
        }
        if let Some(color) = color_from_args(raw_args) {
            return (color, ParamSource::CommandLine);
        }
        let config_default = |id: &str| -> Option<bool> {
            if !loaded.applied.contains(id) {
                return None;
            }
            let arg = loaded
                .command
                .get_arguments()
                .find(|arg| arg.get_id().as_str() == id)?;
            let value = arg.get_default_values().first()?;
            Some(value.to_string_lossy().eq_ignore_ascii_case("true"))
        };
        if config_default(NO_COLOR_ID) == Some(true) {
            return (false, ParamSource::DefaultMap);
        }
        if let Some(color) = config_default(COLOR_ID) {
            return (color, ParamSource::DefaultMap);
        }
        (true, ParamSource::Default)
    }

    fn render_help(&self, cmd: &Command, help: &str, color: bool) -> String {
        if !color {
            return help.to_string();
        }
        HelpFormatter::for_command(self.theme.clone(), cmd).highlight_extra_keywords(help)
    }

    /// Run the command against `args` (without the program name), writing
    /// to `out` and `err`. Returns the exit code; the error side only
    /// reports failures to write.
    pub fn run<I, T, F>(
        &self,
        args: I,
        out: &mut dyn Write,
        err: &mut dyn Write,
        handler: F,
    ) -> Result<i32>
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
        F: FnOnce(&mut ExtraContext, &mut dyn Write) -> Result<()>,
    {
        let start = Instant::now();
        let raw_args: Vec<String> = args.into_iter().map(Into::into).collect();
        debug!("Raw arguments: {:?}", raw_args);

        let request = if self.has_param(CONFIG_ID) {
            crate::config::config_from_args(&raw_args)
        } else {
            ConfigRequest::Disabled
        };
        let loaded = match crate::config::load_into(
            &self.runtime,
            self.prepared_command(),
            &request,
            &self.config,
        ) {
            Ok(loaded) => loaded,
            Err(e) => {
                let theme = self.early_theme(&raw_args);
                writeln!(err, "{} {:#}", theme.error.apply("error:"), e)?;
                return Ok(2);
            }
        };

        let (value, source) = self.color_request(&raw_args, &loaded);
        let color = resolve_color(&self.runtime, value, source);
        let theme = if color {
            self.theme.clone()
        } else {
            nocolor_theme()
        };

        if self.has_param(SHOW_PARAMS_ID) && Self::flag_in_args(&raw_args, "--show-params") {
            let table = show_params(&loaded.command, &loaded.applied);
            write!(out, "{}", table)?;
            return Ok(0);
        }

        let mut cmd = loaded.command;
        let bin_name = cmd.get_name().to_string();
        let matches = match cmd
            .try_get_matches_from_mut(std::iter::once(bin_name.clone()).chain(raw_args.clone()))
        {
            Ok(matches) => matches,
            Err(e) => return self.report_parse_error(&cmd, e, color, &theme, out, err),
        };

        let mut ctx = ExtraContext::new(raw_args, matches, color, theme)
            .with_config(loaded.path, loaded.applied)
            .with_start(start);

        if let Ok(Some(verbosity)) = ctx.matches.try_get_one::<Verbosity>(VERBOSITY_ID) {
            init_logger(*verbosity, &ctx.theme);
        }
        if let Some(path) = &ctx.config_path {
            info!("Configuration loaded from {}", path.display());
        }

        let result = handler(&mut ctx, out);
        let code = match result {
            Ok(()) => 0,
            Err(e) => match e.downcast_ref::<clap::Error>() {
                Some(clap_err) => {
                    write!(err, "{}", clap_err.render())?;
                    clap_err.exit_code()
                }
                None => {
                    writeln!(err, "{}", ctx.theme.error.apply(&format!("Error: {:#}", e)))?;
                    1
                }
            },
        };

        ctx.close();
        if matches!(ctx.matches.try_get_one::<bool>(TIME_ID), Ok(Some(true))) {
            writeln!(
                out,
                "Execution time: {:.3} seconds.",
                ctx.elapsed().as_secs_f64()
            )?;
        }
        reset_logger();
        Ok(code)
    }

    /// Theme usable before the configuration is loaded.
    fn early_theme(&self, raw_args: &[String]) -> HelpTheme {
        let (value, source) = match color_from_args(raw_args) {
            Some(color) => (color, ParamSource::CommandLine),
            None => (true, ParamSource::Default),
        };
        if resolve_color(&self.runtime, value, source) {
            self.theme.clone()
        } else {
            nocolor_theme()
        }
    }

    fn report_parse_error(
        &self,
        cmd: &Command,
        e: clap::Error,
        color: bool,
        theme: &HelpTheme,
        out: &mut dyn Write,
        err: &mut dyn Write,
    ) -> Result<i32> {
        let rendered = e.render().to_string();
        match e.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                let help = self.render_help(cmd, &rendered, color);
                if e.use_stderr() {
                    write!(err, "{}", help)?;
                } else {
                    write!(out, "{}", help)?;
                }
            }
            ErrorKind::DisplayVersion => {
                let name = regex::escape(cmd.get_name());
                let version = highlight(&rendered, &[&name], &theme.invoked_command, false);
                write!(out, "{}", version)?;
            }
            _ => {
                let message = match rendered.strip_prefix("error:") {
                    Some(rest) => format!("{}{}", theme.error.apply("error:"), rest),
                    None => rendered,
                };
                write!(err, "{}", message)?;
            }
        }
        Ok(e.exit_code())
    }

    /// Run with the process arguments and standard streams.
    pub fn main<F>(&self, handler: F) -> ExitCode
    where
        F: FnOnce(&mut ExtraContext, &mut dyn Write) -> Result<()>,
    {
        let args = std::env::args_os()
            .skip(1)
            .map(|arg| arg.to_string_lossy().into_owned());
        let mut out = io::stdout().lock();
        let mut err = io::stderr().lock();
        match self.run(args, &mut out, &mut err, handler) {
            Ok(code) => ExitCode::from(u8::try_from(code).unwrap_or(1)),
            Err(e) => {
                let _ = writeln!(err, "Error: {:#}", e);
                ExitCode::FAILURE
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::strip_ansi;
    use crate::error::ExtraError;
    use crate::runtime::MockRuntime;
    use crate::test_utils::{configure_mock_runtime_basics, logger_lock};
    use clap::{Arg, ArgAction};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn cli() -> Command {
        Command::new("cli")
            .version("1.2.3")
            .arg(Arg::new("level").long("level").default_value("low"))
            .subcommand(
                Command::new("greet").arg(Arg::new("name").long("name").default_value("world")),
            )
    }

    /// Mock runtime where every glob matches a file holding `config`, or
    /// matches nothing when `config` is `None`.
    fn runtime(config: Option<&'static str>) -> MockRuntime {
        let mut runtime = MockRuntime::new();
        configure_mock_runtime_basics(&mut runtime);
        match config {
            Some(content) => {
                runtime
                    .expect_glob()
                    .returning(|p| Ok(vec![PathBuf::from(p)]));
                runtime.expect_is_file().returning(|_| true);
                runtime
                    .expect_read_to_string()
                    .returning(move |_| Ok(content.to_string()));
            }
            None => {
                runtime.expect_glob().returning(|_| Ok(vec![]));
            }
        }
        runtime
    }

    fn group(runtime: MockRuntime) -> ExtraCommand<MockRuntime> {
        extra_group(cli()).unwrap().runtime(runtime)
    }

    struct Output {
        code: i32,
        out: String,
        err: String,
    }

    fn invoke<F>(cmd: &ExtraCommand<MockRuntime>, args: &[&str], handler: F) -> Output
    where
        F: FnOnce(&mut ExtraContext, &mut dyn Write) -> Result<()>,
    {
        let mut out = Vec::new();
        let mut err = Vec::new();
        let code = cmd
            .run(args.iter().copied(), &mut out, &mut err, handler)
            .unwrap();
        Output {
            code,
            out: String::from_utf8(out).unwrap(),
            err: String::from_utf8(err).unwrap(),
        }
    }

    fn greet(ctx: &mut ExtraContext, out: &mut dyn Write) -> Result<()> {
        let (path, matches) = ctx.invoked_subcommand();
        let name = matches.get_one::<String>("name").cloned().unwrap_or_default();
        writeln!(out, "{} {}", path.join(" "), name)?;
        Ok(())
    }

    #[test]
    fn test_handler_receives_raw_args_and_values() {
        let _guard = logger_lock();
        let cmd = group(runtime(None));

        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_in_handler = Rc::clone(&seen);
        let result = invoke(&cmd, &["--no-config", "greet", "--name", "bob"], |ctx, out| {
            *seen_in_handler.borrow_mut() = ctx.raw_args.clone();
            greet(ctx, out)
        });

        assert_eq!(result.code, 0, "stderr: {}", result.err);
        assert_eq!(result.out, "greet bob\n");
        assert_eq!(*seen.borrow(), vec!["--no-config", "greet", "--name", "bob"]);
    }

    #[test]
    fn test_help_is_colorized_unless_disabled() {
        let _guard = logger_lock();
        let cmd = group(runtime(None));

        let colored = invoke(&cmd, &["--help"], |_, _| Ok(()));
        assert_eq!(colored.code, 0);
        assert!(colored.out.contains("\u{1b}["));
        assert!(strip_ansi(&colored.out).contains("--verbosity <LEVEL>"));

        let plain = invoke(&cmd, &["--no-color", "--help"], |_, _| Ok(()));
        assert_eq!(plain.code, 0);
        assert!(!plain.out.contains("\u{1b}["));
        assert_eq!(plain.out, strip_ansi(&colored.out));
    }

    #[test]
    fn test_no_color_env_strips_help() {
        let _guard = logger_lock();
        let mut runtime = MockRuntime::new();
        runtime
            .expect_config_dir()
            .returning(|| Some(PathBuf::from("/home/user/.config")));
        runtime.expect_glob().returning(|_| Ok(vec![]));
        runtime.expect_env_var().returning(|key| match key {
            "NO_COLOR" => Ok("1".to_string()),
            _ => Err(std::env::VarError::NotPresent),
        });
        let cmd = group(runtime);

        let result = invoke(&cmd, &["--help"], |_, _| Ok(()));
        assert!(!result.out.contains("\u{1b}["));

        // The command line wins over the environment.
        let result = invoke(&cmd, &["--color", "--help"], |_, _| Ok(()));
        assert!(result.out.contains("\u{1b}["));
    }

    #[test]
    fn test_version() {
        let _guard = logger_lock();
        let cmd = group(runtime(None));

        let result = invoke(&cmd, &["--no-color", "--version"], |_, _| {
            panic!("handler must not run")
        });
        assert_eq!(result.code, 0);
        assert_eq!(result.out, "cli 1.2.3\n");
    }

    #[test]
    fn test_version_highlights_name_literally() {
        let _guard = logger_lock();
        let cmd = extra_command(Command::new("c++").version("1.0"))
            .unwrap()
            .runtime(runtime(None));

        let colored = invoke(&cmd, &["--color", "--version"], |_, _| Ok(()));
        assert_eq!(colored.code, 0);
        assert!(
            colored
                .out
                .starts_with(&default_theme().invoked_command.apply("c++"))
        );
        assert_eq!(strip_ansi(&colored.out), "c++ 1.0\n");

        // The dot must not match the 'x' of "axb".
        let cmd = extra_command(Command::new("a.b").version("axb"))
            .unwrap()
            .runtime(runtime(None));
        let colored = invoke(&cmd, &["--color", "--version"], |_, _| Ok(()));
        let styled = default_theme().invoked_command.apply("a.b");
        assert_eq!(colored.out, format!("{} axb\n", styled));
    }

    #[test]
    fn test_usage_error_exit_code() {
        let _guard = logger_lock();
        let cmd = group(runtime(None));

        let result = invoke(&cmd, &["--no-color", "--bogus"], |_, _| Ok(()));
        assert_eq!(result.code, 2);
        assert!(result.err.starts_with("error:"));
        assert!(result.out.is_empty());
    }

    #[test]
    fn test_group_without_args_shows_help() {
        let _guard = logger_lock();
        let cmd = group(runtime(None));

        let result = invoke(&cmd, &[], |_, _| Ok(()));
        assert_eq!(result.code, 2);
        assert!(strip_ansi(&result.err).contains("Usage:"));
    }

    #[test]
    fn test_handler_error() {
        let _guard = logger_lock();
        let cmd = group(runtime(None));

        let result = invoke(&cmd, &["--no-color", "greet"], |_, _| {
            Err(anyhow::anyhow!("boom"))
        });
        assert_eq!(result.code, 1);
        assert_eq!(result.err, "Error: boom\n");
    }

    #[test]
    fn test_config_file_sets_defaults() {
        let _guard = logger_lock();
        let cmd = group(runtime(Some(
            "[cli]\nlevel = \"high\"\n\n[cli.greet]\nname = \"config\"\n",
        )));

        let result = invoke(&cmd, &["--config", "/etc/cli.toml", "greet"], |ctx, out| {
            assert_eq!(ctx.matches.get_one::<String>("level").unwrap(), "high");
            assert_eq!(ctx.param_source("level"), Some(ParamSource::DefaultMap));
            assert_eq!(ctx.param_source("greet.name"), Some(ParamSource::DefaultMap));
            assert_eq!(ctx.config_path, Some(PathBuf::from("/etc/cli.toml")));
            greet(ctx, out)
        });
        assert_eq!(result.code, 0, "stderr: {}", result.err);
        assert_eq!(result.out, "greet config\n");

        // Command line still wins.
        let result = invoke(
            &cmd,
            &["--config", "/etc/cli.toml", "greet", "--name", "cli"],
            greet,
        );
        assert_eq!(result.out, "greet cli\n");
    }

    #[test]
    fn test_config_can_disable_colors() {
        let _guard = logger_lock();
        let cmd = group(runtime(Some("[cli]\nno_color = true\n")));

        let result = invoke(&cmd, &["-C", "/etc/cli.toml", "greet"], |ctx, _| {
            assert!(!ctx.color);
            Ok(())
        });
        assert_eq!(result.code, 0, "stderr: {}", result.err);
    }

    #[test]
    fn test_missing_explicit_config() {
        let _guard = logger_lock();
        let cmd = group(runtime(None));

        let result = invoke(
            &cmd,
            &["--no-color", "--config", "missing.toml", "greet"],
            |_, _| panic!("handler must not run"),
        );
        assert_eq!(result.code, 2);
        assert!(result.err.contains("missing.toml"));
    }

    #[test]
    fn test_strict_config_rejects_unknown_keys() {
        let _guard = logger_lock();
        let cmd = group(runtime(Some("[cli]\nunknown = 1\n"))).strict(true);

        let result = invoke(&cmd, &["--no-color", "-C", "cli.toml", "greet"], |_, _| Ok(()));
        assert_eq!(result.code, 2);
        let expected = ExtraError::UnknownConfigKey {
            command: "cli".to_string(),
            key: "unknown".to_string(),
        };
        assert!(result.err.contains(&expected.to_string()));
    }

    #[test]
    fn test_show_params() {
        let _guard = logger_lock();
        let cmd = group(runtime(None));

        let result = invoke(&cmd, &["--show-params"], |_, _| {
            panic!("handler must not run")
        });
        assert_eq!(result.code, 0);
        assert!(result.out.contains("cli.level"));
        assert!(result.out.contains("cli.greet.name"));
        assert!(result.out.contains("--verbosity LEVEL"));
    }

    #[test]
    fn test_time_flag() {
        let _guard = logger_lock();
        let cmd = group(runtime(None));

        let result = invoke(&cmd, &["--time", "greet"], greet);
        assert!(result.out.starts_with("greet world\n"));
        assert!(result.out.contains("Execution time: "));
        assert!(result.out.trim_end().ends_with("seconds."));

        let result = invoke(&cmd, &["--time", "--no-time", "greet"], greet);
        assert_eq!(result.out, "greet world\n");
    }

    #[test]
    fn test_replaced_params_skip_pipeline_options() {
        let _guard = logger_lock();
        let flag = Arg::new("dry_run").long("dry-run").action(ArgAction::SetTrue);
        let cmd = extra_command_with(cli(), ExtraParams::Replace(vec![flag]))
            .unwrap()
            .runtime(runtime(None));

        let result = invoke(&cmd, &["--dry-run"], |ctx, _| {
            assert!(ctx.matches.get_flag("dry_run"));
            assert!(ctx.config_path.is_none());
            Ok(())
        });
        assert_eq!(result.code, 0, "stderr: {}", result.err);

        let result = invoke(&cmd, &["--config", "x.toml"], |_, _| Ok(()));
        assert_eq!(result.code, 2);
    }

    #[test]
    fn test_close_callbacks_run_after_handler() {
        let _guard = logger_lock();
        let cmd = group(runtime(None));

        let closed = Rc::new(RefCell::new(false));
        let flag = Rc::clone(&closed);
        let result = invoke(&cmd, &["greet"], move |ctx, _| {
            ctx.call_on_close(move |_| *flag.borrow_mut() = true);
            Ok(())
        });
        assert_eq!(result.code, 0);
        assert!(*closed.borrow());
    }
}
