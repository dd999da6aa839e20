//! In-process invocation of extra commands, for tests.

use anyhow::Result;
use log::debug;
use std::io::Write;

use crate::color::strip_ansi;
use crate::command::ExtraCommand;
use crate::context::ExtraContext;
use crate::logging::{SharedBuffer, capture_logs, reset_logger};
use crate::run::print_cli_output;
use crate::runtime::Runtime;

/// Outcome of an in-process invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvokeResult {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl InvokeResult {
    /// Standard output followed by standard error.
    pub fn output(&self) -> String {
        format!("{}{}", self.stdout, self.stderr)
    }
}

/// Runs commands in process with captured streams.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtraCliRunner {
    color: bool,
}

impl ExtraCliRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep ANSI codes in captured output.
    pub fn color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    /// Invoke `cmd` with `args`. `None` arguments are skipped.
    pub fn invoke<R, F, A>(
        &self,
        cmd: &ExtraCommand<R>,
        args: A,
        handler: F,
    ) -> Result<InvokeResult>
    where
        R: Runtime,
        A: IntoIterator<Item = Option<String>>,
        F: FnOnce(&mut ExtraContext, &mut dyn Write) -> Result<()>,
    {
        let args: Vec<String> = args.into_iter().flatten().collect();

        let mut out = Vec::new();
        let mut err = SharedBuffer::new();
        let exit_code = {
            // Log records land in the captured stderr, in order with it.
            let _capture = capture_logs(&err);
            // A previous invocation may have left its verbosity behind.
            reset_logger();
            cmd.run(args.iter().cloned(), &mut out, &mut err, handler)?
        };

        let mut stdout = String::from_utf8_lossy(&out).into_owned();
        let mut stderr = String::from_utf8_lossy(&err.contents()).into_owned();
        if !self.color {
            stdout = strip_ansi(&stdout);
            stderr = strip_ansi(&stderr);
        }

        let mut trace = Vec::new();
        let mut cli = vec![cmd.command().get_name().to_string()];
        cli.extend(args);
        print_cli_output(
            &mut trace,
            &cli,
            Some(&stdout),
            Some(&stderr),
            Some(exit_code),
            None,
        )?;
        debug!("{}", String::from_utf8_lossy(&trace));

        Ok(InvokeResult {
            exit_code,
            stdout,
            stderr,
        })
    }
}

/// Wrap plain arguments for [`ExtraCliRunner::invoke`].
pub fn args<I, T>(values: I) -> Vec<Option<String>>
where
    I: IntoIterator<Item = T>,
    T: Into<String>,
{
    values.into_iter().map(|v| Some(v.into())).collect()
}
