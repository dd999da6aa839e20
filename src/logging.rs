//! Verbosity option and logger setup.

use clap::{Arg, ValueEnum};
use log::{LevelFilter, Log, Metadata, Record, debug};
use std::io::{self, Write};
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard, Once, RwLock};

use crate::error::ExtraError;
use crate::theme::HelpTheme;

pub const VERBOSITY_ID: &str = "verbosity";
pub const DEFAULT_LEVEL: Verbosity = Verbosity::Info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
pub enum Verbosity {
    #[value(name = "CRITICAL")]
    Critical,
    #[value(name = "ERROR")]
    Error,
    #[value(name = "WARNING")]
    Warning,
    #[value(name = "INFO")]
    Info,
    #[value(name = "DEBUG")]
    Debug,
}

impl Verbosity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verbosity::Critical => "CRITICAL",
            Verbosity::Error => "ERROR",
            Verbosity::Warning => "WARNING",
            Verbosity::Info => "INFO",
            Verbosity::Debug => "DEBUG",
        }
    }

    /// `log` has no critical level: it shares `Error` with ERROR.
    pub fn level_filter(&self) -> LevelFilter {
        match self {
            Verbosity::Critical | Verbosity::Error => LevelFilter::Error,
            Verbosity::Warning => LevelFilter::Warn,
            Verbosity::Info => LevelFilter::Info,
            Verbosity::Debug => LevelFilter::Debug,
        }
    }
}

impl FromStr for Verbosity {
    type Err = ExtraError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        <Verbosity as ValueEnum>::from_str(s, true)
            .map_err(|_| ExtraError::UnknownLevel(s.to_string()))
    }
}

impl std::fmt::Display for Verbosity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The `--verbosity LEVEL` option.
pub fn verbosity_arg() -> Arg {
    Arg::new(VERBOSITY_ID)
        .long("verbosity")
        .value_name("LEVEL")
        .value_parser(clap::value_parser!(Verbosity))
        .ignore_case(true)
        .default_value(DEFAULT_LEVEL.as_str())
        .help("Either CRITICAL, ERROR, WARNING, INFO or DEBUG.")
}

fn level_label(level: log::Level) -> &'static str {
    match level {
        log::Level::Error => "error",
        log::Level::Warn => "warning",
        log::Level::Info => "info",
        log::Level::Debug => "debug",
        log::Level::Trace => "trace",
    }
}

/// Theme of level labels, read when a record is written.
static THEME: RwLock<Option<HelpTheme>> = RwLock::new(None);
/// Buffer receiving records instead of stderr while a capture is active.
static SINK: Mutex<Option<SharedBuffer>> = Mutex::new(None);
/// One capture at a time, since the logger is process-wide.
static CAPTURE_LOCK: Mutex<()> = Mutex::new(());
static INSTALL: Once = Once::new();

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Byte buffer shared between a writer and the log sink.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> Vec<u8> {
        lock(&*self.0).clone()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        lock(&*self.0).write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Log destination: the active capture buffer, else stderr.
struct LogSink;

impl Write for LogSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match lock(&SINK).as_mut() {
            Some(buffer) => buffer.write(buf),
            None => io::stderr().write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match lock(&SINK).as_mut() {
            Some(buffer) => buffer.flush(),
            None => io::stderr().flush(),
        }
    }
}

/// Drops records above the current `log::max_level()`.
///
/// Span records of `tracing` reach the logger without being checked against
/// the global level, so the check cannot be left to the `log` macros.
struct LevelGate(env_logger::Logger);

impl Log for LevelGate {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= log::max_level() && self.0.enabled(metadata)
    }

    fn log(&self, record: &Record<'_>) {
        if self.enabled(record.metadata()) {
            self.0.log(record);
        }
    }

    fn flush(&self) {
        self.0.flush();
    }
}

/// Active capture. Records go back to stderr once dropped.
pub struct LogCapture {
    _serial: MutexGuard<'static, ()>,
}

impl Drop for LogCapture {
    fn drop(&mut self) {
        *lock(&SINK) = None;
    }
}

/// Send log records to `buffer` instead of stderr. Captures are serialized:
/// a second call waits until the first guard is dropped.
pub fn capture_logs(buffer: &SharedBuffer) -> LogCapture {
    let serial = lock(&CAPTURE_LOCK);
    *lock(&SINK) = Some(buffer.clone());
    LogCapture { _serial: serial }
}

fn install() {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug"));
    builder
        .target(env_logger::Target::Pipe(Box::new(LogSink)))
        .write_style(env_logger::WriteStyle::Always)
        .format(|buf, record| {
            let theme = THEME.read().unwrap_or_else(|poisoned| poisoned.into_inner());
            let label = level_label(record.level());
            let label = match theme.as_ref() {
                Some(theme) => theme.for_level(record.level()).apply(label),
                None => label.to_string(),
            };
            writeln!(buf, "{}: {}", label, record.args())
        });
    let logger = LevelGate(builder.build());
    if log::set_boxed_logger(Box::new(logger)).is_err() {
        debug!("Another logger is installed, only updating its level");
    }
}

/// Install the logger on first use, then set its level and theme.
/// Records render as `<level>: <message>` with the level styled by `theme`.
pub fn init_logger(verbosity: Verbosity, theme: &HelpTheme) {
    *THEME.write().unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(theme.clone());
    INSTALL.call_once(install);
    log::set_max_level(verbosity.level_filter());
}

/// Restore the default level, so one invocation does not leak its verbosity
/// into the next.
pub fn reset_logger() {
    log::set_max_level(DEFAULT_LEVEL.level_filter());
}
