//! Program logging.
//!
//! Messages go to the terminal, coloured when attached to one. Warnings and errors are written to
//! stderr and everything else to stdout. When evaluating a model, messages are also saved to log
//! files next to the results, so that any timesteps without a valid operational setting can be
//! traced after the run.
use anyhow::{Context, Result, bail, ensure};
use chrono::Local;
use fern::{Dispatch, FormatCallback};
use fern::colors::{Color, ColoredLevelConfig};
use log::{LevelFilter, Record};
use std::env;
use std::fmt::{Arguments, Display};
use std::fs::File;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Set once the logger has been initialised
static LOGGER_INIT: OnceLock<()> = OnceLock::new();

/// The log level used if neither the environment nor `settings.toml` gives one
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// The environment variable used to override the log level
const LOG_LEVEL_ENV_VAR: &str = "CONSUMER_SYSTEM_LOG_LEVEL";

/// Log file for messages about the ordinary progress of an evaluation
const LOG_INFO_FILE_NAME: &str = "consumer_system_info.log";

/// Log file for warnings and errors, such as timesteps falling back to the last setting
const LOG_ERROR_FILE_NAME: &str = "consumer_system_error.log";

/// Prefix of log targets within this crate
const CRATE_TARGET_PREFIX: &str = concat!(env!("CARGO_CRATE_NAME"), "::");

/// Whether the program logger has been initialised
pub fn is_logger_initialised() -> bool {
    LOGGER_INIT.get().is_some()
}

/// The paths of the info and error log files for a run saving results to `output_path`
pub fn get_log_file_paths(output_path: &Path) -> [PathBuf; 2] {
    [
        output_path.join(LOG_INFO_FILE_NAME),
        output_path.join(LOG_ERROR_FILE_NAME),
    ]
}

/// Initialise the program logger.
///
/// The log level is taken from the `CONSUMER_SYSTEM_LOG_LEVEL` environment variable if set,
/// otherwise from `settings.toml`, otherwise [`DEFAULT_LOG_LEVEL`]. Valid levels are `off`,
/// `error`, `warn`, `info`, `debug` and `trace`.
///
/// # Arguments
///
/// * `log_level_from_settings` - The log level given in `settings.toml`
/// * `output_path` - If given, log files are created in this folder
pub fn init(log_level_from_settings: Option<&str>, output_path: Option<&Path>) -> Result<()> {
    ensure!(!is_logger_initialised(), "Logger already initialised");

    let log_level_from_env = env::var(LOG_LEVEL_ENV_VAR).ok();
    let log_level = get_log_level(log_level_from_env.as_deref(), log_level_from_settings)?;
    let mut dispatch = Dispatch::new().chain(terminal_dispatch(log_level));
    if let Some(output_path) = output_path {
        dispatch = dispatch.chain(file_dispatch(output_path, log_level)?);
    }

    dispatch.apply().context("Logger already initialised")?;
    ensure!(LOGGER_INIT.set(()).is_ok(), "Logger already initialised");

    Ok(())
}

/// Choose the log level, preferring the environment over the settings file
fn get_log_level(from_env: Option<&str>, from_settings: Option<&str>) -> Result<LevelFilter> {
    if let Some(level) = from_env {
        return parse_log_level(level)
            .with_context(|| format!("Invalid value for {LOG_LEVEL_ENV_VAR}"));
    }

    parse_log_level(from_settings.unwrap_or(DEFAULT_LOG_LEVEL))
        .context("Invalid log_level in settings file")
}

/// Convert a log level string (case insensitive) to a [`LevelFilter`]
fn parse_log_level(log_level: &str) -> Result<LevelFilter> {
    let level = match log_level.to_lowercase().as_str() {
        "off" => LevelFilter::Off,
        "error" => LevelFilter::Error,
        "warn" => LevelFilter::Warn,
        "info" => LevelFilter::Info,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        unknown => bail!("Unknown log level: {unknown}"),
    };

    Ok(level)
}

/// Log to stdout, or to stderr for warnings and errors
fn terminal_dispatch(log_level: LevelFilter) -> Dispatch {
    let colours = ColoredLevelConfig::new()
        .error(Color::Red)
        .warn(Color::Yellow)
        .info(Color::Green)
        .debug(Color::Blue)
        .trace(Color::Magenta);
    let stdout_colour = std::io::stdout().is_terminal().then_some(colours);
    let stderr_colour = std::io::stderr().is_terminal().then_some(colours);

    Dispatch::new()
        .chain(
            Dispatch::new()
                .filter(|metadata| metadata.level() > LevelFilter::Warn)
                .format(move |out, message, record| {
                    write_terminal_line(out, message, record, stdout_colour.as_ref());
                })
                .level(log_level)
                .chain(std::io::stdout()),
        )
        .chain(
            Dispatch::new()
                .format(move |out, message, record| {
                    write_terminal_line(out, message, record, stderr_colour.as_ref());
                })
                .level(log_level.min(LevelFilter::Warn))
                .chain(std::io::stderr()),
        )
}

/// Log to the info and error files in `output_path`.
///
/// The info file always records progress at `info` level or above, whatever the terminal shows.
fn file_dispatch(output_path: &Path, log_level: LevelFilter) -> Result<Dispatch> {
    let [info_path, error_path] = get_log_file_paths(output_path);
    let create = |path: &Path| {
        File::create(path)
            .with_context(|| format!("Could not create log file {}", path.display()))
    };

    Ok(Dispatch::new()
        .format(write_file_line)
        .chain(
            Dispatch::new()
                .filter(|metadata| metadata.level() > LevelFilter::Warn)
                .level(log_level.max(LevelFilter::Info))
                .chain(create(&info_path)?),
        )
        .chain(
            Dispatch::new()
                .level(LevelFilter::Warn)
                .chain(create(&error_path)?),
        ))
}

/// Write a message to the terminal, with the time of day only
fn write_terminal_line(
    out: FormatCallback,
    message: &Arguments,
    record: &Record,
    colours: Option<&ColoredLevelConfig>,
) {
    let timestamp = Local::now().format("%H:%M:%S");
    match colours {
        Some(colours) => {
            write_line(out, timestamp, colours.color(record.level()), record, message);
        }
        None => write_line(out, timestamp, record.level(), record, message),
    }
}

/// Write a message to a log file, with the full date and time
fn write_file_line(out: FormatCallback, message: &Arguments, record: &Record) {
    let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
    write_line(out, timestamp, record.level(), record, message);
}

fn write_line(
    out: FormatCallback,
    timestamp: impl Display,
    level: impl Display,
    record: &Record,
    message: &Arguments,
) {
    let target = short_target(record.target());
    out.finish(format_args!("[{timestamp} {level} {target}] {message}"));
}

/// Drop this crate's name from a log target, so `consumer_system::system` is shown as `system`
fn short_target(target: &str) -> &str {
    target.strip_prefix(CRATE_TARGET_PREFIX).unwrap_or(target)
}
