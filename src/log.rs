//! Initialisation and configuration of the program's logging.
//!
//! Messages go to the terminal (with colours, if it supports them) and, optionally, to log files
//! in the output directory. The log level can be set through the environment.
use anyhow::{Context, Result, anyhow};
use chrono::Local;
use fern::colors::{Color, ColoredLevelConfig};
use fern::{Dispatch, FormatCallback};
use log::{LevelFilter, Metadata, Record};
use std::env;
use std::fmt::{Arguments, Display};
use std::fs::File;
use std::io::{self, IsTerminal};
use std::path::Path;
use std::sync::{Mutex, OnceLock, PoisonError};

/// A flag indicating whether the logger has been initialised
static LOGGER_INIT: OnceLock<()> = OnceLock::new();

/// Held while the logger is being initialised
static INIT_LOCK: Mutex<()> = Mutex::new(());

/// The environment variable which overrides the log level
const LOG_LEVEL_ENV_VAR: &str = "FUELCYCLE_LOG_LEVEL";

/// The default log level for the program.
///
/// Used as a fallback if the user hasn't specified something else with the `FUELCYCLE_LOG_LEVEL`
/// environment variable or the settings.toml file.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// The file name for the log file containing messages about ordinary operation
const LOG_INFO_FILE_NAME: &str = "fuelcycle_info.log";

/// The file name for the log file containing warnings and error messages
const LOG_ERROR_FILE_NAME: &str = "fuelcycle_error.log";

/// Whether the program logger has been initialised
pub fn is_logger_initialised() -> bool {
    LOGGER_INIT.get().is_some()
}

/// Convert the name of a log level (case insensitive) into a [`LevelFilter`]
pub fn parse_log_level(log_level: &str) -> Result<LevelFilter> {
    log_level
        .parse()
        .map_err(|_| anyhow!("Unknown log level: {log_level}"))
}

/// Messages at or below this level are treated as problems and kept apart from the rest
const PROBLEM_LEVEL: LevelFilter = LevelFilter::Warn;

/// Whether a record reports a problem (warning or error)
fn is_problem(metadata: &Metadata) -> bool {
    metadata.level() <= PROBLEM_LEVEL
}

/// Open (and truncate) a log file in `dir`
fn open_log_file(dir: &Path, file_name: &str) -> Result<File> {
    let path = dir.join(file_name);
    File::create(&path).with_context(|| format!("Failed to create log file {}", path.display()))
}

/// A sink which writes to a terminal stream, using colours if the stream is a terminal
fn terminal_sink(level: LevelFilter, use_colour: bool) -> Dispatch {
    let colours = ColoredLevelConfig::new()
        .error(Color::Red)
        .warn(Color::Yellow)
        .info(Color::Green)
        .debug(Color::Blue)
        .trace(Color::Magenta);

    Dispatch::new().level(level).format(move |out, message, record| {
        if use_colour {
            write_line(out, colours.color(record.level()), record, message);
        } else {
            write_line(out, record.level(), record, message);
        }
    })
}

/// A sink which writes uncoloured lines
fn plain_sink(level: LevelFilter) -> Dispatch {
    Dispatch::new()
        .level(level)
        .format(|out, message, record| write_line(out, record.level(), record, message))
}

/// Initialise the program logger using `fern`.
///
/// The log level comes from the `FUELCYCLE_LOG_LEVEL` environment variable if set, otherwise from
/// `settings.toml`, otherwise [`DEFAULT_LOG_LEVEL`]. Warnings and errors go to stderr and
/// everything else to stdout. If `log_dir` is given, the same messages are also written to two
/// files there. Once the logger is set up, later calls do nothing.
pub fn init(log_level_from_settings: Option<&str>, log_dir: Option<&Path>) -> Result<()> {
    let _guard = INIT_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
    if is_logger_initialised() {
        return Ok(());
    }

    let log_level = match env::var(LOG_LEVEL_ENV_VAR) {
        Ok(level) => parse_log_level(&level)
            .with_context(|| format!("Invalid value for {LOG_LEVEL_ENV_VAR}"))?,
        Err(_) => parse_log_level(log_level_from_settings.unwrap_or(DEFAULT_LOG_LEVEL))?,
    };

    let mut dispatch = Dispatch::new()
        .chain(
            terminal_sink(log_level, io::stdout().is_terminal())
                .filter(|metadata| !is_problem(metadata))
                .chain(io::stdout()),
        )
        .chain(
            terminal_sink(log_level.min(PROBLEM_LEVEL), io::stderr().is_terminal())
                .chain(io::stderr()),
        );

    if let Some(log_dir) = log_dir {
        // The info file always gets at least info messages, whatever the terminal shows
        dispatch = dispatch
            .chain(
                plain_sink(log_level.max(LevelFilter::Info))
                    .filter(|metadata| !is_problem(metadata))
                    .chain(open_log_file(log_dir, LOG_INFO_FILE_NAME)?),
            )
            .chain(plain_sink(PROBLEM_LEVEL).chain(open_log_file(log_dir, LOG_ERROR_FILE_NAME)?));
    }

    dispatch.apply().context("Logger already initialised")?;
    LOGGER_INIT.get_or_init(|| ());

    Ok(())
}

fn write_line<L: Display>(out: FormatCallback, level: L, record: &Record, message: &Arguments) {
    out.finish(format_args!(
        "[{} {level} {}] {message}",
        Local::now().format("%H:%M:%S"),
        record.target()
    ));
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("off", LevelFilter::Off)]
    #[case("WARN", LevelFilter::Warn)]
    #[case("debug", LevelFilter::Debug)]
    fn test_parse_log_level(#[case] name: &str, #[case] expected: LevelFilter) {
        assert_eq!(parse_log_level(name).unwrap(), expected);
    }

    #[test]
    fn test_parse_log_level_unknown() {
        assert_eq!(
            parse_log_level("verbose").unwrap_err().to_string(),
            "Unknown log level: verbose"
        );
    }

    #[test]
    fn test_open_log_file_truncates() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(LOG_INFO_FILE_NAME), "old run").unwrap();
        let file = open_log_file(dir.path(), LOG_INFO_FILE_NAME).unwrap();
        assert_eq!(file.metadata().unwrap().len(), 0);
        assert!(open_log_file(&dir.path().join("missing"), LOG_ERROR_FILE_NAME).is_err());
    }
}
