//! Logging infrastructure using `log` + `log4rs`.

mod consts;

pub use consts::*;

use crate::foundation::AmbassadorError;
use log::LevelFilter;
use log4rs::{
    append::{
        console::{ConsoleAppender, Target},
        rolling_file::{
            policy::compound::{roll::fixed_window::FixedWindowRoller, trigger::size::SizeTrigger, CompoundPolicy},
            RollingFileAppender,
        },
    },
    config::{Appender, Logger, Root},
    encode::pattern::PatternEncoder,
    filter::threshold::ThresholdFilter,
    Config,
};
use std::io::IsTerminal;
use std::path::Path;

const CONSOLE_APPENDER: &str = "stderr";
const LOG_FILE_APPENDER: &str = "log_file";
const ERR_LOG_FILE_APPENDER: &str = "err_log_file";

/// Parsed form of a filter expression such as `"info,ambassador_core=debug,root=warn"`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogFilters {
    /// Level for whitelisted crates (bare level entry, default INFO).
    pub app_level: LevelFilter,
    /// Level for everything else; OFF unless `root=<level>` is given.
    pub root_level: LevelFilter,
    pub modules: Vec<(String, LevelFilter)>,
}

/// Parses a filter expression, rejecting unknown levels and empty module names.
pub fn parse_filters(filters: &str) -> Result<LogFilters, String> {
    let mut parsed = LogFilters { app_level: LevelFilter::Info, root_level: LevelFilter::Off, modules: Vec::new() };
    for part in filters.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        match part.split_once('=') {
            None => parsed.app_level = parse_level(part)?,
            Some((module, level)) => {
                let module = module.trim();
                if module.is_empty() {
                    return Err(format!("missing module name in '{part}'"));
                }
                let level = parse_level(level.trim())?;
                if module == "root" {
                    parsed.root_level = level;
                } else {
                    parsed.modules.push((module.to_string(), level));
                }
            }
        }
    }
    Ok(parsed)
}

fn parse_level(value: &str) -> Result<LevelFilter, String> {
    value.parse().map_err(|_| format!("unknown log level '{value}'"))
}

/// Initialize the logger with optional rolling file output.
///
/// Whitelisted crates log at the app level; third party crates stay silent
/// unless named explicitly (`"<crate>=<level>"`) or `root=<level>` is set.
/// The logger is global; a second call leaves the first configuration in place.
pub fn init_logger(log_dir: Option<&str>, filters: &str) -> Result<(), AmbassadorError> {
    let parsed = parse_filters(filters).map_err(AmbassadorError::ConfigError)?;
    let config = build_config(log_dir, &parsed)?;
    let _ = log4rs::init_config(config);
    Ok(())
}

fn build_config(log_dir: Option<&str>, filters: &LogFilters) -> Result<Config, AmbassadorError> {
    let console_pattern = if std::io::stderr().is_terminal() { LOG_LINE_PATTERN_COLORED } else { LOG_LINE_PATTERN };
    let console =
        ConsoleAppender::builder().target(Target::Stderr).encoder(Box::new(PatternEncoder::new(console_pattern))).build();

    let mut builder = Config::builder().appender(Appender::builder().build(CONSOLE_APPENDER, Box::new(console)));
    let mut appenders = vec![CONSOLE_APPENDER.to_string()];

    if let Some(dir) = log_dir.map(str::trim).filter(|d| !d.is_empty()) {
        let dir = Path::new(dir);
        builder = builder.appender(Appender::builder().build(LOG_FILE_APPENDER, Box::new(rolling_file(dir, LOG_FILE_NAME)?)));
        builder = builder.appender(
            Appender::builder()
                .filter(Box::new(ThresholdFilter::new(LevelFilter::Warn)))
                .build(ERR_LOG_FILE_APPENDER, Box::new(rolling_file(dir, ERR_LOG_FILE_NAME)?)),
        );
        appenders.push(LOG_FILE_APPENDER.to_string());
        appenders.push(ERR_LOG_FILE_APPENDER.to_string());
    }

    for crate_name in WHITELISTED_CRATES {
        if !filters.modules.iter().any(|(m, _)| m == crate_name) {
            builder = builder
                .logger(Logger::builder().appenders(appenders.clone()).additive(false).build(*crate_name, filters.app_level));
        }
    }
    for (module, level) in &filters.modules {
        builder = builder.logger(Logger::builder().appenders(appenders.clone()).additive(false).build(module, *level));
    }

    builder
        .build(Root::builder().appenders(appenders).build(filters.root_level))
        .map_err(|err| AmbassadorError::ConfigError(format!("logger config: {err}")))
}

fn rolling_file(dir: &Path, file_name: &str) -> Result<RollingFileAppender, AmbassadorError> {
    let archive_pattern = dir.join(format!("{file_name}.{{}}.gz"));
    let archive_pattern = archive_pattern
        .to_str()
        .ok_or_else(|| AmbassadorError::ConfigError(format!("non-utf8 log dir: {}", dir.display())))?;
    let roller = FixedWindowRoller::builder()
        .base(1)
        .build(archive_pattern, LOG_FILE_MAX_ROLLS)
        .map_err(|err| AmbassadorError::ConfigError(format!("log roller: {err}")))?;
    let policy = CompoundPolicy::new(Box::new(SizeTrigger::new(LOG_FILE_MAX_SIZE)), Box::new(roller));
    RollingFileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(LOG_LINE_PATTERN)))
        .build(dir.join(file_name), Box::new(policy))
        .map_err(|err| crate::storage_err!("open log file", err))
}
