//! Logger setup for the host process.
//!
//! Stdout carries frames and the browser usually swallows stderr, so the
//! file destination is the default. The browser starts a fresh host for
//! every connection; the log file is appended to rather than truncated so
//! earlier sessions survive a reconnect.

use std::fs::{File, OpenOptions};
use std::path::Path;

use log::LevelFilter;
use simplelog::{
    ColorChoice, CombinedLogger, Config, ConfigBuilder, SharedLogger, TermLogger, TerminalMode,
    WriteLogger,
};

use crate::config::{LogConfig, LogDestination};

/// Installs the global logger described by `log_config`. Failing to open the
/// log file is reported on stderr and otherwise ignored.
pub fn initialize(log_config: &LogConfig) {
    let level = parse_level(&log_config.level);
    let config = build_config();

    let (to_stderr, to_file) = match log_config.destination {
        LogDestination::File => (false, true),
        LogDestination::Stderr => (true, false),
        LogDestination::Both => (true, true),
    };

    let mut loggers: Vec<Box<dyn SharedLogger>> = Vec::new();
    if to_stderr {
        loggers.push(TermLogger::new(
            level,
            config.clone(),
            TerminalMode::Stderr,
            ColorChoice::Never,
        ));
    }
    if to_file {
        if let Some(file_logger) = open_file_logger(&log_config.file, level, config) {
            loggers.push(file_logger);
        }
    }
    if loggers.is_empty() {
        return;
    }
    let _ = CombinedLogger::init(loggers);
}

/// Unknown level names fall back to `Info`.
pub fn parse_level(raw: &str) -> LevelFilter {
    raw.trim().parse().unwrap_or(LevelFilter::Info)
}

fn build_config() -> Config {
    ConfigBuilder::new()
        .set_time_format_rfc3339()
        .set_target_level(LevelFilter::Error)
        .build()
}

fn open_file_logger(
    path: &Path,
    level: LevelFilter,
    config: Config,
) -> Option<Box<WriteLogger<File>>> {
    let opened = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .map_or(Ok(()), std::fs::create_dir_all)
        .and_then(|()| OpenOptions::new().create(true).append(true).open(path));
    match opened {
        Ok(file) => Some(WriteLogger::new(level, config, file)),
        Err(err) => {
            eprintln!("Warning: Could not open log file {:?}: {}", path, err);
            None
        }
    }
}
