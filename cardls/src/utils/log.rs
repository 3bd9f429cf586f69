// SPDX-License-Identifier: MIT

use colored::Colorize;
use log::{Level, LevelFilter, Log, Metadata, Record};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogLevel {
    Quiet,
    Normal,
    Verbose,
}

impl LogLevel {
    /// Threshold for the tool's own records.
    fn own(self) -> LevelFilter {
        match self {
            LogLevel::Quiet => LevelFilter::Error,
            LogLevel::Normal => LevelFilter::Info,
            LogLevel::Verbose => LevelFilter::Trace,
        }
    }

    /// Threshold for records coming from the card and filesystem crates.
    fn libs(self) -> LevelFilter {
        match self {
            LogLevel::Quiet => LevelFilter::Error,
            LogLevel::Normal => LevelFilter::Warn,
            LogLevel::Verbose => LevelFilter::Trace,
        }
    }
}

/// Prints `[cardls]`-prefixed records to stderr.
pub struct CliLogger {
    level: LogLevel,
}

impl CliLogger {
    pub fn new(level: LogLevel) -> Self {
        Self { level }
    }
}

impl Log for CliLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        let max = if metadata.target().starts_with("cardls") {
            self.level.own()
        } else {
            self.level.libs()
        };
        metadata.level() <= max
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let tag = match record.level() {
            Level::Error => "error".red().bold(),
            Level::Warn => "warn".yellow().bold(),
            Level::Info => "info".green(),
            Level::Debug => "debug".blue(),
            Level::Trace => "trace".dimmed(),
        };
        if self.level == LogLevel::Verbose {
            eprintln!("[cardls] {tag} {}: {}", record.target(), record.args());
        } else {
            eprintln!("[cardls] {tag} {}", record.args());
        }
    }

    fn flush(&self) {}
}

/// Installs the logger once per process.
pub fn init_logger(level: LogLevel) -> anyhow::Result<()> {
    log::set_boxed_logger(Box::new(CliLogger::new(level)))?;
    log::set_max_level(level.own().max(level.libs()));
    Ok(())
}
