use std::sync::{Mutex, OnceLock};

use chrono::Local;
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError};

use crate::config::PROGRAM_LOG_LEVEL;

enum LogTarget {
    Stderr,
    /// Captured lines, used by tests.
    #[cfg_attr(not(test), allow(dead_code))]
    Memory(Mutex<Vec<String>>),
}

pub struct Logger {
    level: Level,
    target: LogTarget,
}

impl Logger {
    fn stderr(level: Level) -> Self {
        Self {
            level,
            target: LogTarget::Stderr,
        }
    }

    #[cfg(test)]
    fn memory(level: Level) -> Self {
        Self {
            level,
            target: LogTarget::Memory(Mutex::new(Vec::new())),
        }
    }

    #[cfg(test)]
    fn captured(&self) -> Vec<String> {
        match &self.target {
            LogTarget::Memory(lines) => lines.lock().map(|l| l.clone()).unwrap_or_default(),
            LogTarget::Stderr => Vec::new(),
        }
    }
}

fn format_line(record: &Record<'_>) -> String {
    let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
    format!(
        "{} {} [{}] {}",
        timestamp,
        record.level(),
        record.target(),
        record.args()
    )
}

impl Log for Logger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let msg = format_line(record);
        match &self.target {
            LogTarget::Stderr => eprintln!("{msg}"),
            LogTarget::Memory(lines) => {
                if let Ok(mut lines) = lines.lock() {
                    lines.push(msg);
                }
            }
        }
    }

    fn flush(&self) {}
}

fn get_level_from_env() -> Level {
    std::env::var(PROGRAM_LOG_LEVEL)
        .ok()
        .and_then(|s| s.parse::<LevelFilter>().ok())
        .and_then(|filter| filter.to_level())
        .unwrap_or(Level::Warn)
}

/// Install the stderr logger, honouring `PACKRAT_LOG_LEVEL`.
pub fn init() -> Result<(), SetLoggerError> {
    init_with_level(get_level_from_env())
}

pub fn init_with_level(level: Level) -> Result<(), SetLoggerError> {
    static LOGGER: OnceLock<Logger> = OnceLock::new();

    // Only the first call installs; later calls must not reset the max level
    // to something the stored logger disagrees with.
    let init_call = LOGGER.get().is_none();

    let logger = LOGGER.get_or_init(|| Logger::stderr(level));

    if init_call {
        log::set_logger(logger)?;
        log::set_max_level(level.to_level_filter());
    }

    Ok(())
}

#[cfg(test)]
#[path = "logging_tests.rs"]
mod tests;
