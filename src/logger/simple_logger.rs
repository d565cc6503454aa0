use super::Logger;
use std::fmt::Debug;

/// The level messages are recorded at, ordered by severity in the same
/// way as [log::Level], `Error` first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    #[default]
    Debug,
    Trace,
}

impl LogLevel {
    pub fn log<S: AsRef<str>>(&self, message: S) {
        log::log!(log::Level::from(*self), "{}", message.as_ref());
    }
}

impl From<LogLevel> for log::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => log::Level::Error,
            LogLevel::Warn => log::Level::Warn,
            LogLevel::Info => log::Level::Info,
            LogLevel::Debug => log::Level::Debug,
            LogLevel::Trace => log::Level::Trace,
        }
    }
}

/// The default [Logger], writing `action: ..` and `effect: ..`
/// records to the `log` facade.
#[derive(Debug, Default)]
pub struct SimpleLogger {
    log_level: LogLevel,
}

impl SimpleLogger {
    pub fn new() -> Self {
        SimpleLogger {
            log_level: LogLevel::default(),
        }
    }

    pub fn log_level(mut self, log_level: LogLevel) -> Self {
        self.log_level = log_level;
        self
    }
}

impl Logger for SimpleLogger {
    fn log_action(&self, action: &dyn Debug) {
        // Skip formatting when the record would be filtered anyway.
        if log::log_enabled!(log::Level::from(self.log_level)) {
            self.log_level.log(format!("action: {:?}", action));
        }
    }

    fn log_effect(&self, effect: &dyn Debug) {
        if log::log_enabled!(log::Level::from(self.log_level)) {
            self.log_level.log(format!("effect: {:?}", effect));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{LogLevel, SimpleLogger};

    #[test]
    fn test_default_log_level() {
        assert_eq!(LogLevel::Debug, LogLevel::default());
        assert_eq!(
            log::Level::Debug,
            log::Level::from(SimpleLogger::new().log_level)
        );
    }

    #[test]
    fn test_log_level_builder() {
        let logger = SimpleLogger::new().log_level(LogLevel::Info);
        assert_eq!(LogLevel::Info, logger.log_level);
        assert_eq!(log::Level::Info, log::Level::from(LogLevel::Info));
        assert_eq!(log::Level::Trace, log::Level::from(LogLevel::Trace));
    }

    #[test]
    fn test_log_level_severity_order() {
        let levels = [
            LogLevel::Error,
            LogLevel::Warn,
            LogLevel::Info,
            LogLevel::Debug,
            LogLevel::Trace,
        ];

        assert!(levels.windows(2).all(|pair| pair[0] < pair[1]));
        for pair in levels.windows(2) {
            assert!(log::Level::from(pair[0]) < log::Level::from(pair[1]));
        }
        assert_eq!(log::Level::Error, log::Level::from(LogLevel::Error));
    }
}
