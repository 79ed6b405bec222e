//! ## mockreactor-telemetry::logging
//! **Leveled string sinks for the reactor**
//!
//! The reactor never formats structured fields itself; it hands a level and a
//! message to whatever [`ReactorLog`] it was built with.
//!
//! ### Components:
//! - [`TracingLog`]: forwards to the `tracing` macros
//! - [`PrefixedLog`]: prepends `"<prefix>: "` to every message
//! - [`MemoryLog`]: keeps every line in memory for test assertions
//! - [`ReactorLogger`]: installs the `tracing-subscriber` fmt layer

use std::cell::RefCell;
use std::rc::Rc;

use tracing::Level;
use tracing_subscriber::{fmt, EnvFilter};

/// A sink accepting leveled text messages.
pub trait ReactorLog {
    fn log(&self, level: Level, message: &str);

    fn debug(&self, message: &str) {
        self.log(Level::DEBUG, message);
    }

    fn info(&self, message: &str) {
        self.log(Level::INFO, message);
    }

    fn warn(&self, message: &str) {
        self.log(Level::WARN, message);
    }

    fn error(&self, message: &str) {
        self.log(Level::ERROR, message);
    }
}

impl<L: ReactorLog + ?Sized> ReactorLog for Box<L> {
    fn log(&self, level: Level, message: &str) {
        (**self).log(level, message);
    }
}

impl<L: ReactorLog + ?Sized> ReactorLog for Rc<L> {
    fn log(&self, level: Level, message: &str) {
        (**self).log(level, message);
    }
}

/// Forwards every message to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLog;

impl ReactorLog for TracingLog {
    fn log(&self, level: Level, message: &str) {
        // The level must be a constant in each macro call.
        match level {
            Level::TRACE => tracing::trace!("{message}"),
            Level::DEBUG => tracing::debug!("{message}"),
            Level::INFO => tracing::info!("{message}"),
            Level::WARN => tracing::warn!("{message}"),
            _ => tracing::error!("{message}"),
        }
    }
}

/// Logs all messages with the given prefix.
#[derive(Debug, Clone)]
pub struct PrefixedLog<L> {
    prefix: String,
    inner: L,
}

impl<L: ReactorLog> PrefixedLog<L> {
    pub fn new(prefix: impl Into<String>, inner: L) -> Self {
        Self {
            prefix: prefix.into(),
            inner,
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn inner(&self) -> &L {
        &self.inner
    }
}

impl<L: ReactorLog> ReactorLog for PrefixedLog<L> {
    fn log(&self, level: Level, message: &str) {
        self.inner.log(level, &format!("{}: {}", self.prefix, message));
    }
}

/// In-memory sink. Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct MemoryLog {
    lines: Rc<RefCell<Vec<(Level, String)>>>,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every recorded line.
    pub fn lines(&self) -> Vec<(Level, String)> {
        self.lines.borrow().clone()
    }

    /// Messages recorded at exactly `level`.
    pub fn messages_at(&self, level: Level) -> Vec<String> {
        self.lines
            .borrow()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m.clone())
            .collect()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lines.borrow().iter().any(|(_, m)| m.contains(needle))
    }

    pub fn clear(&self) {
        self.lines.borrow_mut().clear();
    }
}

impl ReactorLog for MemoryLog {
    fn log(&self, level: Level, message: &str) {
        self.lines.borrow_mut().push((level, message.to_string()));
    }
}

/// Installs the global `tracing` subscriber.
#[derive(Clone)]
pub struct ReactorLogger;

impl ReactorLogger {
    /// Install the fmt subscriber, filtered by `RUST_LOG` or `info`.
    ///
    /// # Panics
    /// If a global subscriber is already installed.
    pub fn init() {
        Self::init_with_default("info")
    }

    /// Like [`ReactorLogger::init`] but with a caller-chosen fallback filter.
    pub fn init_with_default(default_filter: &str) {
        fmt()
            .with_env_filter(Self::filter(default_filter))
            .with_target(true)
            .init()
    }

    /// Install the subscriber unless one is already present. Returns whether it was installed.
    pub fn try_init(default_filter: &str) -> bool {
        fmt()
            .with_env_filter(Self::filter(default_filter))
            .with_target(true)
            .try_init()
            .is_ok()
    }

    fn filter(default_filter: &str) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    #[traced_test]
    #[test]
    fn tracing_log_reaches_subscriber() {
        TracingLog.info("Tick #1, clock=0");
        assert!(logs_contain("Tick #1, clock=0"));
    }

    #[traced_test]
    #[test]
    fn prefixed_log_prepends_prefix() {
        let log = PrefixedLog::new("Reactor", TracingLog);
        log.warn("stop called");
        assert!(logs_contain("Reactor: stop called"));
    }

    #[test]
    fn memory_log_records_levels() {
        let log = MemoryLog::new();
        let shared = log.clone();
        log.debug("one");
        log.error("two");
        assert_eq!(shared.lines().len(), 2);
        assert_eq!(shared.messages_at(Level::ERROR), vec!["two".to_string()]);
        assert!(shared.contains("one"));
        shared.clear();
        assert!(log.lines().is_empty());
    }

    #[test]
    fn prefixed_memory_log() {
        let memory = MemoryLog::new();
        let log = PrefixedLog::new("MockEM", memory.clone());
        log.info("run called");
        assert_eq!(
            memory.lines(),
            vec![(Level::INFO, "MockEM: run called".to_string())]
        );
    }
}
