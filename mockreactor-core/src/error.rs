use std::fmt;

use thiserror::Error;

use mockreactor_config::ConfigError;

use crate::timer::TimerId;

/// Where a callback fault was raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultSource {
    Entry,
    Timer(TimerId),
    PeriodicTimer(TimerId),
    NextTick,
    ShutdownHook,
}

impl fmt::Display for FaultSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FaultSource::Entry => f.write_str("entry callback"),
            FaultSource::Timer(id) => write!(f, "timer {id}"),
            FaultSource::PeriodicTimer(id) => write!(f, "periodic timer {id}"),
            FaultSource::NextTick => f.write_str("next-tick callback"),
            FaultSource::ShutdownHook => f.write_str("shutdown hook"),
        }
    }
}

/// An error returned by a user callback.
#[derive(Debug, Error)]
#[error("{origin} failed: {error:#}")]
pub struct CallbackFault {
    origin: FaultSource,
    #[source]
    error: anyhow::Error,
}

impl CallbackFault {
    pub fn new(origin: FaultSource, error: anyhow::Error) -> Self {
        Self { origin, error }
    }

    pub fn origin(&self) -> FaultSource {
        self.origin
    }

    pub fn error(&self) -> &anyhow::Error {
        &self.error
    }

    pub fn into_error(self) -> anyhow::Error {
        self.error
    }
}

#[derive(Debug, Error)]
pub enum ReactorError {
    /// A callback failed and no error handler was registered.
    #[error("Unhandled callback fault: {0}")]
    Callback(#[from] CallbackFault),

    /// The error handler itself failed while handling a fault.
    #[error("Error handler failed while handling {origin}: {error:#}")]
    Handler {
        origin: FaultSource,
        #[source]
        error: anyhow::Error,
    },

    #[error("Virtual clock cannot move backwards from {now} ms to {requested} ms")]
    InvalidAdvance { now: u64, requested: u64 },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl ReactorError {
    /// The callback fault, if this error carries one.
    pub fn as_fault(&self) -> Option<&CallbackFault> {
        match self {
            ReactorError::Callback(fault) => Some(fault),
            _ => None,
        }
    }
}
