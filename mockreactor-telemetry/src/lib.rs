//! # MockReactor Telemetry
//!
//! Logging sinks and metrics used by the reactor.

pub mod logging;
pub mod metrics;

pub use logging::{MemoryLog, PrefixedLog, ReactorLog, ReactorLogger, TracingLog};
pub use metrics::ReactorMetrics;
