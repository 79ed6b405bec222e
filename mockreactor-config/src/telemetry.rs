//! Observability configuration.
//!
//! Parameters for reactor instrumentation:
//! - Log message prefix
//! - Default log filter
//! - Metrics collection

use serde::{Deserialize, Serialize};
use validator::{self, Validate};

use crate::validation;

/// Telemetry configuration.
#[derive(Debug, Serialize, Deserialize, Validate, Clone, PartialEq)]
pub struct TelemetryConfig {
    /// Prefix prepended to every reactor log line.
    #[serde(default = "default_log_prefix")]
    #[validate(custom(function = validation::validate_log_prefix))]
    pub log_prefix: String,

    /// Filter used when `RUST_LOG` is not set.
    #[serde(default = "default_log_filter")]
    #[validate(custom(function = validation::validate_log_filter))]
    pub log_filter: String,

    /// Whether the reactor records Prometheus metrics.
    #[serde(default)]
    pub metrics_enabled: bool,
}

fn default_log_prefix() -> String {
    "Reactor".into()
}

fn default_log_filter() -> String {
    "info".into()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_prefix: default_log_prefix(),
            log_filter: default_log_filter(),
            metrics_enabled: false,
        }
    }
}
