//! # MockReactor Configuration System
//!
//! Hierarchical configuration for the virtual-clock reactor.
//!
//! ## Features
//! - **Unified Configuration**: one container for clock, timer and telemetry settings
//! - **Validation**: runtime validation of every loaded value
//! - **Environment Awareness**: `MOCKREACTOR_*` variables override file values

#![warn(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use tracing::debug;
use validator::Validate;

mod error;
mod reactor;
mod telemetry;
mod validation;

pub use error::ConfigError;
pub use reactor::{ClockConfig, TimerConfig};
pub use telemetry::TelemetryConfig;

/// Default location of the base configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "config/mockreactor.yaml";

/// Prefix for environment overrides, nested keys split on `__`.
pub const ENV_PREFIX: &str = "MOCKREACTOR_";

/// Top‑level configuration container for the reactor.
#[derive(Debug, Serialize, Deserialize, Validate, Default, Clone, PartialEq)]
pub struct ReactorConfig {
    /// Virtual clock behaviour.
    #[serde(default)]
    #[validate(nested)]
    pub clock: ClockConfig,

    /// Timer registry parameters.
    #[serde(default)]
    #[validate(nested)]
    pub timers: TimerConfig,

    /// Logging and metrics settings.
    #[serde(default)]
    #[validate(nested)]
    pub telemetry: TelemetryConfig,
}

impl ReactorConfig {
    /// Load configuration from the default file and environment.
    ///
    /// Hierarchy:
    /// 1. Default values
    /// 2. `config/mockreactor.yaml`, if present
    /// 3. `MOCKREACTOR_*` environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(ReactorConfig::default()));

        if Path::new(DEFAULT_CONFIG_PATH).exists() {
            figment = figment.merge(Yaml::file(DEFAULT_CONFIG_PATH));
        } else {
            debug!("{DEFAULT_CONFIG_PATH} not found, using default configuration");
        }

        Self::extract(figment)
    }

    /// Load configuration from a specific YAML file, still honouring environment overrides.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(PathBuf::from(path)));
        }

        let figment =
            Figment::from(Serialized::defaults(ReactorConfig::default())).merge(Yaml::file(path));
        Self::extract(figment)
    }

    fn extract(figment: Figment) -> Result<Self, ConfigError> {
        figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .map_err(ConfigError::from)
            .and_then(|config: Self| {
                config.validate()?;
                Ok(config)
            })
    }
}
