use mockreactor_config::ConfigError;
use mockreactor_core::ReactorError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Scenario failed: {0}")]
    Reactor(#[from] ReactorError),

    #[error("Failed to render output: {0}")]
    Render(String),
}

impl From<serde_yaml::Error> for CliError {
    fn from(err: serde_yaml::Error) -> Self {
        CliError::Render(err.to_string())
    }
}
