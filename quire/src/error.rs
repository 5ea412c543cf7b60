use thiserror::Error;

/// Error type for loading and writing configuration.
#[derive(Debug, Error)]
pub enum QuireError {
  #[error("Configuration error: {0}")]
  Config(String),

  #[error("JSON error: {0}")]
  Serde(#[from] serde_json::Error),

  #[error("TOML serialization error: {0}")]
  TomlSerialize(#[from] toml::ser::Error),
}
