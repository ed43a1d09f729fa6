//! Errors surfaced by game setup.

use engine_core::AssetError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GameError {
    #[error("failed to parse config: {0}")]
    Config(#[from] ron::error::SpannedError),
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] ron::Error),
    #[error("failed to write config: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Assets(#[from] AssetError),
}
