use thiserror::Error;

use crate::core::types::UnitId;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("Duplicate unit id: {0}")]
    DuplicateUnit(UnitId),

    #[error("Invalid unit {id}: {reason}")]
    InvalidUnit { id: UnitId, reason: String },

    #[error("Invalid engagement rule {attacker} -> {target}: {reason}")]
    InvalidRule {
        attacker: String,
        target: String,
        reason: String,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Unit not found: {0}")]
    UnknownUnit(UnitId),
}

pub type Result<T> = std::result::Result<T, SimError>;
