//! Error types for godot-forge.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ForgeError {
    #[error("Reserved key '{0}' used as a command parameter")]
    ReservedKey(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
