use thiserror::Error;

/// Errors surfaced by the area accessory to whoever drives it.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The Olarm API could not be reached, rejected the request or returned
    /// something unreadable.
    #[error("Olarm API call failed: {0:#}")]
    Remote(anyhow::Error),

    /// The configured area name was not in the latest fetch.
    #[error("Area \"{area}\" was not found in the Olarm device list")]
    NotFound { area: String },

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl BridgeError {
    pub fn config(msg: impl Into<String>) -> Self {
        BridgeError::Configuration(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
