use thiserror::Error;

/// Errors raised when loading or validating migration settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// A tunable is out of range or could not be parsed.
    #[error("Invalid setting `{key}`: {reason}")]
    Invalid { key: String, reason: String },

    /// The settings file could not be read.
    #[error("Failed to read settings file: {0}")]
    Io(#[from] std::io::Error),

    /// The settings file is not valid JSON.
    #[error("Malformed settings file: {0}")]
    Json(#[from] serde_json::Error),
}
