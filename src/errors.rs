use thiserror::Error;

#[derive(Error, Debug)]
pub enum AutomationError {
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Operation timed out: {0}")]
    Timeout(String),

    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),

    #[error("Invalid selector: {0}")]
    InvalidSelector(String),

    #[error("Failed to load settings: {0}")]
    SettingsLoad(String),

    #[error("Failed to save settings: {0}")]
    SettingsSave(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
