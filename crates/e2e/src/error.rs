//! Error types for the browser pipeline and health checks

use thiserror::Error;

#[derive(Error, Debug)]
pub enum E2eError {
    #[error("Playwright not found. Install with: npm i playwright && npx playwright install")]
    PlaywrightNotFound,

    #[error("Playwright error: {0}")]
    Playwright(String),

    #[error("Playwright driver exited: {0}")]
    DriverExited(String),

    #[error("Timeout waiting for: {0}")]
    Timeout(String),

    #[error("Element not visible: {0}")]
    NotVisible(String),

    #[error("Stage failed: {stage} - {reason}")]
    StageFailed { stage: String, reason: String },

    #[error("Sign-in required but TEST_USERNAME / TEST_PASSWORD are not set")]
    MissingCredentials,

    #[error("Assertion failed: {0}")]
    AssertionFailed(String),

    #[error("Configuration error: {0}")]
    Config(#[from] pipecheck_common::ConfigError),

    #[error("Validation error: {0}")]
    Validation(#[from] pipecheck_validator::ValidationError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl E2eError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, E2eError::Timeout(_))
    }
}

pub type E2eResult<T> = Result<T, E2eError>;
