//! pipecheck Common Library
//!
//! Configuration and error types shared by the validator, the browser
//! pipeline and the CLI.

pub mod config;
pub mod error;

pub use config::{
    BrowserConfig, BrowserKind, Credentials, HarnessConfig, PipelineSettings, TimeoutConfig,
};
pub use error::{ConfigError, Result};

/// pipecheck version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default configuration file, relative to the working directory
pub const DEFAULT_CONFIG_FILE: &str = "pipecheck.toml";

/// Directory holding the uploaded and downloaded CSV files
pub fn default_data_dir() -> std::path::PathBuf {
    std::path::PathBuf::from("data-validation")
}

/// Directory the suite runner writes its JSON results into
pub fn default_results_dir() -> std::path::PathBuf {
    std::path::PathBuf::from("test-results")
}
