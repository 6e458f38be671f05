//! Harness configuration
//!
//! Values are layered: built-in defaults, then an optional TOML file, then
//! environment variables. The CLI applies its own flags on top.
//! Credentials are only ever taken from the environment.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{ConfigError, Result};

/// Environment variable holding the application username
pub const ENV_USERNAME: &str = "TEST_USERNAME";
/// Environment variable holding the application password
pub const ENV_PASSWORD: &str = "TEST_PASSWORD";
/// Overrides `base_url`
pub const ENV_BASE_URL: &str = "PIPECHECK_BASE_URL";
/// Overrides `app_url`
pub const ENV_APP_URL: &str = "PIPECHECK_APP_URL";

/// Top-level harness configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Base URL for the HTTP health checks
    pub base_url: String,

    /// Entry URL for the browser pipeline
    pub app_url: String,

    /// Directory holding input.csv / output.csv
    pub data_dir: PathBuf,

    /// File name of the CSV uploaded to the app
    pub input_file: String,

    /// File name the downloaded CSV is saved under
    pub output_file: String,

    /// Where the suite runner writes test-results.json
    pub results_dir: PathBuf,

    pub browser: BrowserConfig,

    pub timeouts: TimeoutConfig,

    pub pipeline: PipelineSettings,

    /// Sign-in credentials, populated from the environment only
    #[serde(skip)]
    pub credentials: Option<Credentials>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            base_url: "https://rhombusai.com".to_string(),
            app_url: "https://rhombusai.com".to_string(),
            data_dir: crate::default_data_dir(),
            input_file: "input.csv".to_string(),
            output_file: "output.csv".to_string(),
            results_dir: crate::default_results_dir(),
            browser: BrowserConfig::default(),
            timeouts: TimeoutConfig::default(),
            pipeline: PipelineSettings::default(),
            credentials: None,
        }
    }
}

impl HarnessConfig {
    /// Load configuration from file, falling back to defaults when the file
    /// does not exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(config)
    }

    /// Load from file, then apply process environment overrides.
    /// Callers that reach the network run `validate` themselves.
    pub fn load_with_env(path: &Path) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply overrides from an environment lookup
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_BASE_URL).filter(|v| !v.is_empty()) {
            self.base_url = url;
        }
        if let Some(url) = lookup(ENV_APP_URL).filter(|v| !v.is_empty()) {
            self.app_url = url;
        }
        if let Some(credentials) = Credentials::from_lookup(&lookup) {
            self.credentials = Some(credentials);
        }
    }

    pub fn validate(&self) -> Result<()> {
        for (name, url) in [("base_url", &self.base_url), ("app_url", &self.app_url)] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::invalid(format!(
                    "{} must be an http(s) URL, got '{}'",
                    name, url
                )));
            }
        }
        if self.pipeline.readiness_marker.is_empty() {
            return Err(ConfigError::invalid("pipeline.readiness_marker must not be empty"));
        }
        if self.timeouts.overall_secs == 0 {
            return Err(ConfigError::invalid("timeouts.overall_secs must be positive"));
        }
        Ok(())
    }

    /// Path of the CSV uploaded to the app
    pub fn input_csv(&self) -> PathBuf {
        self.data_dir.join(&self.input_file)
    }

    /// Path the downloaded CSV is written to
    pub fn output_csv(&self) -> PathBuf {
        self.data_dir.join(&self.output_file)
    }
}

/// Sign-in credentials for the application
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// `TEST_USERNAME` / `TEST_PASSWORD`; both must be set and non-empty
    fn from_lookup<F>(lookup: &F) -> Option<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let username = lookup(ENV_USERNAME).filter(|v| !v.is_empty())?;
        let password = lookup(ENV_PASSWORD).filter(|v| !v.is_empty())?;
        Some(Self { username, password })
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowserKind {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl BrowserKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BrowserKind::Chromium => "chromium",
            BrowserKind::Firefox => "firefox",
            BrowserKind::Webkit => "webkit",
        }
    }
}

impl std::str::FromStr for BrowserKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "chromium" | "chrome" => Ok(BrowserKind::Chromium),
            "firefox" => Ok(BrowserKind::Firefox),
            "webkit" | "safari" => Ok(BrowserKind::Webkit),
            other => Err(ConfigError::invalid(format!("unknown browser '{}'", other))),
        }
    }
}

/// Browser launch settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    pub kind: BrowserKind,
    pub headless: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            kind: BrowserKind::Chromium,
            headless: true,
            viewport_width: 1280,
            viewport_height: 720,
        }
    }
}

/// Timeouts, in seconds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Whole browser pipeline
    pub overall_secs: u64,
    /// Single HTTP health-check request
    pub http_secs: u64,
    /// "Type a Prompt" heading after sign-in
    pub sign_in_secs: u64,
    /// Onboarding dialog close button
    pub onboarding_secs: u64,
    /// "Add New File" modal
    pub upload_modal_secs: u64,
    /// File chooser event after "Browse Here"
    pub file_chooser_secs: u64,
    /// Uploaded file name showing up in the main view
    pub upload_confirm_secs: u64,
    /// Manual drag-and-drop fallback
    pub manual_upload_secs: u64,
    /// Any table or graph node after submitting the prompt
    pub processing_secs: u64,
    /// Result table containing the readiness marker
    pub result_secs: u64,
    /// Download event after clicking through the menu
    pub download_secs: u64,
    /// Manual download fallback
    pub manual_download_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            overall_secs: 180,
            http_secs: 30,
            sign_in_secs: 20,
            onboarding_secs: 10,
            upload_modal_secs: 5,
            file_chooser_secs: 10,
            upload_confirm_secs: 10,
            manual_upload_secs: 60,
            processing_secs: 30,
            result_secs: 60,
            download_secs: 20,
            manual_download_secs: 60,
        }
    }
}

/// Knobs for the browser pipeline content
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    /// Natural-language instruction sent to the app
    pub prompt: String,

    /// Text whose presence in a table marks the result as ready.
    /// The default prompt normalizes emails, so `@` shows up in the output.
    pub readiness_marker: String,

    /// Case-insensitive text expected on the protected page when it answers 200
    pub brand_marker: String,

    /// Regex (case-insensitive) matched against graph node titles when opening the preview
    pub node_pattern: String,

    /// Click "proceed/confirm/execute/apply" when a plan table shows up
    pub auto_confirm_plan: bool,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            prompt: "Clean this dataset, remove duplicates based on Name and email, and \
                     normalize email addresses. After the processing is done, show me the \
                     preview of the output. "
                .to_string(),
            readiness_marker: "@".to_string(),
            brand_marker: "rhombus".to_string(),
            node_pattern: "Clean this dataset|Text Case".to_string(),
            auto_confirm_plan: true,
        }
    }
}
