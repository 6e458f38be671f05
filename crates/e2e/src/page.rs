//! The browser operations the pipeline relies on
//!
//! `PlaywrightSession` implements this against a real browser; tests
//! implement it with scripted answers.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::E2eResult;
use crate::locator::Locator;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitState {
    #[default]
    Visible,
    Hidden,
    Attached,
    Detached,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadState {
    Load,
    #[serde(rename = "domcontentloaded")]
    DomContentLoaded,
    NetworkIdle,
}

#[async_trait]
pub trait Page: Send + Sync {
    async fn goto(&self, url: &str) -> E2eResult<()>;

    async fn wait_for_load_state(&self, state: LoadState) -> E2eResult<()>;

    /// Current page URL
    async fn url(&self) -> E2eResult<String>;

    /// Immediate visibility check, no waiting
    async fn is_visible(&self, locator: &Locator) -> E2eResult<bool>;

    async fn count(&self, locator: &Locator) -> E2eResult<usize>;

    async fn click(&self, locator: &Locator, force: bool) -> E2eResult<()>;

    async fn fill(&self, locator: &Locator, value: &str) -> E2eResult<()>;

    async fn press(&self, locator: &Locator, key: &str) -> E2eResult<()>;

    async fn wait_for(&self, locator: &Locator, state: WaitState, timeout: Duration)
        -> E2eResult<()>;

    /// Set files on an `<input type=file>` directly
    async fn set_input_files(&self, locator: &Locator, path: &Path) -> E2eResult<()>;

    /// Click `trigger` and answer the resulting file chooser with `path`
    async fn upload_via_chooser(
        &self,
        trigger: &Locator,
        path: &Path,
        timeout: Duration,
    ) -> E2eResult<()>;

    /// Start listening for the next download. Must be called before the
    /// click that triggers it.
    async fn arm_download(&self, timeout: Duration) -> E2eResult<()>;

    /// Wait for the armed download and save it to `path`
    async fn save_download(&self, path: &Path) -> E2eResult<()>;

    /// Fixed wait
    async fn pause(&self, duration: Duration);
}
