//! CLI Commands

pub mod health;
pub mod pipeline;
pub mod run;
pub mod validate;

use std::path::Path;

use anyhow::{Context, Result};
use pipecheck_common::HarnessConfig;

/// Config file (if present), then environment
pub fn load_config(path: &Path) -> Result<HarnessConfig> {
    HarnessConfig::load_with_env(path)
        .with_context(|| format!("loading configuration from {}", path.display()))
}
