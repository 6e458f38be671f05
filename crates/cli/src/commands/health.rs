//! Health Command

use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use pipecheck_e2e::{ApiChecker, CheckResult, HealthCheck};

use crate::commands::load_config;
use crate::output::{print_error, print_list, print_success, OutputFormat, TableDisplay};

#[derive(Args)]
pub struct HealthArgs {
    /// Site to check (overrides config and PIPECHECK_BASE_URL)
    #[arg(long)]
    pub base_url: Option<String>,
}

#[derive(Serialize)]
pub struct CheckDisplay(CheckResult);

impl TableDisplay for CheckDisplay {
    fn headers() -> Vec<&'static str> {
        vec!["Check", "Path", "Status", "Result", "Detail", "Time"]
    }

    fn row(&self) -> Vec<String> {
        let r = &self.0;
        vec![
            r.name.clone(),
            r.path.clone(),
            r.status.map(|s| s.to_string()).unwrap_or_else(|| "-".to_string()),
            if r.passed { "✓ pass" } else { "✗ fail" }.to_string(),
            r.detail.clone(),
            format!("{} ms", r.duration_ms),
        ]
    }
}

pub async fn execute(args: HealthArgs, config_path: &Path, format: OutputFormat) -> Result<bool> {
    let mut config = load_config(config_path)?;
    if let Some(url) = args.base_url {
        config.base_url = url;
    }
    config.validate()?;

    let checker = ApiChecker::new(
        &config.base_url,
        Duration::from_secs(config.timeouts.http_secs),
    )?;
    let results = checker
        .run_all(&HealthCheck::defaults(&config.pipeline.brand_marker))
        .await;

    let failed = results.iter().filter(|r| !r.passed).count();
    let rows: Vec<CheckDisplay> = results.into_iter().map(CheckDisplay).collect();
    print_list(&rows, format);

    if failed > 0 {
        print_error(&format!("{} health check(s) failed", failed));
    } else if !matches!(format, OutputFormat::Json) {
        print_success(&format!("All health checks passed for {}", checker.base_url()));
    }
    Ok(failed == 0)
}
