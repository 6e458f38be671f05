//! Pipeline Command - drive the app in a real browser

use std::path::Path;

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tracing::debug;

use pipecheck_common::BrowserKind;
use pipecheck_e2e::pipeline::{PipelineStatus, StageOutcome, StageResult};
use pipecheck_e2e::{PipelineConfig, PlaywrightConfig, PlaywrightSession, UiPipeline};

use crate::commands::load_config;
use crate::output::{print_info, print_json, print_list, print_success, OutputFormat, TableDisplay};

#[derive(Args)]
pub struct PipelineArgs {
    /// Show the browser window
    #[arg(long)]
    pub headed: bool,

    /// Browser to use (chromium, firefox, webkit)
    #[arg(long)]
    pub browser: Option<BrowserKind>,
}

#[derive(Serialize)]
pub struct StageDisplay(StageResult);

impl TableDisplay for StageDisplay {
    fn headers() -> Vec<&'static str> {
        vec!["Stage", "Outcome", "Detail", "Time"]
    }

    fn row(&self) -> Vec<String> {
        let s = &self.0;
        let outcome = match s.outcome {
            StageOutcome::Completed => "completed".green(),
            StageOutcome::Fallback => "fallback".yellow(),
            StageOutcome::Skipped => "skipped".dimmed(),
            StageOutcome::Manual => "manual".yellow(),
        };
        vec![
            s.stage.clone(),
            outcome.to_string(),
            s.detail.clone(),
            format!("{} ms", s.duration_ms),
        ]
    }
}

pub async fn execute(args: PipelineArgs, config_path: &Path, format: OutputFormat) -> Result<bool> {
    let mut config = load_config(config_path)?;
    if args.headed {
        config.browser.headless = false;
    }
    if let Some(kind) = args.browser {
        config.browser.kind = kind;
    }
    config.validate()?;

    let session = PlaywrightSession::launch(&PlaywrightConfig::from_harness(&config)).await?;
    let outcome = UiPipeline::new(PipelineConfig::from_harness(&config))
        .run(&session)
        .await;
    if let Err(e) = session.close().await {
        debug!("Browser close failed: {}", e);
    }
    let report = outcome?;

    if matches!(format, OutputFormat::Json) {
        print_json(&report);
        return Ok(true);
    }

    let stages: Vec<StageDisplay> = report.stages.iter().cloned().map(StageDisplay).collect();
    print_list(&stages, format);

    match report.status {
        PipelineStatus::Passed => {
            if let Some(path) = &report.download_path {
                print_success(&format!("Pipeline complete, output saved to {}", path.display()));
            }
        }
        PipelineStatus::Skipped => {
            print_info(&format!(
                "Pipeline skipped: {} not found",
                config.input_csv().display()
            ));
        }
    }
    Ok(true)
}
