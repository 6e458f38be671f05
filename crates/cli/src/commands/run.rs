//! Run Command - every suite in order, with a results file

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use pipecheck_e2e::runner::TestResult;
use pipecheck_e2e::{Suite, TestRunner};

use crate::commands::load_config;
use crate::output::{print_error, print_info, print_json, print_list, print_success, OutputFormat, TableDisplay};

#[derive(Args)]
pub struct RunArgs {
    /// Skip the browser pipeline
    #[arg(long)]
    pub skip_ui: bool,

    /// Skip the HTTP health checks
    #[arg(long)]
    pub skip_api: bool,

    /// Directory for test-results.json [default: results_dir from config]
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl RunArgs {
    fn suites(&self) -> Vec<Suite> {
        Suite::all()
            .into_iter()
            .filter(|s| match s {
                Suite::Api => !self.skip_api,
                Suite::Ui => !self.skip_ui,
                Suite::Validate => true,
            })
            .collect()
    }
}

#[derive(Serialize)]
pub struct ResultDisplay(TestResult);

impl TableDisplay for ResultDisplay {
    fn headers() -> Vec<&'static str> {
        vec!["Suite", "Result", "Time", "Error"]
    }

    fn row(&self) -> Vec<String> {
        let r = &self.0;
        let result = if r.skipped {
            "- skipped"
        } else if r.success {
            "✓ pass"
        } else {
            "✗ fail"
        };
        vec![
            r.name.clone(),
            result.to_string(),
            format!("{} ms", r.duration_ms),
            r.error.clone().unwrap_or_default(),
        ]
    }
}

pub async fn execute(args: RunArgs, config_path: &Path, format: OutputFormat) -> Result<bool> {
    let config = load_config(config_path)?;
    config.validate()?;

    let suites = args.suites();
    let mut runner = TestRunner::new(config);
    if let Some(dir) = args.output {
        runner = runner.with_output_dir(dir);
    }

    let results = runner.run(&suites).await;
    let path = runner.write_results(&results)?;

    if matches!(format, OutputFormat::Json) {
        print_json(&results);
        return Ok(results.success());
    }

    let rows: Vec<ResultDisplay> = results.results.iter().cloned().map(ResultDisplay).collect();
    print_list(&rows, format);
    print_info(&format!("Results written to {}", path.display()));

    let summary = format!(
        "{} passed, {} failed, {} skipped",
        results.passed, results.failed, results.skipped
    );
    if results.success() {
        print_success(&summary);
    } else {
        print_error(&summary);
    }
    Ok(results.success())
}
