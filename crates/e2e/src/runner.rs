//! Suite runner that chains health checks, the browser pipeline and CSV
//! validation of the download

use std::path::PathBuf;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use pipecheck_common::HarnessConfig;

use crate::api::{ApiChecker, HealthCheck};
use crate::error::{E2eError, E2eResult};
use crate::page::Page;
use crate::pipeline::{PipelineConfig, PipelineStatus, UiPipeline};
use crate::playwright::{PlaywrightConfig, PlaywrightSession};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Suite {
    Api,
    Ui,
    Validate,
}

impl Suite {
    pub fn name(&self) -> &'static str {
        match self {
            Suite::Api => "api health checks",
            Suite::Ui => "ui pipeline",
            Suite::Validate => "csv validation",
        }
    }

    /// Execution order
    pub fn all() -> Vec<Suite> {
        vec![Suite::Api, Suite::Ui, Suite::Validate]
    }
}

/// Result of running a single suite
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResult {
    pub name: String,
    pub suite: Suite,
    pub success: bool,
    pub skipped: bool,
    pub duration_ms: u64,
    pub error: Option<String>,
    /// Suite-specific report (check results, stage results, validation report)
    pub details: serde_json::Value,
}

/// Result of running all suites
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestSuiteResult {
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub duration_ms: u64,
    pub results: Vec<TestResult>,
}

impl TestSuiteResult {
    pub fn success(&self) -> bool {
        self.failed == 0
    }
}

/// Main E2E test runner
pub struct TestRunner {
    config: HarnessConfig,
    playwright_config: PlaywrightConfig,
    output_dir: PathBuf,
}

impl TestRunner {
    pub fn new(config: HarnessConfig) -> Self {
        let playwright_config = PlaywrightConfig::from_harness(&config);
        let output_dir = config.results_dir.clone();
        Self {
            config,
            playwright_config,
            output_dir,
        }
    }

    pub fn with_output_dir(mut self, dir: PathBuf) -> Self {
        self.output_dir = dir;
        self
    }

    /// Run the given suites in order
    pub async fn run(&self, suites: &[Suite]) -> TestSuiteResult {
        let started_at = chrono::Utc::now();
        let start = Instant::now();
        let mut results = Vec::new();

        info!("Running {} suite(s)...", suites.len());

        for suite in suites {
            let result = match suite {
                Suite::Api => self.run_api().await,
                Suite::Ui => self.run_ui().await,
                Suite::Validate => self.run_validation(&results),
            };

            if result.skipped {
                warn!("- {} skipped: {}", result.name, result.error.as_deref().unwrap_or(""));
            } else if result.success {
                info!("✓ {} ({} ms)", result.name, result.duration_ms);
            } else {
                error!(
                    "✗ {} - {}",
                    result.name,
                    result.error.as_deref().unwrap_or("unknown error")
                );
            }
            results.push(result);
        }

        let skipped = results.iter().filter(|r| r.skipped).count();
        let passed = results.iter().filter(|r| r.success && !r.skipped).count();
        let failed = results.iter().filter(|r| !r.success).count();
        let duration_ms = start.elapsed().as_millis() as u64;

        info!("");
        info!(
            "Test Results: {} passed, {} failed, {} skipped ({} ms)",
            passed, failed, skipped, duration_ms
        );

        TestSuiteResult {
            started_at,
            total: results.len(),
            passed,
            failed,
            skipped,
            duration_ms,
            results,
        }
    }

    async fn run_api(&self) -> TestResult {
        let start = Instant::now();
        let checks = HealthCheck::defaults(&self.config.pipeline.brand_marker);

        let checker = match ApiChecker::new(
            &self.config.base_url,
            Duration::from_secs(self.config.timeouts.http_secs),
        ) {
            Ok(checker) => checker,
            Err(e) => return failed(Suite::Api, start, e.to_string()),
        };

        let results = checker.run_all(&checks).await;
        let failures: Vec<String> = results
            .iter()
            .filter(|r| !r.passed)
            .map(|r| format!("{}: {}", r.name, r.detail))
            .collect();

        TestResult {
            name: Suite::Api.name().to_string(),
            suite: Suite::Api,
            success: failures.is_empty(),
            skipped: false,
            duration_ms: elapsed_ms(start),
            error: if failures.is_empty() {
                None
            } else {
                Some(failures.join("; "))
            },
            details: serde_json::to_value(&results).unwrap_or_default(),
        }
    }

    async fn run_ui(&self) -> TestResult {
        let start = Instant::now();

        let session = match PlaywrightSession::launch(&self.playwright_config).await {
            Ok(session) => session,
            Err(e) => return failed(Suite::Ui, start, e.to_string()),
        };

        let outcome = self.run_pipeline(&session).await;

        if let Err(e) = session.close().await {
            debug!("Browser close failed: {}", e);
        }

        match outcome {
            Ok(report) => TestResult {
                name: Suite::Ui.name().to_string(),
                suite: Suite::Ui,
                success: true,
                skipped: report.status == PipelineStatus::Skipped,
                duration_ms: elapsed_ms(start),
                error: (report.status == PipelineStatus::Skipped)
                    .then(|| "input CSV not found".to_string()),
                details: serde_json::to_value(&report).unwrap_or_default(),
            },
            Err(e) => failed(Suite::Ui, start, e.to_string()),
        }
    }

    /// Run the browser pipeline over any page implementation
    pub async fn run_pipeline<P>(&self, page: &P) -> E2eResult<crate::pipeline::PipelineReport>
    where
        P: Page + ?Sized,
    {
        UiPipeline::new(PipelineConfig::from_harness(&self.config))
            .run(page)
            .await
    }

    /// Validate the downloaded CSV. A UI failure earlier in the same run
    /// means `output.csv` was not refreshed, so validation is skipped.
    fn run_validation(&self, earlier: &[TestResult]) -> TestResult {
        let start = Instant::now();
        if earlier.iter().any(|r| r.suite == Suite::Ui && !r.success) {
            return TestResult {
                name: Suite::Validate.name().to_string(),
                suite: Suite::Validate,
                success: true,
                skipped: true,
                duration_ms: elapsed_ms(start),
                error: Some("ui pipeline failed, output CSV is stale".to_string()),
                details: serde_json::Value::Null,
            };
        }

        let input = self.config.input_csv();
        let output = self.config.output_csv();

        match pipecheck_validator::validate(&input, &output) {
            Ok(report) => {
                for finding in report.warnings() {
                    warn!("WARNING: {}", finding.message);
                }
                TestResult {
                    name: Suite::Validate.name().to_string(),
                    suite: Suite::Validate,
                    success: true,
                    skipped: false,
                    duration_ms: elapsed_ms(start),
                    error: None,
                    details: serde_json::to_value(&report).unwrap_or_default(),
                }
            }
            Err(e) => failed(Suite::Validate, start, E2eError::from(e).to_string()),
        }
    }

    /// Write test results to JSON file
    pub fn write_results(&self, results: &TestSuiteResult) -> E2eResult<PathBuf> {
        std::fs::create_dir_all(&self.output_dir)?;

        let path = self.output_dir.join("test-results.json");
        let json = serde_json::to_string_pretty(results)?;
        std::fs::write(&path, json)?;

        info!("Results written to: {}", path.display());
        Ok(path)
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

fn failed(suite: Suite, start: Instant, error: String) -> TestResult {
    TestResult {
        name: suite.name().to_string(),
        suite,
        success: false,
        skipped: false,
        duration_ms: elapsed_ms(start),
        error: Some(error),
        details: serde_json::Value::Null,
    }
}
