//! pipecheck E2E Framework
//!
//! Drives the hosted data-cleaning app end to end:
//! - HTTP health checks against the public surface
//! - A browser pipeline (sign in, upload, prompt, preview, download) run
//!   through a long-lived Playwright driver process
//! - A suite runner that chains both with CSV validation of the download
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    TestRunner (Rust)                        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  api::ApiChecker        GET / , /hub , /api/invalid-...     │
//! │  pipeline::UiPipeline   stages over any `Page`              │
//! │    ├── FinderChain      ordered locators, first visible     │
//! │    └── Locator          rendered to Playwright JS           │
//! │  playwright::PlaywrightSession                              │
//! │    └── node driver  <── JSON lines over stdin/stdout ──>    │
//! │  pipecheck_validator::validate(input.csv, output.csv)       │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod api;
pub mod error;
pub mod finder;
pub mod locator;
pub mod page;
pub mod pipeline;
pub mod playwright;
pub mod runner;

pub use api::{ApiChecker, CheckResult, HealthCheck};
pub use error::{E2eError, E2eResult};
pub use finder::{Finder, FinderChain};
pub use locator::{Locator, TextMatch};
pub use page::{LoadState, Page, WaitState};
pub use pipeline::{PipelineConfig, PipelineReport, UiPipeline};
pub use playwright::{PlaywrightConfig, PlaywrightSession};
pub use runner::{Suite, TestRunner, TestSuiteResult};
