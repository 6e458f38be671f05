//! HTTP health checks against the app's public surface
//!
//! Each check is a standalone GET with no shared session. Redirects are
//! followed except on the protected route, where a 302 to the login page is
//! itself an accepted answer.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::error::E2eResult;

/// Protected route requested without a session
pub const PROTECTED_PATH: &str = "/hub";
/// Route that must not exist
pub const UNMAPPED_PATH: &str = "/api/invalid-endpoint-12345";

/// Statuses accepted from the protected route instead of a branded 200
pub const AUTH_STATUSES: [u16; 3] = [401, 403, 302];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Expectation {
    /// Exactly this status
    Status { status: u16 },
    /// 200 with `marker` in the body (case-insensitive), or one of `statuses`
    BrandedOrDenied { marker: String, statuses: Vec<u16> },
}

impl Expectation {
    fn needs_body(&self, status: u16) -> bool {
        matches!(self, Expectation::BrandedOrDenied { .. }) && status == 200
    }

    /// `Ok(detail)` on pass, `Err(detail)` on mismatch
    pub fn evaluate(&self, status: u16, body: Option<&str>) -> Result<String, String> {
        match self {
            Expectation::Status { status: expected } => {
                if status == *expected {
                    Ok(format!("status {}", status))
                } else {
                    Err(format!("expected status {}, got {}", expected, status))
                }
            }
            Expectation::BrandedOrDenied { marker, statuses } => {
                if status == 200 {
                    let body = body.unwrap_or_default().to_lowercase();
                    if body.contains(&marker.to_lowercase()) {
                        Ok(format!("status 200 with '{}' in body", marker))
                    } else {
                        Err(format!("status 200 but body lacks '{}'", marker))
                    }
                } else if statuses.contains(&status) {
                    Ok(format!("status {} (access denied)", status))
                } else {
                    Err(format!(
                        "expected 200 or one of {:?}, got {}",
                        statuses, status
                    ))
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCheck {
    pub name: String,
    pub path: String,
    pub expectation: Expectation,
    pub follow_redirects: bool,
}

impl HealthCheck {
    pub fn new(name: impl Into<String>, path: impl Into<String>, expectation: Expectation) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            expectation,
            follow_redirects: true,
        }
    }

    /// Report the first response as-is instead of following a redirect
    pub fn without_redirects(mut self) -> Self {
        self.follow_redirects = false;
        self
    }

    /// Home page, protected route, unmapped route
    pub fn defaults(brand_marker: &str) -> Vec<Self> {
        vec![
            HealthCheck::new(
                "home page loads",
                "/",
                Expectation::Status { status: 200 },
            ),
            HealthCheck::new(
                "protected route requires login",
                PROTECTED_PATH,
                Expectation::BrandedOrDenied {
                    marker: brand_marker.to_string(),
                    statuses: AUTH_STATUSES.to_vec(),
                },
            )
            .without_redirects(),
            HealthCheck::new(
                "unknown endpoint returns 404",
                UNMAPPED_PATH,
                Expectation::Status { status: 404 },
            ),
        ]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckResult {
    pub name: String,
    pub path: String,
    /// None when the request itself failed
    pub status: Option<u16>,
    pub passed: bool,
    pub detail: String,
    pub duration_ms: u64,
}

pub struct ApiChecker {
    client: reqwest::Client,
    no_redirect_client: reqwest::Client,
    base_url: String,
}

impl ApiChecker {
    pub fn new(base_url: &str, timeout: Duration) -> E2eResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        let no_redirect_client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Self {
            client,
            no_redirect_client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url_for(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    /// Run one check. Transport errors become failed results.
    pub async fn run(&self, check: &HealthCheck) -> CheckResult {
        let start = Instant::now();
        let url = self.url_for(&check.path);
        debug!("GET {}", url);

        let (status, verdict) = match self.fetch(check, &url).await {
            Ok((status, body)) => (
                Some(status),
                check.expectation.evaluate(status, body.as_deref()),
            ),
            Err(e) => (None, Err(format!("request failed: {}", e))),
        };

        let duration_ms = start.elapsed().as_millis() as u64;
        let (passed, detail) = match verdict {
            Ok(detail) => {
                info!("✓ {} ({} ms)", check.name, duration_ms);
                (true, detail)
            }
            Err(detail) => {
                error!("✗ {} - {}", check.name, detail);
                (false, detail)
            }
        };

        CheckResult {
            name: check.name.clone(),
            path: check.path.clone(),
            status,
            passed,
            detail,
            duration_ms,
        }
    }

    async fn fetch(
        &self,
        check: &HealthCheck,
        url: &str,
    ) -> Result<(u16, Option<String>), reqwest::Error> {
        let client = if check.follow_redirects {
            &self.client
        } else {
            &self.no_redirect_client
        };
        let response = client.get(url).send().await?;
        let status = response.status().as_u16();
        let body = if check.expectation.needs_body(status) {
            Some(response.text().await?)
        } else {
            None
        };
        Ok((status, body))
    }

    /// Run checks in order; each one is independent of the others
    pub async fn run_all(&self, checks: &[HealthCheck]) -> Vec<CheckResult> {
        let mut results = Vec::with_capacity(checks.len());
        for check in checks {
            results.push(self.run(check).await);
        }
        results
    }
}
