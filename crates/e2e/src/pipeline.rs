//! The browser pipeline: sign in, upload, prompt, preview, download
//!
//! Every stage is written against [`Page`] and tolerates missing elements:
//! it logs, falls back to the next locator, or waits for someone to do the
//! step by hand. Only the checks listed on each stage are hard failures.

use std::future::Future;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use pipecheck_common::{Credentials, HarnessConfig, PipelineSettings, TimeoutConfig};

use crate::error::{E2eError, E2eResult};
use crate::finder::FinderChain;
use crate::locator::{Locator, TextMatch};
use crate::page::{LoadState, Page, WaitState};

/// Settle time after attaching the file, before confirming
const ATTACH_SETTLE: Duration = Duration::from_secs(1);
/// Processing time allowed before hunting for the preview
const PIPELINE_SETTLE: Duration = Duration::from_secs(5);
/// Wait after clicking a graph node
const NODE_SETTLE: Duration = Duration::from_secs(5);
/// Table render time after opening the preview tab
const PREVIEW_RENDER: Duration = Duration::from_secs(2);
/// Dropdown animation after opening the download menu
const MENU_SETTLE: Duration = Duration::from_secs(1);
/// Default wait for an element to disappear
const HIDE_TIMEOUT: Duration = Duration::from_secs(5);

const PREVIEW_ATTEMPTS: usize = 3;

/// Everything the pipeline needs, passed in explicitly
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub app_url: String,
    pub credentials: Option<Credentials>,
    /// CSV uploaded to the app
    pub upload_file: PathBuf,
    /// Where the downloaded CSV is saved
    pub download_to: PathBuf,
    pub settings: PipelineSettings,
    pub timeouts: TimeoutConfig,
}

impl PipelineConfig {
    pub fn from_harness(config: &HarnessConfig) -> Self {
        Self {
            app_url: config.app_url.clone(),
            credentials: config.credentials.clone(),
            upload_file: config.input_csv(),
            download_to: config.output_csv(),
            settings: config.pipeline.clone(),
            timeouts: config.timeouts.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageOutcome {
    /// Primary path worked
    Completed,
    /// A fallback locator or strategy was needed
    Fallback,
    /// Nothing to do, or the optional element never showed up
    Skipped,
    /// Automation gave up and a person did (or has to do) the step
    Manual,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageResult {
    pub stage: String,
    pub outcome: StageOutcome,
    pub detail: String,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStatus {
    Passed,
    /// The CSV to upload was not there
    Skipped,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineReport {
    pub status: PipelineStatus,
    pub stages: Vec<StageResult>,
    pub download_path: Option<PathBuf>,
    pub duration_ms: u64,
}

impl PipelineReport {
    pub fn stage(&self, name: &str) -> Option<&StageResult> {
        self.stages.iter().find(|s| s.stage == name)
    }

    /// Stages that needed a fallback or a human
    pub fn degraded(&self) -> impl Iterator<Item = &StageResult> {
        self.stages
            .iter()
            .filter(|s| matches!(s.outcome, StageOutcome::Fallback | StageOutcome::Manual))
    }
}

type StageOutput = (StageOutcome, String);

pub struct UiPipeline {
    config: PipelineConfig,
}

impl UiPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Run every stage under the overall timeout
    pub async fn run<P>(&self, page: &P) -> E2eResult<PipelineReport>
    where
        P: Page + ?Sized,
    {
        let overall = Duration::from_secs(self.config.timeouts.overall_secs);
        tokio::time::timeout(overall, self.run_stages(page))
            .await
            .map_err(|_| {
                E2eError::Timeout(format!("browser pipeline ({}s overall)", overall.as_secs()))
            })?
    }

    async fn run_stages<P>(&self, page: &P) -> E2eResult<PipelineReport>
    where
        P: Page + ?Sized,
    {
        let start = Instant::now();
        let mut stages = Vec::new();

        stages.push(timed("sign_in", self.sign_in(page)).await?);
        stages.push(timed("dismiss_onboarding", self.dismiss_onboarding(page)).await?);

        if !self.config.upload_file.is_file() {
            warn!(
                "Input file {} not found, skipping the browser pipeline",
                self.config.upload_file.display()
            );
            stages.push(StageResult {
                stage: "upload".to_string(),
                outcome: StageOutcome::Skipped,
                detail: format!("{} not found", self.config.upload_file.display()),
                duration_ms: 0,
            });
            return Ok(PipelineReport {
                status: PipelineStatus::Skipped,
                stages,
                download_path: None,
                duration_ms: start.elapsed().as_millis() as u64,
            });
        }

        stages.push(timed("upload", self.upload(page)).await?);
        stages.push(timed("submit_prompt", self.submit_prompt(page)).await?);
        stages.push(timed("await_processing", self.await_processing(page)).await?);
        stages.push(timed("open_preview", self.open_preview(page)).await?);
        stages.push(timed("await_result", self.await_result(page)).await?);
        stages.push(timed("download", self.download(page)).await?);

        Ok(PipelineReport {
            status: PipelineStatus::Passed,
            stages,
            download_path: Some(self.config.download_to.clone()),
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }

    /// Open the app and sign in when a login prompt shows up.
    /// Hard failure: missing credentials, or no prompt heading after sign-in.
    async fn sign_in<P>(&self, page: &P) -> E2eResult<StageOutput>
    where
        P: Page + ?Sized,
    {
        page.goto(&self.config.app_url).await?;

        let open_app = Locator::role("link", "Open App").first();
        if visible(page, &open_app).await {
            info!("Clicking Open App...");
            page.click(&open_app, false).await?;
            page.wait_for_load_state(LoadState::NetworkIdle).await?;
        }

        let mut should_login = false;

        let login_button = Locator::role("button", "Log In");
        if visible(page, &login_button).await {
            info!("Clicking Log In button...");
            page.click(&login_button, false).await?;
            should_login = true;
        }

        if !should_login {
            let on_login_url = page
                .url()
                .await
                .map(|url| url.contains("login"))
                .unwrap_or(false);
            should_login = on_login_url || visible(page, &email_input()).await;
        }

        if !should_login {
            return Ok((StageOutcome::Skipped, "no login prompt".to_string()));
        }

        let credentials = self
            .config
            .credentials
            .as_ref()
            .ok_or(E2eError::MissingCredentials)?;

        info!("Logging in...");
        page.fill(&email_input(), &credentials.username).await?;
        page.fill(&Locator::role("textbox", "Password"), &credentials.password)
            .await?;
        page.click(
            &Locator::role("button", TextMatch::pattern("sign in|log in")),
            false,
        )
        .await?;

        page.wait_for(
            &prompt_heading(),
            WaitState::Visible,
            secs(self.config.timeouts.sign_in_secs),
        )
        .await?;

        Ok((
            StageOutcome::Completed,
            format!("signed in as {}", credentials.username),
        ))
    }

    /// Close the "Start Building" dialog if it appears
    async fn dismiss_onboarding<P>(&self, page: &P) -> E2eResult<StageOutput>
    where
        P: Page + ?Sized,
    {
        let close = Locator::role("button", "Close");
        info!("Waiting for potential onboarding modal...");

        let dismissed = async {
            page.wait_for(
                &close,
                WaitState::Visible,
                secs(self.config.timeouts.onboarding_secs),
            )
            .await?;
            info!("Closing onboarding modal...");
            page.click(&close, false).await?;
            page.wait_for(&close, WaitState::Hidden, HIDE_TIMEOUT).await
        }
        .await;

        match dismissed {
            Ok(()) => Ok((StageOutcome::Completed, "onboarding dialog closed".to_string())),
            Err(e) => {
                info!("Onboarding modal did not appear (or we missed it): {}", e);
                Ok((StageOutcome::Skipped, e.to_string()))
            }
        }
    }

    /// Upload through the "+" modal; fall back to waiting for a manual drop.
    /// Hard failure: the file never shows up within the manual window.
    async fn upload<P>(&self, page: &P) -> E2eResult<StageOutput>
    where
        P: Page + ?Sized,
    {
        info!("Attempting automated file upload...");
        match self.automated_upload(page).await {
            Ok(UploadRoute::DirectInput) => {
                info!("File Upload Success!");
                Ok((StageOutcome::Completed, "file input set directly".to_string()))
            }
            Ok(UploadRoute::FileChooser) => {
                info!("File Upload Success!");
                Ok((StageOutcome::Fallback, "uploaded via file chooser".to_string()))
            }
            Err(e) => {
                warn!("Upload automation failed: {}", e);
                warn!(
                    "Automation failed. Please manually drag and drop \"{}\".",
                    self.config.upload_file.display()
                );
                page.wait_for(
                    &self.uploaded_file_label(),
                    WaitState::Visible,
                    secs(self.config.timeouts.manual_upload_secs),
                )
                .await?;
                Ok((StageOutcome::Manual, format!("manual upload after: {}", e)))
            }
        }
    }

    async fn automated_upload<P>(&self, page: &P) -> E2eResult<UploadRoute>
    where
        P: Page + ?Sized,
    {
        let plus = plus_button();
        if !visible(page, &plus).await {
            return Err(E2eError::NotVisible(plus.to_js()));
        }
        page.click(&plus, true).await?;

        page.wait_for(
            &Locator::text("Add New File"),
            WaitState::Visible,
            secs(self.config.timeouts.upload_modal_secs),
        )
        .await?;

        let path = self.config.upload_file.as_path();
        let route = match page.set_input_files(&file_input(), path).await {
            Ok(()) => UploadRoute::DirectInput,
            Err(e) => {
                debug!("Direct file input failed ({}), using Browse Here", e);
                page.upload_via_chooser(
                    &Locator::text("Browse Here"),
                    path,
                    secs(self.config.timeouts.file_chooser_secs),
                )
                .await?;
                UploadRoute::FileChooser
            }
        };

        page.pause(ATTACH_SETTLE).await;
        page.click(&Locator::role_exact("button", "Attach"), false)
            .await?;

        page.wait_for(
            &self.uploaded_file_label(),
            WaitState::Visible,
            secs(self.config.timeouts.upload_confirm_secs),
        )
        .await?;

        Ok(route)
    }

    /// Fill the instruction and start the run.
    /// Hard failure: the prompt box cannot be filled.
    async fn submit_prompt<P>(&self, page: &P) -> E2eResult<StageOutput>
    where
        P: Page + ?Sized,
    {
        let prompt = prompt_input();
        page.fill(&prompt, &self.config.settings.prompt).await?;

        info!("Prompt filled. Attempting to click Run...");
        let chain = run_button_chain(&prompt);
        match chain.first_visible(page).await {
            Some(finder) => {
                info!("Found run button candidate ({}), clicking...", finder.label);
                page.click(&finder.locator, false).await?;
                let outcome = if chain.finders()[0].label == finder.label {
                    StageOutcome::Completed
                } else {
                    StageOutcome::Fallback
                };
                Ok((outcome, format!("clicked {}", finder.label)))
            }
            None => {
                info!("No visible run button found. Pressing Enter in the prompt box...");
                page.press(&prompt, "Enter").await?;
                Ok((StageOutcome::Fallback, "pressed Enter".to_string()))
            }
        }
    }

    /// Wait for a plan table or graph; confirm the plan when asked to
    async fn await_processing<P>(&self, page: &P) -> E2eResult<StageOutput>
    where
        P: Page + ?Sized,
    {
        info!("Waiting for processing...");
        let any_view = Locator::css("table, .react-flow__node").first();
        if let Err(e) = page
            .wait_for(
                &any_view,
                WaitState::Visible,
                secs(self.config.timeouts.processing_secs),
            )
            .await
        {
            info!("Timeout waiting for table/graph, continuing to checks... ({})", e);
        }

        if !visible(page, &plan_table()).await {
            return Ok((StageOutcome::Completed, "no plan table".to_string()));
        }

        info!("Plan/Preview detected.");
        info!(
            "ACTION REQUIRED: If the pipeline is not running, please MANUALLY CLICK the \
             \"Run\", \"Apply\", or \"Play\" button."
        );

        if !self.config.settings.auto_confirm_plan {
            return Ok((StageOutcome::Manual, "plan awaiting manual run".to_string()));
        }

        // Only explicit confirmations; generic icons may be "Stop".
        let confirm = Locator::css("button")
            .filter_text(TextMatch::pattern("proceed|confirm|execute|apply"))
            .first();
        if visible(page, &confirm).await {
            info!("Found explicit Proceed/Execute button. Clicking...");
            match page.click(&confirm, false).await {
                Ok(()) => return Ok((StageOutcome::Completed, "plan confirmed".to_string())),
                Err(e) => info!("Auto-click exception: {}", e),
            }
        }
        Ok((StageOutcome::Manual, "plan awaiting manual run".to_string()))
    }

    /// Click the transformation node and open its Preview tab
    async fn open_preview<P>(&self, page: &P) -> E2eResult<StageOutput>
    where
        P: Page + ?Sized,
    {
        info!("Automating Result Preview...");
        page.pause(PIPELINE_SETTLE).await;

        let target = TextMatch::pattern(self.config.settings.node_pattern.clone());
        for attempt in 1..=PREVIEW_ATTEMPTS {
            match self.try_open_preview(page, &target, attempt).await {
                Ok(true) => {
                    let outcome = if attempt == 1 {
                        StageOutcome::Completed
                    } else {
                        StageOutcome::Fallback
                    };
                    return Ok((outcome, format!("preview opened on attempt {}", attempt)));
                }
                Ok(false) => {}
                Err(e) => info!("Preview attempt {} failed: {}", attempt, e),
            }
        }

        warn!("Could not auto-open preview. Manual intervention might be needed.");
        Ok((
            StageOutcome::Manual,
            format!("preview not opened after {} attempts", PREVIEW_ATTEMPTS),
        ))
    }

    async fn try_open_preview<P>(
        &self,
        page: &P,
        target: &TextMatch,
        attempt: usize,
    ) -> E2eResult<bool>
    where
        P: Page + ?Sized,
    {
        let specific = Locator::css(".react-flow__node")
            .filter_text(target.clone())
            .last();

        if visible(page, &specific).await {
            info!("Attempt {}: clicking node matching the prompt...", attempt);
            page.click(&specific, true).await?;
        } else {
            let nodes = any_node();
            let count = page.count(&nodes).await?;
            if count > 0 {
                info!(
                    "Attempt {}: specific node not found. Clicking LAST node (index {})...",
                    attempt,
                    count - 1
                );
                page.click(&nodes.nth(count - 1), true).await?;
            }
        }

        page.pause(NODE_SETTLE).await;

        // A tab, so the word "preview" inside the prompt text does not match.
        let preview_tab = Locator::role("tab", TextMatch::pattern("Preview"));
        if visible(page, &preview_tab).await {
            info!("Preview Tab found! Clicking...");
            page.click(&preview_tab, true).await?;
            page.pause(PREVIEW_RENDER).await;
            return Ok(true);
        }
        Ok(false)
    }

    /// Hard failure: no table containing the readiness marker in time
    async fn await_result<P>(&self, page: &P) -> E2eResult<StageOutput>
    where
        P: Page + ?Sized,
    {
        info!("Waiting for Final Result Data...");
        page.wait_for(
            &result_table(&self.config.settings.readiness_marker),
            WaitState::Visible,
            secs(self.config.timeouts.result_secs),
        )
        .await?;
        Ok((
            StageOutcome::Completed,
            format!(
                "result table contains '{}'",
                self.config.settings.readiness_marker
            ),
        ))
    }

    /// Menu click, CSV option, capture the download event.
    /// Hard failure: no download even after the manual window, or no file.
    async fn download<P>(&self, page: &P) -> E2eResult<StageOutput>
    where
        P: Page + ?Sized,
    {
        info!("Attempting download...");
        page.arm_download(secs(self.config.timeouts.download_secs))
            .await?;

        let triggered = self.click_download_menu(page).await;

        let dest = self.config.download_to.as_path();
        let outcome = match page.save_download(dest).await {
            Ok(()) if triggered => StageOutcome::Completed,
            Ok(()) => StageOutcome::Fallback,
            Err(e) => {
                warn!("Auto-download failed: {}", e);
                warn!("ACTION REQUIRED: Please MANUALLY Open Dropdown and Select \"Download as CSV\".");
                page.arm_download(secs(self.config.timeouts.manual_download_secs))
                    .await?;
                page.save_download(dest).await?;
                StageOutcome::Manual
            }
        };

        if !dest.is_file() {
            return Err(E2eError::AssertionFailed(format!(
                "download not saved to {}",
                dest.display()
            )));
        }
        info!("Download successful! Saved to {}", dest.display());
        Ok((outcome, format!("saved to {}", dest.display())))
    }

    /// Try each visible menu button until a CSV option can be clicked
    async fn click_download_menu<P>(&self, page: &P) -> bool
    where
        P: Page + ?Sized,
    {
        let menus = download_menu_chain();
        let options = csv_option_chain();

        for menu in menus.finders() {
            if !visible(page, &menu.locator).await {
                continue;
            }
            info!("Found Download menu button ({}). Clicking to open dropdown...", menu.label);
            if let Err(e) = page.click(&menu.locator, true).await {
                info!("Error interacting with download button: {}", e);
                continue;
            }
            page.pause(MENU_SETTLE).await;

            match options.first_visible(page).await {
                Some(option) => {
                    info!("Found \"Download as CSV\" option ({}). Clicking...", option.label);
                    match page.click(&option.locator, true).await {
                        Ok(()) => return true,
                        Err(e) => info!("Error clicking CSV option: {}", e),
                    }
                }
                None => {
                    info!("Dropdown option not found. Checking if file downloaded immediately...");
                }
            }
        }
        false
    }

    fn uploaded_file_label(&self) -> Locator {
        let name = self
            .config
            .upload_file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "input.csv".to_string());
        Locator::text(TextMatch::literal_pattern(&name))
    }
}

enum UploadRoute {
    DirectInput,
    FileChooser,
}

async fn timed<F>(name: &str, stage: F) -> E2eResult<StageResult>
where
    F: Future<Output = E2eResult<StageOutput>>,
{
    let start = Instant::now();
    debug!("Stage {} starting", name);

    let (outcome, detail) = stage.await.map_err(|e| E2eError::StageFailed {
        stage: name.to_string(),
        reason: e.to_string(),
    })?;

    let duration_ms = start.elapsed().as_millis() as u64;
    info!("Stage {} -> {:?} ({} ms): {}", name, outcome, duration_ms, detail);

    Ok(StageResult {
        stage: name.to_string(),
        outcome,
        detail,
        duration_ms,
    })
}

/// Visibility check where an error just means "no"
async fn visible<P>(page: &P, locator: &Locator) -> bool
where
    P: Page + ?Sized,
{
    match page.is_visible(locator).await {
        Ok(v) => v,
        Err(e) => {
            debug!("Visibility check failed for {}: {}", locator, e);
            false
        }
    }
}

fn secs(s: u64) -> Duration {
    Duration::from_secs(s)
}

pub fn email_input() -> Locator {
    Locator::role("textbox", TextMatch::pattern("email"))
}

pub fn prompt_heading() -> Locator {
    Locator::role("heading", TextMatch::pattern("Type a Prompt"))
}

pub fn plus_button() -> Locator {
    Locator::css("button")
        .filter_has(Locator::css("svg.lucide-plus"))
        .first()
}

pub fn file_input() -> Locator {
    Locator::css(r#"input[type="file"]"#)
}

pub fn prompt_input() -> Locator {
    Locator::role("textbox", TextMatch::pattern("What|Describe|Prompt"))
}

pub fn plan_table() -> Locator {
    Locator::css("table")
        .filter_text(TextMatch::pattern("Transformation|Action|Purpose"))
        .first()
}

pub fn any_node() -> Locator {
    Locator::css(r#".react-flow__node, [data-testid*="node"], .node"#)
}

pub fn result_table(marker: &str) -> Locator {
    Locator::css("table")
        .filter_text(TextMatch::literal_pattern(marker))
        .first()
}

/// Run control next to the prompt: text button, aria labels, submit, or the
/// icon button beside the textbox. `.last()` skips e.g. a "remove file" X.
pub fn run_button_chain(prompt: &Locator) -> FinderChain {
    FinderChain::new("run button")
        .with(
            "button named generate/run/transform/build",
            Locator::role("button", TextMatch::pattern("generate|run|transform|build")),
        )
        .with("label Run", Locator::label("Run"))
        .with("label Generate", Locator::label("Generate"))
        .with("submit button", Locator::css(r#"button[type="submit"]"#))
        .with(
            "button after prompt",
            prompt
                .clone()
                .locator("xpath=following-sibling::button")
                .last(),
        )
        .with(
            "button in prompt container",
            prompt.clone().locator("..").locator("button").last(),
        )
}

pub fn download_menu_chain() -> FinderChain {
    FinderChain::new("download menu")
        .with(
            "button named download/export/csv",
            Locator::role("button", TextMatch::pattern("download|export|csv")),
        )
        .with(
            "label download/export",
            Locator::label(TextMatch::pattern("download|export")),
        )
        .with(
            "button with download icon",
            Locator::css(r#"button:has(svg[data-icon="download"])"#),
        )
        .with(
            "text Download",
            Locator::text(TextMatch::pattern("^Download$")),
        )
}

pub fn csv_option_chain() -> FinderChain {
    FinderChain::new("csv option")
        .with(
            "text Download as CSV",
            Locator::text(TextMatch::pattern("Download as CSV|CSV")).first(),
        )
        .with(
            "menuitem CSV",
            Locator::role("menuitem", TextMatch::pattern("CSV")).first(),
        )
        .with(
            "list item CSV",
            Locator::css("li").filter_text(TextMatch::pattern("CSV")).first(),
        )
        .with(
            "option CSV",
            Locator::css(r#"div[role="option"]"#)
                .filter_text(TextMatch::pattern("CSV"))
                .first(),
        )
}
