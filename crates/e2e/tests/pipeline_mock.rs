//! Browser pipeline against a scripted page

mod common;

use std::path::Path;
use std::time::Duration;

use common::{Effect, MockPage};
use pipecheck_common::{Credentials, PipelineSettings, TimeoutConfig};
use pipecheck_e2e::pipeline::{
    csv_option_chain, download_menu_chain, email_input, plus_button, prompt_heading,
    prompt_input, result_table, run_button_chain, PipelineStatus, StageOutcome,
};
use pipecheck_e2e::{E2eError, Locator, PipelineConfig, TextMatch, UiPipeline};

const APP_URL: &str = "https://app.test";
const INPUT: &str = "Name,email\nAda,ADA@Example.com\nAda,ada@example.com\nBob,bob@example.com\n";
const CLEANED: &str = "Name,email\nAda,ada@example.com\nBob,bob@example.com\n";

fn config(dir: &Path) -> PipelineConfig {
    PipelineConfig {
        app_url: APP_URL.to_string(),
        credentials: Some(Credentials::new("qa@example.com", "hunter2")),
        upload_file: dir.join("input.csv"),
        download_to: dir.join("output.csv"),
        settings: PipelineSettings::default(),
        timeouts: TimeoutConfig::default(),
    }
}

fn with_input(dir: &Path) {
    std::fs::write(dir.join("input.csv"), INPUT).unwrap();
}

fn login_button() -> Locator {
    Locator::role("button", "Log In")
}

fn sign_in_button() -> Locator {
    Locator::role("button", TextMatch::pattern("sign in|log in"))
}

fn close_button() -> Locator {
    Locator::role("button", "Close")
}

fn uploaded_label() -> Locator {
    Locator::text(TextMatch::literal_pattern("input.csv"))
}

fn target_node() -> Locator {
    Locator::css(".react-flow__node")
        .filter_text(TextMatch::pattern(PipelineSettings::default().node_pattern))
        .last()
}

fn preview_tab() -> Locator {
    Locator::role("tab", TextMatch::pattern("Preview"))
}

fn first_run_button() -> Locator {
    run_button_chain(&prompt_input()).finders()[0].locator.clone()
}

fn menu_button() -> Locator {
    download_menu_chain().finders()[0].locator.clone()
}

fn csv_option() -> Locator {
    csv_option_chain().finders()[0].locator.clone()
}

/// Sign-in prompt through to a result table, everything found on first try
fn signed_in_page() -> MockPage {
    MockPage::new()
        .show(&login_button())
        .on_click(&sign_in_button(), Effect::Show(prompt_heading()))
        .show(&close_button())
        .on_click(&close_button(), Effect::Hide(close_button()))
        .show(&plus_button())
        .on_click(&plus_button(), Effect::Show(Locator::text("Add New File")))
        .on_click(
            &Locator::role_exact("button", "Attach"),
            Effect::Show(uploaded_label()),
        )
        .show(&first_run_button())
        .show(&target_node())
        .show(&preview_tab())
        .show(&result_table("@"))
}

fn with_download_menu(page: MockPage) -> MockPage {
    page.show(&menu_button())
        .on_click(&menu_button(), Effect::Show(csv_option()))
        .on_click(&csv_option(), Effect::Download)
}

#[tokio::test]
async fn test_happy_path_downloads_cleaned_csv() {
    let dir = tempfile::tempdir().unwrap();
    with_input(dir.path());
    let page = with_download_menu(signed_in_page()).download_body(CLEANED);

    let pipeline = UiPipeline::new(config(dir.path()));
    let report = pipeline.run(&page).await.unwrap();

    assert_eq!(report.status, PipelineStatus::Passed);
    let stages: Vec<&str> = report.stages.iter().map(|s| s.stage.as_str()).collect();
    assert_eq!(
        stages,
        [
            "sign_in",
            "dismiss_onboarding",
            "upload",
            "submit_prompt",
            "await_processing",
            "open_preview",
            "await_result",
            "download",
        ]
    );
    for stage in &report.stages {
        assert_eq!(stage.outcome, StageOutcome::Completed, "{}", stage.stage);
    }
    assert_eq!(report.degraded().count(), 0);

    assert!(page.saw(&format!("goto {}", APP_URL)));
    assert!(page.saw(&format!("fill {} = qa@example.com", email_input().to_js())));
    assert!(page.clicked(&first_run_button()));
    assert!(page.clicked(&target_node()));

    let downloaded = report.download_path.unwrap();
    assert_eq!(std::fs::read_to_string(&downloaded).unwrap(), CLEANED);

    let validation = pipecheck_validator::validate(&dir.path().join("input.csv"), &downloaded)
        .unwrap();
    assert_eq!(validation.input_rows, 3);
    assert_eq!(validation.output_rows, 2);
    assert_eq!(validation.duplicate_rows, 0);
    assert!(!validation.has_warnings());
}

#[tokio::test]
async fn test_already_signed_in_skips_login() {
    let dir = tempfile::tempdir().unwrap();
    with_input(dir.path());
    let page = with_download_menu(
        MockPage::new()
            .with_url("https://app.test/hub")
            .show(&plus_button())
            .on_click(&plus_button(), Effect::Show(Locator::text("Add New File")))
            .on_click(
                &Locator::role_exact("button", "Attach"),
                Effect::Show(uploaded_label()),
            )
            .show(&first_run_button())
            .show(&target_node())
            .show(&preview_tab())
            .show(&result_table("@")),
    );

    let mut config = config(dir.path());
    config.credentials = None;
    let report = UiPipeline::new(config).run(&page).await.unwrap();

    assert_eq!(report.stage("sign_in").unwrap().outcome, StageOutcome::Skipped);
    assert_eq!(
        report.stage("dismiss_onboarding").unwrap().outcome,
        StageOutcome::Skipped
    );
    assert_eq!(report.status, PipelineStatus::Passed);
}

#[tokio::test]
async fn test_login_prompt_without_credentials_fails_sign_in() {
    let dir = tempfile::tempdir().unwrap();
    with_input(dir.path());
    let page = signed_in_page();

    let mut config = config(dir.path());
    config.credentials = None;
    let err = UiPipeline::new(config).run(&page).await.unwrap_err();

    match err {
        E2eError::StageFailed { stage, reason } => {
            assert_eq!(stage, "sign_in");
            assert!(reason.contains("TEST_USERNAME"), "{}", reason);
        }
        other => panic!("unexpected error: {}", other),
    }
    assert!(!page.saw(&format!("fill {} = qa@example.com", email_input().to_js())));
}

#[tokio::test]
async fn test_missing_input_skips_after_sign_in() {
    let dir = tempfile::tempdir().unwrap();
    let page = signed_in_page();

    let report = UiPipeline::new(config(dir.path())).run(&page).await.unwrap();

    assert_eq!(report.status, PipelineStatus::Skipped);
    assert!(report.download_path.is_none());
    assert_eq!(report.stages.len(), 3);
    assert_eq!(report.stage("upload").unwrap().outcome, StageOutcome::Skipped);
    assert!(!page.clicked(&plus_button()));
}

#[tokio::test]
async fn test_fallbacks_and_manual_steps_still_pass() {
    let dir = tempfile::tempdir().unwrap();
    with_input(dir.path());

    // No "+" button: the file is dropped by hand. No run button: Enter is
    // pressed. No download menu: the file is downloaded by hand.
    let page = MockPage::new()
        .with_url("https://app.test/hub")
        .show(&uploaded_label())
        .show(&result_table("@"))
        .broken(&first_run_button())
        .manual_download_on_arm(2)
        .download_body(CLEANED);

    let report = UiPipeline::new(config(dir.path())).run(&page).await.unwrap();

    assert_eq!(report.status, PipelineStatus::Passed);
    assert_eq!(report.stage("upload").unwrap().outcome, StageOutcome::Manual);
    let submit = report.stage("submit_prompt").unwrap();
    assert_eq!(submit.outcome, StageOutcome::Fallback);
    assert_eq!(submit.detail, "pressed Enter");
    assert_eq!(report.stage("open_preview").unwrap().outcome, StageOutcome::Manual);
    assert_eq!(report.stage("download").unwrap().outcome, StageOutcome::Manual);

    let degraded: Vec<&str> = report.degraded().map(|s| s.stage.as_str()).collect();
    assert_eq!(degraded, ["upload", "submit_prompt", "open_preview", "download"]);
    assert!(page.saw(&format!("press Enter {}", prompt_input().to_js())));
    assert!(dir.path().join("output.csv").is_file());
}

#[tokio::test]
async fn test_file_chooser_used_when_input_rejects_files() {
    let dir = tempfile::tempdir().unwrap();
    with_input(dir.path());
    let page = with_download_menu(signed_in_page()).direct_input_fails();

    let report = UiPipeline::new(config(dir.path())).run(&page).await.unwrap();

    let upload = report.stage("upload").unwrap();
    assert_eq!(upload.outcome, StageOutcome::Fallback);
    assert_eq!(upload.detail, "uploaded via file chooser");
    assert!(page
        .events()
        .iter()
        .any(|e| e.starts_with(&format!("chooser {}", Locator::text("Browse Here").to_js()))));
}

#[tokio::test]
async fn test_plan_table_is_confirmed() {
    let dir = tempfile::tempdir().unwrap();
    with_input(dir.path());
    let confirm = Locator::css("button")
        .filter_text(TextMatch::pattern("proceed|confirm|execute|apply"))
        .first();
    let page = with_download_menu(signed_in_page())
        .show(&pipecheck_e2e::pipeline::plan_table())
        .show(&confirm);

    let report = UiPipeline::new(config(dir.path())).run(&page).await.unwrap();

    let processing = report.stage("await_processing").unwrap();
    assert_eq!(processing.outcome, StageOutcome::Completed);
    assert_eq!(processing.detail, "plan confirmed");
    assert!(page.clicked(&confirm));
}

#[tokio::test]
async fn test_missing_result_table_fails_await_result() {
    let dir = tempfile::tempdir().unwrap();
    with_input(dir.path());
    let mut config = config(dir.path());
    config.settings.readiness_marker = "never-rendered".to_string();
    let page = with_download_menu(signed_in_page());

    let err = UiPipeline::new(config).run(&page).await.unwrap_err();

    match err {
        E2eError::StageFailed { stage, .. } => assert_eq!(stage, "await_result"),
        other => panic!("unexpected error: {}", other),
    }
    assert!(!dir.path().join("output.csv").exists());
}

#[tokio::test]
async fn test_no_download_fails_download_stage() {
    let dir = tempfile::tempdir().unwrap();
    with_input(dir.path());
    let page = signed_in_page();

    let err = UiPipeline::new(config(dir.path())).run(&page).await.unwrap_err();

    match err {
        E2eError::StageFailed { stage, reason } => {
            assert_eq!(stage, "download");
            assert!(reason.contains("download"), "{}", reason);
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[tokio::test]
async fn test_overall_timeout_bounds_the_run() {
    let dir = tempfile::tempdir().unwrap();
    with_input(dir.path());
    let mut config = config(dir.path());
    config.timeouts.overall_secs = 1;
    let page = signed_in_page().goto_delay(Duration::from_secs(5));

    let started = std::time::Instant::now();
    let err = UiPipeline::new(config).run(&page).await.unwrap_err();

    assert!(err.is_timeout(), "{}", err);
    assert!(started.elapsed() < Duration::from_secs(4));
}
