//! Playwright browser automation
//!
//! A small Node driver script is written to a temp dir and started once per
//! session. Commands go to its stdin and answers come back on stdout, one
//! JSON object per line, so the browser keeps its state (cookies, open
//! modals, pending downloads) across every pipeline stage.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command as TokioCommand};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use pipecheck_common::{BrowserKind, HarnessConfig};

use crate::error::{E2eError, E2eResult};
use crate::locator::Locator;
use crate::page::{LoadState, Page, WaitState};

/// Configuration for Playwright
#[derive(Debug, Clone)]
pub struct PlaywrightConfig {
    pub browser: BrowserKind,
    pub headless: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,

    /// `node` executable
    pub node_binary: PathBuf,

    /// Directory that contains the `playwright` package, exported as NODE_PATH
    pub node_modules: PathBuf,

    /// How long the browser may take to launch
    pub startup_timeout: Duration,

    /// Slack added on top of a command's own Playwright timeout, and the
    /// deadline for commands without one
    pub command_grace: Duration,
}

impl Default for PlaywrightConfig {
    fn default() -> Self {
        Self {
            browser: BrowserKind::Chromium,
            headless: true,
            viewport_width: 1280,
            viewport_height: 720,
            node_binary: PathBuf::from("node"),
            node_modules: PathBuf::from("node_modules"),
            startup_timeout: Duration::from_secs(60),
            command_grace: Duration::from_secs(60),
        }
    }
}

impl PlaywrightConfig {
    pub fn from_harness(config: &HarnessConfig) -> Self {
        Self {
            browser: config.browser.kind,
            headless: config.browser.headless,
            viewport_width: config.browser.viewport_width,
            viewport_height: config.browser.viewport_height,
            ..Default::default()
        }
    }
}

/// One request to the driver. `op` is the tag the script dispatches on.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum DriverCommand {
    Goto {
        url: String,
    },
    LoadState {
        state: LoadState,
    },
    Url,
    IsVisible {
        locator: String,
    },
    Count {
        locator: String,
    },
    Click {
        locator: String,
        force: bool,
    },
    Fill {
        locator: String,
        value: String,
    },
    Press {
        locator: String,
        key: String,
    },
    WaitFor {
        locator: String,
        state: WaitState,
        timeout_ms: u64,
    },
    SetInputFiles {
        locator: String,
        path: String,
    },
    UploadViaChooser {
        locator: String,
        path: String,
        timeout_ms: u64,
    },
    ArmDownload {
        timeout_ms: u64,
    },
    SaveDownload {
        path: String,
    },
    Close,
}

impl DriverCommand {
    /// Short label for logs and timeout errors
    fn describe(&self) -> String {
        match self {
            DriverCommand::Goto { url } => format!("goto {}", url),
            DriverCommand::LoadState { state } => format!("load state {:?}", state),
            DriverCommand::Url => "url".to_string(),
            DriverCommand::IsVisible { locator } => format!("is_visible {}", locator),
            DriverCommand::Count { locator } => format!("count {}", locator),
            DriverCommand::Click { locator, .. } => format!("click {}", locator),
            DriverCommand::Fill { locator, .. } => format!("fill {}", locator),
            DriverCommand::Press { locator, key } => format!("press {} in {}", key, locator),
            DriverCommand::WaitFor { locator, state, .. } => {
                format!("{:?} {}", state, locator)
            }
            DriverCommand::SetInputFiles { locator, .. } => format!("set files on {}", locator),
            DriverCommand::UploadViaChooser { locator, .. } => {
                format!("file chooser from {}", locator)
            }
            DriverCommand::ArmDownload { .. } => "arm download".to_string(),
            DriverCommand::SaveDownload { path } => format!("download to {}", path),
            DriverCommand::Close => "close".to_string(),
        }
    }

    fn deadline(&self, grace: Duration) -> Duration {
        match self {
            DriverCommand::WaitFor { timeout_ms, .. }
            | DriverCommand::UploadViaChooser { timeout_ms, .. } => {
                Duration::from_millis(*timeout_ms) + grace
            }
            // The armed listener carries its own timeout; saving waits on it.
            DriverCommand::SaveDownload { .. } => grace * 4,
            _ => grace,
        }
    }
}

#[derive(Debug, Deserialize)]
struct DriverResponse {
    #[serde(default)]
    id: Option<u64>,
    #[serde(default)]
    ok: bool,
    #[serde(default)]
    value: serde_json::Value,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    timeout: bool,
    #[serde(default)]
    ready: bool,
}

struct DriverIo {
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
}

/// Live browser session backed by the Node driver
pub struct PlaywrightSession {
    child: Child,
    io: Mutex<DriverIo>,
    next_id: AtomicU64,
    command_grace: Duration,
    _script_dir: tempfile::TempDir,
}

impl PlaywrightSession {
    /// Launch the browser and wait for the driver to report ready
    pub async fn launch(config: &PlaywrightConfig) -> E2eResult<Self> {
        check_playwright_installed().await?;

        let script_dir = tempfile::tempdir()?;
        let script_path = script_dir.path().join("driver.js");
        std::fs::write(&script_path, DRIVER_SCRIPT)?;

        let options = serde_json::json!({
            "browser": config.browser.as_str(),
            "headless": config.headless,
            "viewport": {
                "width": config.viewport_width,
                "height": config.viewport_height,
            },
        });

        let mut cmd = TokioCommand::new(&config.node_binary);
        cmd.arg(&script_path)
            .arg(options.to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if config.node_modules.exists() {
            let node_path = std::fs::canonicalize(&config.node_modules)
                .unwrap_or_else(|_| config.node_modules.clone());
            cmd.env("NODE_PATH", node_path);
        }

        debug!("Starting Playwright driver: {}", script_path.display());

        let mut child = cmd.spawn().map_err(|e| {
            E2eError::Playwright(format!(
                "Failed to spawn {}: {}",
                config.node_binary.display(),
                e
            ))
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| E2eError::Playwright("driver stdin unavailable".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| E2eError::Playwright("driver stdout unavailable".to_string()))?;

        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!("[driver] {}", line);
                }
            });
        }

        let mut stdout = BufReader::new(stdout).lines();
        tokio::time::timeout(config.startup_timeout, wait_ready(&mut stdout))
            .await
            .map_err(|_| E2eError::Timeout("Playwright driver startup".to_string()))??;

        info!(
            "Browser ready ({}{})",
            config.browser.as_str(),
            if config.headless { ", headless" } else { "" }
        );

        Ok(Self {
            child,
            io: Mutex::new(DriverIo { stdin, stdout }),
            next_id: AtomicU64::new(1),
            command_grace: config.command_grace,
            _script_dir: script_dir,
        })
    }

    /// Close the browser and reap the driver
    pub async fn close(self) -> E2eResult<()> {
        if let Err(e) = self.call(DriverCommand::Close).await {
            debug!("Driver close request failed: {}", e);
        }

        let Self { mut child, .. } = self;
        match tokio::time::timeout(Duration::from_secs(5), child.wait()).await {
            Ok(status) => {
                debug!("Driver exited: {:?}", status?);
            }
            Err(_) => {
                warn!("Driver did not exit, killing it");
                child.kill().await?;
            }
        }
        Ok(())
    }

    async fn call(&self, command: DriverCommand) -> E2eResult<serde_json::Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let what = command.describe();
        let deadline = command.deadline(self.command_grace);

        let mut payload = serde_json::to_value(&command)?;
        payload["id"] = serde_json::Value::from(id);
        let mut line = payload.to_string();
        line.push('\n');

        let mut io = self.io.lock().await;
        io.stdin.write_all(line.as_bytes()).await?;
        io.stdin.flush().await?;

        let response = tokio::time::timeout(deadline, read_response(&mut io.stdout, id))
            .await
            .map_err(|_| E2eError::Timeout(what.clone()))??;

        if response.ok {
            Ok(response.value)
        } else if response.timeout {
            Err(E2eError::Timeout(what))
        } else {
            Err(E2eError::Playwright(format!(
                "{}: {}",
                what,
                response.error.unwrap_or_else(|| "unknown driver error".to_string())
            )))
        }
    }
}

async fn wait_ready(lines: &mut Lines<BufReader<ChildStdout>>) -> E2eResult<()> {
    loop {
        match lines.next_line().await? {
            Some(line) => match serde_json::from_str::<DriverResponse>(&line) {
                Ok(resp) if resp.ready => return Ok(()),
                Ok(resp) if resp.error.is_some() => {
                    return Err(E2eError::Playwright(resp.error.unwrap_or_default()))
                }
                _ => debug!("[driver] {}", line),
            },
            None => {
                return Err(E2eError::DriverExited(
                    "exited before the browser was ready".to_string(),
                ))
            }
        }
    }
}

async fn read_response(
    lines: &mut Lines<BufReader<ChildStdout>>,
    id: u64,
) -> E2eResult<DriverResponse> {
    loop {
        let line = lines
            .next_line()
            .await?
            .ok_or_else(|| E2eError::DriverExited(format!("no answer to request {}", id)))?;

        match serde_json::from_str::<DriverResponse>(&line) {
            Ok(resp) if resp.id == Some(id) => return Ok(resp),
            Ok(resp) => debug!("Dropping stale driver answer {:?}", resp.id),
            Err(_) => debug!("[driver] {}", line),
        }
    }
}

/// Check if Playwright is installed
async fn check_playwright_installed() -> E2eResult<()> {
    let status = TokioCommand::new("npx")
        .args(["playwright", "--version"])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await;

    match status {
        Ok(status) if status.success() => Ok(()),
        _ => Err(E2eError::PlaywrightNotFound),
    }
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

#[async_trait]
impl Page for PlaywrightSession {
    async fn goto(&self, url: &str) -> E2eResult<()> {
        self.call(DriverCommand::Goto {
            url: url.to_string(),
        })
        .await
        .map(drop)
    }

    async fn wait_for_load_state(&self, state: LoadState) -> E2eResult<()> {
        self.call(DriverCommand::LoadState { state }).await.map(drop)
    }

    async fn url(&self) -> E2eResult<String> {
        let value = self.call(DriverCommand::Url).await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn is_visible(&self, locator: &Locator) -> E2eResult<bool> {
        let value = self
            .call(DriverCommand::IsVisible {
                locator: locator.to_js(),
            })
            .await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn count(&self, locator: &Locator) -> E2eResult<usize> {
        let value = self
            .call(DriverCommand::Count {
                locator: locator.to_js(),
            })
            .await?;
        Ok(value.as_u64().unwrap_or(0) as usize)
    }

    async fn click(&self, locator: &Locator, force: bool) -> E2eResult<()> {
        self.call(DriverCommand::Click {
            locator: locator.to_js(),
            force,
        })
        .await
        .map(drop)
    }

    async fn fill(&self, locator: &Locator, value: &str) -> E2eResult<()> {
        self.call(DriverCommand::Fill {
            locator: locator.to_js(),
            value: value.to_string(),
        })
        .await
        .map(drop)
    }

    async fn press(&self, locator: &Locator, key: &str) -> E2eResult<()> {
        self.call(DriverCommand::Press {
            locator: locator.to_js(),
            key: key.to_string(),
        })
        .await
        .map(drop)
    }

    async fn wait_for(
        &self,
        locator: &Locator,
        state: WaitState,
        timeout: Duration,
    ) -> E2eResult<()> {
        self.call(DriverCommand::WaitFor {
            locator: locator.to_js(),
            state,
            timeout_ms: timeout.as_millis() as u64,
        })
        .await
        .map(drop)
    }

    async fn set_input_files(&self, locator: &Locator, path: &Path) -> E2eResult<()> {
        self.call(DriverCommand::SetInputFiles {
            locator: locator.to_js(),
            path: path_arg(path),
        })
        .await
        .map(drop)
    }

    async fn upload_via_chooser(
        &self,
        trigger: &Locator,
        path: &Path,
        timeout: Duration,
    ) -> E2eResult<()> {
        self.call(DriverCommand::UploadViaChooser {
            locator: trigger.to_js(),
            path: path_arg(path),
            timeout_ms: timeout.as_millis() as u64,
        })
        .await
        .map(drop)
    }

    async fn arm_download(&self, timeout: Duration) -> E2eResult<()> {
        self.call(DriverCommand::ArmDownload {
            timeout_ms: timeout.as_millis() as u64,
        })
        .await
        .map(drop)
    }

    async fn save_download(&self, path: &Path) -> E2eResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        self.call(DriverCommand::SaveDownload {
            path: path_arg(path),
        })
        .await
        .map(drop)
    }

    async fn pause(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Node side of the session. Locators arrive as JS expressions over `page`.
const DRIVER_SCRIPT: &str = r##"
const playwright = require('playwright');
const readline = require('readline');

const options = JSON.parse(process.argv[2] || '{}');
const send = (msg) => process.stdout.write(JSON.stringify(msg) + '\n');

(async () => {
  const browserType = playwright[options.browser || 'chromium'];
  const browser = await browserType.launch({ headless: options.headless !== false });
  const context = await browser.newContext({ viewport: options.viewport, acceptDownloads: true });
  const page = await context.newPage();
  let pendingDownload = null;

  const locate = (expr) => new Function('page', `return ${expr};`)(page);

  const handlers = {
    goto: async (c) => { await page.goto(c.url); },
    load_state: async (c) => { await page.waitForLoadState(c.state); },
    url: async () => page.url(),
    is_visible: async (c) => locate(c.locator).isVisible(),
    count: async (c) => locate(c.locator).count(),
    click: async (c) => { await locate(c.locator).click({ force: c.force }); },
    fill: async (c) => { await locate(c.locator).fill(c.value); },
    press: async (c) => { await locate(c.locator).press(c.key); },
    wait_for: async (c) => {
      await locate(c.locator).waitFor({ state: c.state, timeout: c.timeout_ms });
    },
    set_input_files: async (c) => { await locate(c.locator).setInputFiles(c.path); },
    upload_via_chooser: async (c) => {
      const chooser = page.waitForEvent('filechooser', { timeout: c.timeout_ms });
      await locate(c.locator).click({ force: true });
      await (await chooser).setFiles(c.path);
    },
    arm_download: async (c) => {
      pendingDownload = page.waitForEvent('download', { timeout: c.timeout_ms })
        .then((download) => ({ download }), (error) => ({ error }));
    },
    save_download: async (c) => {
      if (!pendingDownload) throw new Error('no download listener armed');
      const outcome = await pendingDownload;
      pendingDownload = null;
      if (outcome.error) throw outcome.error;
      await outcome.download.saveAs(c.path);
    },
  };

  send({ ready: true });

  const lines = readline.createInterface({ input: process.stdin });
  for await (const line of lines) {
    if (!line.trim()) continue;
    const cmd = JSON.parse(line);
    if (cmd.op === 'close') {
      send({ id: cmd.id, ok: true, value: null });
      break;
    }
    try {
      const handler = handlers[cmd.op];
      if (!handler) throw new Error(`unknown op ${cmd.op}`);
      const value = await handler(cmd);
      send({ id: cmd.id, ok: true, value: value === undefined ? null : value });
    } catch (err) {
      send({
        id: cmd.id,
        ok: false,
        error: String((err && err.message) || err),
        timeout: !!err && err.name === 'TimeoutError',
      });
    }
  }

  await browser.close();
  process.exit(0);
})().catch((err) => {
  send({ error: String((err && err.message) || err) });
  process.exit(1);
});
"##;
