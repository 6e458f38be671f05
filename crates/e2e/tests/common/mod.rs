#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use pipecheck_e2e::{E2eError, E2eResult, LoadState, Locator, Page, WaitState};

/// What clicking an element does to the fake page
#[derive(Debug, Clone)]
pub enum Effect {
    Show(Locator),
    Hide(Locator),
    /// Starts a browser download
    Download,
}

#[derive(Default)]
struct State {
    url: String,
    visible: HashSet<String>,
    counts: HashMap<String, usize>,
    broken: HashSet<String>,
    effects: HashMap<String, Vec<Effect>>,
    events: Vec<String>,
    armed: bool,
    arms: usize,
    download_started: bool,
    manual_download_on_arm: Option<usize>,
    direct_input_fails: bool,
}

/// Scripted `Page`: elements are identified by their rendered JS expression
pub struct MockPage {
    state: Mutex<State>,
    download_body: String,
    goto_delay: Option<Duration>,
}

impl MockPage {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            download_body: "Name,email\n".to_string(),
            goto_delay: None,
        }
    }

    pub fn show(self, locator: &Locator) -> Self {
        self.state.lock().unwrap().visible.insert(locator.to_js());
        self
    }

    pub fn with_url(self, url: &str) -> Self {
        self.state.lock().unwrap().url = url.to_string();
        self
    }

    pub fn with_count(self, locator: &Locator, count: usize) -> Self {
        self.state.lock().unwrap().counts.insert(locator.to_js(), count);
        self
    }

    /// Probing or acting on this locator errors
    pub fn broken(self, locator: &Locator) -> Self {
        self.state.lock().unwrap().broken.insert(locator.to_js());
        self
    }

    pub fn on_click(self, locator: &Locator, effect: Effect) -> Self {
        self.state
            .lock()
            .unwrap()
            .effects
            .entry(locator.to_js())
            .or_default()
            .push(effect);
        self
    }

    /// Someone downloads the file by hand after the n-th listener is armed
    pub fn manual_download_on_arm(self, n: usize) -> Self {
        self.state.lock().unwrap().manual_download_on_arm = Some(n);
        self
    }

    pub fn direct_input_fails(self) -> Self {
        self.state.lock().unwrap().direct_input_fails = true;
        self
    }

    pub fn download_body(mut self, body: &str) -> Self {
        self.download_body = body.to_string();
        self
    }

    pub fn goto_delay(mut self, delay: Duration) -> Self {
        self.goto_delay = Some(delay);
        self
    }

    pub fn events(&self) -> Vec<String> {
        self.state.lock().unwrap().events.clone()
    }

    pub fn saw(&self, event: &str) -> bool {
        self.events().iter().any(|e| e == event)
    }

    pub fn clicked(&self, locator: &Locator) -> bool {
        self.saw(&format!("click {}", locator.to_js()))
    }

    fn record(&self, event: String) {
        self.state.lock().unwrap().events.push(event);
    }

    fn check_broken(&self, js: &str) -> E2eResult<()> {
        if self.state.lock().unwrap().broken.contains(js) {
            Err(E2eError::Playwright(format!("strict mode violation: {}", js)))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Page for MockPage {
    async fn goto(&self, url: &str) -> E2eResult<()> {
        if let Some(delay) = self.goto_delay {
            tokio::time::sleep(delay).await;
        }
        self.record(format!("goto {}", url));
        let mut state = self.state.lock().unwrap();
        if state.url.is_empty() {
            state.url = url.to_string();
        }
        Ok(())
    }

    async fn wait_for_load_state(&self, state: LoadState) -> E2eResult<()> {
        self.record(format!("load {:?}", state));
        Ok(())
    }

    async fn url(&self) -> E2eResult<String> {
        Ok(self.state.lock().unwrap().url.clone())
    }

    async fn is_visible(&self, locator: &Locator) -> E2eResult<bool> {
        let js = locator.to_js();
        self.check_broken(&js)?;
        Ok(self.state.lock().unwrap().visible.contains(&js))
    }

    async fn count(&self, locator: &Locator) -> E2eResult<usize> {
        let js = locator.to_js();
        Ok(self.state.lock().unwrap().counts.get(&js).copied().unwrap_or(0))
    }

    async fn click(&self, locator: &Locator, _force: bool) -> E2eResult<()> {
        let js = locator.to_js();
        self.check_broken(&js)?;
        self.record(format!("click {}", js));

        let mut state = self.state.lock().unwrap();
        let effects = state.effects.get(&js).cloned().unwrap_or_default();
        for effect in effects {
            match effect {
                Effect::Show(l) => {
                    state.visible.insert(l.to_js());
                }
                Effect::Hide(l) => {
                    state.visible.remove(&l.to_js());
                }
                Effect::Download => state.download_started = true,
            }
        }
        Ok(())
    }

    async fn fill(&self, locator: &Locator, value: &str) -> E2eResult<()> {
        let js = locator.to_js();
        self.check_broken(&js)?;
        self.record(format!("fill {} = {}", js, value));
        Ok(())
    }

    async fn press(&self, locator: &Locator, key: &str) -> E2eResult<()> {
        self.record(format!("press {} {}", key, locator.to_js()));
        Ok(())
    }

    async fn wait_for(
        &self,
        locator: &Locator,
        state: WaitState,
        _timeout: Duration,
    ) -> E2eResult<()> {
        let js = locator.to_js();
        let visible = self.state.lock().unwrap().visible.contains(&js);
        let satisfied = match state {
            WaitState::Visible | WaitState::Attached => visible,
            WaitState::Hidden | WaitState::Detached => !visible,
        };
        if satisfied {
            Ok(())
        } else {
            Err(E2eError::Timeout(js))
        }
    }

    async fn set_input_files(&self, locator: &Locator, path: &Path) -> E2eResult<()> {
        if self.state.lock().unwrap().direct_input_fails {
            return Err(E2eError::Playwright("input is hidden".to_string()));
        }
        self.record(format!("set files {} {}", locator.to_js(), path.display()));
        Ok(())
    }

    async fn upload_via_chooser(
        &self,
        trigger: &Locator,
        path: &Path,
        _timeout: Duration,
    ) -> E2eResult<()> {
        self.record(format!("chooser {} {}", trigger.to_js(), path.display()));
        Ok(())
    }

    async fn arm_download(&self, _timeout: Duration) -> E2eResult<()> {
        let mut state = self.state.lock().unwrap();
        state.armed = true;
        state.arms += 1;
        if state.manual_download_on_arm == Some(state.arms) {
            state.download_started = true;
        }
        state.events.push("arm download".to_string());
        Ok(())
    }

    async fn save_download(&self, path: &Path) -> E2eResult<()> {
        {
            let mut state = self.state.lock().unwrap();
            if !state.armed {
                return Err(E2eError::Playwright("no download listener armed".to_string()));
            }
            state.armed = false;
            if !state.download_started {
                return Err(E2eError::Timeout("download".to_string()));
            }
            state.download_started = false;
        }
        std::fs::write(path, &self.download_body)?;
        self.record(format!("saved {}", path.display()));
        Ok(())
    }

    async fn pause(&self, duration: Duration) {
        self.record(format!("pause {}ms", duration.as_millis()));
    }
}
