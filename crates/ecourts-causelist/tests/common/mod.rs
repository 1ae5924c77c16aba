//! Scripted browser used by the integration tests.
//!
//! The fake page answers readiness probes according to a script (ready after N
//! probes, or never), records every action in order, and counts how many
//! contexts and browsers were released.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{bail, Result};
use async_trait::async_trait;

use ecourts_causelist::renderer::{
    BrowserLauncher, LaunchOptions, NavigationResult, Probe, RenderContext, Renderer,
};

pub const FORM_URL: &str = "https://services.ecourts.gov.in/ecourtindia_v6/?p=cause_list/index";

/// Something the driver did to the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Navigate(String),
    Select(String, String),
    Clear(String),
    Type(String, String),
    Click(String),
}

/// How the fake page behaves.
#[derive(Debug, Clone, Default)]
pub struct PageScript {
    /// HTML served once the form is submitted.
    pub results_html: String,
    /// URL reported for the results page.
    pub results_url: String,
    /// Number of negative probes before an element becomes ready.
    pub ready_after: HashMap<String, usize>,
    /// Elements (ids, or the `table` tag) that never become ready.
    pub never_ready: HashSet<String>,
    /// Elements whose readiness check never answers.
    pub stalled_probes: HashSet<String>,
    /// Element ids whose actions never complete.
    pub stalled_actions: HashSet<String>,
    /// `get_url` fails.
    pub url_unavailable: bool,
}

impl PageScript {
    pub fn with_results(html: &str) -> Self {
        Self {
            results_html: html.to_string(),
            results_url: FORM_URL.to_string(),
            ..Self::default()
        }
    }

    pub fn never(mut self, key: &str) -> Self {
        self.never_ready.insert(key.to_string());
        self
    }

    pub fn after(mut self, key: &str, probes: usize) -> Self {
        self.ready_after.insert(key.to_string(), probes);
        self
    }

    pub fn stall_probe(mut self, key: &str) -> Self {
        self.stalled_probes.insert(key.to_string());
        self
    }

    pub fn without_url(mut self) -> Self {
        self.url_unavailable = true;
        self
    }

    pub fn stall_action(mut self, element_id: &str) -> Self {
        self.stalled_actions.insert(element_id.to_string());
        self
    }
}

/// Observations shared between the test and the fake browser.
#[derive(Debug, Default)]
pub struct BrowserLog {
    pub launches: Mutex<Vec<LaunchOptions>>,
    pub actions: Mutex<Vec<Action>>,
    pub probes: Mutex<HashMap<String, usize>>,
    pub contexts_opened: AtomicUsize,
    pub contexts_closed: AtomicUsize,
    pub shutdowns: AtomicUsize,
}

impl BrowserLog {
    pub fn actions(&self) -> Vec<Action> {
        self.actions.lock().unwrap().clone()
    }

    pub fn probe_count(&self, key: &str) -> usize {
        self.probes.lock().unwrap().get(key).copied().unwrap_or(0)
    }

    pub fn opened(&self) -> usize {
        self.contexts_opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.contexts_closed.load(Ordering::SeqCst)
    }

    pub fn shutdowns(&self) -> usize {
        self.shutdowns.load(Ordering::SeqCst)
    }

    /// Every acquired resource was released.
    pub fn all_released(&self) -> bool {
        let launches = self.launches.lock().unwrap().len();
        self.opened() == self.closed() && self.shutdowns() == launches
    }
}

pub struct FakeLauncher {
    script: PageScript,
    log: Arc<BrowserLog>,
    fail_new_context: bool,
}

impl FakeLauncher {
    pub fn new(script: PageScript) -> (Arc<Self>, Arc<BrowserLog>) {
        let log = Arc::new(BrowserLog::default());
        let launcher = Arc::new(Self {
            script,
            log: Arc::clone(&log),
            fail_new_context: false,
        });
        (launcher, log)
    }

    pub fn failing_new_context(script: PageScript) -> (Arc<Self>, Arc<BrowserLog>) {
        let log = Arc::new(BrowserLog::default());
        let launcher = Arc::new(Self {
            script,
            log: Arc::clone(&log),
            fail_new_context: true,
        });
        (launcher, log)
    }
}

#[async_trait]
impl BrowserLauncher for FakeLauncher {
    async fn launch(&self, options: &LaunchOptions) -> Result<Box<dyn Renderer>> {
        self.log.launches.lock().unwrap().push(options.clone());
        Ok(Box::new(FakeRenderer {
            script: self.script.clone(),
            log: Arc::clone(&self.log),
            fail_new_context: self.fail_new_context,
        }))
    }
}

pub struct FakeRenderer {
    script: PageScript,
    log: Arc<BrowserLog>,
    fail_new_context: bool,
}

#[async_trait]
impl Renderer for FakeRenderer {
    async fn new_context(&self) -> Result<Box<dyn RenderContext>> {
        if self.fail_new_context {
            bail!("tab crashed");
        }
        self.log.contexts_opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakePage::new(self.script.clone(), Arc::clone(&self.log))))
    }

    async fn shutdown(&mut self) -> Result<()> {
        self.log.shutdowns.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn active_contexts(&self) -> usize {
        self.log.opened() - self.log.closed()
    }
}

/// A fake form page.
pub struct FakePage {
    script: PageScript,
    log: Arc<BrowserLog>,
    url: String,
    date_value: String,
    submitted: bool,
}

impl FakePage {
    pub fn new(script: PageScript, log: Arc<BrowserLog>) -> Self {
        Self {
            script,
            log,
            url: "about:blank".to_string(),
            date_value: "01/01/2000".to_string(),
            submitted: false,
        }
    }

    fn record(&self, action: Action) {
        self.log.actions.lock().unwrap().push(action);
    }

    /// Hang forever if actions on `element_id` are scripted to stall.
    async fn maybe_stall(&self, element_id: &str) {
        if self.script.stalled_actions.contains(element_id) {
            std::future::pending::<()>().await;
        }
    }

    fn ready(&self, key: &str) -> bool {
        let mut probes = self.log.probes.lock().unwrap();
        let seen = probes.entry(key.to_string()).or_insert(0);
        *seen += 1;
        if self.script.never_ready.contains(key) {
            return false;
        }
        let needed = self.script.ready_after.get(key).copied().unwrap_or(0);
        *seen > needed
    }
}

#[async_trait]
impl RenderContext for FakePage {
    async fn navigate(&mut self, url: &str, _timeout_ms: u64) -> Result<NavigationResult> {
        self.record(Action::Navigate(url.to_string()));
        self.url = url.to_string();
        Ok(NavigationResult {
            final_url: url.to_string(),
            load_time_ms: 1,
        })
    }

    async fn probe(&self, probe: &Probe) -> Result<bool> {
        let key = match probe {
            Probe::Interactive { element_id, .. } => element_id,
            Probe::Present { tag } => tag,
        };
        if self.script.stalled_probes.contains(key.as_str()) {
            *self.log.probes.lock().unwrap().entry(key.clone()).or_insert(0) += 1;
            return std::future::pending().await;
        }

        match probe {
            Probe::Interactive { element_id, .. } => Ok(self.ready(element_id)),
            Probe::Present { tag } => {
                if !self.submitted {
                    return Ok(false);
                }
                Ok(self.ready(tag) && self.script.results_html.contains(&format!("<{tag}")))
            }
        }
    }

    async fn select_option(&mut self, element_id: &str, value: &str) -> Result<()> {
        self.maybe_stall(element_id).await;
        self.record(Action::Select(element_id.to_string(), value.to_string()));
        Ok(())
    }

    async fn clear(&mut self, element_id: &str) -> Result<()> {
        self.maybe_stall(element_id).await;
        self.record(Action::Clear(element_id.to_string()));
        self.date_value.clear();
        Ok(())
    }

    async fn type_text(&mut self, element_id: &str, text: &str) -> Result<()> {
        self.record(Action::Type(element_id.to_string(), text.to_string()));
        self.date_value.push_str(text);
        Ok(())
    }

    async fn click(&mut self, element_id: &str) -> Result<()> {
        self.maybe_stall(element_id).await;
        self.record(Action::Click(element_id.to_string()));
        self.submitted = true;
        self.url = self.script.results_url.clone();
        Ok(())
    }

    async fn get_html(&self) -> Result<String> {
        if self.submitted {
            Ok(self.script.results_html.clone())
        } else {
            Ok("<form></form>".to_string())
        }
    }

    async fn get_url(&self) -> Result<String> {
        if self.script.url_unavailable {
            bail!("target closed");
        }
        Ok(self.url.clone())
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.log.contexts_closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl FakePage {
    /// Value the date input ends up holding.
    pub fn date_value(&self) -> &str {
        &self.date_value
    }
}

/// Results page with a header and two cases, one of them CNR12345.
pub fn two_case_table() -> String {
    r#"<html><body>
        <h2>Civil Judge Junior Division, Pune</h2>
        <table>
            <tr><th>Sr No</th><th>Case Number</th><th>Parties</th><th>Stage</th></tr>
            <tr><td>1</td><td>CNR12345 / 2024</td><td>Sharma vs State</td><td>Evidence</td></tr>
            <tr><td>2</td><td>MHPU010099 / 2023</td><td>Patil vs Patil</td><td>Arguments</td></tr>
        </table>
    </body></html>"#
        .to_string()
}

/// Results page with only the header row.
pub fn header_only_table() -> String {
    "<html><body><table><tr><th>Sr No</th><th>Case Number</th></tr></table></body></html>"
        .to_string()
}
