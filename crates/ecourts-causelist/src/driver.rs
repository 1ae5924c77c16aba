//! Form session driver: walks the cascading cause-list form in one browser page.
//!
//! Each control on the form is populated only after its predecessor has been
//! committed, so the driver is a strictly linear state machine:
//!
//! ```text
//! Loading → StateChosen → DistrictChosen → ComplexChosen → CourtChosen
//!         → DateSet → Submitted → ResultsReady
//! ```
//!
//! Before every transition the driver polls the target control until it is
//! interactive, bounded by the [`WaitPolicy`] budget for that stage. A missed
//! deadline moves the machine to `Failed` and surfaces as a typed error naming
//! the stage. There are no retries inside a session.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::{timeout, Instant};
use tracing::{debug, warn};

use crate::error::{CauseListError, FetchResult};
use crate::renderer::{Probe, RenderContext, RenderedPage};
use crate::types::{DateSpec, FormSelection, SelectionKey};

/// Element id of the date input.
pub const DATE_INPUT_ID: &str = "date";

/// Element id of the submit control.
pub const SUBMIT_ID: &str = "submit";

/// Tag whose presence marks the results as rendered.
pub const RESULTS_TAG: &str = "table";

/// The step of the form cascade being waited on or acted upon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Page,
    State,
    District,
    CourtComplex,
    Court,
    Date,
    Submit,
    Results,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Page => "page",
            Stage::State => "state",
            Stage::District => "district",
            Stage::CourtComplex => "court_complex",
            Stage::Court => "court",
            Stage::Date => "date",
            Stage::Submit => "submit",
            Stage::Results => "results",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the driver is in the form cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormState {
    Loading,
    StateChosen,
    DistrictChosen,
    ComplexChosen,
    CourtChosen,
    DateSet,
    Submitted,
    ResultsReady,
    Failed,
}

impl FormState {
    /// State reached once `key` has been committed.
    pub fn after(key: SelectionKey) -> Self {
        match key {
            SelectionKey::State => FormState::StateChosen,
            SelectionKey::District => FormState::DistrictChosen,
            SelectionKey::CourtComplex => FormState::ComplexChosen,
            SelectionKey::Court => FormState::CourtChosen,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, FormState::ResultsReady | FormState::Failed)
    }
}

/// How long each stage may wait for its control, and how often to look.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitPolicy {
    /// Budget for the page load and the first control (state).
    pub first_control: Duration,
    /// Budget for every later control (district, complex, court, date, submit).
    pub next_control: Duration,
    /// Budget for the results table after submitting.
    pub results: Duration,
    /// Delay between readiness probes.
    pub poll_interval: Duration,
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self {
            first_control: Duration::from_secs(30),
            next_control: Duration::from_secs(10),
            results: Duration::from_secs(20),
            poll_interval: Duration::from_millis(250),
        }
    }
}

impl WaitPolicy {
    /// The same bound for every stage.
    pub fn uniform(bound: Duration) -> Self {
        Self {
            first_control: bound,
            next_control: bound,
            results: bound,
            ..Self::default()
        }
    }

    /// Budget for `stage`.
    pub fn budget(&self, stage: Stage) -> Duration {
        match stage {
            Stage::Page | Stage::State => self.first_control,
            Stage::Results => self.results,
            _ => self.next_control,
        }
    }
}

/// Drives one page through the cause-list form.
///
/// Borrows the render context; the caller keeps ownership and is responsible
/// for closing it whatever the outcome.
pub struct FormDriver<'a> {
    ctx: &'a mut dyn RenderContext,
    policy: WaitPolicy,
    state: FormState,
    committed: FormSelection,
}

impl<'a> FormDriver<'a> {
    pub fn new(ctx: &'a mut dyn RenderContext, policy: WaitPolicy) -> Self {
        Self {
            ctx,
            policy,
            state: FormState::Loading,
            committed: FormSelection::new(),
        }
    }

    pub fn state(&self) -> FormState {
        self.state
    }

    /// Selections the page has accepted so far.
    pub fn committed(&self) -> &FormSelection {
        &self.committed
    }

    /// Load the form, fill it in and return a snapshot of the results page.
    pub async fn open(
        &mut self,
        form_url: &str,
        selection: &FormSelection,
        date: &DateSpec,
    ) -> FetchResult<RenderedPage> {
        match self.run(form_url, selection, date).await {
            Ok(page) => Ok(page),
            Err(e) => {
                warn!(from = ?self.state, "cause list form failed: {e}");
                self.state = FormState::Failed;
                Err(e)
            }
        }
    }

    async fn run(
        &mut self,
        form_url: &str,
        selection: &FormSelection,
        date: &DateSpec,
    ) -> FetchResult<RenderedPage> {
        if !selection.is_complete() {
            return Err(CauseListError::InvalidSelection(
                "state, district, court complex and court are all required".to_string(),
            ));
        }

        self.load(form_url).await?;
        for key in SelectionKey::ORDER {
            let value = selection.get(key).ok_or_else(|| {
                CauseListError::InvalidSelection(format!("missing {key} code"))
            })?;
            self.choose(key, value).await?;
        }
        self.enter_date(date).await?;
        self.submit().await?;
        self.await_results().await
    }

    async fn load(&mut self, form_url: &str) -> FetchResult<()> {
        let budget = self.policy.budget(Stage::Page);
        let nav = bounded(
            Stage::Page,
            budget,
            "page load",
            self.ctx.navigate(form_url, budget.as_millis() as u64),
        )
        .await?;
        debug!(url = %nav.final_url, load_time_ms = nav.load_time_ms, "form loaded");
        Ok(())
    }

    async fn choose(&mut self, key: SelectionKey, value: &str) -> FetchResult<()> {
        let stage = key.stage();
        let id = key.element_id();
        self.wait_until(stage, &Probe::option(id, value)).await?;
        let budget = self.policy.budget(stage);
        bounded(stage, budget, "select", self.ctx.select_option(id, value)).await?;
        self.committed.set(key, value)?;
        self.advance(FormState::after(key));
        Ok(())
    }

    async fn enter_date(&mut self, date: &DateSpec) -> FetchResult<()> {
        self.wait_until(Stage::Date, &Probe::interactive(DATE_INPUT_ID))
            .await?;
        let text = date.to_string();
        let budget = self.policy.budget(Stage::Date);
        bounded(Stage::Date, budget, "clear", self.ctx.clear(DATE_INPUT_ID)).await?;
        bounded(
            Stage::Date,
            budget,
            "type",
            self.ctx.type_text(DATE_INPUT_ID, &text),
        )
        .await?;
        self.advance(FormState::DateSet);
        Ok(())
    }

    async fn submit(&mut self) -> FetchResult<()> {
        self.wait_until(Stage::Submit, &Probe::interactive(SUBMIT_ID))
            .await?;
        let budget = self.policy.budget(Stage::Submit);
        bounded(Stage::Submit, budget, "click", self.ctx.click(SUBMIT_ID)).await?;
        self.advance(FormState::Submitted);
        Ok(())
    }

    async fn await_results(&mut self) -> FetchResult<RenderedPage> {
        match self
            .wait_until(Stage::Results, &Probe::present(RESULTS_TAG))
            .await
        {
            Ok(()) => {}
            Err(CauseListError::Navigation { cause, .. }) => {
                return Err(CauseListError::Extraction(cause))
            }
            Err(e) => return Err(e),
        }

        let budget = self.policy.budget(Stage::Results);
        let html = match timeout(budget, self.ctx.get_html()).await {
            Ok(Ok(html)) => html,
            Ok(Err(e)) => {
                return Err(CauseListError::Extraction(format!(
                    "failed to read results: {e:#}"
                )))
            }
            Err(_) => {
                return Err(CauseListError::Extraction(format!(
                    "results HTML not returned within {}s",
                    budget.as_secs_f64()
                )))
            }
        };
        // Without a URL, relative links on the page cannot be resolved.
        let url = match timeout(budget, self.ctx.get_url()).await {
            Ok(Ok(url)) => url,
            Ok(Err(e)) => {
                debug!("results URL unavailable: {e:#}");
                String::new()
            }
            Err(_) => {
                debug!("results URL not returned within {}s", budget.as_secs_f64());
                String::new()
            }
        };
        self.advance(FormState::ResultsReady);
        Ok(RenderedPage { url, html })
    }

    /// Poll `probe` until it holds or the stage budget runs out.
    ///
    /// A probe that errors, or does not answer before the deadline, counts as not ready.
    /// No single probe can outlive the stage budget.
    async fn wait_until(&self, stage: Stage, probe: &Probe) -> FetchResult<()> {
        let budget = self.policy.budget(stage);
        let deadline = Instant::now() + budget;
        let mut attempts = 0u32;

        loop {
            attempts += 1;
            let remaining = deadline.saturating_duration_since(Instant::now());
            match timeout(remaining, self.ctx.probe(probe)).await {
                Ok(Ok(true)) => {
                    debug!(%stage, attempts, "{} ready", probe.describe());
                    return Ok(());
                }
                Ok(Ok(false)) => {}
                Ok(Err(e)) => debug!(%stage, "readiness probe failed: {e:#}"),
                Err(_) => debug!(%stage, "readiness probe did not answer before the deadline"),
            }

            if Instant::now() >= deadline {
                return Err(CauseListError::Navigation {
                    stage,
                    cause: format!(
                        "{} not ready within {}s",
                        probe.describe(),
                        budget.as_secs_f64()
                    ),
                });
            }
            tokio::time::sleep(self.policy.poll_interval).await;
        }
    }

    fn advance(&mut self, next: FormState) {
        debug!(from = ?self.state, to = ?next, "form transition");
        self.state = next;
    }
}

/// Run one page action, failing with `Navigation{stage}` if it errors or outlasts `budget`.
async fn bounded<T>(
    stage: Stage,
    budget: Duration,
    what: &str,
    action: impl Future<Output = anyhow::Result<T>>,
) -> FetchResult<T> {
    match timeout(budget, action).await {
        Ok(result) => result.map_err(|e| navigation(stage, e)),
        Err(_) => Err(CauseListError::Navigation {
            stage,
            cause: format!("{what} did not complete within {}s", budget.as_secs_f64()),
        }),
    }
}

fn navigation(stage: Stage, err: anyhow::Error) -> CauseListError {
    CauseListError::Navigation {
        stage,
        cause: format!("{err:#}"),
    }
}
