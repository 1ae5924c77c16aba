//! User-facing operations: fetch a cause list, fetch and search it, check a case status.
//!
//! Each call launches its own browser, drives the form once and releases the
//! browser before any file is written. Nothing is cached between calls.

use std::sync::Arc;

use tracing::{info, warn};

use crate::artifacts::{self, ArtifactWriter, PdfOutcome};
use crate::config::CauseListConfig;
use crate::driver::FormDriver;
use crate::error::{CauseListError, FetchResult};
use crate::extractor;
use crate::http_client::HttpClient;
use crate::renderer::chromium::ChromiumLauncher;
use crate::renderer::{BrowserLauncher, LaunchOptions, RenderedPage};
use crate::search;
use crate::types::{CaseSearchOutcome, CauseListResult, DateSpec, FormSelection};

/// Entry point for cause-list operations.
pub struct CauseListClient {
    config: CauseListConfig,
    launcher: Arc<dyn BrowserLauncher>,
    http: HttpClient,
}

impl CauseListClient {
    /// Client that drives a local Chromium.
    pub fn new(config: CauseListConfig) -> Self {
        Self::with_launcher(config, Arc::new(ChromiumLauncher))
    }

    /// Client that obtains its browser from `launcher`.
    pub fn with_launcher(config: CauseListConfig, launcher: Arc<dyn BrowserLauncher>) -> Self {
        let http = HttpClient::new(config.http_timeout_ms);
        Self {
            config,
            launcher,
            http,
        }
    }

    pub fn config(&self) -> &CauseListConfig {
        &self.config
    }

    /// Fetch the cause list for `selection` on `date` and write it to disk.
    ///
    /// Writes `cause_list_<date>.json`, plus `cause_list_<date>.pdf` when the
    /// results page links one.
    pub async fn fetch_cause_list(
        &self,
        selection: &FormSelection,
        date: &DateSpec,
        headless: bool,
    ) -> FetchResult<CauseListResult> {
        info!(%date, headless, "fetching cause list");
        let page = self.capture_results_page(selection, date, headless).await?;

        let extracted = extractor::extract(&page);
        info!(
            records = extracted.records.len(),
            court = extracted.court_name.as_deref().unwrap_or("-"),
            "cause list extracted"
        );

        let writer = ArtifactWriter::new(&self.config.output_dir);
        let json_path =
            writer.write_json(&artifacts::cause_list_json_name(date), &extracted.records)?;

        let pdf_path = match writer.save_linked_pdf(&self.http, &page, date).await {
            PdfOutcome::Saved(path) => Some(path),
            PdfOutcome::Unavailable => {
                info!("PDF not available");
                None
            }
            PdfOutcome::Failed(reason) => {
                warn!("PDF not saved: {reason}");
                None
            }
        };

        Ok(CauseListResult::new(
            extracted.records,
            extracted.court_name,
            *date,
            selection.clone(),
            Some(json_path),
            pdf_path,
        ))
    }

    /// Fetch the cause list, then write every record mentioning `query` to
    /// `case_search_<query>_<date>.json`.
    pub async fn search_case(
        &self,
        selection: &FormSelection,
        date: &DateSpec,
        query: &str,
        headless: bool,
    ) -> FetchResult<CaseSearchOutcome> {
        let cause_list = self.fetch_cause_list(selection, date, headless).await?;

        let matches = search::search_cause_list(&cause_list, query);
        info!(query = query.trim(), matches = matches.len(), "case search finished");

        let writer = ArtifactWriter::new(&self.config.output_dir);
        let output_path = writer.write_json(&artifacts::case_search_name(query, date), &matches)?;

        Ok(CaseSearchOutcome {
            matches,
            output_path,
            cause_list,
        })
    }

    /// Case status lookup sits behind a CAPTCHA upstream and is not supported.
    pub fn check_case_status(&self, cnr: &str) -> FetchResult<()> {
        Err(CauseListError::CaseStatusUnsupported {
            cnr: cnr.trim().to_string(),
        })
    }

    /// Launch a browser, drive the form and snapshot the results page.
    ///
    /// The page context and the browser are released on every path before this
    /// returns; release failures are logged and do not replace the outcome.
    async fn capture_results_page(
        &self,
        selection: &FormSelection,
        date: &DateSpec,
        headless: bool,
    ) -> FetchResult<RenderedPage> {
        let options = LaunchOptions {
            headless,
            chromium_path: self.config.chromium_path.clone(),
        };
        let mut renderer = self
            .launcher
            .launch(&options)
            .await
            .map_err(|e| CauseListError::Browser(format!("{e:#}")))?;

        let outcome = match renderer.new_context().await {
            Ok(mut ctx) => {
                let outcome = FormDriver::new(ctx.as_mut(), self.config.wait.clone())
                    .open(&self.config.form_url, selection, date)
                    .await;
                if let Err(e) = ctx.close().await {
                    warn!("failed to close page: {e:#}");
                }
                outcome
            }
            Err(e) => Err(CauseListError::Browser(format!(
                "failed to open page: {e:#}"
            ))),
        };

        if let Err(e) = renderer.shutdown().await {
            warn!("failed to shut down browser: {e:#}");
        }
        outcome
    }
}
