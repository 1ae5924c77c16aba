//! Configuration loading and resolution.

use std::path::{Path, PathBuf};

use crate::driver::WaitPolicy;

/// The eCourts cause-list form.
pub const DEFAULT_CAUSE_LIST_URL: &str =
    "https://services.ecourts.gov.in/ecourtindia_v6/?p=cause_list/index";

/// Overrides the form URL.
pub const CAUSE_LIST_URL_ENV: &str = "ECOURTS_CAUSE_LIST_URL";

/// Points at a Chromium/Chrome binary.
pub const CHROMIUM_PATH_ENV: &str = "ECOURTS_CHROMIUM_PATH";

/// Timeout for fetching linked documents.
pub const DEFAULT_HTTP_TIMEOUT_MS: u64 = 30_000;

/// Settings shared by every operation of a [`crate::CauseListClient`].
#[derive(Debug, Clone)]
pub struct CauseListConfig {
    /// URL of the cause-list form.
    pub form_url: String,
    /// Directory output files are written to.
    pub output_dir: PathBuf,
    /// Per-stage readiness bounds.
    pub wait: WaitPolicy,
    /// Timeout for PDF downloads.
    pub http_timeout_ms: u64,
    /// Explicit browser binary; discovered when `None`.
    pub chromium_path: Option<PathBuf>,
}

impl Default for CauseListConfig {
    fn default() -> Self {
        Self {
            form_url: DEFAULT_CAUSE_LIST_URL.to_string(),
            output_dir: PathBuf::from("."),
            wait: WaitPolicy::default(),
            http_timeout_ms: DEFAULT_HTTP_TIMEOUT_MS,
            chromium_path: None,
        }
    }
}

impl CauseListConfig {
    /// Build a config from explicit values, falling back to the environment, then defaults.
    ///
    /// `chromium_path` stays `None`: browser discovery, including `ECOURTS_CHROMIUM_PATH`,
    /// happens at launch so a stale variable still falls back to `PATH`.
    pub fn resolve(form_url: Option<&str>, output_dir: Option<&Path>) -> Self {
        Self {
            form_url: resolve_form_url(form_url),
            output_dir: output_dir
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from(".")),
            ..Self::default()
        }
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn with_wait_policy(mut self, wait: WaitPolicy) -> Self {
        self.wait = wait;
        self
    }
}

/// Resolve the form URL: explicit value, then `ECOURTS_CAUSE_LIST_URL`, then the default.
pub fn resolve_form_url(explicit: Option<&str>) -> String {
    if let Some(url) = explicit {
        return url.to_string();
    }

    if let Ok(env_url) = std::env::var(CAUSE_LIST_URL_ENV) {
        if !env_url.trim().is_empty() {
            return env_url;
        }
    }

    DEFAULT_CAUSE_LIST_URL.to_string()
}
