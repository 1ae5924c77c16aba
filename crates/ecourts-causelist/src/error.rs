//! Error types for the cause-list pipeline.

use std::path::PathBuf;

use crate::driver::Stage;

/// Every way a fetch, search or write can fail.
#[derive(thiserror::Error, Debug)]
pub enum CauseListError {
    /// A form control never became interactive within its wait budget.
    #[error("Navigation failed at {stage}: {cause}")]
    Navigation { stage: Stage, cause: String },

    /// The results table never appeared after submitting the form.
    #[error("Extraction failed: {0}")]
    Extraction(String),

    #[error("IO error writing {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Invalid selection: {0}")]
    InvalidSelection(String),

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Case status check for {cnr} is not implemented: the upstream service requires solving a CAPTCHA")]
    CaseStatusUnsupported { cnr: String },
}

impl CauseListError {
    /// The form stage a navigation failure happened at, if any.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            CauseListError::Navigation { stage, .. } => Some(*stage),
            CauseListError::Extraction(_) => Some(Stage::Results),
            _ => None,
        }
    }

    /// Short machine-readable name of the failure category.
    pub fn kind(&self) -> &'static str {
        match self {
            CauseListError::Navigation { .. } => "navigation",
            CauseListError::Extraction(_) => "extraction",
            CauseListError::Io { .. } => "io",
            CauseListError::Json(_) => "json",
            CauseListError::InvalidDate(_) => "invalid_date",
            CauseListError::InvalidSelection(_) => "invalid_selection",
            CauseListError::Browser(_) => "browser",
            CauseListError::CaseStatusUnsupported { .. } => "unsupported",
        }
    }
}

pub type FetchResult<T> = Result<T, CauseListError>;
