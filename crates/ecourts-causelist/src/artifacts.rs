//! Output files: cause-list JSON, the linked PDF and case-search results.
//!
//! Filenames depend only on the date (and query), so a rerun for the same date
//! overwrites the previous output.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{CauseListError, FetchResult};
use crate::extractor::find_pdf_link;
use crate::http_client::HttpClient;
use crate::renderer::RenderedPage;
use crate::types::DateSpec;

/// `cause_list_<dd_mm_yyyy>.json`
pub fn cause_list_json_name(date: &DateSpec) -> String {
    format!("cause_list_{}.json", date.file_stem())
}

/// `cause_list_<dd_mm_yyyy>.pdf`
pub fn cause_list_pdf_name(date: &DateSpec) -> String {
    format!("cause_list_{}.pdf", date.file_stem())
}

/// `case_search_<query>_<dd_mm_yyyy>.json`, with spaces and path separators in the query replaced by `_`.
pub fn case_search_name(query: &str, date: &DateSpec) -> String {
    let query: String = query
        .trim()
        .chars()
        .map(|c| match c {
            ' ' | '/' | '\\' => '_',
            c => c,
        })
        .collect();
    format!("case_search_{}_{}.json", query, date.file_stem())
}

/// Write `value` as pretty-printed JSON to `path`, creating parent directories.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> FetchResult<()> {
    let bytes = serde_json::to_vec_pretty(value)?;
    write_binary(path, &bytes)
}

/// Write `bytes` to `path`, creating parent directories.
pub fn write_binary(path: &Path, bytes: &[u8]) -> FetchResult<()> {
    let io_err = |source| CauseListError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }
    std::fs::write(path, bytes).map_err(io_err)
}

/// What happened when looking for the cause-list PDF.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PdfOutcome {
    /// The document was downloaded to this path.
    Saved(PathBuf),
    /// The page links no PDF.
    Unavailable,
    /// A link was found but downloading or saving it failed.
    Failed(String),
}

impl PdfOutcome {
    pub fn path(&self) -> Option<&Path> {
        match self {
            PdfOutcome::Saved(path) => Some(path),
            _ => None,
        }
    }
}

/// Writes artifacts into one output directory.
#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    dir: PathBuf,
}

impl ArtifactWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, file_name: &str) -> PathBuf {
        self.dir.join(file_name)
    }

    /// Write `value` as JSON to `file_name` inside the output directory.
    pub fn write_json<T: Serialize + ?Sized>(
        &self,
        file_name: &str,
        value: &T,
    ) -> FetchResult<PathBuf> {
        let path = self.path_for(file_name);
        write_json(&path, value)?;
        info!(path = %path.display(), "wrote JSON artifact");
        Ok(path)
    }

    /// Write raw bytes to `file_name` inside the output directory.
    pub fn write_binary(&self, file_name: &str, bytes: &[u8]) -> FetchResult<PathBuf> {
        let path = self.path_for(file_name);
        write_binary(&path, bytes)?;
        info!(path = %path.display(), bytes = bytes.len(), "wrote binary artifact");
        Ok(path)
    }

    /// Download the PDF linked from `page`, if any, as `cause_list_<date>.pdf`.
    ///
    /// Never fails: a missing link or a broken download is reported in the outcome.
    pub async fn save_linked_pdf(
        &self,
        http: &HttpClient,
        page: &RenderedPage,
        date: &DateSpec,
    ) -> PdfOutcome {
        let Some(link) = find_pdf_link(page) else {
            return PdfOutcome::Unavailable;
        };

        let response = match http.get_bytes(&link).await {
            Ok(resp) => resp,
            Err(e) => {
                warn!(url = %link, "PDF download failed: {e:#}");
                return PdfOutcome::Failed(format!("{e:#}"));
            }
        };

        debug!(
            url = %link,
            status = response.status,
            content_type = response.content_type.as_deref().unwrap_or("-"),
            "PDF downloaded"
        );

        match self.write_binary(&cause_list_pdf_name(date), &response.body) {
            Ok(path) => PdfOutcome::Saved(path),
            Err(e) => {
                warn!(url = %link, "PDF could not be saved: {e}");
                PdfOutcome::Failed(e.to_string())
            }
        }
    }
}
