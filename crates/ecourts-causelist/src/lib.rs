// Copyright 2026 ecourts-causelist contributors
// SPDX-License-Identifier: MIT

//! ecourts-causelist — drive the eCourts cause-list form and work with the docket it returns.
//!
//! The pipeline is: [`driver`] walks the cascading form inside a browser page,
//! [`extractor`] turns the rendered results into records, [`artifacts`] writes them
//! to disk, and [`search`] filters them for a case identifier. [`orchestrator`]
//! ties the steps together and owns the browser for exactly one invocation.

pub mod artifacts;
pub mod config;
pub mod driver;
pub mod error;
pub mod extractor;
pub mod http_client;
pub mod orchestrator;
pub mod renderer;
pub mod search;
pub mod types;

pub use artifacts::{ArtifactWriter, PdfOutcome};
pub use config::CauseListConfig;
pub use driver::{FormDriver, FormState, Stage, WaitPolicy};
pub use error::{CauseListError, FetchResult};
pub use extractor::{extract, find_pdf_link, ExtractedPage};
pub use orchestrator::CauseListClient;
pub use renderer::RenderedPage;
pub use search::{search, search_cause_list};
pub use types::*;
