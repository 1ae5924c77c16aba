//! Result extraction from a rendered cause-list page.
//!
//! Everything here is a pure function of a [`RenderedPage`] snapshot; no network
//! access or waiting happens during extraction.

use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::renderer::RenderedPage;
use crate::types::CauseListRecord;

/// Records and title read from a results page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedPage {
    pub records: Vec<CauseListRecord>,
    pub court_name: Option<String>,
}

/// Read the first table's data rows and the page heading.
pub fn extract(page: &RenderedPage) -> ExtractedPage {
    let document = Html::parse_document(&page.html);
    ExtractedPage {
        records: extract_records(&document),
        court_name: extract_court_name(&document),
    }
}

/// Data rows of the first table. The first row is the header and is skipped.
///
/// A row is kept when at least one `td` has visible text, and then every `td`
/// becomes a cell (blank ones as `""`), so each JSON record has the row's full width.
fn extract_records(document: &Html) -> Vec<CauseListRecord> {
    let table_sel = selector("table");
    let row_sel = selector("tr");
    let cell_sel = selector("td");

    let Some(table) = document.select(&table_sel).next() else {
        return Vec::new();
    };

    table
        .select(&row_sel)
        .skip(1)
        .filter_map(|row| {
            let cells: Vec<String> = row.select(&cell_sel).map(|td| element_text(&td)).collect();
            let record = CauseListRecord::new(cells);
            (!record.is_empty()).then_some(record)
        })
        .collect()
}

/// First `h1`–`h6` with non-empty text, in document order.
fn extract_court_name(document: &Html) -> Option<String> {
    let heading_sel = selector("h1, h2, h3, h4, h5, h6");
    document
        .select(&heading_sel)
        .map(|h| element_text(&h))
        .find(|text| !text.is_empty())
}

/// Absolute URL of the first link whose visible text mentions `.pdf`.
pub fn find_pdf_link(page: &RenderedPage) -> Option<String> {
    let document = Html::parse_document(&page.html);
    let link_sel = selector("a[href]");
    let base = Url::parse(&page.url).ok();

    document
        .select(&link_sel)
        .filter(|a| element_text(a).to_lowercase().contains(".pdf"))
        .filter_map(|a| a.value().attr("href"))
        .find_map(|href| resolve_href(base.as_ref(), href))
}

fn resolve_href(base: Option<&Url>, href: &str) -> Option<String> {
    let href = href.trim();
    let url = match base {
        Some(base) => base.join(href).ok()?,
        None => Url::parse(href).ok()?,
    };
    matches!(url.scheme(), "http" | "https").then(|| url.to_string())
}

/// Visible text of an element with whitespace collapsed.
fn element_text(el: &ElementRef<'_>) -> String {
    el.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

fn selector(css: &'static str) -> Selector {
    Selector::parse(css).expect("static selector is valid")
}
