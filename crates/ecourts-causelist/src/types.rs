//! Core data types for form selections, dates and cause-list records.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::driver::Stage;
use crate::error::{CauseListError, FetchResult};

/// Date format used by the upstream form and in output filenames.
pub const DATE_FORMAT: &str = "%d/%m/%Y";

/// One of the cascading select controls on the cause-list form, in dependency order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionKey {
    State,
    District,
    CourtComplex,
    Court,
}

impl SelectionKey {
    /// All keys in the order the form requires them.
    pub const ORDER: [SelectionKey; 4] = [
        SelectionKey::State,
        SelectionKey::District,
        SelectionKey::CourtComplex,
        SelectionKey::Court,
    ];

    /// Element id of the select control on the upstream form.
    pub fn element_id(self) -> &'static str {
        match self {
            SelectionKey::State => "sess_state_code",
            SelectionKey::District => "sess_dist_code",
            SelectionKey::CourtComplex => "sess_court_complex_code",
            SelectionKey::Court => "sess_court_code",
        }
    }

    /// The driver stage that waits on this control.
    pub fn stage(self) -> Stage {
        match self {
            SelectionKey::State => Stage::State,
            SelectionKey::District => Stage::District,
            SelectionKey::CourtComplex => Stage::CourtComplex,
            SelectionKey::Court => Stage::Court,
        }
    }

    /// Keys that must be set before this one.
    pub fn predecessors(self) -> &'static [SelectionKey] {
        let idx = Self::ORDER.iter().position(|k| *k == self).unwrap_or(0);
        &Self::ORDER[..idx]
    }
}

impl fmt::Display for SelectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.stage().fmt(f)
    }
}

/// Option values chosen for the cascading selects, built up in order.
///
/// A key can only be set once every key before it holds a value. Setting a key
/// again drops the values of all later keys, since their options depend on it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormSelection {
    values: BTreeMap<SelectionKey, String>,
}

impl FormSelection {
    /// Create an empty selection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a complete selection from the four option codes.
    pub fn from_codes(
        state: &str,
        district: &str,
        court_complex: &str,
        court: &str,
    ) -> FetchResult<Self> {
        let mut selection = Self::new();
        selection.set(SelectionKey::State, state)?;
        selection.set(SelectionKey::District, district)?;
        selection.set(SelectionKey::CourtComplex, court_complex)?;
        selection.set(SelectionKey::Court, court)?;
        Ok(selection)
    }

    /// Set the value for `key`.
    pub fn set(&mut self, key: SelectionKey, value: impl Into<String>) -> FetchResult<()> {
        let value = value.into().trim().to_string();
        if value.is_empty() {
            return Err(CauseListError::InvalidSelection(format!(
                "{key} code must not be empty"
            )));
        }
        if let Some(missing) = key
            .predecessors()
            .iter()
            .find(|k| !self.values.contains_key(*k))
        {
            return Err(CauseListError::InvalidSelection(format!(
                "{key} cannot be chosen before {missing}"
            )));
        }
        self.values.retain(|k, _| *k < key);
        self.values.insert(key, value);
        Ok(())
    }

    pub fn get(&self, key: SelectionKey) -> Option<&str> {
        self.values.get(&key).map(String::as_str)
    }

    /// True once every key has a value.
    pub fn is_complete(&self) -> bool {
        SelectionKey::ORDER.iter().all(|k| self.values.contains_key(k))
    }

    /// Number of keys set so far.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over set keys in form order.
    pub fn iter(&self) -> impl Iterator<Item = (SelectionKey, &str)> {
        self.values.iter().map(|(k, v)| (*k, v.as_str()))
    }
}

/// Where the cause-list date comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateSource {
    Explicit(String),
    Today,
    Tomorrow,
}

impl DateSource {
    /// Pick the winning source: an explicit date beats `tomorrow`, which beats today.
    ///
    /// Today is also the fallback when no flag is given, so a `today` flag needs no input here.
    pub fn from_flags(explicit: Option<&str>, tomorrow: bool) -> Self {
        match explicit {
            Some(date) => DateSource::Explicit(date.to_string()),
            None if tomorrow => DateSource::Tomorrow,
            None => DateSource::Today,
        }
    }
}

/// A calendar date rendered as `dd/mm/yyyy`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DateSpec(NaiveDate);

impl DateSpec {
    pub fn from_date(date: NaiveDate) -> Self {
        Self(date)
    }

    /// Parse a `dd/mm/yyyy` string.
    pub fn parse(input: &str) -> FetchResult<Self> {
        NaiveDate::parse_from_str(input.trim(), DATE_FORMAT)
            .map(Self)
            .map_err(|e| CauseListError::InvalidDate(format!("'{input}' is not dd/mm/yyyy: {e}")))
    }

    /// Resolve a date source relative to `today`.
    pub fn resolve(source: &DateSource, today: NaiveDate) -> FetchResult<Self> {
        match source {
            DateSource::Explicit(s) => Self::parse(s),
            DateSource::Today => Ok(Self(today)),
            DateSource::Tomorrow => today.succ_opt().map(Self).ok_or_else(|| {
                CauseListError::InvalidDate(format!("no day after {}", today.format(DATE_FORMAT)))
            }),
        }
    }

    /// Today's date in the local timezone.
    pub fn today() -> Self {
        Self(Local::now().date_naive())
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }

    /// The date with `/` replaced by `_`, for use in filenames.
    pub fn file_stem(&self) -> String {
        self.to_string().replace('/', "_")
    }
}

impl fmt::Display for DateSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(DATE_FORMAT))
    }
}

/// One row of the cause-list table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CauseListRecord {
    cells: Vec<String>,
}

impl CauseListRecord {
    pub fn new(cells: Vec<String>) -> Self {
        Self { cells }
    }

    pub fn cells(&self) -> &[String] {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// True when the record has no cell with visible text.
    pub fn is_empty(&self) -> bool {
        self.cells.iter().all(|c| c.trim().is_empty())
    }

    /// The first cell as a serial number, if it is an unsigned integer.
    pub fn serial(&self) -> Option<u64> {
        self.cells.first()?.trim().parse().ok()
    }
}

impl From<Vec<String>> for CauseListRecord {
    fn from(cells: Vec<String>) -> Self {
        Self::new(cells)
    }
}

impl<'a> From<Vec<&'a str>> for CauseListRecord {
    fn from(cells: Vec<&'a str>) -> Self {
        Self::new(cells.into_iter().map(str::to_string).collect())
    }
}

/// Everything one successful fetch produced.
#[derive(Debug, Clone)]
pub struct CauseListResult {
    records: Vec<CauseListRecord>,
    court_name: Option<String>,
    date: DateSpec,
    selection: FormSelection,
    json_path: Option<PathBuf>,
    pdf_path: Option<PathBuf>,
}

impl CauseListResult {
    pub(crate) fn new(
        records: Vec<CauseListRecord>,
        court_name: Option<String>,
        date: DateSpec,
        selection: FormSelection,
        json_path: Option<PathBuf>,
        pdf_path: Option<PathBuf>,
    ) -> Self {
        Self {
            records,
            court_name,
            date,
            selection,
            json_path,
            pdf_path,
        }
    }

    pub fn records(&self) -> &[CauseListRecord] {
        &self.records
    }

    pub fn court_name(&self) -> Option<&str> {
        self.court_name.as_deref()
    }

    pub fn date(&self) -> &DateSpec {
        &self.date
    }

    pub fn selection(&self) -> &FormSelection {
        &self.selection
    }

    pub fn json_path(&self) -> Option<&Path> {
        self.json_path.as_deref()
    }

    pub fn pdf_path(&self) -> Option<&Path> {
        self.pdf_path.as_deref()
    }
}

/// A record that matched a search query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub serial: Option<u64>,
    #[serde(rename = "row")]
    pub record: CauseListRecord,
    pub court_name: Option<String>,
}

/// Result of a fetch-and-search run.
#[derive(Debug, Clone)]
pub struct CaseSearchOutcome {
    pub matches: Vec<MatchRecord>,
    pub output_path: PathBuf,
    pub cause_list: CauseListResult,
}
