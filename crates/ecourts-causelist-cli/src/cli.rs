//! Command-line surface: flag parsing and mode routing.

use std::path::PathBuf;

use anyhow::Result;
use chrono::NaiveDate;
use clap::Parser;

use ecourts_causelist::{
    CauseListClient, CauseListConfig, DateSource, DateSpec, FormSelection,
};

#[derive(Parser, Debug)]
#[command(
    name = "ecourts-causelist",
    about = "Fetch a court's daily cause list from eCourts and search it for a case",
    version
)]
pub struct Cli {
    /// State code.
    #[arg(long)]
    pub state: String,

    /// District code.
    #[arg(long)]
    pub district: String,

    /// Court complex code.
    #[arg(long)]
    pub complex: String,

    /// Court code.
    #[arg(long)]
    pub court: String,

    /// Cause-list date as dd/mm/yyyy. Wins over --today and --tomorrow.
    #[arg(long)]
    pub date: Option<String>,

    /// Use today's date (the default).
    #[arg(long, conflicts_with = "tomorrow")]
    pub today: bool,

    /// Use tomorrow's date.
    #[arg(long)]
    pub tomorrow: bool,

    /// Show the browser window.
    #[arg(long)]
    pub no_headless: bool,

    /// Check the status of a case by CNR (not supported upstream).
    #[arg(long, conflicts_with_all = ["case", "causelist"])]
    pub cnr: Option<String>,

    /// Search the cause list for a case number or CNR.
    #[arg(long = "case", conflicts_with = "causelist")]
    pub case: Option<String>,

    /// Fetch the cause list only (the default).
    #[arg(long)]
    pub causelist: bool,

    /// Cause-list form URL. Falls back to ECOURTS_CAUSE_LIST_URL, then the public eCourts form.
    #[arg(long)]
    pub form_url: Option<String>,

    /// Directory output files are written to.
    #[arg(long, default_value = ".")]
    pub output_dir: PathBuf,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

/// What one invocation does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    CaseStatus(String),
    Search(String),
    CauseList,
}

impl Cli {
    pub fn mode(&self) -> Mode {
        if let Some(cnr) = &self.cnr {
            Mode::CaseStatus(cnr.clone())
        } else if let Some(query) = &self.case {
            Mode::Search(query.clone())
        } else {
            Mode::CauseList
        }
    }

    pub fn selection(&self) -> Result<FormSelection> {
        Ok(FormSelection::from_codes(
            &self.state,
            &self.district,
            &self.complex,
            &self.court,
        )?)
    }

    pub fn date_source(&self) -> DateSource {
        DateSource::from_flags(self.date.as_deref(), self.tomorrow)
    }

    pub fn resolve_date(&self, today: NaiveDate) -> Result<DateSpec> {
        Ok(DateSpec::resolve(&self.date_source(), today)?)
    }

    pub fn headless(&self) -> bool {
        !self.no_headless
    }
}

/// Execute the selected mode, printing outcomes to stdout.
pub async fn run(cli: Cli) -> Result<()> {
    let config = CauseListConfig::resolve(cli.form_url.as_deref(), Some(&cli.output_dir));
    let client = CauseListClient::new(config);

    match cli.mode() {
        Mode::CaseStatus(cnr) => {
            if let Err(e) = client.check_case_status(&cnr) {
                println!("{e}");
            }
        }

        Mode::Search(query) => {
            let selection = cli.selection()?;
            let date = cli.resolve_date(DateSpec::today().date())?;
            let outcome = client
                .search_case(&selection, &date, &query, cli.headless())
                .await?;

            if outcome.matches.is_empty() {
                println!("No cases matching '{}' on {date}", query.trim());
            } else {
                println!(
                    "Found {} case(s) matching '{}' on {date}:",
                    outcome.matches.len(),
                    query.trim()
                );
                for hit in &outcome.matches {
                    let serial = hit
                        .serial
                        .map(|s| s.to_string())
                        .unwrap_or_else(|| "-".to_string());
                    println!("  [{serial}] {}", hit.record.cells().join(" | "));
                }
            }
            println!("Saved search results to {}", outcome.output_path.display());
        }

        Mode::CauseList => {
            let selection = cli.selection()?;
            let date = cli.resolve_date(DateSpec::today().date())?;
            let cause_list = client
                .fetch_cause_list(&selection, &date, cli.headless())
                .await?;

            if let Some(court) = cause_list.court_name() {
                println!("{court}");
            }
            println!("{} case(s) listed for {date}", cause_list.records().len());
            if let Some(path) = cause_list.json_path() {
                println!("Saved cause list to {}", path.display());
            }
            match cause_list.pdf_path() {
                Some(path) => println!("Downloaded PDF to {}", path.display()),
                None => println!("PDF not available"),
            }
        }
    }

    Ok(())
}
