//! Form driver state machine tests against a scripted page.

mod common;

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use common::{two_case_table, Action, BrowserLog, FakePage, PageScript, FORM_URL};
use ecourts_causelist::{
    CauseListError, DateSpec, FetchResult, FormDriver, FormSelection, FormState, RenderedPage,
    SelectionKey, Stage, WaitPolicy,
};

fn selection() -> FormSelection {
    FormSelection::from_codes("1", "2", "3", "4").unwrap()
}

fn date() -> DateSpec {
    DateSpec::parse("15/03/2024").unwrap()
}

/// Run the driver once and report its result, final state and committed selection.
async fn drive(
    page: &mut FakePage,
    selection: &FormSelection,
) -> (FetchResult<RenderedPage>, FormState, FormSelection) {
    let mut driver = FormDriver::new(page, WaitPolicy::default());
    let result = driver.open(FORM_URL, selection, &date()).await;
    (result, driver.state(), driver.committed().clone())
}

fn page_with(script: PageScript) -> (FakePage, Arc<BrowserLog>) {
    let log = Arc::new(BrowserLog::default());
    (FakePage::new(script, Arc::clone(&log)), log)
}

#[tokio::test]
async fn test_controls_filled_in_cascade_order() {
    let (mut page, log) = page_with(PageScript::with_results(&two_case_table()));

    let (result, state, committed) = drive(&mut page, &selection()).await;

    let rendered = result.unwrap();
    assert_eq!(state, FormState::ResultsReady);
    assert_eq!(committed, selection());
    assert!(rendered.html.contains("CNR12345"));
    assert_eq!(rendered.url, FORM_URL);

    let select = |id: &str, v: &str| Action::Select(id.to_string(), v.to_string());
    assert_eq!(
        log.actions(),
        vec![
            Action::Navigate(FORM_URL.to_string()),
            select("sess_state_code", "1"),
            select("sess_dist_code", "2"),
            select("sess_court_complex_code", "3"),
            select("sess_court_code", "4"),
            Action::Clear("date".to_string()),
            Action::Type("date".to_string(), "15/03/2024".to_string()),
            Action::Click("submit".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_date_prefill_is_cleared() {
    let (mut page, _log) = page_with(PageScript::with_results(&two_case_table()));
    let (result, _, _) = drive(&mut page, &selection()).await;
    result.unwrap();
    assert_eq!(page.date_value(), "15/03/2024");
}

#[tokio::test(start_paused = true)]
async fn test_waits_for_delayed_controls() {
    let script = PageScript::with_results(&two_case_table())
        .after("sess_dist_code", 3)
        .after("table", 5);
    let (mut page, log) = page_with(script);

    let (result, state, _) = drive(&mut page, &selection()).await;

    assert!(result.is_ok());
    assert_eq!(state, FormState::ResultsReady);
    assert_eq!(log.probe_count("sess_dist_code"), 4);
    assert_eq!(log.probe_count("table"), 6);
    assert_eq!(log.probe_count("sess_state_code"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_district_timeout_names_stage() {
    let script = PageScript::with_results(&two_case_table()).never("sess_dist_code");
    let (mut page, log) = page_with(script);
    let start = Instant::now();

    let (result, state, committed) = drive(&mut page, &selection()).await;

    let err = result.unwrap_err();
    assert!(matches!(
        err,
        CauseListError::Navigation {
            stage: Stage::District,
            ..
        }
    ));
    assert_eq!(err.stage(), Some(Stage::District));
    assert_eq!(state, FormState::Failed);

    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_secs(10));
    assert!(elapsed < Duration::from_secs(11));

    assert_eq!(committed.len(), 1);
    assert_eq!(committed.get(SelectionKey::State), Some("1"));
    assert!(!log
        .actions()
        .iter()
        .any(|a| matches!(a, Action::Select(id, _) if id == "sess_dist_code")));
}

#[tokio::test(start_paused = true)]
async fn test_first_control_gets_longer_budget() {
    let script = PageScript::with_results(&two_case_table()).never("sess_state_code");
    let (mut page, _log) = page_with(script);
    let start = Instant::now();

    let (result, _, _) = drive(&mut page, &selection()).await;

    assert_eq!(result.unwrap_err().stage(), Some(Stage::State));
    assert!(start.elapsed() >= Duration::from_secs(30));
}

#[tokio::test(start_paused = true)]
async fn test_submit_never_ready() {
    let script = PageScript::with_results(&two_case_table()).never("submit");
    let (mut page, log) = page_with(script);

    let (result, state, _) = drive(&mut page, &selection()).await;

    assert_eq!(result.unwrap_err().stage(), Some(Stage::Submit));
    assert_eq!(state, FormState::Failed);
    assert!(!log.actions().contains(&Action::Click("submit".to_string())));
}

#[tokio::test(start_paused = true)]
async fn test_missing_results_table_is_extraction_error() {
    let script = PageScript::with_results(&two_case_table()).never("table");
    let (mut page, _log) = page_with(script);
    let start = Instant::now();

    let (result, state, _) = drive(&mut page, &selection()).await;

    let err = result.unwrap_err();
    assert!(matches!(err, CauseListError::Extraction(_)));
    assert_eq!(err.stage(), Some(Stage::Results));
    assert_eq!(state, FormState::Failed);
    assert!(start.elapsed() >= Duration::from_secs(20));
}

#[tokio::test]
async fn test_incomplete_selection_rejected_before_navigation() {
    let (mut page, log) = page_with(PageScript::with_results(&two_case_table()));
    let mut partial = FormSelection::new();
    partial.set(SelectionKey::State, "1").unwrap();
    partial.set(SelectionKey::District, "2").unwrap();

    let (result, state, _) = drive(&mut page, &partial).await;

    assert!(matches!(
        result.unwrap_err(),
        CauseListError::InvalidSelection(_)
    ));
    assert_eq!(state, FormState::Failed);
    assert!(log.actions().is_empty());
}

#[tokio::test]
async fn test_custom_policy_bounds_wait() {
    let script = PageScript::with_results(&two_case_table()).never("sess_court_code");
    let (mut page, _log) = page_with(script);
    let policy = WaitPolicy {
        poll_interval: Duration::from_millis(5),
        ..WaitPolicy::uniform(Duration::from_millis(50))
    };

    let mut driver = FormDriver::new(&mut page, policy);
    let err = driver
        .open(FORM_URL, &selection(), &date())
        .await
        .unwrap_err();

    assert_eq!(err.stage(), Some(Stage::Court));
    assert_eq!(driver.committed().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_unanswered_probe_bounded_by_stage_budget() {
    let script = PageScript::with_results(&two_case_table()).stall_probe("sess_dist_code");
    let (mut page, log) = page_with(script);
    let start = Instant::now();

    let (result, state, _) = tokio::time::timeout(
        Duration::from_secs(3600),
        drive(&mut page, &selection()),
    )
    .await
    .expect("driver must give up within the district budget");

    assert_eq!(result.unwrap_err().stage(), Some(Stage::District));
    assert_eq!(state, FormState::Failed);
    assert!(start.elapsed() < Duration::from_secs(11));
    assert_eq!(log.probe_count("sess_dist_code"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_unanswered_probe_with_short_budget() {
    let script = PageScript::with_results(&two_case_table()).stall_probe("sess_state_code");
    let (mut page, _log) = page_with(script);
    let policy = WaitPolicy::uniform(Duration::from_millis(50));
    let start = Instant::now();

    let mut driver = FormDriver::new(&mut page, policy);
    let err = tokio::time::timeout(
        Duration::from_secs(3600),
        driver.open(FORM_URL, &selection(), &date()),
    )
    .await
    .expect("driver must give up within the 50ms budget")
    .unwrap_err();

    assert!(matches!(
        err,
        CauseListError::Navigation {
            stage: Stage::State,
            ..
        }
    ));
    assert!(start.elapsed() < Duration::from_secs(1));
}

#[tokio::test(start_paused = true)]
async fn test_stalled_select_bounded_by_stage_budget() {
    let script =
        PageScript::with_results(&two_case_table()).stall_action("sess_court_complex_code");
    let (mut page, log) = page_with(script);
    let start = Instant::now();

    let (result, state, committed) = tokio::time::timeout(
        Duration::from_secs(3600),
        drive(&mut page, &selection()),
    )
    .await
    .expect("driver must give up within the complex budget");

    let err = result.unwrap_err();
    assert_eq!(err.stage(), Some(Stage::CourtComplex));
    assert!(err.to_string().contains("select did not complete"));
    assert_eq!(state, FormState::Failed);
    assert_eq!(committed.len(), 2);
    assert!(start.elapsed() < Duration::from_secs(11));
    assert!(!log.actions().contains(&Action::Click("submit".to_string())));
}

#[tokio::test(start_paused = true)]
async fn test_stalled_click_is_submit_failure() {
    let script = PageScript::with_results(&two_case_table()).stall_action("submit");
    let (mut page, _log) = page_with(script);

    let (result, _, committed) = drive(&mut page, &selection()).await;

    assert_eq!(result.unwrap_err().stage(), Some(Stage::Submit));
    assert!(committed.is_complete());
}

#[tokio::test(start_paused = true)]
async fn test_unanswered_table_check_is_extraction_error() {
    let script = PageScript::with_results(&two_case_table()).stall_probe("table");
    let (mut page, _log) = page_with(script);
    let start = Instant::now();

    let (result, _, _) = drive(&mut page, &selection()).await;

    assert!(matches!(result.unwrap_err(), CauseListError::Extraction(_)));
    assert!(start.elapsed() < Duration::from_secs(21));
}

#[tokio::test]
async fn test_results_kept_when_url_unavailable() {
    let script = PageScript::with_results(&two_case_table()).without_url();
    let (mut page, _log) = page_with(script);

    let (result, state, _) = drive(&mut page, &selection()).await;

    let rendered = result.unwrap();
    assert_eq!(state, FormState::ResultsReady);
    assert_eq!(rendered.url, "");
    assert!(rendered.html.contains("CNR12345"));
}
