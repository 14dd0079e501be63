use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use issue_finder::app::{IssueFinder, IssueLookup};
use issue_finder::context::AppContext;
use issue_finder::engine::{RequestLog, StubEngine};
use issue_finder::filter::FilterState;
use issue_finder::local::{LocalField, LocalValue};
use issue_finder::pagination::{FetchRequest, FetchState};
use issue_finder::types::ResultPage;
use issue_finder::url::{History, Navigator, RouteParams};

const TIMEOUT: Duration = Duration::from_secs(2);

fn load_fixture_pages() -> Vec<ResultPage> {
    let json = include_str!("fixtures/stub_pages.json");
    serde_json::from_str(json).expect("valid stub_pages.json fixture")
}

fn finder_for(url: &str, stub: StubEngine, default_labels: &[String]) -> (IssueFinder<History>, RequestLog) {
    let log = stub.request_log();
    let route = RouteParams::from_url(url).unwrap();
    let filters = FilterState::from_route(&route, "", default_labels);
    let ctx = AppContext::init(stub, filters);
    (IssueFinder::new(ctx, History::new(), route, "/"), log)
}

fn logged(log: &RequestLog) -> Vec<FetchRequest> {
    log.lock().unwrap().clone()
}

// ---------------------------------------------------------------------------
// Initial load
// ---------------------------------------------------------------------------

#[test]
fn url_params_drive_the_first_search() {
    let (mut finder, log) = finder_for(
        "http://localhost:3000/?language=java&labels=bug%2Cneeds-triage",
        StubEngine::with_pages(load_fixture_pages()),
        &[],
    );
    assert_eq!(finder.view().state, FetchState::LoadingFirst);
    assert!(finder.wait_until_idle(TIMEOUT));

    let view = finder.view();
    assert_eq!(view.language, "java");
    assert_eq!(view.labels, ["bug", "needs-triage"]);
    assert_eq!(view.query, Some("language:java label:bug label:needs-triage"));
    assert_eq!(view.state, FetchState::Loaded);
    assert_eq!(view.edges.len(), 2);
    assert!(view.has_next_page);
    assert_eq!(
        logged(&log),
        [FetchRequest::first("language:java label:bug label:needs-triage")]
    );
    finder.shutdown();
}

#[test]
fn missing_labels_fall_back_to_defaults() {
    let defaults = vec!["good first issue".to_owned()];
    let (mut finder, _log) = finder_for(
        "?language=java",
        StubEngine::with_pages(load_fixture_pages()),
        &defaults,
    );
    assert!(finder.wait_until_idle(TIMEOUT));
    assert_eq!(finder.view().query, Some("language:java label:good first issue"));
    finder.shutdown();
}

#[test]
fn no_language_means_no_search() {
    let (mut finder, log) = finder_for("?labels=bug", StubEngine::default(), &[]);
    assert!(finder.wait_until_idle(TIMEOUT));
    let view = finder.view();
    assert_eq!(view.state, FetchState::Idle);
    assert_eq!(view.query, None);
    assert!(view.edges.is_empty());
    assert!(logged(&log).is_empty());
    finder.shutdown();
}

// ---------------------------------------------------------------------------
// Pagination
// ---------------------------------------------------------------------------

#[test]
fn fetch_more_appends_the_next_page() {
    let (mut finder, log) = finder_for(
        "?language=java&labels=bug",
        StubEngine::with_pages(load_fixture_pages()),
        &[],
    );
    assert!(finder.wait_until_idle(TIMEOUT));
    assert!(finder.fetch_next_page());
    assert_eq!(finder.view().state, FetchState::LoadingMore);
    // Still loading: a second request is refused.
    assert!(!finder.fetch_next_page());
    assert!(finder.wait_until_idle(TIMEOUT));

    let view = finder.view();
    let numbers: Vec<u64> = view.edges.iter().map(|e| e.node.number).collect();
    assert_eq!(numbers, [101, 7, 55]);
    assert!(!view.has_next_page);
    assert_eq!(logged(&log)[1].after.as_deref(), Some("Y3Vyc29yOjI="));

    // Last page reached: nothing more to fetch.
    assert!(!finder.fetch_next_page());
    assert_eq!(logged(&log).len(), 2);
    finder.shutdown();
}

#[test]
fn filter_change_discards_in_flight_results() {
    let (mut finder, log) = finder_for(
        "?language=java&labels=bug",
        StubEngine::with_pages(load_fixture_pages()),
        &[],
    );
    // Change the filters before the first reply is applied.
    assert!(finder.add_label("help wanted").unwrap());
    assert!(finder.wait_until_idle(TIMEOUT));

    let view = finder.view();
    assert_eq!(view.query, Some("language:java label:bug label:help wanted"));
    assert_eq!(view.edges.len(), 2, "only the new query's first page is kept");
    let queries: Vec<String> = logged(&log).into_iter().map(|r| r.query).collect();
    assert_eq!(
        queries,
        [
            "language:java label:bug",
            "language:java label:bug label:help wanted"
        ]
    );
    finder.shutdown();
}

#[test]
fn failed_first_page_can_be_retried() {
    let stub = StubEngine {
        fail_searches: 1,
        ..StubEngine::with_pages(load_fixture_pages())
    };
    let (mut finder, log) = finder_for("?language=java&labels=bug", stub, &[]);
    assert!(finder.wait_until_idle(TIMEOUT));

    let view = finder.view();
    assert_eq!(view.state, FetchState::Failed);
    assert_eq!(view.error, Some("stub failure"));
    assert!(view.edges.is_empty());
    assert!(!view.loading);

    assert!(finder.retry());
    assert!(finder.wait_until_idle(TIMEOUT));
    let view = finder.view();
    assert_eq!(view.state, FetchState::Loaded);
    assert_eq!(view.error, None);
    assert_eq!(view.edges.len(), 2);
    assert_eq!(logged(&log).len(), 2);
    finder.shutdown();
}

#[test]
fn recovered_follow_up_page_is_not_replayed() {
    let stub = StubEngine {
        fail_follow_ups: 1,
        ..StubEngine::with_pages(load_fixture_pages())
    };
    let (mut finder, log) = finder_for("?language=java&labels=bug", stub, &[]);
    assert!(finder.wait_until_idle(TIMEOUT));

    assert!(finder.fetch_next_page());
    assert!(finder.wait_until_idle(TIMEOUT));
    assert_eq!(finder.view().error, Some("stub failure"));
    assert_eq!(finder.view().edges.len(), 2);

    // Recover with another fetch instead of an explicit retry.
    assert!(finder.fetch_next_page());
    assert!(finder.wait_until_idle(TIMEOUT));
    assert_eq!(finder.view().error, None);

    assert!(!finder.retry(), "nothing is left to retry");
    assert!(finder.wait_until_idle(TIMEOUT));
    let numbers: Vec<u64> = finder.view().edges.iter().map(|e| e.node.number).collect();
    assert_eq!(numbers, [101, 7, 55]);
    assert_eq!(logged(&log).len(), 3);
    finder.shutdown();
}

// ---------------------------------------------------------------------------
// Local mutators
// ---------------------------------------------------------------------------

#[test]
fn set_language_is_visible_immediately() {
    let (mut finder, _log) = finder_for(
        "?language=java&labels=bug",
        StubEngine::with_pages(load_fixture_pages()),
        &[],
    );
    finder.set_language("javascript").unwrap();
    // No reply applied yet: the read goes straight to the local store.
    assert_eq!(finder.language().unwrap(), "javascript");
    assert_eq!(finder.view().language, "javascript");
    assert_eq!(finder.view().query, Some("language:javascript label:bug"));
    assert!(finder.wait_until_idle(TIMEOUT));
    finder.shutdown();
}

#[test]
fn blank_label_changes_nothing() {
    let (mut finder, log) = finder_for(
        "?language=java&labels=bug",
        StubEngine::with_pages(load_fixture_pages()),
        &[],
    );
    assert!(finder.wait_until_idle(TIMEOUT));
    assert!(!finder.add_label("   ").unwrap());
    assert_eq!(finder.labels().unwrap(), ["bug"]);
    assert!(finder.navigator().entries().is_empty());
    assert!(!finder.view().loading);
    assert_eq!(logged(&log).len(), 1);
    finder.shutdown();
}

#[test]
fn label_changes_push_canonical_href() {
    let (mut finder, _log) = finder_for(
        "/?page=2&language=java&labels=bug%2Cneeds-triage",
        StubEngine::with_pages(load_fixture_pages()),
        &[],
    );
    finder.add_label("good first issue").unwrap();
    assert_eq!(
        finder.navigator().current(),
        Some("/?page=2&language=java&labels=bug%2Cneeds-triage%2Cgood%20first%20issue")
    );
    finder.set_language("javascript").unwrap();
    assert_eq!(finder.navigator().entries().len(), 2);
    assert_eq!(finder.href(), finder.navigator().current().unwrap());
    assert!(finder.wait_until_idle(TIMEOUT));
    finder.shutdown();
}

#[test]
fn clear_resets_to_defaults_and_bare_path() {
    let (mut finder, log) = finder_for(
        "/?page=2&language=java&labels=bug",
        StubEngine::with_pages(load_fixture_pages()),
        &[],
    );
    assert!(finder.wait_until_idle(TIMEOUT));
    finder.add_label("ui").unwrap();
    assert!(finder.wait_until_idle(TIMEOUT));
    assert_eq!(finder.view().edges.len(), 2);

    finder.clear(&FilterState::default()).unwrap();
    assert_eq!(finder.language().unwrap(), "");
    assert!(finder.labels().unwrap().is_empty());
    assert_eq!(finder.navigator().current(), Some("/"));
    assert_eq!(finder.href(), "/");

    let view = finder.view();
    assert_eq!(view.state, FetchState::Idle);
    assert!(view.edges.is_empty());
    assert_eq!(view.query, None);
    assert_eq!(logged(&log).len(), 2);
    finder.shutdown();
}

#[test]
fn clear_with_defaults_starts_a_new_search() {
    let (mut finder, log) = finder_for(
        "?language=java&labels=bug",
        StubEngine::with_pages(load_fixture_pages()),
        &[],
    );
    assert!(finder.wait_until_idle(TIMEOUT));
    let defaults = FilterState::initialize(Some("javascript"), None, &["good first issue".to_owned()]);
    finder.clear(&defaults).unwrap();
    assert_eq!(finder.labels().unwrap(), ["good first issue"]);
    assert_eq!(finder.href(), "/");
    assert!(finder.wait_until_idle(TIMEOUT));
    assert_eq!(
        finder.view().query,
        Some("language:javascript label:good first issue")
    );
    assert_eq!(logged(&log).len(), 2);
    finder.shutdown();
}

#[test]
fn subscribers_see_label_changes() {
    let (mut finder, _log) = finder_for(
        "?language=java&labels=bug",
        StubEngine::with_pages(load_fixture_pages()),
        &[],
    );
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    finder.subscribe(LocalField::Labels, move |value| {
        if let LocalValue::Labels(labels) = value {
            sink.borrow_mut().push(labels.clone());
        }
    });
    finder.add_label("ui").unwrap();
    finder.add_label("").unwrap();
    assert_eq!(*seen.borrow(), [vec!["bug".to_owned(), "ui".to_owned()]]);
    assert!(finder.wait_until_idle(TIMEOUT));
    finder.shutdown();
}

// ---------------------------------------------------------------------------
// Single issue
// ---------------------------------------------------------------------------

#[test]
fn lookup_finds_issue_by_id() {
    let (mut finder, _log) = finder_for("", StubEngine::with_pages(load_fixture_pages()), &[]);
    finder.lookup_issue("I_kwDOA2");
    assert!(matches!(finder.lookup(), IssueLookup::Loading(_)));
    assert!(finder.wait_until_idle(TIMEOUT));
    match finder.lookup() {
        IssueLookup::Found(issue) => assert_eq!(issue.number, 7),
        other => panic!("expected Found, got {other:?}"),
    }

    finder.lookup_issue("nope");
    assert!(finder.wait_until_idle(TIMEOUT));
    assert_eq!(finder.lookup(), &IssueLookup::NotFound("nope".into()));
    finder.shutdown();
}
