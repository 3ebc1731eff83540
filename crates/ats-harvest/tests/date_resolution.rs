mod common;

use ats_harvest::harvest::{CsvListingStore, UNRESOLVED_SENTINEL};
use common::{
    column, greenhouse_api, greenhouse_board_body, greenhouse_job, greenhouse_jobs_url, lever_api,
    pipeline, read_rows, settings, FakeWeb,
};

const FIRST: &str = "aaaaaaaa-0000-0000-0000-000000000001";
const SECOND: &str = "aaaaaaaa-0000-0000-0000-000000000002";

fn lever_posting(id: &str, title: &str, created_at: Option<&str>) -> String {
    let created_at = created_at
        .map(|value| format!(r#", "createdAt": {value}"#))
        .unwrap_or_default();
    format!(
        r#"{{"id": "{id}", "text": "{title}", "hostedUrl": "https://jobs.lever.co/acme/{id}", "categories": {{"location": "Remote", "team": "Core"}}{created_at}}}"#
    )
}

fn lever_page_url() -> String {
    "https://api.lever.co/v0/postings/acme?mode=json&skip=0&limit=100".to_string()
}

fn lever_detail_url(id: &str) -> String {
    format!("https://api.lever.co/v0/postings/acme/{id}")
}

#[tokio::test]
async fn millisecond_and_iso_detail_dates_resolve_identically() {
    let web = FakeWeb::new();
    web.serve(
        &lever_page_url(),
        format!(
            "[{},{}]",
            lever_posting(FIRST, "Backend Engineer", None),
            lever_posting(SECOND, "Frontend Engineer", None)
        ),
    );
    web.serve(&lever_detail_url(FIRST), r#"{"createdAt": 1700000000000}"#);
    web.serve(
        &lever_detail_url(SECOND),
        r#"{"createdAt": "2023-11-14T22:13:20Z"}"#,
    );

    let dir = tempfile::tempdir().expect("tempdir");
    let org = lever_api("acme");
    let report = pipeline(&web, dir.path(), settings()).run(&[org.clone()]).await;

    assert_eq!(report.outcomes[0].counts.dated, 2);
    let rows = read_rows(&CsvListingStore::new(dir.path()).path_for(&org));
    assert_eq!(
        column(&rows, "Date Published"),
        vec!["2023-11-14T22:13:20Z", "2023-11-14T22:13:20Z"]
    );
    assert_eq!(column(&rows, "Team"), vec!["Core", "Core"]);
    assert_eq!(column(&rows, "Token"), vec![FIRST, SECOND]);
}

#[tokio::test]
async fn structured_created_at_needs_no_lookup() {
    let web = FakeWeb::new();
    web.serve(
        &lever_page_url(),
        format!(
            "[{}]",
            lever_posting(FIRST, "Backend Engineer", Some("1700000000000"))
        ),
    );

    let dir = tempfile::tempdir().expect("tempdir");
    let report = pipeline(&web, dir.path(), settings())
        .run(&[lever_api("acme")])
        .await;

    assert_eq!(report.outcomes[0].counts.dated, 1);
    assert_eq!(web.calls(), vec![lever_page_url()]);
}

#[tokio::test]
async fn page_scan_runs_when_detail_lookup_fails() {
    let web = FakeWeb::new();
    web.serve(
        &lever_page_url(),
        format!("[{}]", lever_posting(FIRST, "Backend Engineer", None)),
    );
    web.serve(
        &format!("https://jobs.lever.co/acme/{FIRST}"),
        r#"<div class="posting-date">Posted on January 9, 2024</div>"#,
    );

    let dir = tempfile::tempdir().expect("tempdir");
    let org = lever_api("acme");
    pipeline(&web, dir.path(), settings()).run(&[org.clone()]).await;

    let rows = read_rows(&CsvListingStore::new(dir.path()).path_for(&org));
    assert_eq!(column(&rows, "Date Published"), vec!["2024-01-09T00:00:00Z"]);
}

#[tokio::test]
async fn unresolved_listings_are_kept_and_sorted_last() {
    let web = FakeWeb::new();
    web.serve(
        &greenhouse_jobs_url("acme"),
        greenhouse_board_body(&[
            greenhouse_job(1, "Backend Engineer", "Dublin", Some("2024-01-01T00:00:00Z")),
            greenhouse_job(2, "Mobile Engineer", "Remote", None),
            greenhouse_job(3, "Data Engineer", "Singapore", Some("2024-02-01T00:00:00Z")),
        ]),
    );

    let dir = tempfile::tempdir().expect("tempdir");
    let org = greenhouse_api("acme");
    let report = pipeline(&web, dir.path(), settings()).run(&[org.clone()]).await;

    let counts = report.outcomes[0].counts;
    assert_eq!((counts.dated, counts.undated), (2, 1));

    let rows = read_rows(&CsvListingStore::new(dir.path()).path_for(&org));
    assert_eq!(column(&rows, "Token"), vec!["3", "1", "2"]);
    assert_eq!(column(&rows, "Date Published")[2], UNRESOLVED_SENTINEL);
    assert_eq!(column(&rows, "Local Date Published")[2], UNRESOLVED_SENTINEL);
    assert_eq!(column(&rows, "Date Updated")[2], "2024-06-01T12:00:00Z");
}
