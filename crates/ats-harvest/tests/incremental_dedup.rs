mod common;

use ats_harvest::harvest::{CsvListingStore, OrganizationStatus};
use common::{
    column, greenhouse_api, greenhouse_board_body, greenhouse_detail_url, greenhouse_job,
    greenhouse_jobs_url, pipeline, read_rows, settings, FakeWeb,
};

#[tokio::test]
async fn second_run_against_unchanged_source_persists_nothing() {
    let web = FakeWeb::new();
    web.serve(
        &greenhouse_jobs_url("acme"),
        greenhouse_board_body(&[
            greenhouse_job(101, "Backend Engineer", "Dublin", None),
            greenhouse_job(102, "Senior Backend Engineer", "Dublin", None),
            greenhouse_job(103, "Platform Developer", "Remote", None),
            greenhouse_job(104, "Account Executive", "Dublin", None),
        ]),
    );
    web.serve(
        &greenhouse_detail_url("acme", "101"),
        r#"<script>{"published_at":"2024-05-02T10:00:00-04:00"}</script>"#,
    );
    web.serve(
        &greenhouse_detail_url("acme", "103"),
        r#"<script>{"published_at":"2024-05-09T08:30:00Z"}</script>"#,
    );

    let dir = tempfile::tempdir().expect("tempdir");
    let org = greenhouse_api("acme");
    let pipeline = pipeline(&web, dir.path(), settings());

    let first = pipeline.run(&[org.clone()]).await;
    let outcome = &first.outcomes[0];
    assert_eq!(outcome.status, OrganizationStatus::Succeeded);
    assert_eq!(outcome.counts.fetched, 4);
    assert_eq!(outcome.counts.matched, 2);
    assert_eq!(outcome.counts.new, 2);
    assert_eq!(outcome.counts.dated, 2);

    let path = CsvListingStore::new(dir.path()).path_for(&org);
    let rows = read_rows(&path);
    assert_eq!(column(&rows, "Token"), vec!["103", "101"]);
    assert_eq!(
        column(&rows, "Date Published"),
        vec!["2024-05-09T08:30:00Z", "2024-05-02T14:00:00Z"]
    );
    let detail_calls = web.calls_containing("job_app");

    let second = pipeline.run(&[org.clone()]).await;
    assert_eq!(second.outcomes[0].status, OrganizationStatus::Succeeded);
    assert_eq!(second.outcomes[0].counts.matched, 2);
    assert_eq!(second.outcomes[0].counts.new, 0);
    assert_eq!(read_rows(&path).len(), 2);
    assert_eq!(
        web.calls_containing("job_app"),
        detail_calls,
        "known listings must not trigger date lookups"
    );
}

#[tokio::test]
async fn new_postings_are_appended_after_existing_rows() {
    let web = FakeWeb::new();
    let dir = tempfile::tempdir().expect("tempdir");
    let org = greenhouse_api("acme");
    let pipeline = pipeline(&web, dir.path(), settings());

    web.serve(
        &greenhouse_jobs_url("acme"),
        greenhouse_board_body(&[greenhouse_job(
            1,
            "Backend Engineer",
            "Dublin",
            Some("2024-01-10T00:00:00Z"),
        )]),
    );
    pipeline.run(&[org.clone()]).await;

    web.serve(
        &greenhouse_jobs_url("acme"),
        greenhouse_board_body(&[
            greenhouse_job(2, "iOS Engineer", "Toronto", Some("2024-02-10T00:00:00Z")),
            greenhouse_job(1, "Backend Engineer", "Dublin", Some("2024-01-10T00:00:00Z")),
        ]),
    );
    let report = pipeline.run(&[org.clone()]).await;
    assert_eq!(report.outcomes[0].counts.new, 1);

    let rows = read_rows(&CsvListingStore::new(dir.path()).path_for(&org));
    assert_eq!(column(&rows, "Token"), vec!["1", "2"]);
}

#[tokio::test]
async fn repeated_tokens_in_one_fetch_are_stored_once() {
    let web = FakeWeb::new();
    web.serve(
        &greenhouse_jobs_url("acme"),
        greenhouse_board_body(&[
            greenhouse_job(7, "Backend Engineer", "Dublin", Some("2024-03-01")),
            greenhouse_job(7, "Backend Engineer", "Remote", Some("2024-03-01")),
        ]),
    );

    let dir = tempfile::tempdir().expect("tempdir");
    let org = greenhouse_api("acme");
    let report = pipeline(&web, dir.path(), settings()).run(&[org.clone()]).await;

    assert_eq!(report.outcomes[0].counts.matched, 2);
    assert_eq!(report.outcomes[0].counts.new, 1);

    let rows = read_rows(&CsvListingStore::new(dir.path()).path_for(&org));
    assert_eq!(column(&rows, "Token"), vec!["7"]);
    assert_eq!(column(&rows, "Location"), vec!["Dublin"]);
}

#[tokio::test]
async fn corrupt_history_degrades_to_empty() {
    let web = FakeWeb::new();
    web.serve(
        &greenhouse_jobs_url("acme"),
        greenhouse_board_body(&[greenhouse_job(
            5,
            "Backend Engineer",
            "Dublin",
            Some("2024-03-01"),
        )]),
    );

    let dir = tempfile::tempdir().expect("tempdir");
    let org = greenhouse_api("acme");
    let path = CsvListingStore::new(dir.path()).path_for(&org);
    std::fs::write(&path, "Company,Title\nAcme,Engineer\n").expect("seed corrupt store");

    let report = pipeline(&web, dir.path(), settings()).run(&[org]).await;

    assert_eq!(report.outcomes[0].status, OrganizationStatus::Succeeded);
    assert_eq!(report.outcomes[0].counts.new, 1);
}
