use crate::cli::{OrgsArgs, RunArgs};
use crate::infra::{apply_overrides, build_pipeline, load_catalog};
use crate::RunStatus;
use ats_harvest::config::{AppConfig, Backend};
use ats_harvest::error::AppError;
use ats_harvest::harvest::{OrganizationOutcome, OrganizationStatus, RunReport, RunSummary};
use ats_harvest::telemetry;
use serde::Serialize;
use tracing::info;

#[derive(Serialize)]
struct JsonReport<'a> {
    summary: RunSummary,
    outcomes: &'a [OrganizationOutcome],
}

pub(crate) async fn run_harvest(args: RunArgs) -> Result<RunStatus, AppError> {
    let mut config = AppConfig::load()?;
    apply_overrides(&mut config.harvest, &args)?;
    telemetry::init(&config.telemetry)?;

    let catalog = load_catalog(config.harvest.catalog_path.as_deref())?;
    let organizations = catalog.select(&args.organizations, args.backend.map(Backend::from))?;

    info!(
        ?config.environment,
        organizations = organizations.len(),
        output_dir = %config.harvest.output_dir.display(),
        concurrency = config.harvest.concurrency,
        "starting harvest"
    );

    let pipeline = build_pipeline(&config.harvest)?;
    let report = pipeline.run(&organizations).await;

    if args.json {
        let json = JsonReport {
            summary: report.summary(),
            outcomes: &report.outcomes,
        };
        println!("{}", serde_json::to_string_pretty(&json)?);
    } else {
        println!("{}", render_report(&report));
    }

    Ok(if report.any_succeeded() {
        RunStatus::Completed
    } else {
        RunStatus::NothingSucceeded
    })
}

pub(crate) fn list_organizations(args: OrgsArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let path = args.catalog.or(config.harvest.catalog_path);
    let catalog = load_catalog(path.as_deref())?;
    let organizations = catalog.select(&[], args.backend.map(Backend::from))?;

    println!("{:<16} {:<11} {:<8} Store", "Organization", "Backend", "Source");
    for org in &organizations {
        println!(
            "{:<16} {:<11} {:<8} {}_jobs.csv",
            org.display_name,
            org.backend.label(),
            org.source_kind.label(),
            org.store_key()
        );
    }
    println!("\n{} organizations", organizations.len());
    Ok(())
}

fn render_outcome(outcome: &OrganizationOutcome) -> String {
    let name = outcome.source_label();
    let counts = &outcome.counts;
    match &outcome.status {
        OrganizationStatus::Succeeded => format!(
            "  {name}: {} fetched, {} matched, {} new ({} dated, {} undated)",
            counts.fetched, counts.matched, counts.new, counts.dated, counts.undated
        ),
        OrganizationStatus::Failed { reason } => format!("  {name}: failed - {reason}"),
        OrganizationStatus::TimedOut => format!("  {name}: timed out"),
    }
}

fn name_list(names: &[String]) -> String {
    if names.is_empty() {
        "none".to_string()
    } else {
        names.join(", ")
    }
}

pub(crate) fn render_report(report: &RunReport) -> String {
    let summary = report.summary();
    let totals = summary.totals;

    let mut lines: Vec<String> = vec!["Organizations".to_string()];
    lines.extend(report.outcomes.iter().map(render_outcome));
    lines.push(String::new());
    lines.push("Harvest summary".to_string());
    lines.push(format!(
        "  Organizations: {} ({} succeeded)",
        summary.organizations, summary.succeeded
    ));
    lines.push(format!("  Listings found: {}", totals.fetched));
    lines.push(format!("  Matching filters: {}", totals.matched));
    lines.push(format!(
        "  New listings saved: {} ({} with dates, {} without)",
        totals.new, totals.dated, totals.undated
    ));
    if totals.token_failures > 0 {
        lines.push(format!("  Skipped without token: {}", totals.token_failures));
    }
    lines.push(format!(
        "  No matching listings: {}",
        name_list(&summary.empty_organizations)
    ));
    lines.push(format!(
        "  Failed organizations: {}",
        name_list(&summary.failed_organizations)
    ));
    lines.join("\n")
}
