use crate::config::{Backend, SourceKind};
use serde::Serialize;
use std::ops::AddAssign;

/// Listing counts at each pipeline stage for one organization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OrganizationCounts {
    pub fetched: usize,
    pub normalized: usize,
    pub token_failures: usize,
    pub matched: usize,
    pub new: usize,
    pub dated: usize,
    pub undated: usize,
}

impl AddAssign for OrganizationCounts {
    fn add_assign(&mut self, other: Self) {
        self.fetched += other.fetched;
        self.normalized += other.normalized;
        self.token_failures += other.token_failures;
        self.matched += other.matched;
        self.new += other.new;
        self.dated += other.dated;
        self.undated += other.undated;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OrganizationStatus {
    Succeeded,
    Failed { reason: String },
    TimedOut,
}

impl OrganizationStatus {
    pub fn label(&self) -> &'static str {
        match self {
            OrganizationStatus::Succeeded => "succeeded",
            OrganizationStatus::Failed { .. } => "failed",
            OrganizationStatus::TimedOut => "timed out",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrganizationOutcome {
    pub organization: String,
    pub display_name: String,
    pub backend: Backend,
    pub source_kind: SourceKind,
    pub status: OrganizationStatus,
    pub counts: OrganizationCounts,
}

impl OrganizationOutcome {
    pub fn succeeded(&self) -> bool {
        matches!(self.status, OrganizationStatus::Succeeded)
    }

    /// Display name qualified by backend and source kind, e.g.
    /// "Stripe (Greenhouse Browser)".
    pub fn source_label(&self) -> String {
        format!(
            "{} ({} {})",
            self.display_name,
            self.backend.label(),
            self.source_kind.label()
        )
    }
}

/// Outcome of one harvest run, in catalog order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub outcomes: Vec<OrganizationOutcome>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub organizations: usize,
    pub succeeded: usize,
    pub totals: OrganizationCounts,
    pub empty_organizations: Vec<String>,
    pub failed_organizations: Vec<String>,
}

impl RunReport {
    pub fn any_succeeded(&self) -> bool {
        self.outcomes.iter().any(OrganizationOutcome::succeeded)
    }

    /// Organizations that ran fine but had no matching listings.
    pub fn empty_organizations(&self) -> Vec<&OrganizationOutcome> {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.succeeded() && outcome.counts.matched == 0)
            .collect()
    }

    pub fn failed(&self) -> Vec<&OrganizationOutcome> {
        self.outcomes
            .iter()
            .filter(|outcome| !outcome.succeeded())
            .collect()
    }

    pub fn totals(&self) -> OrganizationCounts {
        let mut totals = OrganizationCounts::default();
        for outcome in &self.outcomes {
            totals += outcome.counts;
        }
        totals
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            organizations: self.outcomes.len(),
            succeeded: self.outcomes.iter().filter(|o| o.succeeded()).count(),
            totals: self.totals(),
            empty_organizations: self
                .empty_organizations()
                .into_iter()
                .map(OrganizationOutcome::source_label)
                .collect(),
            failed_organizations: self
                .failed()
                .into_iter()
                .map(OrganizationOutcome::source_label)
                .collect(),
        }
    }
}
