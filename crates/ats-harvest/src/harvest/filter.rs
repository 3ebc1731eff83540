use super::listing::Listing;
use crate::config::{FilterRules, OrganizationConfig};
use serde::Serialize;
use std::collections::BTreeSet;

/// Outcome of running one listing through an organization's rules. Every
/// rejection names the step that vetoed it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterVerdict {
    Accepted,
    ExcludedLocation,
    ExcludedRole,
    TitleNotIncluded,
    LocationNotIncluded,
}

impl FilterVerdict {
    pub fn is_accepted(self) -> bool {
        matches!(self, FilterVerdict::Accepted)
    }

    pub const fn label(self) -> &'static str {
        match self {
            FilterVerdict::Accepted => "accepted",
            FilterVerdict::ExcludedLocation => "excluded_location",
            FilterVerdict::ExcludedRole => "excluded_role",
            FilterVerdict::TitleNotIncluded => "title_not_included",
            FilterVerdict::LocationNotIncluded => "location_not_included",
        }
    }
}

/// Location words that name no place. They never lift the location veto, so
/// "Remote, United States" stays excluded even when "remote" is allowed.
const PLACELESS_LOCATIONS: &[&str] = &["remote", "worldwide", "global", "anywhere"];

/// A rule phrase pre-split into tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Phrase(Vec<String>);

#[derive(Debug, Clone, Default)]
struct PhraseSet(Vec<Phrase>);

impl PhraseSet {
    fn compile(phrases: &BTreeSet<String>) -> Self {
        Self(
            phrases
                .iter()
                .map(|phrase| tokenize(phrase))
                .filter(|tokens| !tokens.is_empty())
                .map(Phrase)
                .collect(),
        )
    }

    fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True when any phrase appears as a contiguous run of `tokens`.
    fn hits(&self, tokens: &[String]) -> bool {
        self.0.iter().any(|Phrase(phrase)| {
            phrase.len() <= tokens.len()
                && tokens
                    .windows(phrase.len())
                    .any(|window| window == phrase.as_slice())
        })
    }
}

/// Evaluates one organization's inclusion and exclusion rules.
#[derive(Debug, Clone)]
pub struct FilterEngine {
    include_titles: PhraseSet,
    include_locations: PhraseSet,
    exclude_roles: PhraseSet,
    exclude_locations: PhraseSet,
    allowed_locations: PhraseSet,
    veto_exemptions: PhraseSet,
    location_override: bool,
}

impl FilterEngine {
    pub fn for_organization(org: &OrganizationConfig) -> Self {
        Self::new(
            &org.filter_rules,
            &org.allowed_locations,
            org.override_default_location_filter,
        )
    }

    pub fn new(
        rules: &FilterRules,
        allowed_locations: &BTreeSet<String>,
        location_override: bool,
    ) -> Self {
        let exemptions: BTreeSet<String> = allowed_locations
            .iter()
            .filter(|phrase| !PLACELESS_LOCATIONS.contains(&phrase.as_str()))
            .cloned()
            .collect();

        Self {
            include_titles: PhraseSet::compile(&rules.include_titles),
            include_locations: PhraseSet::compile(&rules.include_locations),
            exclude_roles: PhraseSet::compile(&rules.exclude_roles),
            exclude_locations: PhraseSet::compile(&rules.exclude_locations),
            allowed_locations: PhraseSet::compile(allowed_locations),
            veto_exemptions: PhraseSet::compile(&exemptions),
            location_override,
        }
    }

    pub fn matches(&self, listing: &Listing) -> bool {
        self.evaluate(listing).is_accepted()
    }

    pub fn evaluate(&self, listing: &Listing) -> FilterVerdict {
        self.evaluate_fields(&listing.title, &listing.location)
    }

    /// Vetoes run before inclusion checks and short-circuit in order.
    pub fn evaluate_fields(&self, title: &str, location: &str) -> FilterVerdict {
        let title_tokens = tokenize(title);
        let location_tokens = tokenize(location);

        if self.exclude_locations.hits(&location_tokens)
            && !self.veto_exemptions.hits(&location_tokens)
        {
            return FilterVerdict::ExcludedLocation;
        }

        if self.exclude_roles.hits(&title_tokens) {
            return FilterVerdict::ExcludedRole;
        }

        if !self.include_titles.hits(&title_tokens) {
            return FilterVerdict::TitleNotIncluded;
        }

        let inclusion = if self.location_override {
            &self.allowed_locations
        } else {
            &self.include_locations
        };
        if inclusion.is_empty() || !inclusion.hits(&location_tokens) {
            return FilterVerdict::LocationNotIncluded;
        }

        FilterVerdict::Accepted
    }
}

/// Lower-cased word tokens. Whitespace and list punctuation separate words;
/// other punctuation stays attached ("sr." is one token).
pub fn tokenize(value: &str) -> Vec<String> {
    value
        .to_lowercase()
        .split(|c: char| c.is_whitespace() || matches!(c, ',' | ';' | '/' | '|' | '(' | ')' | '[' | ']'))
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}
