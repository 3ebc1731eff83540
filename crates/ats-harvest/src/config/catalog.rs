use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::io::Read;
use std::path::Path;
use std::time::Duration;

const BUILTIN_CATALOG: &str = include_str!("default_catalog.json");

/// ATS vendor hosting an organization's postings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    Greenhouse,
    Lever,
}

impl Backend {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Greenhouse => "Greenhouse",
            Self::Lever => "Lever",
        }
    }

    pub const fn slug(self) -> &'static str {
        match self {
            Self::Greenhouse => "greenhouse",
            Self::Lever => "lever",
        }
    }

    /// Pause between successive calls against one organization's board.
    pub const fn default_request_delay(self) -> Duration {
        match self {
            Self::Greenhouse => Duration::from_millis(500),
            Self::Lever => Duration::from_millis(700),
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// How listings are obtained from the backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    #[default]
    Api,
    Browser,
}

impl SourceKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Api => "API",
            Self::Browser => "Browser",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Inclusion and exclusion phrases for one organization. Entries are stored
/// lower-cased and trimmed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterRules {
    #[serde(default)]
    pub include_titles: BTreeSet<String>,
    #[serde(default)]
    pub include_locations: BTreeSet<String>,
    #[serde(default)]
    pub exclude_roles: BTreeSet<String>,
    #[serde(default)]
    pub exclude_locations: BTreeSet<String>,
}

impl FilterRules {
    fn normalized(self) -> Self {
        Self {
            include_titles: phrase_set(self.include_titles),
            include_locations: phrase_set(self.include_locations),
            exclude_roles: phrase_set(self.exclude_roles),
            exclude_locations: phrase_set(self.exclude_locations),
        }
    }
}

/// Builds a lower-cased phrase set, dropping blank entries.
pub fn phrase_set<I, S>(items: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    items
        .into_iter()
        .map(|item| item.as_ref().trim().to_lowercase())
        .filter(|item| !item.is_empty())
        .collect()
}

/// Server-side pre-filtering appended to a browser-rendered board URL.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardQuery {
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub office_ids: Vec<String>,
}

/// Where an organization's office footprint comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocationFallback {
    Own(BTreeSet<String>),
    /// Copy the catalog's shared inclusion set at construction time.
    CatalogDefault,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrganizationConfig {
    pub name: String,
    pub display_name: String,
    pub backend: Backend,
    pub source_kind: SourceKind,
    /// Listing endpoint with an `{org}` placeholder; empty selects the
    /// backend's built-in endpoints.
    pub endpoint_template: String,
    pub filter_rules: FilterRules,
    pub allowed_locations: BTreeSet<String>,
    pub override_default_location_filter: bool,
    pub board_query: BoardQuery,
}

impl OrganizationConfig {
    pub fn new(
        name: &str,
        backend: Backend,
        source_kind: SourceKind,
        filter_rules: FilterRules,
        locations: LocationFallback,
    ) -> Result<Self, CatalogError> {
        let name = name.trim().to_lowercase();
        let filter_rules = filter_rules.normalized();
        let allowed_locations = match locations {
            LocationFallback::Own(own) => phrase_set(own),
            LocationFallback::CatalogDefault => filter_rules.include_locations.clone(),
        };

        let config = Self {
            display_name: capitalize(&name),
            name,
            backend,
            source_kind,
            endpoint_template: String::new(),
            filter_rules,
            allowed_locations,
            override_default_location_filter: false,
            board_query: BoardQuery::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }

    pub fn with_endpoint_template(
        mut self,
        template: impl Into<String>,
    ) -> Result<Self, CatalogError> {
        self.endpoint_template = template.into().trim().to_string();
        self.validate()?;
        Ok(self)
    }

    pub fn with_location_override(mut self, enabled: bool) -> Self {
        self.override_default_location_filter = enabled;
        self
    }

    pub fn with_board_query(mut self, query: BoardQuery) -> Self {
        self.board_query = query;
        self
    }

    pub fn validate(&self) -> Result<(), CatalogError> {
        if self.name.is_empty() {
            return Err(CatalogError::EmptyName);
        }

        if matches!(
            (self.backend, self.source_kind),
            (Backend::Lever, SourceKind::Browser)
        ) {
            return Err(CatalogError::UnsupportedSource {
                organization: self.name.clone(),
                backend: self.backend,
                kind: self.source_kind,
            });
        }

        if !self.endpoint_template.is_empty() && !self.endpoint_template.contains("{org}") {
            return Err(CatalogError::MissingPlaceholder {
                organization: self.name.clone(),
            });
        }

        Ok(())
    }

    /// Substitutes this organization's name into an endpoint template.
    pub fn expand(&self, template: &str) -> String {
        template.replace("{org}", &self.name)
    }

    /// File stem of this organization's listing store.
    pub fn store_key(&self) -> String {
        match self.source_kind {
            SourceKind::Api => format!("{}_{}", self.backend.slug(), self.name),
            SourceKind::Browser => format!("{}_board_{}", self.backend.slug(), self.name),
        }
    }
}

fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("failed to read organization catalog: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid organization catalog: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("organization entry has an empty name")]
    EmptyName,
    #[error("{backend} does not offer {kind} sources (organization '{organization}')")]
    UnsupportedSource {
        organization: String,
        backend: Backend,
        kind: SourceKind,
    },
    #[error("endpoint template for '{organization}' must contain {{org}}")]
    MissingPlaceholder { organization: String },
    #[error("'{organization}' is configured more than once as a {backend} {kind} source")]
    Duplicate {
        organization: String,
        backend: Backend,
        kind: SourceKind,
    },
    #[error("unknown organization '{0}'")]
    UnknownOrganization(String),
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    defaults: FilterRules,
    #[serde(default)]
    organizations: Vec<OrganizationEntry>,
}

#[derive(Debug, Deserialize)]
struct OrganizationEntry {
    name: String,
    #[serde(default)]
    display_name: Option<String>,
    backend: Backend,
    #[serde(default)]
    source_kind: SourceKind,
    #[serde(default)]
    endpoint_template: Option<String>,
    #[serde(default)]
    include_titles: Option<BTreeSet<String>>,
    #[serde(default)]
    include_locations: Option<BTreeSet<String>>,
    #[serde(default)]
    allowed_locations: Option<BTreeSet<String>>,
    #[serde(default)]
    exclude_senior_roles: bool,
    #[serde(default)]
    exclude_unwanted_locations: bool,
    #[serde(default)]
    override_default_location_filter: bool,
    #[serde(default)]
    board_query: BoardQuery,
}

impl OrganizationEntry {
    fn into_config(self, defaults: &FilterRules) -> Result<OrganizationConfig, CatalogError> {
        let rules = FilterRules {
            include_titles: self
                .include_titles
                .unwrap_or_else(|| defaults.include_titles.clone()),
            include_locations: self
                .include_locations
                .unwrap_or_else(|| defaults.include_locations.clone()),
            exclude_roles: if self.exclude_senior_roles {
                defaults.exclude_roles.clone()
            } else {
                BTreeSet::new()
            },
            exclude_locations: if self.exclude_unwanted_locations {
                defaults.exclude_locations.clone()
            } else {
                BTreeSet::new()
            },
        };
        let locations = match self.allowed_locations {
            Some(own) => LocationFallback::Own(own),
            None => LocationFallback::CatalogDefault,
        };

        let mut config =
            OrganizationConfig::new(&self.name, self.backend, self.source_kind, rules, locations)?
                .with_location_override(self.override_default_location_filter)
                .with_board_query(self.board_query);

        if let Some(display_name) = self.display_name {
            config = config.with_display_name(display_name);
        }
        if let Some(template) = self.endpoint_template {
            config = config.with_endpoint_template(template)?;
        }

        Ok(config)
    }
}

/// Immutable set of organizations a run may target.
#[derive(Debug, Clone)]
pub struct OrganizationCatalog {
    organizations: Vec<OrganizationConfig>,
}

impl OrganizationCatalog {
    /// Catalog compiled into the binary.
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_reader(BUILTIN_CATALOG.as_bytes())
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, CatalogError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, CatalogError> {
        let file: CatalogFile = serde_json::from_reader(reader)?;
        let defaults = file.defaults.normalized();

        let mut organizations: Vec<OrganizationConfig> =
            Vec::with_capacity(file.organizations.len());
        for entry in file.organizations {
            let config = entry.into_config(&defaults)?;
            let duplicate = organizations.iter().any(|existing| {
                existing.name == config.name
                    && existing.backend == config.backend
                    && existing.source_kind == config.source_kind
            });
            if duplicate {
                return Err(CatalogError::Duplicate {
                    organization: config.name,
                    backend: config.backend,
                    kind: config.source_kind,
                });
            }
            organizations.push(config);
        }

        Ok(Self { organizations })
    }

    pub fn organizations(&self) -> &[OrganizationConfig] {
        &self.organizations
    }

    /// Picks organizations by name and backend, keeping catalog order. No
    /// names selects every organization of the requested backend.
    pub fn select(
        &self,
        names: &[String],
        backend: Option<Backend>,
    ) -> Result<Vec<OrganizationConfig>, CatalogError> {
        let wanted: Vec<String> = names.iter().map(|name| name.trim().to_lowercase()).collect();

        for name in &wanted {
            let known = self.organizations.iter().any(|org| {
                &org.name == name && backend.map_or(true, |backend| org.backend == backend)
            });
            if !known {
                return Err(CatalogError::UnknownOrganization(name.clone()));
            }
        }

        Ok(self
            .organizations
            .iter()
            .filter(|org| backend.map_or(true, |backend| org.backend == backend))
            .filter(|org| wanted.is_empty() || wanted.contains(&org.name))
            .cloned()
            .collect())
    }
}
