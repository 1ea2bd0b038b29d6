//! Optional row filters injected into a family's query.
//!
//! The filter file is a YAML document keyed by family namespace:
//!
//! ```yaml
//! parts_exporter:
//!   filters:
//!     - database != 'system'
//!     - active
//! disk_exporter:
//!   filters: type = 'local'
//! ```
//!
//! It is read and validated once at startup; scrapes only ever see the resolved query.

use crate::collectors::error::ConfigError;
use serde::Deserialize;
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};
use tracing::{debug, warn};

/// Placeholder replaced by the filter clause in every query template.
pub const FILTER_PLACEHOLDER: &str = "{FILTER_CLAUSE}";

/// A user supplied predicate: one string or an ordered list of strings.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum FilterConfig {
    Single(String),
    All(Vec<String>),
}

impl FilterConfig {
    fn predicates(&self) -> Vec<&str> {
        match self {
            Self::Single(predicate) => vec![predicate.as_str()],
            Self::All(predicates) => predicates.iter().map(String::as_str).collect(),
        }
    }
}

/// Build the `WHERE` fragment for an optional filter.
///
/// No filter yields an empty string, a single predicate yields `WHERE\n<predicate>` and a
/// list is joined with `AND\n` under one `WHERE`.
#[must_use]
pub fn build(filter: Option<&FilterConfig>) -> String {
    build_with_base(&[], filter)
}

/// Same as [`build`], with predicates that always apply placed before the user's.
#[must_use]
pub fn build_with_base(base: &[&str], filter: Option<&FilterConfig>) -> String {
    let mut predicates: Vec<&str> = base.to_vec();

    if let Some(filter) = filter {
        predicates.extend(filter.predicates());
    }

    if predicates.is_empty() {
        String::new()
    } else {
        format!("WHERE\n{}", predicates.join(" AND\n"))
    }
}

/// Per family section of the filter file.
#[derive(Debug, Default, Deserialize)]
struct FamilySection {
    #[serde(default)]
    filters: Option<serde_yaml::Value>,
}

/// The validated filter file: one optional filter per family namespace.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FilterFile {
    filters: HashMap<String, FilterConfig>,
}

impl FilterFile {
    /// An empty file: no family is filtered.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read and validate a filter file.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file can't be read, isn't YAML or holds a filter
    /// that is neither a string nor a list of strings.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::FilterFile {
            path: path.to_path_buf(),
            source,
        })?;

        Self::parse(&raw).map_err(|err| match err {
            ParseError::Yaml(source) => ConfigError::FilterYaml {
                path: PathBuf::from(path),
                source,
            },
            ParseError::Config(err) => err,
        })
    }

    /// Parse filter file contents.
    ///
    /// # Errors
    ///
    /// Returns an error for malformed YAML or a filter of the wrong shape.
    pub fn from_yaml(raw: &str) -> Result<Self, ConfigError> {
        Self::parse(raw).map_err(|err| match err {
            ParseError::Yaml(source) => ConfigError::FilterYaml {
                path: PathBuf::from("<inline>"),
                source,
            },
            ParseError::Config(err) => err,
        })
    }

    fn parse(raw: &str) -> Result<Self, ParseError> {
        // An empty document is valid and means "no filters".
        let sections: Option<HashMap<String, Option<FamilySection>>> =
            serde_yaml::from_str(raw).map_err(ParseError::Yaml)?;

        let mut filters = HashMap::new();

        for (namespace, section) in sections.unwrap_or_default() {
            let Some(value) = section.and_then(|s| s.filters) else {
                continue;
            };

            // The untagged enum only accepts a string or a list of strings; anything else
            // (numbers, maps, lists holding maps) is rejected here, before serving starts.
            let filter: FilterConfig = serde_yaml::from_value(value).map_err(|_| {
                ParseError::Config(ConfigError::FilterShape {
                    namespace: namespace.clone(),
                })
            })?;

            debug!(%namespace, ?filter, "loaded filter");
            filters.insert(namespace, filter);
        }

        Ok(Self { filters })
    }

    /// Add or replace the filter of a namespace.
    #[must_use]
    pub fn with_filter(mut self, namespace: &str, filter: FilterConfig) -> Self {
        self.filters.insert(namespace.to_string(), filter);
        self
    }

    /// The filter configured for a family namespace, if any.
    #[must_use]
    pub fn get(&self, namespace: &str) -> Option<&FilterConfig> {
        self.filters.get(namespace)
    }

    /// Warn about namespaces no family will ever read.
    pub fn warn_unknown(&self, known: &[&str]) {
        for namespace in self.filters.keys() {
            if !known.contains(&namespace.as_str()) {
                warn!(%namespace, "filter namespace does not match any family, ignoring");
            }
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

enum ParseError {
    Yaml(serde_yaml::Error),
    Config(ConfigError),
}
