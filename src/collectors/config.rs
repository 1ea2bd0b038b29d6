use crate::collectors::{
    all_schemas,
    connection::{Credentials, DEFAULT_TIMEOUT},
    error::ConfigError,
    filter::FilterFile,
};
use secrecy::SecretString;
use std::{collections::HashSet, time::Duration};
use url::Url;

/// Everything the pipeline needs, resolved and validated before serving starts.
#[derive(Clone, Debug)]
pub struct Configuration {
    pub uri: Url,
    pub credentials: Option<Credentials>,
    pub insecure: bool,
    pub timeout: Duration,
    pub filters: FilterFile,
    pub enabled_families: HashSet<String>,
    pub clickhouse_only: bool,
}

impl Configuration {
    /// Create a config for `uri` with every default-enabled family.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Uri`] if `uri` doesn't parse.
    pub fn new(uri: &str) -> Result<Self, ConfigError> {
        let parsed = Url::parse(uri).map_err(|source| ConfigError::Uri {
            uri: uri.to_string(),
            source,
        })?;

        Ok(Self {
            uri: parsed,
            credentials: None,
            insecure: true,
            timeout: DEFAULT_TIMEOUT,
            filters: FilterFile::new(),
            enabled_families: all_schemas()
                .iter()
                .filter(|s| s.enabled_by_default)
                .map(|s| s.name.to_string())
                .collect(),
            clickhouse_only: false,
        })
    }

    /// Enable exactly these families
    #[must_use]
    pub fn with_enabled(mut self, families: &[String]) -> Self {
        self.enabled_families = families.iter().cloned().collect();
        self
    }

    /// Credentials are only sent when a user is set.
    #[must_use]
    pub fn with_credentials(mut self, user: Option<String>, password: Option<SecretString>) -> Self {
        self.credentials = user.map(|user| Credentials {
            user,
            password: password.unwrap_or_else(|| SecretString::from(String::new())),
        });
        self
    }

    #[must_use]
    pub fn with_insecure(mut self, insecure: bool) -> Self {
        self.insecure = insecure;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_filters(mut self, filters: FilterFile) -> Self {
        self.filters = filters;
        self
    }

    #[must_use]
    pub fn with_clickhouse_only(mut self, clickhouse_only: bool) -> Self {
        self.clickhouse_only = clickhouse_only;
        self
    }

    /// Check if a family is enabled
    #[must_use]
    pub fn is_enabled(&self, name: &str) -> bool {
        self.enabled_families.contains(name)
    }
}
