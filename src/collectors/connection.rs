//! HTTP connection to the ClickHouse query interface.

use crate::collectors::error::{ConfigError, ScrapeError};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;
use tracing::{debug, info_span};
use tracing_futures::Instrument as _;
use url::Url;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const USER_HEADER: &str = "X-ClickHouse-User";
const KEY_HEADER: &str = "X-ClickHouse-Key";

#[derive(Clone, Debug)]
pub struct Credentials {
    pub user: String,
    pub password: SecretString,
}

/// Authenticated client bound to one ClickHouse endpoint.
///
/// Built once at startup and shared read-only by every scrape; `reqwest::Client` is
/// reference counted so cloning is cheap.
#[derive(Clone, Debug)]
pub struct Connection {
    client: Client,
    base: Url,
    credentials: Option<Credentials>,
}

impl Connection {
    /// Build a client for `base`.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend can't be initialized.
    pub fn new(
        base: Url,
        credentials: Option<Credentials>,
        insecure: bool,
        timeout: Duration,
    ) -> Result<Self, ConfigError> {
        let client = Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(insecure)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(ConfigError::Client)?;

        Ok(Self {
            client,
            base,
            credentials,
        })
    }

    /// The endpoint every query URI is derived from.
    #[must_use]
    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Resolve the URI that runs `query`: the base endpoint with its `query` parameter
    /// set (replacing one already present), every other parameter kept.
    #[must_use]
    pub fn query_uri(&self, query: &str) -> Url {
        let mut uri = self.base.clone();

        let kept: Vec<(String, String)> = uri
            .query_pairs()
            .filter(|(key, _)| key != "query")
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();

        uri.query_pairs_mut()
            .clear()
            .extend_pairs(kept)
            .append_pair("query", query);

        uri
    }

    /// Run one GET against `uri` and return the raw response body.
    ///
    /// Exactly one attempt; the next scrape is the retry.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::Transport`] for network failures and
    /// [`ScrapeError::Status`] for any status outside 200-399.
    pub async fn execute(&self, uri: &Url) -> Result<Vec<u8>, ScrapeError> {
        let span = info_span!(
            "clickhouse.query",
            otel.kind = "client",
            db.system = "clickhouse",
            server.address = uri.host_str().unwrap_or_default(),
        );

        async {
            let mut request = self.client.get(uri.clone());

            if let Some(credentials) = &self.credentials {
                request = request
                    .header(USER_HEADER, credentials.user.as_str())
                    .header(KEY_HEADER, credentials.password.expose_secret());
            }

            let transport = |source| ScrapeError::Transport {
                uri: redact(uri),
                source,
            };

            let response = request.send().await.map_err(transport)?;
            let status = response.status();

            if !(200..400).contains(&status.as_u16()) {
                // Keep whatever the server said; ClickHouse puts the exception text here.
                let body = match response.text().await {
                    Ok(body) => body.trim_end().to_string(),
                    Err(err) => err.to_string(),
                };

                return Err(ScrapeError::Status {
                    uri: redact(uri),
                    status: status.as_u16(),
                    body,
                });
            }

            let body = response.bytes().await.map_err(transport)?;

            debug!(status = status.as_u16(), bytes = body.len(), "query completed");

            Ok(body.to_vec())
        }
        .instrument(span)
        .await
    }

    /// Cheap round trip used by the health endpoint.
    ///
    /// # Errors
    ///
    /// Returns the same errors as [`Connection::execute`].
    pub async fn ping(&self) -> Result<(), ScrapeError> {
        let uri = self.query_uri("SELECT 1");
        self.execute(&uri).await.map(|_| ())
    }
}

/// Drop userinfo from a URI before it ends up in logs or error messages.
pub(crate) fn redact(uri: &Url) -> String {
    let mut uri = uri.clone();
    let _ = uri.set_password(None);
    let _ = uri.set_username("");
    uri.to_string()
}
