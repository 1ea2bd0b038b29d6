use std::path::PathBuf;
use thiserror::Error;

/// Failure of a single family during one scrape.
///
/// Any variant aborts only the failing family; the orchestrator records it and moves on.
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// Network level failure: DNS, connect, TLS, timeout or body read.
    #[error("request to {uri} failed: {source}")]
    Transport {
        uri: String,
        #[source]
        source: reqwest::Error,
    },

    /// Upstream answered outside the 200-399 range.
    #[error("status {status} from {uri}: {body}")]
    Status {
        uri: String,
        status: u16,
        body: String,
    },

    /// The response body did not match the family's column schema.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// A decoded row could not be turned into a valid metric.
    #[error("invalid metric: {0}")]
    Metric(#[from] prometheus::Error),
}

/// Column-arity or numeric parse failure on a response line.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("{family}: line {line} has {found} fields, expected {expected}: {text:?}")]
    Arity {
        family: &'static str,
        line: usize,
        expected: usize,
        found: usize,
        text: String,
    },

    #[error("{family}: line {line} column {column}: {value:?} is not a number")]
    Number {
        family: &'static str,
        line: usize,
        column: &'static str,
        value: String,
    },

    #[error("{family}: counter {name} can't be {value}")]
    Counter {
        family: &'static str,
        name: String,
        value: String,
    },

    #[error("{family}: response is not valid UTF-8")]
    Utf8 { family: &'static str },
}

/// Startup configuration failures. These never happen at scrape time.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid ClickHouse URI {uri:?}: {source}")]
    Uri {
        uri: String,
        #[source]
        source: url::ParseError,
    },

    #[error("could not read filter file {path}: {source}")]
    FilterFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse filter file {path}: {source}")]
    FilterYaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("{namespace}: filters must be a string or a list of strings")]
    FilterShape { namespace: String },

    #[error("family {family}: schema references unknown column {column:?}")]
    Schema {
        family: &'static str,
        column: &'static str,
    },

    #[error("could not register exporter metric: {0}")]
    Metric(#[from] prometheus::Error),

    #[error("could not build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("telemetry path must start with '/', must not be '/' or '/health' and must not contain ':', '*', '{{' or '}}', got {0:?}")]
    TelemetryPath(String),
}
