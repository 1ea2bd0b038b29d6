use crate::{collectors::registry::CollectorRegistry, exporter::GIT_COMMIT_HASH};
use axum::{
    body::Body,
    extract::Extension,
    http::{HeaderMap, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

#[derive(Serialize, Deserialize, Debug)]
pub struct Health {
    commit: String,
    name: String,
    version: String,
    clickhouse: String,
}

async fn check_clickhouse_health(registry: &CollectorRegistry) -> Result<(), StatusCode> {
    registry.connection().ping().await.map_err(|error| {
        error!("Failed to ping ClickHouse: {}", error);
        StatusCode::SERVICE_UNAVAILABLE
    })
}

fn create_health_response(ping: &Result<(), StatusCode>) -> Health {
    Health {
        commit: GIT_COMMIT_HASH.to_string(),
        name: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        clickhouse: if ping.is_ok() { "ok" } else { "error" }.to_string(),
    }
}

// Only GET gets a body; OPTIONS just returns the headers
fn create_response_body(method: &Method, health: &Health) -> Body {
    if method == Method::GET {
        Json(health).into_response().into_body()
    } else {
        Body::empty()
    }
}

// X-App: name:version:short-hash
fn create_app_headers(health: &Health) -> HeaderMap {
    let short_hash = health.commit.get(..7).unwrap_or_default();

    let header_value = format!("{}:{}:{}", health.name, health.version, short_hash);

    let mut headers = HeaderMap::new();

    match header_value.parse::<HeaderValue>() {
        Ok(value) => {
            debug!("X-App header: {:?}", value);
            headers.insert("X-App", value);
        }
        Err(err) => {
            debug!("Failed to parse X-App header: {}", err);
        }
    }

    headers
}

pub async fn health(
    method: Method,
    Extension(registry): Extension<CollectorRegistry>,
) -> impl IntoResponse {
    let ping = check_clickhouse_health(&registry).await;
    let health = create_health_response(&ping);
    let body = create_response_body(&method, &health);
    let headers = create_app_headers(&health);

    match ping {
        Ok(()) => (StatusCode::OK, headers, body),
        Err(status_code) => (status_code, headers, body),
    }
}
