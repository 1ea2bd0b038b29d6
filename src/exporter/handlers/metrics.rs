use crate::collectors::registry::CollectorRegistry;
use axum::{
    extract::Extension,
    http::{HeaderMap, HeaderValue, StatusCode},
    response::IntoResponse,
};
use prometheus::TextEncoder;
use tracing::{debug, error};

pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Run one scrape and encode it.
///
/// Family failures still answer 200; they are reported through `clickhouse_up`.
pub async fn metrics(Extension(registry): Extension<CollectorRegistry>) -> impl IntoResponse {
    let mut headers = HeaderMap::new();
    headers.insert("content-type", HeaderValue::from_static(CONTENT_TYPE));

    let scrape = registry.collect_all().await;

    let mut buffer = String::new();

    match TextEncoder::new().encode_utf8(&scrape.families, &mut buffer) {
        Ok(()) => {
            debug!(
                families = scrape.families.len(),
                healthy = scrape.outcome.is_healthy(),
                "scrape encoded"
            );
            (StatusCode::OK, headers, buffer)
        }
        Err(e) => {
            error!("Failed to encode metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                headers,
                format!("Error encoding metrics: {e}"),
            )
        }
    }
}
