use crate::{
    cli::telemetry::shutdown_tracer,
    collectors::{config::Configuration, registry::CollectorRegistry},
};
use anyhow::{Context, Result, anyhow};
use axum::{
    Extension, Router,
    body::Body,
    http::{HeaderName, HeaderValue, Request},
    middleware::{Next, from_fn},
    response::Response,
    routing::get,
};
use opentelemetry::global;
use opentelemetry::trace::{TraceContextExt, TraceId};
use opentelemetry_http::HeaderExtractor;
use prometheus::Registry;
use std::{net::IpAddr, time::Duration};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::PropagateRequestIdLayer, set_header::SetRequestHeaderLayer, trace::TraceLayer,
};
use tracing::{Span, error, info, info_span};
use tracing_opentelemetry::OpenTelemetrySpanExt;
use ulid::Ulid;

mod handlers;
mod shutdown;

pub use handlers::TelemetryPath;

pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = if let Some(hash) = built_info::GIT_COMMIT_HASH {
    hash
} else {
    ":-("
};

/// Build the orchestrator and serve it until SIGINT/SIGTERM.
///
/// # Errors
///
/// Returns an error if the collectors can't be built or the listener can't bind.
pub async fn new(
    port: u16,
    listen: Option<String>,
    telemetry_path: String,
    config: Configuration,
) -> Result<()> {
    let registry = CollectorRegistry::new(&config, Registry::new())
        .context("Failed to build collectors")?;

    let families = registry.family_names();

    let app = router(registry, &telemetry_path);

    let (listener, bind_addr) = bind(port, listen.as_deref()).await?;

    println!(
        "{} {} - Listening on {bind_addr}{telemetry_path}\n\nEnabled families:\n{}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        format_list(&families),
    );

    if let Err(e) = axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown::shutdown_signal_handler())
        .await
    {
        error!(error=%e, "server error");
    }

    info!("shutting down");

    shutdown_tracer();

    Ok(())
}

/// Routes: the landing page, the scrape endpoint and `/health`.
pub fn router(registry: CollectorRegistry, telemetry_path: &str) -> Router {
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(make_span)
        .on_response(on_response);

    Router::new()
        .route("/", get(handlers::index))
        .route(telemetry_path, get(handlers::metrics))
        .route("/health", get(handlers::health).options(handlers::health))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(trace_layer)
                .layer(from_fn(add_trace_headers))
                .layer(Extension(registry))
                .layer(Extension(TelemetryPath(telemetry_path.to_string()))),
        )
}

/// Bind `listen:port`, or `[::]` falling back to `0.0.0.0` when no address is given.
async fn bind(port: u16, listen: Option<&str>) -> Result<(TcpListener, String)> {
    match listen {
        Some(addr) => {
            let ip = addr.parse::<IpAddr>().map_err(|_| {
                anyhow!(
                    "Invalid IP address: '{addr}'. Expected IPv4 (e.g., 0.0.0.0, 127.0.0.1) or IPv6 (e.g., ::, ::1)"
                )
            })?;

            let display = if ip.is_ipv6() {
                format!("[{ip}]:{port}")
            } else {
                format!("{ip}:{port}")
            };

            let listener = TcpListener::bind((ip, port))
                .await
                .with_context(|| format!("Failed to bind to {display}"))?;

            Ok((listener, display))
        }
        None => match TcpListener::bind(format!("[::]:{port}")).await {
            Ok(l) => Ok((l, format!("[::]:{port}"))),
            Err(_) => {
                let listener = TcpListener::bind(format!("0.0.0.0:{port}"))
                    .await
                    .with_context(|| format!("Failed to bind to 0.0.0.0:{port}"))?;
                Ok((listener, format!("0.0.0.0:{port}")))
            }
        },
    }
}

// Format a list of items with a leading dash and indentation for the start up message
fn format_list<T: std::fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(|i| format!("  - {i}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn make_span(request: &Request<Body>) -> Span {
    let parent_cx =
        global::get_text_map_propagator(|prop| prop.extract(&HeaderExtractor(request.headers())));

    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("none");

    let user_agent = request
        .headers()
        .get("user-agent")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown");

    let span = info_span!(
        "http.server.request",
        otel.kind = "server",
        otel.status_code = tracing::field::Empty,
        http.method = request.method().as_str(),
        http.route = request.uri().path(),
        http.target = request.uri().to_string(),
        http.scheme = request.uri().scheme_str().unwrap_or("http"),
        http.user_agent = user_agent,
        request_id = request_id,
    );

    let _ = span.set_parent(parent_cx);

    span
}

fn on_response<B>(response: &axum::http::Response<B>, latency: Duration, span: &Span) {
    if response.status().is_server_error() {
        span.record("otel.status_code", "ERROR");
    } else {
        span.record("otel.status_code", "OK");
    }

    let elapsed_ms = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
    let trace_id = span.context().span().span_context().trace_id();

    if trace_id == TraceId::INVALID {
        info!(
            parent: span,
            status = response.status().as_u16(),
            elapsed_ms,
            "request completed"
        );
    } else {
        info!(
            parent: span,
            status = response.status().as_u16(),
            elapsed_ms,
            trace_id = %trace_id,
            "request completed"
        );
    }
}

async fn add_trace_headers(req: Request<Body>, next: Next) -> Response {
    let mut res = next.run(req).await;

    let cx = Span::current().context();

    // Clone the SpanContext to avoid borrowing a temporary
    let span_context = cx.span().span_context().clone();

    if span_context.is_valid()
        && let Ok(val) = HeaderValue::from_str(&span_context.trace_id().to_string())
    {
        res.headers_mut()
            .insert(HeaderName::from_static("x-trace-id"), val);
    }

    res
}
