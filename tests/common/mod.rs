#![allow(dead_code)]

use axum::{
    Router,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    routing::get,
};
use clickhouse_exporter::{
    collectors::{config::Configuration, registry::CollectorRegistry},
    exporter,
};
use prometheus::{
    Registry,
    proto::{MetricFamily, MetricType},
};
use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::{Arc, Mutex},
};
use tokio::{net::TcpListener, task::JoinHandle};

pub const BASIC: &str = "Query\t42\nMerge\t7\n";
pub const ASYNC: &str = "MemoryResident\t1073741824\njemalloc.active\t2048\n";
pub const EVENTS: &str = "Query\t1200\nSelectQuery\t1100\n";
pub const PARTS: &str = "db1\tusers\t1024\t3\t500\n";
pub const DISKS: &str = "default\t52428800\t104857600\n";
pub const TABLES: &str = "db1\tusers\tMergeTree\t500\t1024\t3\n";
pub const QUERY_LOG: &str = "default\tQueryFinish\tSelect\tdb1.users\t4096\t10\t250\t8192\t100\t0\t0\t512\t5\t4\n";

/// A canned answer for every query whose SQL mentions `table`.
#[derive(Clone, Debug)]
pub struct Answer {
    pub table: &'static str,
    pub status: StatusCode,
    pub body: String,
}

impl Answer {
    pub fn ok(table: &'static str, body: &str) -> Self {
        Self {
            table,
            status: StatusCode::OK,
            body: body.to_string(),
        }
    }

    pub fn error(table: &'static str, status: StatusCode, body: &str) -> Self {
        Self {
            table,
            status,
            body: body.to_string(),
        }
    }
}

/// Answers for all seven families, every one healthy.
pub fn healthy_answers() -> Vec<Answer> {
    vec![
        Answer::ok("system.metrics", BASIC),
        Answer::ok("system.asynchronous_metrics", ASYNC),
        Answer::ok("system.events", EVENTS),
        Answer::ok("system.parts", PARTS),
        Answer::ok("system.disks", DISKS),
        Answer::ok("system.tables", TABLES),
        Answer::ok("system.query_log", QUERY_LOG),
    ]
}

/// Replace the answer for one table.
pub fn with_answer(mut answers: Vec<Answer>, answer: Answer) -> Vec<Answer> {
    answers.retain(|a| a.table != answer.table);
    answers.push(answer);
    answers
}

#[derive(Clone, Debug, Default)]
pub struct Recorded {
    pub query: String,
    pub user: Option<String>,
    pub key: Option<String>,
}

#[derive(Clone)]
struct FakeState {
    answers: Arc<Vec<Answer>>,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

/// In-process stand-in for the ClickHouse HTTP interface.
pub struct FakeClickHouse {
    pub addr: SocketAddr,
    requests: Arc<Mutex<Vec<Recorded>>>,
    handle: JoinHandle<()>,
}

impl FakeClickHouse {
    pub async fn start(answers: Vec<Answer>) -> Self {
        let requests = Arc::new(Mutex::new(Vec::new()));

        let state = FakeState {
            answers: Arc::new(answers),
            requests: requests.clone(),
        };

        let app = Router::new().route("/", get(answer)).with_state(state);

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind fake ClickHouse");
        let addr = listener.local_addr().expect("Failed to get local addr");

        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            addr,
            requests,
            handle,
        }
    }

    pub fn uri(&self) -> String {
        format!("http://{}/", self.addr)
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().expect("requests lock").clone()
    }
}

impl Drop for FakeClickHouse {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn answer(
    State(state): State<FakeState>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> (StatusCode, String) {
    let query = params.get("query").cloned().unwrap_or_default();

    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };

    state.requests.lock().expect("requests lock").push(Recorded {
        query: query.clone(),
        user: header("x-clickhouse-user"),
        key: header("x-clickhouse-key"),
    });

    if query == "SELECT 1" {
        return (StatusCode::OK, "1\n".to_string());
    }

    state
        .answers
        .iter()
        .find(|a| query.contains(a.table))
        .map_or_else(
            || {
                (
                    StatusCode::NOT_FOUND,
                    format!("Code: 60. DB::Exception: Unknown table: {query}"),
                )
            },
            |a| (a.status, a.body.clone()),
        )
}

/// Orchestrator against `uri` with its own registry and no process metrics.
pub fn registry_for(uri: &str, families: &[&str]) -> CollectorRegistry {
    let config = Configuration::new(uri)
        .expect("valid uri")
        .with_enabled(&families.iter().map(|f| (*f).to_string()).collect::<Vec<_>>())
        .with_clickhouse_only(true);

    CollectorRegistry::new(&config, Registry::new()).expect("collector registry")
}

pub fn all_families() -> Vec<&'static str> {
    clickhouse_exporter::collectors::FAMILY_NAMES.to_vec()
}

/// Serve the exporter on an ephemeral loopback port.
pub async fn spawn_exporter(
    registry: CollectorRegistry,
    telemetry_path: &str,
) -> (SocketAddr, JoinHandle<()>) {
    let app = exporter::router(registry, telemetry_path);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind exporter");
    let addr = listener.local_addr().expect("Failed to get local addr");

    let handle = tokio::spawn(async move {
        let _ = axum::serve(listener, app.into_make_service()).await;
    });

    (addr, handle)
}

/// Value of the first sample of `name`, gauge or counter.
pub fn sample(families: &[MetricFamily], name: &str) -> Option<f64> {
    let mf = families.iter().find(|mf| mf.name() == name)?;
    let metric = mf.get_metric().first()?;

    Some(match mf.get_field_type() {
        MetricType::COUNTER => metric.get_counter().value(),
        _ => metric.get_gauge().value(),
    })
}

/// Labels of the first sample of `name`.
pub fn labels(families: &[MetricFamily], name: &str) -> Vec<(String, String)> {
    families
        .iter()
        .find(|mf| mf.name() == name)
        .and_then(|mf| mf.get_metric().first())
        .map(|m| {
            m.get_label()
                .iter()
                .map(|l| (l.name().to_string(), l.value().to_string()))
                .collect()
        })
        .unwrap_or_default()
}

/// Find an available port for testing (returns port > 1024)
pub fn get_available_port() -> u16 {
    let listener =
        std::net::TcpListener::bind("127.0.0.1:0").expect("Failed to bind to random port");
    listener
        .local_addr()
        .expect("Failed to get local addr")
        .port()
}

/// Wait until something accepts connections on `port`.
pub async fn wait_for_server(port: u16, max_attempts: u32) -> bool {
    for _ in 0..max_attempts {
        if tokio::net::TcpStream::connect(("127.0.0.1", port))
            .await
            .is_ok()
        {
            return true;
        }
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    }
    false
}

pub fn get_test_url(port: u16) -> String {
    format!("http://127.0.0.1:{port}")
}
