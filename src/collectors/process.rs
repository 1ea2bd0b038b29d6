//! Resource usage of the exporter process itself.
//!
//! Exposed as `clickhouse_exporter_process_*` unless `--clickhouse-only` is set, so a
//! leaking or CPU-bound exporter shows up next to the database it watches.

use prometheus::{Counter, Gauge, IntGauge, Opts, Registry};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};
use sysinfo::{Pid, ProcessesToUpdate, System};
use tracing::{debug, warn};

const SUBSYSTEM: &str = "exporter_process";

#[derive(Clone)]
pub struct ProcessCollector {
    cpu_seconds_total: Counter,
    resident_memory_bytes: IntGauge,
    virtual_memory_bytes: IntGauge,
    open_fds: IntGauge,
    threads: IntGauge,
    start_time_seconds: Gauge,

    state: Arc<Mutex<CollectorState>>,
    pid: Pid,
}

struct CollectorState {
    system: System,
    /// Accumulated CPU time at the previous collection, in milliseconds.
    last_cpu_ms: Option<u64>,
}

impl ProcessCollector {
    /// Build the process metrics under `namespace`.
    ///
    /// # Errors
    ///
    /// Returns an error if a metric can't be created.
    pub fn new(namespace: &str) -> Result<Self, prometheus::Error> {
        let opts = |name: &str, help: &str| {
            Opts::new(name, help)
                .namespace(namespace)
                .subsystem(SUBSYSTEM)
        };

        let cpu_seconds_total = Counter::with_opts(opts(
            "cpu_seconds_total",
            "Total user and system CPU time spent in seconds",
        ))?;
        let resident_memory_bytes = IntGauge::with_opts(opts(
            "resident_memory_bytes",
            "Resident memory size in bytes",
        ))?;
        let virtual_memory_bytes = IntGauge::with_opts(opts(
            "virtual_memory_bytes",
            "Virtual memory size in bytes",
        ))?;
        let open_fds = IntGauge::with_opts(opts("open_fds", "Number of open file descriptors"))?;
        let threads = IntGauge::with_opts(opts("threads", "Number of OS threads in the process"))?;
        let start_time_seconds = Gauge::with_opts(opts(
            "start_time_seconds",
            "Start time of the process since unix epoch in seconds",
        ))?;

        start_time_seconds.set(
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs_f64(),
        );

        Ok(Self {
            cpu_seconds_total,
            resident_memory_bytes,
            virtual_memory_bytes,
            open_fds,
            threads,
            start_time_seconds,
            state: Arc::new(Mutex::new(CollectorState {
                system: System::new(),
                last_cpu_ms: None,
            })),
            pid: Pid::from_u32(std::process::id()),
        })
    }

    /// Register every process metric with `registry`.
    ///
    /// # Errors
    ///
    /// Returns an error if a metric with the same name is already registered.
    pub fn register_metrics(&self, registry: &Registry) -> Result<(), prometheus::Error> {
        registry.register(Box::new(self.cpu_seconds_total.clone()))?;
        registry.register(Box::new(self.resident_memory_bytes.clone()))?;
        registry.register(Box::new(self.virtual_memory_bytes.clone()))?;
        registry.register(Box::new(self.open_fds.clone()))?;
        registry.register(Box::new(self.threads.clone()))?;
        registry.register(Box::new(self.start_time_seconds.clone()))?;
        Ok(())
    }

    /// Refresh the process metrics from the OS.
    #[allow(clippy::cast_possible_wrap, clippy::cast_precision_loss)]
    pub fn collect_stats(&self) {
        let mut state = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("process collector state was poisoned, recovering");
                poisoned.into_inner()
            }
        };

        state
            .system
            .refresh_processes(ProcessesToUpdate::Some(&[self.pid]), true);

        let Some(process) = state.system.process(self.pid) else {
            warn!(pid = %self.pid, "own process not found");
            return;
        };

        let rss = process.memory();
        let vsz = process.virtual_memory();
        let cpu_ms = process.accumulated_cpu_time();

        self.resident_memory_bytes.set(rss as i64);
        self.virtual_memory_bytes.set(vsz as i64);

        // Counters only move forward; the first reading is the baseline.
        if let Some(last) = state.last_cpu_ms {
            let delta = cpu_ms.saturating_sub(last);
            if delta > 0 {
                self.cpu_seconds_total.inc_by(delta as f64 / 1000.0);
            }
        } else {
            self.cpu_seconds_total.inc_by(cpu_ms as f64 / 1000.0);
        }
        state.last_cpu_ms = Some(cpu_ms);

        #[cfg(target_os = "linux")]
        {
            if let Ok(entries) = std::fs::read_dir(format!("/proc/{}/task", self.pid)) {
                self.threads.set(entries.count() as i64);
            }
            if let Ok(entries) = std::fs::read_dir(format!("/proc/{}/fd", self.pid)) {
                self.open_fds.set(entries.count() as i64);
            }
        }

        #[cfg(not(target_os = "linux"))]
        {
            self.threads.set(1);
        }

        debug!(
            rss_mb = rss / 1024 / 1024,
            vsz_mb = vsz / 1024 / 1024,
            cpu_seconds_total = self.cpu_seconds_total.get(),
            threads = self.threads.get(),
            fds = self.open_fds.get(),
            "collected process metrics"
        );
    }
}
