//! Scrape orchestration.
//!
//! A scrape runs every enabled family once, in a fixed order, and never stops early: a
//! failing family is logged and recorded, and the next one still runs. The aggregate
//! result is published as `clickhouse_up` next to whatever the healthy families produced.

use crate::collectors::{
    NAMESPACE, all_schemas,
    config::Configuration,
    connection::{Connection, redact},
    error::ConfigError,
    family::FamilyExporter,
    filter_namespaces,
    process::ProcessCollector,
};
use prometheus::{
    IntCounter, Opts, Registry,
    core::Desc,
    proto::{Gauge, Metric, MetricFamily, MetricType},
};
use std::{collections::HashMap, sync::Arc};
use tracing::{debug, error, info, info_span, warn};
use tracing_futures::Instrument as _;

/// Result of one family in one scrape.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FamilyOutcome {
    pub family: &'static str,
    pub error: Option<String>,
}

/// Aggregate result of one scrape. Not kept between scrapes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScrapeOutcome {
    pub families: Vec<FamilyOutcome>,
}

impl ScrapeOutcome {
    /// `true` iff every family executed and decoded without error.
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        self.families.iter().all(|f| f.error.is_none())
    }

    #[must_use]
    pub fn failures(&self) -> impl Iterator<Item = &FamilyOutcome> {
        self.families.iter().filter(|f| f.error.is_some())
    }
}

/// Output of one scrape: merged metric families plus how each family did.
#[derive(Debug)]
pub struct Scrape {
    pub families: Vec<MetricFamily>,
    pub outcome: ScrapeOutcome,
}

/// The collector orchestrator.
///
/// Holds nothing mutable besides the failure counter, so concurrent scrapes are safe;
/// each one issues its own sequence of upstream requests.
#[derive(Clone)]
pub struct CollectorRegistry {
    connection: Connection,
    families: Arc<[FamilyExporter]>,
    registry: Registry,
    scrape_failures: IntCounter,
    process: Option<ProcessCollector>,
}

impl CollectorRegistry {
    /// Build the connection and every enabled family, registering the exporter's own
    /// metrics with `registry`.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the HTTP client can't be built, a family schema is
    /// inconsistent or a self metric is already registered.
    pub fn new(config: &Configuration, registry: Registry) -> Result<Self, ConfigError> {
        let connection = Connection::new(
            config.uri.clone(),
            config.credentials.clone(),
            config.insecure,
            config.timeout,
        )?;

        config.filters.warn_unknown(&filter_namespaces());

        let families = all_schemas()
            .into_iter()
            .filter(|schema| config.is_enabled(schema.name))
            .map(|schema| FamilyExporter::new(schema, NAMESPACE, &connection, &config.filters))
            .collect::<Result<Vec<_>, _>>()?;

        let scrape_failures = IntCounter::with_opts(
            Opts::new(
                "exporter_scrape_failures_total",
                "Number of errors while scraping clickhouse.",
            )
            .namespace(NAMESPACE),
        )?;
        registry.register(Box::new(scrape_failures.clone()))?;

        let process = if config.clickhouse_only {
            None
        } else {
            let process = ProcessCollector::new(NAMESPACE)?;
            process.register_metrics(&registry)?;
            Some(process)
        };

        info!(
            uri = %redact(connection.base()),
            families = families.len(),
            "collector registry ready"
        );

        Ok(Self {
            connection,
            families: families.into(),
            registry,
            scrape_failures,
            process,
        })
    }

    /// Run one full scrape.
    pub async fn collect_all(&self) -> Scrape {
        let mut outcome = ScrapeOutcome::default();
        let mut families = Vec::new();

        for family in self.families.iter() {
            let span = info_span!("family.scrape", family = family.name(), otel.kind = "internal");

            match family.scrape(&self.connection).instrument(span).await {
                Ok(metrics) => {
                    debug!(family = family.name(), metrics = metrics.len(), "family scraped");
                    families.extend(metrics);
                    outcome.families.push(FamilyOutcome {
                        family: family.name(),
                        error: None,
                    });
                }
                Err(err) => {
                    error!(family = family.name(), error = %err, "error scraping clickhouse");
                    outcome.families.push(FamilyOutcome {
                        family: family.name(),
                        error: Some(err.to_string()),
                    });
                }
            }
        }

        let healthy = outcome.is_healthy();

        if !healthy {
            self.scrape_failures.inc();
        }

        if let Some(process) = &self.process {
            process.collect_stats();
        }

        families.extend(self.registry.gather());
        families.push(up(healthy));

        Scrape {
            families: merge(families),
            outcome,
        }
    }

    /// Descriptors of everything a scrape produces.
    ///
    /// There is no static list: this runs a real scrape and describes its output, so
    /// families that failed contribute nothing.
    pub async fn describe(&self) -> Vec<Desc> {
        let scrape = self.collect_all().await;

        scrape
            .families
            .iter()
            .filter_map(|mf| {
                let labels = mf
                    .get_metric()
                    .first()
                    .map(|m| m.get_label().iter().map(|l| l.name().to_string()).collect())
                    .unwrap_or_default();

                match Desc::new(
                    mf.name().to_string(),
                    mf.help().to_string(),
                    labels,
                    HashMap::new(),
                ) {
                    Ok(desc) => Some(desc),
                    Err(err) => {
                        warn!(metric = mf.name(), error = %err, "could not describe metric");
                        None
                    }
                }
            })
            .collect()
    }

    #[must_use]
    pub fn family_names(&self) -> Vec<&'static str> {
        self.families.iter().map(FamilyExporter::name).collect()
    }

    #[must_use]
    pub fn families(&self) -> &[FamilyExporter] {
        &self.families
    }

    #[must_use]
    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.families.is_empty()
    }
}

fn up(healthy: bool) -> MetricFamily {
    let mut g = Gauge::default();
    let mut m = Metric::default();
    let mut mf = MetricFamily::default();

    g.set_value(if healthy { 1.0 } else { 0.0 });
    m.set_gauge(g);

    mf.mut_metric().push(m);
    mf.set_name(format!("{NAMESPACE}_up"));
    mf.set_help("Was the last query of ClickHouse successful.".to_string());
    mf.set_field_type(MetricType::GAUGE);
    mf
}

/// Fold metric families sharing a name into one, keeping first-seen order.
///
/// The text format allows a single `# HELP`/`# TYPE` pair per name; a family whose type
/// clashes with the first one of that name is dropped. Empty families are dropped too.
#[must_use]
pub fn merge(families: Vec<MetricFamily>) -> Vec<MetricFamily> {
    let mut merged: Vec<MetricFamily> = Vec::with_capacity(families.len());
    let mut index: HashMap<String, usize> = HashMap::new();

    for mut mf in families {
        if mf.get_metric().is_empty() {
            continue;
        }

        match index.get(mf.name()) {
            Some(&i) => {
                let Some(target) = merged.get_mut(i) else {
                    continue;
                };

                if target.get_field_type() == mf.get_field_type() {
                    target.mut_metric().extend(mf.take_metric());
                } else {
                    warn!(
                        metric = mf.name(),
                        "dropping metric family with conflicting type"
                    );
                }
            }
            None => {
                index.insert(mf.name().to_string(), merged.len());
                merged.push(mf);
            }
        }
    }

    merged
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;
    use prometheus::{Counter, Gauge as GaugeMetric, GaugeVec, core::Collector as _};

    fn config() -> Configuration {
        Configuration::new("http://127.0.0.1:9/")
            .unwrap()
            .with_clickhouse_only(true)
    }

    #[test]
    fn test_new_builds_enabled_families_in_order() {
        let registry = CollectorRegistry::new(
            &config().with_enabled(&["query_log".to_string(), "basic".to_string()]),
            Registry::new(),
        )
        .unwrap();

        assert_eq!(registry.family_names(), vec!["basic", "query_log"]);
        assert!(!registry.is_empty());
    }

    #[test]
    fn test_new_with_no_families() {
        let registry =
            CollectorRegistry::new(&config().with_enabled(&[]), Registry::new()).unwrap();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_new_registers_failure_counter() {
        let prom = Registry::new();
        let _registry = CollectorRegistry::new(&config(), prom.clone()).unwrap();

        let names: Vec<String> = prom.gather().iter().map(|mf| mf.name().to_string()).collect();
        assert_eq!(names, vec!["clickhouse_exporter_scrape_failures_total"]);
    }

    #[test]
    fn test_new_registers_process_metrics() {
        let prom = Registry::new();
        let _registry =
            CollectorRegistry::new(&config().with_clickhouse_only(false), prom.clone()).unwrap();

        assert!(
            prom.gather()
                .iter()
                .any(|mf| mf.name() == "clickhouse_exporter_process_resident_memory_bytes")
        );
    }

    #[test]
    fn test_two_registries_on_one_prometheus_registry_fail() {
        let prom = Registry::new();
        let _first = CollectorRegistry::new(&config(), prom.clone()).unwrap();
        let second = CollectorRegistry::new(&config(), prom);
        assert!(matches!(second, Err(ConfigError::Metric(_))));
    }

    #[tokio::test]
    async fn test_collect_all_with_no_families_is_healthy() {
        let registry =
            CollectorRegistry::new(&config().with_enabled(&[]), Registry::new()).unwrap();
        let scrape = registry.collect_all().await;

        assert!(scrape.outcome.is_healthy());

        let up = scrape
            .families
            .iter()
            .find(|mf| mf.name() == "clickhouse_up")
            .unwrap();
        assert_eq!(up.get_metric()[0].get_gauge().value(), 1.0);
    }

    #[tokio::test]
    async fn test_collect_all_unreachable_upstream() {
        let registry = CollectorRegistry::new(
            &config().with_enabled(&["basic".to_string(), "disks".to_string()]),
            Registry::new(),
        )
        .unwrap();
        let scrape = registry.collect_all().await;

        assert!(!scrape.outcome.is_healthy());
        assert_eq!(scrape.outcome.failures().count(), 2);

        let value = |name: &str| {
            scrape
                .families
                .iter()
                .find(|mf| mf.name() == name)
                .map(|mf| {
                    let m = &mf.get_metric()[0];
                    if mf.get_field_type() == MetricType::COUNTER {
                        m.get_counter().value()
                    } else {
                        m.get_gauge().value()
                    }
                })
        };

        assert_eq!(value("clickhouse_up"), Some(0.0));
        // One failed scrape counts once, however many families failed.
        assert_eq!(value("clickhouse_exporter_scrape_failures_total"), Some(1.0));
    }

    #[test]
    fn test_merge_concatenates_same_name() {
        let a = GaugeVec::new(Opts::new("m", "help"), &["k"]).unwrap();
        a.with_label_values(&["1"]).set(1.0);
        let b = GaugeVec::new(Opts::new("m", "help"), &["k"]).unwrap();
        b.with_label_values(&["2"]).set(2.0);

        let mut all = a.collect();
        all.extend(b.collect());

        let merged = merge(all);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].get_metric().len(), 2);
    }

    #[test]
    fn test_merge_drops_conflicting_type_and_empty() {
        let gauge = GaugeMetric::with_opts(Opts::new("m", "help")).unwrap();
        let counter = Counter::with_opts(Opts::new("m", "help")).unwrap();
        let empty = GaugeVec::new(Opts::new("e", "help"), &["k"]).unwrap();

        let mut all = gauge.collect();
        all.extend(counter.collect());
        all.extend(empty.collect());

        let merged = merge(all);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].get_field_type(), MetricType::GAUGE);
    }

    #[test]
    fn test_up_gauge() {
        let mf = up(false);
        assert_eq!(mf.name(), "clickhouse_up");
        assert_eq!(mf.get_metric()[0].get_gauge().value(), 0.0);
        assert_eq!(up(true).get_metric()[0].get_gauge().value(), 1.0);
    }
}
