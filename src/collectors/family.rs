use crate::collectors::{
    connection::Connection,
    decoder::{self, Row},
    error::{ConfigError, DecodeError, ScrapeError},
    filter::{self, FILTER_PLACEHOLDER, FilterFile},
    normalize::normalize,
    schema::{ColumnKind, Emission, FamilySchema, MetricKind, MetricTemplate},
};
use prometheus::{Counter, Gauge, GaugeVec, Opts, core::Collector as _, proto::MetricFamily};
use std::collections::HashMap;
use tracing::{debug, info};
use url::Url;

/// Column positions resolved from a schema's names at construction, together with the
/// emission rules they serve.
#[derive(Clone, Debug)]
enum Plan {
    KeyValue {
        key: usize,
        value: usize,
        kind: MetricKind,
        suffix: &'static str,
        help: &'static str,
    },
    Fixed {
        label_names: Vec<&'static str>,
        labels: Vec<usize>,
        metrics: Vec<(usize, &'static MetricTemplate)>,
    },
}

/// One family's query, bound to a namespace and a resolved URI.
///
/// Everything here is decided at startup; a scrape only reads it.
#[derive(Clone, Debug)]
pub struct FamilyExporter {
    schema: &'static FamilySchema,
    namespace: &'static str,
    query: String,
    query_uri: Url,
    plan: Plan,
}

impl FamilyExporter {
    /// Resolve `schema` into a ready-to-run family.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Schema`] when the emission rules reference a column the
    /// schema doesn't declare, or a column of the wrong kind.
    pub fn new(
        schema: &'static FamilySchema,
        namespace: &'static str,
        connection: &Connection,
        filters: &FilterFile,
    ) -> Result<Self, ConfigError> {
        let plan = resolve_plan(schema)?;

        let clause =
            filter::build_with_base(schema.base_filters, filters.get(schema.filter_namespace));
        let query = schema.query.replacen(FILTER_PLACEHOLDER, &clause, 1);
        let query_uri = connection.query_uri(&query);

        info!(family = schema.name, %query, "family query");

        Ok(Self {
            schema,
            namespace,
            query,
            query_uri,
            plan,
        })
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.schema.name
    }

    #[must_use]
    pub fn schema(&self) -> &'static FamilySchema {
        self.schema
    }

    /// The SQL text sent upstream, filter clause included.
    #[must_use]
    pub fn query(&self) -> &str {
        &self.query
    }

    #[must_use]
    pub fn query_uri(&self) -> &Url {
        &self.query_uri
    }

    /// Fetch, decode and emit this family.
    ///
    /// # Errors
    ///
    /// Any transport, decode or metric error; nothing is emitted in that case.
    pub async fn scrape(&self, connection: &Connection) -> Result<Vec<MetricFamily>, ScrapeError> {
        let body = connection.execute(&self.query_uri).await?;
        let rows = decoder::decode(self.schema.name, self.schema.columns, &body)?;

        debug!(family = self.schema.name, rows = rows.len(), "decoded rows");

        self.emit(&rows)
    }

    /// Turn decoded rows into metric families.
    ///
    /// # Errors
    ///
    /// Returns an error if a row produces an invalid metric name or a negative counter.
    pub fn emit(&self, rows: &[Row]) -> Result<Vec<MetricFamily>, ScrapeError> {
        match &self.plan {
            Plan::KeyValue {
                key,
                value,
                kind,
                suffix,
                help,
            } => self.emit_key_value(rows, *key, *value, *kind, suffix, help),
            Plan::Fixed {
                label_names,
                labels,
                metrics,
            } => self.emit_fixed(rows, label_names, labels, metrics),
        }
    }

    fn emit_fixed(
        &self,
        rows: &[Row],
        label_names: &[&str],
        labels: &[usize],
        metrics: &[(usize, &'static MetricTemplate)],
    ) -> Result<Vec<MetricFamily>, ScrapeError> {
        let mut vecs = Vec::with_capacity(metrics.len());
        for (column, template) in metrics {
            let opts = Opts::new(template.name, template.help).namespace(self.namespace);
            vecs.push((GaugeVec::new(opts, label_names)?, *column));
        }

        for row in rows {
            let values: Vec<&str> = labels.iter().map(|&i| row.text(i).unwrap_or_default()).collect();

            for (vec, column) in &vecs {
                let value = row.number(*column).unwrap_or_default();
                vec.get_metric_with_label_values(values.as_slice())?.set(value);
            }
        }

        Ok(vecs
            .iter()
            .flat_map(|(vec, _)| vec.collect())
            .filter(|mf| !mf.get_metric().is_empty())
            .collect())
    }

    fn emit_key_value(
        &self,
        rows: &[Row],
        key: usize,
        value: usize,
        kind: MetricKind,
        suffix: &str,
        help: &str,
    ) -> Result<Vec<MetricFamily>, ScrapeError> {
        // Two keys normalizing to the same name share one metric; the last row wins.
        let mut order: Vec<String> = Vec::new();
        let mut latest: HashMap<String, (String, f64)> = HashMap::new();

        for row in rows {
            let raw_key = row.text(key).unwrap_or_default();
            let v = row.number(value).unwrap_or_default();
            let name = format!("{}{suffix}", normalize(raw_key));

            if kind == MetricKind::Counter && (v < 0.0 || v.is_nan()) {
                return Err(DecodeError::Counter {
                    family: self.schema.name,
                    name,
                    value: v.to_string(),
                }
                .into());
            }

            if latest
                .insert(name.clone(), (format!("Number of {raw_key} {help}"), v))
                .is_none()
            {
                order.push(name);
            }
        }

        let mut families = Vec::with_capacity(order.len());

        for name in order {
            let Some((help, v)) = latest.remove(&name) else {
                continue;
            };

            let opts = Opts::new(name, help).namespace(self.namespace);

            match kind {
                MetricKind::Gauge => {
                    let gauge = Gauge::with_opts(opts)?;
                    gauge.set(v);
                    families.extend(gauge.collect());
                }
                MetricKind::Counter => {
                    let counter = Counter::with_opts(opts)?;
                    counter.inc_by(v);
                    families.extend(counter.collect());
                }
            }
        }

        Ok(families)
    }
}

fn resolve_plan(schema: &FamilySchema) -> Result<Plan, ConfigError> {
    let find = |column: &'static str, kind: ColumnKind| {
        schema
            .column_index(column)
            .filter(|&i| schema.columns.get(i).is_some_and(|c| c.kind == kind))
            .ok_or(ConfigError::Schema {
                family: schema.name,
                column,
            })
    };

    match schema.emission {
        Emission::KeyValue {
            kind,
            key,
            value,
            suffix,
            help,
        } => Ok(Plan::KeyValue {
            key: find(key, ColumnKind::Label)?,
            value: find(value, ColumnKind::Number)?,
            kind,
            suffix,
            help,
        }),
        Emission::Fixed { labels, metrics } => Ok(Plan::Fixed {
            label_names: labels.iter().map(|l| l.name).collect(),
            labels: labels
                .iter()
                .map(|l| find(l.column, ColumnKind::Label))
                .collect::<Result<_, _>>()?,
            metrics: metrics
                .iter()
                .map(|m| Ok((find(m.column, ColumnKind::Number)?, m)))
                .collect::<Result<_, ConfigError>>()?,
        }),
    }
}
