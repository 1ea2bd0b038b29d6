//! Background-computed values of `system.asynchronous_metrics`.

use crate::collectors::schema::{Column, Emission, FamilySchema, MetricKind};

pub static SCHEMA: FamilySchema = FamilySchema {
    name: "asynchronous",
    filter_namespace: "async_exporter",
    // Some metric names carry dashes, which are not valid in metric names.
    query: "select replaceRegexpAll(toString(metric), '-', '_') AS metric, value from system.asynchronous_metrics {FILTER_CLAUSE}",
    base_filters: &[],
    columns: &[Column::label("metric"), Column::number("value")],
    emission: Emission::KeyValue {
        kind: MetricKind::Gauge,
        key: "metric",
        value: "value",
        suffix: "",
        help: "async processed",
    },
    enabled_by_default: true,
};
