//! Current values of `system.metrics`: in-flight queries, merges, open connections.

use crate::collectors::schema::{Column, Emission, FamilySchema, MetricKind};

pub static SCHEMA: FamilySchema = FamilySchema {
    name: "basic",
    filter_namespace: "basic_exporter",
    query: "select metric, value from system.metrics {FILTER_CLAUSE}",
    base_filters: &[],
    columns: &[Column::label("metric"), Column::number("value")],
    emission: Emission::KeyValue {
        kind: MetricKind::Gauge,
        key: "metric",
        value: "value",
        suffix: "",
        help: "currently processed",
    },
    enabled_by_default: true,
};
