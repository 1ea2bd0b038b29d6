//! Cumulative event counts from `system.events`.

use crate::collectors::schema::{Column, Emission, FamilySchema, MetricKind};

pub static SCHEMA: FamilySchema = FamilySchema {
    name: "events",
    filter_namespace: "event_exporter",
    query: "select event, value from system.events {FILTER_CLAUSE}",
    base_filters: &[],
    columns: &[Column::label("event"), Column::number("value")],
    emission: Emission::KeyValue {
        kind: MetricKind::Counter,
        key: "event",
        value: "value",
        suffix: "_total",
        help: "total processed",
    },
    enabled_by_default: true,
};

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::collectors::{
        connection::{Connection, DEFAULT_TIMEOUT},
        decoder,
        family::FamilyExporter,
        filter::FilterFile,
    };
    use prometheus::proto::MetricType;
    use url::Url;

    #[test]
    fn test_events_emit_counters_with_total_suffix() {
        let connection = Connection::new(
            Url::parse("http://localhost:8123/").unwrap(),
            None,
            true,
            DEFAULT_TIMEOUT,
        )
        .unwrap();
        let exporter =
            FamilyExporter::new(&SCHEMA, "clickhouse", &connection, &FilterFile::new()).unwrap();

        let rows =
            decoder::decode(SCHEMA.name, SCHEMA.columns, b"Query 1200\nSelectQuery 1100\n")
                .unwrap();
        let families = exporter.emit(&rows).unwrap();

        assert_eq!(families.len(), 2);
        assert_eq!(families[0].name(), "clickhouse_query_total");
        assert_eq!(families[1].name(), "clickhouse_select_query_total");
        assert!(families.iter().all(|mf| mf.get_field_type() == MetricType::COUNTER));
        assert_eq!(
            families[1].get_metric()[0].get_counter().value(),
            1100.0
        );
        assert_eq!(families[0].help(), "Number of Query total processed");
    }
}
