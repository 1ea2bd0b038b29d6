//! On-disk size of every table, summed over its parts.

use crate::collectors::schema::{Column, Emission, FamilySchema, LabelTemplate, MetricTemplate};

pub static SCHEMA: FamilySchema = FamilySchema {
    name: "parts",
    filter_namespace: "parts_exporter",
    query: "select database, table, sum(bytes) as bytes, count() as parts, sum(rows) as rows from system.parts {FILTER_CLAUSE} group by database, table",
    base_filters: &[],
    columns: &[
        Column::label("database"),
        Column::label("table"),
        Column::number("bytes"),
        Column::number("parts"),
        Column::number("rows"),
    ],
    emission: Emission::Fixed {
        labels: &[
            LabelTemplate {
                name: "database",
                column: "database",
            },
            LabelTemplate {
                name: "table",
                column: "table",
            },
        ],
        metrics: &[
            MetricTemplate {
                name: "table_parts_bytes",
                help: "Table size in bytes",
                column: "bytes",
            },
            MetricTemplate {
                name: "table_parts_count",
                help: "Number of parts of the table",
                column: "parts",
            },
            MetricTemplate {
                name: "table_parts_rows",
                help: "Number of rows in the table",
                column: "rows",
            },
        ],
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
    use url::Url;

    fn exporter() -> FamilyExporter {
        let connection = Connection::new(
            Url::parse("http://localhost:8123/").unwrap(),
            None,
            true,
            DEFAULT_TIMEOUT,
        )
        .unwrap();
        FamilyExporter::new(&SCHEMA, "clickhouse", &connection, &FilterFile::new()).unwrap()
    }

    #[test]
    fn test_parts_row_yields_three_labeled_gauges() {
        let rows =
            decoder::decode(SCHEMA.name, SCHEMA.columns, b"db1 users 1024 3 500\n").unwrap();
        let families = exporter().emit(&rows).unwrap();

        let got: Vec<(&str, f64)> = families
            .iter()
            .map(|mf| (mf.name(), mf.get_metric()[0].get_gauge().value()))
            .collect();

        assert_eq!(
            got,
            vec![
                ("clickhouse_table_parts_bytes", 1024.0),
                ("clickhouse_table_parts_count", 3.0),
                ("clickhouse_table_parts_rows", 500.0),
            ]
        );

        for mf in &families {
            let labels: Vec<(&str, &str)> = mf.get_metric()[0]
                .get_label()
                .iter()
                .map(|l| (l.name(), l.value()))
                .collect();
            assert_eq!(labels, vec![("database", "db1"), ("table", "users")]);
        }
    }

    #[test]
    fn test_parts_multiple_tables_share_a_family() {
        let rows = decoder::decode(
            SCHEMA.name,
            SCHEMA.columns,
            b"db1 users 1024 3 500\ndb1 orders 2048 5 900\n",
        )
        .unwrap();
        let families = exporter().emit(&rows).unwrap();

        assert_eq!(families.len(), 3);
        assert!(families.iter().all(|mf| mf.get_metric().len() == 2));
    }

    #[test]
    fn test_parts_rejects_short_line() {
        assert!(decoder::decode(SCHEMA.name, SCHEMA.columns, b"db1 users 1024 3\n").is_err());
    }

    #[test]
    fn test_parts_metrics_per_row() {
        assert_eq!(SCHEMA.metrics_per_row(), 3);
    }
}
