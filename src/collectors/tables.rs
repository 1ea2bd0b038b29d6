//! Row, byte and part counts from `system.tables`.

use crate::collectors::schema::{Column, Emission, FamilySchema, LabelTemplate, MetricTemplate};

pub static SCHEMA: FamilySchema = FamilySchema {
    name: "tables",
    filter_namespace: "table_exporter",
    // Views and dictionaries report NULL counters.
    query: "select database, name as table, engine, ifNull(total_rows, 0) as total_rows, ifNull(total_bytes, 0) as total_bytes, ifNull(parts, 0) as parts from system.tables {FILTER_CLAUSE}",
    base_filters: &[],
    columns: &[
        Column::label("database"),
        Column::label("table"),
        Column::label("engine"),
        Column::number("total_rows"),
        Column::number("total_bytes"),
        Column::number("parts"),
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
            LabelTemplate {
                name: "engine",
                column: "engine",
            },
        ],
        metrics: &[
            MetricTemplate {
                name: "table_rows",
                help: "number of rows of a table",
                column: "total_rows",
            },
            MetricTemplate {
                name: "table_bytes",
                help: "table compressed bytes volume",
                column: "total_bytes",
            },
            MetricTemplate {
                name: "table_parts",
                help: "number of current table partitions",
                column: "parts",
            },
        ],
    },
    enabled_by_default: true,
};
