//! Per-user query activity aggregated from `system.query_log`.
//!
//! Rows are grouped by user, table, status and query kind; queries touching the `system`
//! database or temporary tables are always left out, user filters narrow it further.

use crate::collectors::schema::{Column, Emission, FamilySchema, LabelTemplate, MetricTemplate};

pub static SCHEMA: FamilySchema = FamilySchema {
    name: "query_log",
    filter_namespace: "query_exporter",
    query: "SELECT user, type as status, query_kind, arrayJoin(tables) AS table, \
            sum(memory_usage) as memory_usage, count(*) AS query_num, \
            sum(query_duration_ms) as query_duration_ms, sum(read_bytes) as read_bytes, \
            sum(read_rows) as read_rows, sum(written_bytes) as written_bytes, \
            sum(written_rows) as written_rows, sum(result_bytes) as result_bytes, \
            sum(result_rows) as result_rows, sum(peak_threads_usage) as peak_threads_usage \
            FROM system.query_log {FILTER_CLAUSE} GROUP BY user, table, type, query_kind",
    base_filters: &[
        "NOT has(databases, 'system')",
        "NOT table like '%temporary%'",
    ],
    columns: &[
        Column::label("user"),
        Column::label("status"),
        Column::label("query_kind"),
        Column::label("table"),
        Column::number("memory_usage"),
        Column::number("query_num"),
        Column::number("query_duration_ms"),
        Column::number("read_bytes"),
        Column::number("read_rows"),
        Column::number("written_bytes"),
        Column::number("written_rows"),
        Column::number("result_bytes"),
        Column::number("result_rows"),
        Column::number("peak_threads_usage"),
    ],
    emission: Emission::Fixed {
        labels: &[
            LabelTemplate {
                name: "user",
                column: "user",
            },
            LabelTemplate {
                name: "table",
                column: "table",
            },
            LabelTemplate {
                name: "status",
                column: "status",
            },
            LabelTemplate {
                name: "query_kind",
                column: "query_kind",
            },
        ],
        // read_rows is decoded for arity but has no metric.
        metrics: &[
            MetricTemplate {
                name: "user_memory_usage",
                help: "user memory use in bytes",
                column: "memory_usage",
            },
            MetricTemplate {
                name: "user_query_num",
                help: "Number of Queries that user run",
                column: "query_num",
            },
            MetricTemplate {
                name: "user_query_duration_ms",
                help: "Duration of Queries in milliseconds",
                column: "query_duration_ms",
            },
            MetricTemplate {
                name: "user_read_bytes",
                help: "Volume of read rows in bytes",
                column: "read_bytes",
            },
            MetricTemplate {
                name: "user_written_bytes",
                help: "Number of bytes that user write",
                column: "written_bytes",
            },
            MetricTemplate {
                name: "user_written_rows",
                help: "Number of rows that user write",
                column: "written_rows",
            },
            MetricTemplate {
                name: "user_result_bytes",
                help: "Number of result bytes",
                column: "result_bytes",
            },
            MetricTemplate {
                name: "user_result_rows",
                help: "Number of result rows",
                column: "result_rows",
            },
            MetricTemplate {
                name: "user_peak_thread_usage",
                help: "number of threads in the peak",
                column: "peak_threads_usage",
            },
        ],
    },
    enabled_by_default: true,
};
