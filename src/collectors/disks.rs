//! Free and total space of every configured disk.

use crate::collectors::schema::{Column, Emission, FamilySchema, LabelTemplate, MetricTemplate};

pub static SCHEMA: FamilySchema = FamilySchema {
    name: "disks",
    filter_namespace: "disk_exporter",
    query: "select name, sum(free_space) as free_space_in_bytes, sum(total_space) as total_space_in_bytes from system.disks {FILTER_CLAUSE} group by name",
    base_filters: &[],
    columns: &[
        Column::label("name"),
        Column::number("free_space_in_bytes"),
        Column::number("total_space_in_bytes"),
    ],
    emission: Emission::Fixed {
        labels: &[LabelTemplate {
            name: "disk",
            column: "name",
        }],
        metrics: &[
            MetricTemplate {
                name: "free_space_in_bytes",
                help: "Disks free_space_in_bytes capacity",
                column: "free_space_in_bytes",
            },
            MetricTemplate {
                name: "total_space_in_bytes",
                help: "Disks total_space_in_bytes capacity",
                column: "total_space_in_bytes",
            },
        ],
    },
    enabled_by_default: true,
};
