use crate::collectors::schema::FamilySchema;

#[macro_use]
mod register_macro;

/// Prefix of every exported metric.
pub const NAMESPACE: &str = "clickhouse";

// THIS IS THE ONLY PLACE YOU NEED TO ADD NEW FAMILIES ✨
// The order here is the order families are scraped in.
register_families! {
    basic,
    asynchronous,
    events,
    parts,
    disks,
    tables,
    query_log,
}

// Other modules
pub mod config;
pub mod connection;
pub mod decoder;
pub mod error;
pub mod family;
pub mod filter;
pub mod normalize;
pub mod process;
pub mod registry;
pub mod schema;
