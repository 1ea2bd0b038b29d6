//! Declarative description of a metric family.
//!
//! Every family is one query plus a column list plus emission rules. The per-family
//! modules only hold a [`FamilySchema`] constant; parsing and emission are shared.

/// How a column is decoded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColumnKind {
    /// Kept as a trimmed string: a label value or a metric key.
    Label,
    /// Parsed as `f64`.
    Number,
}

#[derive(Clone, Copy, Debug)]
pub struct Column {
    pub name: &'static str,
    pub kind: ColumnKind,
}

impl Column {
    #[must_use]
    pub const fn label(name: &'static str) -> Self {
        Self {
            name,
            kind: ColumnKind::Label,
        }
    }

    #[must_use]
    pub const fn number(name: &'static str) -> Self {
        Self {
            name,
            kind: ColumnKind::Number,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MetricKind {
    Gauge,
    Counter,
}

/// A Prometheus label filled from a column.
#[derive(Clone, Copy, Debug)]
pub struct LabelTemplate {
    pub name: &'static str,
    pub column: &'static str,
}

/// A metric with a fixed name whose value comes from a column.
#[derive(Clone, Copy, Debug)]
pub struct MetricTemplate {
    pub name: &'static str,
    pub help: &'static str,
    pub column: &'static str,
}

/// How decoded rows turn into metrics.
#[derive(Clone, Copy, Debug)]
pub enum Emission {
    /// One unlabeled metric per row. The name is the normalized `key` column plus
    /// `suffix`, the help text is `Number of <key> <help>`.
    KeyValue {
        kind: MetricKind,
        key: &'static str,
        value: &'static str,
        suffix: &'static str,
        help: &'static str,
    },
    /// The same set of gauges for every row, labeled from the row's label columns.
    Fixed {
        labels: &'static [LabelTemplate],
        metrics: &'static [MetricTemplate],
    },
}

#[derive(Debug)]
pub struct FamilySchema {
    /// Short name used for `--collector.<name>` and in logs.
    pub name: &'static str,
    /// Key of this family's section in the filter file.
    pub filter_namespace: &'static str,
    /// SQL with a `{FILTER_CLAUSE}` placeholder.
    pub query: &'static str,
    /// Predicates always applied, ahead of the user's filters.
    pub base_filters: &'static [&'static str],
    /// Positional, exact-arity column list of the query's output.
    pub columns: &'static [Column],
    pub emission: Emission,
    pub enabled_by_default: bool,
}

impl FamilySchema {
    /// Position of a column by name.
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Number of metrics emitted for each decoded row.
    #[must_use]
    pub fn metrics_per_row(&self) -> usize {
        match self.emission {
            Emission::KeyValue { .. } => 1,
            Emission::Fixed { metrics, .. } => metrics.len(),
        }
    }
}
