use crate::config::NamespaceSettings;
use crate::sql::{col, CreateIndex, ExprExt};

/// Columns to index per source table. A `true` flag makes the index
/// partial over rows where the column is null.
const SOURCE_INDEXES: &[(&str, &[(&str, bool)])] = &[
    (
        "athlete_fact",
        &[
            ("athlete_id", false),
            ("data_type_id", false),
            ("inactive", true),
            ("created_at", false),
        ],
    ),
    (
        "school_fact",
        &[
            ("school_id", false),
            ("data_type_id", false),
            ("inactive", true),
            ("created_at", false),
        ],
    ),
    (
        "stat",
        &[
            ("athlete_id", false),
            ("data_type_id", false),
            ("season", false),
            ("game_id", true),
        ],
    ),
    (
        "athlete_school",
        &[("athlete_id", false), ("school_id", false), ("end_date", true)],
    ),
    ("athlete_honor", &[("athlete_id", false), ("award", false)]),
    (
        "offer",
        &[
            ("athlete_id", false),
            ("school_id", false),
            ("type", false),
            ("created_at", false),
        ],
    ),
    ("athlete", &[("sport_id", false)]),
    ("school", &[("name", false)]),
];

/// Supporting indexes on the source tables, named `idx_<table>_<column>`.
pub fn source_indexes(namespaces: &NamespaceSettings) -> Vec<CreateIndex> {
    SOURCE_INDEXES
        .iter()
        .flat_map(|(table, columns)| {
            columns.iter().map(move |(column, null_only)| {
                let index = CreateIndex::new(format!("idx_{table}_{column}"), *table)
                    .schema(namespaces.source())
                    .if_not_exists()
                    .column(*column);
                if *null_only {
                    index.filter(col(column).is_null())
                } else {
                    index
                }
            })
        })
        .collect()
}
