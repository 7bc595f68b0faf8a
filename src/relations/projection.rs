//! Per-athlete projections: one row per transfer-portal page, and one row
//! per rostered athlete for colleges, high schools and junior colleges.

use super::{ensure_unique_columns, names, Relation, RelationSet};
use crate::config::ConfigError;
use crate::derived::{standard_formulas, DerivedMetricsBuilder};
use crate::safe_cast::{cast_unless_passthrough, to_numeric_or_null};
use crate::sql::expr::{case_when, coalesce, lit_bool, lit_int, lit_str, lower, table_col};
use crate::sql::{
    col, DataType, Expr, ExprExt, IndexColumn, OrderByExpr, Query, SelectExpr, TableFactor,
};

/// Portal page columns carried with an `m_` prefix.
const PAGE_COLUMNS: [&str; 11] = [
    "knack_id",
    "first_name",
    "last_name",
    "year",
    "division",
    "sport",
    "conference",
    "status",
    "link",
    "created_at",
    "designated_student_athlete",
];

/// `(column, output name)` pairs from the page details.
const DETAIL_COLUMNS: [(&str, &str); 13] = [
    ("id", "details_id"),
    ("ok_to_contact", "ok_to_contact"),
    ("is_transfer_graduate_student", "is_transfer_graduate_student"),
    ("is_recruited", "is_recruited"),
    ("commit", "details_commit"),
    ("db_update", "db_update"),
    ("expected_grad_date", "expected_grad_date"),
    ("is_four_year_transfer", "is_four_year_transfer"),
    ("athlete_survey_sent", "athlete_survey_sent"),
    ("is_aid_cancelled", "is_aid_cancelled"),
    ("comments", "comments"),
    ("link", "details_link"),
    ("email", "email"),
];

/// School pivot columns every projection carries, in order.
const SCHOOL_COLUMNS: [&str; 31] = [
    "school_type",
    "athletic_association",
    "division",
    "sub_division",
    "fbs_conf_group",
    "conference",
    "bsb_conference",
    "sb_conference",
    "wbb_conference",
    "mbb_conference",
    "msoc_conference",
    "wsoc_conference",
    "wvol_conference",
    "mlax_conference",
    "wlax_conference",
    "mten_conference",
    "wten_conference",
    "mglf_conference",
    "wglf_conference",
    "mtaf_conference",
    "wtaf_conference",
    "mswm_conference",
    "wswm_conference",
    "mwre_conference",
    "school_name",
    "juco_region",
    "juco_division",
    "school_state",
    "hs_county",
    "address_latitude",
    "address_longitude",
];

/// Athlete fact resolved against the page details instead of passed through.
const AID_COLUMN: &str = "is_receiving_athletic_aid";

/// Projection label to rank, best first. Both hyphenations are in use.
const PROJECTION_RANKS: [(&str, i64); 15] = [
    ("fbs p4 - top half", 1),
    ("fbs p4 - top-half", 1),
    ("fbs p4", 2),
    ("fbs g5 - top half", 3),
    ("fbs g5 - top-half", 3),
    ("fbs g5", 4),
    ("fcs - full scholarship", 5),
    ("fcs", 6),
    ("d2 - top half", 7),
    ("d2 - top-half", 7),
    ("d2", 8),
    ("d3 - top half", 9),
    ("d3 - top-half", 9),
    ("d3", 10),
    ("d3 walk-on", 11),
];

/// Which population a projection covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProjectionKind {
    /// One row per transfer-portal page.
    TransferPortal,
    College,
    HighSchool,
    JuniorCollege,
}

impl ProjectionKind {
    pub const ALL: [ProjectionKind; 4] = [
        ProjectionKind::TransferPortal,
        ProjectionKind::College,
        ProjectionKind::HighSchool,
        ProjectionKind::JuniorCollege,
    ];

    pub fn relation_name(self) -> &'static str {
        match self {
            ProjectionKind::TransferPortal => names::TP_ATHLETES_WIDE,
            ProjectionKind::College => names::COLLEGE_ATHLETES_WIDE,
            ProjectionKind::HighSchool => names::HS_ATHLETES_WIDE,
            ProjectionKind::JuniorCollege => names::JUCO_ATHLETES_WIDE,
        }
    }

    fn is_roster(self) -> bool {
        self != ProjectionKind::TransferPortal
    }

    /// Keeps roster athletes whose current school is of this kind.
    fn school_filter(self) -> Option<Expr> {
        let school_type = table_col("scw", "school_type");
        match self {
            ProjectionKind::TransferPortal => None,
            ProjectionKind::College => Some(school_type.in_list(vec![
                lit_str("University/College"),
                lit_str("Dropped"),
            ])),
            ProjectionKind::HighSchool => Some(lower(school_type).eq(lit_str("high school"))),
            ProjectionKind::JuniorCollege => {
                Some(lower(school_type).eq(lit_str("junior college")))
            }
        }
    }
}

impl RelationSet<'_> {
    pub fn projection(&self, kind: ProjectionKind) -> Result<Relation, ConfigError> {
        let name = kind.relation_name();
        let select = self.projection_columns(kind)?;
        ensure_unique_columns(name, &select)?;

        let athlete_key = if kind.is_roster() {
            table_col("a", "id")
        } else {
            table_col("m", "athlete_id")
        };

        let mut query = if kind.is_roster() {
            Query::new()
                .select(select)
                .from(self.source("athlete").with_alias("a"))
                .left_join_factor(TableFactor::TopPerKey {
                    table: self.source("main_tp_page"),
                    alias: "m".into(),
                    key: "athlete_id".into(),
                    correlate: table_col("a", "id"),
                    order_by: vec![
                        OrderByExpr::desc(table_col("m", "initiated_date")).nulls_last(),
                        OrderByExpr::desc(table_col("m", "id")),
                    ],
                })
        } else {
            Query::new()
                .select(select)
                .from(self.source("main_tp_page").with_alias("m"))
                .join(
                    self.source("athlete").with_alias("a"),
                    table_col("a", "id").eq(table_col("m", "athlete_id")),
                )
        };

        query = query.left_join(
            self.source("details_tp_page").with_alias("d"),
            table_col("d", "main_tp_page_id").eq(table_col("m", "id")),
        );
        if kind.is_roster() {
            query = query.left_join(
                self.current_school(),
                table_col("aths", "athlete_id").eq(table_col("a", "id")),
            );
        }
        for (relation, alias) in [
            (names::ATHLETE_FACT_WIDE, "afw"),
            (names::ATHLETE_STAT_WIDE, "asw"),
            (names::ATHLETE_HONOR_BEST, "ahb"),
            (names::ATHLETE_COMMIT, "com"),
            (names::ATHLETE_SIGN, "sig"),
        ] {
            query = query.left_join(
                self.intermediate(relation).with_alias(alias),
                table_col(alias, "athlete_id").eq(athlete_key.clone()),
            );
        }
        query = query.left_join(
            self.intermediate(names::SCHOOL_FACT_WIDE).with_alias("scw"),
            table_col("scw", "school_id").eq(school_key(kind)),
        );
        if let Some(filter) = kind.school_filter() {
            query = query.filter(filter);
        }

        let mut reads = vec![
            "main_tp_page",
            "athlete",
            "details_tp_page",
            names::ATHLETE_FACT_WIDE,
            names::ATHLETE_STAT_WIDE,
            names::ATHLETE_HONOR_BEST,
            names::ATHLETE_COMMIT,
            names::ATHLETE_SIGN,
            names::SCHOOL_FACT_WIDE,
        ];
        if kind.is_roster() {
            reads.push("athlete_school");
        }
        let relation = self
            .relation(name, query)
            .reads(reads)
            .unique([if kind.is_roster() { "athlete_id" } else { "main_tp_page_id" }])
            .index("sport_id")
            .index("school_id")
            .heavy();

        Ok(if kind.is_roster() {
            relation
        } else {
            relation.index(IndexColumn::desc("initiated_date"))
        })
    }

    /// The newest open school affiliation per athlete.
    fn current_school(&self) -> TableFactor {
        let query = Query::new()
            .distinct_on(vec![col("athlete_id")])
            .select(vec![col("athlete_id"), col("school_id")])
            .from(self.source("athlete_school"))
            .filter(col("end_date").is_null())
            .order_by(vec![
                OrderByExpr::asc(col("athlete_id")),
                OrderByExpr::desc(col("id")),
            ]);
        TableFactor::derived(query, "aths")
    }

    fn projection_columns(&self, kind: ProjectionKind) -> Result<Vec<SelectExpr>, ConfigError> {
        let mut select = if kind.is_roster() {
            vec![
                table_col("a", "id").alias("athlete_id"),
                school_key(kind).alias("school_id"),
                SelectExpr::new(table_col("a", "sport_id")),
            ]
        } else {
            vec![
                table_col("m", "id").alias("main_tp_page_id"),
                SelectExpr::new(table_col("m", "athlete_id")),
                SelectExpr::new(table_col("m", "school_id")),
                to_numeric_or_null(table_col("m", "ncaa_id")).alias("ncaa_id"),
            ]
        };

        select.push(SelectExpr::new(table_col("m", "initiated_date")));
        select.push(SelectExpr::new(table_col("m", "last_updated")));
        select.extend(
            PAGE_COLUMNS
                .iter()
                .map(|c| table_col("m", c).alias(&format!("m_{c}"))),
        );
        if !kind.is_roster() {
            select.push(SelectExpr::new(table_col("a", "sport_id")));
        }
        select.extend(
            ["first_name", "last_name", "knack_id", "created_at"]
                .iter()
                .map(|c| table_col("a", c).alias(&format!("athlete_{c}"))),
        );
        select.extend(
            DETAIL_COLUMNS
                .iter()
                .map(|(c, output)| table_col("d", c).alias(output)),
        );

        let facts = &self.blueprint.athlete_facts;
        select.extend(
            facts
                .columns()
                .iter()
                .filter(|a| a.name != AID_COLUMN)
                .map(|a| {
                    let value = table_col("afw", &a.name);
                    if a.numeric {
                        to_numeric_or_null(value).alias(&a.name)
                    } else {
                        SelectExpr::new(value)
                    }
                }),
        );
        select.push(SelectExpr::new(table_col("afw", "income_category")));

        let stats = &self.blueprint.athlete_stats;
        let passthrough: Vec<&str> = stats
            .columns()
            .iter()
            .filter(|a| !a.numeric)
            .map(|a| a.name.as_str())
            .collect();
        select.extend(stats.columns().iter().map(|a| {
            cast_unless_passthrough(table_col("asw", &a.name), &a.name, &passthrough).alias(&a.name)
        }));
        select.extend(DerivedMetricsBuilder::new(stats).add_derived("asw", &standard_formulas())?);

        select.push(SelectExpr::new(table_col("ahb", "best_honor")));
        select.push(
            athletic_projection_number(table_col("afw", "athletic_projection"))
                .alias("athletic_projection_number"),
        );

        let school_columns = self.school_wide_columns();
        for column in SCHOOL_COLUMNS {
            if !school_columns.iter().any(|c| c == column) {
                return Err(ConfigError::UnknownColumn {
                    relation: names::SCHOOL_FACT_WIDE.to_string(),
                    column: column.to_string(),
                });
            }
            select.push(SelectExpr::new(table_col("scw", column)));
        }

        select.extend([
            table_col("com", "school_id").alias("commit_school_id"),
            SelectExpr::new(table_col("com", "commit_school_name")),
            table_col("com", "created_at").alias("commit_date"),
            table_col("sig", "school_id").alias("sign_school_id"),
            SelectExpr::new(table_col("sig", "sign_school_name")),
        ]);

        let page_aid = table_col("d", AID_COLUMN);
        let aid = coalesce(vec![
            table_col("afw", AID_COLUMN),
            case_when(
                vec![
                    (page_aid.clone().eq(lit_bool(true)), lit_str("Yes")),
                    (page_aid.eq(lit_bool(false)), lit_str("None")),
                ],
                None,
            ),
        ]);
        select.push(aid.alias(AID_COLUMN));

        Ok(select)
    }
}

/// Portal pages carry the school; roster athletes fall back to their
/// current affiliation.
fn school_key(kind: ProjectionKind) -> Expr {
    if kind.is_roster() {
        coalesce(vec![table_col("m", "school_id"), table_col("aths", "school_id")])
    } else {
        table_col("m", "school_id")
    }
}

/// Ordinal of a projection label, case-insensitive; null when unrecognized.
pub fn athletic_projection_number(label: Expr) -> Expr {
    let label = lower(label);
    case_when(
        PROJECTION_RANKS
            .iter()
            .map(|(text, rank)| (label.clone().eq(lit_str(text)), lit_int(*rank)))
            .collect(),
        None,
    )
    .cast_as(DataType::Integer)
}
