//! Offer activity feed: one row per live offer, flattened with the athlete's
//! facts, the offering school and the athlete's own school.

use super::{ensure_unique_columns, names, Relation, RelationSet};
use crate::config::ConfigError;
use crate::safe_cast::to_numeric_or_null;
use crate::sql::expr::{cast, coalesce, count, func, lit_int, lit_str, star, table_col};
use crate::sql::{DataType, ExprExt, Query, SelectExpr, TableFactor};

const OFFER_COLUMNS: [(&str, &str); 8] = [
    ("id", "offer_id"),
    ("created_at", "offer_created_at"),
    ("source", "source"),
    ("type", "type"),
    ("coach_ask_to_remove", "coach_ask_to_remove"),
    ("ended_at", "ended_at"),
    ("walk_on", "walk_on"),
    ("offer_date", "offer_date"),
];

const ATHLETE_COLUMNS: [(&str, &str); 5] = [
    ("sport_id", "sport_id"),
    ("first_name", "first_name"),
    ("last_name", "last_name"),
    ("school_name", "ath_school"),
    ("school_id", "ath_school_id"),
];

/// School pivot columns describing the athlete's own school.
const ATHLETE_SCHOOL_COLUMNS: [(&str, &str); 6] = [
    ("address_city", "ath_school_address_city"),
    ("school_state", "ath_school_school_state"),
    ("county_id", "ath_school_county_id"),
    ("address_latitude", "ath_school_address_latitude"),
    ("address_longitude", "ath_school_address_longitude"),
    ("school_type", "ath_school__school_type"),
];

/// School fact whose value groups the per-athlete offer counts.
const GROUPING_FACT: &str = "fbs_conf_group";

impl RelationSet<'_> {
    pub fn activity_feed(&self) -> Result<Relation, ConfigError> {
        let school_columns = self.school_wide_columns();
        let mut select: Vec<SelectExpr> = OFFER_COLUMNS
            .iter()
            .map(|(c, output)| table_col("o", c).alias(output))
            .collect();
        select.extend(
            ATHLETE_COLUMNS
                .iter()
                .map(|(c, output)| table_col("a", c).alias(output)),
        );
        for (column, output) in ATHLETE_SCHOOL_COLUMNS {
            if !school_columns.iter().any(|c| c == column) {
                return Err(ConfigError::UnknownColumn {
                    relation: names::SCHOOL_FACT_WIDE.to_string(),
                    column: column.to_string(),
                });
            }
            select.push(table_col("sfw_ath", column).alias(output));
        }

        select.push(table_col("afw", "athlete_id").alias("afw_athlete_id"));
        select.extend(self.blueprint.athlete_facts.columns().iter().map(|a| {
            let value = table_col("afw", &a.name);
            let output = format!("afw_{}", a.name);
            if a.numeric {
                to_numeric_or_null(value).alias(&output)
            } else {
                value.alias(&output)
            }
        }));
        select.push(table_col("afw", "income_category").alias("afw_income_category"));
        select.extend(
            school_columns
                .iter()
                .map(|c| table_col("sfw", c).alias(&format!("sfw_{c}"))),
        );
        select.push(
            coalesce(vec![
                table_col("agg", "counts_by_group"),
                cast(lit_str("{}"), DataType::Jsonb),
            ])
            .alias("offer_counts_by_group"),
        );
        ensure_unique_columns(names::ACTIVITY_FEED, &select)?;

        let query = Query::new()
            .select(select)
            .from(self.source("offer").with_alias("o"))
            .left_join(
                self.intermediate(names::ATHLETE_FACT_WIDE).with_alias("afw"),
                table_col("afw", "athlete_id").eq(table_col("o", "athlete_id")),
            )
            .left_join(
                self.intermediate(names::SCHOOL_FACT_WIDE).with_alias("sfw"),
                table_col("sfw", "school_id").eq(table_col("o", "school_id")),
            )
            .left_join(
                self.source("athlete_with_school").with_alias("a"),
                table_col("a", "id").eq(table_col("o", "athlete_id")),
            )
            .left_join(
                self.intermediate(names::SCHOOL_FACT_WIDE).with_alias("sfw_ath"),
                table_col("sfw_ath", "school_id").eq(table_col("a", "school_id")),
            )
            .left_join(
                self.offer_counts()?,
                table_col("agg", "athlete_id").eq(table_col("o", "athlete_id")),
            )
            .filter(table_col("o", "coach_ask_to_remove").is_null());

        let school_facts = self.blueprint.school_facts.source();
        Ok(self
            .relation(names::ACTIVITY_FEED, query)
            .reads([
                "offer",
                "athlete_with_school",
                school_facts.relation.as_str(),
                names::ATHLETE_FACT_WIDE,
                names::SCHOOL_FACT_WIDE,
            ])
            .unique(["offer_id"])
            .index("sport_id")
            .index("afw_athletic_projection")
            .index("sfw_division")
            .index("sfw_conference")
            .heavy())
    }

    /// Per athlete, a JSON object of offer counts keyed by the offering
    /// school's grouping fact. Only active facts count.
    fn offer_counts(&self) -> Result<TableFactor, ConfigError> {
        let catalog = &self.blueprint.school_facts;
        let src = catalog.source();
        let grouping = catalog
            .column(GROUPING_FACT)
            .ok_or_else(|| ConfigError::UnknownColumn {
                relation: src.relation.clone(),
                column: GROUPING_FACT.to_string(),
            })?;

        let per_group = Query::new()
            .select(vec![
                SelectExpr::new(table_col("o2", "athlete_id")),
                table_col("sf", &src.value_column).alias("category"),
                count(star()).alias("cnt"),
            ])
            .from(self.source("offer").with_alias("o2"))
            .join(
                self.source(&src.relation).with_alias("sf"),
                table_col("sf", &src.entity_column)
                    .eq(table_col("o2", "school_id"))
                    .and(table_col("sf", &src.attribute_column).eq(lit_int(grouping.id)))
                    .and(table_col("sf", &src.inactive_column).is_null()),
            )
            .filter(table_col("o2", "type").eq(lit_str("offer")))
            .group_by(vec![
                table_col("o2", "athlete_id"),
                table_col("sf", &src.value_column),
            ]);

        let counts = Query::new()
            .select(vec![
                SelectExpr::new(table_col("t", "athlete_id")),
                func(
                    "JSONB_OBJECT_AGG",
                    vec![table_col("t", "category"), table_col("t", "cnt")],
                )
                .alias("counts_by_group"),
            ])
            .from(TableFactor::derived(per_group, "t"))
            .group_by(vec![table_col("t", "athlete_id")]);

        Ok(TableFactor::derived(counts, "agg"))
    }
}
