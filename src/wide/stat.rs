//! Season-aggregate stat pivot.
//!
//! Each athlete contributes the stats of one preferred season, chosen from
//! the season selector by `(category, is_sub_league)`. An athlete is in the
//! sub-league when their current school is a junior college. Only season
//! aggregate rows (no game reference) are pivoted.

use serde::{Deserialize, Serialize};

use super::EntityWideBuilder;
use crate::sql::expr::{exists, lit_int, lit_str, lower, table_col};
use crate::sql::{Cte, ExprExt, Query, TableRef};

const FLAG_CTE: &str = "juco_flag";
const SEASON_CTE: &str = "season_pref";
const STAT_CTE: &str = "latest_stat";

/// The season selector and the affiliation lookup behind the sub-league flag.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct SeasonPreference {
    /// `(category, is_sub_league) -> season` table.
    pub selector_relation: String,
    pub category_column: String,
    pub sub_league_column: String,
    pub season_column: String,
    /// Entity table holding the category.
    pub entity_relation: String,
    /// Entity-to-school affiliations; open rows have no end date.
    pub affiliation_relation: String,
    /// School type, compared case-insensitively.
    pub sub_league_school_type: String,
    /// Non-null on per-game stat rows.
    pub game_column: String,
}

impl Default for SeasonPreference {
    fn default() -> Self {
        Self {
            selector_relation: "sport_season_selector".into(),
            category_column: "sport_id".into(),
            sub_league_column: "is_juco".into(),
            season_column: "season".into(),
            entity_relation: "athlete".into(),
            affiliation_relation: "athlete_school".into(),
            sub_league_school_type: "junior college".into(),
            game_column: "game_id".into(),
        }
    }
}

/// Builds `mv_athlete_stat_wide`.
#[derive(Debug, Clone)]
pub struct StatWideBuilder<'a> {
    wide: EntityWideBuilder<'a>,
    season: &'a SeasonPreference,
    school_wide: TableRef,
    source_schema: Option<String>,
}

impl<'a> StatWideBuilder<'a> {
    /// `school_wide` is the built school pivot, read for the school type.
    pub fn new(wide: EntityWideBuilder<'a>, season: &'a SeasonPreference, school_wide: TableRef) -> Self {
        Self {
            wide,
            season,
            school_wide,
            source_schema: None,
        }
    }

    pub fn source_schema(mut self, schema: Option<&str>) -> Self {
        self.source_schema = schema.map(str::to_string);
        self
    }

    fn source(&self, table: &str, alias: &str) -> TableRef {
        TableRef::new(table)
            .in_schema(self.source_schema.as_deref())
            .with_alias(alias)
    }

    pub fn build(&self) -> Query {
        let sp = self.season;
        let src = self.wide.catalog().source();
        let entity = &src.entity_column;

        let current_sub_league = Query::new()
            .select(vec![lit_int(1)])
            .from(self.source(&sp.affiliation_relation, "aths"))
            .join(
                self.school_wide.clone().with_alias("scw"),
                table_col("scw", "school_id").eq(table_col("aths", "school_id")),
            )
            .filter(table_col("aths", entity).eq(table_col("a", "id")))
            .filter(table_col("aths", "end_date").is_null())
            .filter(lower(table_col("scw", "school_type")).eq(lit_str(&sp.sub_league_school_type)));

        let flag = Query::new()
            .select(vec![
                table_col("a", "id").alias(entity),
                table_col("a", &sp.category_column).alias(&sp.category_column),
                exists(current_sub_league).alias(&sp.sub_league_column),
            ])
            .from(self.source(&sp.entity_relation, "a"));

        let preferred = Query::new()
            .select(vec![
                table_col("j", entity),
                table_col("sss", &sp.season_column),
            ])
            .from(TableRef::new(FLAG_CTE).with_alias("j"))
            .join(
                self.source(&sp.selector_relation, "sss"),
                table_col("sss", &sp.category_column)
                    .eq(table_col("j", &sp.category_column))
                    .and(table_col("sss", &sp.sub_league_column).eq(table_col("j", &sp.sub_league_column))),
            );

        let ids = self.wide.catalog().ids().into_iter().map(lit_int).collect();
        let stats = Query::new()
            .select(vec![
                table_col("s", entity),
                table_col("s", &src.attribute_column),
                table_col("s", &src.value_column),
            ])
            .from(self.source(&src.relation, "s"))
            .join(
                TableRef::new(SEASON_CTE).with_alias("sp"),
                table_col("sp", entity)
                    .eq(table_col("s", entity))
                    .and(table_col("sp", &sp.season_column).eq(table_col("s", &sp.season_column))),
            )
            .filter(table_col("s", &sp.game_column).is_null())
            .filter(table_col("s", &src.attribute_column).in_list(ids));

        self.wide
            .build_wide(TableRef::new(STAT_CTE))
            .with_cte(Cte::new(FLAG_CTE, flag))
            .with_cte(Cte::new(SEASON_CTE, preferred))
            .with_cte(Cte::new(STAT_CTE, stats))
    }
}
