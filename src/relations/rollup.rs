//! Per-athlete rollups: best honor and latest commitment and signing.

use super::{names, Relation, RelationSet};
use crate::sql::expr::{case_when, lit_int, lit_str, table_col};
use crate::sql::{col, Cte, ExprExt, OrderByExpr, Query, SelectExpr, TableRef};

/// Honors in rank order; the first one an athlete holds is their best.
const HONOR_RANKING: [&str; 4] = [
    "All American",
    "All Region",
    "All Conference",
    "Rookie All Conference",
];

impl RelationSet<'_> {
    pub fn honor_best(&self) -> Relation {
        let rank = case_when(
            HONOR_RANKING
                .iter()
                .zip(1..)
                .map(|(award, rank)| (col("award").eq(lit_str(award)), lit_int(rank)))
                .collect(),
            Some(lit_int(99)),
        );
        let ranked = Query::new()
            .select(vec![
                SelectExpr::new(col("athlete_id")),
                SelectExpr::new(col("award")),
                rank.alias("honor_rank"),
            ])
            .from(self.source("athlete_honor"))
            .filter(col("award").in_list(HONOR_RANKING.iter().map(|a| lit_str(a)).collect()));

        let best = Query::new()
            .with_cte(Cte::new("ranked_honors", ranked))
            .distinct_on(vec![col("athlete_id")])
            .select(vec![
                SelectExpr::new(col("athlete_id")),
                col("award").alias("best_honor"),
            ])
            .from(TableRef::new("ranked_honors"))
            .order_by(vec![
                OrderByExpr::asc(col("athlete_id")),
                OrderByExpr::asc(col("honor_rank")),
            ]);

        self.relation(names::ATHLETE_HONOR_BEST, best)
            .reads(["athlete_honor"])
            .unique(["athlete_id"])
            .index("best_honor")
    }

    pub fn commit(&self) -> Relation {
        self.latest_offer(names::ATHLETE_COMMIT, "commit", "commit_school_name")
    }

    pub fn sign(&self) -> Relation {
        self.latest_offer(names::ATHLETE_SIGN, "signed", "sign_school_name")
    }

    /// Newest offer of one type per athlete, with the school's name.
    fn latest_offer(&self, name: &str, offer_type: &str, school_name: &str) -> Relation {
        let latest = Query::new()
            .distinct_on(vec![col("athlete_id")])
            .select(vec![col("athlete_id"), col("school_id"), col("created_at")])
            .from(self.source("offer"))
            .filter(col("type").eq(lit_str(offer_type)))
            .order_by(vec![
                OrderByExpr::asc(col("athlete_id")),
                OrderByExpr::desc(col("created_at")).nulls_last(),
                OrderByExpr::desc(col("id")),
            ]);

        let query = Query::new()
            .with_cte(Cte::new("latest", latest))
            .select(vec![
                SelectExpr::new(table_col("lo", "athlete_id")),
                SelectExpr::new(table_col("lo", "school_id")),
                SelectExpr::new(table_col("lo", "created_at")),
                table_col("s", "name").alias(school_name),
            ])
            .from(TableRef::new("latest").with_alias("lo"))
            .join(
                self.source("school").with_alias("s"),
                table_col("s", "id").eq(table_col("lo", "school_id")),
            );

        self.relation(name, query)
            .reads(["offer", "school"])
            .unique(["athlete_id"])
            .index("school_id")
            .index("created_at")
    }
}
