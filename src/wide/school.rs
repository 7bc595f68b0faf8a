//! School-wide pivot with directory, geography and coach contact joins.

use serde::{Deserialize, Serialize};

use super::EntityWideBuilder;
use crate::safe_cast::to_numeric_or_null;
use crate::sql::expr::{case_when, coalesce, json_text, lit_int, lit_str, table_col};
use crate::sql::{Cte, DataType, Expr, ExprExt, Query, SelectExpr, TableRef};

const LATEST_CTE: &str = "latest_school_facts";
const PIVOT_CTE: &str = "pivoted";

/// Pivoted columns replaced by the contact override.
pub const CONTACT_COLUMNS: [&str; 3] = ["hc_name", "hc_email", "hc_number"];

/// Where the active primary contact for a school lives.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ContactLookup {
    pub relation: String,
    pub entity_column: String,
    pub category_column: String,
    /// Only contacts for this category override the pivoted values.
    pub category_id: i64,
    /// Non-null when a contact row matched.
    pub presence_column: String,
    pub first_name_column: String,
    pub last_name_column: String,
    /// JSON object of contact facts.
    pub facts_column: String,
    /// Keys tried in order for the email.
    pub email_keys: Vec<String>,
    /// Keys tried in order for the phone number.
    pub phone_keys: Vec<String>,
}

impl Default for ContactLookup {
    fn default() -> Self {
        Self {
            relation: "vw_school_active_coach_with_facts".into(),
            entity_column: "school_id".into(),
            category_column: "sport_id".into(),
            category_id: 21,
            presence_column: "coach_id".into(),
            first_name_column: "first_name".into(),
            last_name_column: "last_name".into(),
            facts_column: "coach_facts_json".into(),
            email_keys: vec!["email".into(), "work_email".into()],
            phone_keys: vec!["phone".into(), "mobile".into(), "cell".into()],
        }
    }
}

/// Builds `mv_school_fact_wide`.
///
/// Output columns: `school_id`, `school_name`, the catalog columns other than
/// the contact columns (numeric ones safely cast), `hs_state`, the three
/// contact columns and `hs_county`.
#[derive(Debug, Clone)]
pub struct SchoolWideBuilder<'a> {
    wide: EntityWideBuilder<'a>,
    contact: &'a ContactLookup,
    source_schema: Option<String>,
}

impl<'a> SchoolWideBuilder<'a> {
    pub fn new(wide: EntityWideBuilder<'a>, contact: &'a ContactLookup) -> Self {
        Self {
            wide,
            contact,
            source_schema: None,
        }
    }

    /// Namespace of the directory, geography and contact relations.
    pub fn source_schema(mut self, schema: Option<&str>) -> Self {
        self.source_schema = schema.map(str::to_string);
        self
    }

    fn source(&self, table: &str, alias: &str) -> TableRef {
        TableRef::new(table)
            .in_schema(self.source_schema.as_deref())
            .with_alias(alias)
    }

    /// Names of the output columns, in order.
    pub fn output_columns(&self) -> Vec<String> {
        let entity = self.wide.catalog().source().entity_column.clone();
        std::iter::once(entity)
            .chain(std::iter::once("school_name".to_string()))
            .chain(self.pivoted_columns().map(str::to_string))
            .chain(std::iter::once("hs_state".to_string()))
            .chain(CONTACT_COLUMNS.iter().map(|c| c.to_string()))
            .chain(std::iter::once("hs_county".to_string()))
            .collect()
    }

    fn pivoted_columns(&self) -> impl Iterator<Item = &str> {
        self.wide
            .catalog()
            .columns()
            .iter()
            .map(|a| a.name.as_str())
            .filter(|name| !CONTACT_COLUMNS.contains(name))
    }

    pub fn build(&self) -> Query {
        let catalog = self.wide.catalog();
        let entity = &catalog.source().entity_column;

        let pivoted = Query::new()
            .select(vec![
                SelectExpr::new(table_col("s", entity)),
                table_col("sch", "name").alias("school_name"),
            ])
            .add_select(catalog.pivot_expression("s"))
            .from(TableRef::new(LATEST_CTE).with_alias("s"))
            .left_join(
                self.source("school", "sch"),
                table_col("sch", "id").eq(table_col("s", entity)),
            )
            .group_by(vec![table_col("s", entity), table_col("sch", "name")]);

        let mut select = vec![
            SelectExpr::new(table_col("p", entity)),
            SelectExpr::new(table_col("p", "school_name")),
        ];
        select.extend(self.pivoted_columns().map(|name| {
            if catalog.is_numeric(name) {
                to_numeric_or_null(table_col("p", name)).alias(name)
            } else {
                SelectExpr::new(table_col("p", name))
            }
        }));
        select.push(table_col("st", "name").alias("hs_state"));
        select.extend(self.contact_overrides());
        select.push(county_label().alias("hs_county"));

        let county_id = to_numeric_or_null(table_col("p", "county_id")).cast_as(DataType::BigInt);
        let c = self.contact;

        Query::new()
            .with_cte(Cte::new(LATEST_CTE, self.wide.build_latest()))
            .with_cte(Cte::new(PIVOT_CTE, pivoted))
            .select(select)
            .from(TableRef::new(PIVOT_CTE).with_alias("p"))
            .left_join(self.source("county", "c"), table_col("c", "id").eq(county_id))
            .left_join(
                self.source("state", "st"),
                table_col("st", "id").eq(table_col("c", "state_id")),
            )
            .left_join(
                self.source(&c.relation, "v"),
                table_col("v", &c.entity_column)
                    .eq(table_col("p", entity))
                    .and(table_col("v", &c.category_column).eq(lit_int(c.category_id))),
            )
    }

    /// Contact present: contact value; otherwise the pivoted value.
    fn contact_overrides(&self) -> Vec<SelectExpr> {
        let c = self.contact;
        let present = table_col("v", &c.presence_column).is_not_null();
        let facts = |keys: &[String]| -> Expr {
            coalesce(
                keys.iter()
                    .map(|key| json_text(table_col("v", &c.facts_column), key))
                    .collect(),
            )
        };
        let full_name = table_col("v", &c.first_name_column)
            .concat(lit_str(" "))
            .concat(table_col("v", &c.last_name_column));

        [
            ("hc_name", full_name),
            ("hc_email", facts(&c.email_keys)),
            ("hc_number", facts(&c.phone_keys)),
        ]
        .into_iter()
        .map(|(name, value)| {
            case_when(vec![(present.clone(), value)], Some(table_col("p", name))).alias(name)
        })
        .collect()
    }
}

/// `"County (ST)"`, `"County"` without a state abbreviation, else null.
fn county_label() -> Expr {
    let county = table_col("c", "id").is_not_null();
    case_when(
        vec![
            (
                county.clone().and(table_col("st", "abbrev").is_not_null()),
                table_col("c", "name")
                    .concat(lit_str(" ("))
                    .concat(table_col("st", "abbrev"))
                    .concat(lit_str(")")),
            ),
            (county, table_col("c", "name")),
        ],
        None,
    )
}
