//! Attribute catalogs: which EAV attribute ids become which wide columns.
//!
//! A catalog is the static half of a pivot. It pairs an ordered
//! `attribute id -> column name` mapping with the layout of the fact table
//! the ids live in, and knows which columns carry numbers.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;
use crate::sql::expr::{case_when, max, table_col};
use crate::sql::{ExprExt, SelectExpr};

/// Physical layout of an EAV fact table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct FactSource {
    /// Fact relation name.
    pub relation: String,
    /// Column holding the entity id.
    pub entity_column: String,
    pub attribute_column: String,
    pub value_column: String,
    /// Non-null marks a retracted fact.
    pub inactive_column: String,
    pub created_column: String,
    /// Stable row key used to break `created_column` ties.
    pub id_column: String,
}

impl Default for FactSource {
    fn default() -> Self {
        Self {
            relation: "fact".into(),
            entity_column: "entity_id".into(),
            attribute_column: "data_type_id".into(),
            value_column: "value".into(),
            inactive_column: "inactive".into(),
            created_column: "created_at".into(),
            id_column: "id".into(),
        }
    }
}

/// Which catalog columns hold numeric text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NumericRule {
    /// Only the listed columns.
    Listed(HashSet<String>),
    /// Every column except the listed passthrough columns.
    AllExcept(HashSet<String>),
}

/// One pivoted column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attribute {
    pub id: i64,
    pub name: String,
    pub numeric: bool,
}

/// Ordered attribute mapping for one fact table.
#[derive(Debug, Clone)]
pub struct AttributeCatalog {
    source: FactSource,
    attributes: Vec<Attribute>,
    by_id: HashMap<i64, usize>,
    by_name: HashMap<String, usize>,
}

impl AttributeCatalog {
    /// Build a catalog, rejecting duplicate ids or column names.
    ///
    /// Names that are not bare SQL identifiers are accepted; they are quoted
    /// wherever they are rendered.
    pub fn new(
        source: FactSource,
        mapping: impl IntoIterator<Item = (i64, String)>,
        numeric: &NumericRule,
    ) -> Result<Self, ConfigError> {
        let mut attributes = Vec::new();
        let mut by_id = HashMap::new();
        let mut by_name = HashMap::new();

        for (id, name) in mapping {
            if by_id.insert(id, attributes.len()).is_some() {
                return Err(ConfigError::DuplicateAttributeId {
                    relation: source.relation.clone(),
                    id,
                });
            }
            if by_name.insert(name.clone(), attributes.len()).is_some() {
                return Err(ConfigError::DuplicateColumn {
                    relation: source.relation.clone(),
                    column: name,
                });
            }
            let is_numeric = match numeric {
                NumericRule::Listed(cols) => cols.contains(&name),
                NumericRule::AllExcept(passthrough) => !passthrough.contains(&name),
            };
            attributes.push(Attribute {
                id,
                name,
                numeric: is_numeric,
            });
        }

        if let NumericRule::Listed(cols) = numeric {
            let mut unknown: Vec<_> = cols.iter().filter(|c| !by_name.contains_key(*c)).collect();
            unknown.sort();
            if let Some(column) = unknown.first() {
                return Err(ConfigError::UnknownColumn {
                    relation: source.relation.clone(),
                    column: column.to_string(),
                });
            }
        }

        Ok(Self {
            source,
            attributes,
            by_id,
            by_name,
        })
    }

    pub fn source(&self) -> &FactSource {
        &self.source
    }

    /// Columns in declaration order.
    pub fn columns(&self) -> &[Attribute] {
        &self.attributes
    }

    /// Attribute ids in ascending order.
    pub fn ids(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = self.attributes.iter().map(|a| a.id).collect();
        ids.sort_unstable();
        ids
    }

    pub fn get(&self, id: i64) -> Option<&Attribute> {
        self.by_id.get(&id).map(|&i| &self.attributes[i])
    }

    pub fn column(&self, name: &str) -> Option<&Attribute> {
        self.by_name.get(name).map(|&i| &self.attributes[i])
    }

    pub fn is_numeric(&self, name: &str) -> bool {
        self.column(name).is_some_and(|a| a.numeric)
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// `MAX(CASE WHEN alias.attr = id THEN alias.value END) AS name`, one per
    /// column, for use under `GROUP BY` of the entity column.
    pub fn pivot_expression(&self, alias: &str) -> Vec<SelectExpr> {
        self.attributes
            .iter()
            .map(|attr| {
                max(case_when(
                    vec![(
                        table_col(alias, &self.source.attribute_column).eq(attr.id),
                        table_col(alias, &self.source.value_column),
                    )],
                    None,
                ))
                .alias(&attr.name)
            })
            .collect()
    }
}
