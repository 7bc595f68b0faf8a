use crate::sql::{col, lit_str, DataType, Expr, ExprExt};

use super::{AccessRules, Category, ThresholdTier};

/// Builds the per-row "needs redaction" condition for a category and tier.
///
/// `whitelist_field IN (whitelist) AND CAST(threshold_field AS INTEGER) > n`,
/// dropping the threshold clause for threshold-exempt categories. Columns
/// are unqualified; the predicate is evaluated inside the view's base CTE.
#[derive(Debug, Clone, Copy)]
pub struct RedactionPredicateCompiler<'a> {
    rules: &'a AccessRules,
}

impl<'a> RedactionPredicateCompiler<'a> {
    pub fn new(rules: &'a AccessRules) -> Self {
        Self { rules }
    }

    pub fn compile(&self, category: &Category, tier: ThresholdTier) -> Expr {
        let membership = col(&category.whitelist_field).in_list(
            self.rules
                .whitelist
                .iter()
                .map(|group| lit_str(group))
                .collect(),
        );
        if category.threshold_exempt {
            return membership;
        }
        let threshold = self.rules.thresholds.get(tier);
        membership.and(
            col(&threshold.field)
                .cast_as(DataType::Integer)
                .gt(threshold.above),
        )
    }
}
