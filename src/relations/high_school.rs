use super::names;
use crate::config::NamespaceSettings;
use crate::sql::expr::{lit_str, star};
use crate::sql::{col, CreateView, DropView, ExprExt, Query, TableRef};

/// Ungated view of high schools plus junior colleges that field football.
///
/// Dropped and recreated rather than replaced, since its column list
/// follows the school pivot.
pub fn high_school_view(namespaces: &NamespaceSettings) -> (DropView, CreateView) {
    let school_type = || col("school_type");
    let query = Query::new()
        .select(vec![star()])
        .from(TableRef::new(names::SCHOOL_FACT_WIDE).in_schema(namespaces.intermediate()))
        .filter(
            school_type().eq(lit_str("High School")).or(school_type()
                .eq(lit_str("Junior College"))
                .and(col("juco_has_football").eq(lit_str("Yes")))),
        );

    let drop = DropView::new(names::HIGH_SCHOOL_VIEW)
        .schema(namespaces.published())
        .if_exists();
    let create = CreateView::new(names::HIGH_SCHOOL_VIEW, query).schema(namespaces.published());
    (drop, create)
}
