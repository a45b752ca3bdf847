//! SELECT statement assembler.

use crate::entity::TableRef;
use crate::qb::common::{QbCore, impl_qb_common};
use crate::qb::join::render_from;
use crate::qb::projection::{Projection, render_projection};
use crate::qb::traits::{BuiltQuery, SqlQb};
use crate::qb::where_tree::WhereNode;

/// ORDER BY direction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_sql(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Clone, Debug)]
struct OrderItem {
    table: Option<TableRef>,
    field: String,
    direction: Option<SortDirection>,
}

/// SELECT builder over one or more registered entities.
///
/// The FROM clause is inferred from declared relations, see
/// [`JoinPlan`](crate::qb::JoinPlan). Soft-deleted rows of timestamp-enabled
/// entities are filtered out unless the entity is exempted with
/// [`SelectQb::without_timestamp`].
#[derive(Clone, Debug, Default)]
pub struct SelectQb {
    core: QbCore,
    selects: Vec<Projection>,
    orders: Vec<OrderItem>,
    group_by: Vec<(TableRef, String)>,
    limit: Option<u64>,
    offset: Option<u64>,
    use_select_as: Option<bool>,
    with_timestamp: Vec<TableRef>,
    without_timestamp: Vec<TableRef>,
}

impl_qb_common!(SelectQb);

impl SelectQb {
    pub fn new() -> Self {
        Self::default()
    }

    // ==================== Projections ====================

    /// Project one field of `table`, or all declared fields with `*`.
    pub fn select(mut self, table: &TableRef, field: impl Into<String>) -> Self {
        self.selects.push(Projection::Field {
            table: table.clone(),
            field: field.into(),
        });
        self
    }

    /// Project several fields of `table`.
    pub fn select_fields<I, S>(mut self, table: &TableRef, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for field in fields {
            self = self.select(table, field);
        }
        self
    }

    /// Project a computed expression verbatim.
    pub fn select_raw(mut self, expr: impl Into<String>) -> Self {
        self.selects.push(Projection::Raw(expr.into()));
        self
    }

    /// Force `ALIAS.field AS ALIAS__field` aliasing on or off.
    pub fn use_select_as(mut self, enabled: bool) -> Self {
        self.use_select_as = Some(enabled);
        self
    }

    // ==================== Ordering / grouping ====================

    pub fn order_by(mut self, table: &TableRef, field: impl Into<String>, direction: SortDirection) -> Self {
        self.orders.push(OrderItem {
            table: Some(table.clone()),
            field: field.into(),
            direction: Some(direction),
        });
        self
    }

    /// Append a raw ORDER BY expression, e.g. `random()`.
    pub fn order_by_raw(mut self, expr: impl Into<String>) -> Self {
        self.orders.push(OrderItem {
            table: None,
            field: expr.into(),
            direction: None,
        });
        self
    }

    pub fn group_by(mut self, table: &TableRef, field: impl Into<String>) -> Self {
        self.group_by.push((table.clone(), field.into()));
        self
    }

    /// LIMIT; zero means no limit.
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// OFFSET; zero is omitted.
    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    // ==================== Soft delete ====================

    /// Filter soft-deleted rows of exactly these entities. Entities without
    /// timestamps, and entities that are never registered on the statement,
    /// are ignored.
    pub fn with_timestamp(mut self, table: &TableRef) -> Self {
        if table.options().use_timestamp && !self.with_timestamp.contains(table) {
            self.with_timestamp.push(table.clone());
        }
        self
    }

    /// Do not filter soft-deleted rows of `table`.
    pub fn without_timestamp(mut self, table: &TableRef) -> Self {
        if !self.without_timestamp.contains(table) {
            self.without_timestamp.push(table.clone());
        }
        self
    }

    fn soft_delete_nodes(&self) -> Vec<WhereNode> {
        let tables: Vec<&TableRef> = if !self.with_timestamp.is_empty() {
            self.with_timestamp
                .iter()
                .filter(|t| self.core.registry.get(t).is_some())
                .collect()
        } else {
            self.core
                .registry
                .iter()
                .map(|reg| &reg.table)
                .filter(|t| t.as_named().is_some())
                .filter(|t| t.options().use_timestamp)
                .filter(|t| !self.without_timestamp.contains(*t))
                .collect()
        };
        tables
            .into_iter()
            .map(|t| WhereNode::is_null(t, &t.options().deleted_at_field))
            .collect()
    }

    // ==================== Build ====================

    /// Build the statement.
    pub fn build(&self) -> BuiltQuery {
        let registry = &self.core.registry;
        let mut params = self.core.params();

        let mut sql = format!(
            "SELECT {} FROM {}",
            render_projection(registry, &self.selects, self.use_select_as),
            render_from(registry)
        );
        sql.push_str(&self.core.render_where(&mut params, &self.soft_delete_nodes()));

        if !self.group_by.is_empty() {
            let fields: Vec<String> = self
                .group_by
                .iter()
                .map(|(t, f)| registry.qualify(Some(t), f))
                .collect();
            sql.push_str(" GROUP BY ");
            sql.push_str(&fields.join(", "));
        }

        if !self.orders.is_empty() {
            let orders: Vec<String> = self
                .orders
                .iter()
                .map(|o| {
                    let field = registry.qualify(o.table.as_ref(), &o.field);
                    match o.direction {
                        Some(d) => format!("{} {}", field, d.as_sql()),
                        None => field,
                    }
                })
                .collect();
            sql.push_str(" ORDER BY ");
            sql.push_str(&orders.join(", "));
        }

        if let Some(limit) = self.limit.filter(|n| *n > 0) {
            sql.push_str(&format!(" LIMIT {}", limit));
        }
        if let Some(offset) = self.offset.filter(|n| *n > 0) {
            sql.push_str(&format!(" OFFSET {}", offset));
        }

        BuiltQuery::new(sql, params.into_values())
    }
}

impl SqlQb for SelectQb {
    fn build_query(&self) -> Option<BuiltQuery> {
        Some(self.build())
    }
}
