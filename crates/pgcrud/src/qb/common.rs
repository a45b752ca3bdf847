//! State shared by every statement builder.

use crate::entity::TableRef;
use crate::qb::param::ParamList;
use crate::qb::registry::{Registration, Registry};
use crate::qb::where_tree::{WhereNode, WhereTree};
use crate::row_data::RowData;

#[derive(Clone, Debug, Default)]
pub(crate) struct QbCore {
    pub registry: Registry,
    /// Row data per entity, at most one entry per entity.
    pub row_data: Vec<(TableRef, RowData)>,
    pub wheres: WhereTree,
    /// Call-level `RETURNING *` override.
    pub returning: Option<bool>,
    /// Placeholders already used by an enclosing statement.
    pub param_offset: usize,
}

impl QbCore {
    pub fn set_row_data(&mut self, table: &TableRef, data: RowData) {
        match self.row_data.iter_mut().find(|(t, _)| t == table) {
            Some(entry) => entry.1 = data,
            None => self.row_data.push((table.clone(), data)),
        }
    }

    pub fn row_data_for(&self, table: &TableRef) -> Option<&RowData> {
        self.row_data
            .iter()
            .find(|(t, _)| t == table)
            .map(|(_, data)| data)
    }

    /// Statement target of INSERT / UPDATE / DELETE.
    pub fn target(&self) -> Option<&Registration> {
        self.registry.first()
    }

    pub fn params(&self) -> ParamList {
        ParamList::with_offset(self.param_offset)
    }

    /// One `id=$n` predicate per entity whose row data carries a non-empty id.
    pub fn id_predicates(&self) -> Vec<WhereNode> {
        self.row_data
            .iter()
            .filter_map(|(table, data)| {
                let id_field = table.options().id_field;
                data.get(&id_field)
                    .filter(|v| !v.is_empty())
                    .map(|v| WhereNode::eq(table, &id_field, v.clone()))
            })
            .collect()
    }

    /// Call-level override, else the target entity's default.
    pub fn use_returning(&self) -> bool {
        self.returning.unwrap_or_else(|| {
            self.target()
                .is_some_and(|reg| reg.table.options().use_returning)
        })
    }

    /// ` WHERE ...`, or an empty string when there is no predicate.
    pub fn render_where(&self, params: &mut ParamList, after: &[WhereNode]) -> String {
        let sql = self
            .wheres
            .render(&self.registry, params, &self.id_predicates(), after);
        if sql.is_empty() {
            sql
        } else {
            format!(" WHERE {}", sql)
        }
    }

    pub fn returning_sql(&self) -> &'static str {
        if self.use_returning() { " RETURNING *" } else { "" }
    }
}

/// Generate the registration / filtering methods every builder shares.
///
/// The builder type must have a `core: QbCore` field. Pass `returning` to
/// also generate [`returning`](crate::qb::InsertQb::returning).
macro_rules! impl_qb_common {
    ($ty:ty, returning) => {
        impl_qb_common!($ty);

        impl $ty {
            /// Override the entity's `RETURNING *` default for this statement.
            pub fn returning(mut self, enabled: bool) -> Self {
                self.core.returning = Some(enabled);
                self
            }
        }
    };
    ($ty:ty) => {
        impl $ty {
            /// Register `table` under `alias` with a plain `JOIN`.
            pub fn table(self, table: &$crate::entity::TableRef, alias: &str) -> Self {
                self.register(table, alias, $crate::qb::JoinKind::Join, Vec::new())
            }

            /// Register `table` with a specific join keyword.
            pub fn join(
                self,
                table: &$crate::entity::TableRef,
                alias: &str,
                join: $crate::qb::JoinKind,
            ) -> Self {
                self.register(table, alias, join, Vec::new())
            }

            /// Register `table` with relations that take precedence over the
            /// entity's own for this statement.
            pub fn register(
                mut self,
                table: &$crate::entity::TableRef,
                alias: &str,
                join: $crate::qb::JoinKind,
                relations: Vec<$crate::entity::Relation>,
            ) -> Self {
                self.core.registry.register(table, alias, join, relations);
                self
            }

            /// Attach row data to a registered entity.
            pub fn row_data(mut self, table: &$crate::entity::TableRef, data: $crate::row_data::RowData) -> Self {
                self.core.set_row_data(table, data);
                self
            }

            /// Add a leaf condition.
            pub fn filter(mut self, cond: $crate::qb::Cond) -> Self {
                self.core.wheres.add_condition(cond);
                self
            }

            /// Add `ALIAS.field=$n`.
            pub fn where_eq(
                self,
                table: &$crate::entity::TableRef,
                field: impl Into<String>,
                value: impl Into<$crate::value::Value>,
            ) -> Self {
                self.filter($crate::qb::Cond::on(table, field, value))
            }

            /// Add a parenthesized group.
            pub fn where_group(mut self, group: $crate::qb::WhereGroup) -> Self {
                self.core.wheres.add_group(group);
                self
            }

            /// Add a group described as JSON. Malformed descriptors fail here.
            pub fn where_json(
                self,
                table: Option<&$crate::entity::TableRef>,
                children: &serde_json::Value,
                conjunction: $crate::qb::Conjunction,
            ) -> $crate::error::OrmResult<Self> {
                let mut group = $crate::qb::WhereGroup::from_json(children, conjunction)?;
                if let Some(table) = table {
                    group = group.table(table);
                }
                Ok(self.where_group(group))
            }

            /// Raw predicate placed before structured conditions, joined with `AND`.
            pub fn where_raw(mut self, text: impl Into<String>) -> Self {
                self.core.wheres.set_raw(text);
                self
            }

            /// Start placeholder numbering after `offset`.
            pub fn param_offset(mut self, offset: usize) -> Self {
                self.core.param_offset = offset;
                self
            }

            pub fn registry(&self) -> &$crate::qb::Registry {
                &self.core.registry
            }
        }
    };
}

pub(crate) use impl_qb_common;
