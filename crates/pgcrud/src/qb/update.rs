//! UPDATE statement assembler.

use crate::entity::TableLike;
use crate::qb::common::{QbCore, impl_qb_common};
use crate::qb::insert::RawAssignment;
use crate::qb::traits::{BuiltQuery, SqlQb};

/// UPDATE builder for the first registered entity.
///
/// Assignments are the declared fields present in the row data (the id field
/// excluded), then raw assignments to declared fields. A non-empty id in the
/// row data becomes the first WHERE predicate.
#[derive(Clone, Debug, Default)]
pub struct UpdateQb {
    core: QbCore,
    raw_values: Vec<RawAssignment>,
}

impl_qb_common!(UpdateQb, returning);

impl UpdateQb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign the literal SQL `value` to `field`.
    pub fn raw_value(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.raw_values.push(RawAssignment::new(field, value));
        self
    }

    /// Assign with a custom operator, e.g. `("counter", "counter+1", "=")`.
    pub fn raw_value_op(
        mut self,
        field: impl Into<String>,
        value: impl Into<String>,
        operator: impl Into<String>,
    ) -> Self {
        self.raw_values
            .push(RawAssignment::with_operator(field, value, operator));
        self
    }

    pub fn raw_values(mut self, values: impl IntoIterator<Item = RawAssignment>) -> Self {
        self.raw_values.extend(values);
        self
    }

    /// Build the statement, or `None` when no assignment remains.
    ///
    /// SET values are bound before WHERE values.
    pub fn build(&self) -> Option<BuiltQuery> {
        let target = self.core.target()?;
        let named = target.table.as_named()?;
        let id_field = &named.options().id_field;
        let mut params = self.core.params();

        let mut assignments: Vec<String> = Vec::new();
        if let Some(data) = self.core.row_data_for(&target.table) {
            for field in named.fields().iter().filter(|f| *f != id_field) {
                if let Some(value) = data.get(field) {
                    assignments.push(format!("{}={}", field, params.bind(value.clone())));
                }
            }
        }
        for raw in self.raw_values.iter().filter(|r| named.has_field(&r.field)) {
            assignments.push(format!("{}{}{}", raw.field, raw.operator, raw.value));
        }
        if assignments.is_empty() {
            #[cfg(feature = "tracing")]
            tracing::trace!(target: "pgcrud.sql", table = named.name(), "nothing to update");
            return None;
        }

        let mut sql = format!(
            "UPDATE {} SET {}",
            named.render_as_from_source(&target.alias),
            assignments.join(", ")
        );
        sql.push_str(&self.core.render_where(&mut params, &[]));
        sql.push_str(self.core.returning_sql());
        Some(BuiltQuery::new(sql, params.into_values()))
    }
}

impl SqlQb for UpdateQb {
    fn build_query(&self) -> Option<BuiltQuery> {
        self.build()
    }
}
