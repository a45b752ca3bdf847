//! INSERT statement assembler.

use crate::qb::common::{QbCore, impl_qb_common};
use crate::qb::traits::{BuiltQuery, SqlQb};

/// A field assigned a literal SQL expression, e.g. `created_at = now()`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawAssignment {
    pub field: String,
    pub value: String,
    pub operator: String,
}

impl RawAssignment {
    pub fn new(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
            operator: "=".to_string(),
        }
    }

    /// Assignment with a custom operator, rendered as `field<operator><value>`.
    pub fn with_operator(field: impl Into<String>, value: impl Into<String>, operator: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
            operator: operator.into(),
        }
    }
}

/// INSERT builder for the first registered entity.
///
/// Only declared fields present in the entity's row data are inserted, in
/// declaration order, followed by raw assignments to declared fields.
#[derive(Clone, Debug, Default)]
pub struct InsertQb {
    core: QbCore,
    raw_values: Vec<RawAssignment>,
}

impl_qb_common!(InsertQb, returning);

impl InsertQb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `field` as the literal SQL `value`.
    pub fn raw_value(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.raw_values.push(RawAssignment::new(field, value));
        self
    }

    pub fn raw_values(mut self, values: impl IntoIterator<Item = RawAssignment>) -> Self {
        self.raw_values.extend(values);
        self
    }

    /// Build the statement, or `None` when there is nothing to insert.
    pub fn build(&self) -> Option<BuiltQuery> {
        let target = self.core.target()?;
        let named = target.table.as_named()?;
        let data = self.core.row_data_for(&target.table)?;
        let mut params = self.core.params();

        let mut fields: Vec<&str> = Vec::new();
        let mut values: Vec<String> = Vec::new();
        for field in named.fields() {
            if let Some(value) = data.get(field) {
                fields.push(field);
                values.push(params.bind(value.clone()));
            }
        }
        if fields.is_empty() {
            #[cfg(feature = "tracing")]
            tracing::trace!(target: "pgcrud.sql", table = named.name(), "nothing to insert");
            return None;
        }
        for raw in self.raw_values.iter().filter(|r| named.has_field(&r.field)) {
            fields.push(&raw.field);
            values.push(raw.value.clone());
        }

        let table = if target.alias.is_empty() {
            named.name().to_string()
        } else {
            format!("{} AS {}", named.name(), target.alias)
        };
        let sql = format!(
            "INSERT INTO {}({}) VALUES({}){}",
            table,
            fields.join(","),
            values.join(","),
            self.core.returning_sql()
        );
        Some(BuiltQuery::new(sql, params.into_values()))
    }
}

impl SqlQb for InsertQb {
    fn build_query(&self) -> Option<BuiltQuery> {
        self.build()
    }
}
