//! Select projector: expands `*`, qualifies fields and applies the
//! `ALIAS__field` aliasing scheme for multi-table selects.

use crate::entity::{Entity, TableRef};
use crate::qb::registry::Registry;

/// One requested projection.
#[derive(Clone, Debug, PartialEq)]
pub enum Projection {
    /// A field (or `*`) of a registered entity.
    Field { table: TableRef, field: String },
    /// A computed expression, emitted verbatim.
    Raw(String),
}

/// Key under which `ALIAS.field` appears in a result row.
///
/// Postgres folds unquoted identifiers to lower case, so `C1__id` comes back
/// as `c1__id`.
pub fn result_field(alias: &str, field: &str) -> String {
    format!("{}__{}", alias, field).to_lowercase()
}

/// Render the projection list (without the `SELECT` keyword).
///
/// With no explicit projections every registered entity contributes `*`.
/// Aliasing applies when more than one entity is registered, unless
/// `use_select_as` says otherwise.
pub fn render_projection(
    registry: &Registry,
    selects: &[Projection],
    use_select_as: Option<bool>,
) -> String {
    let aliasing = use_select_as.unwrap_or(registry.len() > 1);
    let defaults: Vec<Projection>;
    let selects = if selects.is_empty() {
        defaults = registry
            .iter()
            .map(|reg| Projection::Field {
                table: reg.table.clone(),
                field: "*".to_string(),
            })
            .collect();
        &defaults
    } else {
        selects
    };

    let mut out: Vec<String> = Vec::new();
    for item in selects {
        match item {
            Projection::Raw(expr) => out.push(expr.clone()),
            Projection::Field { table, field } => match table.entity() {
                Entity::Named(named) if field == "*" => out.extend(
                    named
                        .fields()
                        .iter()
                        .map(|f| field_as(registry, table, f, aliasing)),
                ),
                Entity::Named(named) => {
                    if named.has_field(field) {
                        out.push(field_as(registry, table, field, aliasing));
                    }
                }
                Entity::Derived(_) if field == "*" => out.push(registry.qualify(Some(table), "*")),
                Entity::Derived(_) => out.push(field_as(registry, table, field, aliasing)),
            },
        }
    }
    out.join(", ")
}

fn field_as(registry: &Registry, table: &TableRef, field: &str, aliasing: bool) -> String {
    let qualified = registry.qualify(Some(table), field);
    let alias = registry.alias_of(table);
    if aliasing && !alias.is_empty() {
        format!("{} AS {}__{}", qualified, alias, field)
    } else {
        qualified
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{DerivedTable, NamedTable};
    use crate::qb::registry::JoinKind;

    fn table(name: &str) -> TableRef {
        TableRef::named(NamedTable::new(name, ["id", "key", "title"]))
    }

    #[test]
    fn single_table_star_has_no_as() {
        let t = table("table1");
        let mut reg = Registry::new();
        reg.register(&t, "c1", JoinKind::Join, Vec::new());
        assert_eq!(render_projection(&reg, &[], None), "C1.id, C1.key, C1.title");
    }

    #[test]
    fn multi_table_fields_are_aliased() {
        let (t1, t2) = (table("table1"), table("table2"));
        let mut reg = Registry::new();
        reg.register(&t1, "c1", JoinKind::Join, Vec::new());
        reg.register(&t2, "c2", JoinKind::Join, Vec::new());
        let selects = [
            Projection::Field { table: t1.clone(), field: "id".into() },
            Projection::Raw("count(*) AS total".into()),
        ];
        assert_eq!(
            render_projection(&reg, &selects, None),
            "C1.id AS C1__id, count(*) AS total"
        );
    }

    #[test]
    fn undeclared_named_fields_are_dropped() {
        let t = table("table1");
        let mut reg = Registry::new();
        reg.register(&t, "c1", JoinKind::Join, Vec::new());
        let selects = [
            Projection::Field { table: t.clone(), field: "missing".into() },
            Projection::Field { table: t.clone(), field: "key".into() },
        ];
        assert_eq!(render_projection(&reg, &selects, None), "C1.key");
    }

    #[test]
    fn derived_star_and_fields() {
        let t = table("table1");
        let sub = TableRef::derived(DerivedTable::new("SELECT 1 as key"));
        let mut reg = Registry::new();
        reg.register(&t, "c1", JoinKind::Join, Vec::new());
        reg.register(&sub, "c2", JoinKind::Join, Vec::new());
        let selects = [
            Projection::Field { table: sub.clone(), field: "*".into() },
            Projection::Field { table: sub.clone(), field: "key".into() },
        ];
        assert_eq!(
            render_projection(&reg, &selects, None),
            "C2.*, C2.key AS C2__key"
        );
    }

    #[test]
    fn select_as_override() {
        let t = table("table1");
        let mut reg = Registry::new();
        reg.register(&t, "c1", JoinKind::Join, Vec::new());
        let selects = [Projection::Field { table: t.clone(), field: "id".into() }];
        assert_eq!(render_projection(&reg, &selects, Some(true)), "C1.id AS C1__id");
    }

    #[test]
    fn result_field_is_lowercase() {
        assert_eq!(result_field("C1", "id"), "c1__id");
        assert_eq!(result_field("C2", "createdAt"), "c2__createdat");
    }
}
