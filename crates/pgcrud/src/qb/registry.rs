//! Ordered registry of the entities taking part in one statement.

use crate::entity::{Relation, TableLike, TableRef};

/// Keyword used to attach an entity to a join chain.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum JoinKind {
    /// Plain `JOIN`
    #[default]
    Join,
    Inner,
    Left,
    Right,
    Full,
    /// Any other keyword, emitted verbatim (`LEFT JOIN LATERAL`, lowercase `join`).
    Custom(String),
}

impl JoinKind {
    pub fn as_sql(&self) -> &str {
        match self {
            JoinKind::Join => "JOIN",
            JoinKind::Inner => "INNER JOIN",
            JoinKind::Left => "LEFT JOIN",
            JoinKind::Right => "RIGHT JOIN",
            JoinKind::Full => "FULL OUTER JOIN",
            JoinKind::Custom(kw) => kw,
        }
    }
}

/// An entity bound to an alias and join kind within one builder.
#[derive(Clone, Debug)]
pub struct Registration {
    pub table: TableRef,
    /// Uppercased alias, empty when the entity is used unaliased.
    pub alias: String,
    pub join: JoinKind,
    /// Registration-scoped relations, tried before the entity's own.
    pub relations: Vec<Relation>,
}

impl Registration {
    /// Prefix used for qualified fields in ON clauses: alias, else table name.
    pub fn qualifier(&self) -> &str {
        if !self.alias.is_empty() {
            &self.alias
        } else {
            self.table.name().unwrap_or("")
        }
    }

    /// `QUALIFIER.field`, or the bare field when there is no qualifier.
    pub fn qualified(&self, field: &str) -> String {
        let q = self.qualifier();
        if q.is_empty() {
            field.to_string()
        } else {
            format!("{}.{}", q, field)
        }
    }

    /// FROM-list source for this registration.
    pub fn from_source(&self) -> String {
        self.table.render_as_from_source(&self.alias)
    }

    /// First relation from this registration to `other`: explicit relations
    /// first, then the entity's declared ones.
    pub fn relation_to(&self, other: &Registration) -> Option<&Relation> {
        self.relations
            .iter()
            .find(|r| r.target.matches(&other.table, &other.alias))
            .or_else(|| self.table.relation_to(&other.table, &other.alias))
    }
}

/// Registrations in insertion order.
#[derive(Clone, Debug, Default)]
pub struct Registry {
    entries: Vec<Registration>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `table`. Registering the same entity again replaces its
    /// registration but keeps its original position.
    pub fn register(
        &mut self,
        table: &TableRef,
        alias: &str,
        join: JoinKind,
        relations: Vec<Relation>,
    ) {
        let registration = Registration {
            table: table.clone(),
            alias: alias.trim().to_uppercase(),
            join,
            relations,
        };
        match self.entries.iter_mut().find(|r| &r.table == table) {
            Some(existing) => *existing = registration,
            None => self.entries.push(registration),
        }
    }

    pub fn get(&self, table: &TableRef) -> Option<&Registration> {
        self.entries.iter().find(|r| &r.table == table)
    }

    pub fn first(&self) -> Option<&Registration> {
        self.entries.first()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Registration> {
        self.entries.iter()
    }

    pub fn entries(&self) -> &[Registration] {
        &self.entries
    }

    /// Qualify a field for WHERE / ORDER BY / GROUP BY / projections.
    ///
    /// Fields of aliased entities become `ALIAS.field`; fields without an
    /// entity, of unaliased entities or of unregistered entities are used
    /// verbatim.
    pub fn qualify(&self, table: Option<&TableRef>, field: &str) -> String {
        match table.and_then(|t| self.get(t)) {
            Some(reg) if !reg.alias.is_empty() => format!("{}.{}", reg.alias, field),
            _ => field.to_string(),
        }
    }

    /// Alias of a registered entity, empty otherwise.
    pub fn alias_of(&self, table: &TableRef) -> &str {
        self.get(table).map(|r| r.alias.as_str()).unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::NamedTable;

    fn table(name: &str) -> TableRef {
        TableRef::named(NamedTable::new(name, ["id", "key"]))
    }

    #[test]
    fn aliases_are_uppercased() {
        let t = table("users");
        let mut reg = Registry::new();
        reg.register(&t, "u1", JoinKind::Join, Vec::new());
        assert_eq!(reg.alias_of(&t), "U1");
        assert_eq!(reg.qualify(Some(&t), "id"), "U1.id");
        assert_eq!(reg.qualify(None, "now()"), "now()");
    }

    #[test]
    fn unaliased_fields_stay_bare() {
        let t = table("users");
        let mut reg = Registry::new();
        reg.register(&t, "", JoinKind::Join, Vec::new());
        assert_eq!(reg.qualify(Some(&t), "id"), "id");
        assert_eq!(reg.get(&t).unwrap().qualified("id"), "users.id");
    }

    #[test]
    fn re_registration_keeps_position() {
        let a = table("a");
        let b = table("b");
        let mut reg = Registry::new();
        reg.register(&a, "a", JoinKind::Join, Vec::new());
        reg.register(&b, "b", JoinKind::Join, Vec::new());
        reg.register(&a, "x", JoinKind::Left, Vec::new());
        let aliases: Vec<&str> = reg.iter().map(|r| r.alias.as_str()).collect();
        assert_eq!(aliases, ["X", "B"]);
        assert_eq!(reg.first().unwrap().join, JoinKind::Left);
    }

    #[test]
    fn join_keywords() {
        assert_eq!(JoinKind::default().as_sql(), "JOIN");
        assert_eq!(JoinKind::Left.as_sql(), "LEFT JOIN");
        assert_eq!(JoinKind::Custom("join".into()).as_sql(), "join");
    }
}
