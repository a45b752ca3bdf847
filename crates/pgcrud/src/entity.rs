//! Table-like entities that participate in a statement.
//!
//! An entity is either a named table with a declared field list, or a derived
//! table (a raw subquery). Both may declare [`Relation`]s, which the join
//! resolver uses to infer `JOIN ... ON` conditions.
//!
//! Entities are immutable and shared through [`TableRef`]; builders refer to
//! them by handle, so identity is pointer identity.

use crate::metadata::FieldMeta;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Per-entity defaults. Builder-level settings override them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityOptions {
    /// Primary key used for default predicates and excluded from UPDATE SET.
    pub id_field: String,
    /// Append `RETURNING *` to mutations unless the builder says otherwise.
    pub use_returning: bool,
    /// Rows are soft-deleted through a timestamp column.
    pub use_timestamp: bool,
    /// Column checked by the soft-delete filter.
    pub deleted_at_field: String,
}

impl Default for EntityOptions {
    fn default() -> Self {
        Self {
            id_field: "id".to_string(),
            use_returning: false,
            use_timestamp: false,
            deleted_at_field: "deleted_at".to_string(),
        }
    }
}

/// What a relation points at.
#[derive(Debug, Clone, PartialEq)]
pub enum RelationTarget {
    /// Any named entity of this kind. Never matches a derived table.
    Kind(String),
    /// Exactly this entity.
    Table(TableRef),
    /// Whatever entity is registered under this alias (case-insensitive).
    Alias(String),
}

impl RelationTarget {
    /// Whether `other`, registered as `other_alias`, is the target.
    pub fn matches(&self, other: &TableRef, other_alias: &str) -> bool {
        match self {
            RelationTarget::Kind(kind) => other
                .as_named()
                .is_some_and(|named| named.kind() == kind),
            RelationTarget::Table(table) => table == other,
            RelationTarget::Alias(alias) => {
                !other_alias.is_empty() && alias.eq_ignore_ascii_case(other_alias)
            }
        }
    }
}

/// `field` of the owning entity equals `key` of the target entity.
#[derive(Debug, Clone, PartialEq)]
pub struct Relation {
    pub field: String,
    pub target: RelationTarget,
    pub key: String,
}

impl Relation {
    pub fn new(field: impl Into<String>, target: RelationTarget, key: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            target,
            key: key.into(),
        }
    }

    /// Relation to any named entity of `kind`.
    pub fn to_kind(field: impl Into<String>, kind: impl Into<String>, key: impl Into<String>) -> Self {
        Self::new(field, RelationTarget::Kind(kind.into()), key)
    }

    /// Relation to one specific entity.
    pub fn to_table(field: impl Into<String>, table: &TableRef, key: impl Into<String>) -> Self {
        Self::new(field, RelationTarget::Table(table.clone()), key)
    }

    /// Relation to the entity registered under `alias`.
    pub fn to_alias(field: impl Into<String>, alias: impl Into<String>, key: impl Into<String>) -> Self {
        Self::new(field, RelationTarget::Alias(alias.into()), key)
    }
}

/// Shared capability of everything that can appear in a FROM list.
pub trait TableLike {
    /// The FROM-list source, e.g. `users U` or `(SELECT ...) S`.
    fn render_as_from_source(&self, alias: &str) -> String;

    /// Declared relations, in declaration order.
    fn relations(&self) -> &[Relation];

    /// First declared relation whose target is `other`.
    fn relation_to(&self, other: &TableRef, other_alias: &str) -> Option<&Relation> {
        self.relations()
            .iter()
            .find(|r| r.target.matches(other, other_alias))
    }
}

/// A real table with a declared field list.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedTable {
    name: String,
    kind: String,
    fields: Vec<String>,
    meta: BTreeMap<String, FieldMeta>,
    options: EntityOptions,
    relations: Vec<Relation>,
}

impl NamedTable {
    /// Create a table. Its kind defaults to its name.
    pub fn new<I, S>(name: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let name = name.into();
        Self {
            kind: name.clone(),
            name,
            fields: fields.into_iter().map(Into::into).collect(),
            meta: BTreeMap::new(),
            options: EntityOptions::default(),
            relations: Vec::new(),
        }
    }

    /// Create a table whose field list is the metadata keys, in order.
    pub fn from_metadata<I, S>(name: impl Into<String>, metadata: I) -> Self
    where
        I: IntoIterator<Item = (S, FieldMeta)>,
        S: Into<String>,
    {
        let mut fields = Vec::new();
        let mut meta = BTreeMap::new();
        for (field, m) in metadata {
            let field = field.into();
            meta.insert(field.clone(), m);
            fields.push(field);
        }
        let mut table = Self::new(name, fields);
        table.meta = meta;
        table
    }

    /// Override the kind matched by [`RelationTarget::Kind`].
    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = kind.into();
        self
    }

    pub fn with_options(mut self, options: EntityOptions) -> Self {
        self.options = options;
        self
    }

    pub fn id_field(mut self, field: impl Into<String>) -> Self {
        self.options.id_field = field.into();
        self
    }

    pub fn use_returning(mut self, enabled: bool) -> Self {
        self.options.use_returning = enabled;
        self
    }

    pub fn use_timestamp(mut self, enabled: bool) -> Self {
        self.options.use_timestamp = enabled;
        self
    }

    pub fn deleted_at_field(mut self, field: impl Into<String>) -> Self {
        self.options.deleted_at_field = field.into();
        self
    }

    pub fn relation(mut self, relation: Relation) -> Self {
        self.relations.push(relation);
        self
    }

    pub fn field_meta(mut self, field: impl Into<String>, meta: FieldMeta) -> Self {
        self.meta.insert(field.into(), meta);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.fields.iter().any(|f| f == field)
    }

    pub fn meta(&self, field: &str) -> Option<&FieldMeta> {
        self.meta.get(field)
    }

    pub fn options(&self) -> &EntityOptions {
        &self.options
    }
}

impl TableLike for NamedTable {
    fn render_as_from_source(&self, alias: &str) -> String {
        if alias.is_empty() {
            self.name.clone()
        } else {
            format!("{} {}", self.name, alias)
        }
    }

    fn relations(&self) -> &[Relation] {
        &self.relations
    }
}

/// An opaque subquery used as a table.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedTable {
    sql: String,
    relations: Vec<Relation>,
}

impl DerivedTable {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            relations: Vec::new(),
        }
    }

    pub fn relation(mut self, relation: Relation) -> Self {
        self.relations.push(relation);
        self
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }
}

impl TableLike for DerivedTable {
    fn render_as_from_source(&self, alias: &str) -> String {
        if alias.is_empty() {
            format!("({})", self.sql)
        } else {
            format!("({}) {}", self.sql, alias)
        }
    }

    fn relations(&self) -> &[Relation] {
        &self.relations
    }
}

/// A table-like participant.
#[derive(Debug, Clone, PartialEq)]
pub enum Entity {
    Named(NamedTable),
    Derived(DerivedTable),
}

impl TableLike for Entity {
    fn render_as_from_source(&self, alias: &str) -> String {
        match self {
            Entity::Named(t) => t.render_as_from_source(alias),
            Entity::Derived(t) => t.render_as_from_source(alias),
        }
    }

    fn relations(&self) -> &[Relation] {
        match self {
            Entity::Named(t) => t.relations(),
            Entity::Derived(t) => t.relations(),
        }
    }
}

/// Shared handle to an [`Entity`]. Equality is identity.
#[derive(Clone)]
pub struct TableRef(Arc<Entity>);

impl TableRef {
    pub fn named(table: NamedTable) -> Self {
        Self(Arc::new(Entity::Named(table)))
    }

    pub fn derived(table: DerivedTable) -> Self {
        Self(Arc::new(Entity::Derived(table)))
    }

    pub fn entity(&self) -> &Entity {
        &self.0
    }

    pub fn as_named(&self) -> Option<&NamedTable> {
        match self.entity() {
            Entity::Named(t) => Some(t),
            Entity::Derived(_) => None,
        }
    }

    /// Entity options; derived tables use the defaults.
    pub fn options(&self) -> EntityOptions {
        self.as_named()
            .map(|t| t.options().clone())
            .unwrap_or_default()
    }

    /// Table name for named tables, `None` for subqueries.
    pub fn name(&self) -> Option<&str> {
        self.as_named().map(NamedTable::name)
    }
}

impl TableLike for TableRef {
    fn render_as_from_source(&self, alias: &str) -> String {
        self.entity().render_as_from_source(alias)
    }

    fn relations(&self) -> &[Relation] {
        self.entity().relations()
    }
}

impl PartialEq for TableRef {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for TableRef {}

impl fmt::Debug for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.entity() {
            Entity::Named(t) => f.debug_tuple("TableRef").field(&t.name()).finish(),
            Entity::Derived(t) => f.debug_tuple("TableRef").field(&t.sql()).finish(),
        }
    }
}

impl From<NamedTable> for TableRef {
    fn from(table: NamedTable) -> Self {
        Self::named(table)
    }
}

impl From<DerivedTable> for TableRef {
    fn from(table: DerivedTable) -> Self {
        Self::derived(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_equality() {
        let a = TableRef::named(NamedTable::new("t", ["id"]));
        let b = TableRef::named(NamedTable::new("t", ["id"]));
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }

    #[test]
    fn kind_target_only_matches_named() {
        let named = TableRef::named(NamedTable::new("users", ["id"]));
        let derived = TableRef::derived(DerivedTable::new("SELECT 1 AS id"));
        let target = RelationTarget::Kind("users".into());
        assert!(target.matches(&named, "U"));
        assert!(!target.matches(&derived, "U"));
    }

    #[test]
    fn kind_can_differ_from_name() {
        let t = TableRef::named(NamedTable::new("users_v2", ["id"]).with_kind("users"));
        assert!(RelationTarget::Kind("users".into()).matches(&t, ""));
        assert!(!RelationTarget::Kind("users_v2".into()).matches(&t, ""));
    }

    #[test]
    fn alias_target_is_case_insensitive() {
        let derived = TableRef::derived(DerivedTable::new("SELECT 1"));
        assert!(RelationTarget::Alias("c2".into()).matches(&derived, "C2"));
        assert!(!RelationTarget::Alias("c2".into()).matches(&derived, ""));
    }

    #[test]
    fn first_declared_relation_wins() {
        let users = TableRef::named(NamedTable::new("users", ["id"]));
        let posts = NamedTable::new("posts", ["id", "user_id", "editor_id"])
            .relation(Relation::to_kind("user_id", "users", "id"))
            .relation(Relation::to_kind("editor_id", "users", "id"));
        let rel = posts.relation_to(&users, "U").unwrap();
        assert_eq!(rel.field, "user_id");
    }

    #[test]
    fn from_sources() {
        let t = NamedTable::new("users", ["id"]);
        assert_eq!(t.render_as_from_source("U"), "users U");
        assert_eq!(t.render_as_from_source(""), "users");
        let d = DerivedTable::new("SELECT 1 AS id");
        assert_eq!(d.render_as_from_source("S"), "(SELECT 1 AS id) S");
    }

    #[test]
    fn metadata_defines_field_order() {
        let t = NamedTable::from_metadata(
            "crud1",
            [("id", FieldMeta::number().auto()), ("title", FieldMeta::text())],
        );
        assert_eq!(t.fields(), ["id".to_string(), "title".to_string()]);
        assert!(t.meta("id").unwrap().auto);
    }
}
