//! Recursive WHERE clause: leaf conditions and parenthesized AND/OR groups.
//!
//! Conditions and groups are described with [`Cond`] and [`WhereGroup`] and
//! resolved into immutable [`WhereNode`]s when they are added to a
//! [`WhereTree`]. Resolution is where inheritance happens: a child without a
//! table takes its group's default table, a child without a conjunction takes
//! its group's conjunction.
//!
//! Rendering walks the tree depth-first, left to right, binding values into a
//! [`ParamList`] in exactly the order the placeholders appear in the SQL.

use crate::entity::TableRef;
use crate::error::{OrmError, OrmResult};
use crate::qb::param::{PLACEHOLDER_MARKER, ParamList};
use crate::qb::registry::Registry;
use crate::value::Value;

/// How a node attaches to its previous sibling.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Conjunction {
    #[default]
    And,
    Or,
}

impl Conjunction {
    pub fn as_sql(self) -> &'static str {
        match self {
            Conjunction::And => "AND",
            Conjunction::Or => "OR",
        }
    }

    /// Parse `AND` / `OR`, ignoring case and surrounding whitespace.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("and") {
            Some(Conjunction::And)
        } else if s.eq_ignore_ascii_case("or") {
            Some(Conjunction::Or)
        } else {
            None
        }
    }
}

/// Describes one leaf condition.
#[derive(Clone, Debug)]
pub struct Cond {
    table: Option<TableRef>,
    field: String,
    operator: String,
    value: Value,
    raw: bool,
    conjunction: Option<Conjunction>,
}

impl Cond {
    /// `field=value` on no particular table; the field is used verbatim.
    pub fn new(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            table: None,
            field: field.into(),
            operator: "=".to_string(),
            value: value.into(),
            raw: false,
            conjunction: None,
        }
    }

    /// `ALIAS.field=value` on `table`.
    pub fn on(table: &TableRef, field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, value).table(table)
    }

    pub fn table(mut self, table: &TableRef) -> Self {
        self.table = Some(table.clone());
        self
    }

    /// Operator written between field and value, e.g. `<>`, ` LIKE `, `=ANY($)`.
    pub fn op(mut self, operator: impl Into<String>) -> Self {
        self.operator = operator.into();
        self
    }

    pub fn conjunction(mut self, conjunction: Conjunction) -> Self {
        self.conjunction = Some(conjunction);
        self
    }

    pub fn and(self) -> Self {
        self.conjunction(Conjunction::And)
    }

    pub fn or(self) -> Self {
        self.conjunction(Conjunction::Or)
    }

    /// Embed the value as SQL text instead of binding it.
    pub fn raw(mut self) -> Self {
        self.raw = true;
        self
    }
}

/// Describes a parenthesized group.
#[derive(Clone, Debug)]
pub struct WhereGroup {
    items: Vec<WhereItem>,
    conjunction: Conjunction,
    attach: Option<Conjunction>,
    table: Option<TableRef>,
}

impl WhereGroup {
    /// A group whose children are joined by `conjunction` unless they say otherwise.
    pub fn new(conjunction: Conjunction) -> Self {
        Self {
            items: Vec::new(),
            conjunction,
            attach: None,
            table: None,
        }
    }

    pub fn and() -> Self {
        Self::new(Conjunction::And)
    }

    pub fn or() -> Self {
        Self::new(Conjunction::Or)
    }

    /// Default table for children that name none.
    pub fn table(mut self, table: &TableRef) -> Self {
        self.table = Some(table.clone());
        self
    }

    /// How the group itself attaches to its previous sibling.
    ///
    /// Defaults to the enclosing group's conjunction, or `AND` at top level.
    pub fn joined_by(mut self, conjunction: Conjunction) -> Self {
        self.attach = Some(conjunction);
        self
    }

    pub fn push(mut self, item: impl Into<WhereItem>) -> Self {
        self.items.push(item.into());
        self
    }

    /// Shorthand for pushing `Cond::new(field, value)`.
    pub fn cond(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push(Cond::new(field, value))
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Build a group from a JSON list of child descriptors.
    ///
    /// Each child is either a positional tuple
    /// `[field, value, operator?, conjunction?, raw?]`, an object with a
    /// `field` key (`{"field", "value", "operator", "conjunction", "raw"}`), or
    /// a nested group object `{"group": [...], "conjunction": "OR"}`.
    pub fn from_json(children: &serde_json::Value, conjunction: Conjunction) -> OrmResult<Self> {
        let items = children.as_array().ok_or_else(|| {
            OrmError::invalid_where(format!("group children must be a list, got {}", children))
        })?;
        let mut group = WhereGroup::new(conjunction);
        for item in items {
            group.items.push(WhereItem::from_json(item)?);
        }
        Ok(group)
    }
}

/// A child of a group: a condition or a nested group.
#[derive(Clone, Debug)]
pub enum WhereItem {
    Cond(Cond),
    Group(WhereGroup),
}

impl From<Cond> for WhereItem {
    fn from(cond: Cond) -> Self {
        WhereItem::Cond(cond)
    }
}

impl From<WhereGroup> for WhereItem {
    fn from(group: WhereGroup) -> Self {
        WhereItem::Group(group)
    }
}

impl WhereItem {
    /// Parse one JSON descriptor. See [`WhereGroup::from_json`].
    pub fn from_json(value: &serde_json::Value) -> OrmResult<Self> {
        match value {
            serde_json::Value::Array(parts) => parse_tuple(parts).map(WhereItem::Cond),
            serde_json::Value::Object(map) if map.contains_key("group") => {
                let conjunction = match map.get("conjunction") {
                    None | Some(serde_json::Value::Null) => Conjunction::And,
                    Some(c) => parse_conjunction(c)?,
                };
                WhereGroup::from_json(&map["group"], conjunction).map(WhereItem::Group)
            }
            serde_json::Value::Object(map) if map.contains_key("field") => {
                let parts = [
                    map["field"].clone(),
                    map.get("value").cloned().unwrap_or(serde_json::Value::Null),
                    map.get("operator").cloned().unwrap_or(serde_json::Value::Null),
                    map.get("conjunction").cloned().unwrap_or(serde_json::Value::Null),
                    map.get("raw").cloned().unwrap_or(serde_json::Value::Null),
                ];
                parse_tuple(&parts).map(WhereItem::Cond)
            }
            other => Err(OrmError::invalid_where(format!(
                "expected a [field, value, ...] tuple, a {{\"field\": ...}} object or a {{\"group\": [...]}} object, got {}",
                other
            ))),
        }
    }
}

fn parse_tuple(parts: &[serde_json::Value]) -> OrmResult<Cond> {
    if !(2..=5).contains(&parts.len()) {
        return Err(OrmError::invalid_where(format!(
            "condition tuple needs 2 to 5 elements, got {}",
            parts.len()
        )));
    }
    let field = parts[0].as_str().ok_or_else(|| {
        OrmError::invalid_where(format!("condition field must be a string, got {}", parts[0]))
    })?;
    let mut cond = Cond::new(field, Value::from_json(parts[1].clone()));

    if let Some(op) = parts.get(2) {
        match op {
            serde_json::Value::Null => {}
            serde_json::Value::String(s) if !s.is_empty() => cond = cond.op(s.clone()),
            serde_json::Value::String(_) => {}
            other => {
                return Err(OrmError::invalid_where(format!(
                    "condition operator must be a string, got {}",
                    other
                )));
            }
        }
    }
    if let Some(c) = parts.get(3) {
        if !c.is_null() {
            cond = cond.conjunction(parse_conjunction(c)?);
        }
    }
    if let Some(raw) = parts.get(4) {
        match raw {
            serde_json::Value::Null | serde_json::Value::Bool(false) => {}
            serde_json::Value::Bool(true) => cond = cond.raw(),
            other => {
                return Err(OrmError::invalid_where(format!(
                    "condition raw flag must be a boolean, got {}",
                    other
                )));
            }
        }
    }
    Ok(cond)
}

fn parse_conjunction(value: &serde_json::Value) -> OrmResult<Conjunction> {
    value
        .as_str()
        .and_then(Conjunction::parse)
        .ok_or_else(|| OrmError::invalid_where(format!("conjunction must be AND or OR, got {}", value)))
}

/// A resolved node of the where tree.
#[derive(Clone, Debug, PartialEq)]
pub enum WhereNode {
    Condition {
        table: Option<TableRef>,
        field: String,
        operator: String,
        value: Value,
        raw: bool,
        conjunction: Conjunction,
    },
    Group {
        children: Vec<WhereNode>,
        conjunction: Conjunction,
    },
}

impl WhereNode {
    /// Bound equality, attached with `AND`.
    pub(crate) fn eq(table: &TableRef, field: &str, value: Value) -> Self {
        WhereNode::Condition {
            table: Some(table.clone()),
            field: field.to_string(),
            operator: "=".to_string(),
            value,
            raw: false,
            conjunction: Conjunction::And,
        }
    }

    /// `ALIAS.field IS NULL`, attached with `AND`.
    pub(crate) fn is_null(table: &TableRef, field: &str) -> Self {
        WhereNode::Condition {
            table: Some(table.clone()),
            field: field.to_string(),
            operator: " IS ".to_string(),
            value: Value::Null,
            raw: true,
            conjunction: Conjunction::And,
        }
    }

    fn resolve(item: WhereItem, parent_conjunction: Conjunction, parent_table: Option<&TableRef>) -> Self {
        match item {
            WhereItem::Cond(cond) => WhereNode::Condition {
                table: cond.table.or_else(|| parent_table.cloned()),
                field: cond.field,
                operator: cond.operator,
                value: cond.value,
                raw: cond.raw,
                conjunction: cond.conjunction.unwrap_or(parent_conjunction),
            },
            WhereItem::Group(group) => {
                let table = group.table.or_else(|| parent_table.cloned());
                let children = group
                    .items
                    .into_iter()
                    .map(|child| WhereNode::resolve(child, group.conjunction, table.as_ref()))
                    .collect();
                WhereNode::Group {
                    children,
                    conjunction: group.attach.unwrap_or(parent_conjunction),
                }
            }
        }
    }

    pub fn conjunction(&self) -> Conjunction {
        match self {
            WhereNode::Condition { conjunction, .. } | WhereNode::Group { conjunction, .. } => {
                *conjunction
            }
        }
    }

    /// Render this node. Empty groups render as an empty string.
    pub fn render(&self, registry: &Registry, params: &mut ParamList) -> String {
        match self {
            WhereNode::Condition {
                table,
                field,
                operator,
                value,
                raw,
                ..
            } => {
                let qualified = registry.qualify(table.as_ref(), field);
                if *raw {
                    let literal = value.to_raw_sql();
                    if operator.contains(PLACEHOLDER_MARKER) {
                        format!("{}{}", qualified, operator.replacen(PLACEHOLDER_MARKER, &literal, 1))
                    } else {
                        format!("{}{}{}", qualified, operator, literal)
                    }
                } else {
                    format!("{}{}", qualified, params.bind_with_operator(operator, value.clone()))
                }
            }
            WhereNode::Group { children, .. } => {
                let inner = join_nodes(children.iter(), registry, params);
                if inner.is_empty() {
                    String::new()
                } else {
                    format!("({})", inner)
                }
            }
        }
    }
}

/// Render nodes in order, joining each to the previous one with its own
/// conjunction. The first rendered node's conjunction is ignored.
fn join_nodes<'a>(
    nodes: impl Iterator<Item = &'a WhereNode>,
    registry: &Registry,
    params: &mut ParamList,
) -> String {
    let mut sql = String::new();
    for node in nodes {
        let part = node.render(registry, params);
        if part.is_empty() {
            continue;
        }
        if !sql.is_empty() {
            sql.push(' ');
            sql.push_str(node.conjunction().as_sql());
            sql.push(' ');
        }
        sql.push_str(&part);
    }
    sql
}

/// Top-level where state of a builder.
#[derive(Clone, Debug, Default)]
pub struct WhereTree {
    nodes: Vec<WhereNode>,
    raw: Option<String>,
}

impl WhereTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a leaf. Without an explicit conjunction it attaches with `AND`.
    pub fn add_condition(&mut self, cond: Cond) {
        self.nodes
            .push(WhereNode::resolve(WhereItem::Cond(cond), Conjunction::And, None));
    }

    /// Append a group. Without [`WhereGroup::joined_by`] it attaches with `AND`.
    pub fn add_group(&mut self, group: WhereGroup) {
        if group.is_empty() {
            return;
        }
        self.nodes
            .push(WhereNode::resolve(WhereItem::Group(group), Conjunction::And, None));
    }

    /// Raw predicate text placed before all structured conditions.
    pub fn set_raw(&mut self, text: impl Into<String>) {
        let text = text.into();
        self.raw = if text.trim().is_empty() { None } else { Some(text) };
    }

    pub fn raw(&self) -> Option<&str> {
        self.raw.as_deref()
    }

    pub fn nodes(&self) -> &[WhereNode] {
        &self.nodes
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.raw.is_none()
    }

    /// Render the predicate (without the `WHERE` keyword).
    ///
    /// Order: raw text, `before`, the added nodes, `after`. The raw text is
    /// joined to the rest with a bare `AND` and is not parenthesized.
    pub fn render(
        &self,
        registry: &Registry,
        params: &mut ParamList,
        before: &[WhereNode],
        after: &[WhereNode],
    ) -> String {
        let structured = join_nodes(
            before.iter().chain(self.nodes.iter()).chain(after.iter()),
            registry,
            params,
        );
        match (self.raw.as_deref(), structured.is_empty()) {
            (Some(raw), true) => raw.to_string(),
            (Some(raw), false) => format!("{} AND {}", raw, structured),
            (None, _) => structured,
        }
    }
}
