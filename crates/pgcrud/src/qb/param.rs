//! Positional parameter binding.

use crate::value::Value;
use tokio_postgres::types::ToSql;

/// Marker an operator may contain to receive the placeholder, e.g. `=ANY($)`.
pub const PLACEHOLDER_MARKER: char = '$';

/// Ordered parameters of one statement build.
///
/// Every [`ParamList::bind`] appends a value and returns the `$n` token for
/// it; the n-th value in the list is the one bound to `$n`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParamList {
    params: Vec<Value>,
    offset: usize,
}

impl ParamList {
    /// Create a new empty parameter list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start numbering after `offset` already-used placeholders.
    pub fn with_offset(offset: usize) -> Self {
        Self {
            params: Vec::new(),
            offset,
        }
    }

    /// Add a parameter and return its 1-based position.
    pub fn push(&mut self, value: Value) -> usize {
        self.params.push(value);
        self.offset + self.params.len()
    }

    /// Add a parameter and return its placeholder token (`$n`).
    pub fn bind(&mut self, value: Value) -> String {
        format!("${}", self.push(value))
    }

    /// Bind `value` and render `<operator><placeholder>`.
    ///
    /// When the operator carries a [`PLACEHOLDER_MARKER`], the token replaces
    /// the first marker instead of being appended.
    pub fn bind_with_operator(&mut self, operator: &str, value: Value) -> String {
        let token = self.bind(value);
        if operator.contains(PLACEHOLDER_MARKER) {
            operator.replacen(PLACEHOLDER_MARKER, &token, 1)
        } else {
            format!("{}{}", operator, token)
        }
    }

    /// Get the current parameter count.
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Check if the list is empty.
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Get all parameters as references for tokio-postgres.
    pub fn as_refs(&self) -> Vec<&(dyn ToSql + Sync)> {
        self.params.iter().map(|p| p as &(dyn ToSql + Sync)).collect()
    }

    pub fn into_values(self) -> Vec<Value> {
        self.params
    }
}
