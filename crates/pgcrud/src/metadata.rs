//! Per-field metadata and value coercion.

use crate::value::Value;

/// Storage kind of a column, as far as value coercion cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FieldKind {
    /// Any numeric column.
    Number,
    /// Any array column (`text[]`, `int[]`, ...).
    Array,
    /// `json` or `jsonb`.
    Json,
    /// Everything else; values pass through untouched.
    #[default]
    Text,
}

impl FieldKind {
    /// Infer the kind from a Postgres type name such as `int8`, `text[]` or `jsonb`.
    pub fn from_type_name(type_name: &str) -> Self {
        let t = type_name.trim().to_ascii_lowercase();
        if t.ends_with("[]") {
            FieldKind::Array
        } else if t.starts_with("json") {
            FieldKind::Json
        } else if matches!(
            t.as_str(),
            "number"
                | "int2"
                | "int4"
                | "int8"
                | "smallint"
                | "integer"
                | "bigint"
                | "serial"
                | "bigserial"
                | "real"
                | "float4"
                | "float8"
                | "double precision"
                | "numeric"
        ) {
            FieldKind::Number
        } else {
            FieldKind::Text
        }
    }
}

/// Metadata for one declared field.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FieldMeta {
    pub kind: FieldKind,
    /// Filled by the database (serial, default expression).
    pub auto: bool,
    /// Human-readable label for view layers.
    pub label: Option<String>,
}

impl FieldMeta {
    pub fn new(kind: FieldKind) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }

    pub fn number() -> Self {
        Self::new(FieldKind::Number)
    }

    pub fn text() -> Self {
        Self::new(FieldKind::Text)
    }

    pub fn array() -> Self {
        Self::new(FieldKind::Array)
    }

    pub fn json() -> Self {
        Self::new(FieldKind::Json)
    }

    pub fn auto(mut self) -> Self {
        self.auto = true;
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Coerce a value to something the column can store.
    ///
    /// NULL is kept. A number column replaces non-numbers (and NaN) with `0`,
    /// an array column replaces non-arrays with `[]`, a JSON column replaces
    /// scalars with `{}`.
    pub fn fix_value(&self, value: Value) -> Value {
        if value == Value::Null {
            return value;
        }
        match self.kind {
            FieldKind::Number => match value {
                Value::Int(_) => value,
                Value::Float(f) if !f.is_nan() => value,
                _ => Value::Int(0),
            },
            FieldKind::Array => match value {
                Value::Array(_) => value,
                _ => Value::Array(Vec::new()),
            },
            FieldKind::Json => match value {
                Value::Json(ref v) if v.is_object() || v.is_array() => value,
                Value::Array(_) => value,
                _ => Value::Json(serde_json::Value::Object(Default::default())),
            },
            FieldKind::Text => value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_from_type_name() {
        assert_eq!(FieldKind::from_type_name("text[]"), FieldKind::Array);
        assert_eq!(FieldKind::from_type_name("jsonb"), FieldKind::Json);
        assert_eq!(FieldKind::from_type_name("BIGINT"), FieldKind::Number);
        assert_eq!(FieldKind::from_type_name("varchar"), FieldKind::Text);
    }

    #[test]
    fn number_coercion() {
        let meta = FieldMeta::number();
        assert_eq!(meta.fix_value(Value::from("abc")), Value::Int(0));
        assert_eq!(meta.fix_value(Value::Float(f64::NAN)), Value::Int(0));
        assert_eq!(meta.fix_value(Value::Int(3)), Value::Int(3));
        assert_eq!(meta.fix_value(Value::Null), Value::Null);
    }

    #[test]
    fn array_and_json_coercion() {
        assert_eq!(
            FieldMeta::array().fix_value(Value::from("x")),
            Value::Array(Vec::new())
        );
        assert_eq!(
            FieldMeta::json().fix_value(Value::Int(1)),
            Value::Json(serde_json::json!({}))
        );
        assert_eq!(FieldMeta::text().fix_value(Value::Int(1)), Value::Int(1));
    }
}
