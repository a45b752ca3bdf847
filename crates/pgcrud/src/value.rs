//! Bindable parameter values.
//!
//! [`Value`] is what the parameter binder accumulates and what row data is made
//! of. It implements [`ToSql`] by delegating to the tokio-postgres encoding of
//! the wrapped Rust type, narrowing integers and whole floats to the column
//! type the server asks for. A value that the column type cannot hold is an
//! encoding error.

use bytes::BytesMut;
use chrono::{DateTime, NaiveDateTime, Utc};
use std::error::Error;
use tokio_postgres::types::{FromSql, IsNull, Kind, ToSql, Type};
use uuid::Uuid;

/// A database-representable value: scalar, array or JSON document.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// SQL NULL
    Null,
    /// BOOLEAN
    Bool(bool),
    /// Any integer column (SMALLINT / INTEGER / BIGINT)
    Int(i64),
    /// REAL / DOUBLE PRECISION
    Float(f64),
    /// TEXT / VARCHAR
    Text(String),
    /// JSON / JSONB
    Json(serde_json::Value),
    /// UUID
    Uuid(Uuid),
    /// TIMESTAMP / TIMESTAMPTZ
    Timestamp(DateTime<Utc>),
    /// ARRAY of any of the above
    Array(Vec<Value>),
}

impl Value {
    /// Returns `true` for NULL and for empty text, the values that never
    /// identify a row.
    pub fn is_empty(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Text(s) => s.is_empty(),
            _ => false,
        }
    }

    /// Render this value verbatim into SQL text.
    ///
    /// Used for raw conditions and raw assignments, where the caller supplies
    /// an SQL expression (`now()`, `NULL`, `counter + 1`) instead of data.
    pub fn to_raw_sql(&self) -> String {
        match self {
            Value::Null => "NULL".to_string(),
            Value::Bool(true) => "TRUE".to_string(),
            Value::Bool(false) => "FALSE".to_string(),
            Value::Int(n) => n.to_string(),
            Value::Float(f) => f.to_string(),
            Value::Text(s) => s.clone(),
            Value::Json(v) => v.to_string(),
            Value::Uuid(u) => u.to_string(),
            Value::Timestamp(ts) => ts.to_rfc3339(),
            Value::Array(items) => {
                let inner: Vec<String> = items.iter().map(Value::to_raw_sql).collect();
                format!("ARRAY[{}]", inner.join(","))
            }
        }
    }

    /// Convert a JSON value into the closest bindable value.
    ///
    /// Objects stay JSON documents, arrays become SQL arrays.
    pub fn from_json(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or_default()),
            },
            serde_json::Value::String(s) => Value::Text(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from_json).collect())
            }
            obj @ serde_json::Value::Object(_) => Value::Json(obj),
        }
    }
}

impl ToSql for Value {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        match self {
            Value::Null => Ok(IsNull::Yes),
            Value::Bool(b) => match *ty {
                Type::BOOL => b.to_sql(ty, out),
                _ => Err(mismatch(self, ty)),
            },
            Value::Int(n) => {
                int_to_sql(*n, ty, out).unwrap_or_else(|| Err(mismatch(self, ty)))
            }
            Value::Float(f) => match *ty {
                Type::FLOAT4 => (*f as f32).to_sql(ty, out),
                Type::FLOAT8 => f.to_sql(ty, out),
                Type::INT2 | Type::INT4 | Type::INT8 => {
                    let whole = f.is_finite()
                        && f.fract() == 0.0
                        && *f >= i64::MIN as f64
                        && *f < i64::MAX as f64;
                    if !whole {
                        return Err(format!("cannot bind {} to integer type {} exactly", f, ty).into());
                    }
                    int_to_sql(*f as i64, ty, out).unwrap_or_else(|| Err(mismatch(self, ty)))
                }
                Type::TEXT | Type::VARCHAR | Type::BPCHAR => f.to_string().to_sql(ty, out),
                _ => Err(mismatch(self, ty)),
            },
            Value::Text(s) if <&str as ToSql>::accepts(ty) => s.as_str().to_sql(ty, out),
            Value::Json(v) if <serde_json::Value as ToSql>::accepts(ty) => v.to_sql(ty, out),
            Value::Uuid(u) if *ty == Type::UUID => u.to_sql(ty, out),
            Value::Timestamp(ts) => match *ty {
                Type::TIMESTAMP => ts.naive_utc().to_sql(ty, out),
                Type::TIMESTAMPTZ => ts.to_sql(ty, out),
                _ => Err(mismatch(self, ty)),
            },
            Value::Array(items) => {
                if !matches!(ty.kind(), Kind::Array(_)) {
                    return Err(format!("cannot bind an array to non-array type {}", ty).into());
                }
                items.to_sql(ty, out)
            }
            Value::Text(_) | Value::Json(_) | Value::Uuid(_) => Err(mismatch(self, ty)),
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    tokio_postgres::types::to_sql_checked!();
}

/// Encode an integer for an integer, float or text column; `None` for any
/// other column type.
fn int_to_sql(
    n: i64,
    ty: &Type,
    out: &mut BytesMut,
) -> Option<Result<IsNull, Box<dyn Error + Sync + Send>>> {
    let encoded = match *ty {
        Type::INT2 => i16::try_from(n)
            .map_err(Into::into)
            .and_then(|v| v.to_sql(ty, out)),
        Type::INT4 => i32::try_from(n)
            .map_err(Into::into)
            .and_then(|v| v.to_sql(ty, out)),
        Type::INT8 => n.to_sql(ty, out),
        Type::FLOAT4 => (n as f32).to_sql(ty, out),
        Type::FLOAT8 => (n as f64).to_sql(ty, out),
        Type::TEXT | Type::VARCHAR | Type::BPCHAR => n.to_string().to_sql(ty, out),
        _ => return None,
    };
    Some(encoded)
}

fn mismatch(value: &Value, ty: &Type) -> Box<dyn Error + Sync + Send> {
    format!("cannot bind {:?} to column type {}", value, ty).into()
}

impl<'a> FromSql<'a> for Value {
    fn from_sql(ty: &Type, raw: &'a [u8]) -> Result<Self, Box<dyn Error + Sync + Send>> {
        if let Kind::Array(_) = ty.kind() {
            return Ok(Value::Array(Vec::<Value>::from_sql(ty, raw)?));
        }
        let value = match *ty {
            Type::BOOL => Value::Bool(bool::from_sql(ty, raw)?),
            Type::INT2 => Value::Int(i16::from_sql(ty, raw)?.into()),
            Type::INT4 => Value::Int(i32::from_sql(ty, raw)?.into()),
            Type::INT8 => Value::Int(i64::from_sql(ty, raw)?),
            Type::OID => Value::Int(u32::from_sql(ty, raw)?.into()),
            Type::FLOAT4 => Value::Float(f32::from_sql(ty, raw)?.into()),
            Type::FLOAT8 => Value::Float(f64::from_sql(ty, raw)?),
            Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME | Type::UNKNOWN => {
                Value::Text(<&str>::from_sql(ty, raw)?.to_string())
            }
            Type::JSON | Type::JSONB => Value::Json(serde_json::Value::from_sql(ty, raw)?),
            Type::UUID => Value::Uuid(Uuid::from_sql(ty, raw)?),
            Type::TIMESTAMPTZ => Value::Timestamp(DateTime::<Utc>::from_sql(ty, raw)?),
            Type::TIMESTAMP => Value::Timestamp(NaiveDateTime::from_sql(ty, raw)?.and_utc()),
            _ => return Err(format!("unsupported column type {}", ty).into()),
        };
        Ok(value)
    }

    fn from_sql_null(_ty: &Type) -> Result<Self, Box<dyn Error + Sync + Send>> {
        Ok(Value::Null)
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&String> for Value {
    fn from(v: &String) -> Self {
        Value::Text(v.clone())
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i16> for Value {
    fn from(v: i16) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(f64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<Uuid> for Value {
    fn from(v: Uuid) -> Self {
        Value::Uuid(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Timestamp(v)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        Value::Json(v)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::Array(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_values() {
        assert!(Value::Null.is_empty());
        assert!(Value::from("").is_empty());
        assert!(!Value::from("x").is_empty());
        assert!(!Value::from(0i64).is_empty());
    }

    #[test]
    fn raw_sql_rendering() {
        assert_eq!(Value::from("now()").to_raw_sql(), "now()");
        assert_eq!(Value::from(5i32).to_raw_sql(), "5");
        assert_eq!(Value::Null.to_raw_sql(), "NULL");
        assert_eq!(Value::from(true).to_raw_sql(), "TRUE");
        assert_eq!(Value::from(vec![1i64, 2]).to_raw_sql(), "ARRAY[1,2]");
    }

    #[test]
    fn from_json_keeps_objects_as_documents() {
        let v = Value::from_json(serde_json::json!({"a": 1}));
        assert!(matches!(v, Value::Json(_)));
        assert_eq!(
            Value::from_json(serde_json::json!([1, "x"])),
            Value::Array(vec![Value::Int(1), Value::from("x")])
        );
        assert_eq!(Value::from_json(serde_json::json!(1.5)), Value::Float(1.5));
    }

    #[test]
    fn int_narrows_to_column_type() {
        let mut buf = BytesMut::new();
        Value::Int(7).to_sql(&Type::INT4, &mut buf).unwrap();
        assert_eq!(buf.as_ref(), &7i32.to_be_bytes());

        let mut buf = BytesMut::new();
        Value::Int(7).to_sql(&Type::INT8, &mut buf).unwrap();
        assert_eq!(buf.as_ref(), &7i64.to_be_bytes());
    }

    #[test]
    fn int_overflow_is_an_error() {
        let mut buf = BytesMut::new();
        assert!(Value::Int(i64::MAX).to_sql(&Type::INT2, &mut buf).is_err());
    }

    #[test]
    fn array_requires_array_type() {
        let mut buf = BytesMut::new();
        let err = Value::from(vec![1i64]).to_sql(&Type::INT8, &mut buf);
        assert!(err.is_err());
    }

    #[test]
    fn null_is_null() {
        let mut buf = BytesMut::new();
        assert!(matches!(
            Value::Null.to_sql(&Type::TEXT, &mut buf).unwrap(),
            IsNull::Yes
        ));
    }

    #[test]
    fn decodes_scalars() {
        assert_eq!(
            Value::from_sql(&Type::INT4, &42i32.to_be_bytes()).unwrap(),
            Value::Int(42)
        );
        assert_eq!(Value::from_sql(&Type::TEXT, b"hello").unwrap(), Value::from("hello"));
        assert_eq!(Value::from_sql(&Type::BOOL, &[1]).unwrap(), Value::Bool(true));
        assert_eq!(Value::from_sql_null(&Type::TEXT).unwrap(), Value::Null);
    }

    #[test]
    fn unsupported_column_type_is_an_error() {
        assert!(Value::from_sql(&Type::NUMERIC, &[0, 0, 0, 0, 0, 0, 0, 0]).is_err());
    }

    #[test]
    fn whole_floats_narrow_to_integer_columns() {
        let mut buf = BytesMut::new();
        Value::Float(2.0).to_sql(&Type::INT4, &mut buf).unwrap();
        assert_eq!(buf.as_ref(), &2i32.to_be_bytes());

        let mut buf = BytesMut::new();
        Value::Float(-3.0).to_sql(&Type::INT8, &mut buf).unwrap();
        assert_eq!(buf.as_ref(), &(-3i64).to_be_bytes());
    }

    #[test]
    fn fractional_float_is_rejected_by_integer_columns() {
        let mut buf = BytesMut::new();
        assert!(Value::Float(1.5).to_sql_checked(&Type::INT8, &mut buf).is_err());
        assert!(Value::Float(f64::NAN).to_sql(&Type::INT4, &mut buf).is_err());
        assert!(Value::Float(1e300).to_sql(&Type::INT8, &mut buf).is_err());
        assert!(buf.is_empty());
    }

    #[test]
    fn mismatched_kinds_are_errors() {
        let mut buf = BytesMut::new();
        assert!(Value::Bool(true).to_sql(&Type::INT4, &mut buf).is_err());
        assert!(Value::Int(1).to_sql(&Type::UUID, &mut buf).is_err());
        assert!(Value::from("x").to_sql(&Type::INT4, &mut buf).is_err());
        assert!(Value::Uuid(Uuid::nil()).to_sql(&Type::TEXT, &mut buf).is_err());
        assert!(Value::Json(serde_json::json!({})).to_sql(&Type::INT8, &mut buf).is_err());
        assert!(Value::Timestamp(Utc::now()).to_sql(&Type::DATE, &mut buf).is_err());
        assert!(buf.is_empty());
    }
}
