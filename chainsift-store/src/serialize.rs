//! Conversion between logical values and their SQLite representation.
//!
//! Only list fields transform: the logical `Value::List` becomes one TEXT
//! cell of comma-joined elements, with `\` escaping the delimiter and
//! itself so the encoding round-trips arbitrary element strings. Every
//! other kind maps 1:1 onto a SQLite storage class, and reads re-tag the
//! raw cell by the field's declared type.

use crate::error::{StoreError, StoreResult};
use chainsift_schema::{Field, FieldKind};
use chainsift_types::{ScalarType, Value};
use rusqlite::types::Value as SqlValue;

pub(crate) const LIST_DELIMITER: char = ',';
pub(crate) const LIST_ESCAPE: char = '\\';

/// SQLite column type for a scalar.
pub(crate) const fn sql_type(scalar: ScalarType) -> &'static str {
    match scalar {
        ScalarType::String => "TEXT",
        ScalarType::Int => "INTEGER",
        ScalarType::Float => "REAL",
        ScalarType::Boolean => "INTEGER",
        ScalarType::Bytes => "BLOB",
    }
}

/// The column-definition fragment for a field, or `None` for derived
/// fields, which have no physical column.
pub(crate) fn column_fragment(field: &Field) -> Option<String> {
    let name = field.name();
    let base = match field.kind() {
        FieldKind::Id => return Some(format!("\"{name}\" TEXT PRIMARY KEY NOT NULL")),
        FieldKind::Scalar { scalar } => sql_type(*scalar).to_string(),
        FieldKind::Enum { values } => {
            let labels = values
                .iter()
                .map(|v| format!("'{}'", v.replace('\'', "''")))
                .collect::<Vec<_>>()
                .join(", ");
            format!("TEXT CHECK (\"{name}\" IN ({labels}))")
        }
        FieldKind::List { .. } | FieldKind::Relationship { .. } => "TEXT".to_string(),
        FieldKind::Derived { .. } => return None,
    };
    let mut fragment = format!("\"{name}\" {base}");
    if !field.nullable() {
        fragment.push_str(" NOT NULL");
    }
    Some(fragment)
}

/// Converts a logical value into the physical form for `field`.
pub(crate) fn to_physical(field: &Field, value: &Value) -> StoreResult<SqlValue> {
    if value.is_null() {
        return Ok(SqlValue::Null);
    }
    match field.kind() {
        FieldKind::Id | FieldKind::Relationship { .. } => {
            let s = expect_str(field, "a string id", value)?;
            Ok(SqlValue::Text(s.to_string()))
        }
        FieldKind::Scalar { scalar } => scalar_to_physical(field, *scalar, value),
        FieldKind::Enum { values } => {
            let s = expect_str(field, "an enum label", value)?;
            if !values.iter().any(|v| v == s) {
                return Err(StoreError::InvalidEnumValue {
                    field: field.name().to_string(),
                    value: s.to_string(),
                });
            }
            Ok(SqlValue::Text(s.to_string()))
        }
        FieldKind::List { scalar } => {
            let items = value.as_list().ok_or_else(|| {
                mismatch(field, &format!("a list of {scalar}"), value)
            })?;
            encode_list(field, *scalar, items).map(SqlValue::Text)
        }
        FieldKind::Derived { .. } => Err(StoreError::InvalidValue {
            field: field.name().to_string(),
            expected: "a stored column".to_string(),
            got: "derived field".to_string(),
        }),
    }
}

fn scalar_to_physical(field: &Field, scalar: ScalarType, value: &Value) -> StoreResult<SqlValue> {
    match (scalar, value) {
        (ScalarType::String, Value::String(v)) => Ok(SqlValue::Text(v.clone())),
        (ScalarType::Int, Value::Int(v)) => Ok(SqlValue::Integer(*v)),
        (ScalarType::Float, Value::Float(v)) => Ok(SqlValue::Real(*v)),
        // Integer literals are accepted for float columns.
        (ScalarType::Float, Value::Int(v)) => Ok(SqlValue::Real(*v as f64)),
        (ScalarType::Boolean, Value::Bool(v)) => Ok(SqlValue::Integer(i64::from(*v))),
        (ScalarType::Bytes, Value::Bytes(v)) => Ok(SqlValue::Blob(v.clone())),
        _ => Err(mismatch(field, &scalar.to_string(), value)),
    }
}

/// Rehydrates a raw cell into the logical type declared for `field`.
pub(crate) fn to_logical(field: &Field, value: SqlValue) -> StoreResult<Value> {
    if matches!(value, SqlValue::Null) {
        return Ok(Value::Null);
    }
    match field.kind() {
        FieldKind::Id | FieldKind::Relationship { .. } | FieldKind::Enum { .. } => {
            expect_text(field, value).map(Value::String)
        }
        FieldKind::Scalar { scalar } => scalar_to_logical(field, *scalar, value),
        FieldKind::List { scalar } => {
            let encoded = expect_text(field, value)?;
            decode_list(field, *scalar, &encoded)
        }
        FieldKind::Derived { .. } => Err(StoreError::DecodeFailed {
            field: field.name().to_string(),
            reason: "derived fields have no stored value".to_string(),
        }),
    }
}

fn scalar_to_logical(field: &Field, scalar: ScalarType, value: SqlValue) -> StoreResult<Value> {
    match (scalar, value) {
        (ScalarType::String, SqlValue::Text(v)) => Ok(Value::String(v)),
        (ScalarType::Int, SqlValue::Integer(v)) => Ok(Value::Int(v)),
        (ScalarType::Float, SqlValue::Real(v)) => Ok(Value::Float(v)),
        (ScalarType::Float, SqlValue::Integer(v)) => Ok(Value::Float(v as f64)),
        (ScalarType::Boolean, SqlValue::Integer(v)) => Ok(Value::Bool(v != 0)),
        (ScalarType::Bytes, SqlValue::Blob(v)) => Ok(Value::Bytes(v)),
        (_, other) => Err(StoreError::DecodeFailed {
            field: field.name().to_string(),
            reason: format!("unexpected {} cell for {scalar} column", storage_class(&other)),
        }),
    }
}

/// Rehydrates a cell with no schema field, by storage class alone.
pub(crate) fn untyped_to_logical(value: SqlValue) -> Value {
    match value {
        SqlValue::Null => Value::Null,
        SqlValue::Integer(v) => Value::Int(v),
        SqlValue::Real(v) => Value::Float(v),
        SqlValue::Text(v) => Value::String(v),
        SqlValue::Blob(v) => Value::Bytes(v),
    }
}

// ── List encoding ────────────────────────────────────────────────

pub(crate) fn encode_list(field: &Field, scalar: ScalarType, items: &[Value]) -> StoreResult<String> {
    let mut parts = Vec::with_capacity(items.len());
    for item in items {
        if !element_matches(scalar, item) {
            return Err(mismatch(field, &format!("a list of {scalar}"), item));
        }
        let canonical = item
            .to_canonical_string()
            .ok_or_else(|| mismatch(field, &format!("a list of {scalar}"), item))?;
        parts.push(escape_element(&canonical));
    }
    Ok(parts.join(&LIST_DELIMITER.to_string()))
}

pub(crate) fn decode_list(field: &Field, scalar: ScalarType, encoded: &str) -> StoreResult<Value> {
    // An empty cell is the empty list; a list whose only element is the
    // empty string therefore normalizes to the empty list.
    if encoded.is_empty() {
        return Ok(Value::List(Vec::new()));
    }
    let mut items = Vec::new();
    for raw in split_elements(encoded) {
        let item = scalar.parse(&raw).map_err(|e| StoreError::DecodeFailed {
            field: field.name().to_string(),
            reason: e.to_string(),
        })?;
        items.push(item);
    }
    Ok(Value::List(items))
}

/// Escapes the delimiter and the escape character in one list element.
pub(crate) fn escape_element(element: &str) -> String {
    let mut out = String::with_capacity(element.len());
    for c in element.chars() {
        if c == LIST_ESCAPE || c == LIST_DELIMITER {
            out.push(LIST_ESCAPE);
        }
        out.push(c);
    }
    out
}

/// Splits an encoded cell back into raw element strings.
pub(crate) fn split_elements(encoded: &str) -> Vec<String> {
    let mut items = Vec::new();
    let mut current = String::new();
    let mut chars = encoded.chars();
    while let Some(c) = chars.next() {
        if c == LIST_ESCAPE {
            if let Some(next) = chars.next() {
                current.push(next);
            }
        } else if c == LIST_DELIMITER {
            items.push(std::mem::take(&mut current));
        } else {
            current.push(c);
        }
    }
    items.push(current);
    items
}

fn element_matches(scalar: ScalarType, value: &Value) -> bool {
    matches!(
        (scalar, value),
        (ScalarType::String, Value::String(_))
            | (ScalarType::Int, Value::Int(_))
            | (ScalarType::Float, Value::Float(_))
            | (ScalarType::Boolean, Value::Bool(_))
            | (ScalarType::Bytes, Value::Bytes(_))
    )
}

// ── Helpers ──────────────────────────────────────────────────────

fn expect_str<'a>(field: &Field, expected: &str, value: &'a Value) -> StoreResult<&'a str> {
    value.as_str().ok_or_else(|| mismatch(field, expected, value))
}

fn expect_text(field: &Field, value: SqlValue) -> StoreResult<String> {
    match value {
        SqlValue::Text(v) => Ok(v),
        other => Err(StoreError::DecodeFailed {
            field: field.name().to_string(),
            reason: format!("unexpected {} cell for text column", storage_class(&other)),
        }),
    }
}

fn mismatch(field: &Field, expected: &str, value: &Value) -> StoreError {
    StoreError::InvalidValue {
        field: field.name().to_string(),
        expected: expected.to_string(),
        got: value.type_name().to_string(),
    }
}

const fn storage_class(value: &SqlValue) -> &'static str {
    match value {
        SqlValue::Null => "NULL",
        SqlValue::Integer(_) => "INTEGER",
        SqlValue::Real(_) => "REAL",
        SqlValue::Text(_) => "TEXT",
        SqlValue::Blob(_) => "BLOB",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_round_trip() {
        let elements = ["plain", "with,comma", "back\\slash", "\\,both,\\"];
        let encoded = elements
            .iter()
            .map(|e| escape_element(e))
            .collect::<Vec<_>>()
            .join(",");
        assert_eq!(split_elements(&encoded), elements);
    }

    #[test]
    fn split_single_element() {
        assert_eq!(split_elements("abc"), vec!["abc"]);
    }

    #[test]
    fn split_preserves_empty_elements() {
        assert_eq!(split_elements(",a,"), vec!["", "a", ""]);
    }

    #[test]
    fn trailing_escape_is_dropped() {
        assert_eq!(split_elements("a\\"), vec!["a"]);
    }
}
