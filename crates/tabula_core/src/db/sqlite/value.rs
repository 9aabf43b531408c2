//! JSON <-> SQLite value mapping.

use crate::db::{DbError, DbResult};
use rusqlite::types::{Value as SqlValue, ValueRef};
use serde_json::{Number, Value};

/// Maps a JSON value to a bindable SQLite value.
///
/// Booleans become 0/1; arrays and objects are stored as JSON text.
///
/// # Errors
/// - `DbError::InvalidData` for unsigned integers above `i64::MAX`, which
///   SQLite cannot store without loss.
pub(crate) fn to_sql(value: &Value) -> DbResult<SqlValue> {
    let mapped = match value {
        Value::Null => SqlValue::Null,
        Value::Bool(flag) => SqlValue::Integer(i64::from(*flag)),
        Value::Number(number) => number_to_sql(number)?,
        Value::String(text) => SqlValue::Text(text.clone()),
        Value::Array(_) | Value::Object(_) => SqlValue::Text(value.to_string()),
    };
    Ok(mapped)
}

fn number_to_sql(number: &Number) -> DbResult<SqlValue> {
    if let Some(integer) = number.as_i64() {
        return Ok(SqlValue::Integer(integer));
    }
    if number.is_u64() {
        return Err(DbError::InvalidData(format!(
            "integer {number} exceeds the 64-bit signed range"
        )));
    }
    Ok(number.as_f64().map_or(SqlValue::Null, SqlValue::Real))
}

/// Maps a column value read from SQLite to JSON.
///
/// Non-finite reals become `null`; blobs become arrays of byte values.
pub(crate) fn from_sql(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(integer) => Value::from(integer),
        ValueRef::Real(real) => Number::from_f64(real).map_or(Value::Null, Value::Number),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::Array(bytes.iter().map(|b| Value::from(*b)).collect()),
    }
}

#[cfg(test)]
mod tests {
    use super::{from_sql, to_sql};
    use crate::db::DbError;
    use rusqlite::types::{Value as SqlValue, ValueRef};
    use serde_json::{json, Value};

    #[test]
    fn booleans_and_nested_values_are_flattened() {
        assert_eq!(to_sql(&json!(true)).unwrap(), SqlValue::Integer(1));
        assert_eq!(to_sql(&json!(false)).unwrap(), SqlValue::Integer(0));
        assert_eq!(
            to_sql(&json!({"a": [1, 2]})).unwrap(),
            SqlValue::Text("{\"a\":[1,2]}".to_string())
        );
    }

    #[test]
    fn numbers_keep_integer_or_real_storage() {
        assert_eq!(to_sql(&json!(42)).unwrap(), SqlValue::Integer(42));
        assert_eq!(to_sql(&json!(-7)).unwrap(), SqlValue::Integer(-7));
        assert_eq!(to_sql(&json!(i64::MAX)).unwrap(), SqlValue::Integer(i64::MAX));
        assert_eq!(to_sql(&json!(1.5)).unwrap(), SqlValue::Real(1.5));
    }

    #[test]
    fn unsigned_values_beyond_i64_are_rejected() {
        let too_large = json!(u64::MAX);
        assert!(matches!(to_sql(&too_large), Err(DbError::InvalidData(_))));
        assert!(matches!(
            to_sql(&json!(i64::MAX as u64 + 1)),
            Err(DbError::InvalidData(_))
        ));
    }

    #[test]
    fn reads_every_storage_class() {
        assert_eq!(from_sql(ValueRef::Null), Value::Null);
        assert_eq!(from_sql(ValueRef::Integer(7)), json!(7));
        assert_eq!(from_sql(ValueRef::Real(2.5)), json!(2.5));
        assert_eq!(from_sql(ValueRef::Real(f64::NAN)), Value::Null);
        assert_eq!(from_sql(ValueRef::Text(b"ada")), json!("ada"));
        assert_eq!(from_sql(ValueRef::Blob(&[1, 255])), json!([1, 255]));
    }
}
