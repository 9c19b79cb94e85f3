//! SQL value types moved between the extraction and write roles.
//!
//! Every decoded cell becomes one [`SqlValue`]. Integer variants keep the
//! width and signedness the source reported, so nothing is widened until the
//! cursor needs a comparable id (see [`SqlValue::widen_id`]).

use rusqlite::types::{ToSql, ToSqlOutput, Value, ValueRef};

/// SQL value enum for type-safe row handling.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// NULL.
    Null,

    /// 8-bit signed integer (tinyint, bool).
    I8(i8),

    /// 16-bit signed integer (smallint).
    I16(i16),

    /// 32-bit signed integer (mediumint, int).
    I32(i32),

    /// 64-bit signed integer (bigint).
    I64(i64),

    /// 8-bit unsigned integer (tinyint unsigned).
    U8(u8),

    /// 16-bit unsigned integer (smallint unsigned, year).
    U16(u16),

    /// 32-bit unsigned integer (mediumint/int unsigned).
    U32(u32),

    /// 64-bit unsigned integer (bigint unsigned).
    U64(u64),

    /// 32-bit floating point (float).
    F32(f32),

    /// 64-bit floating point (double, decimal).
    F64(f64),

    /// Text data (char family, enum, set, json, temporal values).
    Text(String),

    /// Binary data (blob family, binary, varbinary).
    Bytes(Vec<u8>),
}

impl SqlValue {
    /// Check if this value is NULL.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    /// Widen an integer value into the 64-bit signed cursor domain.
    ///
    /// Returns `None` for non-integer values, NULL, and unsigned 64-bit
    /// values that do not fit in `i64`.
    #[must_use]
    pub fn widen_id(&self) -> Option<i64> {
        match self {
            SqlValue::I8(v) => Some(i64::from(*v)),
            SqlValue::I16(v) => Some(i64::from(*v)),
            SqlValue::I32(v) => Some(i64::from(*v)),
            SqlValue::I64(v) => Some(*v),
            SqlValue::U8(v) => Some(i64::from(*v)),
            SqlValue::U16(v) => Some(i64::from(*v)),
            SqlValue::U32(v) => Some(i64::from(*v)),
            SqlValue::U64(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    /// Short description of the variant, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            SqlValue::Null => "NULL",
            SqlValue::I8(_) => "i8",
            SqlValue::I16(_) => "i16",
            SqlValue::I32(_) => "i32",
            SqlValue::I64(_) => "i64",
            SqlValue::U8(_) => "u8",
            SqlValue::U16(_) => "u16",
            SqlValue::U32(_) => "u32",
            SqlValue::U64(_) => "u64",
            SqlValue::F32(_) => "f32",
            SqlValue::F64(_) => "f64",
            SqlValue::Text(_) => "text",
            SqlValue::Bytes(_) => "bytes",
        }
    }
}

impl ToSql for SqlValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        let out = match self {
            SqlValue::Null => ToSqlOutput::Owned(Value::Null),
            SqlValue::I8(v) => ToSqlOutput::Owned(Value::Integer(i64::from(*v))),
            SqlValue::I16(v) => ToSqlOutput::Owned(Value::Integer(i64::from(*v))),
            SqlValue::I32(v) => ToSqlOutput::Owned(Value::Integer(i64::from(*v))),
            SqlValue::I64(v) => ToSqlOutput::Owned(Value::Integer(*v)),
            SqlValue::U8(v) => ToSqlOutput::Owned(Value::Integer(i64::from(*v))),
            SqlValue::U16(v) => ToSqlOutput::Owned(Value::Integer(i64::from(*v))),
            SqlValue::U32(v) => ToSqlOutput::Owned(Value::Integer(i64::from(*v))),
            // SQLite integers are signed 64-bit; larger values keep every digit as text.
            SqlValue::U64(v) => match i64::try_from(*v) {
                Ok(n) => ToSqlOutput::Owned(Value::Integer(n)),
                Err(_) => ToSqlOutput::Owned(Value::Text(v.to_string())),
            },
            SqlValue::F32(v) => ToSqlOutput::Owned(Value::Real(f64::from(*v))),
            SqlValue::F64(v) => ToSqlOutput::Owned(Value::Real(*v)),
            SqlValue::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            SqlValue::Bytes(b) => ToSqlOutput::Borrowed(ValueRef::Blob(b)),
        };
        Ok(out)
    }
}

impl From<i8> for SqlValue {
    fn from(v: i8) -> Self {
        SqlValue::I8(v)
    }
}

impl From<i16> for SqlValue {
    fn from(v: i16) -> Self {
        SqlValue::I16(v)
    }
}

impl From<i32> for SqlValue {
    fn from(v: i32) -> Self {
        SqlValue::I32(v)
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::I64(v)
    }
}

impl From<u64> for SqlValue {
    fn from(v: u64) -> Self {
        SqlValue::U64(v)
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        SqlValue::F64(v)
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_string())
    }
}

impl From<Vec<u8>> for SqlValue {
    fn from(v: Vec<u8>) -> Self {
        SqlValue::Bytes(v)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(SqlValue::Null, Into::into)
    }
}

/// One decoded source row, in schema column order.
pub type RowTuple = Vec<SqlValue>;
