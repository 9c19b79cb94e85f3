//! MySQL/MariaDB source reader.
//!
//! Implements [`RowSource`] on top of an SQLx pool. The extraction role is the
//! only caller, so the pool holds a single connection.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions, MySqlRow, MySqlSslMode};
use sqlx::{Column, Executor, MySql, Row, Statement, Type, TypeInfo, ValueRef};
use tracing::{debug, info};

use crate::config::SourceConfig;
use crate::core::schema::{ColumnInfo, ProbedColumn};
use crate::core::traits::{Dialect, RowSource};
use crate::core::value::{RowTuple, SqlValue};
use crate::error::{CopyError, Result};
use crate::query::SelectQuery;

use super::MysqlDialect;

/// Connection pool timeout.
const POOL_CONNECTION_TIMEOUT: Duration = Duration::from_secs(30);

/// Temporal values are handed to SQLite as text in this layout.
const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M:%S%.f";
const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// How one source column is turned into a [`SqlValue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnDecoder {
    /// TINYINT(1), which the driver names BOOLEAN without its signedness.
    Tiny,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    Year,
    F32,
    F64,
    Decimal,
    Date,
    Time,
    DateTime,
    Text,
    Bytes,
    Fallback,
}

impl ColumnDecoder {
    /// Pick a decoder from a declared type name such as "BIGINT UNSIGNED".
    fn for_type(type_name: &str) -> Self {
        let upper = type_name.to_ascii_uppercase();
        let unsigned = upper.contains("UNSIGNED");
        let base = upper.split_whitespace().next().unwrap_or("");

        match (base, unsigned) {
            ("BOOLEAN" | "BOOL", _) => ColumnDecoder::Tiny,
            ("TINYINT", false) => ColumnDecoder::I8,
            ("TINYINT", true) => ColumnDecoder::U8,
            ("SMALLINT", false) => ColumnDecoder::I16,
            ("SMALLINT", true) => ColumnDecoder::U16,
            ("MEDIUMINT" | "INT" | "INTEGER", false) => ColumnDecoder::I32,
            ("MEDIUMINT" | "INT" | "INTEGER", true) => ColumnDecoder::U32,
            ("BIGINT", false) => ColumnDecoder::I64,
            ("BIGINT", true) => ColumnDecoder::U64,
            ("YEAR", _) => ColumnDecoder::Year,
            ("FLOAT", _) => ColumnDecoder::F32,
            ("DOUBLE" | "REAL", _) => ColumnDecoder::F64,
            ("DECIMAL" | "NUMERIC", _) => ColumnDecoder::Decimal,
            ("DATE", _) => ColumnDecoder::Date,
            ("TIME", _) => ColumnDecoder::Time,
            ("DATETIME" | "TIMESTAMP", _) => ColumnDecoder::DateTime,
            (
                "CHAR" | "VARCHAR" | "TEXT" | "TINYTEXT" | "MEDIUMTEXT" | "LONGTEXT" | "ENUM"
                | "SET" | "JSON",
                _,
            ) => ColumnDecoder::Text,
            (
                "BINARY" | "VARBINARY" | "BLOB" | "TINYBLOB" | "MEDIUMBLOB" | "LONGBLOB" | "BIT",
                _,
            ) => ColumnDecoder::Bytes,
            _ => ColumnDecoder::Fallback,
        }
    }

    fn decode(self, row: &MySqlRow, idx: usize) -> std::result::Result<SqlValue, sqlx::Error> {
        let raw = row.try_get_raw(idx)?;
        if raw.is_null() {
            return Ok(SqlValue::Null);
        }
        let unsigned = <u8 as Type<MySql>>::compatible(&raw.type_info());

        let value = match self {
            ColumnDecoder::Tiny => tiny_value(row.try_get_unchecked(idx)?, unsigned),
            ColumnDecoder::I8 => SqlValue::I8(row.try_get(idx)?),
            ColumnDecoder::I16 => SqlValue::I16(row.try_get(idx)?),
            ColumnDecoder::I32 => SqlValue::I32(row.try_get(idx)?),
            ColumnDecoder::I64 => SqlValue::I64(row.try_get(idx)?),
            ColumnDecoder::U8 => SqlValue::U8(row.try_get(idx)?),
            ColumnDecoder::U16 => SqlValue::U16(row.try_get(idx)?),
            ColumnDecoder::U32 => SqlValue::U32(row.try_get(idx)?),
            ColumnDecoder::U64 => SqlValue::U64(row.try_get(idx)?),
            // YEAR arrives as a 2-byte integer but is not type-compatible with u16
            ColumnDecoder::Year => SqlValue::U16(row.try_get_unchecked(idx)?),
            ColumnDecoder::F32 => SqlValue::F32(row.try_get(idx)?),
            ColumnDecoder::F64 => SqlValue::F64(row.try_get(idx)?),
            ColumnDecoder::Decimal => SqlValue::F64(Self::decimal_as_f64(row, idx)?),
            ColumnDecoder::Date => SqlValue::Text(
                row.try_get::<NaiveDate, _>(idx)?
                    .format(DATE_FORMAT)
                    .to_string(),
            ),
            ColumnDecoder::Time => SqlValue::Text(
                row.try_get::<NaiveTime, _>(idx)?
                    .format(TIME_FORMAT)
                    .to_string(),
            ),
            ColumnDecoder::DateTime => SqlValue::Text(
                row.try_get::<NaiveDateTime, _>(idx)?
                    .format(DATETIME_FORMAT)
                    .to_string(),
            ),
            ColumnDecoder::Text => SqlValue::Text(row.try_get_unchecked(idx)?),
            ColumnDecoder::Bytes => SqlValue::Bytes(row.try_get_unchecked(idx)?),
            ColumnDecoder::Fallback => {
                let bytes: Vec<u8> = row.try_get_unchecked(idx)?;
                match String::from_utf8(bytes) {
                    Ok(s) => SqlValue::Text(s),
                    Err(e) => SqlValue::Bytes(e.into_bytes()),
                }
            }
        };
        Ok(value)
    }

    /// DECIMAL beyond `Decimal`'s 28 digits falls back to parsing the wire text.
    fn decimal_as_f64(row: &MySqlRow, idx: usize) -> std::result::Result<f64, sqlx::Error> {
        if let Ok(d) = row.try_get::<Decimal, _>(idx) {
            if let Some(f) = d.to_f64() {
                return Ok(f);
            }
        }
        let text: String = row.try_get_unchecked(idx)?;
        text.trim()
            .parse::<f64>()
            .map_err(|e| sqlx::Error::Decode(Box::new(e)))
    }
}

/// Keep the stored byte of a TINYINT(1) as a number, never a truth value.
fn tiny_value(raw: i8, unsigned: bool) -> SqlValue {
    if unsigned {
        SqlValue::U8(raw as u8)
    } else {
        SqlValue::I8(raw)
    }
}

/// MySQL/MariaDB source reader implementation.
pub struct MysqlReader {
    pool: MySqlPool,
    dialect: MysqlDialect,
}

impl MysqlReader {
    /// Connect to the source database and verify the connection.
    pub async fn connect(config: &SourceConfig) -> Result<Self> {
        // Default to Preferred SSL mode for source connections
        let mut options = MySqlConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .database(&config.database)
            .username(&config.user)
            .ssl_mode(MySqlSslMode::Preferred);
        if let Some(ref password) = config.password {
            options = options.password(password);
        }

        let pool = MySqlPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(POOL_CONNECTION_TIMEOUT)
            .connect_with(options)
            .await
            .map_err(|e| CopyError::source_query(e, "connecting to MySQL"))?;

        // Test connection
        sqlx::query("SELECT 1")
            .fetch_one(&pool)
            .await
            .map_err(|e| CopyError::source_query(e, "testing MySQL connection"))?;

        info!(
            "Connected to MySQL source: {}:{}/{}",
            config.host, config.port, config.database
        );

        Ok(Self {
            pool,
            dialect: MysqlDialect::new(),
        })
    }

    fn decode_row(
        row: &MySqlRow,
        decoders: &[ColumnDecoder],
        columns: &[ColumnInfo],
    ) -> Result<RowTuple> {
        decoders
            .iter()
            .zip(columns)
            .enumerate()
            .map(|(idx, (decoder, col))| {
                decoder.decode(row, idx).map_err(|e| {
                    CopyError::source_query(
                        e,
                        format!("decoding column '{}' ({})", col.name, col.source_type),
                    )
                })
            })
            .collect()
    }
}

#[async_trait]
impl RowSource for MysqlReader {
    async fn probe_columns(&self, table: &str) -> Result<Vec<ProbedColumn>> {
        // Preparing a never-true query returns column metadata without rows
        let sql = format!(
            "SELECT * FROM {} WHERE 1 = 0 LIMIT 1",
            self.dialect.quote_ident(table)
        );
        debug!("Probing columns: {}", sql);

        let stmt = (&self.pool)
            .prepare(sql.as_str())
            .await
            .map_err(|e| CopyError::source_query(e, format!("probing table '{}'", table)))?;

        Ok(stmt
            .columns()
            .iter()
            .map(|c| ProbedColumn::new(c.name(), c.type_info().name()))
            .collect())
    }

    async fn fetch_rows(
        &self,
        query: &SelectQuery,
        cursor: i64,
        columns: &[ColumnInfo],
    ) -> Result<Vec<RowTuple>> {
        let rows: Vec<MySqlRow> = sqlx::query(&query.sql)
            .bind(cursor)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| CopyError::source_query(e, format!("selecting rows after id {}", cursor)))?;

        let decoders: Vec<ColumnDecoder> = columns
            .iter()
            .map(|c| ColumnDecoder::for_type(&c.source_type))
            .collect();

        rows.iter()
            .map(|row| Self::decode_row(row, &decoders, columns))
            .collect()
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
