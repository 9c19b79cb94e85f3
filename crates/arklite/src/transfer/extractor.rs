//! Cursor-based incremental extraction.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::core::schema::Schema;
use crate::core::traits::RowSource;
use crate::core::value::{RowTuple, SqlValue};
use crate::error::{CopyError, Result};
use crate::query::{QueryBuilder, SelectQuery};

use super::CopyStats;

/// Highest id observed so far; the exclusive lower bound of the next select.
///
/// Starts at `i64::MIN` so negative ids are copied. A row whose id is
/// exactly `i64::MIN` can never satisfy `id > cursor` and is not copied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor(i64);

impl Cursor {
    pub fn new() -> Self {
        Cursor(i64::MIN)
    }

    pub fn value(&self) -> i64 {
        self.0
    }

    /// Raise the cursor to `id` when it is larger.
    ///
    /// Returns `false` when `id` does not advance the cursor.
    pub fn observe(&mut self, id: i64) -> bool {
        if id > self.0 {
            self.0 = id;
            true
        } else {
            false
        }
    }
}

impl Default for Cursor {
    fn default() -> Self {
        Self::new()
    }
}

/// The extraction role: pages through the source by id and pushes each
/// decoded row into the handoff.
pub struct Extractor<'a> {
    source: &'a dyn RowSource,
    schema: &'a Schema,
    query: SelectQuery,
    cursor: Cursor,
    stats: Arc<CopyStats>,
}

impl<'a> Extractor<'a> {
    pub fn new(
        source: &'a dyn RowSource,
        schema: &'a Schema,
        read_batch_size: usize,
        stats: Arc<CopyStats>,
    ) -> Self {
        Self {
            source,
            schema,
            query: QueryBuilder::new(schema).select_statement(read_batch_size),
            cursor: Cursor::new(),
            stats,
        }
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    /// Read until a select returns fewer rows than the batch cap.
    ///
    /// Returns the number of rows handed off. If the receiving side closes
    /// early, extraction stops and returns the count so far; the write
    /// role's own result explains why.
    pub async fn run(&mut self, tx: &mpsc::Sender<RowTuple>) -> Result<u64> {
        let mut emitted = 0u64;
        let mut batch_num = 0u64;

        loop {
            let started = Instant::now();
            let rows = self
                .source
                .fetch_rows(&self.query, self.cursor.value(), &self.schema.columns)
                .await?;
            let row_count = rows.len();
            batch_num += 1;
            self.stats.record_read(row_count);

            let mut out_of_order = 0usize;
            for row in rows {
                let id = self.row_id(&row)?;
                if !self.cursor.observe(id) {
                    out_of_order += 1;
                }
                if tx.send(row).await.is_err() {
                    debug!(
                        "{}: handoff closed after {} rows, stopping extraction",
                        self.schema.table, emitted
                    );
                    return Ok(emitted);
                }
                emitted += 1;
            }

            if out_of_order > 0 {
                warn!(
                    "{}: read batch {} had {} rows whose id did not exceed the cursor; ids are expected to be unique",
                    self.schema.table, batch_num, out_of_order
                );
            }

            info!(
                "{}: read batch {} with {} rows in {:?} (cursor at {})",
                self.schema.table,
                batch_num,
                row_count,
                started.elapsed(),
                self.cursor.value()
            );

            if row_count < self.query.limit {
                break;
            }
        }

        info!(
            "{}: finished reading {} rows in {} batches",
            self.schema.table, emitted, batch_num
        );
        Ok(emitted)
    }

    fn row_id(&self, row: &RowTuple) -> Result<i64> {
        let value = row.get(self.schema.id_index()).unwrap_or(&SqlValue::Null);
        value.widen_id().ok_or_else(|| CopyError::UnsupportedIdType {
            column: self.schema.id_column.clone(),
            found: match value {
                SqlValue::U64(v) => format!("u64 value {} exceeds the signed 64-bit range", v),
                other => other.type_name().to_string(),
            },
        })
    }
}
