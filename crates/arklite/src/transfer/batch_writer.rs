//! Transactional bulk insert into the destination.
//!
//! The writer is synchronous: rusqlite has no async API, so the copy runs it
//! on the blocking thread pool.

use std::sync::Arc;
use std::time::Instant;

use rusqlite::{params_from_iter, Connection};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::core::value::RowTuple;
use crate::error::{CopyError, Result};

use super::CopyStats;

/// The write role: groups tuples into batches and commits one transaction
/// per batch.
pub struct BatchWriter {
    conn: Connection,
    insert_sql: String,
    batch_size: usize,
    batch: Vec<RowTuple>,
    stats: Arc<CopyStats>,
    abort: CancellationToken,
}

impl BatchWriter {
    pub fn new(
        conn: Connection,
        insert_sql: impl Into<String>,
        batch_size: usize,
        stats: Arc<CopyStats>,
        abort: CancellationToken,
    ) -> Self {
        Self {
            conn,
            insert_sql: insert_sql.into(),
            batch_size,
            batch: Vec::with_capacity(batch_size),
            stats,
            abort,
        }
    }

    /// Buffer one tuple, committing the batch once it is full.
    pub fn push(&mut self, row: RowTuple) -> Result<()> {
        self.batch.push(row);
        if self.batch.len() >= self.batch_size {
            self.flush()?;
        }
        Ok(())
    }

    /// Commit the final, possibly short, batch and release the connection.
    ///
    /// After an abort the buffered tuples are discarded instead.
    pub fn finish(mut self) -> Result<Connection> {
        if self.abort.is_cancelled() {
            debug!(
                "Copy aborted, discarding {} buffered rows after {} transactions",
                self.batch.len(),
                self.stats.write_batches()
            );
            return Ok(self.conn);
        }

        self.flush()?;
        info!(
            "Finished writing {} rows in {} transactions",
            self.stats.rows_written(),
            self.stats.write_batches()
        );
        Ok(self.conn)
    }

    /// Drain the handoff until it is closed, then commit what remains.
    ///
    /// Must be called from a blocking context.
    pub fn run(mut self, mut rx: mpsc::Receiver<RowTuple>) -> Result<Connection> {
        while let Some(row) = rx.blocking_recv() {
            if self.abort.is_cancelled() {
                debug!("Copy aborted, discarding {} buffered rows", self.batch.len());
                return Ok(self.conn);
            }
            self.push(row)?;
        }
        self.finish()
    }

    /// Insert the buffered tuples in one transaction.
    ///
    /// A failed insert rolls the whole batch back. An empty batch commits
    /// nothing.
    fn flush(&mut self) -> Result<()> {
        if self.batch.is_empty() {
            return Ok(());
        }

        let started = Instant::now();
        let batch_num = self.stats.write_batches() + 1;
        let row_count = self.batch.len();

        let tx = self
            .conn
            .transaction()
            .map_err(|e| CopyError::destination(e, format!("beginning batch {}", batch_num)))?;
        {
            let mut stmt = tx
                .prepare_cached(&self.insert_sql)
                .map_err(|e| CopyError::destination(e, "preparing insert statement"))?;
            for row in &self.batch {
                stmt.execute(params_from_iter(row.iter())).map_err(|e| {
                    CopyError::destination(e, format!("inserting batch {}", batch_num))
                })?;
            }
        }

        // Dropping the transaction rolls it back
        if self.abort.is_cancelled() {
            debug!("Copy aborted, rolling back batch {}", batch_num);
            drop(tx);
            self.batch.clear();
            return Ok(());
        }

        tx.commit()
            .map_err(|e| CopyError::destination(e, format!("committing batch {}", batch_num)))?;
        self.batch.clear();
        self.stats.record_write(row_count);

        debug!(
            "Committed batch {}: {} rows in {:?}",
            batch_num,
            row_count,
            started.elapsed()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::value::SqlValue;

    const INSERT: &str = "INSERT INTO t (id, name) VALUES (?, ?)";

    fn dest() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute(
            "CREATE TABLE t (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT)",
            [],
        )
        .unwrap();
        conn
    }

    fn row(id: i64) -> RowTuple {
        vec![SqlValue::I64(id), SqlValue::Text(format!("row-{}", id))]
    }

    fn count(conn: &Connection) -> i64 {
        conn.query_row("SELECT COUNT(*) FROM t", [], |r| r.get(0))
            .unwrap()
    }

    #[test]
    fn test_batch_count_is_ceiling() {
        for (rows, batch, expected) in [(10, 4, 3), (8, 4, 2), (1, 4, 1), (0, 4, 0), (5, 1, 5)] {
            let stats = Arc::new(CopyStats::default());
            let mut writer =
                BatchWriter::new(dest(), INSERT, batch, stats.clone(), CancellationToken::new());
            for id in 1..=rows {
                writer.push(row(id)).unwrap();
            }
            let conn = writer.finish().unwrap();

            assert_eq!(stats.write_batches(), expected, "{} rows / {}", rows, batch);
            assert_eq!(stats.rows_written(), rows as u64);
            assert_eq!(count(&conn), rows);
        }
    }

    #[test]
    fn test_full_batches_commit_before_finish() {
        let stats = Arc::new(CopyStats::default());
        let mut writer =
            BatchWriter::new(dest(), INSERT, 3, stats.clone(), CancellationToken::new());
        for id in 1..=7 {
            writer.push(row(id)).unwrap();
        }
        assert_eq!(stats.write_batches(), 2);
        assert_eq!(stats.rows_written(), 6);

        writer.finish().unwrap();
        assert_eq!(stats.write_batches(), 3);
        assert_eq!(stats.rows_written(), 7);
    }

    #[test]
    fn test_failed_batch_rolls_back_entirely() {
        let stats = Arc::new(CopyStats::default());
        let mut writer =
            BatchWriter::new(dest(), INSERT, 3, stats.clone(), CancellationToken::new());
        for id in [1, 2, 3, 4, 5] {
            writer.push(row(id)).unwrap();
        }
        // Duplicate primary key inside the second batch
        let err = writer.push(row(4)).unwrap_err();
        assert!(matches!(err, CopyError::DestinationWrite { .. }));
        assert_eq!(stats.write_batches(), 1);
        assert_eq!(count(&writer.conn), 3);
    }

    #[test]
    fn test_values_bind_with_native_storage_classes() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute("CREATE TABLE v (a INTEGER, b REAL, c TEXT, d BLOB, e TEXT)", [])
            .unwrap();
        let mut writer = BatchWriter::new(
            conn,
            "INSERT INTO v (a, b, c, d, e) VALUES (?, ?, ?, ?, ?)",
            10,
            Arc::new(CopyStats::default()),
            CancellationToken::new(),
        );
        writer
            .push(vec![
                SqlValue::U32(7),
                SqlValue::F64(1.25),
                SqlValue::from("hi"),
                SqlValue::Bytes(vec![0, 255]),
                SqlValue::Null,
            ])
            .unwrap();
        let conn = writer.finish().unwrap();

        let types: (String, String, String, String, String) = conn
            .query_row(
                "SELECT typeof(a), typeof(b), typeof(c), typeof(d), typeof(e) FROM v",
                [],
                |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?, r.get(4)?)),
            )
            .unwrap();
        assert_eq!(
            types,
            (
                "integer".into(),
                "real".into(),
                "text".into(),
                "blob".into(),
                "null".into()
            )
        );
    }

    #[test]
    fn test_run_drains_closed_handoff() {
        let stats = Arc::new(CopyStats::default());
        let writer = BatchWriter::new(dest(), INSERT, 2, stats.clone(), CancellationToken::new());
        let (tx, rx) = mpsc::channel(16);
        for id in 1..=5 {
            tx.try_send(row(id)).unwrap();
        }
        drop(tx);

        let conn = writer.run(rx).unwrap();
        assert_eq!(count(&conn), 5);
        assert_eq!(stats.write_batches(), 3);
    }

    #[test]
    fn test_abort_skips_pending_commits() {
        let stats = Arc::new(CopyStats::default());
        let abort = CancellationToken::new();
        let mut writer = BatchWriter::new(dest(), INSERT, 2, stats.clone(), abort.clone());
        writer.push(row(1)).unwrap();
        writer.push(row(2)).unwrap();
        writer.push(row(3)).unwrap();

        abort.cancel();
        let conn = writer.finish().unwrap();
        assert_eq!(count(&conn), 2);
        assert_eq!(stats.write_batches(), 1);
    }

    #[test]
    fn test_finish_after_abort_discards_buffered_rows() {
        let stats = Arc::new(CopyStats::default());
        let abort = CancellationToken::new();
        let mut writer = BatchWriter::new(dest(), INSERT, 3, stats.clone(), abort.clone());
        for id in [1, 2, 3, 4] {
            writer.push(row(id)).unwrap();
        }
        // Would fail on the primary key if the final batch were inserted
        writer.push(row(4)).unwrap();

        abort.cancel();
        let conn = writer.finish().unwrap();
        assert_eq!(count(&conn), 3);
        assert_eq!(stats.write_batches(), 1);
        assert_eq!(stats.rows_written(), 3);
    }
}
