//! Copy pipeline: one extraction role and one write role joined by a
//! bounded handoff.
//!
//! The extraction role runs on the async runtime and pages through the
//! source by id. The write role runs on the blocking pool, because rusqlite
//! is synchronous, and commits one transaction per write batch. The handoff
//! applies backpressure when the destination falls behind.

mod batch_writer;
mod extractor;
#[cfg(test)]
pub(crate) mod testing;

pub use batch_writer::BatchWriter;
pub use extractor::{Cursor, Extractor};

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rusqlite::Connection;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, info_span, Instrument, Span};

use crate::core::schema::Schema;
use crate::core::traits::RowSource;
use crate::drivers::sqlite::SqliteTarget;
use crate::error::{CopyError, Result};
use crate::query::QueryBuilder;

/// Default rows per source select.
pub const DEFAULT_READ_BATCH_SIZE: usize = 100_000;

/// Default rows per destination transaction.
pub const DEFAULT_WRITE_BATCH_SIZE: usize = 10_000;

/// Handoff capacity as a multiple of the write batch size.
const HANDOFF_BATCHES: usize = 10;

/// Batch sizing for one copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyOptions {
    /// Row cap of each source select.
    pub read_batch_size: usize,
    /// Rows per destination transaction.
    pub write_batch_size: usize,
    /// Tuples buffered between the two roles.
    pub handoff_capacity: usize,
}

impl CopyOptions {
    pub fn new(read_batch_size: usize, write_batch_size: usize) -> Self {
        Self {
            read_batch_size,
            write_batch_size,
            handoff_capacity: write_batch_size.saturating_mul(HANDOFF_BATCHES),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.read_batch_size == 0 {
            return Err(CopyError::Config("read batch size must be at least 1".into()));
        }
        if self.write_batch_size == 0 {
            return Err(CopyError::Config("write batch size must be at least 1".into()));
        }
        if self.handoff_capacity == 0 {
            return Err(CopyError::Config("handoff capacity must be at least 1".into()));
        }
        Ok(())
    }
}

impl Default for CopyOptions {
    fn default() -> Self {
        Self::new(DEFAULT_READ_BATCH_SIZE, DEFAULT_WRITE_BATCH_SIZE)
    }
}

/// Counters shared by both roles.
#[derive(Debug, Default)]
pub struct CopyStats {
    rows_read: AtomicU64,
    read_batches: AtomicU64,
    rows_written: AtomicU64,
    write_batches: AtomicU64,
}

impl CopyStats {
    pub(crate) fn record_read(&self, rows: usize) {
        self.rows_read.fetch_add(rows as u64, Ordering::Relaxed);
        self.read_batches.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_write(&self, rows: usize) {
        self.rows_written.fetch_add(rows as u64, Ordering::Relaxed);
        self.write_batches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn rows_read(&self) -> u64 {
        self.rows_read.load(Ordering::Relaxed)
    }

    pub fn read_batches(&self) -> u64 {
        self.read_batches.load(Ordering::Relaxed)
    }

    pub fn rows_written(&self) -> u64 {
        self.rows_written.load(Ordering::Relaxed)
    }

    /// Committed destination transactions.
    pub fn write_batches(&self) -> u64 {
        self.write_batches.load(Ordering::Relaxed)
    }
}

/// Outcome of a completed copy.
#[derive(Debug, Clone, PartialEq)]
pub struct CopySummary {
    pub rows_read: u64,
    pub rows_written: u64,
    pub write_batches: u64,
    pub duration: Duration,
}

impl CopySummary {
    pub fn rows_per_sec(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs > 0.0 {
            self.rows_written as f64 / secs
        } else {
            0.0
        }
    }
}

/// Copies one table from a [`RowSource`] into a fresh SQLite table.
///
/// Lifecycle: [`create_destination_table`](Self::create_destination_table),
/// then [`copy`](Self::copy), then [`wait`](Self::wait). [`run`](Self::run)
/// does all three.
pub struct Copier {
    source: Arc<dyn RowSource>,
    schema: Schema,
    options: CopyOptions,
    target: Option<SqliteTarget>,
    table_created: bool,
    stats: Arc<CopyStats>,
    abort: CancellationToken,
    span: Span,
    started: Option<Instant>,
    writer: Option<JoinHandle<Result<Connection>>>,
    extraction: Option<Result<u64>>,
}

impl Copier {
    pub fn new(
        source: Arc<dyn RowSource>,
        schema: Schema,
        target: SqliteTarget,
        options: CopyOptions,
    ) -> Result<Self> {
        options.validate()?;
        let span = info_span!("copy", table = %schema.table);
        Ok(Self {
            source,
            schema,
            options,
            target: Some(target),
            table_created: false,
            stats: Arc::new(CopyStats::default()),
            abort: CancellationToken::new(),
            span,
            started: None,
            writer: None,
            extraction: None,
        })
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Live counters, readable while the copy runs.
    pub fn stats(&self) -> Arc<CopyStats> {
        self.stats.clone()
    }

    /// Create the destination table. Must run once, before [`copy`](Self::copy).
    pub fn create_destination_table(&mut self) -> Result<()> {
        if self.table_created {
            return Err(CopyError::Config(
                "destination table has already been created".into(),
            ));
        }
        let target = self
            .target
            .as_ref()
            .ok_or_else(|| CopyError::Config("destination is already in use".into()))?;

        let ddl = QueryBuilder::new(&self.schema).create_table_statement();
        let _guard = self.span.enter();
        target.execute_ddl(&ddl)?;
        info!("Created destination table {}", self.schema.table);
        self.table_created = true;
        Ok(())
    }

    /// Start the write role and run extraction to completion.
    ///
    /// Role failures are reported by [`wait`](Self::wait). An extraction
    /// failure cancels the write role before its next commit.
    pub async fn copy(&mut self) -> Result<()> {
        if !self.table_created {
            return Err(CopyError::Config(
                "destination table must be created before copying".into(),
            ));
        }
        let target = self
            .target
            .take()
            .ok_or_else(|| CopyError::Config("copy has already been started".into()))?;

        self.started = Some(Instant::now());
        info!(
            parent: &self.span,
            "Copying {} (read batch {}, write batch {}, handoff {})",
            self.schema.table,
            self.options.read_batch_size,
            self.options.write_batch_size,
            self.options.handoff_capacity
        );

        let (tx, rx) = mpsc::channel(self.options.handoff_capacity);

        let writer = BatchWriter::new(
            target.into_connection(),
            QueryBuilder::new(&self.schema).insert_statement(),
            self.options.write_batch_size,
            self.stats.clone(),
            self.abort.clone(),
        );
        let span = self.span.clone();
        self.writer = Some(tokio::task::spawn_blocking(move || {
            let _guard = span.enter();
            writer.run(rx)
        }));

        let mut extractor = Extractor::new(
            self.source.as_ref(),
            &self.schema,
            self.options.read_batch_size,
            self.stats.clone(),
        );
        let result = extractor
            .run(&tx)
            .instrument(self.span.clone())
            .await;
        if result.is_err() {
            self.abort.cancel();
        }
        // Closing the handoff lets the write role drain and finish
        drop(tx);

        self.extraction = Some(result);
        Ok(())
    }

    /// Block until both roles have finished.
    ///
    /// An extraction error takes precedence over the write role's result.
    pub async fn wait(&mut self) -> Result<CopySummary> {
        let writer = self
            .writer
            .take()
            .ok_or_else(|| CopyError::Config("copy has not been started".into()))?;

        let written = writer
            .await
            .map_err(|e| CopyError::Task(format!("write role failed: {}", e)));

        if let Some(Err(e)) = self.extraction.take() {
            return Err(e);
        }
        written??;

        let summary = CopySummary {
            rows_read: self.stats.rows_read(),
            rows_written: self.stats.rows_written(),
            write_batches: self.stats.write_batches(),
            duration: self.started.map(|s| s.elapsed()).unwrap_or_default(),
        };
        info!(
            parent: &self.span,
            "Copied {} rows in {:?} ({:.0} rows/sec, {} transactions)",
            summary.rows_written,
            summary.duration,
            summary.rows_per_sec(),
            summary.write_batches
        );
        Ok(summary)
    }

    /// Create the table, copy every row and wait for both roles.
    pub async fn run(&mut self) -> Result<CopySummary> {
        self.create_destination_table()?;
        self.copy().await?;
        self.wait().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::SchemaOptions;
    use crate::core::value::SqlValue;
    use crate::transfer::testing::MemorySource;

    fn copier(source: &Arc<MemorySource>, schema: Schema, path: &std::path::Path, opts: CopyOptions) -> Copier {
        let target = SqliteTarget::create(path, false).unwrap();
        Copier::new(source.clone(), schema, target, opts).unwrap()
    }

    fn open(path: &std::path::Path) -> Connection {
        Connection::open(path).unwrap()
    }

    #[tokio::test]
    async fn test_three_row_scenario() {
        let source = Arc::new(MemorySource::new(
            vec![("id", "INT"), ("name", "VARCHAR"), ("amount", "DECIMAL")],
            vec![
                vec![SqlValue::I32(1), SqlValue::from("a"), SqlValue::F64(1.5)],
                vec![SqlValue::I32(2), SqlValue::from("b"), SqlValue::F64(2.5)],
                vec![SqlValue::I32(3), SqlValue::from("c"), SqlValue::F64(3.5)],
            ],
        ));
        let schema = source.schema().await;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.db");

        let summary = copier(&source, schema, &path, CopyOptions::new(2, 2))
            .run()
            .await
            .unwrap();
        assert_eq!(summary.rows_read, 3);
        assert_eq!(summary.rows_written, 3);
        assert_eq!(summary.write_batches, 2);

        let conn = open(&path);
        let ddl: String = conn
            .query_row("SELECT sql FROM sqlite_master WHERE name = 't'", [], |r| r.get(0))
            .unwrap();
        assert_eq!(
            ddl,
            "CREATE TABLE t (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT, amount REAL)"
        );
        let rows: Vec<(i64, String, f64)> = conn
            .prepare("SELECT id, name, amount FROM t ORDER BY id")
            .unwrap()
            .query_map([], |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)))
            .unwrap()
            .collect::<rusqlite::Result<_>>()
            .unwrap();
        assert_eq!(
            rows,
            vec![(1, "a".into(), 1.5), (2, "b".into(), 2.5), (3, "c".into(), 3.5)]
        );
    }

    #[tokio::test]
    async fn test_large_copy_has_no_loss_or_duplication() {
        let ids: Vec<i64> = (1..=1000).rev().map(|i| i * 3 - 1500).collect();
        let source = Arc::new(MemorySource::numbered(&ids));
        let schema = source.schema().await;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.db");

        let summary = copier(&source, schema, &path, CopyOptions::new(64, 100))
            .run()
            .await
            .unwrap();
        assert_eq!(summary.rows_written, 1000);
        assert_eq!(summary.write_batches, 10);
        // ceil(1000 / 64) reads, the last one short
        assert_eq!(source.fetch_count(), 16);

        let conn = open(&path);
        let copied: Vec<i64> = conn
            .prepare("SELECT id FROM t ORDER BY id")
            .unwrap()
            .query_map([], |r| r.get(0))
            .unwrap()
            .collect::<rusqlite::Result<_>>()
            .unwrap();
        let mut expected = ids.clone();
        expected.sort_unstable();
        assert_eq!(copied, expected);
    }

    #[tokio::test]
    async fn test_small_handoff_still_copies_everything() {
        let ids: Vec<i64> = (1..=50).collect();
        let source = Arc::new(MemorySource::numbered(&ids));
        let schema = source.schema().await;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.db");

        let mut opts = CopyOptions::new(7, 4);
        opts.handoff_capacity = 1;
        let summary = copier(&source, schema, &path, opts).run().await.unwrap();
        assert_eq!(summary.rows_written, 50);
        assert_eq!(summary.write_batches, 13);
    }

    #[tokio::test]
    async fn test_allow_list_without_id_fails_before_any_query() {
        let source = Arc::new(MemorySource::numbered(&[1, 2, 3]));
        let mut opts = SchemaOptions::new("t", "id");
        opts.only_columns = vec!["name".into()];

        let err = Schema::read(source.as_ref(), &opts).await.unwrap_err();
        assert_eq!(err.kind(), "SchemaError");
        assert_eq!(source.probe_count(), 0);
        assert_eq!(source.fetch_count(), 0);
    }

    #[tokio::test]
    async fn test_failing_batch_keeps_earlier_commits() {
        // Duplicate id 3 lands in the second write batch
        let source = Arc::new(MemorySource::numbered(&[1, 2, 3, 3]));
        let schema = source.schema().await;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.db");

        let mut copier = copier(&source, schema, &path, CopyOptions::new(10, 2));
        let err = copier.run().await.unwrap_err();
        assert_eq!(err.kind(), "DestinationWriteError");

        let count: i64 = open(&path)
            .query_row("SELECT COUNT(*) FROM t", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 2);
    }

    #[tokio::test]
    async fn test_source_failure_is_reported() {
        let source = Arc::new(MemorySource::numbered(&[1, 2, 3, 4, 5]).fail_on_fetch(2));
        let schema = source.schema().await;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.db");

        let mut copier = copier(&source, schema, &path, CopyOptions::new(2, 10));
        let err = copier.run().await.unwrap_err();
        assert_eq!(err.kind(), "SourceQueryError");
        // Rows buffered before the failure are never committed
        assert_eq!(copier.stats().write_batches(), 0);
    }

    #[tokio::test]
    async fn test_copy_requires_destination_table() {
        let source = Arc::new(MemorySource::numbered(&[1]));
        let schema = source.schema().await;
        let dir = tempfile::tempdir().unwrap();

        let mut copier = copier(&source, schema, &dir.path().join("t.db"), CopyOptions::default());
        let err = copier.copy().await.unwrap_err();
        assert!(matches!(err, CopyError::Config(_)));

        copier.create_destination_table().unwrap();
        assert!(copier.create_destination_table().is_err());
    }

    #[test]
    fn test_options_defaults_and_validation() {
        let opts = CopyOptions::default();
        assert_eq!(opts.read_batch_size, 100_000);
        assert_eq!(opts.write_batch_size, 10_000);
        assert_eq!(opts.handoff_capacity, 100_000);

        assert!(CopyOptions::new(0, 10).validate().is_err());
        assert!(CopyOptions::new(10, 0).validate().is_err());
    }
}
