//! # arklite
//!
//! Copy a single MySQL/MariaDB table into a SQLite file.
//!
//! The copy reads the source with a cursor on an integer id column
//! (`WHERE id > ? ORDER BY id LIMIT n`) and writes the destination in
//! fixed-size transactions, with both sides running concurrently:
//!
//! - **Schema probe**: column names and types come from a zero-row query
//! - **Type mapping**: each MySQL type becomes one SQLite storage class
//! - **Bounded handoff**: the reader waits when the writer falls behind
//! - **Atomic batches**: a failed batch rolls back; earlier batches stay
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use arklite::{Config, Copier, MysqlReader, Schema, SqliteTarget};
//!
//! #[tokio::main]
//! async fn main() -> arklite::Result<()> {
//!     let config = Config::load("arklite.yaml")?;
//!     config.validate()?;
//!
//!     let reader = Arc::new(MysqlReader::connect(&config.source).await?);
//!     let schema = Schema::read(reader.as_ref(), &config.copy.schema_options()).await?;
//!     let output = config.copy.output.clone().unwrap_or_default();
//!     let target = SqliteTarget::create(&output, config.copy.force)?;
//!
//!     let mut copier = Copier::new(reader, schema, target, config.copy.copy_options())?;
//!     let summary = copier.run().await?;
//!     println!("Copied {} rows", summary.rows_written);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod core;
pub mod drivers;
pub mod error;
pub mod query;
pub mod transfer;
pub mod typemap;

// Re-exports for convenient access
pub use config::{Config, CopyConfig, LogFormat, LoggingConfig, SourceConfig};
pub use crate::core::{ColumnInfo, RowSource, Schema, SchemaOptions, SqlValue};
pub use drivers::{MysqlReader, SqliteTarget};
pub use error::{CopyError, Result};
pub use query::QueryBuilder;
pub use transfer::{CopyOptions, CopyStats, CopySummary, Copier};
pub use typemap::{classify, StorageClass};
