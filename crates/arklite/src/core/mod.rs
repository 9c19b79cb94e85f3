//! Core abstractions for the copy pipeline.
//!
//! - [`schema`]: table and column metadata built from the source probe
//! - [`value`]: the tagged scalar carried in every row tuple
//! - [`traits`]: the source seam and the SQL dialect strategy

pub mod schema;
pub mod traits;
pub mod value;

pub use schema::{ColumnInfo, ColumnSelection, ProbedColumn, Schema, SchemaOptions};
pub use traits::{Dialect, RowSource};
pub use value::{RowTuple, SqlValue};
