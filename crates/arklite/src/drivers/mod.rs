//! Database driver implementations.
//!
//! - [`mysql`]: the source side, implementing [`RowSource`](crate::core::RowSource)
//! - [`sqlite`]: the destination side
//!
//! Each driver module provides a `Dialect` for its SQL syntax.

pub mod mysql;
pub mod sqlite;

pub use mysql::{MysqlDialect, MysqlReader};
pub use sqlite::{SqliteDialect, SqliteTarget};
