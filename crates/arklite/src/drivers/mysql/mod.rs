//! MySQL/MariaDB source driver.
//!
//! - [`MysqlDialect`]: backtick quoting and `PARTITION` clauses
//! - [`MysqlReader`]: column probe and cursor-bounded row fetches
//!
//! # Supported Versions
//!
//! - MySQL 5.7+, 8.0+
//! - MariaDB 10.2+

mod dialect;
mod reader;

pub use dialect::MysqlDialect;
pub use reader::MysqlReader;
