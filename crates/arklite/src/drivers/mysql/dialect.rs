//! MySQL/MariaDB SQL dialect (Strategy pattern).
//!
//! Provides MySQL-specific SQL syntax for identifier quoting and parameter
//! placeholders.

use crate::core::traits::Dialect;

/// MySQL/MariaDB dialect implementation.
///
/// Compatible with MySQL 5.7+, 8.0+, and MariaDB 10.2+.
#[derive(Debug, Clone, Default)]
pub struct MysqlDialect;

impl MysqlDialect {
    /// Create a new MySQL dialect instance.
    pub fn new() -> Self {
        Self
    }

    /// `PARTITION (...)` clause restricting a FROM to one partition.
    pub fn partition_clause(&self, partition: &str) -> String {
        format!("PARTITION ({})", self.quote_ident(partition))
    }
}

impl Dialect for MysqlDialect {
    fn quote_ident(&self, name: &str) -> String {
        // MySQL uses backticks for identifier quoting
        // Handle names that contain backticks by doubling them
        format!("`{}`", name.replace('`', "``"))
    }

    fn param_placeholder(&self, _index: usize) -> String {
        // The binary protocol only knows positional `?`
        "?".to_string()
    }
}
