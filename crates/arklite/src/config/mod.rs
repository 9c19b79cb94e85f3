//! Configuration loading and validation.

mod types;
mod validation;

pub use types::*;

use crate::error::Result;
use std::path::Path;

impl Config {
    /// Load configuration from a YAML file.
    ///
    /// The result is not validated: flags may still fill in missing values.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Config::default());
        }
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        validation::validate(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config = Config::from_yaml(
            r#"
source:
  user: reader
  database: shop
copy:
  table: orders
  where:
    - "status = 'paid'"
  only_columns: [id, total]
"#,
        )
        .unwrap();

        assert_eq!(config.source.host, "localhost");
        assert_eq!(config.source.port, 3306);
        assert_eq!(config.source.password, None);
        assert_eq!(config.copy.id_column, "id");
        assert_eq!(config.copy.filters, vec!["status = 'paid'".to_string()]);
        assert_eq!(config.copy.only_columns, vec!["id", "total"]);
        assert_eq!(config.copy.read_batch, 100_000);
        assert_eq!(config.copy.write_batch, 10_000);
        assert_eq!(config.logging.format, LogFormat::Text);
    }

    #[test]
    fn test_full_yaml() {
        let config = Config::from_yaml(
            r#"
source:
  host: db.internal
  port: 3307
  user: reader
  password: hunter2
  database: shop
copy:
  table: orders
  output: /tmp/orders.db
  force: true
  id_column: order_id
  partition: p2024
  read_batch: 5000
  write_batch: 500
logging:
  verbose: true
  format: json
"#,
        )
        .unwrap();

        assert!(config.validate().is_ok());
        assert_eq!(config.source.password.as_deref(), Some("hunter2"));
        assert_eq!(config.copy.partition.as_deref(), Some("p2024"));
        assert_eq!(config.copy.copy_options().handoff_capacity, 5000);
        assert_eq!(config.copy.schema_options().id_column, "order_id");
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_empty_yaml_is_default() {
        assert_eq!(Config::from_yaml("").unwrap(), Config::default());
    }

    #[test]
    fn test_bad_yaml_is_config_error() {
        let err = Config::from_yaml("source: [").unwrap_err();
        assert_eq!(err.kind(), "ConfigurationError");
    }

    #[test]
    fn test_load_missing_file() {
        let err = Config::load("/nonexistent/arklite.yaml").unwrap_err();
        assert_eq!(err.kind(), "IoError");
    }
}
