//! Type mapping from MySQL column types to SQLite storage classes.

use std::fmt;

/// SQLite's coarse type system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageClass {
    Integer,
    Real,
    Text,
    Blob,
}

impl StorageClass {
    /// SQLite keyword for the class, as used in DDL.
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageClass::Integer => "INTEGER",
            StorageClass::Real => "REAL",
            StorageClass::Text => "TEXT",
            StorageClass::Blob => "BLOB",
        }
    }
}

impl fmt::Display for StorageClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered rule table; the first rule with a matching keyword wins.
///
/// Integer keywords come first so `BIGINT UNSIGNED` never falls through, and
/// binary keywords precede text ones so `LONGBLOB` is not read as TEXT.
const RULES: &[(&[&str], StorageClass)] = &[
    (
        &["TINYINT", "SMALLINT", "MEDIUMINT", "BIGINT", "INT", "INTEGER", "BOOL"],
        StorageClass::Integer,
    ),
    (
        &["FLOAT", "DOUBLE", "DECIMAL", "NUMERIC", "REAL"],
        StorageClass::Real,
    ),
    (&["BLOB", "BINARY"], StorageClass::Blob),
    (&["CHAR", "TEXT", "ENUM", "SET"], StorageClass::Text),
    (&["DATE", "TIME", "TIMESTAMP", "YEAR"], StorageClass::Text),
    (&["JSON"], StorageClass::Text),
];

/// Map a MySQL type name (with any modifiers) to a SQLite storage class.
///
/// Matching is a case-insensitive substring search, so `bigint(20) unsigned`
/// and `BIGINT` classify the same. Unknown types map to TEXT.
pub fn classify(mysql_type: &str) -> StorageClass {
    let upper = mysql_type.to_uppercase();

    RULES
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| upper.contains(k)))
        .map(|(_, class)| *class)
        .unwrap_or(StorageClass::Text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_types() {
        assert_eq!(classify("BIGINT(20) UNSIGNED"), StorageClass::Integer);
        assert_eq!(classify("int"), StorageClass::Integer);
        assert_eq!(classify("TINYINT"), StorageClass::Integer);
        assert_eq!(classify("mediumint unsigned"), StorageClass::Integer);
        assert_eq!(classify("BOOLEAN"), StorageClass::Integer);
    }

    #[test]
    fn test_real_types() {
        assert_eq!(classify("DOUBLE PRECISION"), StorageClass::Real);
        assert_eq!(classify("decimal(10,2)"), StorageClass::Real);
        assert_eq!(classify("FLOAT"), StorageClass::Real);
        assert_eq!(classify("NUMERIC"), StorageClass::Real);
    }

    #[test]
    fn test_binary_before_text() {
        assert_eq!(classify("LONGBLOB"), StorageClass::Blob);
        assert_eq!(classify("varbinary(16)"), StorageClass::Blob);
        assert_eq!(classify("TINYBLOB"), StorageClass::Blob);
    }

    #[test]
    fn test_text_types() {
        assert_eq!(classify("VARCHAR(255)"), StorageClass::Text);
        assert_eq!(classify("longtext"), StorageClass::Text);
        assert_eq!(classify("ENUM"), StorageClass::Text);
        assert_eq!(classify("JSON"), StorageClass::Text);
        assert_eq!(classify("DATETIME"), StorageClass::Text);
        assert_eq!(classify("year"), StorageClass::Text);
    }

    #[test]
    fn test_fallback_is_text() {
        assert_eq!(classify(""), StorageClass::Text);
        assert_eq!(classify("GEOMETRY"), StorageClass::Text);
        assert_eq!(classify("something odd"), StorageClass::Text);
    }

    #[test]
    fn test_case_insensitive_and_deterministic() {
        for ty in ["bigint(20) unsigned", "Varchar(255)", "double precision", "LongBlob"] {
            assert_eq!(classify(ty), classify(&ty.to_uppercase()));
            assert_eq!(classify(ty), classify(ty));
        }
    }

    #[test]
    fn test_display_matches_sqlite_keyword() {
        assert_eq!(StorageClass::Integer.to_string(), "INTEGER");
        assert_eq!(StorageClass::Blob.as_str(), "BLOB");
    }
}
