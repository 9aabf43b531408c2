//! Database-type tag reported by connections.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Tag identifying the database engine behind a connection.
///
/// The set is open: providers for engines without a dedicated variant report
/// `Other` with a lowercase engine name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DatabaseType {
    Generic,
    Sqlite,
    Postgres,
    Other(String),
}

impl DatabaseType {
    /// Parses a tag; matching is case-insensitive and never fails.
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_ascii_lowercase().as_str() {
            "" | "generic" => Self::Generic,
            "sqlite" | "sqlite3" => Self::Sqlite,
            "postgres" | "postgresql" => Self::Postgres,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Generic => "generic",
            Self::Sqlite => "sqlite",
            Self::Postgres => "postgres",
            Self::Other(tag) => tag.as_str(),
        }
    }
}

impl Display for DatabaseType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for DatabaseType {
    fn from(value: String) -> Self {
        Self::from_tag(&value)
    }
}

impl From<DatabaseType> for String {
    fn from(value: DatabaseType) -> Self {
        value.as_str().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::DatabaseType;

    #[test]
    fn parses_known_tags_case_insensitively() {
        assert_eq!(DatabaseType::from_tag("postgres"), DatabaseType::Postgres);
        assert_eq!(DatabaseType::from_tag("PostgreSQL"), DatabaseType::Postgres);
        assert_eq!(DatabaseType::from_tag(" sqlite3 "), DatabaseType::Sqlite);
        assert_eq!(DatabaseType::from_tag("generic"), DatabaseType::Generic);
        assert_eq!(DatabaseType::from_tag(""), DatabaseType::Generic);
    }

    #[test]
    fn unknown_tags_are_kept_lowercase() {
        let tag = DatabaseType::from_tag("FileMaker");
        assert_eq!(tag, DatabaseType::Other("filemaker".to_string()));
        assert_eq!(tag.to_string(), "filemaker");
    }

    #[test]
    fn serializes_as_plain_string() {
        let json = serde_json::to_string(&DatabaseType::Postgres).expect("serialize tag");
        assert_eq!(json, "\"postgres\"");
        let parsed: DatabaseType = serde_json::from_str("\"mysql\"").expect("parse tag");
        assert_eq!(parsed, DatabaseType::Other("mysql".to_string()));
    }
}
