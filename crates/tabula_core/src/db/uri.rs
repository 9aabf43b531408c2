//! Connection URI parsing.

use super::{DbError, DbResult};
use percent_encoding::percent_decode_str;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use url::Url;

const MEMORY_PATH: &str = ":memory:";

/// Parsed connection URI, e.g. `sqlite:///var/data/app.db` or `sqlite::memory:`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionUri {
    raw: String,
    url: Url,
    /// Percent-decoded host and path.
    location: String,
}

impl ConnectionUri {
    pub fn parse(value: &str) -> DbResult<Self> {
        let raw = value.trim();
        if raw.is_empty() {
            return Err(DbError::InvalidUri {
                uri: raw.to_string(),
                message: "uri must not be empty".to_string(),
            });
        }

        let url = Url::parse(raw).map_err(|err| DbError::InvalidUri {
            uri: raw.to_string(),
            message: err.to_string(),
        })?;

        let location = decode_location(&url).map_err(|message| DbError::InvalidUri {
            uri: raw.to_string(),
            message,
        })?;

        Ok(Self {
            raw: raw.to_string(),
            url,
            location,
        })
    }

    /// Lowercase scheme, e.g. `sqlite`.
    pub fn scheme(&self) -> &str {
        self.url.scheme()
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Whether the scheme names a file-backed database.
    pub fn is_database_file(&self) -> bool {
        self.scheme().contains("sqlite")
    }

    pub fn is_memory(&self) -> bool {
        self.location == MEMORY_PATH
    }

    /// Filesystem path for file-backed databases.
    ///
    /// `sqlite:///abs/app.db` yields `/abs/app.db`; `sqlite://data/app.db` and
    /// `sqlite:data/app.db` yield the relative path `data/app.db`. Returns
    /// `None` for in-memory URIs and non-file schemes.
    pub fn database_path(&self) -> Option<PathBuf> {
        if !self.is_database_file() || self.is_memory() {
            return None;
        }
        if self.location.is_empty() {
            return None;
        }
        Some(PathBuf::from(&self.location))
    }

    /// Query parameter lookup.
    pub fn query_param(&self, key: &str) -> Option<String> {
        self.url
            .query_pairs()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.into_owned())
    }
}

fn decode_location(url: &Url) -> Result<String, String> {
    let encoded = match url.host_str() {
        Some(host) if !host.is_empty() => format!("{host}{}", url.path()),
        _ => url.path().to_string(),
    };
    percent_decode_str(&encoded)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .map_err(|err| format!("path is not valid UTF-8 after decoding: {err}"))
}

impl Display for ConnectionUri {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::ConnectionUri;
    use crate::db::DbError;
    use std::path::PathBuf;

    #[test]
    fn parses_absolute_sqlite_path() {
        let uri = ConnectionUri::parse("sqlite:///var/data/app.db").expect("valid uri");
        assert_eq!(uri.scheme(), "sqlite");
        assert!(uri.is_database_file());
        assert!(!uri.is_memory());
        assert_eq!(uri.database_path(), Some(PathBuf::from("/var/data/app.db")));
    }

    #[test]
    fn decodes_percent_encoded_paths() {
        let uri = ConnectionUri::parse("sqlite:///tmp/my%20data/app.db").expect("valid uri");
        assert_eq!(uri.database_path(), Some(PathBuf::from("/tmp/my data/app.db")));

        let spaced =
            ConnectionUri::parse("sqlite:///tmp/my data/caf\u{e9}.db").expect("valid uri");
        assert_eq!(
            spaced.database_path(),
            Some(PathBuf::from("/tmp/my data/caf\u{e9}.db"))
        );

        assert!(matches!(
            ConnectionUri::parse("sqlite:///tmp/%FF.db"),
            Err(DbError::InvalidUri { .. })
        ));
    }

    #[test]
    fn parses_relative_sqlite_paths() {
        let authority = ConnectionUri::parse("sqlite://data/app.db").expect("valid uri");
        assert_eq!(authority.database_path(), Some(PathBuf::from("data/app.db")));

        let opaque = ConnectionUri::parse("sqlite:data/app.db").expect("valid uri");
        assert_eq!(opaque.database_path(), Some(PathBuf::from("data/app.db")));
    }

    #[test]
    fn recognizes_memory_uri() {
        let uri = ConnectionUri::parse("sqlite::memory:").expect("valid uri");
        assert!(uri.is_memory());
        assert_eq!(uri.database_path(), None);
    }

    #[test]
    fn non_file_schemes_have_no_path() {
        let uri = ConnectionUri::parse("postgres://localhost/app").expect("valid uri");
        assert!(!uri.is_database_file());
        assert_eq!(uri.database_path(), None);
    }

    #[test]
    fn exposes_query_parameters() {
        let uri = ConnectionUri::parse("sqlite:///tmp/a.db?mode=ro").expect("valid uri");
        assert_eq!(uri.query_param("mode").as_deref(), Some("ro"));
        assert_eq!(uri.query_param("missing"), None);
    }

    #[test]
    fn rejects_blank_and_relative_input() {
        assert!(matches!(
            ConnectionUri::parse("   "),
            Err(DbError::InvalidUri { .. })
        ));
        assert!(matches!(
            ConnectionUri::parse("just/a/path.db"),
            Err(DbError::InvalidUri { .. })
        ));
    }
}
