use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize, Serializer};

/// Written for `LastModified` when none was observed; read back as "no expectation".
pub const ZERO_TIME: &str = "0001-01-01T00:00:00Z";

/// One file the edge server is expected to serve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDescriptor {
    /// Request path, starting with `/`.
    pub path: String,
    /// Lowercase hex SHA-256; `None` skips the content check.
    pub expected_checksum: Option<String>,
    /// `None` skips the size check. Never `Some(0)`.
    pub expected_size: Option<u64>,
    /// Only ever used for a warning.
    pub expected_last_modified: Option<DateTime<Utc>>,
}

impl FileDescriptor {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            expected_checksum: None,
            expected_size: None,
            expected_last_modified: None,
        }
    }
}

/// What one request told us about one file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileOutcome {
    pub path: String,
    pub observed_size: Option<u64>,
    pub observed_checksum: Option<String>,
    pub observed_last_modified: Option<DateTime<Utc>>,
    pub bad_size: bool,
    pub bad_checksum: bool,
    /// Status was not 200.
    pub bad_request: bool,
    /// Transport failure, or the body broke off.
    pub read_error: bool,
    /// `X-Cache` was anything but `HIT`.
    pub miss: bool,
}

impl FileOutcome {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }
}

/// One line of a JSON-lines manifest.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct ManifestEntry {
    pub path: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub checksum: String,
    #[serde(default, serialize_with = "last_modified_or_zero")]
    pub last_modified: Option<DateTime<Utc>>,
}

fn last_modified_or_zero<S: Serializer>(t: &Option<DateTime<Utc>>, s: S) -> Result<S::Ok, S::Error> {
    match t {
        Some(t) => t.serialize(s),
        None => s.serialize_str(ZERO_TIME),
    }
}

impl From<&FileOutcome> for ManifestEntry {
    fn from(outcome: &FileOutcome) -> Self {
        Self {
            path: outcome.path.clone(),
            size: outcome.observed_size.unwrap_or_default(),
            checksum: outcome.observed_checksum.clone().unwrap_or_default(),
            last_modified: outcome.observed_last_modified,
        }
    }
}

impl From<ManifestEntry> for FileDescriptor {
    fn from(entry: ManifestEntry) -> Self {
        Self {
            path: entry.path,
            expected_checksum: Some(entry.checksum).filter(|c| !c.is_empty()),
            expected_size: Some(entry.size).filter(|&s| s > 0),
            // the zero time stands for "unknown"
            expected_last_modified: entry.last_modified.filter(|t| t.year() > 1),
        }
    }
}
