use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::Result;

pub const DEFAULT_TARGET: &str = "metadata";

/// Item timestamps come back either as Unix seconds or as date strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Timestamp {
    Unix(i64),
    Text(String),
}

impl Timestamp {
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            Timestamp::Unix(secs) => DateTime::from_timestamp(*secs, 0),
            Timestamp::Text(s) => {
                let s = s.trim();
                if let Ok(secs) = s.parse::<i64>() {
                    return DateTime::from_timestamp(secs, 0);
                }
                DateTime::parse_from_rfc3339(s)
                    .map(|dt| dt.with_timezone(&Utc))
                    .ok()
            }
        }
    }

    /// Converts to `SystemTime`, clamping unparseable or pre-epoch values to the epoch.
    pub fn to_system_time(&self) -> SystemTime {
        self.to_datetime()
            .and_then(|dt| u64::try_from(dt.timestamp()).ok())
            .map(|secs| UNIX_EPOCH + std::time::Duration::from_secs(secs))
            .unwrap_or(UNIX_EPOCH)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemFile {
    pub name: String,
    #[serde(default)]
    pub format: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ItemDocument {
    #[serde(default)]
    created: Option<Timestamp>,
    #[serde(default)]
    updated: Option<Timestamp>,
    #[serde(default)]
    item_size: Option<u64>,
    #[serde(default)]
    metadata: Map<String, Value>,
    #[serde(default)]
    files: Vec<ItemFile>,
}

/// A remote archive item.
///
/// The typed fields are the ones this crate consumes; `raw` keeps the complete
/// document so dumps reproduce everything the service returned.
#[derive(Debug, Clone)]
pub struct Item {
    pub identifier: String,
    pub created: Option<Timestamp>,
    pub updated: Option<Timestamp>,
    pub item_size: Option<u64>,
    pub metadata: Map<String, Value>,
    pub files: Vec<ItemFile>,
    pub raw: Value,
}

impl Item {
    pub fn from_json(identifier: &str, raw: Value) -> Result<Self> {
        let doc: ItemDocument = if raw.is_object() {
            serde_json::from_value(raw.clone())?
        } else {
            ItemDocument::default()
        };

        Ok(Item {
            identifier: identifier.to_string(),
            created: doc.created,
            updated: doc.updated,
            item_size: doc.item_size,
            metadata: doc.metadata,
            files: doc.files,
            raw,
        })
    }

    /// The service answers `{}` for identifiers it does not know.
    pub fn exists(&self) -> bool {
        self.raw.as_object().is_some_and(|obj| !obj.is_empty())
    }

    pub fn formats(&self) -> impl Iterator<Item = &str> {
        self.files.iter().filter_map(|f| f.format.as_deref())
    }
}

/// One metadata change request for a single item.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MetadataEdit {
    pub fields: Map<String, Value>,
    pub target: Option<String>,
    pub append: bool,
    pub priority: Option<i64>,
}

impl MetadataEdit {
    pub fn target(&self) -> &str {
        self.target.as_deref().unwrap_or(DEFAULT_TARGET)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ModifyBody {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub log: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModifyResponse {
    pub status: u16,
    pub body: ModifyBody,
}

impl ModifyResponse {
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }

    pub fn log(&self) -> &str {
        self.body.log.as_deref().unwrap_or("")
    }

    pub fn error(&self) -> &str {
        self.body.error.as_deref().unwrap_or("unknown error")
    }
}

/// Identifiers returned by a search, yielded one at a time.
#[derive(Debug)]
pub struct SearchResults {
    identifiers: std::vec::IntoIter<String>,
}

impl SearchResults {
    pub fn new(identifiers: Vec<String>) -> Self {
        SearchResults {
            identifiers: identifiers.into_iter(),
        }
    }
}

impl Iterator for SearchResults {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        self.identifiers.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.identifiers.size_hint()
    }
}
