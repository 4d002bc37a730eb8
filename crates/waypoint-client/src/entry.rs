//! Registry entry records.

use std::fmt;
use std::hash::{Hash, Hasher};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ClientError, ClientResult};

/// Maximum length for any entry field.
pub const MAX_FIELD_LENGTH: usize = 255;

/// An advertisement that a service of a given type and version exists at a
/// URI.
///
/// Entries are identified by the `(type_name, version, uri)` triple:
/// equality and hashing use only those fields, so a renewed entry compares
/// equal to the original registration regardless of server-assigned id or
/// timestamps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entry {
    /// Server-assigned identifier, present once registered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    /// The type of resource being advertised.
    pub type_name: String,
    /// Human-readable implementation details.
    pub description: String,
    /// Location of the resource, normalized with a trailing slash.
    pub uri: String,
    /// Version of the resource.
    pub version: String,
    /// Set by the registry on first registration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// Bumped by the registry on every renewal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Entry {
    /// Create a new local entry. The uri gains a trailing slash if missing.
    pub fn new(
        type_name: impl Into<String>,
        description: impl Into<String>,
        uri: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            type_name: type_name.into(),
            description: description.into(),
            uri: with_trailing_slash(&uri.into()),
            version: version.into(),
            created_at: None,
            updated_at: None,
        }
    }

    /// Validate the entry for registration.
    ///
    /// All of `type_name`, `description`, `uri`, and `version` must be
    /// non-empty and at most [`MAX_FIELD_LENGTH`] characters.
    pub fn validate(&self) -> ClientResult<()> {
        let mut problems = Vec::new();

        for (name, value) in [
            ("type_name", &self.type_name),
            ("description", &self.description),
            ("uri", &self.uri),
            ("version", &self.version),
        ] {
            if value.is_empty() {
                problems.push(format!("{name} can't be blank"));
            } else if value.chars().count() > MAX_FIELD_LENGTH {
                problems.push(format!(
                    "{name} is too long (maximum is {MAX_FIELD_LENGTH} characters)"
                ));
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ClientError::InvalidEntry(problems))
        }
    }

    /// The composite identity of this entry.
    fn composite_id(&self) -> String {
        format!("{}v{}/{}", self.uri, self.version, self.type_name)
    }
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.uri == other.uri
            && self.version == other.version
            && self.type_name == other.type_name
    }
}

impl Eq for Entry {}

impl Hash for Entry {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.uri.hash(state);
        self.version.hash(state);
        self.type_name.hash(state);
    }
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.composite_id())
    }
}

/// Append a trailing slash unless one is already present.
pub(crate) fn with_trailing_slash(s: &str) -> String {
    if s.is_empty() {
        "/".to_owned()
    } else if s.ends_with('/') {
        s.to_owned()
    } else {
        format!("{s}/")
    }
}
