//! Versioned mapping from classifier output index to class name.
//!
//! The classifier only knows indices; the order it was fitted with is a
//! contract with whoever consumes its output. The mapping therefore travels
//! inside the model bundle and is compared against the labels the service
//! was configured to serve before any request is handled.

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};

pub const IRIS_LABELS_VERSION: &str = "iris-v1";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassLabels {
    pub version: String,
    #[serde(rename = "classes", with = "vec_as_entries")]
    names: Vec<String>,
}

impl ClassLabels {
    pub fn new(version: impl Into<String>, names: Vec<String>) -> Self {
        Self {
            version: version.into(),
            names,
        }
    }

    /// The three Iris species in the order of the bundled dataset targets.
    pub fn iris() -> Self {
        Self::new(
            IRIS_LABELS_VERSION,
            vec![
                "setosa".to_string(),
                "versicolor".to_string(),
                "virginica".to_string(),
            ],
        )
    }

    pub fn name(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Fails unless `other` has the same version and the same names in the
    /// same order.
    pub fn ensure_matches(&self, other: &ClassLabels) -> Result<()> {
        if self == other {
            return Ok(());
        }
        Err(ModelError::LabelMismatch {
            expected: self.to_string(),
            found: other.to_string(),
        })
    }
}

impl std::fmt::Display for ClassLabels {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}[{}]", self.version, self.names.join(", "))
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ClassEntry {
    id: usize,
    name: String,
}

/// Serializes the names as explicit `{id, name}` entries so the index of
/// each label is visible in the artifact.
mod vec_as_entries {
    use super::ClassEntry;
    use serde::de::Error as _;
    use serde::ser::SerializeSeq;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(names: &[String], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(names.len()))?;
        for (id, name) in names.iter().enumerate() {
            seq.serialize_element(&ClassEntry {
                id,
                name: name.clone(),
            })?;
        }
        seq.end()
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let mut entries: Vec<ClassEntry> = Vec::deserialize(deserializer)?;
        entries.sort_by_key(|entry| entry.id);
        for (expected, entry) in entries.iter().enumerate() {
            if entry.id != expected {
                return Err(D::Error::custom(format!(
                    "class ids must be contiguous from 0, missing id {expected}"
                )));
            }
        }
        Ok(entries.into_iter().map(|entry| entry.name).collect())
    }
}
