use serde::{Deserialize, Serialize};

/// Provider-assigned dataset identifier.
///
/// Ids are opaque: callers compare and display them but never parse them.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DatasetId(String);

impl DatasetId {
    pub fn new(id: impl Into<String>) -> Self {
        DatasetId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DatasetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DatasetId {
    fn from(s: &str) -> Self {
        DatasetId::new(s)
    }
}

impl From<String> for DatasetId {
    fn from(s: String) -> Self {
        DatasetId(s)
    }
}
