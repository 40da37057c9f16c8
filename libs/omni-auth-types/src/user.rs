use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Open, schema-less user metadata.
pub type Metadata = HashMap<String, serde_json::Value>;

/// Read-only projection of the provider's user record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Provider-assigned user ID
    pub id: String,

    /// Email address, absent for phone-only accounts
    #[serde(default)]
    pub email: Option<String>,

    /// Free-form metadata attached at registration or via updates
    #[serde(default, rename = "user_metadata")]
    pub metadata: Metadata,
}

impl User {
    /// Look up a single metadata entry as a string.
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(|v| v.as_str())
    }
}
