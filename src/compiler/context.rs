//! Compilation options

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Caller options for one compilation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileOptions {
    /// Copy `description` from the schema onto leaf values
    pub add_description: bool,
    /// Copy `type` from the schema onto leaf values
    pub add_type: bool,
    /// Options forwarded to registered formatting rules
    pub custom: IndexMap<String, Value>,
}

impl CompileOptions {
    /// Whether leaves are wrapped with schema annotations
    pub fn annotates(&self) -> bool {
        self.add_description || self.add_type
    }

    /// Copy with annotation disabled
    pub fn without_annotation(&self) -> Self {
        Self {
            add_description: false,
            add_type: false,
            custom: self.custom.clone(),
        }
    }

    /// Custom option lookup
    pub fn custom(&self, key: &str) -> Option<&Value> {
        self.custom.get(key)
    }
}
