//! Scan identity and item typing.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a grading scan.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct ScanId(pub String);

impl ScanId {
    /// Generate a new random scan ID.
    pub fn new() -> Self {
        Self(format!("scan-{}", Uuid::new_v4()))
    }

    /// Create from an existing string (caller-supplied ids are allowed).
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ScanId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ScanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of collectible being graded.
///
/// Only slants the wording of the analysis prompts; the pipeline itself is
/// identical for every item type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    Comic,
    #[default]
    Card,
    Toy,
}

impl ItemType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemType::Comic => "comic",
            ItemType::Card => "card",
            ItemType::Toy => "toy",
        }
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_id_generation() {
        let id = ScanId::new();
        assert!(id.as_str().starts_with("scan-"));
        assert_ne!(ScanId::new(), ScanId::new());
    }

    #[test]
    fn test_scan_id_caller_supplied() {
        let id = ScanId::from_string("video-1234567890-abc");
        assert_eq!(id.as_str(), "video-1234567890-abc");
    }

    #[test]
    fn test_item_type_wire_format() {
        let json = serde_json::to_string(&ItemType::Comic).unwrap();
        assert_eq!(json, "\"comic\"");
    }
}
