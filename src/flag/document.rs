//! Flag document parsing, used to seed stores from YAML or JSON files.

use super::Flag;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A document holding one or more flag definitions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlagDocument {
    /// Flags defined in this document
    #[serde(default)]
    pub flags: Vec<Flag>,
}

impl FlagDocument {
    /// Create a document with the given flags.
    pub fn with_flags(flags: Vec<Flag>) -> Self {
        Self { flags }
    }

    /// Parse a flag document from YAML.
    pub fn from_yaml(yaml: &str) -> crate::Result<Self> {
        serde_yaml::from_str(yaml).map_err(crate::Error::from)
    }

    /// Parse a flag document from JSON.
    pub fn from_json(json: &str) -> crate::Result<Self> {
        serde_json::from_str(json).map_err(crate::Error::from)
    }

    /// Load a flag document from a file.
    pub fn from_file(path: impl AsRef<Path>) -> crate::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;

        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        match extension.to_lowercase().as_str() {
            "yaml" | "yml" => Self::from_yaml(&content),
            "json" => Self::from_json(&content),
            _ => Self::from_yaml(&content).or_else(|_| Self::from_json(&content)),
        }
    }

    /// Convert the document to YAML.
    pub fn to_yaml(&self) -> crate::Result<String> {
        serde_yaml::to_string(self).map_err(crate::Error::from)
    }

    /// Validate all flags in the document, rejecting duplicate names.
    pub fn validate(&self) -> crate::Result<()> {
        let mut seen = std::collections::HashSet::new();
        for flag in &self.flags {
            flag.validate()?;
            if !seen.insert(flag.name.as_str()) {
                return Err(crate::Error::validation_field(
                    format!("Duplicate flag name: {}", flag.name),
                    "name",
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const YAML: &str = r#"
flags:
  - name: dark-mode
    everyone: true
  - name: new-checkout
    percent: 25.5
    groups: [beta, staff]
    expires: 2030-01-01T00:00:00Z
"#;

    #[test]
    fn test_from_yaml() {
        let doc = FlagDocument::from_yaml(YAML).unwrap();
        assert_eq!(doc.flags.len(), 2);
        assert_eq!(doc.flags[0].everyone, Some(true));
        assert_eq!(doc.flags[1].percent, Some(25.5));
        assert_eq!(doc.flags[1].groups, vec!["beta", "staff"]);
        assert!(doc.flags[1].expires.is_some());
        assert!(doc.validate().is_ok());
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let doc = FlagDocument::with_flags(vec![Flag::new("a"), Flag::new("a")]);
        assert!(doc.validate().is_err());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flags.yaml");
        std::fs::write(&path, YAML).unwrap();

        let doc = FlagDocument::from_file(&path).unwrap();
        assert_eq!(doc.flags.len(), 2);
    }
}
