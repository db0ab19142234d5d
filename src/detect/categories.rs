// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Class-label to category mapping
//!
//! Persisted detections carry a category ("weapon", "fire", "smoke", ...)
//! derived from the model's class label. The mapping is configuration, not
//! logic: built-in defaults cover the labels the stock models emit, and a
//! TOML file can extend or override them. Unknown labels map to themselves.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::warn;

/// Built-in label -> category pairs for the stock weapon and fire/smoke models
const DEFAULT_CATEGORIES: &[(&str, &str)] = &[
    ("gun", "weapon"),
    ("knife", "weapon"),
    ("pistol", "weapon"),
    ("rifle", "weapon"),
    ("weapon", "weapon"),
    ("fire", "fire"),
    ("smoke", "smoke"),
];

#[derive(Debug, Clone)]
pub struct CategoryMap {
    map: HashMap<String, String>,
}

impl Default for CategoryMap {
    fn default() -> Self {
        let map = DEFAULT_CATEGORIES
            .iter()
            .map(|(label, category)| (label.to_string(), category.to_string()))
            .collect();
        Self { map }
    }
}

impl CategoryMap {
    /// Load the mapping: defaults, overlaid with the optional TOML file.
    ///
    /// A missing or unparseable file falls back to the defaults with a
    /// warning; category configuration is never fatal.
    pub fn load(path: Option<&Path>) -> Self {
        let mut categories = Self::default();

        if let Some(path) = path {
            match Self::read_overrides(path) {
                Ok(overrides) => {
                    for (label, category) in overrides {
                        categories.map.insert(label.to_lowercase(), category);
                    }
                }
                Err(e) => {
                    warn!(
                        "⚠️ Failed to load category map from {}: {}",
                        path.display(),
                        e
                    );
                }
            }
        }

        categories
    }

    /// Parse a flat TOML table of `label = "category"` pairs
    fn read_overrides(path: &Path) -> Result<HashMap<String, String>> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        toml::from_str(&raw).context("Invalid category map format")
    }

    /// Resolve the category for a class label. Lookup is case-insensitive;
    /// unmapped labels are their own category.
    pub fn category_for(&self, label: &str) -> String {
        let key = label.to_lowercase();
        self.map.get(&key).cloned().unwrap_or(key)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_mapping() {
        let categories = CategoryMap::default();
        assert_eq!(categories.category_for("gun"), "weapon");
        assert_eq!(categories.category_for("knife"), "weapon");
        assert_eq!(categories.category_for("fire"), "fire");
        assert_eq!(categories.category_for("smoke"), "smoke");
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let categories = CategoryMap::default();
        assert_eq!(categories.category_for("Gun"), "weapon");
        assert_eq!(categories.category_for("FIRE"), "fire");
    }

    #[test]
    fn test_unknown_label_maps_to_itself() {
        let categories = CategoryMap::default();
        assert_eq!(categories.category_for("Person"), "person");
    }

    #[test]
    fn test_file_overrides_extend_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "machete = \"weapon\"").unwrap();
        writeln!(file, "fire = \"flame\"").unwrap();

        let categories = CategoryMap::load(Some(file.path()));
        assert_eq!(categories.category_for("machete"), "weapon");
        // Override wins over the built-in entry
        assert_eq!(categories.category_for("fire"), "flame");
        // Untouched defaults survive
        assert_eq!(categories.category_for("gun"), "weapon");
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let categories = CategoryMap::load(Some(Path::new("/nonexistent/categories.toml")));
        assert_eq!(categories.category_for("gun"), "weapon");
        assert_eq!(categories.len(), CategoryMap::default().len());
    }

    #[test]
    fn test_invalid_file_falls_back_to_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "not valid toml [[[").unwrap();

        let categories = CategoryMap::load(Some(file.path()));
        assert_eq!(categories.category_for("smoke"), "smoke");
    }
}
