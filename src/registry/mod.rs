// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Model registry for the fixed detector set
//!
//! Holds the detectors loaded at startup and the process-wide "current"
//! selection used by single-model detection requests. Missing model files
//! are logged and skipped, never fatal.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::detect::YoloModel;

/// Names of the fixed detector set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelName {
    Weapon,
    FireSmoke,
}

impl ModelName {
    pub const ALL: [ModelName; 2] = [ModelName::Weapon, ModelName::FireSmoke];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelName::Weapon => "weapon",
            ModelName::FireSmoke => "fire_smoke",
        }
    }

    /// Parse a user-supplied model name; unknown names are rejected
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "weapon" => Some(ModelName::Weapon),
            "fire_smoke" => Some(ModelName::FireSmoke),
            _ => None,
        }
    }

    /// Fallback label table when no sidecar labels file exists
    pub fn default_labels(&self) -> &'static [&'static str] {
        match self {
            ModelName::Weapon => &["gun", "knife"],
            ModelName::FireSmoke => &["fire", "smoke"],
        }
    }
}

impl fmt::Display for ModelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration for loading the registry
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    pub weapon_model_path: PathBuf,
    pub fire_smoke_model_path: PathBuf,
    pub confidence_threshold: f32,
    pub iou_threshold: f32,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            weapon_model_path: PathBuf::from("models/weapon.onnx"),
            fire_smoke_model_path: PathBuf::from("models/fire_smoke.onnx"),
            confidence_threshold: 0.5,
            iou_threshold: 0.45,
        }
    }
}

/// Per-model load outcome reported at startup
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    pub weapon_loaded: bool,
    pub fire_smoke_loaded: bool,
}

impl LoadReport {
    pub fn any_loaded(&self) -> bool {
        self.weapon_loaded || self.fire_smoke_loaded
    }
}

/// Registry of loaded detectors plus the current selection.
///
/// The model map is immutable after `load`; `current` is the only shared
/// mutable state and is swapped atomically under an async `RwLock`. A
/// request that resolved the selection before a switch keeps its handle;
/// last writer wins, with no versioning.
pub struct ModelRegistry {
    models: HashMap<ModelName, Arc<YoloModel>>,
    current: RwLock<ModelName>,
}

impl ModelRegistry {
    /// Load each configured model, skipping the ones that fail
    pub async fn load(config: &RegistryConfig) -> (Self, LoadReport) {
        let mut models = HashMap::new();
        let mut report = LoadReport::default();

        for name in ModelName::ALL {
            let path = match name {
                ModelName::Weapon => &config.weapon_model_path,
                ModelName::FireSmoke => &config.fire_smoke_model_path,
            };

            let labels = load_labels(name, path);
            match YoloModel::new(
                path,
                labels,
                config.confidence_threshold,
                config.iou_threshold,
            )
            .await
            {
                Ok(model) => {
                    info!("✅ {} model loaded from {}", name, path.display());
                    models.insert(name, Arc::new(model));
                    match name {
                        ModelName::Weapon => report.weapon_loaded = true,
                        ModelName::FireSmoke => report.fire_smoke_loaded = true,
                    }
                }
                Err(e) => {
                    warn!("⚠️ Failed to load {} model: {}", name, e);
                }
            }
        }

        let registry = Self {
            models,
            current: RwLock::new(ModelName::Weapon),
        };
        (registry, report)
    }

    /// Build an empty registry (no models loaded); used by tests
    pub fn empty() -> Self {
        Self {
            models: HashMap::new(),
            current: RwLock::new(ModelName::Weapon),
        }
    }

    /// Atomically switch the current selection
    pub async fn select(&self, name: ModelName) {
        *self.current.write().await = name;
    }

    /// Name of the current selection
    pub async fn current_name(&self) -> ModelName {
        *self.current.read().await
    }

    /// Handle for the current selection, if that model loaded
    pub async fn current(&self) -> Option<Arc<YoloModel>> {
        let name = *self.current.read().await;
        self.by_name(name)
    }

    /// Direct lookup, independent of the current selection
    pub fn by_name(&self, name: ModelName) -> Option<Arc<YoloModel>> {
        self.models.get(&name).cloned()
    }

    /// Names of the models that actually loaded
    pub fn available(&self) -> Vec<String> {
        ModelName::ALL
            .iter()
            .filter(|name| self.models.contains_key(name))
            .map(|name| name.as_str().to_string())
            .collect()
    }
}

/// Read the label table from a `<model>.labels` sidecar (one class name per
/// line), falling back to the built-in defaults for the model name.
fn load_labels(name: ModelName, model_path: &Path) -> Vec<String> {
    let sidecar = model_path.with_extension("labels");
    if let Ok(raw) = std::fs::read_to_string(&sidecar) {
        let labels: Vec<String> = raw
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();
        if !labels.is_empty() {
            info!(
                "Loaded {} labels for {} from {}",
                labels.len(),
                name,
                sidecar.display()
            );
            return labels;
        }
    }

    name.default_labels().iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_model_name_parse() {
        assert_eq!(ModelName::parse("weapon"), Some(ModelName::Weapon));
        assert_eq!(ModelName::parse("fire_smoke"), Some(ModelName::FireSmoke));
        assert_eq!(ModelName::parse("person"), None);
        assert_eq!(ModelName::parse(""), None);
    }

    #[test]
    fn test_model_name_display() {
        assert_eq!(ModelName::Weapon.to_string(), "weapon");
        assert_eq!(ModelName::FireSmoke.to_string(), "fire_smoke");
    }

    #[tokio::test]
    async fn test_load_with_missing_files_is_not_fatal() {
        let config = RegistryConfig {
            weapon_model_path: PathBuf::from("/nonexistent/weapon.onnx"),
            fire_smoke_model_path: PathBuf::from("/nonexistent/fire_smoke.onnx"),
            ..RegistryConfig::default()
        };

        let (registry, report) = ModelRegistry::load(&config).await;
        assert!(!report.any_loaded());
        assert!(registry.available().is_empty());
        assert!(registry.current().await.is_none());
    }

    #[tokio::test]
    async fn test_default_selection_is_weapon() {
        let registry = ModelRegistry::empty();
        assert_eq!(registry.current_name().await, ModelName::Weapon);
    }

    #[tokio::test]
    async fn test_select_switches_current() {
        let registry = ModelRegistry::empty();
        registry.select(ModelName::FireSmoke).await;
        assert_eq!(registry.current_name().await, ModelName::FireSmoke);

        registry.select(ModelName::Weapon).await;
        assert_eq!(registry.current_name().await, ModelName::Weapon);
    }

    #[tokio::test]
    async fn test_by_name_on_empty_registry() {
        let registry = ModelRegistry::empty();
        assert!(registry.by_name(ModelName::Weapon).is_none());
        assert!(registry.by_name(ModelName::FireSmoke).is_none());
    }

    #[test]
    fn test_load_labels_from_sidecar() {
        let dir = tempfile::tempdir().unwrap();
        let model_path = dir.path().join("weapon.onnx");
        let mut sidecar = std::fs::File::create(dir.path().join("weapon.labels")).unwrap();
        writeln!(sidecar, "handgun").unwrap();
        writeln!(sidecar, "  machete  ").unwrap();
        writeln!(sidecar).unwrap();

        let labels = load_labels(ModelName::Weapon, &model_path);
        assert_eq!(labels, vec!["handgun".to_string(), "machete".to_string()]);
    }

    #[test]
    fn test_load_labels_defaults_without_sidecar() {
        let labels = load_labels(ModelName::FireSmoke, Path::new("/nonexistent/fire.onnx"));
        assert_eq!(labels, vec!["fire".to_string(), "smoke".to_string()]);
    }
}
