// Version information for the Fabstir Vision Node

/// Full version string with feature description
pub const VERSION: &str = "v0.1.0-detection-api-2026-08-25";

/// Semantic version number
pub const VERSION_NUMBER: &str = "0.1.0";

/// Build date
pub const BUILD_DATE: &str = "2026-08-25";

/// Supported features in this version
pub const FEATURES: &[&str] = &[
    "weapon-detection",
    "fire-smoke-detection",
    "dual-model-detect",
    "model-switching",
    "postgres-persistence",
    "detection-journal",
];

/// Get formatted version string for logging
pub fn get_version_string() -> String {
    format!("Fabstir Vision Node {} ({})", VERSION_NUMBER, BUILD_DATE)
}
