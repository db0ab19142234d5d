// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

use std::sync::Arc;

use ab_glyph::FontVec;
use tracing::{error, info, warn};

use fabstir_vision_node::api::{serve, AppState};
use fabstir_vision_node::config::NodeConfig;
use fabstir_vision_node::detect::CategoryMap;
use fabstir_vision_node::eventlog::EventLog;
use fabstir_vision_node::registry::ModelRegistry;
use fabstir_vision_node::store::{DetectionStore, PostgresStore};
use fabstir_vision_node::version;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt::init();
    dotenv::dotenv().ok();

    info!("Starting {}", version::get_version_string());

    let config = NodeConfig::from_env();

    // Load detectors; a missing model file degrades the API, it does not
    // stop the node
    let (registry, report) = ModelRegistry::load(&config.registry_config()).await;
    if !report.any_loaded() {
        error!("No models loaded successfully");
    }

    // Database is optional in the same way
    let store: Option<Arc<dyn DetectionStore>> = match &config.database_url {
        Some(url) => match PostgresStore::connect(url).await {
            Ok(store) => {
                info!("✓ Database connected");
                Some(Arc::new(store))
            }
            Err(e) => {
                error!("✗ Database connection failed: {}", e);
                warn!("Running without database persistence");
                None
            }
        },
        None => {
            warn!("DATABASE_URL not set, running without database persistence");
            None
        }
    };

    let categories = CategoryMap::load(config.category_map_path.as_deref());

    let event_log = config
        .event_log_path
        .clone()
        .map(|path| Arc::new(EventLog::new(path)));

    let font = load_label_font(&config);

    let state = AppState {
        registry: Arc::new(registry),
        store,
        categories: Arc::new(categories),
        event_log,
        font,
    };

    serve(state, &config.listen_addr).await
}

/// Load the optional label font. Box outlines are drawn either way; text
/// labels need a font file.
fn load_label_font(config: &NodeConfig) -> Option<Arc<FontVec>> {
    let path = config.label_font_path.as_ref()?;
    match std::fs::read(path).map_err(anyhow::Error::from).and_then(|bytes| {
        FontVec::try_from_vec(bytes).map_err(anyhow::Error::from)
    }) {
        Ok(font) => {
            info!("Loaded label font from {}", path.display());
            Some(Arc::new(font))
        }
        Err(e) => {
            warn!("Failed to load label font {}: {}", path.display(), e);
            None
        }
    }
}
