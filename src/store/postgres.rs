// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! PostgreSQL-backed detection store

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::{debug, info};

use super::{CategoryStats, DetectionRow, DetectionStore, NewDetection};

/// Bounded pool: one connection per in-flight statement, max 10
const MAX_CONNECTIONS: u32 = 10;
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

const CREATE_DETECTIONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS detections (
    id BIGSERIAL PRIMARY KEY,
    camera_id VARCHAR(100) NOT NULL DEFAULT 'default',
    timestamp TIMESTAMPTZ NOT NULL DEFAULT now(),
    object_label VARCHAR(100) NOT NULL,
    category VARCHAR(100) NOT NULL,
    confidence REAL NOT NULL,
    bbox_coordinates JSONB NOT NULL,
    model_name VARCHAR(100) NOT NULL,
    status VARCHAR(50) NOT NULL DEFAULT 'active',
    notes TEXT
)
"#;

pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Connect and ensure the schema exists
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .min_connections(1)
            .max_connections(MAX_CONNECTIONS)
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .connect(database_url)
            .await
            .context("Failed to create database connection pool")?;

        sqlx::query(CREATE_DETECTIONS_TABLE)
            .execute(&pool)
            .await
            .context("Failed to create detections table")?;

        info!("✅ Database connection pool created ({} max)", MAX_CONNECTIONS);

        Ok(Self { pool })
    }

    /// Wrap an existing pool (used by tests against a scratch database)
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DetectionStore for PostgresStore {
    async fn insert_detection(&self, detection: &NewDetection) -> Result<i64> {
        let bbox = serde_json::to_value(detection.bbox)
            .context("Failed to serialize bounding box")?;

        let (id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO detections
                (camera_id, object_label, category, confidence, bbox_coordinates, model_name)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(&detection.camera_id)
        .bind(&detection.object_label)
        .bind(&detection.category)
        .bind(detection.confidence)
        .bind(&bbox)
        .bind(&detection.model_name)
        .fetch_one(&self.pool)
        .await
        .context("Failed to insert detection")?;

        debug!("Inserted detection id={} ({})", id, detection.category);
        Ok(id)
    }

    async fn recent_detections(
        &self,
        limit: i64,
        category: Option<String>,
        hours: i32,
    ) -> Result<Vec<DetectionRow>> {
        let rows = sqlx::query_as::<_, DetectionRow>(
            r#"
            SELECT id, camera_id, timestamp, object_label, category, confidence,
                   bbox_coordinates, model_name, status, notes
            FROM detections
            WHERE timestamp > now() - make_interval(hours => $1)
              AND ($2::varchar IS NULL OR category = $2)
            ORDER BY timestamp DESC
            LIMIT $3
            "#,
        )
        .bind(hours)
        .bind(category)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch recent detections")?;

        Ok(rows)
    }

    async fn statistics(&self, hours: i32) -> Result<Vec<CategoryStats>> {
        let stats = sqlx::query_as::<_, CategoryStats>(
            r#"
            SELECT category,
                   COUNT(*) AS count,
                   AVG(confidence)::float8 AS avg_confidence,
                   MAX(timestamp) AS last_seen
            FROM detections
            WHERE timestamp > now() - make_interval(hours => $1)
            GROUP BY category
            ORDER BY count DESC
            "#,
        )
        .bind(hours)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch detection statistics")?;

        Ok(stats)
    }

    async fn update_status(
        &self,
        id: i64,
        status: String,
        notes: Option<String>,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE detections
            SET status = $2, notes = COALESCE($3, notes)
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(status)
        .bind(notes)
        .execute(&self.pool)
        .await
        .context("Failed to update detection status")?;

        Ok(result.rows_affected() > 0)
    }

    async fn ping(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}
