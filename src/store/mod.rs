// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Detection persistence
//!
//! `DetectionStore` is the seam between the request handlers and the
//! relational store: handlers receive it at construction time and tests
//! substitute a mock. Every operation is one statement on one pooled
//! connection, attempted at most once.

pub mod postgres;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::detect::BoundingBox;

pub use postgres::PostgresStore;

/// A detection about to be persisted
#[derive(Debug, Clone, PartialEq)]
pub struct NewDetection {
    pub camera_id: String,
    pub object_label: String,
    pub category: String,
    pub confidence: f32,
    pub bbox: BoundingBox,
    pub model_name: String,
}

/// A persisted detection record
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct DetectionRow {
    pub id: i64,
    pub camera_id: String,
    pub timestamp: DateTime<Utc>,
    pub object_label: String,
    pub category: String,
    pub confidence: f32,
    pub bbox_coordinates: serde_json::Value,
    pub model_name: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Per-category aggregate over a time window
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CategoryStats {
    pub category: String,
    pub count: i64,
    pub avg_confidence: f64,
    pub last_seen: Option<DateTime<Utc>>,
}

/// Relational store for detection records.
///
/// Implementations must be safe to share across concurrent requests.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DetectionStore: Send + Sync {
    /// Insert one detection, returning its generated id
    async fn insert_detection(&self, detection: &NewDetection) -> Result<i64>;

    /// Most recent detections within the last `hours`, newest first,
    /// optionally filtered by category
    async fn recent_detections(
        &self,
        limit: i64,
        category: Option<String>,
        hours: i32,
    ) -> Result<Vec<DetectionRow>>;

    /// Per-category counts and confidence averages over the last `hours`
    async fn statistics(&self, hours: i32) -> Result<Vec<CategoryStats>>;

    /// Update a record's status (and optionally notes). Returns whether a
    /// row matched.
    async fn update_status(&self, id: i64, status: String, notes: Option<String>)
        -> Result<bool>;

    /// Connectivity probe for health checks
    async fn ping(&self) -> bool;
}
