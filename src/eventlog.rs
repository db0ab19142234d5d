// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Append-only detection journal
//!
//! One JSON line per detect call (timestamp, model, detections). Writes are
//! best-effort: failures are logged and swallowed so the journal can never
//! fail a request.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use chrono::Utc;
use serde::Serialize;
use tracing::error;

use crate::detect::Detection;

#[derive(Debug, Serialize)]
struct LogEntry<'a> {
    timestamp: String,
    model: &'a str,
    detections: &'a [Detection],
}

#[derive(Debug)]
pub struct EventLog {
    path: PathBuf,
}

impl EventLog {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Append one entry; errors are logged, never returned
    pub fn append(&self, model: &str, detections: &[Detection]) {
        let entry = LogEntry {
            timestamp: Utc::now().to_rfc3339(),
            model,
            detections,
        };

        if let Err(e) = self.write_entry(&entry) {
            error!("✗ Failed to write detection journal: {}", e);
        }
    }

    fn write_entry(&self, entry: &LogEntry<'_>) -> std::io::Result<()> {
        let line = serde_json::to_string(entry)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", line)
    }
}
