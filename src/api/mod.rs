// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! HTTP API for the detection service

pub mod detect;
pub mod detections;
pub mod errors;
pub mod http_server;

pub use detect::{DetectBothResponse, DetectResponse};
pub use errors::{ApiError, ErrorResponse};
pub use http_server::{create_router, serve, AppState};
