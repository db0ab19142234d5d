// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Multipart detection endpoints

pub mod handler;
pub mod response;

pub use handler::{detect_both_handler, detect_handler};
pub use response::{DetectBothResponse, DetectResponse};
