#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API response types for the dengue map server.
//!
//! Kept apart from the handlers so the JSON contract the dashboard relies
//! on is visible in one place.

use serde::{Deserialize, Serialize};

/// Message returned when a map update succeeds.
pub const MAP_UPDATED_MESSAGE: &str = "地圖已更新";

/// Outcome marker of an API call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiStatus {
    Success,
    Error,
}

/// Response body of `GET /api/update-map`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiUpdateResponse {
    pub status: ApiStatus,
    /// Human-readable result; the error text on failure.
    pub message: String,
}

impl ApiUpdateResponse {
    #[must_use]
    pub fn success() -> Self {
        Self {
            status: ApiStatus::Success,
            message: MAP_UPDATED_MESSAGE.to_string(),
        }
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: ApiStatus::Error,
            message: message.into(),
        }
    }
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiHealth {
    /// Whether the server is healthy.
    pub healthy: bool,
    /// Server version.
    pub version: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_body_matches_dashboard_contract() {
        let body = serde_json::to_string(&ApiUpdateResponse::success()).unwrap();
        assert_eq!(body, r#"{"status":"success","message":"地圖已更新"}"#);
    }

    #[test]
    fn error_status_is_lowercase() {
        let body = serde_json::to_value(ApiUpdateResponse::error("boom")).unwrap();
        assert_eq!(body["status"], "error");
        assert_eq!(body["message"], "boom");
    }
}
