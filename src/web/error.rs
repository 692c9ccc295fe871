//! JSON error responses for the API.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;
use ts_rs::TS;

/// Machine-readable error kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum ApiErrorCode {
    NotFound,
    Internal,
}

impl ApiErrorCode {
    fn status(self) -> StatusCode {
        match self {
            ApiErrorCode::NotFound => StatusCode::NOT_FOUND,
            ApiErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Error body in the same envelope as successful list responses, so
/// clients can always read `success` and `items`.
#[derive(Debug, Serialize, TS)]
#[ts(export)]
pub struct ApiError {
    pub success: bool,
    pub code: ApiErrorCode,
    pub message: String,
    #[ts(type = "never[]")]
    items: Vec<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: ApiErrorCode, message: impl Into<String>) -> Self {
        Self {
            success: false,
            code,
            message: message.into(),
            items: Vec::new(),
        }
    }

    /// The generic failure for the live items endpoint. Upstream details are
    /// logged, never returned.
    pub fn live_items() -> Self {
        Self::new(ApiErrorCode::Internal, "Error fetching live items")
    }

    /// Same failure under the `/api/live-videos` wording.
    pub fn live_videos() -> Self {
        Self::new(ApiErrorCode::Internal, "Error fetching videos")
    }

    pub fn not_found() -> Self {
        Self::new(ApiErrorCode::NotFound, "Not found")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.code.status(), Json(self)).into_response()
    }
}
