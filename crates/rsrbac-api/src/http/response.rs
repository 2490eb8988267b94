//! API response envelope.
//!
//! Every JSON response (success or rejection) uses the same envelope:
//! `{status, code, message, timestamp, trackingId}` plus `data` on success.
//! Timestamp and tracking id are generated fresh per response.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use uuid::Uuid;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Uniform response envelope.
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse<T> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    pub status: bool,
    pub code: u16,
    pub message: String,
    pub timestamp: String,
    #[serde(rename = "trackingId")]
    pub tracking_id: Uuid,
}

impl<T: Serialize> ApiResponse<T> {
    /// Successful response carrying `data`.
    pub fn success(data: T, message: impl Into<String>, code: u16) -> Self {
        Self {
            data: Some(data),
            status: true,
            code,
            message: message.into(),
            timestamp: now_timestamp(),
            tracking_id: Uuid::new_v4(),
        }
    }
}

impl ApiResponse<()> {
    /// Error response with no payload.
    pub fn error(message: impl Into<String>, code: u16) -> Self {
        Self {
            data: None,
            status: false,
            code,
            message: message.into(),
            timestamp: now_timestamp(),
            tracking_id: Uuid::new_v4(),
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> axum::response::Response {
        let status = StatusCode::from_u16(self.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

fn now_timestamp() -> String {
    chrono::Local::now().format(TIMESTAMP_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_envelope_shape() {
        let resp = ApiResponse::success(serde_json::json!({"id": 1}), "OK", 200);
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["status"], true);
        assert_eq!(json["code"], 200);
        assert_eq!(json["message"], "OK");
        assert_eq!(json["data"]["id"], 1);
        assert!(json.get("trackingId").is_some());
        // yyyy-MM-dd HH:mm:ss
        let ts = json["timestamp"].as_str().unwrap();
        assert_eq!(ts.len(), 19);
        assert_eq!(&ts[4..5], "-");
        assert_eq!(&ts[10..11], " ");
    }

    #[test]
    fn error_envelope_omits_data() {
        let resp = ApiResponse::error("Too many requests. Try again later.", 429);
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["status"], false);
        assert_eq!(json["code"], 429);
        assert!(json.get("data").is_none());
    }

    #[test]
    fn tracking_ids_are_fresh_per_response() {
        let a = ApiResponse::error("x", 400);
        let b = ApiResponse::error("x", 400);
        assert_ne!(a.tracking_id, b.tracking_id);
    }
}
