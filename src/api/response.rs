//! Success envelope shared by all endpoints.

use serde::Serialize;

/// `{"success": true, "data": ...}` wrapper around handler payloads
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Payload for endpoints that only report a message
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_envelope_shape() {
        let json = serde_json::to_value(ApiResponse::new(MessageResponse::new("ok"))).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["data"]["message"], "ok");
    }
}
