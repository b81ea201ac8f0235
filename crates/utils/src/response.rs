use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// JSON envelope shared by every `/api` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct ApiResponse<T> {
    success: bool,
    data: Option<T>,
    message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }

    pub fn error(message: &str) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message.to_string()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn into_data(self) -> Option<T> {
        self.data
    }
}

#[cfg(test)]
mod tests {
    use super::ApiResponse;

    #[test]
    fn error_envelope_has_no_data() {
        let json = serde_json::to_value(ApiResponse::<()>::error("boom")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "success": false, "data": null, "message": "boom" })
        );
    }

    #[test]
    fn success_envelope_round_trips_payload() {
        let raw = serde_json::to_string(&ApiResponse::success(vec![1, 2, 3])).unwrap();
        let parsed: ApiResponse<Vec<i32>> = serde_json::from_str(&raw).unwrap();
        assert!(parsed.is_success());
        assert_eq!(parsed.message(), None);
        assert_eq!(parsed.into_data(), Some(vec![1, 2, 3]));
    }
}
