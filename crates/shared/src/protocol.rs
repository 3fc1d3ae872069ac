use serde::{Deserialize, Serialize};

use crate::domain::SessionId;

pub const LOAD_URL_ROUTE: &str = "/load-url";
pub const ASK_ROUTE: &str = "/ask";

/// Body of the bind-session request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadUrlRequest {
    pub session_id: SessionId,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadUrlResponse {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AskRequest {
    pub session_id: SessionId,
    pub question: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskResponse {
    pub answer: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_url_request_uses_backend_field_names() {
        let body = serde_json::to_value(LoadUrlRequest {
            session_id: SessionId::from("session_1_abc"),
            url: "https://example.com".to_string(),
        })
        .expect("json");
        assert_eq!(
            body,
            serde_json::json!({ "session_id": "session_1_abc", "url": "https://example.com" })
        );
    }

    #[test]
    fn ask_response_requires_answer() {
        assert!(serde_json::from_str::<AskResponse>("{}").is_err());
        let parsed: AskResponse =
            serde_json::from_str(r#"{"answer":"It's a blog post."}"#).expect("json");
        assert_eq!(parsed.answer, "It's a blog post.");
    }
}
