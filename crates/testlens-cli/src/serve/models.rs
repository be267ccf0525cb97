//! Request/response types of the command server.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Command that cancels an in-flight request; its argument is the target id.
pub const CANCEL_COMMAND: &str = "cancel";

/// One request line.
#[derive(Debug, Clone, Deserialize)]
pub struct Request {
    pub id: u64,
    pub command: String,
    #[serde(default)]
    pub arguments: Vec<Value>,
}

/// One response line.
#[derive(Debug, Clone, Serialize)]
pub struct Response {
    /// Id of the request answered; absent when the request line was unreadable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Response {
    pub fn ok(id: u64, result: Value) -> Self {
        Self {
            id: Some(id),
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: Option<u64>, error: impl ToString) -> Self {
        Self {
            id,
            result: None,
            error: Some(error.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_arguments_default_to_empty() {
        let request: Request = serde_json::from_str(r#"{"id": 7, "command": "searchAllTests"}"#).unwrap();
        assert_eq!(request.id, 7);
        assert!(request.arguments.is_empty());
    }

    #[test]
    fn test_response_shapes() {
        let ok = serde_json::to_value(Response::ok(1, json!(["pkg"]))).unwrap();
        assert_eq!(ok, json!({"id": 1, "result": ["pkg"]}));

        let err = serde_json::to_value(Response::error(None, "bad line")).unwrap();
        assert_eq!(err, json!({"error": "bad line"}));
    }
}
