//! Error payload returned by the aggregation API.
//!
//! Every failed API call answers with a JSON body of this shape. Only
//! `error_type` and `error_code` drive decisions; the remaining fields are
//! carried for diagnostics.

use std::fmt;

use serde::{Deserialize, Serialize};

/// `error_type` for problems tied to a specific item.
pub const ITEM_ERROR: &str = "ITEM_ERROR";

/// `error_code` meaning the institution login must be refreshed by the user.
pub const ITEM_LOGIN_REQUIRED: &str = "ITEM_LOGIN_REQUIRED";

/// Error body of a failed API call.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct ApiErrorPayload {
    /// Broad error category (e.g. `ITEM_ERROR`, `INVALID_REQUEST`).
    pub error_type: String,
    /// Specific error code within the category.
    pub error_code: String,
    /// Developer-facing message.
    #[serde(default)]
    pub error_message: String,
    /// End-user-facing message, when the provider supplies one.
    #[serde(default)]
    pub display_message: Option<String>,
    /// Provider request id, useful when reporting issues upstream.
    #[serde(default)]
    pub request_id: Option<String>,
}

impl ApiErrorPayload {
    /// Build a payload from its category and code.
    pub fn new(error_type: &str, error_code: &str, error_message: &str) -> Self {
        Self {
            error_type: error_type.to_string(),
            error_code: error_code.to_string(),
            error_message: error_message.to_string(),
            display_message: None,
            request_id: None,
        }
    }
}

impl fmt::Display for ApiErrorPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.error_type, self.error_code)?;
        if !self.error_message.is_empty() {
            write!(f, ": {}", self.error_message)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_provider_body() {
        let body = r#"{
            "error_type": "ITEM_ERROR",
            "error_code": "ITEM_LOGIN_REQUIRED",
            "error_message": "the login details of this item have changed",
            "display_message": null,
            "request_id": "abc"
        }"#;
        let payload: ApiErrorPayload = serde_json::from_str(body).unwrap();
        assert_eq!(payload.error_type, ITEM_ERROR);
        assert_eq!(payload.error_code, ITEM_LOGIN_REQUIRED);
        assert_eq!(payload.request_id.as_deref(), Some("abc"));
    }

    #[test]
    fn display_includes_type_code_and_message() {
        let payload = ApiErrorPayload::new("INVALID_INPUT", "INVALID_PUBLIC_TOKEN", "bad token");
        assert_eq!(payload.to_string(), "INVALID_INPUT/INVALID_PUBLIC_TOKEN: bad token");
    }
}
