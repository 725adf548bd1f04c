use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Raw server field key to the messages reported for it.
pub type FieldErrorMap = BTreeMap<String, Vec<String>>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    Unauthorized,
    Forbidden,
    NotFound,
    Validation,
    RateLimited,
    Internal,
}

/// Error body returned by the directory backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub field_errors: FieldErrorMap,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            field_errors: FieldErrorMap::new(),
        }
    }

    pub fn validation(field_errors: FieldErrorMap) -> Self {
        Self {
            code: ErrorCode::Validation,
            message: "one or more fields are invalid".to_string(),
            field_errors,
        }
    }

    pub fn has_field_errors(&self) -> bool {
        self.field_errors.values().any(|messages| !messages.is_empty())
    }
}
