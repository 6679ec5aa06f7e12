use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::OrchestratorError;

const SYSTEM_ERROR_CODE: &str = "system_error";
const SYSTEM_ERROR_MESSAGE: &str = "An internal error occurred while processing the request";

/// Uniform result returned by every entry point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub success: bool,
    pub message: String,
    pub data: Option<Value>,
    pub errors: Option<Vec<String>>,
}

impl Envelope {
    pub fn ok(message: impl Into<String>, data: Option<Value>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data,
            errors: None,
        }
    }

    /// Failure envelope. System errors are reduced to an opaque message;
    /// validation and business errors keep their code and context.
    pub fn from_error(err: &OrchestratorError) -> Self {
        let (message, code, data) = match err {
            OrchestratorError::Validation(e) => (e.to_string(), e.code(), Some(e.context())),
            OrchestratorError::Business(e) => (e.to_string(), e.code(), Some(e.context())),
            OrchestratorError::System(_) => {
                (SYSTEM_ERROR_MESSAGE.to_string(), SYSTEM_ERROR_CODE, None)
            }
        };
        Self {
            success: false,
            message,
            data,
            errors: Some(vec![code.to_string()]),
        }
    }

    /// Wrap an entry point result, serializing the success payload.
    pub fn from_result<T: Serialize>(
        result: Result<T, OrchestratorError>,
        message: impl FnOnce(&T) -> String,
    ) -> Self {
        match result {
            Ok(value) => {
                let message = message(&value);
                match serde_json::to_value(&value) {
                    Ok(Value::Null) => Self::ok(message, None),
                    Ok(data) => Self::ok(message, Some(data)),
                    Err(e) => {
                        tracing::error!(error = %e, "failed to encode response payload");
                        Self {
                            success: false,
                            message: SYSTEM_ERROR_MESSAGE.to_string(),
                            data: None,
                            errors: Some(vec![SYSTEM_ERROR_CODE.to_string()]),
                        }
                    }
                }
            }
            Err(err) => Self::from_error(&err),
        }
    }
}
