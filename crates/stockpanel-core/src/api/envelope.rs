use serde::Deserialize;

use super::error::{ApiError, DEFAULT_ERROR_MESSAGE};

/// Success marker in the envelope's `code` field.
const OK_CODE: &str = "OK";

/// Response wrapper every endpoint uses.
#[derive(Debug, Deserialize)]
pub struct ApiEnvelope<T> {
    #[serde(default)]
    pub code: String,
    pub data: Option<T>,
    #[serde(default)]
    pub error: Option<String>,
}

impl<T> ApiEnvelope<T> {
    pub fn is_ok(&self) -> bool {
        self.code == OK_CODE
    }

    fn rejection(error: Option<String>) -> ApiError {
        ApiError::Rejected(
            error
                .filter(|e| !e.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_ERROR_MESSAGE.to_string()),
        )
    }

    /// The payload of an `OK` envelope.
    pub fn into_result(self) -> Result<T, ApiError> {
        if !self.is_ok() {
            return Err(Self::rejection(self.error));
        }
        self.data
            .ok_or_else(|| ApiError::InvalidResponse("response carried no data".to_string()))
    }

    /// The payload of an `OK` envelope, which may legitimately be absent.
    pub fn into_optional(self) -> Result<Option<T>, ApiError> {
        if self.is_ok() {
            Ok(self.data)
        } else {
            Err(Self::rejection(self.error))
        }
    }

    /// Success check for calls whose payload is not needed.
    pub fn into_ack(self) -> Result<(), ApiError> {
        self.into_optional().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn parse(json: &str) -> ApiEnvelope<Value> {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_ok_envelope_yields_data() {
        let data = parse(r#"{"code":"OK","data":{"n":1}}"#).into_result().unwrap();
        assert_eq!(data["n"], 1);
    }

    #[test]
    fn test_rejected_envelope_uses_error_text() {
        let err = parse(r#"{"code":"ERR","error":"Category already exists"}"#)
            .into_result()
            .unwrap_err();
        assert_eq!(err.to_string(), "Category already exists");
    }

    #[test]
    fn test_rejected_envelope_default_message() {
        let err = parse(r#"{"code":"FAIL"}"#).into_result().unwrap_err();
        assert_eq!(err.to_string(), DEFAULT_ERROR_MESSAGE);
        let err = parse(r#"{"error":""}"#).into_ack().unwrap_err();
        assert_eq!(err.to_string(), DEFAULT_ERROR_MESSAGE);
    }

    #[test]
    fn test_ok_without_data() {
        assert!(parse(r#"{"code":"OK"}"#).into_ack().is_ok());
        assert!(matches!(
            parse(r#"{"code":"OK"}"#).into_result(),
            Err(ApiError::InvalidResponse(_))
        ));
    }
}
