//! The generation contract: request, response envelope, errors, and the
//! `CodeGenerator` trait every backend implements.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::patch::CodePatch;
use crate::vfs::File;

/// What the service is given: the prompt and the whole workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub prompt: String,
    pub files: Vec<File>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_file_path: Option<String>,
}

/// Response envelope: `{ success, data?, error? }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<CodePatch>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl GenerateResponse {
    pub fn ok(patch: CodePatch) -> Self {
        Self {
            success: true,
            data: Some(patch),
            error: None,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }

    /// Collapse the envelope. `success: true` without `data` is malformed.
    pub fn into_result(self) -> Result<CodePatch, GenerateError> {
        match (self.success, self.data) {
            (true, Some(patch)) => Ok(patch),
            (true, None) => Err(GenerateError::Malformed(
                "success response carried no patch".to_string(),
            )),
            (false, _) => Err(GenerateError::Service(
                self.error
                    .unwrap_or_else(|| "generation failed".to_string()),
            )),
        }
    }
}

/// Why a generation request produced no patch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerateError {
    /// The service answered with `success: false`.
    #[error("{0}")]
    Service(String),
    /// The service could not be reached.
    #[error("request failed: {0}")]
    Transport(String),
    /// The service answered with something that is not a valid envelope.
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("timed out after {}s", .0.as_secs())]
    Timeout(Duration),
    #[error("cancelled")]
    Cancelled,
    #[error("no code generation endpoint configured")]
    Unconfigured,
}

/// A code generation backend.
///
/// Implementations may take arbitrarily long; the studio bounds every call
/// with a timeout and a cancellation token.
#[async_trait]
pub trait CodeGenerator: Send + Sync {
    async fn generate(&self, request: &GenerateRequest) -> Result<CodePatch, GenerateError>;
}

/// Placeholder backend used when no endpoint is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unconfigured;

#[async_trait]
impl CodeGenerator for Unconfigured {
    async fn generate(&self, _request: &GenerateRequest) -> Result<CodePatch, GenerateError> {
        Err(GenerateError::Unconfigured)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_wire_format() {
        let request = GenerateRequest {
            prompt: "add nav".into(),
            files: vec![File::new("src/App.tsx", "x")],
            active_file_path: Some("src/App.tsx".into()),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "prompt": "add nav",
                "files": [{"path": "src/App.tsx", "content": "x"}],
                "activeFilePath": "src/App.tsx",
            })
        );

        let closed = GenerateRequest {
            active_file_path: None,
            ..request
        };
        let json = serde_json::to_value(&closed).unwrap();
        assert!(json.get("activeFilePath").is_none());
    }

    #[test]
    fn test_envelope_success() {
        let raw = r#"{"success": true, "data": {"plan": "p", "operations": []}}"#;
        let response: GenerateResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(response.into_result(), Ok(CodePatch::new("p")));
    }

    #[test]
    fn test_envelope_failure() {
        let raw = r#"{"success": false, "error": "quota exceeded"}"#;
        let response: GenerateResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(
            response.into_result(),
            Err(GenerateError::Service("quota exceeded".into()))
        );

        let bare: GenerateResponse = serde_json::from_str(r#"{"success": false}"#).unwrap();
        assert_eq!(
            bare.into_result().unwrap_err().to_string(),
            "generation failed"
        );
    }

    #[test]
    fn test_envelope_success_without_data() {
        let response = GenerateResponse {
            success: true,
            data: None,
            error: None,
        };
        assert!(matches!(
            response.into_result(),
            Err(GenerateError::Malformed(_))
        ));
    }

    #[test]
    fn test_timeout_message() {
        let err = GenerateError::Timeout(Duration::from_secs(60));
        assert_eq!(err.to_string(), "timed out after 60s");
    }

    #[tokio::test]
    async fn test_unconfigured() {
        let request = GenerateRequest {
            prompt: "x".into(),
            files: vec![],
            active_file_path: None,
        };
        assert_eq!(
            Unconfigured.generate(&request).await,
            Err(GenerateError::Unconfigured)
        );
    }
}
