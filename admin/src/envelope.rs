// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

use serde::{Deserialize, Serialize};

use crate::errors::{AdminError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvelopeStatus {
    Success,
    Failed,
}

/// Uniform outcome of every public operation:
/// `{"status": "success" | "failed", "result": ..., "error": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub status: EnvelopeStatus,
    pub result: Option<T>,
    pub error: Option<String>,
}

impl<T> Envelope<T> {
    pub fn success(result: T) -> Self {
        Self {
            status: EnvelopeStatus::Success,
            result: Some(result),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: EnvelopeStatus::Failed,
            result: None,
            error: Some(error.into()),
        }
    }

    /// A failure that still carries the decoded response for diagnosis.
    /// Only writes produce this.
    pub fn failed_with_result(error: impl Into<String>, result: T) -> Self {
        Self {
            status: EnvelopeStatus::Failed,
            result: Some(result),
            error: Some(error.into()),
        }
    }

    pub fn from_result(result: Result<T>) -> Self {
        match result {
            Ok(value) => Self::success(value),
            Err(err) => Self::from(err),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == EnvelopeStatus::Success
    }

    /// Re-types a failed envelope so it can be forwarded unchanged.
    pub fn forward_failure<U>(self) -> Envelope<U> {
        Envelope {
            status: EnvelopeStatus::Failed,
            result: None,
            error: self.error,
        }
    }
}

impl<T> From<AdminError> for Envelope<T> {
    fn from(err: AdminError) -> Self {
        Self::failed(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_serialization() {
        let envelope = Envelope::success(json!({"count": 2}));
        assert_eq!(
            serde_json::to_value(&envelope).unwrap(),
            json!({"status": "success", "result": {"count": 2}, "error": null})
        );
    }

    #[test]
    fn test_failed_serialization() {
        let envelope: Envelope<()> = Envelope::failed("API returned status 500");
        assert_eq!(
            serde_json::to_value(&envelope).unwrap(),
            json!({"status": "failed", "result": null, "error": "API returned status 500"})
        );
    }

    #[test]
    fn test_from_result_error_keeps_message() {
        let envelope: Envelope<u8> =
            Envelope::from_result(Err(AdminError::RegionMapping("Invalid region: xx".into())));
        assert!(!envelope.is_success());
        assert_eq!(
            envelope.error.as_deref(),
            Some("region mapping error: Invalid region: xx")
        );
    }

    #[test]
    fn test_failed_with_result() {
        let envelope = Envelope::failed_with_result("API returned status 400", json!("bad"));
        assert_eq!(envelope.status, EnvelopeStatus::Failed);
        assert_eq!(envelope.result, Some(json!("bad")));
    }
}
