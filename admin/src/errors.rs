// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

pub type Result<T> = std::result::Result<T, AdminError>;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum AdminError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("authentication error: {0}")]
    Authentication(String),
    #[error("secret not found: {0}")]
    SecretNotFound(String),
    #[error("credential generation error: {0}")]
    CredentialGeneration(String),
    #[error("region mapping error: {0}")]
    RegionMapping(String),
    #[error("remote api error: {0}")]
    RemoteApi(String),
    #[error("response shape error: {0}")]
    ResponseShape(String),
}

impl AdminError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication(message.into())
    }

    pub fn credential_generation(message: impl Into<String>) -> Self {
        Self::CredentialGeneration(message.into())
    }

    pub fn remote_api(message: impl Into<String>) -> Self {
        Self::RemoteApi(message.into())
    }

    pub fn response_shape(message: impl Into<String>) -> Self {
        Self::ResponseShape(message.into())
    }

    /// Prefixes the message with the operation that failed, keeping the variant.
    pub fn context(self, operation: &str) -> Self {
        match self {
            Self::Configuration(msg) => Self::Configuration(format!("{operation}: {msg}")),
            Self::Authentication(msg) => Self::Authentication(format!("{operation}: {msg}")),
            Self::SecretNotFound(msg) => Self::SecretNotFound(format!("{operation}: {msg}")),
            Self::CredentialGeneration(msg) => {
                Self::CredentialGeneration(format!("{operation}: {msg}"))
            }
            Self::RegionMapping(msg) => Self::RegionMapping(format!("{operation}: {msg}")),
            Self::RemoteApi(msg) => Self::RemoteApi(format!("{operation}: {msg}")),
            Self::ResponseShape(msg) => Self::ResponseShape(format!("{operation}: {msg}")),
        }
    }
}

impl From<serde_json::Error> for AdminError {
    fn from(source: serde_json::Error) -> Self {
        tracing::error!("{:?}", source);
        AdminError::ResponseShape(source.to_string())
    }
}

impl From<vaultrs::error::ClientError> for AdminError {
    fn from(source: vaultrs::error::ClientError) -> Self {
        use vaultrs::error::ClientError;

        tracing::error!("{:?}", source);
        match source {
            ClientError::APIError { code: 404, .. } => {
                AdminError::SecretNotFound("vault returned 404".to_string())
            }
            ClientError::APIError {
                code: code @ (401 | 403),
                ..
            } => AdminError::Authentication(format!("vault denied access ({code})")),
            other => AdminError::RemoteApi(other.to_string()),
        }
    }
}

impl From<std::io::Error> for AdminError {
    fn from(source: std::io::Error) -> Self {
        tracing::error!("{:?}", source);
        AdminError::Configuration(source.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_keeps_variant() {
        let err = AdminError::authentication("permission denied").context("assume_role");
        assert_eq!(
            err,
            AdminError::Authentication("assume_role: permission denied".to_string())
        );
    }

    #[test]
    fn test_display_includes_category() {
        let err = AdminError::RegionMapping("xx".to_string());
        assert_eq!(err.to_string(), "region mapping error: xx");
    }

    #[test]
    fn test_vault_client_error_mapping() {
        let not_found = vaultrs::error::ClientError::APIError {
            code: 404,
            errors: vec![],
        };
        assert!(matches!(
            AdminError::from(not_found),
            AdminError::SecretNotFound(_)
        ));

        let denied = vaultrs::error::ClientError::APIError {
            code: 403,
            errors: vec!["permission denied".to_string()],
        };
        assert!(matches!(
            AdminError::from(denied),
            AdminError::Authentication(_)
        ));
    }

    #[test]
    fn test_json_error_is_response_shape_error() {
        let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert!(matches!(AdminError::from(err), AdminError::ResponseShape(_)));
    }

    #[test]
    fn test_io_error_is_configuration_error() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        assert!(matches!(AdminError::from(io), AdminError::Configuration(_)));
    }
}
