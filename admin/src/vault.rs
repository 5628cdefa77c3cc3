// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! Secret vault access.
//!
//! [`SecretVault`] is the seam the credential broker talks to. The production
//! implementation, [`HashiCorpVault`], logs in with AppRole, reads KV v2
//! secrets and asks the AWS secrets engine for dynamic credentials:
//!
//! ```text
//! POST /v1/auth/<approle_mount>/login            -> client token
//! GET  /v1/<kv_mount>/data/<path>                 -> {data:{data:{...}}}
//! GET  /v1/<aws_mount>/creds/<credential_role>    -> {lease_duration, data:{access_key, secret_key, security_token}}
//! ```
//!
//! Sessions are never reused: every credential exchange logs in again.

use std::collections::HashMap;
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use vaultrs::client::{VaultClient, VaultClientSettingsBuilder};
use vaultrs::error::ClientError;
use vaultrs::kv2;

use crate::configuration::VaultSettings;
use crate::errors::{AdminError, Result};
use crate::models::{ScopedCredentials, VaultSession};

/// Parameters of one dynamic credential request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialRequest {
    /// Mount of the vault AWS secrets engine
    pub mount: String,
    /// Vault role configured on that engine
    pub credential_role: String,
    /// Cross-account role the credentials are scoped to
    pub role_arn: String,
    pub ttl: Option<Duration>,
}

#[async_trait]
pub trait SecretVault: Send + Sync {
    /// Logs in with the application role. Never retries.
    async fn authenticate(&self) -> Result<VaultSession>;

    /// Reads the latest version of a KV v2 secret.
    async fn read_secret(
        &self,
        session: &VaultSession,
        path: &str,
        mount: &str,
    ) -> Result<HashMap<String, String>>;

    /// Asks the AWS secrets engine for a fresh credential triple.
    async fn generate_credentials(
        &self,
        session: &VaultSession,
        request: &CredentialRequest,
    ) -> Result<ScopedCredentials>;
}

pub struct HashiCorpVault {
    settings: VaultSettings,
    http: reqwest::Client,
}

#[derive(Deserialize)]
struct LeasedResponse<T> {
    #[serde(default)]
    lease_duration: u64,
    data: T,
}

#[derive(Deserialize)]
struct AwsCredentialData {
    access_key: String,
    secret_key: String,
    #[serde(default)]
    security_token: Option<String>,
}

impl HashiCorpVault {
    pub fn new(settings: VaultSettings) -> Result<Self> {
        if settings.address.trim().is_empty() {
            return Err(AdminError::configuration("Vault address cannot be empty"));
        }

        let http = reqwest::Client::builder().build().map_err(|e| {
            AdminError::configuration(format!("Failed to create Vault HTTP client: {e}"))
        })?;

        Ok(Self { settings, http })
    }

    fn client(&self, token: Option<&str>) -> Result<VaultClient> {
        let mut builder = VaultClientSettingsBuilder::default();
        builder.address(&self.settings.address);

        if let Some(token) = token {
            builder.token(token);
        }

        if let Some(namespace) = self.namespace() {
            builder.namespace(Some(namespace.to_string()));
        }

        let settings = builder.build().map_err(|e| {
            AdminError::configuration(format!("Invalid Vault configuration: {e}"))
        })?;

        VaultClient::new(settings)
            .map_err(|e| AdminError::authentication(format!("Failed to create Vault client: {e}")))
    }

    fn namespace(&self) -> Option<&str> {
        self.settings
            .namespace
            .as_deref()
            .filter(|namespace| !namespace.is_empty())
    }
}

#[async_trait]
impl SecretVault for HashiCorpVault {
    #[tracing::instrument(skip(self))]
    async fn authenticate(&self) -> Result<VaultSession> {
        let client = self.client(None)?;

        let auth = vaultrs::auth::approle::login(
            &client,
            &self.settings.approle_mount,
            &self.settings.role_id,
            &self.settings.secret_id,
        )
        .await
        .map_err(|e| {
            tracing::error!("[vault] error occurred while authenticating the client: {}", e);
            AdminError::authentication(format!("AppRole login failed: {e}"))
        })?;

        tracing::info!("[vault] authentication successful");

        Ok(VaultSession::new(
            auth.client_token.clone(),
            Duration::from_secs(auth.lease_duration),
        ))
    }

    #[tracing::instrument(skip(self, session))]
    async fn read_secret(
        &self,
        session: &VaultSession,
        path: &str,
        mount: &str,
    ) -> Result<HashMap<String, String>> {
        let client = self.client(Some(session.token()))?;

        let secret: HashMap<String, Value> = kv2::read(&client, mount, path)
            .await
            .map_err(|e| read_error(path, e))?;

        Ok(secret
            .into_iter()
            .map(|(key, value)| match value {
                Value::String(value) => (key, value),
                other => (key, other.to_string()),
            })
            .collect())
    }

    #[tracing::instrument(skip(self, session))]
    async fn generate_credentials(
        &self,
        session: &VaultSession,
        request: &CredentialRequest,
    ) -> Result<ScopedCredentials> {
        let url = format!(
            "{}/v1/{}/creds/{}",
            self.settings.address.trim_end_matches('/'),
            request.mount,
            request.credential_role
        );

        let mut query = vec![("role_arn", request.role_arn.clone())];
        if let Some(ttl) = request.ttl {
            query.push(("ttl", format!("{}s", ttl.as_secs())));
        }

        let mut builder = self
            .http
            .get(url)
            .query(&query)
            .header("X-Vault-Token", session.token());
        if let Some(namespace) = self.namespace() {
            builder = builder.header("X-Vault-Namespace", namespace);
        }

        let response = builder.send().await.map_err(|e| {
            tracing::error!("[vault] credential request failed: {}", e);
            AdminError::credential_generation(format!("vault unreachable: {e}"))
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(
                "[vault] credential role {} rejected ({}): {}",
                request.credential_role,
                status,
                body
            );
            return Err(AdminError::credential_generation(format!(
                "vault rejected credential role {} for {} with status {}",
                request.credential_role,
                request.role_arn,
                status.as_u16()
            )));
        }

        let leased: LeasedResponse<AwsCredentialData> = response.json().await.map_err(|e| {
            AdminError::credential_generation(format!("malformed credential response: {e}"))
        })?;

        let expires_at = (leased.lease_duration > 0)
            .then(|| SystemTime::now() + Duration::from_secs(leased.lease_duration));

        tracing::debug!("[vault] generated credentials, expires_at: {:?}", expires_at);

        let data = leased.data;
        Ok(ScopedCredentials {
            access_key_id: data.access_key,
            secret_access_key: data.secret_key,
            session_token: data.security_token,
            expires_at,
        })
    }
}

fn read_error(path: &str, err: ClientError) -> AdminError {
    AdminError::from(err).context(&format!("reading secret {path}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configuration::tests::sample_settings;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn vault_for(server: &MockServer) -> HashiCorpVault {
        let mut settings = sample_settings().vault;
        settings.address = server.uri();
        settings.namespace = None;
        HashiCorpVault::new(settings).unwrap()
    }

    fn session() -> VaultSession {
        VaultSession::new("hvs.test-token", Duration::from_secs(1200))
    }

    fn request() -> CredentialRequest {
        CredentialRequest {
            mount: "aws".to_string(),
            credential_role: "assumerole".to_string(),
            role_arn: "arn:aws:iam::111111111111:role/dev-admin".to_string(),
            ttl: None,
        }
    }

    #[test]
    fn test_new_rejects_empty_address() {
        let mut settings = sample_settings().vault;
        settings.address = " ".to_string();
        assert!(matches!(
            HashiCorpVault::new(settings),
            Err(AdminError::Configuration(_))
        ));
    }

    #[tokio::test]
    async fn test_authenticate_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/auth/approle/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "request_id": "9e2f1b2c-0000-0000-0000-000000000000",
                "lease_id": "",
                "renewable": false,
                "lease_duration": 0,
                "data": null,
                "wrap_info": null,
                "warnings": null,
                "auth": {
                    "client_token": "hvs.issued",
                    "accessor": "accessor",
                    "policies": ["default"],
                    "token_policies": ["default"],
                    "metadata": {"role_name": "mwaa-admin"},
                    "lease_duration": 1200,
                    "renewable": true,
                    "entity_id": "entity",
                    "token_type": "service",
                    "orphan": true,
                    "mfa_requirement": null,
                    "num_uses": 0
                }
            })))
            .mount(&server)
            .await;

        let session = vault_for(&server).authenticate().await.unwrap();
        assert_eq!(session.token(), "hvs.issued");
        assert_eq!(session.lease_duration(), Duration::from_secs(1200));
    }

    #[tokio::test]
    async fn test_authenticate_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/auth/approle/login"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_json(serde_json::json!({"errors": ["invalid role or secret ID"]})),
            )
            .mount(&server)
            .await;

        let err = vault_for(&server).authenticate().await.unwrap_err();
        assert!(matches!(err, AdminError::Authentication(_)), "{err:?}");
    }

    #[tokio::test]
    async fn test_read_secret_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/kv-dev/data/databricks/token"))
            .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({"errors": []})))
            .mount(&server)
            .await;

        let err = vault_for(&server)
            .read_secret(&session(), "databricks/token", "kv-dev")
            .await
            .unwrap_err();
        assert!(matches!(err, AdminError::SecretNotFound(_)), "{err:?}");
    }

    #[tokio::test]
    async fn test_generate_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/aws/creds/assumerole"))
            .and(query_param("role_arn", "arn:aws:iam::111111111111:role/dev-admin"))
            .and(header("X-Vault-Token", "hvs.test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "lease_id": "aws/creds/assumerole/abc",
                "lease_duration": 3600,
                "renewable": false,
                "data": {
                    "access_key": "ASIAEXAMPLE",
                    "secret_key": "secret",
                    "security_token": "session-token"
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let credential = vault_for(&server)
            .generate_credentials(&session(), &request())
            .await
            .unwrap();

        assert_eq!(credential.access_key_id, "ASIAEXAMPLE");
        assert_eq!(credential.secret_access_key, "secret");
        assert_eq!(credential.session_token.as_deref(), Some("session-token"));
        assert!(credential.expires_at.unwrap() > SystemTime::now());
    }

    #[tokio::test]
    async fn test_generate_credentials_passes_ttl() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/aws/creds/assumerole"))
            .and(query_param("ttl", "900s"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": {"access_key": "A", "secret_key": "S"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let mut request = request();
        request.ttl = Some(Duration::from_secs(900));
        let credential = vault_for(&server)
            .generate_credentials(&session(), &request)
            .await
            .unwrap();

        // no lease reported, so no expiry is assumed
        assert!(credential.expires_at.is_none());
        assert!(credential.session_token.is_none());
    }

    #[tokio::test]
    async fn test_generate_credentials_rejected_role() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/aws/creds/assumerole"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_json(serde_json::json!({"errors": ["role not allowed"]})),
            )
            .mount(&server)
            .await;

        let err = vault_for(&server)
            .generate_credentials(&session(), &request())
            .await
            .unwrap_err();
        match err {
            AdminError::CredentialGeneration(msg) => assert!(msg.contains("400"), "{msg}"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
