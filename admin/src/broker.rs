// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! Exchanges vault AppRole credentials for role-scoped AWS credentials and
//! turns them into region-scoped SDK clients.

use std::collections::HashMap;
use std::sync::Arc;

use aws_config::retry::RetryConfig;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_credential_types::Credentials;

use crate::cache::CredentialCache;
use crate::configuration::Settings;
use crate::errors::Result;
use crate::models::{ScopedCredentials, Stage, StageRegion};
use crate::vault::{CredentialRequest, SecretVault};

pub struct CredentialBroker {
    settings: Arc<Settings>,
    vault: Arc<dyn SecretVault>,
    cache: Option<CredentialCache>,
}

impl CredentialBroker {
    pub fn new(settings: Arc<Settings>, vault: Arc<dyn SecretVault>) -> Self {
        let cache = settings.credential_cache.then(CredentialCache::default);
        Self {
            settings,
            vault,
            cache,
        }
    }

    /// Returns credentials for the cross-account role of `stage`.
    ///
    /// The role ARN is resolved before the vault is contacted, so an unmapped
    /// stage never costs a login.
    #[tracing::instrument(skip(self))]
    pub async fn assume_role(&self, stage: Stage) -> Result<ScopedCredentials> {
        let role_arn = self.settings.role_arn(stage)?.to_string();

        match &self.cache {
            Some(cache) => {
                cache
                    .get_or_fetch(stage, || self.mint(stage, &role_arn))
                    .await
            }
            None => self.mint(stage, &role_arn).await,
        }
    }

    async fn mint(&self, stage: Stage, role_arn: &str) -> Result<ScopedCredentials> {
        tracing::info!(
            "[broker] assuming cross account role for {} (account {})",
            stage,
            self.settings.account_id(stage).unwrap_or("unknown")
        );

        let session = self.vault.authenticate().await?;
        tracing::debug!(
            "[broker] vault session valid for {}s",
            session.lease_duration().as_secs()
        );

        let request = CredentialRequest {
            mount: self.settings.vault.aws_mount.clone(),
            credential_role: self.settings.vault.credential_role.clone(),
            role_arn: role_arn.to_string(),
            ttl: self.settings.vault.credential_ttl(),
        };

        let credential = self
            .vault
            .generate_credentials(&session, &request)
            .await
            .map_err(|e| e.context(&format!("assume role for {stage}")))?;

        tracing::info!("[broker] successfully assumed cross account role for {}", stage);
        Ok(credential)
    }

    /// Reads a KV secret from the mount belonging to `stage`, which may be any
    /// of the accepted stage aliases.
    #[tracing::instrument(skip(self))]
    pub async fn read_stage_secret(
        &self,
        path: &str,
        stage: &str,
    ) -> Result<HashMap<String, String>> {
        let mount = self.settings.resolve_secrets_mount(stage)?;
        let session = self.vault.authenticate().await?;
        self.vault.read_secret(&session, path, mount).await
    }

    /// Builds a fresh, credentialed SDK configuration scoped to the target's
    /// region. Any AWS service client can be constructed from it.
    #[tracing::instrument(skip(self))]
    pub async fn build_sdk_config(&self, target: StageRegion) -> Result<SdkConfig> {
        let region_name = self
            .settings
            .region_profile(target.region)?
            .region_name
            .clone();

        let credential = self.assume_role(target.stage).await?;

        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region_name.clone()))
            .credentials_provider(Credentials::from(&credential))
            .retry_config(RetryConfig::disabled())
            .load()
            .await;

        tracing::debug!("[broker] built client configuration for {}", region_name);
        Ok(config)
    }

    pub async fn mwaa_client(&self, target: StageRegion) -> Result<aws_sdk_mwaa::Client> {
        let config = self.build_sdk_config(target).await?;
        Ok(aws_sdk_mwaa::Client::new(&config))
    }
}
