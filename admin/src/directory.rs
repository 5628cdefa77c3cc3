// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! Enumerates the orchestration environments of one `(stage, region)`.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::configuration::Settings;
use crate::constants::LIST_ENVIRONMENTS_MAX_RESULTS;
use crate::envelope::Envelope;
use crate::errors::Result;
use crate::management::ManagementConnector;
use crate::models::{
    LifecycleStatus, ManagedEnvironment, NetworkConfiguration, RegionCode, RegionProfile, Stage,
    StageRegion,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentListing {
    pub environments: Vec<ManagedEnvironment>,
    pub count: usize,
    /// Provider region name, e.g. `us-east-1`
    pub region: String,
    pub target_environment: Stage,
    pub region_details: RegionProfile,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentSummary {
    pub name: String,
    pub status: LifecycleStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub airflow_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment_class: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webserver_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&ManagedEnvironment> for EnvironmentSummary {
    fn from(environment: &ManagedEnvironment) -> Self {
        Self {
            name: environment.name.clone(),
            status: environment.status,
            airflow_version: environment.airflow_version.clone(),
            environment_class: environment.environment_class.clone(),
            webserver_url: environment.webserver_url.clone(),
            error: environment.error.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionSummary {
    pub region_code: RegionCode,
    pub region_name: String,
    pub location_char: String,
    pub target_environment: Stage,
    pub total: usize,
    pub status_counts: BTreeMap<LifecycleStatus, usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_configuration: Option<NetworkConfiguration>,
    pub environments: Vec<EnvironmentSummary>,
}

pub struct EnvironmentDirectory {
    settings: Arc<Settings>,
    connector: Arc<dyn ManagementConnector>,
}

impl EnvironmentDirectory {
    pub fn new(settings: Arc<Settings>, connector: Arc<dyn ManagementConnector>) -> Self {
        Self {
            settings,
            connector,
        }
    }

    /// Lists the environments of `(stage, region)` with their details.
    ///
    /// Only the first page of the listing is read. A failed detail lookup is
    /// reported on that environment alone, as `UNKNOWN` with the error.
    #[tracing::instrument(skip(self))]
    pub async fn list_environments(&self, stage: &str, region: &str) -> Envelope<EnvironmentListing> {
        tracing::info!(
            "[admin] listing environments for stage: {}, region: {}",
            stage,
            region
        );

        match self.try_list(stage, region).await {
            Ok(listing) => {
                tracing::info!("[admin] successfully listed {} environments", listing.count);
                Envelope::success(listing)
            }
            Err(err) => {
                tracing::error!("[admin] error while listing environments: {}", err);
                Envelope::from(err)
            }
        }
    }

    async fn try_list(&self, stage: &str, region: &str) -> Result<EnvironmentListing> {
        let target = StageRegion::parse(stage, region)?;
        let profile = self.settings.region_profile(target.region)?.clone();
        let network = profile.network_configuration.get(&target.stage).cloned();

        let api = self.connector.connect(target).await?;
        let names = api
            .list_environments(LIST_ENVIRONMENTS_MAX_RESULTS)
            .await
            .map_err(|e| e.context("listing environments"))?;

        tracing::info!("[admin] found {} environments", names.len());

        let mut environments = Vec::with_capacity(names.len());
        for name in names {
            tracing::debug!("[admin] getting details for environment: {}", name);
            let mut environment = match api.get_environment(&name).await {
                Ok(environment) => environment,
                Err(err) => {
                    tracing::warn!("[admin] could not get details for {}: {}", name, err);
                    ManagedEnvironment::unknown(name, format!("Could not fetch details: {err}"))
                }
            };
            environment.network = network.clone();
            environments.push(environment);
        }

        Ok(EnvironmentListing {
            count: environments.len(),
            environments,
            region: profile.region_name.clone(),
            target_environment: target.stage,
            region_details: profile,
        })
    }

    /// Per-status counts for `(stage, region)` alongside the static region data.
    /// A failed listing is forwarded as is.
    #[tracing::instrument(skip(self))]
    pub async fn summarize_by_region(&self, stage: &str, region: &str) -> Envelope<RegionSummary> {
        let envelope = self.list_environments(stage, region).await;
        if !envelope.is_success() {
            return envelope.forward_failure();
        }
        let Some(listing) = envelope.result else {
            return Envelope::failed("environment listing returned no result");
        };

        // the listing succeeded, so the pair already parsed
        let Ok(target) = StageRegion::parse(stage, region) else {
            return Envelope::failed(format!("Invalid target: {stage}/{region}"));
        };

        let mut status_counts = BTreeMap::new();
        for environment in &listing.environments {
            *status_counts.entry(environment.status).or_insert(0) += 1;
        }

        let profile = &listing.region_details;
        Envelope::success(RegionSummary {
            region_code: target.region,
            region_name: listing.region.clone(),
            location_char: profile.location_char.clone(),
            target_environment: target.stage,
            total: listing.count,
            status_counts,
            network_configuration: profile.network_configuration.get(&target.stage).cloned(),
            environments: listing.environments.iter().map(EnvironmentSummary::from).collect(),
        })
    }
}
