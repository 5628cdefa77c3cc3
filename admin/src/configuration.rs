// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{ArgAction, Parser, Subcommand};
use serde::{Deserialize, Serialize};

use crate::constants::{
    CONFIG_PATH_ENV, DEFAULT_APPROLE_MOUNT, DEFAULT_AWS_SECRETS_MOUNT, DEFAULT_CONFIG_PATH,
    DEFAULT_CREDENTIAL_ROLE,
};
use crate::errors::{AdminError, Result};
use crate::models::{RegionCode, RegionProfile, Stage, StageRegion};

#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct AdminOptions {
    #[arg(long, default_value = DEFAULT_CONFIG_PATH, env = CONFIG_PATH_ENV)]
    pub config: PathBuf,
    /// Overrides the `environment` entry of the settings file
    #[arg(long, env("MWAA_ADMIN_STAGE"))]
    pub stage: Option<String>,
    /// Overrides the `region` entry of the settings file
    #[arg(long, env("MWAA_ADMIN_REGION"))]
    pub region: Option<String>,
    #[arg(long, default_value = "false", env("MWAA_ADMIN_LOG_JSON"), action = ArgAction::SetTrue)]
    pub log_json: bool,
    #[command(subcommand)]
    pub command: Command,
}

impl AdminOptions {
    /// Raw `(stage, region)` to operate on; validation happens in the operations.
    pub fn target(&self, settings: &Settings) -> (String, String) {
        (
            self.stage.clone().unwrap_or_else(|| settings.stage.clone()),
            self.region.clone().unwrap_or_else(|| settings.region.clone()),
        )
    }
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// List every environment with its details
    Environments,
    /// Per-status counts and a trimmed view of the environments
    Summary,
    /// Read or write Airflow variables
    Variables {
        #[command(subcommand)]
        action: VariableAction,
    },
    /// Read or write Airflow connections
    Connections {
        #[command(subcommand)]
        action: ConnectionAction,
    },
    /// Call the environment REST API directly and print the raw response
    Raw {
        environment: String,
        #[arg(long, default_value = "/variables")]
        path: String,
        #[arg(long, default_value = "GET")]
        method: String,
        /// JSON request body
        #[arg(long)]
        body: Option<String>,
    },
}

#[derive(Debug, Clone, Subcommand)]
pub enum VariableAction {
    List {
        environment: String,
    },
    Set {
        environment: String,
        key: String,
        value: String,
    },
}

#[derive(Debug, Clone, Subcommand)]
pub enum ConnectionAction {
    List {
        environment: String,
    },
    Set {
        environment: String,
        connection_id: String,
        conn_type: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, default_value = "")]
        host: String,
        #[arg(long, default_value = "")]
        login: String,
        #[arg(long, default_value = "", env("MWAA_ADMIN_CONNECTION_PASSWORD"), hide_env_values = true)]
        password: String,
        #[arg(long, default_value = "")]
        schema: String,
        #[arg(long, default_value = "0")]
        port: u16,
        #[arg(long, default_value = "")]
        extra: String,
    },
}

/// Vault connection parameters. Key names follow the deployed `config.json`.
#[derive(Clone, Serialize, Deserialize)]
pub struct VaultSettings {
    #[serde(rename = "URL_KEY")]
    pub address: String,
    #[serde(rename = "NAMESPACE_KEY", default)]
    pub namespace: Option<String>,
    #[serde(rename = "ROLE_ID_KEY")]
    pub role_id: String,
    #[serde(rename = "SECRET_ID_KEY")]
    pub secret_id: String,
    #[serde(rename = "DEV_SECRET_ENGINE")]
    pub dev_secret_engine: String,
    #[serde(rename = "TST_SECRET_ENGINE")]
    pub tst_secret_engine: String,
    #[serde(rename = "PRD_SECRET_ENGINE")]
    pub prd_secret_engine: String,
    #[serde(default = "default_approle_mount")]
    pub approle_mount: String,
    #[serde(default = "default_aws_mount")]
    pub aws_mount: String,
    #[serde(default = "default_credential_role")]
    pub credential_role: String,
    /// Requested lifetime for generated credentials; the vault default applies when unset
    #[serde(default)]
    pub credential_ttl_secs: Option<u64>,
}

fn default_approle_mount() -> String {
    DEFAULT_APPROLE_MOUNT.to_string()
}

fn default_aws_mount() -> String {
    DEFAULT_AWS_SECRETS_MOUNT.to_string()
}

fn default_credential_role() -> String {
    DEFAULT_CREDENTIAL_ROLE.to_string()
}

impl VaultSettings {
    pub fn secrets_mount(&self, stage: Stage) -> &str {
        match stage {
            Stage::Dev => &self.dev_secret_engine,
            Stage::Tst => &self.tst_secret_engine,
            Stage::Prd => &self.prd_secret_engine,
        }
    }

    pub fn credential_ttl(&self) -> Option<Duration> {
        self.credential_ttl_secs.map(Duration::from_secs)
    }
}

impl fmt::Debug for VaultSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VaultSettings")
            .field("address", &self.address)
            .field("namespace", &self.namespace)
            .field("role_id", &self.role_id)
            .field("secret_id", &"[REDACTED]")
            .field("dev_secret_engine", &self.dev_secret_engine)
            .field("tst_secret_engine", &self.tst_secret_engine)
            .field("prd_secret_engine", &self.prd_secret_engine)
            .field("approle_mount", &self.approle_mount)
            .field("aws_mount", &self.aws_mount)
            .field("credential_role", &self.credential_role)
            .field("credential_ttl_secs", &self.credential_ttl_secs)
            .finish()
    }
}

/// Static data injected at startup: active target, per-stage roles, vault
/// parameters and the region table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(rename = "environment")]
    pub stage: String,
    pub region: String,
    pub dev_environment_role_arn: String,
    pub tst_environment_role_arn: String,
    pub prd_environment_role_arn: String,
    #[serde(default)]
    pub dev_account_id: Option<String>,
    #[serde(default)]
    pub tst_account_id: Option<String>,
    #[serde(default)]
    pub prd_account_id: Option<String>,
    #[serde(flatten)]
    pub vault: VaultSettings,
    #[serde(default = "default_region_details")]
    pub region_details: BTreeMap<RegionCode, RegionProfile>,
    #[serde(default)]
    pub credential_cache: bool,
}

/// Built-in region table; network configuration is site specific and only
/// comes from the settings file.
pub fn default_region_details() -> BTreeMap<RegionCode, RegionProfile> {
    [
        (RegionCode::Us, "us-east-1", "VGA"),
        (RegionCode::Eu, "eu-central-1", "FRA"),
        (RegionCode::Jp, "ap-northeast-1", "TYO"),
    ]
    .into_iter()
    .map(|(code, region_name, location_char)| {
        (
            code,
            RegionProfile {
                region_name: region_name.to_string(),
                location_char: location_char.to_string(),
                network_configuration: BTreeMap::new(),
            },
        )
    })
    .collect()
}

impl Settings {
    #[tracing::instrument]
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            AdminError::configuration(format!(
                "Unable to fetch configs from {}: {e}",
                path.display()
            ))
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw)
            .map_err(|e| AdminError::configuration(format!("Unable to parse configs: {e}")))
    }

    /// The active target named by the settings file.
    pub fn target(&self) -> Result<StageRegion> {
        StageRegion::parse(&self.stage, &self.region)
    }

    pub fn role_arn(&self, stage: Stage) -> Result<&str> {
        let arn = match stage {
            Stage::Dev => &self.dev_environment_role_arn,
            Stage::Tst => &self.tst_environment_role_arn,
            Stage::Prd => &self.prd_environment_role_arn,
        };
        if arn.trim().is_empty() {
            return Err(AdminError::configuration(format!(
                "no role ARN configured for stage {stage}"
            )));
        }
        Ok(arn)
    }

    pub fn account_id(&self, stage: Stage) -> Option<&str> {
        match stage {
            Stage::Dev => self.dev_account_id.as_deref(),
            Stage::Tst => self.tst_account_id.as_deref(),
            Stage::Prd => self.prd_account_id.as_deref(),
        }
    }

    pub fn region_profile(&self, region: RegionCode) -> Result<&RegionProfile> {
        self.region_details
            .get(&region)
            .ok_or_else(|| AdminError::RegionMapping(format!("Invalid region: {region}")))
    }

    /// Resolves the secrets mount for a stage name, accepting the usual aliases.
    pub fn resolve_secrets_mount(&self, stage: &str) -> Result<&str> {
        Stage::from_alias(stage)
            .map(|stage| self.vault.secrets_mount(stage))
            .ok_or_else(|| {
                AdminError::configuration(format!(
                    "Invalid environment selection for vault secret engine: {stage}"
                ))
            })
    }
}
