// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, SystemTime};

use aws_credential_types::Credentials;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use zeroize::ZeroizeOnDrop;

use crate::constants::{
    CONNECTIONS_PATH, CONNECTIONS_RESPONSE_KEY, VARIABLES_PATH, VARIABLES_RESPONSE_KEY,
};
use crate::errors::AdminError;

/// Deployment stage. Parsing only accepts the canonical lower-case codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Dev,
    Tst,
    Prd,
}

impl Stage {
    pub const ALL: [Stage; 3] = [Stage::Dev, Stage::Tst, Stage::Prd];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Dev => "dev",
            Stage::Tst => "tst",
            Stage::Prd => "prd",
        }
    }

    /// Lenient, case-insensitive lookup used when picking a vault secrets mount.
    pub fn from_alias(value: &str) -> Option<Stage> {
        match value.trim().to_ascii_lowercase().as_str() {
            "dev" | "development" => Some(Stage::Dev),
            "tst" | "test" | "qa" => Some(Stage::Tst),
            "prd" | "prod" => Some(Stage::Prd),
            _ => None,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = AdminError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Stage::ALL
            .into_iter()
            .find(|stage| stage.as_str() == value)
            .ok_or_else(|| {
                AdminError::configuration(format!(
                    "Invalid environment: {value}. Valid values: {}",
                    join_codes(Stage::ALL.iter().map(Stage::as_str))
                ))
            })
    }
}

/// Short region code as used by the settings file (`us`, `eu`, `jp`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegionCode {
    Us,
    Eu,
    Jp,
}

impl RegionCode {
    pub const ALL: [RegionCode; 3] = [RegionCode::Us, RegionCode::Eu, RegionCode::Jp];

    pub fn as_str(&self) -> &'static str {
        match self {
            RegionCode::Us => "us",
            RegionCode::Eu => "eu",
            RegionCode::Jp => "jp",
        }
    }
}

impl fmt::Display for RegionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RegionCode {
    type Err = AdminError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        RegionCode::ALL
            .into_iter()
            .find(|region| region.as_str() == value)
            .ok_or_else(|| {
                AdminError::configuration(format!(
                    "Invalid region: {value}. Valid values: {}",
                    join_codes(RegionCode::ALL.iter().map(RegionCode::as_str))
                ))
            })
    }
}

fn join_codes<'a>(codes: impl Iterator<Item = &'a str>) -> String {
    format!("[{}]", codes.collect::<Vec<_>>().join(", "))
}

/// A validated `(stage, region)` pair. Nothing reaches the network without one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StageRegion {
    pub stage: Stage,
    pub region: RegionCode,
}

impl StageRegion {
    pub fn new(stage: Stage, region: RegionCode) -> Self {
        Self { stage, region }
    }

    pub fn parse(stage: &str, region: &str) -> Result<Self, AdminError> {
        Ok(Self {
            stage: stage.parse()?,
            region: region.parse()?,
        })
    }
}

impl fmt::Display for StageRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.stage, self.region)
    }
}

/// An authenticated vault token, scoped to a single credential exchange.
#[derive(Clone, ZeroizeOnDrop)]
pub struct VaultSession {
    token: String,
    #[zeroize(skip)]
    lease_duration: Duration,
}

impl VaultSession {
    pub fn new(token: impl Into<String>, lease_duration: Duration) -> Self {
        Self {
            token: token.into(),
            lease_duration,
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn lease_duration(&self) -> Duration {
        self.lease_duration
    }
}

impl fmt::Debug for VaultSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VaultSession")
            .field("token", &"[REDACTED]")
            .field("lease_duration", &self.lease_duration)
            .finish()
    }
}

/// Dynamically generated cloud credentials for one cross-account role.
#[derive(Clone, ZeroizeOnDrop)]
pub struct ScopedCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
    #[zeroize(skip)]
    pub expires_at: Option<SystemTime>,
}

// Custom Debug implementation to prevent accidental logging of sensitive data
impl fmt::Debug for ScopedCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopedCredentials")
            .field("access_key_id", &"[REDACTED]")
            .field("secret_access_key", &"[REDACTED]")
            .field("session_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

impl From<&ScopedCredentials> for Credentials {
    fn from(credential: &ScopedCredentials) -> Self {
        Credentials::new(
            credential.access_key_id.clone(),
            credential.secret_access_key.clone(),
            credential.session_token.clone(),
            credential.expires_at,
            "vault",
        )
    }
}

/// Lifecycle status of a managed environment. Provider values outside this
/// set are reported as `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LifecycleStatus {
    Available,
    Creating,
    Updating,
    Deleting,
    CreateFailed,
    UpdateFailed,
    Unknown,
}

impl LifecycleStatus {
    pub fn from_provider(value: &str) -> Self {
        match value {
            "AVAILABLE" => Self::Available,
            "CREATING" => Self::Creating,
            "UPDATING" => Self::Updating,
            "DELETING" => Self::Deleting,
            "CREATE_FAILED" => Self::CreateFailed,
            "UPDATE_FAILED" => Self::UpdateFailed,
            _ => Self::Unknown,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfiguration {
    #[serde(rename = "SubnetIds", default)]
    pub subnet_ids: Vec<String>,
    #[serde(rename = "SecurityGroupIds", default)]
    pub security_group_ids: Vec<String>,
}

/// Static per-region data: provider region name, location code and the
/// network configuration used by each stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionProfile {
    pub region_name: String,
    #[serde(default)]
    pub location_char: String,
    #[serde(default)]
    pub network_configuration: BTreeMap<Stage, NetworkConfiguration>,
}

/// One orchestration environment as reported by the directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManagedEnvironment {
    pub name: String,
    pub status: LifecycleStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub airflow_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment_class: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_workers: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_workers: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schedulers: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webserver_access_mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_bucket_arn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dag_s3_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plugins_s3_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requirements_s3_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_role_arn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_role_arn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webserver_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weekly_maintenance_window: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kms_key: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network: Option<NetworkConfiguration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ManagedEnvironment {
    pub fn new(name: impl Into<String>, status: LifecycleStatus) -> Self {
        Self {
            name: name.into(),
            status,
            arn: None,
            airflow_version: None,
            environment_class: None,
            max_workers: None,
            min_workers: None,
            schedulers: None,
            webserver_access_mode: None,
            created_at: None,
            source_bucket_arn: None,
            dag_s3_path: None,
            plugins_s3_path: None,
            requirements_s3_path: None,
            execution_role_arn: None,
            service_role_arn: None,
            webserver_url: None,
            weekly_maintenance_window: None,
            kms_key: None,
            tags: BTreeMap::new(),
            network: None,
            error: None,
        }
    }

    /// Placeholder for an environment whose detail lookup failed.
    pub fn unknown(name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::new(name, LifecycleStatus::Unknown)
        }
    }
}

/// The two configuration collections exposed by an environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    Variables,
    Connections,
}

impl Collection {
    pub fn path(&self) -> &'static str {
        match self {
            Collection::Variables => VARIABLES_PATH,
            Collection::Connections => CONNECTIONS_PATH,
        }
    }

    /// Key the proxy may wrap the collection under.
    pub fn response_key(&self) -> &'static str {
        match self {
            Collection::Variables => VARIABLES_RESPONSE_KEY,
            Collection::Connections => CONNECTIONS_RESPONSE_KEY,
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.response_key())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    pub key: String,
    pub value: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Variable {
    pub fn new(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            description: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    #[serde(alias = "connection_id")]
    pub conn_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conn_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub login: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_encrypted: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_extra_encrypted: Option<bool>,
}

/// A normalized entry of either collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigurationItem {
    Variable(Variable),
    Connection(Connection),
}

impl ConfigurationItem {
    /// The item's identifier: variable key or connection id.
    pub fn id(&self) -> &str {
        match self {
            ConfigurationItem::Variable(variable) => &variable.key,
            ConfigurationItem::Connection(connection) => &connection.conn_id,
        }
    }
}

/// Request body for creating or updating a connection.
#[derive(Clone, Default, Serialize, Deserialize, ZeroizeOnDrop)]
pub struct NewConnection {
    pub connection_id: String,
    pub conn_type: String,
    pub description: String,
    pub host: String,
    pub login: String,
    pub password: String,
    pub schema: String,
    pub port: u16,
    pub extra: String,
}

impl fmt::Debug for NewConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewConnection")
            .field("connection_id", &self.connection_id)
            .field("conn_type", &self.conn_type)
            .field("description", &self.description)
            .field("host", &self.host)
            .field("login", &self.login)
            .field("password", &"[REDACTED]")
            .field("schema", &self.schema)
            .field("port", &self.port)
            .field("extra", &self.extra)
            .finish()
    }
}
