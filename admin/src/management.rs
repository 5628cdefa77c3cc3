// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! The cloud management API seam.
//!
//! [`ManagementApi`] covers the three calls this crate needs (list, describe
//! and the environment REST proxy). [`ManagementConnector`] hands out a fresh
//! credentialed [`ManagementApi`] per operation; [`BrokeredConnector`] does so
//! through the [`CredentialBroker`].

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use aws_sdk_mwaa::error::{DisplayErrorContext, ProvideErrorMetadata};
use aws_sdk_mwaa::operation::invoke_rest_api::InvokeRestApiError;
use aws_sdk_mwaa::types::{Environment, RestApiMethod};
use aws_smithy_runtime_api::client::result::SdkError;
use aws_smithy_types::date_time::Format;
use aws_smithy_types::{Document, Number};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::broker::CredentialBroker;
use crate::errors::{AdminError, Result};
use crate::models::{LifecycleStatus, ManagedEnvironment, StageRegion};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = AdminError;

    fn from_str(value: &str) -> Result<Self> {
        match value.to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "PATCH" => Ok(HttpMethod::Patch),
            "DELETE" => Ok(HttpMethod::Delete),
            _ => Err(AdminError::configuration(format!(
                "unsupported HTTP method: {value}"
            ))),
        }
    }
}

impl From<HttpMethod> for RestApiMethod {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => RestApiMethod::Get,
            HttpMethod::Post => RestApiMethod::Post,
            HttpMethod::Put => RestApiMethod::Put,
            HttpMethod::Patch => RestApiMethod::Patch,
            HttpMethod::Delete => RestApiMethod::Delete,
        }
    }
}

/// A call to an environment's administrative REST surface.
#[derive(Debug, Clone, PartialEq)]
pub struct RestApiRequest {
    pub environment_name: String,
    pub path: String,
    pub method: HttpMethod,
    pub body: Option<Value>,
}

/// What came back from the REST proxy. `status` is absent when the provider
/// did not report one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestApiResponse {
    pub status: Option<u16>,
    pub body: Option<Value>,
}

#[async_trait]
pub trait ManagementApi: Send + Sync {
    /// Names of the environments on the first page of the listing.
    async fn list_environments(&self, max_results: i32) -> Result<Vec<String>>;

    async fn get_environment(&self, name: &str) -> Result<ManagedEnvironment>;

    /// Error statuses reported by the proxy are returned as responses, not
    /// errors; only transport and authorization failures are `Err`.
    async fn invoke_rest_api(&self, request: &RestApiRequest) -> Result<RestApiResponse>;
}

#[async_trait]
pub trait ManagementConnector: Send + Sync {
    async fn connect(&self, target: StageRegion) -> Result<Box<dyn ManagementApi>>;
}

pub struct BrokeredConnector {
    broker: Arc<CredentialBroker>,
}

impl BrokeredConnector {
    pub fn new(broker: Arc<CredentialBroker>) -> Self {
        Self { broker }
    }
}

#[async_trait]
impl ManagementConnector for BrokeredConnector {
    async fn connect(&self, target: StageRegion) -> Result<Box<dyn ManagementApi>> {
        let client = self.broker.mwaa_client(target).await?;
        Ok(Box::new(MwaaManagementApi::new(client)))
    }
}

pub struct MwaaManagementApi {
    client: aws_sdk_mwaa::Client,
}

impl MwaaManagementApi {
    pub fn new(client: aws_sdk_mwaa::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ManagementApi for MwaaManagementApi {
    async fn list_environments(&self, max_results: i32) -> Result<Vec<String>> {
        tracing::debug!("[admin] calling list_environments");

        let output = self
            .client
            .list_environments()
            .max_results(max_results)
            .send()
            .await
            .map_err(|e| sdk_error("list_environments", e))?;

        Ok(output.environments().to_vec())
    }

    async fn get_environment(&self, name: &str) -> Result<ManagedEnvironment> {
        let output = self
            .client
            .get_environment()
            .name(name)
            .send()
            .await
            .map_err(|e| sdk_error("get_environment", e))?;

        output
            .environment()
            .map(|environment| environment_from_sdk(name, environment))
            .ok_or_else(|| AdminError::remote_api(format!("no details returned for {name}")))
    }

    async fn invoke_rest_api(&self, request: &RestApiRequest) -> Result<RestApiResponse> {
        let mut builder = self
            .client
            .invoke_rest_api()
            .name(&request.environment_name)
            .path(&request.path)
            .method(RestApiMethod::from(request.method));
        if let Some(body) = &request.body {
            builder = builder.body(value_to_document(body));
        }

        match builder.send().await {
            Ok(output) => Ok(rest_response(
                output.rest_api_status_code(),
                output.rest_api_response(),
            )),
            Err(err) => {
                let response = err.as_service_error().and_then(exception_response);
                match response {
                    Some(response) => Ok(response),
                    None => Err(sdk_error("invoke_rest_api", err)),
                }
            }
        }
    }
}

/// REST-level failures inside the environment come back as exceptions; they
/// still carry the proxied status and body.
fn exception_response(err: &InvokeRestApiError) -> Option<RestApiResponse> {
    match err {
        InvokeRestApiError::RestApiClientException(e) => Some(rest_response(
            e.rest_api_status_code(),
            e.rest_api_response(),
        )),
        InvokeRestApiError::RestApiServerException(e) => Some(rest_response(
            e.rest_api_status_code(),
            e.rest_api_response(),
        )),
        _ => None,
    }
}

fn rest_response(status: Option<i32>, body: Option<&Document>) -> RestApiResponse {
    RestApiResponse {
        status: status.and_then(|code| u16::try_from(code).ok()),
        body: body.map(document_to_value),
    }
}

fn sdk_error<E, R>(operation: &str, err: SdkError<E, R>) -> AdminError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: fmt::Debug,
{
    tracing::error!("[admin] {} failed: {:?}", operation, err);
    match err.code() {
        Some(code) => AdminError::remote_api(format!(
            "{operation} failed ({code}): {}",
            err.message().unwrap_or_default()
        )),
        None => AdminError::remote_api(format!(
            "{operation} failed: {}",
            DisplayErrorContext(&err)
        )),
    }
}

pub(crate) fn environment_from_sdk(name: &str, environment: &Environment) -> ManagedEnvironment {
    let mut managed = ManagedEnvironment::new(
        environment.name().unwrap_or(name),
        environment
            .status()
            .map(|status| LifecycleStatus::from_provider(status.as_str()))
            .unwrap_or(LifecycleStatus::Unknown),
    );

    managed.arn = environment.arn().map(str::to_string);
    managed.airflow_version = environment.airflow_version().map(str::to_string);
    managed.environment_class = environment.environment_class().map(str::to_string);
    managed.max_workers = environment.max_workers();
    managed.min_workers = environment.min_workers();
    managed.schedulers = environment.schedulers();
    managed.webserver_access_mode = environment
        .webserver_access_mode()
        .map(|mode| mode.as_str().to_string());
    managed.created_at = environment
        .created_at()
        .and_then(|created| created.fmt(Format::DateTime).ok());
    managed.source_bucket_arn = environment.source_bucket_arn().map(str::to_string);
    managed.dag_s3_path = environment.dag_s3_path().map(str::to_string);
    managed.plugins_s3_path = environment.plugins_s3_path().map(str::to_string);
    managed.requirements_s3_path = environment.requirements_s3_path().map(str::to_string);
    managed.execution_role_arn = environment.execution_role_arn().map(str::to_string);
    managed.service_role_arn = environment.service_role_arn().map(str::to_string);
    managed.webserver_url = environment.webserver_url().map(str::to_string);
    managed.weekly_maintenance_window = environment
        .weekly_maintenance_window_start()
        .map(str::to_string);
    managed.kms_key = environment.kms_key().map(str::to_string);
    if let Some(tags) = environment.tags() {
        managed.tags = tags.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
    }

    managed
}

pub fn document_to_value(document: &Document) -> Value {
    match document {
        Document::Object(map) => Value::Object(
            map.iter()
                .map(|(key, value)| (key.clone(), document_to_value(value)))
                .collect(),
        ),
        Document::Array(items) => Value::Array(items.iter().map(document_to_value).collect()),
        Document::Number(Number::PosInt(n)) => Value::from(*n),
        Document::Number(Number::NegInt(n)) => Value::from(*n),
        Document::Number(Number::Float(f)) => serde_json::Number::from_f64(*f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        Document::String(s) => Value::String(s.clone()),
        Document::Bool(b) => Value::Bool(*b),
        Document::Null => Value::Null,
    }
}

pub fn value_to_document(value: &Value) -> Document {
    match value {
        Value::Object(map) => Document::Object(
            map.iter()
                .map(|(key, value)| (key.clone(), value_to_document(value)))
                .collect::<HashMap<_, _>>(),
        ),
        Value::Array(items) => Document::Array(items.iter().map(value_to_document).collect()),
        Value::Number(n) => {
            if let Some(u) = n.as_u64() {
                Document::Number(Number::PosInt(u))
            } else if let Some(i) = n.as_i64() {
                Document::Number(Number::NegInt(i))
            } else {
                Document::Number(Number::Float(n.as_f64().unwrap_or_default()))
            }
        }
        Value::String(s) => Document::String(s.clone()),
        Value::Bool(b) => Document::Bool(*b),
        Value::Null => Document::Null,
    }
}
