// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! Reads and writes an environment's variables and connections through its
//! REST proxy.

use std::sync::Arc;

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{Value, json};

use crate::constants::HTTP_OK;
use crate::envelope::Envelope;
use crate::errors::{AdminError, Result};
use crate::management::{
    HttpMethod, ManagementApi, ManagementConnector, RestApiRequest, RestApiResponse,
};
use crate::models::{Collection, ConfigurationItem, NewConnection, StageRegion};
use crate::normalize::normalize;

/// Normalized content of one collection.
///
/// Serialized with collection-specific keys, e.g.
/// `{"variables": [..], "variables_count": 2, "raw_response": ..}`.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionListing {
    pub collection: Collection,
    pub items: Vec<ConfigurationItem>,
    pub raw_response: Value,
}

impl Serialize for CollectionListing {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let key = self.collection.response_key();
        let mut map = serializer.serialize_map(Some(3))?;
        map.serialize_entry(key, &self.items)?;
        map.serialize_entry(&format!("{key}_count"), &self.items.len())?;
        map.serialize_entry("raw_response", &self.raw_response)?;
        map.end()
    }
}

pub struct RuntimeConfigClient {
    connector: Arc<dyn ManagementConnector>,
}

impl RuntimeConfigClient {
    pub fn new(connector: Arc<dyn ManagementConnector>) -> Self {
        Self { connector }
    }

    /// Validates the target and environment name, then connects. Nothing
    /// touches the network for an invalid request.
    async fn connect(
        &self,
        stage: &str,
        region: &str,
        environment_name: &str,
    ) -> Result<Box<dyn ManagementApi>> {
        let target = StageRegion::parse(stage, region)?;
        if environment_name.trim().is_empty() {
            return Err(AdminError::configuration("environment name cannot be empty"));
        }
        self.connector.connect(target).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn read_collection(
        &self,
        stage: &str,
        region: &str,
        environment_name: &str,
        collection: Collection,
    ) -> Envelope<CollectionListing> {
        tracing::info!("[admin] getting {} from {}", collection, environment_name);

        let result = self
            .try_read(stage, region, environment_name, collection)
            .await;
        if let Err(err) = &result {
            tracing::error!("[admin] error getting {}: {}", collection, err);
        }
        Envelope::from_result(result)
    }

    async fn try_read(
        &self,
        stage: &str,
        region: &str,
        environment_name: &str,
        collection: Collection,
    ) -> Result<CollectionListing> {
        let api = self.connect(stage, region, environment_name).await?;
        let response = api
            .invoke_rest_api(&RestApiRequest {
                environment_name: environment_name.to_string(),
                path: collection.path().to_string(),
                method: HttpMethod::Get,
                body: None,
            })
            .await?;

        if let Some(code) = response.status
            && code != HTTP_OK
        {
            return Err(AdminError::remote_api(format!("API returned status {code}")));
        }

        let Some(body) = response.body else {
            return Err(AdminError::remote_api(format!(
                "No response body returned for {collection}"
            )));
        };

        let items = normalize(collection, &body)?;
        tracing::info!("[admin] retrieved {} {}", items.len(), collection);

        Ok(CollectionListing {
            collection,
            items,
            raw_response: body,
        })
    }

    pub async fn get_variables(
        &self,
        stage: &str,
        region: &str,
        environment_name: &str,
    ) -> Envelope<CollectionListing> {
        self.read_collection(stage, region, environment_name, Collection::Variables)
            .await
    }

    pub async fn get_connections(
        &self,
        stage: &str,
        region: &str,
        environment_name: &str,
    ) -> Envelope<CollectionListing> {
        self.read_collection(stage, region, environment_name, Collection::Connections)
            .await
    }

    /// Posts `payload` to the collection. Only HTTP 200 counts as success; the
    /// decoded response body is returned as `result` either way.
    #[tracing::instrument(skip(self, payload))]
    pub async fn write_item(
        &self,
        stage: &str,
        region: &str,
        environment_name: &str,
        collection: Collection,
        payload: Value,
    ) -> Envelope<Value> {
        let response = match self
            .try_write(stage, region, environment_name, collection, payload)
            .await
        {
            Ok(response) => response,
            Err(err) => {
                tracing::error!("[admin] unable to write {} entry: {}", collection, err);
                return Envelope::from(err);
            }
        };

        tracing::info!("[admin] HTTP status: {:?}", response.status);

        match (response.status, response.body) {
            (Some(HTTP_OK), body) => Envelope::success(body.unwrap_or(Value::Null)),
            (status, body) => {
                let status = status
                    .map(|code| code.to_string())
                    .unwrap_or_else(|| "Unknown".to_string());
                let message = format!("API returned status {status}");
                tracing::warn!("[admin] failed to write {} entry: {}", collection, message);
                match body {
                    Some(body) => Envelope::failed_with_result(message, body),
                    None => Envelope::failed(message),
                }
            }
        }
    }

    async fn try_write(
        &self,
        stage: &str,
        region: &str,
        environment_name: &str,
        collection: Collection,
        payload: Value,
    ) -> Result<RestApiResponse> {
        let api = self.connect(stage, region, environment_name).await?;
        api.invoke_rest_api(&RestApiRequest {
            environment_name: environment_name.to_string(),
            path: collection.path().to_string(),
            method: HttpMethod::Post,
            body: Some(payload),
        })
        .await
    }

    /// Creates the variable, or updates it when `key` already exists.
    #[tracing::instrument(skip(self, value))]
    pub async fn create_variable(
        &self,
        stage: &str,
        region: &str,
        environment_name: &str,
        key: &str,
        value: Value,
    ) -> Envelope<Value> {
        let payload = json!({"key": key, "value": value});
        self.write_item(stage, region, environment_name, Collection::Variables, payload)
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn create_connection(
        &self,
        stage: &str,
        region: &str,
        environment_name: &str,
        connection: &NewConnection,
    ) -> Envelope<Value> {
        let payload = match serde_json::to_value(connection) {
            Ok(payload) => payload,
            Err(err) => return Envelope::from(AdminError::from(err)),
        };
        self.write_item(stage, region, environment_name, Collection::Connections, payload)
            .await
    }

    /// Calls the REST proxy directly and hands back the raw response.
    /// Unlike every other operation this one propagates errors.
    #[tracing::instrument(skip(self, body))]
    pub async fn invoke_raw(
        &self,
        stage: &str,
        region: &str,
        environment_name: &str,
        path: &str,
        method: HttpMethod,
        body: Option<Value>,
    ) -> Result<RestApiResponse> {
        let api = self.connect(stage, region, environment_name).await?;
        api.invoke_rest_api(&RestApiRequest {
            environment_name: environment_name.to_string(),
            path: path.to_string(),
            method,
            body,
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ManagedEnvironment;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Replays one canned response and records every request.
    struct ScriptedApi {
        response: Result<RestApiResponse>,
        requests: Arc<Mutex<Vec<RestApiRequest>>>,
    }

    #[async_trait]
    impl ManagementApi for ScriptedApi {
        async fn list_environments(&self, _max_results: i32) -> Result<Vec<String>> {
            Ok(Vec::new())
        }

        async fn get_environment(&self, name: &str) -> Result<ManagedEnvironment> {
            Err(AdminError::remote_api(format!("{name} not expected")))
        }

        async fn invoke_rest_api(&self, request: &RestApiRequest) -> Result<RestApiResponse> {
            self.requests.lock().unwrap().push(request.clone());
            self.response.clone()
        }
    }

    struct ScriptedConnector {
        response: Result<RestApiResponse>,
        requests: Arc<Mutex<Vec<RestApiRequest>>>,
    }

    #[async_trait]
    impl ManagementConnector for ScriptedConnector {
        async fn connect(&self, _target: StageRegion) -> Result<Box<dyn ManagementApi>> {
            Ok(Box::new(ScriptedApi {
                response: self.response.clone(),
                requests: self.requests.clone(),
            }))
        }
    }

    fn scripted_client(
        response: Result<RestApiResponse>,
    ) -> (RuntimeConfigClient, Arc<Mutex<Vec<RestApiRequest>>>) {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let connector = ScriptedConnector {
            response,
            requests: requests.clone(),
        };
        (RuntimeConfigClient::new(Arc::new(connector)), requests)
    }

    fn respond(status: Option<u16>, body: Option<Value>) -> Result<RestApiResponse> {
        Ok(RestApiResponse { status, body })
    }

    #[tokio::test]
    async fn test_read_collection_serializes_listing() {
        let body = json!({"variables": [{"key": "a", "value": "1"}], "total_entries": 1});
        let (client, requests) = scripted_client(respond(Some(200), Some(body.clone())));

        let envelope = client.get_variables("dev", "us", "data-platform-dev").await;

        assert!(envelope.is_success());
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["result"]["variables"][0]["key"], "a");
        assert_eq!(json["result"]["variables_count"], 1);
        assert_eq!(json["result"]["raw_response"], body);

        let requests = requests.lock().unwrap();
        assert_eq!(requests[0].path, "/variables");
        assert_eq!(requests[0].method, HttpMethod::Get);
        assert_eq!(requests[0].environment_name, "data-platform-dev");
    }

    #[tokio::test]
    async fn test_read_without_body_is_distinct_from_empty() {
        let (client, _) = scripted_client(respond(Some(200), None));
        let missing = client.get_connections("dev", "us", "env").await;
        assert_eq!(
            missing.error.as_deref(),
            Some("remote api error: No response body returned for connections")
        );

        let (client, _) = scripted_client(respond(Some(200), Some(json!({"connections": []}))));
        let empty = client.get_connections("dev", "us", "env").await;
        assert!(empty.is_success());
        assert!(empty.result.unwrap().items.is_empty());
    }

    #[tokio::test]
    async fn test_read_without_status_uses_body() {
        let (client, _) = scripted_client(respond(None, Some(json!({"variables": []}))));
        let envelope = client.get_variables("dev", "us", "env").await;
        assert!(envelope.is_success());
        assert!(envelope.result.unwrap().items.is_empty());

        let (client, _) = scripted_client(respond(None, Some(json!({"a": "1"}))));
        let envelope = client.get_variables("dev", "us", "env").await;
        assert_eq!(envelope.result.unwrap().items.len(), 1);
    }

    #[tokio::test]
    async fn test_read_unrecognized_shape_fails() {
        let (client, _) = scripted_client(respond(Some(200), Some(json!("<html>"))));
        let envelope = client.get_variables("dev", "us", "env").await;
        assert!(!envelope.is_success());
        assert!(
            envelope
                .error
                .unwrap()
                .starts_with("response shape error:")
        );
    }

    #[tokio::test]
    async fn test_read_error_status_fails() {
        let (client, _) = scripted_client(respond(Some(403), Some(json!({"title": "Forbidden"}))));
        let envelope = client.get_variables("dev", "us", "env").await;
        assert_eq!(
            envelope.error.as_deref(),
            Some("remote api error: API returned status 403")
        );
    }

    #[tokio::test]
    async fn test_write_status_handling() {
        let (client, _) = scripted_client(respond(Some(200), Some(json!({"key": "a", "value": "1"}))));
        let ok = client.create_variable("dev", "us", "env", "a", json!("1")).await;
        assert!(ok.is_success());
        assert_eq!(ok.result, Some(json!({"key": "a", "value": "1"})));
        assert!(ok.error.is_none());

        let (client, _) = scripted_client(respond(Some(400), Some(json!({"detail": "bad request"}))));
        let rejected = client.create_variable("dev", "us", "env", "a", json!("1")).await;
        assert!(!rejected.is_success());
        assert_eq!(rejected.error.as_deref(), Some("API returned status 400"));
        assert_eq!(rejected.result, Some(json!({"detail": "bad request"})));

        let (client, _) = scripted_client(respond(None, None));
        let unknown = client.create_variable("dev", "us", "env", "a", json!("1")).await;
        assert_eq!(unknown.error.as_deref(), Some("API returned status Unknown"));
        assert!(unknown.result.is_none());
    }

    #[tokio::test]
    async fn test_write_transport_error_is_failed_envelope() {
        let (client, _) = scripted_client(Err(AdminError::remote_api("invoke_rest_api failed")));
        let envelope = client.create_variable("dev", "us", "env", "a", json!("1")).await;
        assert!(!envelope.is_success());
        assert!(envelope.result.is_none());
    }

    #[tokio::test]
    async fn test_create_connection_payload() {
        let (client, requests) = scripted_client(respond(Some(200), None));
        let mut connection = NewConnection::default();
        connection.connection_id = "warehouse".to_string();
        connection.conn_type = "postgres".to_string();
        connection.port = 5432;

        let envelope = client
            .create_connection("tst", "eu", "env", &connection)
            .await;

        assert!(envelope.is_success());
        assert_eq!(envelope.result, Some(Value::Null));
        let requests = requests.lock().unwrap();
        assert_eq!(requests[0].path, "/connections");
        assert_eq!(requests[0].method, HttpMethod::Post);
        let body = requests[0].body.as_ref().unwrap();
        assert_eq!(body["connection_id"], "warehouse");
        assert_eq!(body["port"], 5432);
    }

    #[tokio::test]
    async fn test_empty_environment_name_is_rejected() {
        let (client, requests) = scripted_client(respond(Some(200), None));
        let envelope = client.get_variables("dev", "us", "  ").await;
        assert!(!envelope.is_success());
        assert!(requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invoke_raw_propagates_errors() {
        let (client, _) = scripted_client(respond(Some(404), Some(json!({"title": "Not Found"}))));
        let response = client
            .invoke_raw("dev", "us", "env", "/dags", HttpMethod::Get, None)
            .await
            .unwrap();
        assert_eq!(response.status, Some(404));

        let err = client
            .invoke_raw("dev", "mars", "env", "/dags", HttpMethod::Get, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AdminError::Configuration(_)));
    }
}
