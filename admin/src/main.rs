// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use mwaa_admin::broker::CredentialBroker;
use mwaa_admin::configuration::{AdminOptions, Command, ConnectionAction, Settings, VariableAction};
use mwaa_admin::directory::EnvironmentDirectory;
use mwaa_admin::management::{BrokeredConnector, HttpMethod, ManagementConnector};
use mwaa_admin::models::NewConnection;
use mwaa_admin::runtime_config::RuntimeConfigClient;
use mwaa_admin::vault::HashiCorpVault;
use serde_json::Value;
use tracing_subscriber::EnvFilter;

fn init_tracing(json: bool) {
    let filter = EnvFilter::new(std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()));

    // stdout carries the result envelope, logs go to stderr
    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            // this needs to be set to remove duplicated information in the log.
            .with_current_span(false)
            .with_ansi(false)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let options = AdminOptions::parse();
    init_tracing(options.log_json);

    tracing::info!("[admin] loading settings from {}", options.config.display());

    let settings = Arc::new(Settings::load(&options.config)?);
    match settings.target() {
        Ok(target) => tracing::info!("[admin] configured target: {}", target),
        Err(err) => tracing::warn!("[admin] configured target is not usable: {}", err),
    }
    let (stage, region) = options.target(&settings);

    let vault = Arc::new(HashiCorpVault::new(settings.vault.clone())?);
    let broker = Arc::new(CredentialBroker::new(settings.clone(), vault));
    let connector: Arc<dyn ManagementConnector> = Arc::new(BrokeredConnector::new(broker));

    let directory = EnvironmentDirectory::new(settings.clone(), connector.clone());
    let runtime_config = RuntimeConfigClient::new(connector);

    let (succeeded, output) = match options.command {
        Command::Environments => {
            let envelope = directory.list_environments(&stage, &region).await;
            (envelope.is_success(), serde_json::to_value(&envelope)?)
        }
        Command::Summary => {
            let envelope = directory.summarize_by_region(&stage, &region).await;
            (envelope.is_success(), serde_json::to_value(&envelope)?)
        }
        Command::Variables { action } => match action {
            VariableAction::List { environment } => {
                let envelope = runtime_config
                    .get_variables(&stage, &region, &environment)
                    .await;
                (envelope.is_success(), serde_json::to_value(&envelope)?)
            }
            VariableAction::Set {
                environment,
                key,
                value,
            } => {
                let envelope = runtime_config
                    .create_variable(&stage, &region, &environment, &key, Value::String(value))
                    .await;
                (envelope.is_success(), serde_json::to_value(&envelope)?)
            }
        },
        Command::Connections { action } => match action {
            ConnectionAction::List { environment } => {
                let envelope = runtime_config
                    .get_connections(&stage, &region, &environment)
                    .await;
                (envelope.is_success(), serde_json::to_value(&envelope)?)
            }
            ConnectionAction::Set {
                environment,
                connection_id,
                conn_type,
                description,
                host,
                login,
                password,
                schema,
                port,
                extra,
            } => {
                let connection = NewConnection {
                    connection_id,
                    conn_type,
                    description,
                    host,
                    login,
                    password,
                    schema,
                    port,
                    extra,
                };
                let envelope = runtime_config
                    .create_connection(&stage, &region, &environment, &connection)
                    .await;
                (envelope.is_success(), serde_json::to_value(&envelope)?)
            }
        },
        Command::Raw {
            environment,
            path,
            method,
            body,
        } => {
            let method: HttpMethod = method.parse()?;
            let body = body
                .map(|raw| serde_json::from_str::<Value>(&raw))
                .transpose()
                .context("--body must be valid JSON")?;
            let response = runtime_config
                .invoke_raw(&stage, &region, &environment, &path, method, body)
                .await?;
            (true, serde_json::to_value(&response)?)
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);

    if !succeeded {
        std::process::exit(1);
    }
    Ok(())
}
