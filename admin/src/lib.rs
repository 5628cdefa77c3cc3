// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! # MWAA Admin
//!
//! Administers a fleet of Amazon MWAA environments spread over stages
//! (`dev`, `tst`, `prd`) and regions (`us`, `eu`, `jp`), without any
//! long-lived cloud credentials.
//!
//! ## Architecture
//!
//! ```text
//! caller -> EnvironmentDirectory / RuntimeConfigClient
//!                 |
//!                 +-> ManagementConnector -> CredentialBroker -> SecretVault (HashiCorp Vault)
//!                 |                                |
//!                 |                                +-> AppRole login, AWS secrets engine
//!                 +-> ManagementApi (MWAA: ListEnvironments, GetEnvironment, InvokeRestApi)
//! ```
//!
//! Every operation validates its `(stage, region)` target first, then mints
//! role-scoped credentials through the vault, builds a fresh regional client
//! and reports its outcome as an [`envelope::Envelope`].
//!
//! ## Modules
//!
//! - [`broker`]: cross-account role assumption through the vault and SDK client construction
//! - [`cache`]: optional per-stage credential cache with refresh buffer
//! - [`configuration`]: CLI argument parsing with clap and the JSON settings file
//! - [`constants`]: fixed paths, page size and vault defaults
//! - [`directory`]: environment listing and per-region summaries
//! - [`envelope`]: the `{status, result, error}` result envelope
//! - [`errors`]: error taxonomy
//! - [`management`]: MWAA API seam and its SDK adapter
//! - [`models`]: stages, regions, credentials, environments and configuration items
//! - [`normalize`]: response shape detection for variables and connections
//! - [`runtime_config`]: variable and connection reads and writes
//! - [`vault`]: HashiCorp Vault client
//!
//! ## Usage
//!
//! ```bash
//! mwaa-admin --config configs/config.json environments
//! mwaa-admin --stage tst --region eu variables set data-platform-tst retries 3
//! ```
//!
//! ## Security Considerations
//!
//! - Credentials are minted per operation; the opt-in cache never hands out a
//!   triple within 60 seconds of its expiry
//! - Vault tokens, credentials and connection passwords are zeroized on drop
//!   and redacted from `Debug` output
//! - SDK retries are disabled; failures surface immediately

pub mod broker;
pub mod cache;
pub mod configuration;
pub mod constants;
pub mod directory;
pub mod envelope;
pub mod errors;
pub mod management;
pub mod models;
pub mod normalize;
pub mod runtime_config;
pub mod vault;
