// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

use std::time::Duration;

/// `ListEnvironments` page size. Continuation tokens are not followed, so
/// environments past the first page are not reported.
pub const LIST_ENVIRONMENTS_MAX_RESULTS: i32 = 25;

pub const VARIABLES_PATH: &str = "/variables";
pub const CONNECTIONS_PATH: &str = "/connections";

pub const VARIABLES_RESPONSE_KEY: &str = "variables";
pub const CONNECTIONS_RESPONSE_KEY: &str = "connections";

pub const HTTP_OK: u16 = 200;

// Vault defaults, overridable from the settings file
pub const DEFAULT_APPROLE_MOUNT: &str = "approle";
pub const DEFAULT_AWS_SECRETS_MOUNT: &str = "aws";
pub const DEFAULT_CREDENTIAL_ROLE: &str = "assumerole";

pub const CREDENTIAL_REFRESH_BUFFER: Duration = Duration::from_secs(60); // refresh 60s before expiry

pub const CONFIG_PATH_ENV: &str = "MWAA_ADMIN_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "configs/config.json";
